//! Contracts for the collaborators the application services drive.
//!
//! Adapters live in `infra`; tests substitute hand-written implementations.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    domain::{
        card::TitleCard,
        episodes::{Episode, coalesce_multipart},
        finalize::{FinalizeError, finalize_series},
        series::{FontSpec, SeriesEntity, SeriesIds},
        values::ConfigMap,
    },
    infra::error::InfraError,
};

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Resolution(String),
    #[error("{message}")]
    MissingResource { message: String, step: String },
    #[error("{0}")]
    Render(String),
    /// A remote service could not be reached or answered with an error.
    #[error("{0}")]
    Unavailable(String),
    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl CollaboratorError {
    pub fn missing_resource(message: impl Into<String>, step: impl Into<String>) -> Self {
        Self::MissingResource {
            message: message.into(),
            step: step.into(),
        }
    }
}

/// The validated, process-wide preference set.
pub trait Preferences: Send + Sync {
    fn is_valid(&self) -> bool;

    /// Declared series files, in declaration order, possibly with blanks and repeats.
    fn series_files(&self) -> &[PathBuf];

    fn use_plex(&self) -> bool;

    fn default_media_server(&self) -> &str;

    fn source_directory(&self) -> &Path;

    /// Finalize a series configuration against library and font definitions.
    ///
    /// Production runs and previews share this one rule.
    fn finalize_series(
        &self,
        series: &str,
        config: &ConfigMap,
        libraries: &ConfigMap,
        fonts: &ConfigMap,
    ) -> Result<ConfigMap, FinalizeError> {
        finalize_series(series, config, libraries, fonts, self.default_media_server())
    }
}

/// A single show returned by the metadata search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesMatch {
    pub title: String,
    pub year: Option<u32>,
    pub library: Option<String>,
    pub summary: Option<String>,
    pub ids: ConfigMap,
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search_series(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SeriesMatch>, CollaboratorError>;
}

impl std::fmt::Debug for dyn SearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn SearchClient")
    }
}

/// Builds the shared search client; called at most once per successful construction.
pub trait SearchClientFactory: Send + Sync {
    fn connect(&self) -> Result<Arc<dyn SearchClient>, CollaboratorError>;
}

/// Per-call episode and artwork services bound to one series.
#[async_trait]
pub trait ShowServices: Send + Sync {
    async fn resolve_series_ids(
        &self,
        series: &SeriesEntity,
    ) -> Result<SeriesIds, CollaboratorError>;

    async fn read_episodes(&self, series: &SeriesEntity)
    -> Result<Vec<Episode>, CollaboratorError>;

    fn coalesce_multipart(&self, episodes: Vec<Episode>) -> Vec<Episode> {
        coalesce_multipart(episodes)
    }

    /// Resolve the source image of `episode` only; other episodes are untouched.
    async fn select_source_image(
        &self,
        series: &SeriesEntity,
        episode: &mut Episode,
    ) -> Result<(), CollaboratorError>;
}

pub trait ShowServicesFactory: Send + Sync {
    fn bind(
        &self,
        series: &SeriesEntity,
        search: Option<Arc<dyn SearchClient>>,
    ) -> Result<Box<dyn ShowServices>, CollaboratorError>;
}

/// Outcome of checking a display title against a font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleValidation {
    pub title: String,
    pub missing: Vec<char>,
}

impl TitleValidation {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty()
    }
}

pub trait FontValidator: Send + Sync {
    fn validate_title(
        &self,
        font: &FontSpec,
        title: &str,
    ) -> Result<TitleValidation, CollaboratorError>;
}

#[async_trait]
pub trait CardRenderer: Send + Sync {
    /// Draw `card` and write the encoded image to `card.destination`.
    async fn render(&self, card: &TitleCard) -> Result<(), CollaboratorError>;

    fn mime(&self) -> &'static str {
        "image/jpeg"
    }
}
