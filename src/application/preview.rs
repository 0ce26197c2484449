//! Preview orchestration: one finalized configuration in, one transient card out.

use std::{
    fmt,
    ops::Deref,
    path::PathBuf,
    sync::Arc,
    time::Instant,
};

use metrics::{counter, histogram};
use tracing::{info, instrument, warn};

use crate::{
    application::{
        collaborators::{CardRenderer, CollaboratorError, FontValidator, ShowServicesFactory},
        context::RuntimeContext,
        error::AppError,
        merge::ConfigMerger,
    },
    domain::{
        card::TitleCard,
        episodes::Episode,
        series::{SeriesDefaults, SeriesEntity},
        values::ConfigMap,
    },
    infra::error::InfraError,
};

const METRIC_PREVIEW_TOTAL: &str = "tcm_preview_total";
const METRIC_PREVIEW_FAILED_TOTAL: &str = "tcm_preview_failed_total";
const METRIC_PREVIEW_MS: &str = "tcm_preview_ms";

const SCRATCH_PREFIX: &str = "tcm-preview-";
const SCRATCH_FILE: &str = "preview.jpg";
const SYNC_STEP: &str = "sync";

/// Pipeline stage a preview failed in; used as the failure metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewStage {
    Merge,
    Entity,
    Bind,
    Ids,
    Episodes,
    NoEpisodes,
    SourceImage,
    Scratch,
    Glyphs,
    Render,
    Readback,
}

impl PreviewStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Entity => "entity",
            Self::Bind => "bind",
            Self::Ids => "ids",
            Self::Episodes => "episodes",
            Self::NoEpisodes => "no_episodes",
            Self::SourceImage => "source_image",
            Self::Scratch => "scratch",
            Self::Glyphs => "glyphs",
            Self::Render => "render",
            Self::Readback => "readback",
        }
    }
}

impl fmt::Display for PreviewStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct StageFailure {
    stage: PreviewStage,
    error: AppError,
}

impl StageFailure {
    fn new(stage: PreviewStage, error: impl Into<AppError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }

    /// Collaborator failures take the kind of the stage they happened in,
    /// unless they already name a missing resource or an infrastructure fault.
    fn collaborator(stage: PreviewStage, error: CollaboratorError) -> Self {
        let error = match error {
            CollaboratorError::MissingResource { .. } | CollaboratorError::Infra(_) => {
                AppError::from(error)
            }
            other => {
                let message = other.to_string();
                match stage {
                    PreviewStage::Bind => AppError::configuration(message),
                    PreviewStage::Ids | PreviewStage::Episodes | PreviewStage::SourceImage => {
                        AppError::resolution(message)
                    }
                    PreviewStage::Glyphs | PreviewStage::Render | PreviewStage::Readback => {
                        AppError::render(message)
                    }
                    _ => AppError::from(other),
                }
            }
        };
        Self { stage, error }
    }
}

/// Encoded preview card.
#[derive(Debug, Clone)]
pub struct PreviewImage {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

pub struct PreviewService {
    context: Arc<RuntimeContext>,
    merger: Arc<ConfigMerger>,
    shows: Arc<dyn ShowServicesFactory>,
    fonts: Arc<dyn FontValidator>,
    renderer: Arc<dyn CardRenderer>,
    scratch_root: PathBuf,
}

impl PreviewService {
    pub fn new(
        context: Arc<RuntimeContext>,
        merger: Arc<ConfigMerger>,
        shows: Arc<dyn ShowServicesFactory>,
        fonts: Arc<dyn FontValidator>,
        renderer: Arc<dyn CardRenderer>,
        scratch_root: PathBuf,
    ) -> Self {
        Self {
            context,
            merger,
            shows,
            fonts,
            renderer,
            scratch_root,
        }
    }

    /// Render a one-off card for `show_name` from `candidate`.
    ///
    /// Nothing is persisted: the card is drawn into a private scratch directory
    /// that is removed before this returns, on every exit path.
    #[instrument(skip_all, fields(show = %show_name))]
    pub async fn generate(
        &self,
        show_name: &str,
        candidate: &ConfigMap,
    ) -> Result<PreviewImage, AppError> {
        let started_at = Instant::now();
        counter!(METRIC_PREVIEW_TOTAL).increment(1);

        let result = self.run(show_name, candidate).await;
        histogram!(METRIC_PREVIEW_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(image) => {
                info!(bytes = image.bytes.len(), mime = image.mime, "preview rendered");
                Ok(image)
            }
            Err(StageFailure { stage, error }) => {
                counter!(METRIC_PREVIEW_FAILED_TOTAL, "stage" => stage.as_str()).increment(1);
                warn!(stage = %stage, error = %error, "preview failed");
                Err(error)
            }
        }
    }

    async fn run(
        &self,
        show_name: &str,
        candidate: &ConfigMap,
    ) -> Result<PreviewImage, StageFailure> {
        let finalized = self
            .merger
            .merge(show_name, candidate)
            .await
            .map_err(|err| StageFailure::new(PreviewStage::Merge, err))?;

        let preferences = self.context.preferences();
        let defaults = SeriesDefaults {
            source_directory: preferences.source_directory(),
            default_media_server: preferences.default_media_server(),
        };
        let mut series = SeriesEntity::from_config(show_name, &finalized, &defaults)
            .map_err(|err| StageFailure::new(PreviewStage::Entity, err))?;

        let search = self
            .context
            .search_client_if_enabled()
            .map_err(|err| StageFailure::collaborator(PreviewStage::Bind, err))?;
        let services = self
            .shows
            .bind(&series, search)
            .map_err(|err| StageFailure::collaborator(PreviewStage::Bind, err))?;

        series.ids = services
            .resolve_series_ids(&series)
            .await
            .map_err(|err| StageFailure::collaborator(PreviewStage::Ids, err))?;

        let episodes = services
            .read_episodes(&series)
            .await
            .map_err(|err| StageFailure::collaborator(PreviewStage::Episodes, err))?;
        let episodes = services.coalesce_multipart(episodes);

        let Some(mut episode) = episodes.into_iter().next() else {
            return Err(StageFailure::new(
                PreviewStage::NoEpisodes,
                AppError::validation("No episodes are available for preview"),
            ));
        };

        services
            .select_source_image(&series, &mut episode)
            .await
            .map_err(|err| StageFailure::collaborator(PreviewStage::SourceImage, err))?;

        let source_present = tokio::fs::metadata(&episode.source)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !source_present {
            return Err(StageFailure::new(
                PreviewStage::SourceImage,
                AppError::resource_missing(
                    format!(
                        "Episode source image `{}` is missing",
                        episode.source.display()
                    ),
                    SYNC_STEP,
                ),
            ));
        }

        // Removed on drop, after the destination override below is released.
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&self.scratch_root)
            .map_err(|err| {
                StageFailure::new(
                    PreviewStage::Scratch,
                    InfraError::file(&self.scratch_root, err),
                )
            })?;
        let redirected =
            DestinationOverride::redirect(&mut episode, scratch.path().join(SCRATCH_FILE));

        let mut card = TitleCard::new(&series, &redirected)
            .map_err(|err| StageFailure::new(PreviewStage::Render, err))?;

        let fonts = Arc::clone(&self.fonts);
        let font = card.font.clone();
        let title = card.title.clone();
        let episode_line = card.episode_line();
        let (validation, line_check) = tokio::task::spawn_blocking(move || {
            Ok::<_, CollaboratorError>((
                fonts.validate_title(&font, &title)?,
                fonts.validate_title(&font, &episode_line)?,
            ))
        })
        .await
        .map_err(|err| StageFailure::new(PreviewStage::Glyphs, InfraError::join(err.to_string())))?
        .map_err(|err| StageFailure::collaborator(PreviewStage::Glyphs, err))?;
        if !validation.is_valid() || !line_check.is_valid() {
            let mut missing: String = validation.missing.iter().collect();
            missing.extend(
                line_check
                    .missing
                    .iter()
                    .filter(|ch| !validation.missing.contains(ch)),
            );
            return Err(StageFailure::new(
                PreviewStage::Glyphs,
                AppError::render(format!(
                    "The selected font is missing characters for the preview: {missing}"
                )),
            ));
        }
        card.title = validation.title;

        self.renderer
            .render(&card)
            .await
            .map_err(|err| StageFailure::collaborator(PreviewStage::Render, err))?;

        let bytes = tokio::fs::read(&card.destination).await.map_err(|err| {
            StageFailure::new(
                PreviewStage::Readback,
                AppError::render(format!("rendered card could not be read back: {err}")),
            )
        })?;

        drop(redirected);
        if let Err(err) = scratch.close() {
            warn!(error = %err, "preview scratch directory could not be removed");
        }

        Ok(PreviewImage {
            mime: self.renderer.mime(),
            bytes,
        })
    }
}

/// Points an episode's destination at a scratch file and restores the
/// original destination when dropped.
struct DestinationOverride<'a> {
    episode: &'a mut Episode,
    original: Option<PathBuf>,
}

impl<'a> DestinationOverride<'a> {
    fn redirect(episode: &'a mut Episode, scratch: PathBuf) -> Self {
        let original = episode.destination.replace(scratch);
        Self { episode, original }
    }
}

impl Deref for DestinationOverride<'_> {
    type Target = Episode;

    fn deref(&self) -> &Episode {
        self.episode
    }
}

impl Drop for DestinationOverride<'_> {
    fn drop(&mut self) {
        self.episode.destination = self.original.take();
    }
}
