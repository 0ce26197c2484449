//! The preferences file, loaded once at startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info};
use url::Url;

use crate::{
    application::collaborators::Preferences,
    domain::catalog::{MEDIA_SERVERS, is_media_server},
    infra::error::InfraError,
};

const DEFAULT_MEDIA_SERVER: &str = "plex";

/// Connection settings of the Plex server used for search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlexSettings {
    pub url: Url,
    pub token: Option<String>,
    pub verify_ssl: bool,
}

/// Validated preference set read from a YAML file.
#[derive(Debug, Clone)]
pub struct YamlPreferences {
    path: PathBuf,
    source_directory: PathBuf,
    series_files: Vec<PathBuf>,
    default_media_server: String,
    plex: Option<PlexSettings>,
    problems: Vec<String>,
}

impl YamlPreferences {
    /// Read and validate `path`.
    ///
    /// A readable but invalid file yields a preference set whose
    /// [`Preferences::is_valid`] is false; every problem is logged.
    pub fn load(path: &Path) -> Result<Self, InfraError> {
        let text = std::fs::read_to_string(path).map_err(|err| InfraError::file(path, err))?;
        let preferences = Self::parse(path, &text)?;

        if preferences.problems.is_empty() {
            info!(
                target = "tcm_webui::infra::preferences",
                path = %path.display(),
                series_files = preferences.series_files.len(),
                plex = preferences.plex.is_some(),
                "preferences loaded"
            );
        } else {
            for problem in &preferences.problems {
                error!(
                    target = "tcm_webui::infra::preferences",
                    path = %path.display(),
                    problem = %problem,
                    "invalid preferences"
                );
            }
        }
        Ok(preferences)
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self, InfraError> {
        let raw: RawPreferences = if text.trim().is_empty() {
            RawPreferences::default()
        } else {
            serde_yaml::from_str(text).map_err(|err| InfraError::yaml(path, err))?
        };

        let mut problems = Vec::new();

        let source_directory = match raw.options.source {
            Some(source) if !source.as_os_str().is_empty() => source,
            _ => {
                problems.push("`options.source` is required".to_string());
                PathBuf::new()
            }
        };

        let default_media_server = raw
            .options
            .default_media_server
            .map(|server| server.trim().to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_MEDIA_SERVER.to_string());
        if !is_media_server(&default_media_server) {
            problems.push(format!(
                "`options.default_media_server` must be one of {}",
                MEDIA_SERVERS.join(", ")
            ));
        }

        let plex = match raw.plex {
            None => None,
            Some(plex) => match plex.url.as_deref().map(Url::parse) {
                Some(Ok(url)) => Some(PlexSettings {
                    url,
                    token: plex.token.filter(|token| !token.trim().is_empty()),
                    verify_ssl: plex.verify_ssl.unwrap_or(true),
                }),
                Some(Err(err)) => {
                    problems.push(format!("`plex.url` is not a valid URL: {err}"));
                    None
                }
                None => {
                    problems.push("`plex.url` is required when `plex` is present".to_string());
                    None
                }
            },
        };

        Ok(Self {
            path: path.to_path_buf(),
            source_directory,
            series_files: raw.options.series.into_paths(),
            default_media_server,
            plex,
            problems,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn plex(&self) -> Option<&PlexSettings> {
        self.plex.as_ref()
    }

    pub fn problems(&self) -> &[String] {
        &self.problems
    }
}

impl Preferences for YamlPreferences {
    fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }

    fn series_files(&self) -> &[PathBuf] {
        &self.series_files
    }

    fn use_plex(&self) -> bool {
        self.plex.is_some()
    }

    fn default_media_server(&self) -> &str {
        &self.default_media_server
    }

    fn source_directory(&self) -> &Path {
        &self.source_directory
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPreferences {
    options: RawOptions,
    plex: Option<RawPlex>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawOptions {
    source: Option<PathBuf>,
    series: SeriesFiles,
    default_media_server: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPlex {
    url: Option<String>,
    token: Option<String>,
    verify_ssl: Option<bool>,
}

/// `options.series` may be a single path or a list of paths.
#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum SeriesFiles {
    #[default]
    None,
    One(PathBuf),
    Many(Vec<Option<PathBuf>>),
}

impl SeriesFiles {
    fn into_paths(self) -> Vec<PathBuf> {
        match self {
            SeriesFiles::None => Vec::new(),
            SeriesFiles::One(path) => vec![path],
            SeriesFiles::Many(paths) => paths.into_iter().map(Option::unwrap_or_default).collect(),
        }
    }
}
