//! Shared runtime context: preference set, file resolution and the lazily
//! constructed search client.

use std::{
    collections::HashSet,
    fmt,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use metrics::counter;
use once_cell::sync::OnceCell;
use tracing::info;

use crate::application::{
    collaborators::{CollaboratorError, Preferences, SearchClient, SearchClientFactory},
    error::AppError,
};

const PREFERENCES_FILE: &str = "preferences.yml";
const SERIES_FILE: &str = "tv.yml";

/// Inputs to configuration-file resolution.
#[derive(Debug, Clone)]
pub struct DocumentLocations {
    /// Explicit override, typically from `TCM_PREFERENCES`.
    pub override_path: Option<PathBuf>,
    /// Directory holding the container-default files.
    pub container_root: PathBuf,
    pub install_root: PathBuf,
}

/// Resolve the configuration file: explicit override, then the container
/// default if it exists, then `config/preferences.yml` under the install root.
pub fn resolve_document_path(locations: &DocumentLocations) -> PathBuf {
    if let Some(path) = locations
        .override_path
        .as_ref()
        .filter(|path| !path.as_os_str().is_empty())
    {
        return path.clone();
    }

    let container = locations.container_root.join(PREFERENCES_FILE);
    if container.exists() {
        return container;
    }

    locations.install_root.join("config").join(PREFERENCES_FILE)
}

pub struct RuntimeContext {
    preferences: Arc<dyn Preferences>,
    document_path: PathBuf,
    container_root: PathBuf,
    is_docker: bool,
    search_factory: Arc<dyn SearchClientFactory>,
    search_client: OnceCell<Arc<dyn SearchClient>>,
}

impl fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("document_path", &self.document_path)
            .field("container_root", &self.container_root)
            .field("is_docker", &self.is_docker)
            .field("search_client_ready", &self.search_client.get().is_some())
            .finish()
    }
}

impl RuntimeContext {
    /// Build the context, refusing an invalid preference set.
    pub fn new(
        preferences: Arc<dyn Preferences>,
        document_path: PathBuf,
        container_root: PathBuf,
        is_docker: bool,
        search_factory: Arc<dyn SearchClientFactory>,
    ) -> Result<Self, AppError> {
        if !preferences.is_valid() {
            return Err(AppError::configuration(
                "Preferences file is invalid; see logs for details",
            ));
        }

        Ok(Self {
            preferences,
            document_path,
            container_root,
            is_docker,
            search_factory,
            search_client: OnceCell::new(),
        })
    }

    pub fn preferences(&self) -> &Arc<dyn Preferences> {
        &self.preferences
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    pub fn is_docker(&self) -> bool {
        self.is_docker
    }

    /// Candidate series files in priority order, without duplicates.
    pub fn tv_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut seen = HashSet::new();

        for path in self.preferences.series_files() {
            if path.as_os_str().is_empty() {
                continue;
            }
            if seen.insert(normalize(path)) {
                files.push(path.clone());
            }
        }

        let fallbacks = [
            self.container_root.join(SERIES_FILE),
            self.document_path.with_file_name(SERIES_FILE),
        ];
        for candidate in fallbacks {
            if seen.contains(&normalize(&candidate)) || !candidate.exists() {
                continue;
            }
            seen.insert(normalize(&candidate));
            files.push(candidate);
        }

        files
    }

    /// The series file the store operates on.
    pub fn default_document(&self) -> Result<PathBuf, AppError> {
        self.tv_files().into_iter().next().ok_or_else(|| {
            AppError::configuration("No series YAML files are configured in preferences.")
        })
    }

    /// The shared search client, constructed on first use.
    ///
    /// Concurrent first callers block on a single construction and all receive
    /// the same instance. A failed construction is not cached.
    pub fn get_search_client(&self) -> Result<Arc<dyn SearchClient>, AppError> {
        if !self.preferences.use_plex() {
            return Err(AppError::capability(
                "Plex is not enabled in the preferences file",
            ));
        }
        self.connect_search_client().map_err(AppError::from)
    }

    /// `None` when the feature is off; a failed construction is returned as is.
    pub fn search_client_if_enabled(
        &self,
    ) -> Result<Option<Arc<dyn SearchClient>>, CollaboratorError> {
        if !self.preferences.use_plex() {
            return Ok(None);
        }
        self.connect_search_client().map(Some)
    }

    fn connect_search_client(&self) -> Result<Arc<dyn SearchClient>, CollaboratorError> {
        self.search_client
            .get_or_try_init(|| {
                counter!("tcm_search_client_init_total").increment(1);
                let client = self.search_factory.connect()?;
                info!(target = "tcm_webui::application::context", "search client ready");
                Ok::<_, CollaboratorError>(client)
            })
            .map(Arc::clone)
    }
}

/// Lexical normalization used to compare declared paths.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
