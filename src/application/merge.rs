use std::sync::Arc;

use crate::{
    application::{collaborators::Preferences, error::AppError, store::SeriesStore},
    domain::values::{ConfigMap, mapping_to_json},
};

/// Resolves candidate series configurations against the persisted library
/// and font definitions.
pub struct ConfigMerger {
    store: Arc<SeriesStore>,
    preferences: Arc<dyn Preferences>,
}

impl ConfigMerger {
    pub fn new(store: Arc<SeriesStore>, preferences: Arc<dyn Preferences>) -> Self {
        Self { store, preferences }
    }

    /// Finalize `candidate` without persisting anything or touching the caller's copy.
    pub async fn merge(
        &self,
        show_name: &str,
        candidate: &ConfigMap,
    ) -> Result<ConfigMap, AppError> {
        let document = self.store.load().await?;
        let libraries = mapping_to_json(document.libraries());
        let fonts = document.fonts().map(mapping_to_json).unwrap_or_default();

        let working = self.store.clone_series(show_name, candidate);

        self.preferences
            .finalize_series(show_name, &working, &libraries, &fonts)
            .map_err(AppError::from)
    }
}
