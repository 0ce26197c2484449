//! The series configuration store.
//!
//! Readers get immutable snapshots; writers are serialized so each
//! load-mutate-persist cycle sees the result of the previous one.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use metrics::counter;
use serde_json::Value as JsonValue;
use serde_yaml::{Mapping, Value as YamlValue};
use tcm_webui_api_types::{ConfigPayload, ConfigWriteRequest, SeriesEntry};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    application::{error::AppError, lock::CacheCell},
    domain::{
        document::SeriesDocument,
        values::{
            ConfigMap, json_to_yaml, key_to_string, mapping_to_json, object_to_mapping,
            yaml_to_json,
        },
    },
    infra::error::InfraError,
};

/// A document together with the exact text it was read from or written as.
#[derive(Debug, Clone)]
pub struct PersistedDocument {
    pub document: SeriesDocument,
    pub text: String,
}

/// Backing storage of the series document.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    fn path(&self) -> &Path;

    /// Read the persisted document; `None` when there is no file yet.
    async fn read(&self) -> Result<Option<PersistedDocument>, InfraError>;

    /// Persist `document` in full, keeping the untouched parts of `previous`
    /// byte-for-byte when it is given.
    async fn write(
        &self,
        document: &SeriesDocument,
        previous: Option<&str>,
    ) -> Result<PersistedDocument, InfraError>;
}

#[derive(Debug, Clone)]
struct Snapshot {
    document: Arc<SeriesDocument>,
    text: Option<Arc<str>>,
}

pub struct SeriesStore {
    storage: Arc<dyn DocumentStorage>,
    snapshot: CacheCell<Option<Snapshot>>,
    writer: Mutex<()>,
}

impl SeriesStore {
    pub fn new(storage: Arc<dyn DocumentStorage>) -> Self {
        Self {
            storage,
            snapshot: CacheCell::empty("series document"),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        self.storage.path()
    }

    /// The cached document, reading or synthesizing it on first use.
    pub async fn load(&self) -> Result<Arc<SeriesDocument>, AppError> {
        Ok(self.snapshot().await?.document)
    }

    async fn snapshot(&self) -> Result<Snapshot, AppError> {
        let cached = self.snapshot.read().clone();
        if let Some(snapshot) = cached {
            return Ok(snapshot);
        }

        let loaded = match self.storage.read().await? {
            Some(persisted) => {
                debug!(
                    target = "tcm_webui::application::store",
                    path = %self.storage.path().display(),
                    series = persisted.document.series().len(),
                    "loaded series document"
                );
                Snapshot {
                    document: Arc::new(persisted.document),
                    text: Some(Arc::from(persisted.text)),
                }
            }
            None => Snapshot {
                document: Arc::new(SeriesDocument::empty()),
                text: None,
            },
        };

        let mut slot = self.snapshot.write();
        // A concurrent loader may have won; keep its snapshot so readers agree.
        let snapshot = slot.get_or_insert(loaded).clone();
        Ok(snapshot)
    }

    /// Project the document into its transport shape.
    pub async fn as_payload(&self) -> Result<ConfigPayload, AppError> {
        let document = self.load().await?;
        Ok(project(&document))
    }

    /// Replace the libraries (when given) and rebuild the series, then persist.
    pub async fn write(&self, request: ConfigWriteRequest) -> Result<(), AppError> {
        let _writer = self.writer.lock().await;
        let current = self.snapshot().await?;

        let mut document = SeriesDocument::clone(&current.document);
        if let Some(libraries) = request.libraries.as_ref() {
            document.replace_libraries(object_to_mapping(libraries));
        }
        document.replace_series(rebuild_series(&request.series));

        let persisted = self
            .storage
            .write(&document, current.text.as_deref())
            .await?;

        *self.snapshot.write() = Some(Snapshot {
            document: Arc::new(persisted.document),
            text: Some(Arc::from(persisted.text)),
        });

        counter!("tcm_config_write_total").increment(1);
        info!(
            target = "tcm_webui::application::store",
            path = %self.storage.path().display(),
            series = request.series.len(),
            libraries_replaced = request.libraries.is_some(),
            "series document written"
        );
        Ok(())
    }

    /// Independent deep copy of a series configuration.
    pub fn clone_series(&self, _name: &str, config: &ConfigMap) -> ConfigMap {
        config.clone()
    }
}

fn project(document: &SeriesDocument) -> ConfigPayload {
    let series = document
        .series()
        .iter()
        .map(|(name, config)| SeriesEntry {
            name: Some(key_to_string(name)),
            config: yaml_to_json(config),
        })
        .collect();

    ConfigPayload {
        libraries: mapping_to_json(document.libraries()),
        series,
    }
}

/// Entries without a name are skipped; a repeated name overwrites the
/// earlier value in place.
fn rebuild_series(entries: &[SeriesEntry]) -> Mapping {
    let mut series = Mapping::new();
    for entry in entries {
        let Some(name) = entry.name.as_deref().filter(|name| !name.is_empty()) else {
            continue;
        };
        let config = match &entry.config {
            JsonValue::Null => YamlValue::Mapping(Mapping::new()),
            other => json_to_yaml(other),
        };
        series.insert(YamlValue::String(name.to_string()), config);
    }
    series
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn rebuild_skips_unnamed_and_overwrites_duplicates_in_place() {
        let entries = vec![
            SeriesEntry {
                name: Some("A".into()),
                config: json!({"card_type": "standard"}),
            },
            SeriesEntry {
                name: None,
                config: json!({"card_type": "anime"}),
            },
            SeriesEntry {
                name: Some("B".into()),
                config: JsonValue::Null,
            },
            SeriesEntry {
                name: Some("A".into()),
                config: json!({"card_type": "logo"}),
            },
        ];

        let series = rebuild_series(&entries);
        let keys: Vec<_> = series.keys().map(key_to_string).collect();

        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(
            yaml_to_json(series.get("A").expect("A")),
            json!({"card_type": "logo"})
        );
        assert_eq!(yaml_to_json(series.get("B").expect("B")), json!({}));
    }

    #[test]
    fn projection_keeps_iteration_order() {
        let document = SeriesDocument::from_value(
            serde_yaml::from_str("libraries: {}\nseries:\n  Z: {}\n  A: {year: 2000}\n")
                .expect("yaml"),
        )
        .expect("document");

        let payload = project(&document);
        let names: Vec<_> = payload
            .series
            .iter()
            .filter_map(|entry| entry.name.clone())
            .collect();
        assert_eq!(names, vec!["Z", "A"]);
        assert_eq!(payload.series[1].config, json!({"year": 2000}));
    }
}
