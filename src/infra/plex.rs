//! Plex search client.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};
use tracing::debug;

use crate::{
    application::collaborators::{
        CollaboratorError, SearchClient, SearchClientFactory, SeriesMatch,
    },
    domain::values::ConfigMap,
    infra::preferences::PlexSettings,
};

const TOKEN_HEADER: &str = "X-Plex-Token";
/// Plex metadata type of a show.
const SHOW_TYPE: &str = "2";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn user_agent() -> &'static str {
    concat!("tcm-webui/", env!("CARGO_PKG_VERSION"))
}

/// Builds [`PlexSearchClient`]s from the preference set's Plex section.
#[derive(Debug, Clone)]
pub struct PlexClientFactory {
    settings: Option<PlexSettings>,
}

impl PlexClientFactory {
    pub fn new(settings: Option<PlexSettings>) -> Self {
        Self { settings }
    }
}

impl SearchClientFactory for PlexClientFactory {
    fn connect(&self) -> Result<Arc<dyn SearchClient>, CollaboratorError> {
        let settings = self.settings.clone().ok_or_else(|| {
            CollaboratorError::Configuration("Plex is not configured".to_string())
        })?;
        Ok(Arc::new(PlexSearchClient::new(settings)?))
    }
}

#[derive(Debug, Clone)]
pub struct PlexSearchClient {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl PlexSearchClient {
    pub fn new(settings: PlexSettings) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .user_agent(user_agent())
            .connect_timeout(CONNECT_TIMEOUT)
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .build()
            .map_err(|err| {
                CollaboratorError::Configuration(format!("failed to build Plex client: {err}"))
            })?;
        Ok(Self {
            client,
            base: settings.url,
            token: settings.token,
        })
    }

    fn search_url(&self, query: &str, limit: usize) -> Result<Url, CollaboratorError> {
        let mut url = self.base.join("search").map_err(|err| {
            CollaboratorError::Configuration(format!("invalid Plex URL: {err}"))
        })?;
        url.query_pairs_mut()
            .append_pair("type", SHOW_TYPE)
            .append_pair("query", query)
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }
}

#[async_trait]
impl SearchClient for PlexSearchClient {
    async fn search_series(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SeriesMatch>, CollaboratorError> {
        let url = self.search_url(query, limit)?;
        let mut request = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = self.token.as_deref() {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| CollaboratorError::Unavailable(format!("Plex request failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Unavailable(format!(
                "Plex search returned status {status}"
            )));
        }

        let body: SearchEnvelope = response.json().await.map_err(|err| {
            CollaboratorError::Unavailable(format!("Plex search returned malformed JSON: {err}"))
        })?;

        let matches: Vec<SeriesMatch> = body
            .media_container
            .metadata
            .into_iter()
            .filter(|item| item.kind.as_deref().is_none_or(|kind| kind == "show"))
            .take(limit)
            .map(SeriesMatch::from)
            .collect();
        debug!(
            target = "tcm_webui::infra::plex",
            query,
            results = matches.len(),
            "plex search complete"
        );
        Ok(matches)
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(rename = "MediaContainer")]
    media_container: MediaContainer,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MediaContainer {
    #[serde(rename = "Metadata")]
    metadata: Vec<PlexShow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlexShow {
    title: String,
    year: Option<u32>,
    #[serde(rename = "type")]
    kind: Option<String>,
    summary: Option<String>,
    #[serde(rename = "librarySectionTitle")]
    library: Option<String>,
    #[serde(rename = "ratingKey")]
    rating_key: Option<String>,
    #[serde(rename = "Guid")]
    guids: Vec<PlexGuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlexGuid {
    id: String,
}

impl From<PlexShow> for SeriesMatch {
    fn from(show: PlexShow) -> Self {
        let mut ids = ConfigMap::new();
        for guid in &show.guids {
            let Some((source, value)) = guid.id.split_once("://") else {
                continue;
            };
            let id = match value.parse::<u64>() {
                Ok(number) => json!(number),
                Err(_) => JsonValue::String(value.to_string()),
            };
            ids.insert(format!("{source}_id"), id);
        }
        if let Some(key) = show.rating_key {
            ids.insert("plex_id".into(), JsonValue::String(key));
        }

        SeriesMatch {
            title: show.title,
            year: show.year,
            library: show.library,
            summary: show.summary.filter(|summary| !summary.is_empty()),
            ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> PlexSearchClient {
        PlexSearchClient::new(PlexSettings {
            url: Url::parse(url).expect("url"),
            token: Some("token".into()),
            verify_ssl: true,
        })
        .expect("client")
    }

    #[test]
    fn search_url_encodes_query() {
        let url = client("http://plex:32400/")
            .search_url("Star Trek: Picard", 15)
            .expect("url");
        assert_eq!(
            url.as_str(),
            "http://plex:32400/search?type=2&query=Star+Trek%3A+Picard&limit=15"
        );
    }

    #[test]
    fn show_metadata_maps_guids_to_ids() {
        let body: SearchEnvelope = serde_json::from_value(json!({
            "MediaContainer": {
                "size": 1,
                "Metadata": [{
                    "title": "Severance",
                    "year": 2022,
                    "type": "show",
                    "librarySectionTitle": "TV Shows",
                    "summary": "",
                    "ratingKey": "4312",
                    "Guid": [{"id": "imdb://tt11280740"}, {"id": "tmdb://95396"}, {"id": "tvdb://371980"}]
                }]
            }
        }))
        .expect("envelope");

        let found = SeriesMatch::from(
            body.media_container
                .metadata
                .into_iter()
                .next()
                .expect("one show"),
        );

        assert_eq!(found.title, "Severance");
        assert_eq!(found.year, Some(2022));
        assert_eq!(found.library.as_deref(), Some("TV Shows"));
        assert!(found.summary.is_none());
        assert_eq!(found.ids["imdb_id"], json!("tt11280740"));
        assert_eq!(found.ids["tmdb_id"], json!(95396));
        assert_eq!(found.ids["plex_id"], json!("4312"));
    }

    #[test]
    fn factory_without_settings_is_a_configuration_error() {
        let err = PlexClientFactory::new(None)
            .connect()
            .err()
            .expect("no settings");
        assert!(matches!(err, CollaboratorError::Configuration(_)));
    }
}
