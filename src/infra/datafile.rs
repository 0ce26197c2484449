//! Show services backed by the per-series datafile the production sync writes.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use tracing::debug;

use crate::{
    application::collaborators::{
        CollaboratorError, SearchClient, ShowServices, ShowServicesFactory,
    },
    domain::{
        episodes::Episode,
        series::{SeriesEntity, SeriesIds, clean_path_component},
        values::{ConfigMap, key_to_string, yaml_to_json},
    },
    infra::error::InfraError,
};

pub const DATAFILE_NAME: &str = "data.yml";
const SYNC_STEP: &str = "sync";
const DEFAULT_FILENAME_FORMAT: &str = "{full_name} - S{season:02}E{episode:02}";
const CARD_EXTENSION: &str = "jpg";
const SEARCH_CANDIDATES: usize = 5;

/// Episode fields read into [`Episode`] itself rather than its extras.
const EPISODE_FIELDS: &[&str] = &["title", "abs_number"];

#[derive(Debug, Clone, Copy, Default)]
pub struct DatafileServicesFactory;

impl ShowServicesFactory for DatafileServicesFactory {
    fn bind(
        &self,
        _series: &SeriesEntity,
        search: Option<Arc<dyn SearchClient>>,
    ) -> Result<Box<dyn ShowServices>, CollaboratorError> {
        Ok(Box::new(DatafileShowServices { search }))
    }
}

pub struct DatafileShowServices {
    search: Option<Arc<dyn SearchClient>>,
}

impl DatafileShowServices {
    pub fn datafile_path(series: &SeriesEntity) -> PathBuf {
        series.source_directory.join(DATAFILE_NAME)
    }

    async fn ids_from_search(
        &self,
        series: &SeriesEntity,
    ) -> Result<Option<SeriesIds>, CollaboratorError> {
        let Some(search) = self.search.as_ref() else {
            return Ok(None);
        };
        let matches = search
            .search_series(&series.name, SEARCH_CANDIDATES)
            .await?;

        Ok(matches
            .into_iter()
            .find(|found| {
                found.title.eq_ignore_ascii_case(&series.name) && found.year == Some(series.year)
            })
            .map(|found| ids_from_map(&found.ids)))
    }
}

#[async_trait]
impl ShowServices for DatafileShowServices {
    async fn resolve_series_ids(
        &self,
        series: &SeriesEntity,
    ) -> Result<SeriesIds, CollaboratorError> {
        let mut ids = series.ids.clone();
        if (ids.tmdb.is_none() || ids.tvdb.is_none() || ids.imdb.is_none())
            && let Some(found) = self.ids_from_search(series).await?
        {
            ids.fill_from(&found);
        }
        Ok(ids)
    }

    async fn read_episodes(
        &self,
        series: &SeriesEntity,
    ) -> Result<Vec<Episode>, CollaboratorError> {
        let path = Self::datafile_path(series);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(CollaboratorError::missing_resource(
                    format!("Episode datafile `{}` is missing", path.display()),
                    SYNC_STEP,
                ));
            }
            Err(err) => return Err(InfraError::file(&path, err).into()),
        };

        let root: YamlValue =
            serde_yaml::from_str(&text).map_err(|err| InfraError::yaml(&path, err))?;
        let episodes = parse_datafile(&root)
            .map_err(|reason| {
                CollaboratorError::Resolution(format!("{}: {reason}", path.display()))
            })?
            .into_iter()
            .map(|mut episode| {
                episode.destination = Some(destination(series, &episode));
                episode
            })
            .collect::<Vec<_>>();

        debug!(
            target = "tcm_webui::infra::datafile",
            series = %series.full_name,
            episodes = episodes.len(),
            "episodes read from datafile"
        );
        Ok(episodes)
    }

    async fn select_source_image(
        &self,
        series: &SeriesEntity,
        episode: &mut Episode,
    ) -> Result<(), CollaboratorError> {
        episode.source = series
            .source_directory
            .join(format!("{}.{CARD_EXTENSION}", episode.key()));
        Ok(())
    }
}

/// Episodes in datafile order: `data -> "Season N" -> episode number -> fields`.
fn parse_datafile(root: &YamlValue) -> Result<Vec<Episode>, String> {
    let Some(seasons) = root.get("data") else {
        return Ok(Vec::new());
    };
    let seasons = match seasons {
        YamlValue::Null => return Ok(Vec::new()),
        YamlValue::Mapping(seasons) => seasons,
        _ => return Err("`data` must be a mapping of seasons".to_string()),
    };

    let mut episodes = Vec::new();
    for (season_key, season_episodes) in seasons {
        let label = key_to_string(season_key);
        let season =
            parse_season(&label).ok_or_else(|| format!("unrecognised season `{label}`"))?;
        let Some(season_episodes) = season_episodes.as_mapping() else {
            continue;
        };

        for (episode_key, fields) in season_episodes {
            let number = key_to_string(episode_key);
            let episode_number = number
                .parse::<u32>()
                .map_err(|_| format!("season {season} has an invalid episode number `{number}`"))?;
            episodes.push(parse_episode(season, episode_number, fields)?);
        }
    }
    Ok(episodes)
}

fn parse_season(label: &str) -> Option<u32> {
    let trimmed = label.trim();
    if trimmed.eq_ignore_ascii_case("specials") {
        return Some(0);
    }
    trimmed
        .strip_prefix("Season")
        .or_else(|| trimmed.strip_prefix("season"))
        .unwrap_or(trimmed)
        .trim()
        .parse()
        .ok()
}

fn parse_episode(season: u32, number: u32, fields: &YamlValue) -> Result<Episode, String> {
    let fields = match yaml_to_json(fields) {
        JsonValue::Object(fields) => fields,
        JsonValue::Null => ConfigMap::new(),
        _ => return Err(format!("episode {season}x{number} must be a mapping")),
    };

    let title = match fields.get("title") {
        Some(JsonValue::String(title)) => title.clone(),
        Some(JsonValue::Array(lines)) => lines
            .iter()
            .filter_map(|line| match line {
                JsonValue::String(text) => Some(text.clone()),
                JsonValue::Number(number) => Some(number.to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" "),
        Some(JsonValue::Number(value)) => value.to_string(),
        _ => return Err(format!("episode {season}x{number} has no title")),
    };

    let mut episode = Episode::new(season, number, title);
    episode.absolute = fields
        .get("abs_number")
        .and_then(JsonValue::as_u64)
        .and_then(|value| u32::try_from(value).ok());
    episode.extra_characteristics = fields
        .into_iter()
        .filter(|(key, _)| !EPISODE_FIELDS.contains(&key.as_str()))
        .collect();
    Ok(episode)
}

fn ids_from_map(ids: &ConfigMap) -> SeriesIds {
    let get = |key: &str| {
        ids.get(key).and_then(|value| match value {
            JsonValue::String(text) => Some(text.clone()),
            JsonValue::Number(number) => Some(number.to_string()),
            _ => None,
        })
    };
    SeriesIds {
        tmdb: get("tmdb_id"),
        tvdb: get("tvdb_id"),
        imdb: get("imdb_id"),
        tvrage: get("tvrage_id"),
        emby: get("emby_id"),
        jellyfin: get("jellyfin_id"),
        sonarr: get("sonarr_id"),
        plex: get("plex_id"),
    }
}

/// Where the production sync would write this episode's card.
fn destination(series: &SeriesEntity, episode: &Episode) -> PathBuf {
    let format = series
        .filename_format
        .as_deref()
        .unwrap_or(DEFAULT_FILENAME_FORMAT);
    let name = format
        .replace("{full_name}", &series.full_name)
        .replace("{name}", &series.name)
        .replace("{year}", &series.year.to_string())
        .replace("{season:02}", &format!("{:02}", episode.season))
        .replace("{season}", &episode.season.to_string())
        .replace("{episode:02}", &format!("{:02}", episode.episode))
        .replace("{episode}", &episode.episode.to_string())
        .replace("{title}", &episode.title);
    let file = format!("{}.{CARD_EXTENSION}", clean_path_component(&name));

    season_folder(&series.media_directory, episode.season).join(file)
}

fn season_folder(media_directory: &Path, season: u32) -> PathBuf {
    if season == 0 {
        media_directory.join("Specials")
    } else {
        media_directory.join(format!("Season {season}"))
    }
}
