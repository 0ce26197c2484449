//! The render request for a single title card.

use std::path::PathBuf;

use super::{
    episodes::Episode,
    error::DomainError,
    series::{FontSpec, SeriesEntity},
    values::ConfigMap,
};

/// Joins the season and episode text on the line below the title.
pub const EPISODE_LINE_SEPARATOR: &str = " - ";

/// Everything a renderer needs to draw one card.
#[derive(Debug, Clone)]
pub struct TitleCard {
    pub card_type: String,
    /// Display title after font replacements and casing.
    pub title: String,
    pub season_text: String,
    pub episode_text: String,
    pub hide_season_text: bool,
    pub font: FontSpec,
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Series extras overlaid with the episode's own characteristics.
    pub extras: ConfigMap,
}

impl TitleCard {
    pub fn new(series: &SeriesEntity, episode: &Episode) -> Result<Self, DomainError> {
        let destination = episode.destination.clone().ok_or_else(|| {
            DomainError::invariant(format!("episode {} has no destination", episode.key()))
        })?;

        let mut extras = series.extras.clone();
        for (key, value) in &episode.extra_characteristics {
            extras.insert(key.clone(), value.clone());
        }

        Ok(Self {
            card_type: series.card_type.clone(),
            title: series.font.convert_title(&episode.title),
            season_text: series.season_text(episode.season),
            episode_text: series.episode_text(&episode.episode_number_text(), episode.season),
            hide_season_text: series.hide_season_text,
            font: series.font.clone(),
            source: episode.source.clone(),
            destination,
            extras,
        })
    }

    /// The season/episode line exactly as it is drawn.
    pub fn episode_line(&self) -> String {
        if self.hide_season_text {
            self.episode_text.clone()
        } else {
            format!(
                "{}{EPISODE_LINE_SEPARATOR}{}",
                self.season_text, self.episode_text
            )
        }
    }
}
