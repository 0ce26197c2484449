//! The transient series entity a preview renders from.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde_json::Value as JsonValue;

use super::{
    catalog::{DEFAULT_CARD_TYPE, is_episode_data_source, is_known_card_type},
    error::DomainError,
    values::ConfigMap,
};

pub const DEFAULT_EPISODE_TEXT_FORMAT: &str = "EPISODE {episode_number}";
pub const DEFAULT_FONT_COLOR: &str = "#FFFFFF";

/// Characters that may not appear in a directory name on any supported platform.
const ILLEGAL_PATH_CHARACTERS: &[char] = &['<', '>', '"', '/', '\\', '|', '?', '*'];

/// Values a [`SeriesEntity`] needs beyond its own configuration.
#[derive(Debug, Clone)]
pub struct SeriesDefaults<'a> {
    pub source_directory: &'a Path,
    pub default_media_server: &'a str,
}

/// A library reference after finalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRef {
    pub name: String,
    pub path: PathBuf,
    pub media_server: String,
}

/// Identifiers of a series across metadata sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesIds {
    pub tmdb: Option<String>,
    pub tvdb: Option<String>,
    pub imdb: Option<String>,
    pub tvrage: Option<String>,
    pub emby: Option<String>,
    pub jellyfin: Option<String>,
    pub sonarr: Option<String>,
    pub plex: Option<String>,
}

impl SeriesIds {
    fn from_config(config: &ConfigMap) -> Self {
        Self {
            tmdb: id_field(config, "tmdb_id"),
            tvdb: id_field(config, "tvdb_id"),
            imdb: id_field(config, "imdb_id"),
            tvrage: id_field(config, "tvrage_id"),
            emby: id_field(config, "emby_id"),
            jellyfin: id_field(config, "jellyfin_id"),
            sonarr: id_field(config, "sonarr_id"),
            plex: id_field(config, "plex_id"),
        }
    }

    /// Fill every unset identifier from `other`, never overwriting.
    pub fn fill_from(&mut self, other: &SeriesIds) {
        let pairs = [
            (&mut self.tmdb, &other.tmdb),
            (&mut self.tvdb, &other.tvdb),
            (&mut self.imdb, &other.imdb),
            (&mut self.tvrage, &other.tvrage),
            (&mut self.emby, &other.emby),
            (&mut self.jellyfin, &other.jellyfin),
            (&mut self.sonarr, &other.sonarr),
            (&mut self.plex, &other.plex),
        ];
        for (mine, theirs) in pairs {
            if mine.is_none() {
                mine.clone_from(theirs);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// How a card title is cased after replacements are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FontCase {
    Blank,
    Lower,
    Source,
    Title,
    #[default]
    Upper,
}

impl FontCase {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "blank" => Some(Self::Blank),
            "lower" => Some(Self::Lower),
            "source" => Some(Self::Source),
            "title" => Some(Self::Title),
            "upper" => Some(Self::Upper),
            _ => None,
        }
    }

    pub fn apply(self, text: &str) -> String {
        match self {
            Self::Blank => String::new(),
            Self::Lower => text.to_lowercase(),
            Self::Source => text.to_string(),
            Self::Title => title_case(text),
            Self::Upper => text.to_uppercase(),
        }
    }
}

/// Resolved font settings of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub file: Option<PathBuf>,
    /// Scale factor; `1.0` is the card type's native size.
    pub size: f32,
    pub color: String,
    pub case: FontCase,
    pub replacements: Vec<(String, String)>,
    pub validate: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            file: None,
            size: 1.0,
            color: DEFAULT_FONT_COLOR.to_string(),
            case: FontCase::default(),
            replacements: Vec::new(),
            validate: true,
        }
    }
}

impl FontSpec {
    fn from_config(value: Option<&JsonValue>) -> Result<Self, DomainError> {
        let mut spec = Self::default();
        let Some(object) = value.and_then(JsonValue::as_object) else {
            return Ok(spec);
        };

        if let Some(file) = object.get("file").and_then(JsonValue::as_str)
            && !file.trim().is_empty()
        {
            spec.file = Some(PathBuf::from(file));
        }
        if let Some(size) = object.get("size") {
            spec.size = parse_percentage(size).ok_or_else(|| {
                DomainError::validation(format!("font size `{size}` is not a percentage"))
            })?;
        }
        if let Some(color) = object.get("color").and_then(JsonValue::as_str) {
            spec.color = color.to_string();
        }
        if let Some(case) = object.get("case").and_then(JsonValue::as_str) {
            spec.case = FontCase::parse(case)
                .ok_or_else(|| DomainError::validation(format!("unknown font case `{case}`")))?;
        }
        if let Some(replacements) = object.get("replacements").and_then(JsonValue::as_object) {
            spec.replacements = replacements
                .iter()
                .map(|(from, to)| (from.clone(), scalar_text(to).unwrap_or_default()))
                .collect();
        }
        if let Some(validate) = object.get("validate").and_then(JsonValue::as_bool) {
            spec.validate = validate;
        }
        Ok(spec)
    }

    /// Apply replacements, then the case function.
    pub fn convert_title(&self, title: &str) -> String {
        let replaced = self
            .replacements
            .iter()
            .fold(title.to_string(), |text, (from, to)| text.replace(from, to));
        self.case.apply(&replaced)
    }
}

/// A series with every field a preview needs, validated.
#[derive(Debug, Clone)]
pub struct SeriesEntity {
    pub name: String,
    pub year: u32,
    /// `Name (Year)`, the form used for directory names.
    pub full_name: String,
    pub card_type: String,
    pub episode_data_source: String,
    pub library: Option<LibraryRef>,
    pub media_directory: PathBuf,
    pub source_directory: PathBuf,
    pub font: FontSpec,
    pub episode_text_format: String,
    pub season_titles: BTreeMap<u32, String>,
    pub hide_season_text: bool,
    pub filename_format: Option<String>,
    pub ids: SeriesIds,
    pub extras: ConfigMap,
}

impl SeriesEntity {
    /// Build a series from its finalized configuration.
    pub fn from_config(
        name: &str,
        config: &ConfigMap,
        defaults: &SeriesDefaults<'_>,
    ) -> Result<Self, DomainError> {
        let (title, name_year) = split_year(name);
        let title = config
            .get("name")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .unwrap_or(title);
        if title.trim().is_empty() {
            return Err(DomainError::validation("series name must not be empty"));
        }

        let year = match config.get("year") {
            Some(value) => parse_year(value).ok_or_else(|| {
                DomainError::validation(format!("series `{name}` has an invalid year `{value}`"))
            })?,
            None => name_year.ok_or_else(|| {
                DomainError::validation(format!(
                    "series `{name}` needs a year, either as `year` or a trailing `(YYYY)`"
                ))
            })?,
        };
        let full_name = format!("{title} ({year})");

        let card_type = optional_text(config, "card_type")
            .unwrap_or_else(|| DEFAULT_CARD_TYPE.to_string());
        if !is_known_card_type(&card_type) {
            return Err(DomainError::validation(format!(
                "unknown card type `{card_type}`"
            )));
        }

        let library = library_ref(config.get("library"))?;

        let episode_data_source = optional_text(config, "episode_data_source")
            .map(|source| source.to_ascii_lowercase())
            .or_else(|| library.as_ref().map(|lib| lib.media_server.clone()))
            .unwrap_or_else(|| defaults.default_media_server.to_ascii_lowercase());
        if !is_episode_data_source(&episode_data_source) {
            return Err(DomainError::validation(format!(
                "unknown episode data source `{episode_data_source}`"
            )));
        }

        let clean_name = clean_path_component(&full_name);
        let media_directory = match optional_text(config, "media_directory") {
            Some(directory) => PathBuf::from(directory),
            None => library
                .as_ref()
                .map(|lib| lib.path.join(&clean_name))
                .ok_or_else(|| {
                    DomainError::validation(format!(
                        "series `{name}` needs a library or a `media_directory`"
                    ))
                })?,
        };

        let (season_titles, hide_season_text) = seasons(config.get("seasons"))?;

        Ok(Self {
            name: title,
            year,
            source_directory: defaults.source_directory.join(&clean_name),
            full_name,
            card_type,
            episode_data_source,
            library,
            media_directory,
            font: FontSpec::from_config(config.get("font"))?,
            episode_text_format: optional_text(config, "episode_text_format")
                .unwrap_or_else(|| DEFAULT_EPISODE_TEXT_FORMAT.to_string()),
            season_titles,
            hide_season_text,
            filename_format: optional_text(config, "filename_format"),
            ids: SeriesIds::from_config(config),
            extras: config
                .get("extras")
                .and_then(JsonValue::as_object)
                .cloned()
                .unwrap_or_default(),
        })
    }

    /// Season label for `season`, falling back to `Specials`/`Season N`.
    pub fn season_text(&self, season: u32) -> String {
        match self.season_titles.get(&season) {
            Some(title) => title.clone(),
            None if season == 0 => "Specials".to_string(),
            None => format!("Season {season}"),
        }
    }

    /// Expand `episode_text_format` for an episode number text.
    pub fn episode_text(&self, episode_number: &str, season: u32) -> String {
        self.episode_text_format
            .replace("{episode_number}", episode_number)
            .replace("{season_number}", &season.to_string())
    }
}

/// Make `name` safe to use as a single directory name.
pub fn clean_path_component(name: &str) -> String {
    name.replace(':', " -")
        .chars()
        .filter(|ch| !ILLEGAL_PATH_CHARACTERS.contains(ch) && !ch.is_control())
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .to_string()
}

fn split_year(name: &str) -> (String, Option<u32>) {
    let trimmed = name.trim();
    if let Some(inner) = trimmed.strip_suffix(')')
        && let Some(open) = inner.rfind('(')
    {
        let digits = &inner[open + 1..];
        if digits.len() == 4
            && let Ok(year) = digits.parse::<u32>()
        {
            return (inner[..open].trim_end().to_string(), Some(year));
        }
    }
    (trimmed.to_string(), None)
}

fn parse_year(value: &JsonValue) -> Option<u32> {
    let year = match value {
        JsonValue::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        JsonValue::String(text) => text.trim().parse().ok(),
        _ => None,
    }?;
    (1000..=9999).contains(&year).then_some(year)
}

fn parse_percentage(value: &JsonValue) -> Option<f32> {
    let percent = match value {
        JsonValue::Number(number) => number.as_f64()?,
        JsonValue::String(text) => text.trim().trim_end_matches('%').trim().parse().ok()?,
        _ => return None,
    };
    (percent > 0.0).then_some((percent / 100.0) as f32)
}

fn library_ref(value: Option<&JsonValue>) -> Result<Option<LibraryRef>, DomainError> {
    let Some(object) = value.and_then(JsonValue::as_object) else {
        return Ok(None);
    };
    let path = object
        .get("path")
        .and_then(JsonValue::as_str)
        .filter(|path| !path.trim().is_empty())
        .ok_or_else(|| DomainError::validation("library is missing a `path`"))?;
    Ok(Some(LibraryRef {
        name: object
            .get("name")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string(),
        path: PathBuf::from(path),
        media_server: object
            .get("media_server")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_ascii_lowercase(),
    }))
}

fn seasons(value: Option<&JsonValue>) -> Result<(BTreeMap<u32, String>, bool), DomainError> {
    let mut titles = BTreeMap::new();
    let mut hide = false;
    let Some(object) = value.and_then(JsonValue::as_object) else {
        return Ok((titles, hide));
    };

    for (key, value) in object {
        if key == "hide" {
            hide = value.as_bool().unwrap_or(false);
            continue;
        }
        // Range keys like `1-4` belong to the production sync, not a single preview.
        let Ok(season) = key.parse::<u32>() else {
            continue;
        };
        let title = scalar_text(value).ok_or_else(|| {
            DomainError::validation(format!("season {season} title must be text"))
        })?;
        titles.insert(season, title);
    }
    Ok((titles, hide))
}

fn optional_text(config: &ConfigMap, key: &str) -> Option<String> {
    config
        .get(key)
        .and_then(scalar_text)
        .filter(|text| !text.trim().is_empty())
}

fn id_field(config: &ConfigMap, key: &str) -> Option<String> {
    optional_text(config, key)
}

fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Number(number) => Some(number.to_string()),
        JsonValue::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn defaults() -> SeriesDefaults<'static> {
        SeriesDefaults {
            source_directory: Path::new("/source"),
            default_media_server: "plex",
        }
    }

    fn config(value: JsonValue) -> ConfigMap {
        value.as_object().cloned().expect("object fixture")
    }

    #[test]
    fn builds_entity_from_finalized_library() {
        let cfg = config(json!({
            "year": 2008,
            "library": {"name": "TV", "path": "/media/tv", "media_server": "plex"},
            "tvdb_id": 81189,
        }));

        let series = SeriesEntity::from_config("Breaking Bad", &cfg, &defaults())
            .expect("valid series");

        assert_eq!(series.full_name, "Breaking Bad (2008)");
        assert_eq!(series.card_type, "standard");
        assert_eq!(series.episode_data_source, "plex");
        assert_eq!(
            series.media_directory,
            Path::new("/media/tv/Breaking Bad (2008)")
        );
        assert_eq!(
            series.source_directory,
            Path::new("/source/Breaking Bad (2008)")
        );
        assert_eq!(series.ids.tvdb.as_deref(), Some("81189"));
    }

    #[test]
    fn year_is_read_from_trailing_parentheses() {
        let cfg = config(json!({"media_directory": "/m"}));
        let series = SeriesEntity::from_config("Dark (2017)", &cfg, &defaults())
            .expect("valid series");

        assert_eq!(series.name, "Dark");
        assert_eq!(series.year, 2017);
    }

    #[test]
    fn missing_year_is_a_validation_error() {
        let cfg = config(json!({"media_directory": "/m"}));
        let err = SeriesEntity::from_config("Dark", &cfg, &defaults()).expect_err("no year");
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn unknown_card_type_and_source_are_rejected() {
        let cfg = config(json!({"year": 2000, "media_directory": "/m", "card_type": "bogus"}));
        assert!(SeriesEntity::from_config("A", &cfg, &defaults()).is_err());

        let cfg = config(json!({"year": 2000, "media_directory": "/m", "episode_data_source": "kodi"}));
        assert!(SeriesEntity::from_config("A", &cfg, &defaults()).is_err());
    }

    #[test]
    fn missing_media_directory_is_rejected() {
        let cfg = config(json!({"year": 2000}));
        let err = SeriesEntity::from_config("A", &cfg, &defaults()).expect_err("no directory");
        assert!(err.to_string().contains("media_directory"));
    }

    #[test]
    fn title_conversion_applies_replacements_before_case() {
        let cfg = config(json!({
            "year": 2000,
            "media_directory": "/m",
            "font": {"case": "upper", "replacements": {"&": "and"}, "size": "120%"},
        }));
        let series = SeriesEntity::from_config("A", &cfg, &defaults()).expect("valid series");

        assert_eq!(series.font.convert_title("Salt & Pepper"), "SALT AND PEPPER");
        assert!((series.font.size - 1.2).abs() < f32::EPSILON);
    }

    #[test]
    fn season_titles_and_episode_text() {
        let cfg = config(json!({
            "year": 2000,
            "media_directory": "/m",
            "seasons": {"hide": true, "1": "Book One", "2-4": "Later"},
            "episode_text_format": "CHAPTER {episode_number}",
        }));
        let series = SeriesEntity::from_config("A", &cfg, &defaults()).expect("valid series");

        assert!(series.hide_season_text);
        assert_eq!(series.season_text(1), "Book One");
        assert_eq!(series.season_text(0), "Specials");
        assert_eq!(series.season_text(3), "Season 3");
        assert_eq!(series.episode_text("3-4", 1), "CHAPTER 3-4");
    }

    #[test]
    fn path_components_are_cleaned() {
        assert_eq!(clean_path_component("Star Trek: Picard (2020)"), "Star Trek - Picard (2020)");
        assert_eq!(clean_path_component("What? If/When"), "What IfWhen");
    }

    #[test]
    fn ids_fill_without_overwriting() {
        let mut ids = SeriesIds {
            tmdb: Some("1".into()),
            ..SeriesIds::default()
        };
        ids.fill_from(&SeriesIds {
            tmdb: Some("2".into()),
            imdb: Some("tt3".into()),
            ..SeriesIds::default()
        });
        assert_eq!(ids.tmdb.as_deref(), Some("1"));
        assert_eq!(ids.imdb.as_deref(), Some("tt3"));
    }
}
