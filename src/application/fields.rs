//! Field metadata the editor UI renders its series form from.

use std::path::Path;

use tcm_webui_api_types::{Choice, FieldDescriptor, JsonObject, MetaResponse};

use crate::domain::catalog::{
    CARD_TYPES, DEFAULT_CARD_TYPE, EPISODE_DATA_SOURCES, FONT_CASES, STYLES, display_label,
};

struct FieldTemplate {
    id: &'static str,
    label: &'static str,
    path: &'static [&'static str],
    kind: &'static str,
    default: Option<&'static str>,
}

const fn field(
    id: &'static str,
    label: &'static str,
    path: &'static [&'static str],
    kind: &'static str,
) -> FieldTemplate {
    FieldTemplate {
        id,
        label,
        path,
        kind,
        default: None,
    }
}

const SERIES_FIELDS: &[FieldTemplate] = &[
    FieldTemplate {
        default: Some("TV Shows"),
        ..field("library", "Library", &["library"], "library")
    },
    FieldTemplate {
        default: Some(DEFAULT_CARD_TYPE),
        ..field("card_type", "Card Type", &["card_type"], "card-type")
    },
    field("episode_text_format", "Episode text format", &["episode_text_format"], "text"),
    field("episode_data_source", "Episode data source", &["episode_data_source"], "choice"),
    field("watched_style", "Watched style", &["watched_style"], "style"),
    field("unwatched_style", "Unwatched style", &["unwatched_style"], "style"),
    field("tmdb_id", "TMDb ID", &["tmdb_id"], "number"),
    field("tvdb_id", "TVDb ID", &["tvdb_id"], "number"),
    field("imdb_id", "IMDb ID", &["imdb_id"], "text"),
    field("tvrage_id", "TVRage ID", &["tvrage_id"], "number"),
    field("emby_id", "Emby ID", &["emby_id"], "text"),
    field("jellyfin_id", "Jellyfin ID", &["jellyfin_id"], "text"),
    field("sonarr_id", "Sonarr ID", &["sonarr_id"], "number"),
    field("refresh_titles", "Refresh titles", &["refresh_titles"], "boolean"),
    field("sync_specials", "Sync specials", &["sync_specials"], "boolean"),
    field("sonarr_sync", "Sync from Sonarr", &["sonarr_sync"], "boolean"),
    field("tmdb_sync", "Sync from TMDb", &["tmdb_sync"], "boolean"),
    field(
        "tmdb_skip_localized_images",
        "Skip localized TMDb images",
        &["tmdb_skip_localized_images"],
        "boolean",
    ),
    field("archive", "Create archive", &["archive"], "boolean"),
    field(
        "archive_all_variations",
        "Archive all variations",
        &["archive_all_variations"],
        "boolean",
    ),
    field("archive_name", "Archive name", &["archive_name"], "text"),
    field("library_override", "Override media directory", &["media_directory"], "text"),
    field("filename_format", "Filename format", &["filename_format"], "text"),
    field("image_source_priority", "Image source priority", &["image_source_priority"], "csv"),
    field("translation", "Translations", &["translation"], "translation-list"),
    field("font.file", "Font file", &["font", "file"], "font"),
    field("font.size", "Font size (%)", &["font", "size"], "text"),
    field("font.color", "Font color", &["font", "color"], "text"),
    field("font.case", "Font casing", &["font", "case"], "font-case"),
    field("font.vertical_shift", "Font vertical shift", &["font", "vertical_shift"], "number"),
    field(
        "font.interline_spacing",
        "Font interline spacing",
        &["font", "interline_spacing"],
        "number",
    ),
    field(
        "font.interword_spacing",
        "Font interword spacing",
        &["font", "interword_spacing"],
        "number",
    ),
    field("font.kerning", "Font kerning", &["font", "kerning"], "text"),
    field("font.stroke_width", "Font stroke width", &["font", "stroke_width"], "text"),
    field("font.validate", "Validate font", &["font", "validate"], "boolean"),
    field("font.replacements", "Font replacements", &["font", "replacements"], "replacement-map"),
    field("extras", "Extra card options", &["extras"], "extras"),
    field("seasons.hide", "Hide seasons", &["seasons", "hide"], "hide-seasons"),
    field("seasons.titles", "Season titles", &["seasons"], "season-map"),
    field("episode_ranges", "Episode ranges", &["episode_ranges"], "range-map"),
];

/// Series form fields with their dynamic choice lists filled in.
pub fn build_series_fields(libraries: &JsonObject) -> Vec<FieldDescriptor> {
    SERIES_FIELDS
        .iter()
        .map(|template| FieldDescriptor {
            id: template.id.to_string(),
            label: template.label.to_string(),
            path: template.path.iter().map(|part| part.to_string()).collect(),
            kind: template.kind.to_string(),
            default: template.default.map(str::to_string),
            choices: choices_for(template.id, libraries),
        })
        .collect()
}

fn choices_for(id: &str, libraries: &JsonObject) -> Option<Vec<Choice>> {
    let choices = match id {
        "library" => libraries
            .keys()
            .map(|name| Choice::new(name.as_str(), name.as_str()))
            .collect(),
        "card_type" => card_type_choices(),
        "watched_style" | "unwatched_style" => plain_choices(STYLES),
        "episode_data_source" => plain_choices(EPISODE_DATA_SOURCES),
        "font.case" => plain_choices(FONT_CASES),
        _ => return None,
    };
    Some(choices)
}

fn card_type_choices() -> Vec<Choice> {
    CARD_TYPES
        .iter()
        .map(|value| Choice::new(*value, display_label(value)))
        .collect()
}

fn plain_choices(values: &[&str]) -> Vec<Choice> {
    values.iter().map(|value| Choice::new(*value, *value)).collect()
}

/// The `/api/meta` document.
pub fn describe(libraries: &JsonObject, font_directory: &Path) -> MetaResponse {
    let fields = build_series_fields(libraries);
    let card_types = fields
        .iter()
        .find(|field| field.id == "card_type")
        .and_then(|field| field.choices.clone())
        .unwrap_or_default();

    MetaResponse {
        fields,
        card_types,
        font_directory: font_directory.to_string_lossy().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn library_choices_follow_document_order() {
        let libraries = json!({"TV Shows": {"path": "/tv"}, "Anime": {"path": "/anime"}});
        let fields = build_series_fields(libraries.as_object().expect("object"));

        let library = fields.iter().find(|f| f.id == "library").expect("library field");
        let values: Vec<_> = library
            .choices
            .as_ref()
            .expect("choices")
            .iter()
            .map(|choice| choice.value.as_str())
            .collect();
        assert_eq!(values, vec!["TV Shows", "Anime"]);
        assert_eq!(library.default.as_deref(), Some("TV Shows"));
    }

    #[test]
    fn meta_repeats_card_type_choices() {
        let meta = describe(&JsonObject::new(), Path::new("/config/fonts"));

        assert_eq!(meta.card_types.len(), CARD_TYPES.len());
        assert_eq!(meta.font_directory, "/config/fonts");
        let star_wars = meta
            .card_types
            .iter()
            .find(|choice| choice.value == "star wars")
            .expect("star wars card");
        assert_eq!(star_wars.label, "Star Wars");
    }

    #[test]
    fn fields_without_dynamic_choices_have_none() {
        let fields = build_series_fields(&JsonObject::new());
        let tmdb = fields.iter().find(|f| f.id == "tmdb_id").expect("tmdb field");
        assert!(tmdb.choices.is_none());
        assert_eq!(tmdb.kind, "number");
        assert_eq!(fields.len(), SERIES_FIELDS.len());
    }
}
