//! Resolution of a series configuration's library and font references.
//!
//! This is the single finalization rule: previews and production runs both
//! finalize through [`finalize_series`], so a preview renders exactly what a
//! sync would.

use serde_json::{Value as JsonValue, json};
use thiserror::Error;

use super::values::ConfigMap;

const LIBRARY_FIELD: &str = "library";
const FONT_FIELD: &str = "font";

/// Keys of a library definition that describe the library itself rather than
/// defaults for the series inside it.
const LIBRARY_ATTRIBUTES: &[&str] = &["path", "media_server", "library_type"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FinalizeError {
    #[error("series `{series}` references library `{library}`, which is not defined")]
    UnknownLibrary { series: String, library: String },
    #[error("library `{library}` is invalid: {reason}")]
    InvalidLibrary { library: String, reason: String },
    #[error("series `{series}` references font `{font}`, which is not defined")]
    UnknownFont { series: String, font: String },
    #[error("series `{series}` has an invalid `{field}` value; expected {expected}")]
    InvalidReference {
        series: String,
        field: &'static str,
        expected: &'static str,
    },
}

/// Resolve `config`'s library and font references against the persisted
/// definitions, returning a new, fully finalized configuration.
pub fn finalize_series(
    series: &str,
    config: &ConfigMap,
    libraries: &ConfigMap,
    fonts: &ConfigMap,
    default_media_server: &str,
) -> Result<ConfigMap, FinalizeError> {
    let mut finalized = config.clone();

    match config.get(LIBRARY_FIELD) {
        None | Some(JsonValue::Null) => {}
        Some(JsonValue::String(name)) => {
            let definition = libraries
                .get(name)
                .and_then(JsonValue::as_object)
                .ok_or_else(|| FinalizeError::UnknownLibrary {
                    series: series.to_string(),
                    library: name.clone(),
                })?;
            apply_library(&mut finalized, name, definition, default_media_server)?;
        }
        Some(JsonValue::Object(inline)) => {
            let mut library = inline.clone();
            if !library.contains_key("media_server") {
                library.insert("media_server".into(), json!(default_media_server));
            }
            finalized.insert(LIBRARY_FIELD.into(), JsonValue::Object(library));
        }
        Some(_) => {
            return Err(FinalizeError::InvalidReference {
                series: series.to_string(),
                field: LIBRARY_FIELD,
                expected: "a library name",
            });
        }
    }

    match config.get(FONT_FIELD) {
        None | Some(JsonValue::Null) | Some(JsonValue::Object(_)) => {}
        Some(JsonValue::String(name)) => {
            let definition = fonts
                .get(name)
                .and_then(JsonValue::as_object)
                .ok_or_else(|| FinalizeError::UnknownFont {
                    series: series.to_string(),
                    font: name.clone(),
                })?;
            finalized.insert(FONT_FIELD.into(), JsonValue::Object(definition.clone()));
        }
        Some(_) => {
            return Err(FinalizeError::InvalidReference {
                series: series.to_string(),
                field: FONT_FIELD,
                expected: "a font name or font mapping",
            });
        }
    }

    Ok(finalized)
}

fn apply_library(
    finalized: &mut ConfigMap,
    name: &str,
    definition: &ConfigMap,
    default_media_server: &str,
) -> Result<(), FinalizeError> {
    let path = definition
        .get("path")
        .and_then(JsonValue::as_str)
        .filter(|path| !path.trim().is_empty())
        .ok_or_else(|| FinalizeError::InvalidLibrary {
            library: name.to_string(),
            reason: "missing `path`".to_string(),
        })?;

    let media_server = definition
        .get("media_server")
        .or_else(|| definition.get("library_type"))
        .and_then(JsonValue::as_str)
        .unwrap_or(default_media_server)
        .to_ascii_lowercase();

    finalized.insert(
        LIBRARY_FIELD.into(),
        json!({
            "name": name,
            "path": path,
            "media_server": media_server,
        }),
    );

    for (key, value) in definition {
        if LIBRARY_ATTRIBUTES.contains(&key.as_str()) || finalized.contains_key(key) {
            continue;
        }
        finalized.insert(key.clone(), value.clone());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(value: JsonValue) -> ConfigMap {
        value.as_object().cloned().expect("object literal")
    }

    #[test]
    fn library_reference_resolves_and_fills_defaults() {
        let libraries = object(json!({
            "TV Shows": {
                "path": "/media/tv",
                "library_type": "Plex",
                "card_type": "tinted frame",
                "filename_format": "{full_name} - S{season:02}E{episode:02}"
            }
        }));
        let config = object(json!({"library": "TV Shows", "card_type": "standard"}));

        let finalized = finalize_series("Show (2020)", &config, &libraries, &ConfigMap::new(), "emby")
            .expect("finalized");

        assert_eq!(
            finalized["library"],
            json!({"name": "TV Shows", "path": "/media/tv", "media_server": "plex"})
        );
        assert_eq!(finalized["card_type"], json!("standard"));
        assert_eq!(
            finalized["filename_format"],
            json!("{full_name} - S{season:02}E{episode:02}")
        );
        assert!(!finalized.contains_key("library_type"));
    }

    #[test]
    fn media_server_falls_back_to_default() {
        let libraries = object(json!({"Anime": {"path": "/media/anime"}}));
        let config = object(json!({"library": "Anime"}));

        let finalized = finalize_series("A (1999)", &config, &libraries, &ConfigMap::new(), "jellyfin")
            .expect("finalized");

        assert_eq!(finalized["library"]["media_server"], json!("jellyfin"));
    }

    #[test]
    fn unknown_library_fails() {
        let config = object(json!({"library": "Missing"}));
        let err = finalize_series("S (2001)", &config, &ConfigMap::new(), &ConfigMap::new(), "plex")
            .expect_err("unknown library");

        assert_eq!(
            err,
            FinalizeError::UnknownLibrary {
                series: "S (2001)".into(),
                library: "Missing".into()
            }
        );
    }

    #[test]
    fn library_without_path_is_invalid() {
        let libraries = object(json!({"TV": {"media_server": "plex"}}));
        let config = object(json!({"library": "TV"}));

        let err = finalize_series("S (2001)", &config, &libraries, &ConfigMap::new(), "plex")
            .expect_err("missing path");
        assert!(matches!(err, FinalizeError::InvalidLibrary { .. }));
    }

    #[test]
    fn named_font_is_copied_and_inline_font_kept() {
        let fonts = object(json!({"Bold": {"file": "/fonts/bold.ttf", "size": "120%"}}));

        let named = object(json!({"font": "Bold"}));
        let finalized = finalize_series("S (2001)", &named, &ConfigMap::new(), &fonts, "plex")
            .expect("finalized");
        assert_eq!(finalized["font"]["file"], json!("/fonts/bold.ttf"));

        let inline = object(json!({"font": {"color": "red"}}));
        let finalized = finalize_series("S (2001)", &inline, &ConfigMap::new(), &fonts, "plex")
            .expect("finalized");
        assert_eq!(finalized["font"], json!({"color": "red"}));
    }

    #[test]
    fn unknown_font_fails() {
        let config = object(json!({"font": "Nope"}));
        let err = finalize_series("S (2001)", &config, &ConfigMap::new(), &ConfigMap::new(), "plex")
            .expect_err("unknown font");
        assert!(matches!(err, FinalizeError::UnknownFont { .. }));
    }

    #[test]
    fn input_configuration_is_not_mutated() {
        let libraries = object(json!({"TV": {"path": "/tv"}}));
        let config = object(json!({"library": "TV"}));
        let before = config.clone();

        let _ = finalize_series("S (2001)", &config, &libraries, &ConfigMap::new(), "plex");
        assert_eq!(config, before);
    }
}
