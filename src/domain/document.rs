//! The persisted series configuration document.

use serde_yaml::{Mapping, Value as YamlValue};

use super::error::DomainError;

pub const LIBRARIES_KEY: &str = "libraries";
pub const SERIES_KEY: &str = "series";
pub const FONTS_KEY: &str = "fonts";

/// Top-level document holding library definitions, per-series configuration and
/// any other members the operator keeps in the same file.
///
/// Both `libraries` and `series` are always present and mapping-typed.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesDocument {
    root: Mapping,
}

impl SeriesDocument {
    /// Skeleton used when no file exists yet.
    pub fn empty() -> Self {
        let mut root = Mapping::new();
        root.insert(key(LIBRARIES_KEY), YamlValue::Mapping(Mapping::new()));
        root.insert(key(SERIES_KEY), YamlValue::Mapping(Mapping::new()));
        Self { root }
    }

    /// Build a document from a parsed YAML tree, normalizing absent or null
    /// `libraries`/`series` members to empty mappings.
    pub fn from_value(value: YamlValue) -> Result<Self, DomainError> {
        let root = match value {
            YamlValue::Null => Mapping::new(),
            YamlValue::Mapping(mapping) => mapping,
            YamlValue::Tagged(tagged) => return Self::from_value(tagged.value),
            _ => {
                return Err(DomainError::validation(
                    "series configuration document must be a mapping",
                ));
            }
        };

        let mut document = Self { root };
        document.normalize_member(LIBRARIES_KEY)?;
        document.normalize_member(SERIES_KEY)?;
        Ok(document)
    }

    fn normalize_member(&mut self, name: &str) -> Result<(), DomainError> {
        match self.root.get(name) {
            None | Some(YamlValue::Null) => {
                self.root.insert(key(name), YamlValue::Mapping(Mapping::new()));
                Ok(())
            }
            Some(YamlValue::Mapping(_)) => Ok(()),
            Some(_) => Err(DomainError::validation(format!(
                "`{name}` must be a mapping"
            ))),
        }
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    pub fn libraries(&self) -> &Mapping {
        self.member(LIBRARIES_KEY)
    }

    pub fn series(&self) -> &Mapping {
        self.member(SERIES_KEY)
    }

    /// Optional named font definitions referenced by series `font` strings.
    pub fn fonts(&self) -> Option<&Mapping> {
        self.root.get(FONTS_KEY).and_then(YamlValue::as_mapping)
    }

    pub fn replace_libraries(&mut self, libraries: Mapping) {
        self.replace_member(LIBRARIES_KEY, libraries);
    }

    pub fn replace_series(&mut self, series: Mapping) {
        self.replace_member(SERIES_KEY, series);
    }

    fn replace_member(&mut self, name: &str, value: Mapping) {
        // `insert` on an existing key keeps the key's position.
        self.root.insert(key(name), YamlValue::Mapping(value));
    }

    fn member(&self, name: &str) -> &Mapping {
        static EMPTY: std::sync::OnceLock<Mapping> = std::sync::OnceLock::new();
        self.root
            .get(name)
            .and_then(YamlValue::as_mapping)
            .unwrap_or_else(|| EMPTY.get_or_init(Mapping::new))
    }

    pub fn into_value(self) -> YamlValue {
        YamlValue::Mapping(self.root)
    }
}

impl Default for SeriesDocument {
    fn default() -> Self {
        Self::empty()
    }
}

fn key(name: &str) -> YamlValue {
    YamlValue::String(name.to_string())
}
