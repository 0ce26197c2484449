//! Font loading, glyph validation and the font directory browser.

use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use fontdue::{Font, FontSettings};
use tcm_webui_api_types::{FontEntry, FontEntryKind, FontListing};
use tracing::info;

use crate::{
    application::{
        collaborators::{CollaboratorError, FontValidator, TitleValidation},
        lock::CacheCell,
    },
    domain::series::FontSpec,
    infra::error::InfraError,
};

/// Parsed fonts keyed by path, shared by the validator and the renderer.
pub struct FontLibrary {
    fallback: Option<PathBuf>,
    fonts: CacheCell<HashMap<PathBuf, Arc<Font>>>,
}

impl Default for FontLibrary {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FontLibrary {
    pub fn new(fallback: Option<PathBuf>) -> Self {
        Self {
            fallback,
            fonts: CacheCell::empty("font"),
        }
    }

    /// The series font file, or the fallback font when the series names none.
    pub fn resolve<'a>(&'a self, spec: &'a FontSpec) -> Option<&'a Path> {
        spec.file.as_deref().or(self.fallback.as_deref())
    }

    /// Load and parse `path`, reusing an earlier parse. Blocking.
    pub fn load(&self, path: &Path) -> Result<Arc<Font>, CollaboratorError> {
        if let Some(font) = self.fonts.read().get(path) {
            return Ok(Arc::clone(font));
        }

        let bytes = std::fs::read(path).map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                CollaboratorError::Render(format!("font file `{}` does not exist", path.display()))
            } else {
                InfraError::file(path, err).into()
            }
        })?;
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|err| {
            CollaboratorError::Render(format!("failed to parse font `{}`: {err}", path.display()))
        })?;
        info!(target = "tcm_webui::infra::fonts", path = %path.display(), "font loaded");

        let font = Arc::new(font);
        self.fonts.write().insert(path.to_path_buf(), Arc::clone(&font));
        Ok(font)
    }
}

/// Checks titles against the glyphs a font actually provides.
pub struct FontdueValidator {
    library: Arc<FontLibrary>,
}

impl FontdueValidator {
    pub fn new(library: Arc<FontLibrary>) -> Self {
        Self { library }
    }
}

impl FontValidator for FontdueValidator {
    fn validate_title(
        &self,
        font: &FontSpec,
        title: &str,
    ) -> Result<TitleValidation, CollaboratorError> {
        let passed = TitleValidation {
            title: title.to_string(),
            missing: Vec::new(),
        };
        if !font.validate {
            return Ok(passed);
        }
        let Some(path) = self.library.resolve(font) else {
            return Ok(passed);
        };

        let parsed = self.library.load(path)?;
        Ok(TitleValidation {
            title: title.to_string(),
            missing: missing_glyphs(&parsed, title),
        })
    }
}

/// Characters of `text` the font has no glyph for, in first-seen order.
pub fn missing_glyphs(font: &Font, text: &str) -> Vec<char> {
    let mut missing = Vec::new();
    for ch in text.chars() {
        if ch.is_whitespace() || missing.contains(&ch) {
            continue;
        }
        if font.lookup_glyph_index(ch) == 0 {
            missing.push(ch);
        }
    }
    missing
}

/// List `path`: directories first, then files, each ordered by lower-cased name.
/// A missing path lists as empty.
pub async fn list_directory(path: &Path) -> Result<FontListing, InfraError> {
    let mut entries = Vec::new();

    let mut reader = match tokio::fs::read_dir(path).await {
        Ok(reader) => Some(reader),
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => None,
        Err(err) => return Err(InfraError::file(path, err)),
    };

    if let Some(reader) = reader.as_mut() {
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|err| InfraError::file(path, err))?
        {
            let entry_path = entry.path();
            // Symlinks are followed.
            let is_file = tokio::fs::metadata(&entry_path)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            entries.push(FontEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry_path.to_string_lossy().into_owned(),
                kind: if is_file {
                    FontEntryKind::File
                } else {
                    FontEntryKind::Directory
                },
            });
        }
    }

    entries.sort_by_key(|entry| (entry.kind == FontEntryKind::File, entry.name.to_lowercase()));

    Ok(FontListing {
        path: path.to_string_lossy().into_owned(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_skipped_when_disabled_or_without_font() {
        let validator = FontdueValidator::new(Arc::new(FontLibrary::default()));

        let spec = FontSpec::default();
        let result = validator.validate_title(&spec, "Ünïcödé").expect("no font configured");
        assert!(result.is_valid());

        let spec = FontSpec {
            file: Some(PathBuf::from("/does/not/exist.ttf")),
            validate: false,
            ..FontSpec::default()
        };
        let result = validator.validate_title(&spec, "Title").expect("validation disabled");
        assert!(result.is_valid());
    }

    #[test]
    fn missing_font_file_is_a_render_error() {
        let validator = FontdueValidator::new(Arc::new(FontLibrary::default()));
        let spec = FontSpec {
            file: Some(PathBuf::from("/does/not/exist.ttf")),
            ..FontSpec::default()
        };

        let err = validator.validate_title(&spec, "Title").expect_err("missing font");
        assert!(matches!(err, CollaboratorError::Render(_)));
    }

    #[test]
    fn fallback_font_is_used_when_series_has_none() {
        let library = FontLibrary::new(Some(PathBuf::from("/fallback.ttf")));
        let spec = FontSpec::default();
        assert_eq!(library.resolve(&spec), Some(Path::new("/fallback.ttf")));
    }

    #[tokio::test]
    async fn directories_sort_before_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("b.ttf"), b"").expect("file");
        std::fs::write(dir.path().join("A.otf"), b"").expect("file");
        std::fs::create_dir(dir.path().join("zeta")).expect("dir");
        std::fs::create_dir(dir.path().join("Alpha")).expect("dir");

        let listing = list_directory(dir.path()).await.expect("listing");
        let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, vec!["Alpha", "zeta", "A.otf", "b.ttf"]);
        assert_eq!(listing.entries[0].kind, FontEntryKind::Directory);
    }

    #[tokio::test]
    async fn missing_directory_lists_empty() {
        let listing = list_directory(Path::new("/definitely/not/here"))
            .await
            .expect("listing");
        assert!(listing.entries.is_empty());
        assert_eq!(listing.path, "/definitely/not/here");
    }
}
