use std::{
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use serde_yaml::Value as YamlValue;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    application::store::{DocumentStorage, PersistedDocument},
    domain::document::SeriesDocument,
    infra::{error::InfraError, yaml_layout},
};

/// The series document as a YAML file on disk.
#[derive(Debug, Clone)]
pub struct YamlDocumentFile {
    path: PathBuf,
}

impl YamlDocumentFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentStorage for YamlDocumentFile {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Option<PersistedDocument>, InfraError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(InfraError::file(&self.path, err)),
        };

        let value = if !has_content(&text) {
            YamlValue::Null
        } else {
            serde_yaml::from_str(&text).map_err(|err| InfraError::yaml(&self.path, err))?
        };
        let document = SeriesDocument::from_value(value).map_err(|err| {
            InfraError::configuration(format!("{}: {err}", self.path.display()))
        })?;

        Ok(Some(PersistedDocument { document, text }))
    }

    async fn write(
        &self,
        document: &SeriesDocument,
        previous: Option<&str>,
    ) -> Result<PersistedDocument, InfraError> {
        let text = yaml_layout::render(document, previous)
            .map_err(|err| InfraError::yaml(&self.path, err))?;

        let path = self.path.clone();
        let contents = text.clone();
        tokio::task::spawn_blocking(move || replace_atomically(&path, contents.as_bytes()))
            .await
            .map_err(|err| InfraError::join(err.to_string()))??;

        debug!(
            target = "tcm_webui::infra::document_file",
            path = %self.path.display(),
            bytes = text.len(),
            "series document persisted"
        );

        Ok(PersistedDocument {
            document: document.clone(),
            text,
        })
    }
}

/// Whether `text` holds anything besides blank lines and comments.
fn has_content(text: &str) -> bool {
    text.lines().any(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#') && trimmed != "---"
    })
}

/// Write to a sibling temporary file, then rename it over `path`.
fn replace_atomically(path: &Path, contents: &[u8]) -> Result<(), InfraError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|err| InfraError::file(&parent, err))?;

    let mut staged =
        NamedTempFile::new_in(&parent).map_err(|err| InfraError::file(&parent, err))?;
    staged
        .write_all(contents)
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|err| InfraError::file(staged.path(), err))?;
    staged
        .persist(path)
        .map_err(|err| InfraError::file(path, err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = YamlDocumentFile::new(dir.path().join("tv.yml"));

        assert!(file.read().await.expect("read").is_none());
    }

    #[tokio::test]
    async fn empty_file_normalizes_to_skeleton() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tv.yml");
        std::fs::write(&path, "# nothing yet\n").expect("write");

        let persisted = YamlDocumentFile::new(&path)
            .read()
            .await
            .expect("read")
            .expect("document");
        assert_eq!(persisted.document, SeriesDocument::empty());
        assert_eq!(persisted.text, "# nothing yet\n");
    }

    #[tokio::test]
    async fn write_replaces_file_and_leaves_no_staging_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tv.yml");
        std::fs::write(&path, "# keep me\nlibraries: {}\nseries: {}\n").expect("write");
        let file = YamlDocumentFile::new(&path);

        let previous = file.read().await.expect("read").expect("document");
        file.write(&previous.document, Some(&previous.text))
            .await
            .expect("write");

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .filter_map(Result::ok)
            .collect();
        assert_eq!(entries.len(), 1);
        let text = std::fs::read_to_string(&path).expect("read back");
        assert!(text.starts_with("# keep me\n"));
    }

    #[tokio::test]
    async fn non_mapping_document_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tv.yml");
        std::fs::write(&path, "- just\n- a list\n").expect("write");

        let err = YamlDocumentFile::new(&path).read().await.expect_err("list root");
        assert!(matches!(err, InfraError::Configuration { .. }));
    }
}
