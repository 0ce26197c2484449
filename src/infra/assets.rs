//! UI entry document and static asset serving from the filesystem.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use mime_guess::Mime;

use crate::{application::error::AppError, infra::error::InfraError};

const INDEX_TEMPLATE: &str = "index.html";

/// Where the UI files live on disk.
#[derive(Debug, Clone)]
pub struct AssetRoots {
    pub static_root: PathBuf,
    pub template_root: PathBuf,
}

/// File contents paired with the content type guessed from the path.
#[derive(Debug)]
pub struct Asset {
    contents: Bytes,
    mime: Mime,
}

impl AssetRoots {
    pub fn new(static_root: PathBuf, template_root: PathBuf) -> Self {
        Self {
            static_root,
            template_root,
        }
    }

    pub async fn index(&self) -> Result<Asset, AppError> {
        let path = self.template_root.join(INDEX_TEMPLATE);
        read_asset(&path)
            .await?
            .ok_or_else(|| AppError::not_found("UI entry document is missing"))
    }

    /// Read `requested` relative to the static root.
    ///
    /// The fully resolved path (symlinks included) must stay under the
    /// resolved static root; anything else is reported as not found.
    pub async fn static_file(&self, requested: &str) -> Result<Asset, AppError> {
        let missing = || AppError::not_found("Static asset not found");

        let requested = requested.trim_start_matches('/');
        if requested.is_empty() {
            return Err(missing());
        }

        let Some(root) = canonical(&self.static_root).await? else {
            return Err(missing());
        };
        let Some(candidate) = canonical(&root.join(requested)).await? else {
            return Err(missing());
        };
        if !candidate.starts_with(&root) || candidate == root {
            return Err(missing());
        }

        read_asset(&candidate).await?.ok_or_else(missing)
    }
}

async fn canonical(path: &Path) -> Result<Option<PathBuf>, InfraError> {
    match tokio::fs::canonicalize(path).await {
        Ok(resolved) => Ok(Some(resolved)),
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            Ok(None)
        }
        Err(err) => Err(InfraError::file(path, err)),
    }
}

async fn read_asset(path: &Path) -> Result<Option<Asset>, InfraError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Ok(None),
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
            return Ok(None);
        }
        Err(err) => return Err(InfraError::file(path, err)),
    }

    let contents = tokio::fs::read(path)
        .await
        .map_err(|err| InfraError::file(path, err))?;
    Ok(Some(Asset {
        contents: Bytes::from(contents),
        mime: mime_guess::from_path(path).first_or_octet_stream(),
    }))
}

impl Asset {
    pub fn mime(&self) -> &Mime {
        &self.mime
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }
}

impl IntoResponse for Asset {
    fn into_response(self) -> Response {
        let len = self.contents.len();
        let mut response = Response::new(Body::from(self.contents));
        *response.status_mut() = StatusCode::OK;

        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(self.mime.as_ref()) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
            headers.insert(header::CONTENT_LENGTH, value);
        }
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        response
    }
}
