use std::path::PathBuf;

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{Method, Uri},
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;
use tcm_webui_api_types::{ConfigWriteRequest, PreviewRequest, PreviewResponse, StatusResponse};

use crate::{
    application::{error::AppError, fields},
    domain::values::mapping_to_json,
    infra::fonts,
};

use super::{HttpState, error::ApiError};

const PREVIEW_INPUT_MESSAGE: &str = "Preview requires a series name and configuration";

pub(super) async fn index(State(state): State<HttpState>) -> Response {
    match state.assets.index().await {
        Ok(asset) => asset.into_response(),
        Err(err) => ApiError::new("infra::http::index", err).into_response(),
    }
}

pub(super) async fn static_asset(
    State(state): State<HttpState>,
    Path(path): Path<String>,
) -> Response {
    match state.assets.static_file(&path).await {
        Ok(asset) => asset.into_response(),
        Err(err) => ApiError::new("infra::http::static_asset", err).into_response(),
    }
}

pub(super) async fn get_config(State(state): State<HttpState>) -> Response {
    match state.store.as_payload().await {
        Ok(payload) => Json(payload).into_response(),
        Err(err) => ApiError::new("infra::http::get_config", err).into_response(),
    }
}

pub(super) async fn post_config(
    State(state): State<HttpState>,
    body: Result<Json<ConfigWriteRequest>, JsonRejection>,
) -> Response {
    const SOURCE: &str = "infra::http::post_config";

    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return ApiError::from_json_rejection(SOURCE, rejection).into_response(),
    };

    match state.store.write(request).await {
        Ok(()) => Json(StatusResponse::ok()).into_response(),
        Err(err) => ApiError::new(SOURCE, err).into_response(),
    }
}

pub(super) async fn get_meta(State(state): State<HttpState>) -> Response {
    match state.store.load().await {
        Ok(document) => {
            let libraries = mapping_to_json(document.libraries());
            Json(fields::describe(&libraries, &state.font_directory)).into_response()
        }
        Err(err) => ApiError::new("infra::http::get_meta", err).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct FontsQuery {
    path: Option<String>,
}

pub(super) async fn list_fonts(
    State(state): State<HttpState>,
    query: Result<Query<FontsQuery>, QueryRejection>,
) -> Response {
    const SOURCE: &str = "infra::http::list_fonts";

    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            return ApiError::from_query_rejection(SOURCE, rejection).into_response();
        }
    };
    let path = query
        .path
        .filter(|path| !path.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| state.font_directory.clone());

    match fonts::list_directory(&path).await {
        Ok(listing) => Json(listing).into_response(),
        Err(err) => ApiError::new(SOURCE, err).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct SearchQuery {
    q: Option<String>,
    query: Option<String>,
}

pub(super) async fn search(
    State(state): State<HttpState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Response {
    const SOURCE: &str = "infra::http::search";

    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            return ApiError::from_query_rejection(SOURCE, rejection).into_response();
        }
    };
    let term = query.q.or(query.query);

    match state.search.search(term.as_deref()).await {
        Ok(results) => Json(results).into_response(),
        Err(err) => ApiError::new(SOURCE, err).into_response(),
    }
}

pub(super) async fn preview(
    State(state): State<HttpState>,
    body: Result<Json<PreviewRequest>, JsonRejection>,
) -> Response {
    const SOURCE: &str = "infra::http::preview";

    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return ApiError::from_json_rejection(SOURCE, rejection).into_response(),
    };

    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let (Some(name), Some(config)) = (name, request.config.as_object()) else {
        return ApiError::new(SOURCE, AppError::validation(PREVIEW_INPUT_MESSAGE)).into_response();
    };

    match state.preview.generate(name, config).await {
        Ok(image) => Json(PreviewResponse {
            mime: image.mime.to_string(),
            data: STANDARD.encode(&image.bytes),
        })
        .into_response(),
        Err(err) => ApiError::new(SOURCE, err).into_response(),
    }
}

pub(super) async fn not_found(method: Method, uri: Uri) -> Response {
    ApiError::new(
        "infra::http::fallback",
        AppError::not_found(format!("No route for {method} {}", uri.path())),
    )
    .into_response()
}
