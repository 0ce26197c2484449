//! HTTP gateway: the route table, middleware stack and error translation.

pub mod error;
mod handlers;
pub mod middleware;

use std::{path::PathBuf, sync::Arc};

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::{
    application::{preview::PreviewService, search::SearchService, store::SeriesStore},
    infra::assets::AssetRoots,
};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub store: Arc<SeriesStore>,
    pub preview: Arc<PreviewService>,
    pub search: Arc<SearchService>,
    pub assets: Arc<AssetRoots>,
    pub font_directory: PathBuf,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/static/{*path}", get(handlers::static_asset))
        .route(
            "/api/config",
            get(handlers::get_config).post(handlers::post_config),
        )
        .route("/api/meta", get(handlers::get_meta))
        .route("/api/fonts", get(handlers::list_fonts))
        .route("/api/plex/search", get(handlers::search))
        .route("/api/preview", post(handlers::preview))
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
