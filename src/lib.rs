use axum::{
    Router,
    http::{HeaderName, Method},
    routing::get,
};
use std::error::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod assets;
pub mod captions;
pub mod catalog;
pub mod config;
pub mod css;
pub mod dom;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod handler;
pub mod merge;
pub mod model;
pub mod talk;
pub mod timecodes;
pub mod url;

use crate::assets::serve_embedded;
use crate::handler::{AppState, healthcheck, list_talks};

/// Joins an error with its chain of sources: `outer: inner: root`.
pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::HEAD])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static("etag")]);

    Router::new()
        .route("/", get(healthcheck))
        .route("/talks", get(list_talks))
        .nest("/talk", talk::routes())
        .fallback(serve_embedded)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
