use axum::{Router, routing::get};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/:key", get(handler::get_talk))
        .route("/:key/captions/:lang", get(handler::get_captions))
        .route("/:key/timecodes", get(handler::get_timecodes))
}
