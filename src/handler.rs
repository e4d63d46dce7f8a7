use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::api::APIResponse;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::fetch::Fetcher;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<Catalog>,
    pub fetcher: Fetcher,
}

impl AppState {
    pub fn new(config: Config, catalog: Catalog, fetcher: Fetcher) -> Self {
        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            fetcher,
        }
    }
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    Json(APIResponse::new(Some("ok"), None))
}

pub async fn list_talks(State(state): State<AppState>) -> Response {
    let talks = state.catalog.summaries();
    tracing::info!(count = talks.len(), "listed talks");
    Json(APIResponse::new(Some("got talks"), Some(talks))).into_response()
}
