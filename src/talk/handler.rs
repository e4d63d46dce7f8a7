use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::{assemble, load_timecodes, render};
use crate::api::{QueryParams, TimecodesResponse};
use crate::captions::load_track;
use crate::dom::escape_text;
use crate::handler::AppState;
use crate::unpack_error;

#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse { data })).into_response()
}

fn not_found(msg: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

fn bad_gateway(msg: &str) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

fn page_not_found(msg: &str) -> Response {
    let body = format!(
        "<!DOCTYPE html>\n<title>Not found</title>\n<p>{}</p>\n",
        escape_text(msg)
    );
    (StatusCode::NOT_FOUND, Html(body)).into_response()
}

/// Strong validator over the rendered page.
fn etag(body: &str) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(body.as_bytes())))
}

fn is_fresh(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .any(|tag| tag == "*" || tag == etag || tag.strip_prefix("W/") == Some(etag))
}

pub async fn get_talk(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(qp): Query<QueryParams>,
    headers: HeaderMap,
) -> Response {
    let entry = match state.catalog.lookup(&key) {
        Ok(entry) => entry,
        Err(e) => {
            tracing::info!(key = %key, "talk not found");
            return page_not_found(&e.to_string());
        }
    };

    let prefs = qp.into_preferences();
    let assembled = assemble(&state.fetcher, &state.config.app, entry.talk).await;
    let body = render(&entry, &state.config, &assembled, &prefs);

    let etag = etag(&body);
    let cache_control = format!("private, max-age={}", state.config.app.cache_max_age);
    let mut response = if is_fresh(&headers, &etag) {
        tracing::debug!(key = %key, "talk page not modified");
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        tracing::info!(key = %key, bytes = body.len(), "rendered talk page");
        Html(body).into_response()
    };

    let response_headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&etag) {
        response_headers.insert(header::ETAG, value);
    }
    if let Ok(value) = HeaderValue::from_str(&cache_control) {
        response_headers.insert(header::CACHE_CONTROL, value);
    }
    response
}

pub async fn get_captions(State(state): State<AppState>, Path((key, language)): Path<(String, String)>) -> Response {
    let entry = match state.catalog.lookup(&key) {
        Ok(entry) => entry,
        Err(e) => return not_found(&e.to_string()),
    };
    let Some(source) = entry.talk.captions.get(&language) else {
        return not_found(&format!("Not found: captions '{}' for {}", language, key));
    };

    match load_track(&state.fetcher, &language, source).await {
        Ok(track) => success(track),
        Err(e) => {
            tracing::warn!(key = %key, language = %language, error = %e, "failed to load captions");
            bad_gateway(&unpack_error(&e))
        }
    }
}

pub async fn get_timecodes(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let entry = match state.catalog.lookup(&key) {
        Ok(entry) => entry,
        Err(e) => return not_found(&e.to_string()),
    };

    let timecodes = load_timecodes(&state.fetcher, entry.talk).await;
    success(TimecodesResponse {
        key: &entry.talk.key,
        timecodes: &timecodes,
    })
}
