use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
};
use rust_embed::Embed;

/// The page style sheet and driver script, shipped inside the binary.
#[derive(Embed)]
#[folder = "web/static"]
pub struct Assets;

pub async fn serve_embedded(req: Request<Body>) -> Response {
    let path = req.uri().path().trim_start_matches('/');

    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.as_ref().to_string())], content.data.into_owned()).into_response()
        }
        None => {
            tracing::debug!(path = %path, "no such asset");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
