//! Embedded dashboard assets
//!
//! The single-page UI lives in `src/dashboard/static` and is compiled into
//! the binary.

use axum::{
    body::Body,
    http::{Response, StatusCode, header},
    response::IntoResponse,
};
use rust_embed::RustEmbed;

/// Embedded dashboard assets
#[derive(RustEmbed)]
#[folder = "src/dashboard/static"]
pub struct DashboardAssets;

pub const INDEX_HTML: &str = include_str!("static/index.html");
pub const STYLES_CSS: &str = include_str!("static/styles.css");
pub const APP_JS: &str = include_str!("static/app.js");

/// Serve embedded asset or return 404
pub async fn serve_asset(path: String) -> impl IntoResponse {
    let path = match path.trim_start_matches('/') {
        "" => "index.html",
        p => p,
    };

    match DashboardAssets::get(path) {
        Some(file) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.as_ref().to_string())],
                Body::from(file.data.into_owned()),
            )
                .into_response()
        }
        None => not_found(),
    }
}

fn not_found() -> Response<Body> {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
