//! Route modules for the file upload server

pub mod upload;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router
///
/// Upload targets are arbitrary paths, so the upload handler is the fallback
/// for every request.
pub fn router(state: AppState) -> Router {
    Router::new()
        .fallback(upload::receive_upload)
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
