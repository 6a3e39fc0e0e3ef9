use std::time::Instant;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{
    dataset_preview, download_dataset, home, login, login_form, logout, register, register_form,
    search_datasets, upload_dataset, upload_redirect,
};
use crate::state::AppState;

/// Room for multipart boundaries and the text fields on top of the file itself.
pub const MULTIPART_SLACK_BYTES: u64 = 1024 * 1024;

pub fn make_routes(state: AppState) -> Router {
    let body_limit = usize::try_from(state.config.max_upload_bytes.saturating_add(MULTIPART_SLACK_BYTES))
        .unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(home))
        .route(
            "/upload/",
            get(upload_redirect)
                .post(upload_dataset)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/preview/{id}/", get(dataset_preview))
        .route("/search/", get(search_datasets))
        .route("/download/{id}/", get(download_dataset))
        .route("/register/", get(register_form).post(register))
        .route("/login/", get(login_form).post(login))
        .route("/logout/", post(logout))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let resp = next.run(req).await;
    log::info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        resp.status().as_u16(),
        started.elapsed().as_millis()
    );
    resp
}
