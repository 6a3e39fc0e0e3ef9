//! HTTP handlers. Each one calls into `services` and turns the outcome into a
//! page, a file, or a flash-and-redirect.

use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{AppendHeaders, Html, IntoResponse, Redirect, Response};
use axum::Form;
use log::{error, info, warn};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::error::{CatalogError, CatalogResult};
use crate::metrics;
use crate::services::auth_service::{self, RegisterRequest};
use crate::services::ingest::{self, UploadRequest, UploadedFile};
use crate::services::{catalog, download, preview};
use crate::session::{
    clear_flash_cookie, clear_session_cookie, flash_redirect, safe_next, session_cookie, CurrentUser, Flash,
    FlashMessage, Level, MaybeUser, LOGIN_PATH,
};
use crate::state::AppState;
use crate::utils::jwt::generate_jwt;
use crate::views;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub query: Option<String>,
    pub page: Option<String>,
}

/// Pages that render a flash message also expire its cookie.
fn with_flash_cleared(flash: &Option<FlashMessage>, html: String) -> Response {
    if flash.is_some() {
        (AppendHeaders([(SET_COOKIE, clear_flash_cookie())]), Html(html)).into_response()
    } else {
        Html(html).into_response()
    }
}

fn append_cookie(mut resp: Response, cookie: String) -> Response {
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            resp.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => error!("Dropping malformed cookie: {}", e),
    }
    resp
}

async fn render_listing(
    state: &AppState,
    query: Option<&str>,
    page: Option<&str>,
    user: Option<CurrentUser>,
    flash: Option<FlashMessage>,
) -> Response {
    match catalog::handle_list(state.datasets.as_ref(), query, page).await {
        Ok(page) => {
            let html = views::listing_page(&page, query, user.as_ref(), flash.as_ref());
            with_flash_cleared(&flash, html)
        }
        Err(e) => {
            error!("Listing datasets failed: {}", e);
            Html(views::error_page(&e.user_message(), user.as_ref())).into_response()
        }
    }
}

pub async fn home(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Flash(flash): Flash,
    Query(params): Query<ListParams>,
) -> Response {
    render_listing(&state, None, params.page.as_deref(), user, flash).await
}

pub async fn search_datasets(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Flash(flash): Flash,
    Query(params): Query<ListParams>,
) -> Response {
    let query = params.query.as_deref().map(str::trim).filter(|q| !q.is_empty());
    render_listing(&state, query, params.page.as_deref(), user, flash).await
}

/// The upload form lives on the listing page.
pub async fn upload_redirect(_user: CurrentUser) -> Redirect {
    Redirect::to("/")
}

async fn read_upload(mut multipart: Multipart, limit: u64) -> CatalogResult<UploadRequest> {
    let body_error = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            CatalogError::BodyTooLarge { limit }
        } else {
            CatalogError::Internal(anyhow::anyhow!(e.body_text()))
        }
    };

    let mut req = UploadRequest::default();
    while let Some(field) = multipart.next_field().await.map_err(body_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(body_error)?;
                if !file_name.is_empty() {
                    req.file = Some(UploadedFile { file_name, data });
                }
            }
            "title" | "author" | "description" => {
                let value = field.text().await.map_err(body_error)?;
                match name.as_str() {
                    "title" => req.title = Some(value),
                    "author" => req.author = Some(value),
                    _ => req.description = Some(value),
                }
            }
            other => warn!("Ignoring unexpected upload field '{}'", other),
        }
    }
    Ok(req)
}

pub async fn upload_dataset(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let limit = state.config.max_upload_bytes;
    let outcome = match multipart {
        Ok(multipart) => match read_upload(multipart, limit).await {
            Ok(req) => ingest::handle_upload(state.datasets.as_ref(), &state.store, req, limit).await,
            Err(e) => Err(e),
        },
        Err(rejection) => {
            warn!("Upload without a multipart body: {}", rejection);
            Err(CatalogError::MissingFields)
        }
    };

    match outcome {
        Ok(dataset) => {
            metrics::record_upload("success");
            info!("{} uploaded dataset {} ({})", user.username, dataset.id, dataset.doi);
            flash_redirect(
                "/",
                Level::Success,
                format!("Dataset uploaded successfully! DOI: {}", dataset.doi),
            )
        }
        Err(e) => {
            if e.is_validation() {
                metrics::record_upload("rejected");
                info!("Upload by {} rejected: {}", user.username, e);
            } else {
                metrics::record_upload("error");
                error!("Upload by {} failed: {}", user.username, e);
            }
            flash_redirect("/", Level::Error, e.upload_message())
        }
    }
}

fn parse_id(raw: &str) -> CatalogResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| CatalogError::NotFound)
}

pub async fn dataset_preview(
    State(state): State<AppState>,
    user: CurrentUser,
    Flash(flash): Flash,
    Path(id): Path<String>,
) -> Response {
    let result = match parse_id(&id) {
        Ok(id) => preview::handle_preview(state.datasets.as_ref(), &state.store, id).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(preview) => {
            metrics::record_preview(&preview.dataset.file_type);
            let html = views::preview_page(&preview, Some(&user), flash.as_ref());
            with_flash_cleared(&flash, html)
        }
        Err(e) => flash_redirect("/", Level::Error, e.preview_message()),
    }
}

pub async fn download_dataset(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> Response {
    let result = match parse_id(&id) {
        Ok(id) => download::handle_download(state.datasets.as_ref(), &state.store, id).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(file) => {
            metrics::record_download();
            let disposition = file.content_disposition();
            (
                [
                    (CONTENT_TYPE, file.content_type),
                    (CONTENT_DISPOSITION, disposition),
                    (CONTENT_LENGTH, file.size.to_string()),
                ],
                Body::from_stream(ReaderStream::new(file.file)),
            )
                .into_response()
        }
        Err(e) => {
            warn!("Download of {} failed: {}", id, e);
            flash_redirect("/", Level::Error, e.download_message())
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password1: String,
    #[serde(default)]
    pub password2: String,
}

pub async fn register_form(Flash(flash): Flash) -> Response {
    let html = views::register_page("", "", flash.as_ref());
    with_flash_cleared(&flash, html)
}

pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let req = RegisterRequest {
        username: form.username.clone(),
        email: form.email.clone(),
        password: form.password1,
        password_confirm: form.password2,
    };
    match auth_service::handle_register(state.users.as_ref(), req).await {
        Ok(user) => flash_redirect(
            LOGIN_PATH,
            Level::Success,
            format!("Account created for {}! You can now log in.", user.email),
        ),
        Err(e) => {
            info!("Registration of '{}' refused: {}", form.username, e);
            let flash = FlashMessage {
                level: Level::Error,
                message: e.user_message(),
            };
            Html(views::register_page(&form.username, &form.email, Some(&flash))).into_response()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

pub async fn login_form(Flash(flash): Flash, Query(q): Query<LoginQuery>) -> Response {
    let html = views::login_page(safe_next(q.next.as_deref()), flash.as_ref());
    with_flash_cleared(&flash, html)
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let next = safe_next(form.next.as_deref());
    let user = match auth_service::login_user(state.users.as_ref(), &form.username, &form.password).await {
        Ok(user) => user,
        Err(e) => {
            metrics::record_login("failure");
            info!("Login for '{}' refused: {}", form.username, e);
            let flash = FlashMessage {
                level: Level::Error,
                message: e.user_message(),
            };
            return Html(views::login_page(next, Some(&flash))).into_response();
        }
    };

    let token = match generate_jwt(&user, &state.config.jwt_secret, state.config.session_ttl_hours) {
        Ok(token) => token,
        Err(e) => {
            metrics::record_login("error");
            error!("Issuing session for {} failed: {}", user.username, e);
            return flash_redirect(LOGIN_PATH, Level::Error, format!("Unexpected error: {}", e));
        }
    };

    metrics::record_login("success");
    info!("User {} logged in", user.username);
    let resp = flash_redirect(
        next,
        Level::Info,
        format!("You are now logged in as {}.", user.username),
    );
    append_cookie(resp, session_cookie(&token, state.config.session_ttl_hours))
}

pub async fn logout(user: CurrentUser) -> Response {
    info!("User {} logged out", user.username);
    let resp = flash_redirect("/", Level::Info, "You have been logged out.");
    append_cookie(resp, clear_session_cookie())
}
