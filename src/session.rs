//! Session identity and flash messages carried in cookies.

use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use std::convert::Infallible;
use uuid::Uuid;

use crate::state::AppState;
use crate::utils::jwt::decode_jwt;

pub const SESSION_COOKIE: &str = "session";
pub const FLASH_COOKIE: &str = "flash";
pub const LOGIN_PATH: &str = "/login/";

/// Value of cookie `name` from the request's `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

pub fn session_cookie(token: &str, ttl_hours: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        ttl_hours * 3600
    )
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub username: String,
}

impl CurrentUser {
    pub fn from_headers(headers: &HeaderMap, secret: &str) -> Option<Self> {
        let token = bearer_token(headers).or_else(|| cookie_value(headers, SESSION_COOKIE))?;
        let claims = decode_jwt(&token, secret).ok()?;
        Some(Self {
            user_id: claims.sub,
            username: claims.username,
        })
    }
}

pub fn login_redirect(next: &str) -> Response {
    let target = format!("{}?next={}", LOGIN_PATH, utf8_percent_encode(next, NON_ALPHANUMERIC));
    Redirect::to(&target).into_response()
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_headers(&parts.headers, &state.config.jwt_secret) {
            Some(user) => Ok(user),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str())
                    .unwrap_or("/");
                Err(login_redirect(next))
            }
        }
    }
}

/// The caller if logged in, for pages that are public but show who is signed in.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(CurrentUser::from_headers(
            &parts.headers,
            &state.config.jwt_secret,
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Info => "info",
            Level::Error => "error",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "success" => Level::Success,
            "error" => Level::Error,
            _ => Level::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashMessage {
    pub level: Level,
    pub message: String,
}

impl FlashMessage {
    fn encode(&self) -> String {
        format!(
            "{}:{}",
            self.level.as_str(),
            utf8_percent_encode(&self.message, NON_ALPHANUMERIC)
        )
    }

    fn decode(raw: &str) -> Option<Self> {
        let (level, message) = raw.split_once(':')?;
        let message = percent_decode_str(message).decode_utf8_lossy().into_owned();
        if message.is_empty() {
            return None;
        }
        Some(Self {
            level: Level::parse(level),
            message,
        })
    }
}

/// Flash message left by the previous redirect, if any.
///
/// Pages that display it must also send [`clear_flash_cookie`].
#[derive(Debug, Clone)]
pub struct Flash(pub Option<FlashMessage>);

impl<S: Send + Sync> FromRequestParts<S> for Flash {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Flash(
            cookie_value(&parts.headers, FLASH_COOKIE).and_then(|raw| FlashMessage::decode(&raw)),
        ))
    }
}

pub fn clear_flash_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", FLASH_COOKIE)
}

/// 303 redirect to `to` carrying a one-shot flash message.
pub fn flash_redirect(to: &str, level: Level, message: impl Into<String>) -> Response {
    let flash = FlashMessage {
        level,
        message: message.into(),
    };
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", FLASH_COOKIE, flash.encode());
    (AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to(to)).into_response()
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.contains('\\') => n,
        _ => "/",
    }
}
