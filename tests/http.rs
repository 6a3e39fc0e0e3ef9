//! Drives the router end to end against the in-memory repositories.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use chrono::Utc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use research_catalog::config::Config;
use research_catalog::db::{DatasetRepository, MemoryDatasetRepository, MemoryUserRepository, UserRepository};
use research_catalog::models::User;
use research_catalog::routers::make_routes;
use research_catalog::services::ingest::{handle_upload, UploadRequest, UploadedFile};
use research_catalog::state::AppState;
use research_catalog::storage::FileStore;
use research_catalog::utils::hashing::hash_password;
use research_catalog::utils::jwt::generate_jwt;

const BOUNDARY: &str = "----catalogtestboundary";

struct Harness {
    router: Router,
    datasets: MemoryDatasetRepository,
    users: MemoryUserRepository,
    config: Config,
    _media: TempDir,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let media = TempDir::new().expect("tempdir");
        let mut config = Config::for_media_root(media.path());
        adjust(&mut config);
        let datasets = MemoryDatasetRepository::new();
        let users = MemoryUserRepository::new();
        let state = AppState::new(Arc::new(datasets.clone()), Arc::new(users.clone()), config.clone());
        Self {
            router: make_routes(state),
            datasets,
            users,
            config,
            _media: media,
        }
    }

    fn store(&self) -> FileStore {
        FileStore::new(self.config.media_root.clone())
    }

    async fn session_cookie(&self) -> String {
        let user = User {
            user_id: Uuid::new_v4(),
            username: "testuser".into(),
            email: "test@example.com".into(),
            password: hash_password("testpass123").expect("hash"),
            created_at: Utc::now(),
        };
        self.users.create(&user).await.expect("create user");
        let token = generate_jwt(&user, &self.config.jwt_secret, 1).expect("token");
        format!("session={}", token)
    }

    async fn seed(&self, title: &str, author: &str, file_name: &str, data: &'static [u8]) -> Uuid {
        let req = UploadRequest {
            title: Some(title.into()),
            author: Some(author.into()),
            description: Some("Test description".into()),
            file: Some(UploadedFile {
                file_name: file_name.into(),
                data: Bytes::from_static(data),
            }),
        };
        handle_upload(&self.datasets, &self.store(), req, u64::MAX)
            .await
            .expect("seed dataset")
            .id
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
        let resp = self.router.clone().oneshot(req).await.expect("route request");
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = axum::body::to_bytes(resp.into_body(), 16 * 1024 * 1024)
            .await
            .expect("read body");
        (status, headers, String::from_utf8_lossy(&body).into_owned())
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, axum::http::HeaderMap, String) {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).expect("request")).await
    }

    async fn post_form(&self, uri: &str, form: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .expect("request");
        self.send(req).await
    }
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, data)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(cookie: &str, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::POST).uri("/upload/");
    if !cookie.is_empty() {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .expect("request")
}

fn location(headers: &axum::http::HeaderMap) -> &str {
    headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn set_cookies(headers: &axum::http::HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}

fn flash_text(headers: &axum::http::HeaderMap) -> String {
    set_cookies(headers)
        .into_iter()
        .find_map(|c| c.strip_prefix("flash=").map(|rest| rest.split(';').next().unwrap_or("").to_string()))
        .map(|raw| {
            percent_encoding::percent_decode_str(&raw)
                .decode_utf8_lossy()
                .into_owned()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn home_page_renders_for_anonymous_visitors() {
    let h = Harness::new();
    let (status, _, body) = h.get("/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Research Data Repository"));
    assert!(!body.contains("action=\"/upload/\""));
}

#[tokio::test]
async fn gated_pages_redirect_to_login() {
    let h = Harness::new();
    let id = h.seed("Test Dataset", "Test Author", "test.csv", b"col1,col2\nval1,val2").await;

    for path in [format!("/preview/{}/", id), format!("/download/{}/", id)] {
        let (status, headers, _) = h.get(&path, None).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert!(location(&headers).starts_with("/login/?next="));
    }
}

#[tokio::test]
async fn get_upload_redirects_to_listing() {
    let h = Harness::new();
    let cookie = h.session_cookie().await;
    let (status, headers, _) = h.get("/upload/", Some(&cookie)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/");
}

#[tokio::test]
async fn register_then_login_sets_session() {
    let h = Harness::new();

    let (status, headers, _) = h
        .post_form(
            "/register/",
            "username=newuser&email=new%40example.com&password1=testpass123&password2=testpass123",
        )
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/login/");
    assert!(flash_text(&headers).contains("Account created for new@example.com!"));

    let (status, headers, _) = h
        .post_form("/login/", "username=newuser&password=testpass123&next=%2Fsearch%2F")
        .await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/search/");
    let session = set_cookies(&headers)
        .into_iter()
        .find(|c| c.starts_with("session="))
        .expect("session cookie");
    assert!(session.contains("HttpOnly"));

    let cookie = session.split(';').next().unwrap_or_default().to_string();
    let (_, _, body) = h.get("/", Some(&cookie)).await;
    assert!(body.contains("Signed in as newuser"));
    assert!(body.contains("action=\"/upload/\""));
}

#[tokio::test]
async fn wrong_password_shows_generic_error() {
    let h = Harness::new();
    h.session_cookie().await;
    let (status, headers, body) = h.post_form("/login/", "username=testuser&password=nope").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Invalid username/email or password."));
    assert!(set_cookies(&headers).iter().all(|c| !c.starts_with("session=")));
}

#[tokio::test]
async fn multipart_upload_assigns_a_doi() {
    let h = Harness::new();
    let cookie = h.session_cookie().await;
    let body = multipart_body(
        &[
            ("title", "Test Dataset"),
            ("author", "Test Author"),
            ("description", "Test description"),
        ],
        Some(("test.csv", &b"col1,col2\nval1,val2"[..])),
    );

    let (status, headers, _) = h.send(upload_request(&cookie, body)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/");

    let stored = h.datasets.list_ordered(0, 10).await.expect("list");
    assert_eq!(stored.len(), 1);
    let dataset = &stored[0];
    assert!(dataset.doi.starts_with("10."));
    assert_eq!(dataset.file_type, "csv");
    assert_eq!(dataset.file_size, 19);
    assert_eq!(
        flash_text(&headers),
        format!("success:Dataset uploaded successfully! DOI: {}", dataset.doi)
    );
}

#[tokio::test]
async fn executable_upload_is_rejected() {
    let h = Harness::new();
    let cookie = h.session_cookie().await;
    let body = multipart_body(
        &[("title", "T"), ("author", "A"), ("description", "D")],
        Some(("test.exe", &b"MZ"[..])),
    );

    let (status, headers, _) = h.send(upload_request(&cookie, body)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert!(flash_text(&headers).starts_with("error:Unsupported file type"));
    assert_eq!(h.datasets.count(None).await.expect("count"), 0);
}

#[tokio::test]
async fn upload_without_file_reports_missing_fields() {
    let h = Harness::new();
    let cookie = h.session_cookie().await;
    let body = multipart_body(&[("title", "T"), ("author", "A"), ("description", "D")], None);

    let (_, headers, _) = h.send(upload_request(&cookie, body)).await;
    assert_eq!(flash_text(&headers), "error:All fields are required.");
    assert_eq!(h.datasets.count(None).await.expect("count"), 0);
}

#[tokio::test]
async fn upload_requires_a_session() {
    let h = Harness::new();
    let body = multipart_body(
        &[("title", "T"), ("author", "A"), ("description", "D")],
        Some(("test.csv", &b"a,b"[..])),
    );

    let (status, headers, _) = h.send(upload_request("", body)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/login/?next=%2Fupload%2F");
    assert_eq!(h.datasets.count(None).await.expect("count"), 0);
}

#[tokio::test]
async fn request_body_over_the_limit_is_too_large() {
    let h = Harness::with_config(|c| c.max_upload_bytes = 16);
    let cookie = h.session_cookie().await;
    let big = vec![b'x'; 2 * 1024 * 1024];
    let body = multipart_body(
        &[("title", "T"), ("author", "A"), ("description", "D")],
        Some(("big.csv", &big[..])),
    );

    let (status, headers, _) = h.send(upload_request(&cookie, body)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location(&headers), "/");
    assert!(flash_text(&headers).starts_with("error:File is too large"));
    assert_eq!(h.datasets.count(None).await.expect("count"), 0);
    assert!(!h.config.media_root.join("datasets").exists());
}

#[tokio::test]
async fn preview_shows_and_clears_the_flash() {
    let h = Harness::new();
    let cookie = h.session_cookie().await;
    let id = h.seed("Test Dataset", "Test Author", "test.csv", b"col1,col2\nval1,val2").await;

    let cookies = format!("{}; flash=info:You%20are%20now%20logged%20in%20as%20testuser.", cookie);
    let (status, headers, body) = h.get(&format!("/preview/{}/", id), Some(&cookies)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("You are now logged in as testuser."));
    assert!(set_cookies(&headers)
        .iter()
        .any(|c| c.starts_with("flash=;") && c.contains("Max-Age=0")));
}

#[tokio::test]
async fn search_matches_title_or_author() {
    let h = Harness::new();
    h.seed("Alpha Data", "Jones", "a.csv", b"a\n1").await;
    h.seed("Beta Data", "Alpha Smith", "b.csv", b"b\n2").await;

    let (status, _, body) = h.get("/search/?query=Alpha", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Alpha Data"));
    assert!(body.contains("Beta Data"));

    let (_, _, body) = h.get("/search/?query=Zephyr", None).await;
    assert!(body.contains("No datasets found."));
}

#[tokio::test]
async fn preview_shows_csv_rows() {
    let h = Harness::new();
    let cookie = h.session_cookie().await;
    let id = h.seed("Test Dataset", "Test Author", "test.csv", b"col1,col2\nval1,val2").await;

    let (status, _, body) = h.get(&format!("/preview/{}/", id), Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("preview-table"));
    assert!(body.contains("<th>col1</th><th>col2</th>"));
    assert!(body.contains("<td>val1</td><td>val2</td>"));
}

#[tokio::test]
async fn preview_of_unknown_dataset_flashes_not_found() {
    let h = Harness::new();
    let cookie = h.session_cookie().await;
    for path in [format!("/preview/{}/", Uuid::new_v4()), "/preview/not-a-uuid/".to_string()] {
        let (status, headers, _) = h.get(&path, Some(&cookie)).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location(&headers), "/");
        assert_eq!(flash_text(&headers), "error:Dataset not found.");
    }
}

#[tokio::test]
async fn download_returns_attachment() {
    let h = Harness::new();
    let cookie = h.session_cookie().await;
    let id = h.seed("Test Dataset", "Test Author", "test.csv", b"col1,col2\nval1,val2").await;

    let (status, headers, body) = h.get(&format!("/download/{}/", id), Some(&cookie)).await;
    assert_eq!(status, StatusCode::OK);
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/") || content_type.starts_with("application/"));
    assert_eq!(
        headers.get(header::CONTENT_DISPOSITION).and_then(|v| v.to_str().ok()),
        Some("attachment; filename=\"test.csv\"")
    );
    assert_eq!(
        headers.get(header::CONTENT_LENGTH).and_then(|v| v.to_str().ok()),
        Some("19")
    );
    assert_eq!(body, "col1,col2\nval1,val2");
}

#[tokio::test]
async fn logout_clears_session() {
    let h = Harness::new();
    let cookie = h.session_cookie().await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/logout/")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .expect("request");
    let (status, headers, _) = h.send(req).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert!(set_cookies(&headers).iter().any(|c| c.starts_with("session=;") && c.contains("Max-Age=0")));
    assert_eq!(flash_text(&headers), "info:You have been logged out.");
}
