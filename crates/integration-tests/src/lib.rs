//! Integration tests for qrtag.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p qrtag-integration-tests
//! ```
//!
//! The tests drive the real router and services in process. Collaborators
//! are the in-memory data store, object store and auth provider, and sessions
//! use `tower_sessions::MemoryStore`, so no database or network is needed.
//!
//! # Test Categories
//!
//! - `claim_lifecycle` - claim status, concurrent claims, registration binding
//! - `profile_edits` - validation, photo replacement, concurrent edits
//! - `http_api` - request/response behavior over the assembled router
//! - `media_pipeline` - size-bounded encoding on large and noisy inputs

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::io::Cursor;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use qrtag_server::db::{MemoryProfileStore, ProfileStore};
use qrtag_server::media::MediaSettings;
use qrtag_server::middleware::session::{SESSION_COOKIE_NAME, session_layer_with_store};
use qrtag_server::services::{AuthProvider, MemoryAuthProvider};
use qrtag_server::state::AppState;
use qrtag_server::storage::{MemoryObjectStore, ObjectStore};

/// Request body limit used by test routers.
pub const TEST_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Password accepted by the auth provider's strength rules.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// An assembled application over in-memory collaborators.
pub struct TestApp {
    pub auth: Arc<MemoryAuthProvider>,
    pub profiles: Arc<MemoryProfileStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub state: AppState,
}

impl TestApp {
    /// Build an app with default media settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_media(MediaSettings::default())
    }

    /// Build an app with custom media settings.
    #[must_use]
    pub fn with_media(media: MediaSettings) -> Self {
        let auth = Arc::new(MemoryAuthProvider::new());
        let profiles = Arc::new(MemoryProfileStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let state = build_state(
            Arc::clone(&auth) as Arc<dyn AuthProvider>,
            Arc::clone(&profiles) as Arc<dyn ProfileStore>,
            Arc::clone(&objects) as Arc<dyn ObjectStore>,
            media,
        );
        Self {
            auth,
            profiles,
            objects,
            state,
        }
    }

    /// A fresh client with its own cookie jar.
    #[must_use]
    pub fn client(&self) -> TestClient {
        TestClient::new(build_router(self.state.clone()))
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire services over arbitrary collaborators.
#[must_use]
pub fn build_state(
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    objects: Arc<dyn ObjectStore>,
    media: MediaSettings,
) -> AppState {
    AppState::new(auth, profiles, objects, media).expect("default media settings are valid")
}

/// The production routes with an in-memory session layer.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    qrtag_server::routes::routes(TEST_BODY_LIMIT)
        .layer(session_layer_with_store(MemoryStore::default(), false))
        .with_state(state)
}

// =============================================================================
// HTTP client
// =============================================================================

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl TestResponse {
    /// Parse the body as JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

/// Sends requests to a router, carrying the session cookie between them.
pub struct TestClient {
    router: Router,
    cookie: Option<String>,
}

impl TestClient {
    #[must_use]
    pub const fn new(router: Router) -> Self {
        Self {
            router,
            cookie: None,
        }
    }

    /// Whether the client currently holds a session cookie.
    #[must_use]
    pub const fn has_session(&self) -> bool {
        self.cookie.is_some()
    }

    /// Send a request, attaching and then updating the session cookie.
    pub async fn send(&mut self, mut request: Request<Body>) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request.headers_mut().insert(
                header::COOKIE,
                cookie.parse().expect("cookie is a valid header value"),
            );
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        for value in response.headers().get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            let Some(pair) = value.split(';').next() else {
                continue;
            };
            let Some((name, token)) = pair.split_once('=') else {
                continue;
            };
            if name.trim() != SESSION_COOKIE_NAME {
                continue;
            }
            let expired = value.to_ascii_lowercase().contains("max-age=0");
            self.cookie = (!token.is_empty() && !expired).then(|| pair.trim().to_string());
        }

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body is readable");
        TestResponse { status, body }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = Request::get(uri)
            .body(Body::empty())
            .expect("valid request");
        self.send(request).await
    }

    pub async fn post_json(&mut self, uri: &str, body: &Value) -> TestResponse {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request");
        self.send(request).await
    }

    pub async fn post_empty(&mut self, uri: &str) -> TestResponse {
        let request = Request::post(uri)
            .body(Body::empty())
            .expect("valid request");
        self.send(request).await
    }

    pub async fn post_multipart(&mut self, uri: &str, form: MultipartForm) -> TestResponse {
        let (content_type, body) = form.finish();
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .expect("valid request");
        self.send(request).await
    }

    /// Register through the API and keep the resulting session.
    pub async fn register(&mut self, email: &str, code: Option<&str>) -> TestResponse {
        let mut body = serde_json::json!({ "email": email, "password": TEST_PASSWORD });
        if let Some(code) = code {
            body["code"] = Value::from(code);
        }
        self.post_json("/auth/register", &body).await
    }
}

/// Minimal `multipart/form-data` body builder.
#[derive(Debug, Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

const BOUNDARY: &str = "qrtag-test-boundary";

impl MultipartForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    #[must_use]
    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Content type header value and encoded body.
    #[must_use]
    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={BOUNDARY}"), self.body)
    }
}

// =============================================================================
// Image fixtures
// =============================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        #[allow(clippy::cast_possible_truncation)]
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// A smooth gradient encoded as PNG.
#[must_use]
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(gradient(width, height))
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("PNG encoding succeeds");
    out
}

/// A smooth gradient encoded as JPEG at the given quality.
#[must_use]
pub fn jpeg_bytes(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(&DynamicImage::ImageRgb8(gradient(width, height)))
        .expect("JPEG encoding succeeds");
    out
}

/// Deterministic high-entropy noise encoded as PNG. Compresses poorly, so
/// a few hundred thousand pixels yield a multi-megabyte file.
#[must_use]
pub fn noise_png(width: u32, height: u32, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    let img: RgbImage = ImageBuffer::from_fn(width, height, |_, _| {
        // xorshift64
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let [r, g, b, ..] = state.to_le_bytes();
        Rgb([r, g, b])
    });
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("PNG encoding succeeds");
    out
}

/// Decode stored bytes and return their dimensions.
#[must_use]
pub fn dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).expect("stored object is an image");
    (img.width(), img.height())
}

/// Whether `data` starts with the JPEG SOI marker.
#[must_use]
pub fn is_jpeg(data: &[u8]) -> bool {
    data.starts_with(&[0xFF, 0xD8])
}
