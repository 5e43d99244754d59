// tests/common/mod.rs
// Shared fixtures: an in-process fake provider and an app wired against it

#![allow(dead_code)]

use axum::{
    Json, Router,
    body::Body,
    http::{Request, Response, StatusCode},
    routing::{get, post},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tower::ServiceExt;

use storyteller::api::http::app_router;
use storyteller::config::StoryConfig;
use storyteller::create_app_state;

pub const STORY: &str =
    "Marta kept the old lighthouse burning.\n\nOne night a ship found its way home.";
pub const SUMMARY: &str = "The keeper of an old lighthouse guides a lost ship home.";
pub const DESCRIPTION: &str = "One.\n\nTwo.\n\nThree.\n\nFour.\n\nFive.";

/// Request counters for the fake provider
#[derive(Default)]
pub struct ProviderHits {
    pub chat: AtomicUsize,
    pub images: AtomicUsize,
}

impl ProviderHits {
    pub fn chat(&self) -> usize {
        self.chat.load(Ordering::SeqCst)
    }

    pub fn images(&self) -> usize {
        self.images.load(Ordering::SeqCst)
    }
}

pub struct TestApp {
    pub router: Router,
    pub provider_base: String,
    pub hits: Arc<ProviderHits>,
    pub scratch: TempDir,
}

fn completion(content: &str) -> Value {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(32, 24, image::Rgb([20, 60, 140]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// Chat completions answer by request shape: multimodal content gets the
/// image narration, a summarizer system prompt gets the summary, anything
/// else gets the story.
async fn spawn_provider(hits: Arc<ProviderHits>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let chat_hits = hits.clone();
    let image_hits = hits;
    let cover_url = format!("{base}/files/cover.png");
    let png = png_bytes();

    let app = Router::new()
        .route(
            "/v1/chat/completions",
            post(move |Json(body): Json<Value>| {
                let hits = chat_hits.clone();
                async move {
                    hits.chat.fetch_add(1, Ordering::SeqCst);
                    let first = &body["messages"][0]["content"];
                    let reply = if first.is_array() {
                        DESCRIPTION
                    } else if first.as_str().unwrap_or_default().contains("summarize") {
                        SUMMARY
                    } else {
                        STORY
                    };
                    Json(completion(reply))
                }
            }),
        )
        .route(
            "/v1/images/generations",
            post(move || {
                let hits = image_hits.clone();
                let url = cover_url.clone();
                async move {
                    hits.images.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "data": [{ "url": url }] }))
                }
            }),
        )
        .route(
            "/files/cover.png",
            get(move || {
                let png = png.clone();
                async move { png }
            }),
        );

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    base
}

pub async fn test_app() -> TestApp {
    let hits = Arc::new(ProviderHits::default());
    let provider_base = spawn_provider(hits.clone()).await;
    let scratch = tempfile::tempdir().unwrap();

    let config = StoryConfig {
        openai_api_key: Some("test-key".to_string()),
        openai_base_url: format!("{provider_base}/v1"),
        retry_base_secs: 0,
        scratch_dir: scratch.path().to_path_buf(),
        ..StoryConfig::from_env()
    };

    let state = create_app_state(config).unwrap();
    TestApp {
        router: app_router(Arc::new(state)),
        provider_base,
        hits,
        scratch,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Response<Body> {
        let request = Request::post(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn assert_error(status: StatusCode, json: &Value, expected: StatusCode, code: &str) {
    assert_eq!(status, expected, "unexpected status, body: {json}");
    assert_eq!(json["error_code"], code);
    assert_eq!(json["status"], expected.as_u16());
}

/// Hand-built multipart body with one file part
pub fn multipart_body(
    field: &str,
    file_name: &str,
    mime: &str,
    bytes: &[u8],
) -> (String, Vec<u8>) {
    let boundary = "storyteller-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    let disposition =
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n");
    body.extend_from_slice(disposition.as_bytes());
    body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

pub fn sample_png() -> Vec<u8> {
    png_bytes()
}
