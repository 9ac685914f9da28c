use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use bg_remove_service::{readiness::ModelGate, segmenter::Segmenter, server};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;

pub const BOUNDARY: &str = "bg-remove-test-boundary";

/// Body limit used by test routers unless a test needs a smaller one.
pub const TEST_BODY_LIMIT: usize = 4 * 1024 * 1024;

/// Create a router whose model is already loaded
pub fn create_ready_app(segmenter: Arc<dyn Segmenter>) -> Router {
    server::router(Arc::new(ModelGate::ready(segmenter)), TEST_BODY_LIMIT)
}

/// Create a router whose model is still loading, returning the gate so the
/// test can finish the load later
pub fn create_loading_app(model: &str) -> (Router, Arc<ModelGate>) {
    let gate = Arc::new(ModelGate::new(model));
    (server::router(gate.clone(), TEST_BODY_LIMIT), gate)
}

/// A small opaque test image encoded as `format`
pub fn sample_image(format: ImageFormat) -> Vec<u8> {
    let image = RgbImage::from_fn(24, 16, |x, y| Rgb([(x * 10) as u8, (y * 15) as u8, 128]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

/// One part of a multipart/form-data body
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(name: &'a str, filename: &'a str, content: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            content,
        }
    }

    pub fn text(name: &'a str, content: &'a [u8]) -> Self {
        Self {
            name,
            filename: None,
            content,
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        part.name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name)
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Build a `POST /remove-bg` request carrying the given parts
pub fn upload_request(query: &str, parts: &[Part<'_>]) -> Request<Body> {
    let uri = if query.is_empty() {
        "/remove-bg".to_string()
    } else {
        format!("/remove-bg?{}", query)
    };

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn content_type(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
