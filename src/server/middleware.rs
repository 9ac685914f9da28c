use super::{handlers::panic_message, types::ApiError};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;
use tracing::{error, warn};

/// Reject uploads whose declared `Content-Length` is over the limit before
/// any handler runs. Bodies without the header are bounded while streaming.
pub async fn reject_oversized(
    State(max_body_bytes): State<usize>,
    request: Request,
    next: Next,
) -> Response {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    if let Some(length) = declared {
        if length > max_body_bytes as u64 {
            warn!(
                "Rejected {} byte body (limit {} bytes)",
                length, max_body_bytes
            );
            return ApiError::PayloadTooLarge.into_response();
        }
    }

    next.run(request).await
}

/// Last-resort handler for panics that escape a request handler.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    error!("Unhandled server error: {}", panic_message(payload.as_ref()));
    ApiError::Internal.into_response()
}
