use super::types::{ApiError, HealthResponse, first_query_value};
use crate::{
    imaging::OutputFormat,
    pipeline,
    readiness::{ModelGate, ReadinessState},
};
use axum::{
    body::Bytes,
    extract::{
        Multipart, Query, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use std::{any::Any, sync::Arc, time::Instant};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<ModelGate>,
}

struct Upload {
    filename: String,
    bytes: Bytes,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let status = state.gate.state();
    let code = match status {
        ReadinessState::Ok => StatusCode::OK,
        ReadinessState::Loading => StatusCode::SERVICE_UNAVAILABLE,
    };

    (
        code,
        Json(HealthResponse {
            status,
            model: state.gate.model().to_string(),
        }),
    )
}

pub async fn remove_background(
    State(state): State<AppState>,
    query: Option<Query<Vec<(String, String)>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    // Repeated keys are legal; the first `format` wins.
    let requested_format =
        query.and_then(|Query(pairs)| first_query_value(pairs, "format"));

    process_upload(state, requested_format, multipart)
        .instrument(info_span!("remove_bg", %request_id))
        .await
        .inspect_err(|e| {
            if e.status().is_client_error() {
                warn!("Rejected request: {}", e.message());
            }
        })
}

async fn process_upload(
    state: AppState,
    requested_format: Option<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    // A body that is not multipart/form-data carries no file field.
    let multipart = multipart.map_err(|_| ApiError::MissingFile)?;
    let upload = read_upload(multipart).await?.ok_or(ApiError::MissingFile)?;

    if upload.filename.is_empty() {
        return Err(ApiError::EmptyFilename);
    }

    let format = match requested_format {
        Some(value) => value.parse::<OutputFormat>()?,
        None => OutputFormat::default(),
    };

    let segmenter = state.gate.segmenter().ok_or(ApiError::ModelLoading)?;

    let start = Instant::now();
    let input_size = upload.bytes.len();
    info!(
        model = segmenter.name(),
        filename = %upload.filename,
        input_kb = input_size as f64 / 1024.0,
        format = %format,
        "Processing {} ({:.1} KB), output={}",
        upload.filename,
        input_size as f64 / 1024.0,
        format
    );

    let input = upload.bytes;
    let outcome = tokio::task::spawn_blocking(move || {
        pipeline::remove_background(segmenter.as_ref(), &input, format)
    })
    .await;

    let output = match outcome {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            error!(
                filename = %upload.filename,
                error = ?e,
                "Processing failed for {}: {}",
                upload.filename,
                e
            );
            return Err(ApiError::Processing(e.to_string()));
        }
        Err(join_error) => {
            let detail = if join_error.is_panic() {
                panic_message(join_error.into_panic().as_ref())
            } else {
                join_error.to_string()
            };
            error!(
                filename = %upload.filename,
                "Processing failed for {}: {}",
                upload.filename,
                detail
            );
            return Err(ApiError::Processing(detail));
        }
    };

    let elapsed = start.elapsed();
    info!(
        filename = %upload.filename,
        format = %format,
        output_kb = output.len() as f64 / 1024.0,
        elapsed_ms = elapsed.as_millis() as u64,
        "Done: {} -> {} ({:.1} KB, {:.1}s)",
        upload.filename,
        format,
        output.len() as f64 / 1024.0,
        elapsed.as_secs_f64()
    );

    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", format.download_name()),
            ),
        ],
        output,
    )
        .into_response())
}

/// Pull the first `file` part that carries a filename. Parts without a
/// filename are plain form values and are skipped.
async fn read_upload(mut multipart: Multipart) -> Result<Option<Upload>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some(Upload { filename, bytes }));
    }
    Ok(None)
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::MalformedUpload(e.body_text())
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
