use super::extractors::{RequestId, Validate, ValidatedJson};
use super::AppState;
use crate::{
    image::ImageLoader, ripeness::RipenessResult, utils::error::PredictError, Result,
};
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// JSON request body (base64 mode)
#[derive(Debug, Deserialize)]
pub struct PredictJsonRequest {
    /// Base64 image, optionally as a data URL
    pub image: String,
}

impl Validate for PredictJsonRequest {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.image.trim().is_empty() {
            return Err("Image data cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Flat response shape consumed by the mobile client.
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(flatten)]
    pub result: RipenessResult,
    /// Alias of `spoiled` kept for existing app builds
    pub rotten: bool,
    pub processing_time_ms: u64,
    pub timestamp: String,
    pub request_id: String,
}

impl PredictResponse {
    fn success(
        result: RipenessResult,
        filename: Option<String>,
        start: Instant,
        request_id: String,
    ) -> Self {
        Self {
            status: "success",
            filename,
            rotten: result.spoiled,
            result,
            processing_time_ms: start.elapsed().as_millis() as u64,
            timestamp: chrono::Utc::now().to_rfc3339(),
            request_id,
        }
    }
}

/// Multipart upload handler, field `file`
pub async fn predict_upload_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>> {
    let start = Instant::now();
    tracing::info!("Processing multipart predict request: request_id={}", request_id);

    let mut upload: Option<(Bytes, Option<String>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        PredictError::InvalidInput(format!("Failed to read multipart field: {}", e))
    })? {
        let field_name = field.name().unwrap_or("unknown").to_string();

        match field_name.as_str() {
            "file" => {
                if let Some(content_type) = field.content_type() {
                    if !content_type.starts_with("image/")
                        && content_type != "application/octet-stream"
                    {
                        return Err(PredictError::UnsupportedFormat(content_type.to_string()));
                    }
                }

                let client_filename = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(|e| {
                    PredictError::InvalidInput(format!("Failed to read file data: {}", e))
                })?;

                if data.is_empty() {
                    return Err(PredictError::InvalidInput("Empty file".to_string()));
                }

                tracing::debug!("Received file {:?}: {} bytes", client_filename, data.len());
                upload = Some((data, client_filename));
            }
            _ => {
                tracing::debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let (data, client_filename) =
        upload.ok_or_else(|| PredictError::InvalidInput("No file provided".to_string()))?;

    // only photos that were actually scored are kept
    let result = run_pipeline(&state, data.clone()).await?;
    let stored = state.uploads.save(&data, client_filename.as_deref()).await?;

    tracing::info!(
        "Upload predict completed: request_id={}, stored={}, total={}, time={:.3}s",
        request_id,
        stored.filename,
        result.total,
        start.elapsed().as_secs_f32()
    );

    Ok(Json(PredictResponse::success(
        result,
        Some(stored.filename),
        start,
        request_id,
    )))
}

/// JSON base64 handler. Nothing is written to the upload directory.
pub async fn predict_json_handler(
    State(state): State<AppState>,
    RequestId(request_id): RequestId,
    ValidatedJson(request): ValidatedJson<PredictJsonRequest>,
) -> Result<Json<PredictResponse>> {
    let start = Instant::now();
    tracing::info!("Processing JSON predict request: request_id={}", request_id);

    let data = ImageLoader::decode_base64(&request.image)?;
    let result = run_pipeline(&state, Bytes::from(data)).await?;

    tracing::info!(
        "JSON predict completed: request_id={}, total={}, time={:.3}s",
        request_id,
        result.total,
        start.elapsed().as_secs_f32()
    );

    Ok(Json(PredictResponse::success(result, None, start, request_id)))
}

async fn run_pipeline(state: &AppState, data: Bytes) -> Result<RipenessResult> {
    let pipeline = state.pipeline.clone();
    tokio::task::spawn_blocking(move || pipeline.predict(&data))
        .await
        .map_err(|e| PredictError::Internal(format!("Prediction task failed: {}", e)))?
}
