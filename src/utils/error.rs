use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictError {
    /// One or both detection models are unavailable. A later request retries the load.
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File too large: {0} bytes, max allowed: {1} bytes")]
    FileTooLarge(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl PredictError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PredictError::InvalidImage(_) => StatusCode::BAD_REQUEST,
            PredictError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PredictError::Base64(_) => StatusCode::BAD_REQUEST,
            PredictError::FileTooLarge(_, _) => StatusCode::PAYLOAD_TOO_LARGE,
            PredictError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            PredictError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PredictError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            PredictError::InvalidImage(_) => "INVALID_IMAGE",
            PredictError::Inference(_) => "INFERENCE_ERROR",
            PredictError::InvalidInput(_) => "INVALID_INPUT",
            PredictError::FileTooLarge(_, _) => "FILE_TOO_LARGE",
            PredictError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            PredictError::Config(_) => "CONFIG_ERROR",
            PredictError::Io(_) => "IO_ERROR",
            PredictError::Base64(_) => "BASE64_DECODE_ERROR",
            PredictError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client errors are not worth retrying with the same payload.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = serde_json::json!({
            "status": "error",
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        });

        if self.is_client_error() {
            tracing::warn!("Request rejected: {} ({})", self, status);
        } else {
            tracing::error!("Request failed: {} ({})", self, status);
        }

        (status, axum::Json(error_response)).into_response()
    }
}
