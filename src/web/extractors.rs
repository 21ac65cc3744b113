use crate::utils::error::PredictError;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

const MAX_REQUEST_ID_LEN: usize = 128;

/// JSON body that has passed [`Validate`]. Rejections use the same error
/// envelope as the handlers, code `INVALID_INPUT`.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = PredictError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| PredictError::InvalidInput(rejection.body_text()))?;

        value.validate().map_err(PredictError::InvalidInput)?;
        Ok(ValidatedJson(value))
    }
}

/// Request body checks that go beyond deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Client-supplied `X-Request-ID`, or a fresh UUID. Oversized ids are replaced.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let supplied = parts
            .headers
            .get("X-Request-ID")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN);

        Ok(RequestId(match supplied {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[derive(serde::Deserialize)]
    struct Payload {
        image: String,
    }

    impl Validate for Payload {
        fn validate(&self) -> Result<(), String> {
            if self.image.is_empty() {
                return Err("empty".to_string());
            }
            Ok(())
        }
    }

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        let ValidatedJson(payload) =
            ValidatedJson::<Payload>::from_request(json_request(r#"{"image":"abc"}"#), &())
                .await
                .unwrap();
        assert_eq!(payload.image, "abc");
    }

    #[tokio::test]
    async fn rejects_malformed_and_invalid_bodies() {
        let err = ValidatedJson::<Payload>::from_request(json_request("{"), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PredictError::InvalidInput(_)));

        let err = ValidatedJson::<Payload>::from_request(json_request(r#"{"image":""}"#), &())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PredictError::InvalidInput(msg) if msg == "empty"));
    }

    #[tokio::test]
    async fn request_id_falls_back_to_uuid() {
        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let (mut parts, _) = Request::builder()
            .header("X-Request-ID", long)
            .body(())
            .unwrap()
            .into_parts();

        let RequestId(id) = RequestId::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }
}
