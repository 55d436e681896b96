use async_trait::async_trait;
use axum::extract::{rejection::JsonRejection, FromRequest, Request};
use axum::Json;
use tracing::warn;

use crate::error::AppError;

/// `axum::Json` whose rejections render as `InvalidRequest` with a `{"detail"}` body.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "request body rejected");
        AppError::InvalidRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Login {
        email: String,
    }

    fn json_request(body: &str) -> Request {
        http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn well_formed_body_is_extracted() {
        let JsonBody(login) = JsonBody::<Login>::from_request(json_request(r#"{"email":"a@inst.edu"}"#), &())
            .await
            .unwrap();
        assert_eq!(login.email, "a@inst.edu");
    }

    #[tokio::test]
    async fn missing_field_becomes_invalid_request() {
        let err = JsonBody::<Login>::from_request(json_request("{}"), &())
            .await
            .unwrap_err();
        assert!(matches!(&err, AppError::InvalidRequest(msg) if msg.contains("email")));
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_content_type_is_a_bad_request() {
        let req = http::Request::builder()
            .method("POST")
            .body(Body::from(r#"{"email":"a@inst.edu"}"#))
            .unwrap();
        let err = JsonBody::<Login>::from_request(req, &()).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }
}
