use crate::models::{ErrorDetail, ErrorResponse};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Stability,
    ElevenLabs,
}

impl Provider {
    pub fn name(self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Stability => "stability",
            Provider::ElevenLabs => "elevenlabs",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("no API key configured for {0}")]
    MissingApiKey(Provider),

    #[error("failed to reach {provider}: {source}")]
    Transport {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: Provider,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode {provider} response: {source}")]
    Decode {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} response is missing {field}")]
    MissingField {
        provider: Provider,
        field: &'static str,
    },
}

impl ProviderError {
    pub fn transport(provider: Provider) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| ProviderError::Transport { provider, source }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error", "invalid_request"),
            AppError::Provider(err) => match err {
                ProviderError::MissingApiKey(_) => (StatusCode::INTERNAL_SERVER_ERROR, "api_error", "missing_api_key"),
                ProviderError::Transport { source, .. } if source.is_timeout() => {
                    (StatusCode::GATEWAY_TIMEOUT, "api_error", "upstream_timeout")
                }
                ProviderError::Transport { .. } => (StatusCode::BAD_GATEWAY, "api_error", "request_failed"),
                ProviderError::Status { .. } => (StatusCode::BAD_GATEWAY, "api_error", "upstream_error"),
                ProviderError::Decode { .. } | ProviderError::MissingField { .. } => {
                    (StatusCode::BAD_GATEWAY, "api_error", "invalid_upstream_response")
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, r#type, code) = self.parts();
        warn!("Request failed with {}: {}", status, self);
        let error_response = ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: r#type.to_string(),
                code: Some(code.to_string()),
            },
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::Value;

    async fn body_json(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_bad_request_response() {
        let resp = AppError::BadRequest("prompt must not be empty".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["message"], "prompt must not be empty");
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert_eq!(json["error"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn test_upstream_status_is_bad_gateway() {
        let err = AppError::from(ProviderError::Status {
            provider: Provider::Stability,
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: "invalid key".to_string(),
        });
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], "upstream_error");
        assert_eq!(json["error"]["message"], "stability returned 401 Unauthorized: invalid key");
    }

    #[tokio::test]
    async fn test_missing_key_and_field() {
        let resp = AppError::from(ProviderError::MissingApiKey(Provider::ElevenLabs)).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"]["message"], "no API key configured for elevenlabs");

        let resp = AppError::from(ProviderError::MissingField { provider: Provider::OpenAI, field: "choices" })
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(resp).await["error"]["code"], "invalid_upstream_response");
    }
}
