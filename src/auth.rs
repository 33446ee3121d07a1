use crate::config::Config;
use crate::models::{ErrorResponse, ErrorDetail};
use crate::provider_client::ProviderClient;
use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, Request},
    response::{IntoResponse, Response},
    Json,
    middleware::Next,
};
use tracing::{info, debug};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub token: Option<String>,
    pub provider_client: ProviderClient,
}

impl AppState {
    /// Copy of the current config so a reload cannot change settings in the
    /// middle of a request.
    pub async fn config_snapshot(&self) -> Config {
        self.config.read().await.clone()
    }
}

fn unauthorized(message: &str, code: &str) -> Response {
    let error_response = ErrorResponse {
        error: ErrorDetail {
            message: message.to_string(),
            r#type: "invalid_request_error".to_string(),
            code: Some(code.to_string()),
        },
    };
    (StatusCode::UNAUTHORIZED, Json(error_response)).into_response()
}

/// Guards the provider-backed `/api/*` routes. The page and health check stay
/// public so a browser can load the form.
pub async fn require_authorization(
    State(app_state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    if !request.uri().path().starts_with("/api/") {
        return Ok(next.run(request).await);
    }

    let Some(expected) = app_state.token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided_token = request.headers()
        .get("Authorization")
        .and_then(|hv| hv.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").map(|t| t.trim()));

    match provided_token {
        None => {
            info!("Missing Authorization header");
            Err(unauthorized("Authorization header is required", "missing_auth_header"))
        }
        Some(token) if token != expected => {
            info!("Invalid token provided");
            Err(unauthorized("Invalid authentication token", "invalid_token"))
        }
        Some(_) => {
            debug!("Token validation successful");
            Ok(next.run(request).await)
        }
    }
}
