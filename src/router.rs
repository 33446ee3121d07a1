use crate::auth::{self, AppState};
use crate::error::{AppError, AppResult, Provider, ProviderError};
use crate::models::{ImagesRequest, ImagesResponse, SpeechRequest, StoryRequest, StoryResponse};
use crate::prompts;
use crate::providers::elevenlabs::ElevenLabsRequest;
use crate::providers::openai::OpenAIRequest;
use crate::providers::stability::StabilityRequest;
use crate::request_id::{self, RequestId};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header::CONTENT_TYPE, HeaderValue},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

const INDEX_HTML: &str = include_str!("../static/index.html");

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(|| async { "OK" }))
        .route("/api/openai", post(create_story))
        .route("/api/stability", post(create_images))
        .route("/api/elevenlabs", post(create_speech))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_authorization,
        ))
        .layer(axum::middleware::from_fn(request_id::inject_request_id))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

fn require_text<'a>(value: &'a str, field: &str) -> AppResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(value)
}

#[axum_macros::debug_handler]
pub async fn create_story(
    State(state): State<AppState>,
    request_id: RequestId,
    payload: Result<Json<StoryRequest>, JsonRejection>,
) -> AppResult<Json<StoryResponse>> {
    let Json(request) = payload?;
    let prompt = require_text(&request.prompt, "prompt")?;
    let config = state.config_snapshot().await;

    let chat = OpenAIRequest::new(&config.openai.model, prompts::story_messages(prompt))
        .with_max_tokens(config.openai.story_max_tokens);
    let completion = state.provider_client.chat_completion(&config, &chat, &request_id).await?;
    let story = completion.first_content().ok_or(ProviderError::MissingField {
        provider: Provider::OpenAI,
        field: "choices",
    })?;
    if story.is_empty() {
        return Err(ProviderError::MissingField { provider: Provider::OpenAI, field: "story content" }.into());
    }

    info!("Generated story of {} chars", story.chars().count());
    Ok(Json(StoryResponse { story }))
}

/// Derives captions from the story with one chat completion, then renders
/// one image per caption. Images come back in caption order.
#[axum_macros::debug_handler]
pub async fn create_images(
    State(state): State<AppState>,
    request_id: RequestId,
    payload: Result<Json<ImagesRequest>, JsonRejection>,
) -> AppResult<Json<ImagesResponse>> {
    let Json(request) = payload?;
    let story = require_text(&request.story, "story")?;
    let config = state.config_snapshot().await;

    let chat = OpenAIRequest::new(&config.openai.model, prompts::image_prompt_messages(story));
    let completion = state.provider_client.chat_completion(&config, &chat, &request_id).await?;
    let content = completion.first_content().ok_or(ProviderError::MissingField {
        provider: Provider::OpenAI,
        field: "choices",
    })?;

    let captions = prompts::split_image_prompts(&content, config.stability.image_count);
    if captions.is_empty() {
        return Err(ProviderError::MissingField { provider: Provider::OpenAI, field: "image prompts" }.into());
    }
    debug!("Image captions: {:?}", captions);

    let mut images = Vec::with_capacity(captions.len());
    for caption in &captions {
        let image_request = StabilityRequest::for_caption(caption, &config.stability);
        let generated = state.provider_client.text_to_image(&config, &image_request, &request_id).await?;
        let image = generated.into_first_image().ok_or(ProviderError::MissingField {
            provider: Provider::Stability,
            field: "artifacts",
        })?;
        images.push(image);
    }

    info!("Generated {} images", images.len());
    Ok(Json(ImagesResponse { images }))
}

#[axum_macros::debug_handler]
pub async fn create_speech(
    State(state): State<AppState>,
    request_id: RequestId,
    payload: Result<Json<SpeechRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(request) = payload?;
    let text = require_text(&request.text_input, "textInput")?;
    let config = state.config_snapshot().await;

    let speech = ElevenLabsRequest::new(text, &config.elevenlabs);
    let upstream = state.provider_client.text_to_speech(&config, &speech, &request_id).await?;

    let content_type = upstream
        .headers()
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("audio/mpeg"));

    info!("Streaming synthesized audio");
    let body = Body::from_stream(upstream.bytes_stream());
    Ok(([(CONTENT_TYPE, content_type)], body).into_response())
}
