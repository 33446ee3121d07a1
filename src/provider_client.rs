use crate::config::Config;
use crate::error::{Provider, ProviderError};
use crate::providers::elevenlabs::ElevenLabsRequest;
use crate::providers::openai::{OpenAIRequest, OpenAIResponse};
use crate::providers::stability::{StabilityRequest, StabilityResponse};
use crate::request_id::RequestId;
use reqwest::header::HeaderValue;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};

const ERROR_BODY_LIMIT: usize = 500;

#[derive(Debug, Clone)]
pub struct ProviderClient {
    http_client: Arc<reqwest::Client>,
}

impl ProviderClient {
    pub fn new(http_client: Arc<reqwest::Client>) -> Self {
        Self { http_client }
    }

    fn join_url(api_base: &str, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if api_base.ends_with('/') { format!("{}{}", api_base, path) } else { format!("{}/{}", api_base, path) }
    }

    fn api_key(config: &Config, provider: Provider) -> Result<&str, ProviderError> {
        let key = match provider {
            Provider::OpenAI => &config.openai.api_key,
            Provider::Stability => &config.stability.api_key,
            Provider::ElevenLabs => &config.elevenlabs.api_key,
        };
        if key.trim().is_empty() {
            return Err(ProviderError::MissingApiKey(provider));
        }
        Ok(key)
    }

    /// Attaches the provider's auth header, the request id and the configured
    /// timeout to an outbound request.
    fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
        config: &Config,
        provider: Provider,
        request_id: Option<&RequestId>,
    ) -> Result<reqwest::RequestBuilder, ProviderError> {
        let key = Self::api_key(config, provider)?;
        let mut builder = match provider {
            Provider::OpenAI | Provider::Stability => builder.bearer_auth(key),
            Provider::ElevenLabs => builder.header("xi-api-key", key),
        };

        if let Some(request_id) = request_id {
            if let Ok(val) = HeaderValue::from_str(&request_id.0) {
                builder = builder.header("x-request-id", val);
            }
        }

        Ok(builder.timeout(config.request_timeout()))
    }

    async fn send(provider: Provider, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ProviderError> {
        let response = builder.send().await.map_err(ProviderError::transport(provider))?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
        warn!("{} request failed with status {}: {}", provider, status, body);
        Err(ProviderError::Status { provider, status, body: truncate(&body, ERROR_BODY_LIMIT) })
    }

    async fn decode<T: DeserializeOwned>(provider: Provider, response: reqwest::Response) -> Result<T, ProviderError> {
        response
            .json::<T>()
            .await
            .map_err(|source| ProviderError::Decode { provider, source })
    }

    pub async fn chat_completion(
        &self,
        config: &Config,
        request: &OpenAIRequest,
        request_id: &RequestId,
    ) -> Result<OpenAIResponse, ProviderError> {
        let target_url = Self::join_url(&config.openai.api_base, "chat/completions");
        let builder = self.authorize(self.http_client.post(&target_url), config, Provider::OpenAI, Some(request_id))?;

        info!("Forwarding chat completion to: {}", target_url);
        debug!("request body: {:?}", serde_json::to_string(request));
        let response = Self::send(Provider::OpenAI, builder.json(request)).await?;
        Self::decode(Provider::OpenAI, response).await
    }

    pub async fn text_to_image(
        &self,
        config: &Config,
        request: &StabilityRequest,
        request_id: &RequestId,
    ) -> Result<StabilityResponse, ProviderError> {
        let path = format!("v1/generation/{}/text-to-image", config.stability.engine);
        let target_url = Self::join_url(&config.stability.api_base, &path);
        let builder = self
            .authorize(self.http_client.post(&target_url), config, Provider::Stability, Some(request_id))?
            .header("Accept", "application/json");

        info!("Forwarding text-to-image to: {}", target_url);
        debug!("request body: {:?}", serde_json::to_string(request));
        let response = Self::send(Provider::Stability, builder.json(request)).await?;
        Self::decode(Provider::Stability, response).await
    }

    /// Returns the upstream response once its status is known to be a
    /// success, leaving the audio body unread for the caller to stream.
    pub async fn text_to_speech(
        &self,
        config: &Config,
        request: &ElevenLabsRequest,
        request_id: &RequestId,
    ) -> Result<reqwest::Response, ProviderError> {
        let path = format!("v1/text-to-speech/{}", config.elevenlabs.voice_id);
        let target_url = Self::join_url(&config.elevenlabs.api_base, &path);
        let builder = self
            .authorize(self.http_client.post(&target_url), config, Provider::ElevenLabs, Some(request_id))?
            .header("Accept", "audio/mpeg");

        info!("Forwarding text-to-speech to: {}", target_url);
        debug!("request body: {:?}", serde_json::to_string(request));
        Self::send(Provider::ElevenLabs, builder.json(request)).await
    }

    /// Cheap authenticated GET used to verify credentials and reachability.
    pub async fn probe(&self, config: &Config, provider: Provider) -> Result<reqwest::StatusCode, ProviderError> {
        let target_url = match provider {
            Provider::OpenAI => Self::join_url(&config.openai.api_base, "models"),
            Provider::Stability => Self::join_url(&config.stability.api_base, "v1/user/account"),
            Provider::ElevenLabs => Self::join_url(&config.elevenlabs.api_base, "v1/user"),
        };
        let builder = self.authorize(self.http_client.get(&target_url), config, provider, None)?;
        let response = Self::send(provider, builder).await?;
        Ok(response.status())
    }
}

pub fn truncate(s: &str, max_len: usize) -> String {
    match s.char_indices().nth(max_len) {
        None => s.to_string(),
        Some((idx, _)) => format!("{}…", &s[..idx]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts;
    use mockito::Matcher;
    use serde_json::json;

    fn config_for(url: &str) -> Config {
        let mut config = Config::default();
        config.openai.api_base = format!("{}/v1", url);
        config.openai.api_key = "sk-test".to_string();
        config.stability.api_base = url.to_string();
        config.stability.api_key = "sk-stability".to_string();
        config.elevenlabs.api_base = format!("{}/", url);
        config.elevenlabs.api_key = "xi-test".to_string();
        config
    }

    fn client() -> ProviderClient {
        ProviderClient::new(Arc::new(reqwest::Client::new()))
    }

    fn rid() -> RequestId {
        RequestId("req-123".to_string())
    }

    #[test]
    fn test_join_url() {
        assert_eq!(ProviderClient::join_url("https://api.openai.com/v1", "chat/completions"), "https://api.openai.com/v1/chat/completions");
        assert_eq!(ProviderClient::join_url("https://api.openai.com/v1/", "chat/completions"), "https://api.openai.com/v1/chat/completions");
        assert_eq!(ProviderClient::join_url("http://x", "/v1/user"), "http://x/v1/user");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
        assert_eq!(truncate("żółw żółw", 4), "żółw…");
    }

    #[tokio::test]
    async fn test_chat_completion_sends_bearer_and_request_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_header("x-request-id", "req-123")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({ "model": "gpt-3.5-turbo-16k", "max_tokens": 100 })),
                Matcher::Regex(r#""content":"prompt: a brave mouse\\n""#.to_string()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": " The mouse roared. " }, "finish_reason": "stop" }]
            }).to_string())
            .create_async()
            .await;

        let config = config_for(&server.url());
        let request = OpenAIRequest::new(&config.openai.model, prompts::story_messages("a brave mouse"))
            .with_max_tokens(config.openai.story_max_tokens);
        let resp = client().chat_completion(&config, &request, &rid()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.first_content().as_deref(), Some("The mouse roared."));
    }

    #[tokio::test]
    async fn test_text_to_image_path_and_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image")
            .match_header("authorization", "Bearer sk-stability")
            .match_header("accept", "application/json")
            .match_body(Matcher::Json(json!({ "text_prompts": [{ "text": "a red kite" }] })))
            .with_status(200)
            .with_body(json!({ "artifacts": [{ "base64": "aW1n", "seed": 7, "finishReason": "SUCCESS" }] }).to_string())
            .create_async()
            .await;

        let config = config_for(&server.url());
        let request = StabilityRequest::for_caption("a red kite", &config.stability);
        let resp = client().text_to_image(&config, &request, &rid()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.into_first_image().as_deref(), Some("aW1n"));
    }

    #[tokio::test]
    async fn test_text_to_speech_uses_xi_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/text-to-speech/21m00Tcm4TlvDq8ikWAM")
            .match_header("xi-api-key", "xi-test")
            .match_header("accept", "audio/mpeg")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "audio/mpeg")
            .with_body(vec![0xFF, 0xFB, 0x90, 0x64])
            .create_async()
            .await;

        let config = config_for(&server.url());
        let request = ElevenLabsRequest::new("Hello", &config.elevenlabs);
        let resp = client().text_to_speech(&config, &request, &rid()).await.unwrap();
        let bytes = resp.bytes().await.unwrap();

        mock.assert_async().await;
        assert_eq!(bytes.as_ref(), &[0xFF, 0xFB, 0x90, 0x64]);
    }

    #[tokio::test]
    async fn test_non_success_status_becomes_status_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let config = config_for(&server.url());
        let request = OpenAIRequest::new("gpt-3.5-turbo-16k", prompts::story_messages("x"));
        let err = client().chat_completion(&config, &request, &rid()).await.unwrap_err();
        match err {
            ProviderError::Status { provider, status, body } => {
                assert_eq!(provider, Provider::OpenAI);
                assert_eq!(status.as_u16(), 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_garbage_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/v1/generation/stable-diffusion-xl-1024-v1-0/text-to-image")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let config = config_for(&server.url());
        let request = StabilityRequest::for_caption("x", &config.stability);
        let err = client().text_to_image(&config, &request, &rid()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Decode { provider: Provider::Stability, .. }));
    }

    #[tokio::test]
    async fn test_missing_key_short_circuits() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", Matcher::Any).expect(0).create_async().await;

        let mut config = config_for(&server.url());
        config.elevenlabs.api_key = "  ".to_string();
        let request = ElevenLabsRequest::new("Hello", &config.elevenlabs);
        let err = client().text_to_speech(&config, &request, &rid()).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, ProviderError::MissingApiKey(Provider::ElevenLabs)));
    }

    #[tokio::test]
    async fn test_probe_endpoints() {
        let mut server = mockito::Server::new_async().await;
        let openai = server.mock("GET", "/v1/models").match_header("authorization", "Bearer sk-test").with_status(200).create_async().await;
        let stability = server.mock("GET", "/v1/user/account").with_status(200).create_async().await;
        let elevenlabs = server.mock("GET", "/v1/user").match_header("xi-api-key", "xi-test").with_status(401).create_async().await;

        let config = config_for(&server.url());
        let client = client();
        assert!(client.probe(&config, Provider::OpenAI).await.is_ok());
        assert!(client.probe(&config, Provider::Stability).await.is_ok());
        assert!(matches!(
            client.probe(&config, Provider::ElevenLabs).await,
            Err(ProviderError::Status { provider: Provider::ElevenLabs, .. })
        ));

        openai.assert_async().await;
        stability.assert_async().await;
        elevenlabs.assert_async().await;
    }
}
