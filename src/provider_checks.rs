use crate::config::Config;
use crate::error::{Provider, ProviderError};
use crate::provider_client::{truncate, ProviderClient};
use futures::stream::{self, StreamExt};

const PROVIDERS: [Provider; 3] = [Provider::OpenAI, Provider::Stability, Provider::ElevenLabs];

fn describe(config: &Config, provider: Provider) -> String {
    match provider {
        Provider::OpenAI => format!("{} ({})", config.openai.api_base, config.openai.model),
        Provider::Stability => format!("{} ({})", config.stability.api_base, config.stability.engine),
        Provider::ElevenLabs => format!("{} (voice {})", config.elevenlabs.api_base, config.elevenlabs.voice_id),
    }
}

fn report_line(config: &Config, provider: Provider, result: &Result<reqwest::StatusCode, ProviderError>) -> String {
    match result {
        Ok(status) => format!("[OK] {} -> {} (status: {})", provider, describe(config, provider), status),
        Err(ProviderError::Status { status, body, .. }) => format!(
            "[FAIL] {} -> {} (status: {})\n  {}",
            provider,
            describe(config, provider),
            status,
            truncate(body, 200)
        ),
        Err(e) => format!("[ERROR] {} -> {}: {}", provider, describe(config, provider), e),
    }
}

/// Probes every provider once and prints one line per provider. Returns the
/// number of providers that did not answer successfully.
pub async fn perform_provider_checks(config: &Config, client: &ProviderClient) -> usize {
    println!("Checking providers ({} total):", PROVIDERS.len());
    let results: Vec<(Provider, Result<reqwest::StatusCode, ProviderError>)> = stream::iter(PROVIDERS)
        .map(|provider| async move { (provider, client.probe(config, provider).await) })
        .buffered(PROVIDERS.len())
        .collect()
        .await;

    let mut failures = 0;
    for (provider, result) in &results {
        if result.is_err() {
            failures += 1;
        }
        println!("{}", report_line(config, *provider, result));
    }
    failures
}
