//! Reasoning-service provider implementations.

pub mod gemini;

pub use gemini::GeminiProvider;

use std::sync::Arc;
use steward_config::AppConfig;
use steward_core::error::ProviderError;
use steward_core::Provider;

/// Build the configured provider.
///
/// Fails fast when no API key is available rather than letting the
/// first exchange surface the problem mid-run.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured(
            "No API key. Set STEWARD_API_KEY or add api_key to config.toml".into(),
        )
    })?;

    Ok(Arc::new(GeminiProvider::new(api_key)?))
}
