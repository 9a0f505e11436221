//! AI providers module.

use std::sync::Arc;

pub mod claude;
pub mod ollama;
pub mod provider;

pub use provider::{Provider, ProviderError, Result};

use crate::config::Settings;

/// Provider factory. Unknown names fall back to Claude.
pub fn create_provider(name: &str, settings: &Settings) -> Arc<dyn Provider> {
    match name {
        "ollama" => {
            let provider = match &settings.models.ollama.base_url {
                Some(url) => ollama::OllamaProvider::with_base_url(url.clone()),
                None => ollama::OllamaProvider::new(),
            };
            match &settings.models.ollama.model {
                Some(model) => Arc::new(provider.with_model(model.clone())),
                None => Arc::new(provider),
            }
        }
        "claude" | "" => Arc::new(claude::ClaudeProvider::new()),
        other => {
            tracing::warn!("Unknown provider '{}', falling back to claude", other);
            Arc::new(claude::ClaudeProvider::new())
        }
    }
}

/// Get the current provider from settings.
pub fn get_current_provider(settings: &Settings) -> Arc<dyn Provider> {
    create_provider(&settings.models.provider, settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory() {
        let mut settings = Settings::default();
        assert_eq!(get_current_provider(&settings).name(), "claude");

        settings.models.provider = "ollama".to_string();
        assert_eq!(get_current_provider(&settings).name(), "ollama");

        settings.models.provider = "mystery".to_string();
        assert_eq!(get_current_provider(&settings).name(), "claude");
    }
}
