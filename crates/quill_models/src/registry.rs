//! Provider lookup by model identifier.

use crate::OpenAiCompatibleProvider;
use quill_config::QuillConfig;
use quill_error::{ProviderError, ProviderErrorKind};
use quill_interface::ModelProvider;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Registered providers, consulted in registration order.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ModelProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with one OpenAI-compatible provider per `[providers.<name>]` table.
    pub fn from_config(config: &QuillConfig) -> Self {
        let mut names: Vec<&String> = config.providers.keys().collect();
        names.sort();
        let mut registry = Self::new();
        for name in names {
            if let Some(provider) = config.providers.get(name) {
                registry.register(Arc::new(OpenAiCompatibleProvider::from_config(
                    name,
                    provider,
                    config.models.default_output_tokens,
                )));
            }
        }
        registry
    }

    /// Add a provider, replacing any existing provider with the same name.
    pub fn register(&mut self, provider: Arc<dyn ModelProvider>) {
        self.providers.retain(|p| p.name() != provider.name());
        debug!(provider = provider.name(), "Registered model provider");
        self.providers.push(provider);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, provider: Arc<dyn ModelProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Names of registered providers.
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ModelProvider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    /// Find the provider serving `model_id` and the provider-local model name.
    ///
    /// `provider:model` selects the named provider. Anything else, including
    /// an identifier whose prefix is not a registered provider, is treated as
    /// a bare model name and offered to each provider in turn.
    ///
    /// # Errors
    ///
    /// Returns a permanent `InvalidModel` error if no provider matches.
    #[instrument(skip(self))]
    pub fn resolve(
        &self,
        model_id: &str,
    ) -> Result<(Arc<dyn ModelProvider>, String), ProviderError> {
        if let Some((prefix, model)) = model_id.split_once(':') {
            if let Some(provider) = self.get(prefix) {
                if model.is_empty() {
                    return Err(ProviderError::new(ProviderErrorKind::InvalidModel(
                        model_id.to_string(),
                    )));
                }
                return Ok((provider, model.to_string()));
            }
        }

        self.providers
            .iter()
            .find(|p| p.handles(model_id))
            .map(|p| (Arc::clone(p), model_id.to_string()))
            .ok_or_else(|| {
                ProviderError::new(ProviderErrorKind::InvalidModel(model_id.to_string()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_interface::ModelPricing;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new()
            .with(Arc::new(
                OpenAiCompatibleProvider::new("openai", "http://localhost:1")
                    .with_model("gpt-4o", ModelPricing::default()),
            ))
            .with(Arc::new(
                OpenAiCompatibleProvider::new("ollama", "http://localhost:2")
                    .with_model("llama3", ModelPricing::default()),
            ))
    }

    #[test]
    fn prefixed_identifier_selects_provider() {
        let (provider, model) = registry().resolve("ollama:mistral").unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(model, "mistral");
    }

    #[test]
    fn bare_model_is_offered_to_each_provider() {
        let (provider, model) = registry().resolve("llama3").unwrap();
        assert_eq!(provider.name(), "ollama");
        assert_eq!(model, "llama3");
    }

    #[test]
    fn unknown_models_are_invalid() {
        let registry = registry();
        for id in ["gpt-9", "openai:", "acme:gpt-4o"] {
            let Err(err) = registry.resolve(id) else {
                panic!("{id} should not resolve");
            };
            assert!(matches!(err.kind, ProviderErrorKind::InvalidModel(_)), "{id}");
        }
    }

    #[test]
    fn registering_same_name_replaces() {
        let mut registry = registry();
        registry.register(Arc::new(OpenAiCompatibleProvider::new(
            "openai",
            "http://localhost:3",
        )));
        assert_eq!(registry.names(), vec!["ollama", "openai"]);
        assert!(registry.resolve("gpt-4o").is_err());
    }
}
