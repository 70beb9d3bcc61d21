//! OpenAI-compatible chat completions backend.
//!
//! Serves OpenAI, OpenRouter, Ollama and any other endpoint implementing
//! `POST {base_url}/chat/completions`.

use async_trait::async_trait;
use quill_config::ProviderConfig;
use quill_error::{ProviderError, ProviderErrorKind};
use quill_interface::{
    GenerationRequest, ModelPricing, ModelProvider, ProviderResponse, TokenUsage, estimate_tokens,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Chat completions client for one configured provider.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    name: String,
    base_url: String,
    api_key: Option<String>,
    api_key_env: Option<String>,
    pricing: HashMap<String, ModelPricing>,
    default_output_tokens: u32,
}

impl OpenAiCompatibleProvider {
    /// Creates a provider with no API key and no known models.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            api_key_env: None,
            pricing: HashMap::new(),
            default_output_tokens: 2048,
        }
    }

    /// Creates a provider from its configuration table.
    ///
    /// The API key is read from the configured environment variable now; if
    /// it is unset, every call fails with `MissingApiKey`.
    #[instrument(skip(config), fields(base_url = %config.base_url))]
    pub fn from_config(name: &str, config: &ProviderConfig, default_output_tokens: u32) -> Self {
        let api_key = config
            .api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok());
        if api_key.is_none() {
            if let Some(var) = &config.api_key_env {
                warn!(provider = name, env = %var, "API key environment variable is not set");
            }
        }

        let mut provider = Self::new(name, config.base_url.clone());
        provider.api_key = api_key;
        provider.api_key_env = config.api_key_env.clone();
        provider.default_output_tokens = default_output_tokens;
        for model in config.models.keys() {
            provider.pricing.insert(model.clone(), config.pricing(model));
        }
        provider
    }

    /// Set the API key explicitly.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Add a known model and its price.
    pub fn with_model(mut self, model: impl Into<String>, pricing: ModelPricing) -> Self {
        self.pricing.insert(model.into(), pricing);
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn pricing_for(&self, model: &str) -> ModelPricing {
        self.pricing.get(model).copied().unwrap_or_default()
    }

    fn parse_response(&self, model: &str, body: &str) -> Result<ProviderResponse, ProviderError> {
        let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| {
            ProviderError::new(ProviderErrorKind::ResponseParsing(format!(
                "Failed to parse chat completion: {}",
                e
            )))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        let usage = parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(ProviderResponse {
            text,
            cost: self.pricing_for(model).cost(&usage),
            input_tokens: *usage.input_tokens(),
            output_tokens: *usage.output_tokens(),
        })
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn handles(&self, model: &str) -> bool {
        self.pricing.contains_key(model)
    }

    fn estimate_cost(&self, request: &GenerationRequest) -> f64 {
        let output = request
            .max_output_tokens()
            .unwrap_or(self.default_output_tokens);
        let usage = TokenUsage::new(estimate_tokens(request.prompt()), output);
        self.pricing_for(request.model()).cost(&usage)
    }

    #[instrument(skip(self, request), fields(provider = %self.name, model = %request.model()))]
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let mut http = self.client.post(self.endpoint()).json(&ChatRequest {
            model: request.model(),
            messages: vec![ChatMessage {
                role: "user",
                content: request.prompt(),
            }],
            max_tokens: *request.max_output_tokens(),
            temperature: *request.temperature(),
        });

        match (&self.api_key, &self.api_key_env) {
            (Some(key), _) => http = http.bearer_auth(key),
            (None, Some(var)) => {
                return Err(ProviderError::new(ProviderErrorKind::MissingApiKey(
                    var.clone(),
                )));
            }
            (None, None) => {}
        }

        debug!(url = %self.endpoint(), "Sending chat completion request");
        let response = http.send().await.map_err(|e| {
            ProviderError::new(ProviderErrorKind::Network(format!("Request failed: {}", e)))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::new(ProviderErrorKind::Network(format!(
                "Failed to read response body: {}",
                e
            )))
        })?;

        if !status.is_success() {
            return Err(ProviderError::new(ProviderErrorKind::from_status(
                status.as_u16(),
                body,
            )));
        }

        self.parse_response(request.model(), &body)
    }
}
