//! Configuration structures.

use config::{Config, File, FileFormat};
use quill_error::{ConfigError, QuillError, QuillResult};
use quill_interface::ModelPricing;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../quill.toml");

/// Model invocation defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelsConfig {
    /// Model used when a caller does not name one (`provider:model`)
    pub default_model: String,

    /// Per-attempt timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay in milliseconds; doubles per retry
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on a single backoff delay in milliseconds
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Output token count assumed when estimating cost
    #[serde(default = "default_output_tokens")]
    pub default_output_tokens: u32,
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_output_tokens() -> u32 {
    2048
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default_model: "openai:gpt-4o-mini".to_string(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            default_output_tokens: default_output_tokens(),
        }
    }
}

impl ModelsConfig {
    /// Per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// First backoff delay.
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Largest backoff delay.
    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}

/// Spend limits.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct BudgetSettings {
    /// Cumulative spend ceiling in USD; `None` is unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceiling: Option<f64>,
}

/// Pipeline behavior.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Scenes written concurrently during PROSE
    #[serde(default = "default_prose_concurrency")]
    pub prose_concurrency: usize,

    /// Template offered to the OUTLINE prompt
    #[serde(default = "default_outline_template")]
    pub outline_template: String,

    /// Whether stale outputs can still be read for inspection
    #[serde(default = "default_stale_outputs_readable")]
    pub stale_outputs_readable: bool,
}

fn default_prose_concurrency() -> usize {
    4
}

fn default_outline_template() -> String {
    "three_act".to_string()
}

fn default_stale_outputs_readable() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prose_concurrency: default_prose_concurrency(),
            outline_template: default_outline_template(),
            stale_outputs_readable: default_stale_outputs_readable(),
        }
    }
}

/// Where project state lives.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct StorageConfig {
    /// Project root directory; the platform data directory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolved project root.
    pub fn project_root(&self) -> PathBuf {
        match &self.root {
            Some(root) => root.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("quill")
                .join("projects"),
        }
    }
}

/// Per-model pricing.
///
/// # Example
///
/// ```toml
/// [providers.openai.models.gpt-4o-mini]
/// cost_per_million_input_tokens = 0.15
/// cost_per_million_output_tokens = 0.60
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, Default)]
pub struct ModelPriceConfig {
    /// Cost per million input tokens in USD
    #[serde(default)]
    pub cost_per_million_input_tokens: f64,

    /// Cost per million output tokens in USD
    #[serde(default)]
    pub cost_per_million_output_tokens: f64,
}

impl From<ModelPriceConfig> for ModelPricing {
    fn from(config: ModelPriceConfig) -> Self {
        ModelPricing {
            input_per_million: config.cost_per_million_input_tokens,
            output_per_million: config.cost_per_million_output_tokens,
        }
    }
}

/// An OpenAI-compatible HTTP provider.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// API base URL (the chat completions path is appended)
    pub base_url: String,

    /// Environment variable holding the API key; local servers may omit it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Known models and their prices
    #[serde(default)]
    pub models: HashMap<String, ModelPriceConfig>,
}

impl ProviderConfig {
    /// Pricing for `model`, free if the model is not listed.
    pub fn pricing(&self, model: &str) -> ModelPricing {
        self.models
            .get(model)
            .copied()
            .map(ModelPricing::from)
            .unwrap_or_default()
    }
}

/// Top-level Quill configuration.
///
/// # Example
///
/// ```no_run
/// use quill_config::QuillConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = QuillConfig::load()?;
/// println!("Default model: {}", config.models.default_model);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct QuillConfig {
    /// Model invocation defaults
    #[serde(default)]
    pub models: ModelsConfig,

    /// Spend limits
    #[serde(default)]
    pub budget: BudgetSettings,

    /// Pipeline behavior
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Project storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Map of provider name to provider configuration
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl QuillConfig {
    /// Load configuration from a specific file path, without bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> QuillResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                QuillError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                QuillError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with precedence: current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file is malformed or the merged
    /// configuration fails validation.
    #[instrument]
    pub fn load() -> QuillResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/quill/quill.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("quill").required(false));

        let config: Self = builder
            .build()
            .map_err(|e| {
                QuillError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                QuillError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Bundled defaults only, ignoring user files.
    ///
    /// # Errors
    ///
    /// Returns an error only if the bundled file is malformed.
    pub fn bundled() -> QuillResult<Self> {
        Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| {
                QuillError::from(ConfigError::new(format!(
                    "Bundled configuration is invalid: {}",
                    e
                )))
            })
    }

    /// Check values that deserialize but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending setting.
    pub fn validate(&self) -> QuillResult<()> {
        if self.models.default_model.trim().is_empty() {
            return Err(ConfigError::new("must not be empty")
                .with_key("models.default_model")
                .into());
        }
        if self.models.timeout_secs == 0 {
            return Err(ConfigError::new("must be positive")
                .with_key("models.timeout_secs")
                .into());
        }
        if self.models.backoff_base_ms > self.models.backoff_max_ms {
            return Err(ConfigError::new(format!(
                "{} exceeds models.backoff_max_ms ({})",
                self.models.backoff_base_ms, self.models.backoff_max_ms
            ))
            .with_key("models.backoff_base_ms")
            .into());
        }
        if let Some(ceiling) = self.budget.ceiling {
            if !(ceiling.is_finite() && ceiling >= 0.0) {
                return Err(ConfigError::new(format!(
                    "must be a non-negative amount, got {}",
                    ceiling
                ))
                .with_key("budget.ceiling")
                .into());
            }
        }
        if self.pipeline.prose_concurrency == 0 {
            return Err(ConfigError::new("must be at least 1")
                .with_key("pipeline.prose_concurrency")
                .into());
        }
        Ok(())
    }

    /// Look up a provider by name.
    #[instrument(skip(self))]
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        debug!(provider = name, "Looking up provider configuration");
        self.providers.get(name)
    }
}
