//! Configuration for the Quill fiction pipeline.
//!
//! Settings are layered from three TOML sources, later sources overriding
//! earlier ones:
//! 1. Bundled defaults (`quill.toml` shipped with the library)
//! 2. `~/.config/quill/quill.toml`
//! 3. `./quill.toml`

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;

pub use config::{
    BudgetSettings, ModelPriceConfig, ModelsConfig, PipelineConfig, ProviderConfig, QuillConfig,
    StorageConfig,
};
