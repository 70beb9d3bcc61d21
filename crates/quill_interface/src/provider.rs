//! The model provider capability trait.

use crate::{GenerationRequest, ProviderResponse};
use async_trait::async_trait;
use quill_error::ProviderError;

/// A backend that can serve generation requests.
///
/// Implementations classify their own failures through
/// [`ProviderErrorKind`](quill_error::ProviderErrorKind) so the caller can
/// decide whether to retry.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name used as the `provider:` prefix of model identifiers.
    fn name(&self) -> &str;

    /// Whether this provider serves the bare model name `model`.
    fn handles(&self, model: &str) -> bool;

    /// Expected cost of `request` in USD, before it is issued.
    fn estimate_cost(&self, request: &GenerationRequest) -> f64;

    /// Issue the request.
    ///
    /// # Errors
    ///
    /// Returns a transient error for network, rate-limit and server failures
    /// and a permanent error for authentication, unknown model and malformed
    /// request failures.
    async fn generate(&self, request: &GenerationRequest)
    -> Result<ProviderResponse, ProviderError>;
}
