//! Applying revision requests to committed prose.

use crate::{DefaultPromptComposer, PromptComposer, parse_replacement};
use quill_core::{RevisionRequest, Story};
use quill_error::{ErrorCategory, QuillResult, RevisionError, RevisionErrorKind};
use quill_models::{InvokeOptions, ModelManager, SpendMeter};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const COST_EPSILON: f64 = 1e-9;

/// Why a revision batch stopped before the end of its requests.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum HaltReason {
    /// The next request's estimated cost did not fit the remaining budget
    BudgetExhausted {
        /// Requests processed before the halt
        completed: usize,
        /// Requests left unprocessed
        skipped: usize,
    },
}

/// Why a single request was not applied.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SkipReason {
    /// The request names a scene the story does not have
    UnknownScene,
    /// The model's replacement failed validation
    Invalid(String),
    /// The batch halted before reaching the request
    BudgetExhausted,
}

/// A request left unapplied, with the reason.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UnappliedRevision {
    /// The original request
    pub request: RevisionRequest,
    /// Why it was not applied
    pub reason: SkipReason,
}

/// Result of a revision batch.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct RevisionOutcome {
    /// The story with applied replacements and a recomputed word total
    story: Story,
    /// Requests whose replacement was merged
    applied_count: usize,
    /// Requests skipped or never reached, in request order
    unapplied: Vec<UnappliedRevision>,
    /// Set when the batch stopped early
    halt: Option<HaltReason>,
    /// Billed spend of this batch in USD, including rejected replacements
    spent: f64,
}

impl RevisionOutcome {
    /// Take the revised story.
    pub fn into_story(self) -> Story {
        self.story
    }
}

/// Rewrites individual scenes on request.
///
/// Each request costs one model call whose prompt carries the scene content
/// and the instruction. Replacements are merged only when they name exactly
/// the targeted scene.
#[derive(Clone)]
pub struct RevisionEngine {
    composer: Arc<dyn PromptComposer>,
    options: Option<InvokeOptions>,
}

impl std::fmt::Debug for RevisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevisionEngine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for RevisionEngine {
    fn default() -> Self {
        Self::new(Arc::new(DefaultPromptComposer::new()))
    }
}

impl RevisionEngine {
    /// Create an engine that builds prompts with `composer`.
    pub fn new(composer: Arc<dyn PromptComposer>) -> Self {
        Self {
            composer,
            options: None,
        }
    }

    /// Use `options` instead of the manager's defaults.
    pub fn with_options(mut self, options: InvokeOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Apply `requests` to `story` in order.
    ///
    /// Before each call the request's estimated cost (its cost hint, or the
    /// provider's estimate) is checked against both `max_cost` less the
    /// batch's spend and the manager's shared budget. When it does not fit,
    /// the batch halts and every remaining request is returned unapplied.
    ///
    /// Requests for missing scenes and replacements that fail validation are
    /// skipped. The input story is never modified.
    ///
    /// # Errors
    ///
    /// Returns `RevisionError::Aborted` carrying the failing scene, the
    /// applied count and the spend so far when a provider fails permanently
    /// or retries run out.
    #[instrument(skip(self, story, requests, manager), fields(requests = requests.len(), scenes = story.scenes.len()))]
    pub async fn apply_revisions(
        &self,
        story: &Story,
        requests: &[RevisionRequest],
        manager: &ModelManager,
        model_id: &str,
        max_cost: f64,
        verbose: bool,
    ) -> QuillResult<RevisionOutcome> {
        let base_options = self
            .options
            .clone()
            .unwrap_or_else(|| manager.default_options());
        let mut revised = story.clone();
        let meter = SpendMeter::new();
        let mut applied_count = 0;
        let mut unapplied = Vec::new();
        let mut halt = None;

        for (index, request) in requests.iter().enumerate() {
            let Some(scene) = revised.scene(request.scene_number) else {
                warn!(scene = request.scene_number, "Revision targets a missing scene");
                unapplied.push(UnappliedRevision {
                    request: request.clone(),
                    reason: SkipReason::UnknownScene,
                });
                continue;
            };

            let prompt = self
                .composer
                .revision_prompt(scene, &request.instruction)?;
            let estimate = match request.cost_hint {
                Some(hint) => hint,
                None => manager.estimate_cost(&prompt, model_id, &base_options)?,
            };

            let remaining = max_cost - meter.total();
            let shared_fits = manager.budget().check(estimate).is_ok();
            if estimate > remaining + COST_EPSILON || !shared_fits {
                let skipped = requests.len() - index;
                info!(
                    scene = request.scene_number,
                    estimate,
                    remaining,
                    completed = index,
                    skipped,
                    "Revision budget exhausted"
                );
                unapplied.extend(requests[index..].iter().map(|r| UnappliedRevision {
                    request: r.clone(),
                    reason: SkipReason::BudgetExhausted,
                }));
                halt = Some(HaltReason::BudgetExhausted {
                    completed: index,
                    skipped,
                });
                break;
            }

            let options = base_options.clone().with_estimated_cost(estimate);
            match manager
                .invoke_metered(&prompt, model_id, &options, &meter)
                .await
            {
                Ok(response) => {
                    match parse_replacement(response.text(), request.scene_number) {
                        Ok(content) => {
                            revised.replace_content(request.scene_number, content);
                            applied_count += 1;
                            debug!(scene = request.scene_number, "Applied revision");
                        }
                        Err(e) => {
                            warn!(scene = request.scene_number, error = %e, "Rejected revision");
                            unapplied.push(UnappliedRevision {
                                request: request.clone(),
                                reason: SkipReason::Invalid(e.kind.to_string()),
                            });
                        }
                    }
                }
                Err(e) if e.category() == ErrorCategory::Validation => {
                    warn!(scene = request.scene_number, error = %e, "Rejected revision");
                    unapplied.push(UnappliedRevision {
                        request: request.clone(),
                        reason: SkipReason::Invalid(e.to_string()),
                    });
                }
                Err(e) if e.category() == ErrorCategory::BudgetExceeded => {
                    let skipped = requests.len() - index;
                    info!(scene = request.scene_number, completed = index, skipped, "Shared budget refused revision");
                    unapplied.extend(requests[index..].iter().map(|r| UnappliedRevision {
                        request: r.clone(),
                        reason: SkipReason::BudgetExhausted,
                    }));
                    halt = Some(HaltReason::BudgetExhausted {
                        completed: index,
                        skipped,
                    });
                    break;
                }
                Err(e) => {
                    return Err(RevisionError::new(RevisionErrorKind::Aborted {
                        scene_number: request.scene_number,
                        applied: applied_count,
                        skipped: requests.len() - index,
                        spent: meter.total(),
                        source: Box::new(e),
                    })
                    .into());
                }
            }

            if verbose {
                info!(
                    processed = index + 1,
                    total = requests.len(),
                    applied = applied_count,
                    spent = meter.total(),
                    "Revision progress"
                );
            }
        }

        revised.recompute_word_count();
        let spent = meter.total();
        info!(
            applied = applied_count,
            unapplied = unapplied.len(),
            words = revised.total_actual_words,
            spent,
            "Revision batch finished"
        );

        Ok(RevisionOutcome {
            story: revised,
            applied_count,
            unapplied,
            halt,
            spent,
        })
    }
}
