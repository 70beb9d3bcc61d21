//! Test utilities for pipeline tests.
//!
//! Provides a mock provider that answers by matching the prompt, so
//! concurrent scene calls get deterministic replies regardless of order.

#![allow(dead_code)]

use async_trait::async_trait;
use quill_error::{ProviderError, ProviderErrorKind};
use quill_interface::{GenerationRequest, ModelProvider, ProviderResponse};
use quill_models::{ModelManager, ProviderRegistry};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A single scripted reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return this text
    Text(String),
    /// Return this text after a delay
    Delayed(Duration, String),
    /// Fail with this error
    Error(ProviderErrorKind),
}

struct Route {
    needle: String,
    replies: Vec<MockResponse>,
}

/// Mock provider that picks its reply by prompt content.
///
/// Each route holds a queue of replies; the last reply repeats once the
/// queue is down to one.
pub struct RoutingProvider {
    routes: Mutex<Vec<Route>>,
    cost_per_call: f64,
    prompts: Mutex<Vec<String>>,
}

impl RoutingProvider {
    /// Create a provider with no routes.
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            cost_per_call: 0.0,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answer prompts containing `needle` with `reply`.
    pub fn route(self, needle: &str, reply: &str) -> Self {
        self.route_sequence(needle, vec![MockResponse::Text(reply.to_string())])
    }

    /// Answer prompts containing `needle` with `replies` in turn.
    pub fn route_sequence(self, needle: &str, replies: Vec<MockResponse>) -> Self {
        self.routes.lock().unwrap().push(Route {
            needle: needle.to_string(),
            replies,
        });
        self
    }

    /// Charge `cost` per answered call.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost_per_call = cost;
        self
    }

    /// Prompts received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Number of prompts containing `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }

    fn reply_for(&self, prompt: &str) -> Option<MockResponse> {
        let mut routes = self.routes.lock().unwrap();
        let route = routes.iter_mut().find(|r| prompt.contains(&r.needle))?;
        if route.replies.len() > 1 {
            Some(route.replies.remove(0))
        } else {
            route.replies.first().cloned()
        }
    }
}

#[async_trait]
impl ModelProvider for RoutingProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn handles(&self, model: &str) -> bool {
        model.starts_with("mock-")
    }

    fn estimate_cost(&self, _request: &GenerationRequest) -> f64 {
        0.0
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let prompt = request.prompt().clone();
        self.prompts.lock().unwrap().push(prompt.clone());
        let text = match self.reply_for(&prompt) {
            Some(MockResponse::Text(text)) => text,
            Some(MockResponse::Delayed(delay, text)) => {
                tokio::time::sleep(delay).await;
                text
            }
            Some(MockResponse::Error(kind)) => return Err(ProviderError::new(kind)),
            None => {
                return Err(ProviderError::new(ProviderErrorKind::MalformedRequest(
                    format!("no route for prompt: {}", prompt.lines().next().unwrap_or("")),
                )));
            }
        };
        Ok(ProviderResponse {
            text,
            cost: self.cost_per_call,
            input_tokens: 10,
            output_tokens: 20,
        })
    }
}

/// Model identifier served by the mock.
pub const MODEL: &str = "mock:mock-writer";

/// Manager over `provider` with fast backoff.
pub fn manager(provider: Arc<RoutingProvider>) -> ModelManager {
    ModelManager::new(ProviderRegistry::new().with(provider), MODEL)
        .with_backoff(Duration::from_millis(10), Duration::from_millis(100))
}

pub const IDEA: &str =
    r#"{"title": "The Lighthouse", "text": "A keeper finds a letter addressed to her drowned brother."}"#;
pub const CHARACTERS: &str = r#"Here is the cast:
```json
[{"name": "Maren", "role": "protagonist", "description": "The keeper"},
 {"name": "Tobias", "role": "ghost", "description": "Her brother"}]
```"#;
pub const LOCATIONS: &str = r#"[{"name": "Lamp room"}, {"name": "Harbor"}]"#;
pub const OUTLINE: &str = r#"[
  {"title": "Setup", "fraction": 0.25},
  {"title": "Confrontation", "fraction": 0.5},
  {"title": "Resolution", "fraction": 0.25}
]"#;
pub const BREAKDOWN: &str = r#"[
  {"number": 1, "title": "Fog", "povCharacter": "Maren", "location": "Lamp room", "timeHours": 0.0},
  {"number": 2, "title": "Lamp", "povCharacter": "Maren", "location": "Lamp room", "timeHours": 1.0},
  {"number": 3, "title": "Harbor", "povCharacter": "Maren", "location": "Harbor", "timeHours": 1.5},
  {"number": 4, "title": "Below", "povCharacter": "Tobias", "location": "Harbor", "timeHours": 2.0}
]"#;
pub const CRITIQUE: &str = r#"{"suggestedRevisions": [
  {"sceneNumber": 3, "instruction": "Shorten"},
  {"sceneNumber": 2, "instruction": "Add dread", "priority": 1}
]}"#;

/// Provider answering every stage of a four-scene story.
pub fn story_provider() -> RoutingProvider {
    RoutingProvider::new()
        .route("Write the premise", IDEA)
        .route("Create the cast", CHARACTERS)
        .route("Create the settings", LOCATIONS)
        .route("Outline the story", OUTLINE)
        .route("Break the outline into scenes", BREAKDOWN)
        .route("Write scene 1,", "Fog rolled in.")
        .route("Write scene 2,", "She lit the lamp.")
        .route("Write scene 3,", "The harbor was empty.")
        .route("Write scene 4,", "He waited below.")
        .route("Critique the story", CRITIQUE)
}
