//! Revision requests and editorial feedback.

use serde::{Deserialize, Serialize};

/// A request to rewrite one scene.
///
/// # Examples
///
/// ```
/// use quill_core::RevisionRequest;
///
/// let request = RevisionRequest::new(3, "Tighten the dialogue").with_cost_hint(0.02);
/// assert_eq!(request.scene_number, 3);
/// assert_eq!(request.cost_hint, Some(0.02));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionRequest {
    /// Scene to rewrite
    pub scene_number: u32,
    /// What to change
    pub instruction: String,
    /// Optional editorial priority (lower is more urgent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    /// Expected cost in USD, used instead of the provider estimate when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_hint: Option<f64>,
}

impl RevisionRequest {
    /// Create a request with no priority or cost hint.
    pub fn new(scene_number: u32, instruction: impl Into<String>) -> Self {
        Self {
            scene_number,
            instruction: instruction.into(),
            priority: None,
            cost_hint: None,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the expected cost.
    pub fn with_cost_hint(mut self, cost: f64) -> Self {
        self.cost_hint = Some(cost);
        self
    }
}

/// Editorial critique of a story, as produced by the REVISION stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// Suggested scene rewrites in the order they should be applied
    #[serde(default)]
    pub suggested_revisions: Vec<RevisionRequest>,
}

impl Feedback {
    /// Requests in application order.
    ///
    /// Requests with a priority come first (ascending); the rest keep their
    /// original order.
    pub fn ordered_requests(&self) -> Vec<RevisionRequest> {
        let mut requests = self.suggested_revisions.clone();
        requests.sort_by_key(|r| r.priority.unwrap_or(u32::MAX));
        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_feedback_document() {
        let feedback: Feedback = serde_json::from_str(
            r#"{"suggestedRevisions": [
                {"sceneNumber": 2, "instruction": "Cut the flashback"},
                {"sceneNumber": 1, "instruction": "Open on action", "priority": 1}
            ]}"#,
        )
        .unwrap();
        assert_eq!(feedback.suggested_revisions.len(), 2);
        assert_eq!(feedback.suggested_revisions[0].priority, None);

        let ordered = feedback.ordered_requests();
        assert_eq!(ordered[0].scene_number, 1);
        assert_eq!(ordered[1].scene_number, 2);
    }

    #[test]
    fn optional_fields_are_omitted() {
        let json = serde_json::to_value(RevisionRequest::new(4, "Shorter")).unwrap();
        assert_eq!(json["sceneNumber"], 4);
        assert!(json.get("costHint").is_none());
    }
}
