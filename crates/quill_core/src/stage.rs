//! Pipeline stages and their dependency graph.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// One phase of the generation pipeline.
///
/// Variants are declared in a topological order of the dependency graph, so
/// iterating with [`Stage::iter`] always visits prerequisites before their
/// dependents.
///
/// # Examples
///
/// ```
/// use quill_core::Stage;
///
/// assert_eq!(Stage::Outline.prerequisites(), &[Stage::Characters, Stage::Locations]);
/// assert!(Stage::Characters.downstream().contains(&Stage::Prose));
/// assert!(!Stage::Characters.downstream().contains(&Stage::Locations));
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    /// Premise and logline
    Idea,
    /// Cast of characters
    Characters,
    /// Settings the story visits
    Locations,
    /// Act structure
    Outline,
    /// Scene-by-scene plan
    Breakdown,
    /// Scene prose
    Prose,
    /// Editorial feedback on the prose
    Revision,
    /// Assembled manuscript
    Export,
}

impl Stage {
    /// Stages that must be committed (and fresh) before this one may run.
    pub fn prerequisites(&self) -> &'static [Stage] {
        match self {
            Stage::Idea => &[],
            Stage::Characters | Stage::Locations => &[Stage::Idea],
            Stage::Outline => &[Stage::Characters, Stage::Locations],
            Stage::Breakdown => &[Stage::Outline],
            Stage::Prose => &[Stage::Breakdown],
            Stage::Revision | Stage::Export => &[Stage::Prose],
        }
    }

    /// Every stage that transitively depends on this one, in pipeline order.
    pub fn downstream(&self) -> Vec<Stage> {
        let mut affected: Vec<Stage> = Vec::new();
        for candidate in Stage::iter() {
            let depends = candidate
                .prerequisites()
                .iter()
                .any(|p| p == self || affected.contains(p));
            if depends {
                affected.push(candidate);
            }
        }
        affected
    }

    /// Whether this stage calls a model when run.
    pub fn uses_model(&self) -> bool {
        !matches!(self, Stage::Export)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn iteration_order_is_topological() {
        let order: Vec<Stage> = Stage::iter().collect();
        for (idx, stage) in order.iter().enumerate() {
            for prerequisite in stage.prerequisites() {
                let pos = order.iter().position(|s| s == prerequisite).unwrap();
                assert!(pos < idx, "{prerequisite} must precede {stage}");
            }
        }
    }

    #[test]
    fn downstream_of_idea_is_everything_else() {
        let downstream = Stage::Idea.downstream();
        assert_eq!(downstream.len(), Stage::iter().count() - 1);
    }

    #[test]
    fn leaves_have_no_downstream() {
        assert!(Stage::Export.downstream().is_empty());
        assert!(Stage::Revision.downstream().is_empty());
        assert_eq!(Stage::Prose.downstream(), vec![Stage::Revision, Stage::Export]);
    }

    #[test]
    fn names_round_trip_through_strings() {
        assert_eq!(Stage::Breakdown.to_string(), "breakdown");
        assert_eq!(Stage::from_str("prose").unwrap(), Stage::Prose);
        assert_eq!(serde_json::to_string(&Stage::Outline).unwrap(), "\"outline\"");
    }
}
