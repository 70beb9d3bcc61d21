//! Outline acts.

use quill_error::{ValidationError, ValidationErrorKind};
use serde::{Deserialize, Serialize};

/// Allowed deviation from 1.0 when summing sibling fractions.
pub const ACT_FRACTION_TOLERANCE: f64 = 1e-3;

/// A structural beat in a narrative outline.
///
/// Acts nest: an act may carry an ordered list of child acts that subdivide
/// it. Fractions are relative to the parent, so siblings at every level sum
/// to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Act {
    /// Short title of the beat
    pub title: String,
    /// What happens in this beat
    #[serde(default)]
    pub description: String,
    /// Share of the parent's length, in (0, 1]
    pub fraction: f64,
    /// Zero-based position among siblings
    #[serde(default)]
    pub position: u32,
    /// Optional sub-structure
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Act>,
}

impl Act {
    /// Create a leaf act.
    pub fn new(title: impl Into<String>, description: impl Into<String>, fraction: f64) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            fraction,
            position: 0,
            children: Vec::new(),
        }
    }

    /// Attach sub-structure to this act.
    pub fn with_children(mut self, children: Vec<Act>) -> Self {
        self.children = children;
        renumber_acts(&mut self.children);
        self
    }

    /// Number of acts in this subtree, including this one.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Act::count).sum::<usize>()
    }
}

/// Reassign positions from list order at every level.
pub fn renumber_acts(acts: &mut [Act]) {
    for (idx, act) in acts.iter_mut().enumerate() {
        act.position = idx as u32;
        renumber_acts(&mut act.children);
    }
}

/// Validate an act tree.
///
/// The top level must be non-empty, every fraction must lie in (0, 1], and
/// siblings at each level must sum to 1.0 within [`ACT_FRACTION_TOLERANCE`].
///
/// # Examples
///
/// ```
/// use quill_core::{Act, validate_acts};
///
/// let acts = vec![Act::new("Setup", "", 0.25), Act::new("Rest", "", 0.75)];
/// assert!(validate_acts(&acts).is_ok());
///
/// let lopsided = vec![Act::new("Setup", "", 0.5), Act::new("Rest", "", 0.75)];
/// assert!(validate_acts(&lopsided).is_err());
/// ```
pub fn validate_acts(acts: &[Act]) -> Result<(), ValidationError> {
    if acts.is_empty() {
        return Err(ValidationError::new(ValidationErrorKind::EmptyOutput(
            "outline".to_string(),
        )));
    }
    validate_level(acts, "top level")
}

fn validate_level(acts: &[Act], level: &str) -> Result<(), ValidationError> {
    for act in acts {
        if !(act.fraction > 0.0 && act.fraction <= 1.0) {
            return Err(ValidationError::new(ValidationErrorKind::FractionRange {
                act: act.title.clone(),
                fraction: act.fraction,
            }));
        }
    }

    let sum: f64 = acts.iter().map(|a| a.fraction).sum();
    if (sum - 1.0).abs() > ACT_FRACTION_TOLERANCE {
        return Err(ValidationError::new(ValidationErrorKind::FractionSum {
            level: level.to_string(),
            sum,
        }));
    }

    for act in acts.iter().filter(|a| !a.children.is_empty()) {
        validate_level(&act.children, &format!("children of '{}'", act.title))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_levels_are_checked_independently() {
        let acts = vec![
            Act::new("One", "", 0.5).with_children(vec![
                Act::new("a", "", 0.3),
                Act::new("b", "", 0.3),
            ]),
            Act::new("Two", "", 0.5),
        ];
        let err = validate_acts(&acts).unwrap_err();
        assert!(matches!(err.kind, ValidationErrorKind::FractionSum { ref level, .. } if level.contains("One")));
    }

    #[test]
    fn tolerance_absorbs_rounding() {
        let third = 1.0 / 3.0;
        let acts = vec![
            Act::new("a", "", 0.333),
            Act::new("b", "", 0.333),
            Act::new("c", "", 0.334),
        ];
        assert!(validate_acts(&acts).is_ok());
        let exact = vec![Act::new("a", "", third), Act::new("b", "", third), Act::new("c", "", third)];
        assert!(validate_acts(&exact).is_ok());
    }

    #[test]
    fn zero_fraction_is_rejected() {
        let acts = vec![Act::new("a", "", 0.0), Act::new("b", "", 1.0)];
        let err = validate_acts(&acts).unwrap_err();
        assert!(matches!(err.kind, ValidationErrorKind::FractionRange { .. }));
    }

    #[test]
    fn empty_outline_is_rejected() {
        assert!(validate_acts(&[]).is_err());
    }

    #[test]
    fn with_children_assigns_positions() {
        let act = Act::new("parent", "", 1.0).with_children(vec![
            Act::new("x", "", 0.5),
            Act::new("y", "", 0.5),
        ]);
        let positions: Vec<u32> = act.children.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(act.count(), 3);
    }
}
