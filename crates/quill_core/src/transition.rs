//! Scene transition classification.

use crate::{SceneSequel, Story};
use serde::{Deserialize, Serialize};

/// Hours of story time beyond which adjacent scenes get a visual break.
const TIME_GAP_HOURS: f64 = 2.0;

/// Separator placed between two adjacent scenes in a manuscript.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SceneTransition {
    /// Continuous flow, no break
    None,
    /// Blank-line gap for a change of place or a jump in time
    Whitespace,
    /// Decorated break for a change of point of view
    Ornamental,
}

/// Decide the separator between `prev` and `next`.
///
/// The first matching rule wins: a POV change is ornamental, a location
/// change or a time gap over two hours is whitespace, anything else flows.
///
/// # Examples
///
/// ```
/// use quill_core::{SceneSequel, SceneTransition, classify};
///
/// let scene = |pov: &str, location: &str, time_hours: f64| SceneSequel {
///     number: 0,
///     title: String::new(),
///     content: String::new(),
///     pov_character: pov.to_string(),
///     location: location.to_string(),
///     time_hours,
/// };
///
/// assert_eq!(classify(&scene("A", "X", 0.0), &scene("B", "X", 0.0)), SceneTransition::Ornamental);
/// assert_eq!(classify(&scene("A", "X", 0.0), &scene("A", "X", 1.5)), SceneTransition::None);
/// ```
pub fn classify(prev: &SceneSequel, next: &SceneSequel) -> SceneTransition {
    if prev.pov_character != next.pov_character {
        SceneTransition::Ornamental
    } else if prev.location != next.location {
        SceneTransition::Whitespace
    } else if (next.time_hours - prev.time_hours).abs() > TIME_GAP_HOURS {
        SceneTransition::Whitespace
    } else {
        SceneTransition::None
    }
}

/// Classify every adjacent pair of scenes in number order.
///
/// Returns one fewer entry than the story has scenes (empty for zero or one).
pub fn transitions(story: &Story) -> Vec<SceneTransition> {
    story
        .ordered_scenes()
        .windows(2)
        .map(|pair| classify(pair[0], pair[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(number: u32, pov: &str, location: &str, time_hours: f64) -> SceneSequel {
        SceneSequel {
            number,
            title: String::new(),
            content: String::new(),
            pov_character: pov.to_string(),
            location: location.to_string(),
            time_hours,
        }
    }

    #[test]
    fn pov_change_outranks_location_and_time() {
        let prev = scene(1, "A", "X", 0.0);
        let next = scene(2, "B", "Y", 50.0);
        assert_eq!(classify(&prev, &next), SceneTransition::Ornamental);
    }

    #[test]
    fn time_gap_is_symmetric_and_strict() {
        let prev = scene(1, "A", "X", 10.0);
        assert_eq!(classify(&prev, &scene(2, "A", "X", 7.5)), SceneTransition::Whitespace);
        assert_eq!(classify(&prev, &scene(2, "A", "X", 12.0)), SceneTransition::None);
    }

    #[test]
    fn transitions_follow_scene_numbers() {
        let story = Story {
            scenes: vec![
                scene(2, "B", "X", 0.0),
                scene(1, "A", "X", 0.0),
                scene(3, "B", "X", 0.5),
            ],
            total_actual_words: 0,
        };
        assert_eq!(
            transitions(&story),
            vec![SceneTransition::Ornamental, SceneTransition::None]
        );
    }

    #[test]
    fn short_stories_have_no_transitions() {
        assert!(transitions(&Story::default()).is_empty());
        let single = Story::new(vec![scene(1, "A", "X", 0.0)]);
        assert!(transitions(&single).is_empty());
    }
}
