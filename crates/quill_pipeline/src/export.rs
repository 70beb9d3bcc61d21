//! Manuscript assembly for the EXPORT stage.

use quill_core::{Manuscript, SceneTransition, Story, transitions};

/// Markdown line marking a point-of-view change.
pub const ORNAMENTAL_BREAK: &str = "* * *";

/// Render a committed story as a Markdown manuscript, scenes in number
/// order.
///
/// Adjacent scenes are joined according to their [`SceneTransition`]: an
/// ornamental break line, a blank-line gap, or plain paragraph flow.
///
/// # Examples
///
/// ```
/// use quill_core::{SceneSequel, SceneTransition, Story};
/// use quill_pipeline::assemble_manuscript;
///
/// let scene = |number, pov: &str| SceneSequel {
///     number,
///     title: String::new(),
///     content: format!("Scene {number}."),
///     pov_character: pov.to_string(),
///     location: "Dock".to_string(),
///     time_hours: 0.0,
/// };
/// let story = Story::new(vec![scene(1, "Ana"), scene(2, "Ben")]);
///
/// let manuscript = assemble_manuscript("Harbor", &story);
/// assert_eq!(manuscript.transitions, vec![SceneTransition::Ornamental]);
/// assert!(manuscript.body.contains("Scene 1.\n\n* * *\n\nScene 2."));
/// ```
pub fn assemble_manuscript(title: &str, story: &Story) -> Manuscript {
    let separators = transitions(story);
    let mut body = format!("# {}\n\n", title);

    for (idx, scene) in story.ordered_scenes().into_iter().enumerate() {
        if idx > 0 {
            match separators.get(idx - 1) {
                Some(SceneTransition::Ornamental) => {
                    body.push_str("\n\n");
                    body.push_str(ORNAMENTAL_BREAK);
                    body.push_str("\n\n");
                }
                Some(SceneTransition::Whitespace) => body.push_str("\n\n\n"),
                Some(SceneTransition::None) | None => body.push_str("\n\n"),
            }
        }
        body.push_str(scene.content.trim());
    }
    body.push('\n');

    tracing::debug!(
        scenes = story.scenes.len(),
        words = story.total_actual_words,
        "Assembled manuscript"
    );

    Manuscript {
        title: title.to_string(),
        scene_count: story.scenes.len(),
        total_actual_words: story.total_actual_words,
        transitions: separators,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::SceneSequel;

    fn scene(number: u32, pov: &str, location: &str, hours: f64) -> SceneSequel {
        SceneSequel {
            number,
            title: format!("S{number}"),
            content: format!("Text {number}."),
            pov_character: pov.to_string(),
            location: location.to_string(),
            time_hours: hours,
        }
    }

    #[test]
    fn separators_follow_transitions() {
        let story = Story::new(vec![
            scene(1, "Ana", "Dock", 0.0),
            scene(2, "Ana", "Dock", 1.0),
            scene(3, "Ana", "Hill", 1.5),
            scene(4, "Ben", "Hill", 1.5),
        ]);
        let manuscript = assemble_manuscript("Harbor", &story);

        assert_eq!(
            manuscript.body,
            "# Harbor\n\nText 1.\n\nText 2.\n\n\nText 3.\n\n* * *\n\nText 4.\n"
        );
        assert_eq!(manuscript.scene_count, 4);
        assert_eq!(manuscript.total_actual_words, 8);
    }

    #[test]
    fn stored_order_does_not_change_the_manuscript() {
        let story = Story {
            scenes: vec![
                scene(3, "Ben", "Hill", 1.5),
                scene(1, "Ana", "Dock", 0.0),
                scene(2, "Ana", "Dock", 1.0),
            ],
            total_actual_words: 6,
        };
        let manuscript = assemble_manuscript("Harbor", &story);

        assert_eq!(
            manuscript.body,
            "# Harbor\n\nText 1.\n\nText 2.\n\n* * *\n\nText 3.\n"
        );
        assert_eq!(
            manuscript.transitions,
            vec![SceneTransition::None, SceneTransition::Ornamental]
        );
    }

    #[test]
    fn empty_story_has_only_title() {
        let manuscript = assemble_manuscript("Blank", &Story::default());
        assert_eq!(manuscript.body, "# Blank\n\n\n");
        assert!(manuscript.transitions.is_empty());
    }
}
