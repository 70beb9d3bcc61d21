//! Scenes and stories.

use serde::{Deserialize, Serialize};

/// Count whitespace-delimited tokens.
///
/// # Examples
///
/// ```
/// use quill_core::word_count;
///
/// assert_eq!(word_count("  The rain\tfell.\n"), 3);
/// assert_eq!(word_count(""), 0);
/// ```
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// A numbered unit of prose with its point of view, setting and story time.
///
/// During BREAKDOWN the content is empty; PROSE fills it in.
///
/// # Examples
///
/// ```
/// use quill_core::SceneSequel;
///
/// let scene: SceneSequel = serde_json::from_str(
///     r#"{"number": 1, "title": "Arrival", "content": "", "povCharacter": "Ana",
///         "location": "Dock", "timeHours": 0.0}"#,
/// ).unwrap();
/// assert_eq!(scene.pov_character, "Ana");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSequel {
    /// Ordering-significant scene number, unique within a story
    pub number: u32,
    /// Scene title
    #[serde(default)]
    pub title: String,
    /// Prose content
    #[serde(default)]
    pub content: String,
    /// Point-of-view character
    pub pov_character: String,
    /// Where the scene takes place
    pub location: String,
    /// Elapsed story time in hours; not required to be monotonic
    #[serde(default)]
    pub time_hours: f64,
}

impl SceneSequel {
    /// Words in this scene's content.
    pub fn word_count(&self) -> usize {
        word_count(&self.content)
    }
}

/// Ordered scenes plus the aggregate word count.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Scenes in number order
    pub scenes: Vec<SceneSequel>,
    /// Sum of per-scene word counts
    #[serde(default)]
    pub total_actual_words: usize,
}

impl Story {
    /// Build a story, sorting scenes by number and computing the word total.
    pub fn new(mut scenes: Vec<SceneSequel>) -> Self {
        scenes.sort_by_key(|s| s.number);
        let mut story = Self {
            scenes,
            total_actual_words: 0,
        };
        story.recompute_word_count();
        story
    }

    /// Recalculate `total_actual_words` from scene content.
    pub fn recompute_word_count(&mut self) {
        self.total_actual_words = self.scenes.iter().map(SceneSequel::word_count).sum();
    }

    /// Scenes sorted by number.
    ///
    /// `scenes` is public and deserialized stories keep their stored order,
    /// so readers that depend on order go through this.
    pub fn ordered_scenes(&self) -> Vec<&SceneSequel> {
        let mut ordered: Vec<&SceneSequel> = self.scenes.iter().collect();
        ordered.sort_by_key(|s| s.number);
        ordered
    }

    /// Look up a scene by number.
    pub fn scene(&self, number: u32) -> Option<&SceneSequel> {
        self.scenes.iter().find(|s| s.number == number)
    }

    /// Replace the content of scene `number`, returning false if it is absent.
    ///
    /// Metadata (title, POV, location, time) is kept; only prose changes.
    pub fn replace_content(&mut self, number: u32, content: impl Into<String>) -> bool {
        match self.scenes.iter_mut().find(|s| s.number == number) {
            Some(scene) => {
                scene.content = content.into();
                true
            }
            None => false,
        }
    }
}
