//! Stage outputs.

use crate::{
    Act, Character, Feedback, Location, Premise, SceneSequel, SceneTransition, Stage, Story,
};
use serde::{Deserialize, Serialize};

/// The assembled manuscript produced by EXPORT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manuscript {
    /// Display title
    pub title: String,
    /// Number of scenes assembled
    pub scene_count: usize,
    /// Word total of the story the manuscript was built from
    pub total_actual_words: usize,
    /// Separator between each adjacent scene pair
    pub transitions: Vec<SceneTransition>,
    /// Rendered Markdown
    pub body: String,
}

/// Structured result of one stage run.
///
/// Each variant belongs to exactly one [`Stage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StageOutput {
    /// Premise
    Idea(Premise),
    /// Cast
    Characters(Vec<Character>),
    /// Settings
    Locations(Vec<Location>),
    /// Act structure
    Outline(Vec<Act>),
    /// Scene plan with empty content
    Breakdown(Vec<SceneSequel>),
    /// Written story
    Prose(Story),
    /// Editorial critique
    Revision(Feedback),
    /// Assembled manuscript
    Export(Manuscript),
}

impl StageOutput {
    /// Stage that produces this kind of output.
    pub fn stage(&self) -> Stage {
        match self {
            StageOutput::Idea(_) => Stage::Idea,
            StageOutput::Characters(_) => Stage::Characters,
            StageOutput::Locations(_) => Stage::Locations,
            StageOutput::Outline(_) => Stage::Outline,
            StageOutput::Breakdown(_) => Stage::Breakdown,
            StageOutput::Prose(_) => Stage::Prose,
            StageOutput::Revision(_) => Stage::Revision,
            StageOutput::Export(_) => Stage::Export,
        }
    }

    /// The story, if this is a PROSE output.
    pub fn as_story(&self) -> Option<&Story> {
        match self {
            StageOutput::Prose(story) => Some(story),
            _ => None,
        }
    }

    /// The feedback, if this is a REVISION output.
    pub fn as_feedback(&self) -> Option<&Feedback> {
        match self {
            StageOutput::Revision(feedback) => Some(feedback),
            _ => None,
        }
    }
}
