//! Story world: premise, cast and settings.

use serde::{Deserialize, Serialize};

/// The IDEA stage output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Premise {
    /// Working title, if the model offered one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Premise text
    pub text: String,
}

/// A member of the cast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Unique name
    pub name: String,
    /// Narrative role (protagonist, mentor, ...)
    #[serde(default)]
    pub role: String,
    /// Short description
    #[serde(default)]
    pub description: String,
}

/// A setting the story visits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Unique name
    pub name: String,
    /// Short description
    #[serde(default)]
    pub description: String,
}
