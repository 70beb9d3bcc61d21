//! Built-in and custom outline templates.
//!
//! Every retrieval returns a freshly built act tree, so callers may edit the
//! result without affecting later retrievals.

use crate::act::{Act, renumber_acts, validate_acts};
use quill_error::ValidationError;
use std::collections::BTreeMap;

/// Named outline structures shipped with the pipeline.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutlineTemplate {
    /// Setup, confrontation, resolution
    ThreeAct,
    /// Campbell's monomyth in three movements
    HerosJourney,
    /// Fifteen-beat screenplay structure
    SaveTheCat,
    /// Hook through resolution in seven points
    SevenPoint,
}

impl OutlineTemplate {
    /// Build a fresh act tree for this template.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_core::OutlineTemplate;
    ///
    /// let mut first = OutlineTemplate::ThreeAct.acts();
    /// first[0].title = "Edited".to_string();
    ///
    /// let second = OutlineTemplate::ThreeAct.acts();
    /// assert_ne!(second[0].title, "Edited");
    /// ```
    pub fn acts(&self) -> Vec<Act> {
        let mut acts = match self {
            OutlineTemplate::ThreeAct => three_act(),
            OutlineTemplate::HerosJourney => heros_journey(),
            OutlineTemplate::SaveTheCat => save_the_cat(),
            OutlineTemplate::SevenPoint => seven_point(),
        };
        renumber_acts(&mut acts);
        acts
    }
}

fn three_act() -> Vec<Act> {
    vec![
        Act::new(
            "Setup",
            "Establish the world, the protagonist and what they want",
            0.25,
        ),
        Act::new(
            "Confrontation",
            "Obstacles escalate as the protagonist pursues the goal",
            0.5,
        )
        .with_children(vec![
            Act::new("Rising Action", "Early attempts and complications", 0.5),
            Act::new("Midpoint Reversal", "Stakes rise and the plan fails", 0.5),
        ]),
        Act::new("Resolution", "Climax and the new equilibrium", 0.25),
    ]
}

fn heros_journey() -> Vec<Act> {
    vec![
        Act::new("Departure", "The hero leaves the ordinary world", 0.25).with_children(vec![
            Act::new("Ordinary World", "", 0.2),
            Act::new("Call to Adventure", "", 0.2),
            Act::new("Refusal of the Call", "", 0.2),
            Act::new("Meeting the Mentor", "", 0.2),
            Act::new("Crossing the Threshold", "", 0.2),
        ]),
        Act::new("Initiation", "Trials transform the hero", 0.5).with_children(vec![
            Act::new("Tests, Allies, Enemies", "", 0.25),
            Act::new("Approach to the Inmost Cave", "", 0.25),
            Act::new("The Ordeal", "", 0.25),
            Act::new("Reward", "", 0.25),
        ]),
        Act::new("Return", "The hero brings the boon home", 0.25).with_children(vec![
            Act::new("The Road Back", "", 0.34),
            Act::new("Resurrection", "", 0.33),
            Act::new("Return with the Elixir", "", 0.33),
        ]),
    ]
}

fn save_the_cat() -> Vec<Act> {
    vec![
        Act::new("Opening Image", "", 0.01),
        Act::new("Theme Stated", "", 0.04),
        Act::new("Set-Up", "", 0.05),
        Act::new("Catalyst", "", 0.02),
        Act::new("Debate", "", 0.08),
        Act::new("Break into Two", "", 0.02),
        Act::new("B Story", "", 0.05),
        Act::new("Fun and Games", "", 0.23),
        Act::new("Midpoint", "", 0.02),
        Act::new("Bad Guys Close In", "", 0.18),
        Act::new("All Is Lost", "", 0.02),
        Act::new("Dark Night of the Soul", "", 0.08),
        Act::new("Break into Three", "", 0.02),
        Act::new("Finale", "", 0.17),
        Act::new("Final Image", "", 0.01),
    ]
}

fn seven_point() -> Vec<Act> {
    vec![
        Act::new("Hook", "The starting state, opposite of the resolution", 0.1),
        Act::new("Plot Turn 1", "The conflict arrives", 0.15),
        Act::new("Pinch 1", "Pressure from the antagonist", 0.15),
        Act::new("Midpoint", "The protagonist commits", 0.2),
        Act::new("Pinch 2", "Everything goes wrong", 0.15),
        Act::new("Plot Turn 2", "The final piece falls into place", 0.15),
        Act::new("Resolution", "The conflict is resolved", 0.1),
    ]
}

/// Built-in templates plus user-registered act structures.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    custom: BTreeMap<String, Vec<Act>>,
}

impl TemplateLibrary {
    /// Create a library with only the built-in templates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom template under `name`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns error if the act tree does not validate.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        mut acts: Vec<Act>,
    ) -> Result<(), ValidationError> {
        validate_acts(&acts)?;
        renumber_acts(&mut acts);
        self.custom.insert(name.into(), acts);
        Ok(())
    }

    /// Retrieve an independent copy of the named template.
    ///
    /// Custom templates shadow built-ins with the same name.
    pub fn get(&self, name: &str) -> Option<Vec<Act>> {
        if let Some(acts) = self.custom.get(name) {
            return Some(acts.clone());
        }
        name.parse::<OutlineTemplate>().ok().map(|t| t.acts())
    }

    /// Names of every available template.
    pub fn names(&self) -> Vec<String> {
        use strum::IntoEnumIterator;
        let mut names: Vec<String> = OutlineTemplate::iter().map(|t| t.to_string()).collect();
        names.extend(self.custom.keys().cloned());
        names.sort();
        names.dedup();
        names
    }
}
