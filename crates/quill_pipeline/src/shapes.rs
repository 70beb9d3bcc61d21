//! Structural validation of model output for each stage.

use crate::{parse_json, extract_json};
use quill_core::{
    Act, Character, Feedback, Location, Premise, SceneSequel, Stage, StageOutput, Story,
    renumber_acts, validate_acts,
};
use quill_error::{ValidationError, ValidationErrorKind};
use serde::Deserialize;
use std::collections::HashSet;

/// Parse a single-call stage's response into its output.
///
/// `story` is consulted by REVISION to check that every suggestion targets
/// an existing scene.
///
/// # Errors
///
/// Returns the first structural violation found.
pub fn parse_stage_output(
    stage: Stage,
    response: &str,
    story: Option<&Story>,
) -> Result<StageOutput, ValidationError> {
    match stage {
        Stage::Idea => parse_premise(response).map(StageOutput::Idea),
        Stage::Characters => {
            let characters: Vec<Character> = parse_json(response, "characters")?;
            require_unique("character", characters.iter().map(|c| c.name.as_str()))?;
            non_empty(characters, "characters").map(StageOutput::Characters)
        }
        Stage::Locations => {
            let locations: Vec<Location> = parse_json(response, "locations")?;
            require_unique("location", locations.iter().map(|l| l.name.as_str()))?;
            non_empty(locations, "locations").map(StageOutput::Locations)
        }
        Stage::Outline => parse_outline(response).map(StageOutput::Outline),
        Stage::Breakdown => parse_breakdown(response).map(StageOutput::Breakdown),
        Stage::Revision => parse_feedback(response, story).map(StageOutput::Revision),
        Stage::Prose | Stage::Export => Err(ValidationError::new(
            ValidationErrorKind::MalformedOutput {
                context: stage.to_string(),
                message: "stage is not produced from a single response".to_string(),
            },
        )),
    }
}

/// Accept a JSON premise or plain premise text.
fn parse_premise(response: &str) -> Result<Premise, ValidationError> {
    let premise = match extract_json(response, "idea")
        .ok()
        .and_then(|json| serde_json::from_str::<Premise>(&json).ok())
    {
        Some(premise) => premise,
        None => Premise {
            title: None,
            text: response.trim().to_string(),
        },
    };
    if premise.text.trim().is_empty() {
        return Err(ValidationError::new(ValidationErrorKind::EmptyOutput(
            Stage::Idea.to_string(),
        )));
    }
    Ok(Premise {
        title: premise.title.filter(|t| !t.trim().is_empty()),
        text: premise.text.trim().to_string(),
    })
}

fn parse_outline(response: &str) -> Result<Vec<Act>, ValidationError> {
    let mut acts: Vec<Act> = parse_json(response, "outline")?;
    validate_acts(&acts)?;
    renumber_acts(&mut acts);
    Ok(acts)
}

fn parse_breakdown(response: &str) -> Result<Vec<SceneSequel>, ValidationError> {
    let mut scenes: Vec<SceneSequel> = parse_json(response, "breakdown")?;
    for pair in scenes.windows(2) {
        if pair[1].number <= pair[0].number {
            return Err(ValidationError::new(ValidationErrorKind::SceneOrder {
                previous: pair[0].number,
                found: pair[1].number,
            }));
        }
    }
    for scene in &mut scenes {
        scene.content.clear();
    }
    non_empty(scenes, "breakdown")
}

fn parse_feedback(response: &str, story: Option<&Story>) -> Result<Feedback, ValidationError> {
    let feedback: Feedback = parse_json(response, "revision")?;
    if let Some(story) = story {
        for request in &feedback.suggested_revisions {
            if story.scene(request.scene_number).is_none() {
                return Err(ValidationError::new(ValidationErrorKind::UnknownScene(
                    request.scene_number,
                )));
            }
        }
    }
    Ok(feedback)
}

/// Prose for one scene: trimmed, non-empty, without a wrapping fence.
///
/// # Errors
///
/// Returns `EmptyOutput` if nothing remains after trimming.
pub fn parse_scene_prose(response: &str) -> Result<String, ValidationError> {
    let mut text = response.trim();
    if let Some(inner) = text.strip_prefix("```") {
        let inner = inner.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
        text = inner.strip_suffix("```").unwrap_or(inner).trim();
    }
    if text.is_empty() {
        return Err(ValidationError::new(ValidationErrorKind::EmptyOutput(
            Stage::Prose.to_string(),
        )));
    }
    Ok(text.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneReplacement {
    scene_number: Option<u32>,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplacementPayload {
    One(SceneReplacement),
    Many(Vec<SceneReplacement>),
}

/// Parse a revision response into replacement prose for scene `expected`.
///
/// The response must describe exactly one scene, name `expected` as its
/// number, and carry non-empty content.
///
/// # Errors
///
/// Returns `SceneCount`, `RevisionTarget`, `EmptyOutput` or
/// `MalformedOutput` accordingly.
pub fn parse_replacement(response: &str, expected: u32) -> Result<String, ValidationError> {
    let payload: ReplacementPayload = parse_json(response, "revision")?;
    let replacement = match payload {
        ReplacementPayload::One(one) => one,
        ReplacementPayload::Many(mut many) => {
            if many.len() != 1 {
                return Err(ValidationError::new(ValidationErrorKind::SceneCount(
                    many.len(),
                )));
            }
            many.remove(0)
        }
    };

    if replacement.scene_number != Some(expected) {
        return Err(ValidationError::new(ValidationErrorKind::RevisionTarget {
            expected,
            found: replacement.scene_number,
        }));
    }
    let content = replacement.content.trim();
    if content.is_empty() {
        return Err(ValidationError::new(ValidationErrorKind::EmptyOutput(
            format!("revision of scene {}", expected),
        )));
    }
    Ok(content.to_string())
}

fn non_empty<T>(items: Vec<T>, context: &str) -> Result<Vec<T>, ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::new(ValidationErrorKind::EmptyOutput(
            context.to_string(),
        )));
    }
    Ok(items)
}

fn require_unique<'a>(
    context: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.trim().to_lowercase()) {
            return Err(ValidationError::new(ValidationErrorKind::Duplicate {
                context: context.to_string(),
                name: name.to_string(),
            }));
        }
    }
    Ok(())
}
