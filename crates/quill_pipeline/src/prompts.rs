//! Prompt composition for each stage.

use quill_core::{Act, Character, Location, Premise, SceneSequel, Stage, StageOutput, Story};
use quill_error::{ConfigError, QuillResult};
use quill_storage::Project;
use std::collections::BTreeMap;

/// Committed outputs a prompt may draw on.
///
/// Only current outputs are exposed; stale ones read as absent.
#[derive(Debug, Clone, Default)]
pub struct PromptContext<'a> {
    /// Project title
    pub title: &'a str,
    /// Author notes
    pub brief: &'a str,
    /// IDEA output
    pub premise: Option<&'a Premise>,
    /// CHARACTERS output
    pub characters: &'a [Character],
    /// LOCATIONS output
    pub locations: &'a [Location],
    /// OUTLINE output
    pub outline: &'a [Act],
    /// BREAKDOWN output
    pub breakdown: &'a [SceneSequel],
    /// PROSE output
    pub story: Option<&'a Story>,
    /// Structure suggested to the OUTLINE stage
    pub template: &'a [Act],
}

impl<'a> PromptContext<'a> {
    /// Collect the current outputs of `project`.
    pub fn from_project(project: &'a Project, template: &'a [Act]) -> Self {
        let mut context = Self {
            title: project.title(),
            brief: project.brief(),
            template,
            ..Self::default()
        };
        for stage in [
            Stage::Idea,
            Stage::Characters,
            Stage::Locations,
            Stage::Outline,
            Stage::Breakdown,
            Stage::Prose,
        ] {
            match project.usable_output(stage) {
                Ok(StageOutput::Idea(premise)) => context.premise = Some(premise),
                Ok(StageOutput::Characters(characters)) => context.characters = characters,
                Ok(StageOutput::Locations(locations)) => context.locations = locations,
                Ok(StageOutput::Outline(acts)) => context.outline = acts,
                Ok(StageOutput::Breakdown(scenes)) => context.breakdown = scenes,
                Ok(StageOutput::Prose(story)) => context.story = Some(story),
                _ => {}
            }
        }
        context
    }
}

/// Builds the prompt text sent to the model.
pub trait PromptComposer: Send + Sync {
    /// Prompt for a stage that makes a single model call.
    fn stage_prompt(&self, stage: Stage, context: &PromptContext<'_>) -> QuillResult<String>;

    /// Prompt asking for the prose of one breakdown scene.
    fn scene_prompt(&self, scene: &SceneSequel, context: &PromptContext<'_>)
    -> QuillResult<String>;

    /// Prompt asking for a full replacement of one scene.
    fn revision_prompt(&self, scene: &SceneSequel, instruction: &str) -> QuillResult<String>;
}

const IDEA_TEMPLATE: &str = r#"You are developing a work of fiction titled "{{title}}".

Author notes:
{{brief}}

Write the premise of the story in one or two paragraphs.
Respond with JSON only: {"title": "<working title>", "text": "<premise>"}"#;

const CHARACTERS_TEMPLATE: &str = r#"Premise:
{{premise}}

Create the cast for this story.
Respond with a JSON array only. Each element is an object with "name", "role" and "description". Names must be unique."#;

const LOCATIONS_TEMPLATE: &str = r#"Premise:
{{premise}}

Create the settings this story visits.
Respond with a JSON array only. Each element is an object with "name" and "description". Names must be unique."#;

const OUTLINE_TEMPLATE: &str = r#"Premise:
{{premise}}

Characters:
{{characters}}

Locations:
{{locations}}

Suggested structure:
{{template}}

Outline the story as a sequence of acts.
Respond with a JSON array only. Each act has "title", "description", "fraction" (its share of the parent's length) and optional "children" (sub-acts in the same format). Fractions of sibling acts must sum to 1.0."#;

const BREAKDOWN_TEMPLATE: &str = r#"Premise:
{{premise}}

Characters:
{{characters}}

Locations:
{{locations}}

Outline:
{{outline}}

Break the outline into scenes.
Respond with a JSON array only. Each scene has "number" (strictly increasing), "title", "povCharacter" (one of the characters), "location" (one of the locations) and "timeHours" (story hours since the opening scene)."#;

const REVISION_TEMPLATE: &str = r#"You are the editor of "{{title}}".

Premise:
{{premise}}

Story:
{{story}}

Critique the story and suggest scene rewrites.
Respond with JSON only: {"suggestedRevisions": [{"sceneNumber": <scene number>, "instruction": "<what to change>", "priority": <1 is most urgent>}]}"#;

const SCENE_TEMPLATE: &str = r#"Premise:
{{premise}}

Characters:
{{characters}}

Scene plan:
{{breakdown}}

Write scene {{scene_number}}, "{{scene_title}}", from the point of view of {{pov}} at {{location}}.
Respond with the prose of this scene only, without headings or commentary."#;

const REVISE_TEMPLATE: &str = r#"Scene {{scene_number}}, "{{scene_title}}":

{{scene}}

Instruction: {{instruction}}

Rewrite this scene only, keeping its point of view and location.
Respond with JSON only: {"sceneNumber": {{scene_number}}, "content": "<the full replacement prose>"}"#;

/// Template key for per-scene prose prompts.
pub const SCENE_PROMPT: &str = "scene";
/// Template key for revision prompts.
pub const REVISE_PROMPT: &str = "revise";

/// Composer that fills `{{placeholder}}` templates.
///
/// Every stage, plus the [`SCENE_PROMPT`] and [`REVISE_PROMPT`] keys, has a
/// built-in template that can be replaced with [`with_template`].
///
/// [`with_template`]: DefaultPromptComposer::with_template
#[derive(Debug, Clone)]
pub struct DefaultPromptComposer {
    templates: BTreeMap<String, String>,
}

impl Default for DefaultPromptComposer {
    fn default() -> Self {
        let templates = [
            (Stage::Idea.to_string(), IDEA_TEMPLATE),
            (Stage::Characters.to_string(), CHARACTERS_TEMPLATE),
            (Stage::Locations.to_string(), LOCATIONS_TEMPLATE),
            (Stage::Outline.to_string(), OUTLINE_TEMPLATE),
            (Stage::Breakdown.to_string(), BREAKDOWN_TEMPLATE),
            (Stage::Revision.to_string(), REVISION_TEMPLATE),
            (SCENE_PROMPT.to_string(), SCENE_TEMPLATE),
            (REVISE_PROMPT.to_string(), REVISE_TEMPLATE),
        ]
        .into_iter()
        .map(|(key, text)| (key, text.to_string()))
        .collect();
        Self { templates }
    }
}

impl DefaultPromptComposer {
    /// Composer with the built-in templates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the template for `key` (a stage name, `scene` or `revise`).
    pub fn with_template(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(key.into(), template.into());
        self
    }

    fn template(&self, key: &str) -> QuillResult<&str> {
        self.templates
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::new(format!("No prompt template for '{}'", key)).into())
    }
}

/// Fill `{{name}}` placeholders from `values`.
///
/// # Errors
///
/// Returns error if the template names a placeholder with no value.
pub fn render_template(template: &str, values: &BTreeMap<&str, String>) -> QuillResult<String> {
    let re = regex::Regex::new(r"\{\{\s*([a-z_]+)\s*\}\}")
        .map_err(|e| ConfigError::new(format!("Invalid template regex: {}", e)))?;

    let mut missing = None;
    let rendered = re.replace_all(template, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match values.get(name) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    if let Some(name) = missing {
        let available: Vec<&str> = values.keys().copied().collect();
        return Err(ConfigError::new(format!(
            "Unknown prompt placeholder '{}'. Available: {}",
            name,
            available.join(", ")
        ))
        .into());
    }
    Ok(rendered.into_owned())
}

fn context_values<'v>(context: &PromptContext<'_>) -> BTreeMap<&'v str, String> {
    let mut values = BTreeMap::new();
    values.insert("title", context.title.to_string());
    values.insert(
        "brief",
        if context.brief.trim().is_empty() {
            "(none)".to_string()
        } else {
            context.brief.to_string()
        },
    );
    values.insert(
        "premise",
        context
            .premise
            .map(|p| p.text.clone())
            .unwrap_or_default(),
    );
    values.insert(
        "characters",
        context
            .characters
            .iter()
            .map(|c| format!("- {} ({}): {}", c.name, c.role, c.description))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    values.insert(
        "locations",
        context
            .locations
            .iter()
            .map(|l| format!("- {}: {}", l.name, l.description))
            .collect::<Vec<_>>()
            .join("\n"),
    );
    values.insert("outline", render_acts(context.outline));
    values.insert("template", render_acts(context.template));
    values.insert(
        "breakdown",
        context
            .breakdown
            .iter()
            .map(|s| {
                format!(
                    "{}. {} [{} at {}, hour {}]",
                    s.number, s.title, s.pov_character, s.location, s.time_hours
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    );
    values.insert(
        "story",
        context
            .story
            .map(|story| {
                story
                    .scenes
                    .iter()
                    .map(|s| format!("## Scene {}: {}\n\n{}", s.number, s.title, s.content))
                    .collect::<Vec<_>>()
                    .join("\n\n")
            })
            .unwrap_or_default(),
    );
    values
}

fn render_acts(acts: &[Act]) -> String {
    fn walk(acts: &[Act], depth: usize, lines: &mut Vec<String>) {
        for act in acts {
            let indent = "  ".repeat(depth);
            let mut line = format!("{}- {} ({:.0}%)", indent, act.title, act.fraction * 100.0);
            if !act.description.is_empty() {
                line.push_str(": ");
                line.push_str(&act.description);
            }
            lines.push(line);
            walk(&act.children, depth + 1, lines);
        }
    }

    let mut lines = Vec::new();
    walk(acts, 0, &mut lines);
    lines.join("\n")
}

fn scene_values<'v>(values: &mut BTreeMap<&'v str, String>, scene: &SceneSequel) {
    values.insert("scene_number", scene.number.to_string());
    values.insert("scene_title", scene.title.clone());
    values.insert("scene", scene.content.clone());
    values.insert("pov", scene.pov_character.clone());
    values.insert("location", scene.location.clone());
}

impl PromptComposer for DefaultPromptComposer {
    fn stage_prompt(&self, stage: Stage, context: &PromptContext<'_>) -> QuillResult<String> {
        let template = self.template(stage.as_ref())?;
        render_template(template, &context_values(context))
    }

    fn scene_prompt(
        &self,
        scene: &SceneSequel,
        context: &PromptContext<'_>,
    ) -> QuillResult<String> {
        let mut values = context_values(context);
        scene_values(&mut values, scene);
        render_template(self.template(SCENE_PROMPT)?, &values)
    }

    fn revision_prompt(&self, scene: &SceneSequel, instruction: &str) -> QuillResult<String> {
        let mut values = BTreeMap::new();
        scene_values(&mut values, scene);
        values.insert("instruction", instruction.to_string());
        render_template(self.template(REVISE_PROMPT)?, &values)
    }
}
