//! The staged project state machine.

use crate::{
    DefaultPromptComposer, PromptComposer, PromptContext, RevisionEngine, RevisionOutcome,
    assemble_manuscript, parse_scene_prose, parse_stage_output,
};
use futures::{StreamExt, TryStreamExt};
use quill_config::PipelineConfig;
use quill_core::{Act, Stage, StageOutput, Story, TemplateLibrary};
use quill_error::{
    ConfigError, QuillError, QuillErrorKind, QuillResult, RevisionError, RevisionErrorKind,
    StageError, StageErrorKind, ValidationError,
};
use quill_models::{InvokeOptions, ModelManager, SpendMeter};
use quill_storage::{Project, ProjectRepository, StageStatus};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Runs pipeline stages against a project and persists the results.
///
/// Every run takes the project's lock from the store, so two runners cannot
/// write the same project at once. A failed run leaves every stage record as
/// it was, in memory and in the store; only the spend it was billed is added
/// to the project.
#[derive(Clone)]
pub struct StageRunner {
    manager: ModelManager,
    store: Arc<dyn ProjectRepository>,
    composer: Arc<dyn PromptComposer>,
    settings: PipelineConfig,
    templates: TemplateLibrary,
    options: Option<InvokeOptions>,
}

impl std::fmt::Debug for StageRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRunner")
            .field("manager", &self.manager)
            .field("settings", &self.settings)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A stage's output before it is committed.
struct Produced {
    output: StageOutput,
    model: Option<String>,
}

impl StageRunner {
    /// Create a runner with the default composer and pipeline settings.
    pub fn new(manager: ModelManager, store: Arc<dyn ProjectRepository>) -> Self {
        Self {
            manager,
            store,
            composer: Arc::new(DefaultPromptComposer::new()),
            settings: PipelineConfig::default(),
            templates: TemplateLibrary::new(),
            options: None,
        }
    }

    /// Build prompts with `composer`.
    pub fn with_composer(mut self, composer: Arc<dyn PromptComposer>) -> Self {
        self.composer = composer;
        self
    }

    /// Apply pipeline settings.
    pub fn with_settings(mut self, settings: PipelineConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Offer templates from `templates` to the OUTLINE stage.
    pub fn with_templates(mut self, templates: TemplateLibrary) -> Self {
        self.templates = templates;
        self
    }

    /// Use `options` for every model call instead of the manager's defaults.
    pub fn with_options(mut self, options: InvokeOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// The model manager.
    pub fn manager(&self) -> &ModelManager {
        &self.manager
    }

    /// The project store.
    pub fn store(&self) -> &Arc<dyn ProjectRepository> {
        &self.store
    }

    /// Pipeline settings.
    pub fn settings(&self) -> &PipelineConfig {
        &self.settings
    }

    fn options(&self) -> InvokeOptions {
        self.options
            .clone()
            .unwrap_or_else(|| self.manager.default_options())
    }

    /// Create and persist a new project using the manager's default model.
    ///
    /// # Errors
    ///
    /// Returns error if the project cannot be saved.
    #[instrument(skip(self, brief))]
    pub async fn create_project(&self, title: &str, brief: &str) -> QuillResult<Project> {
        let project = Project::new(title, self.manager.default_model()).with_brief(brief);
        self.store.save(&project).await?;
        info!(project = %project.id(), "Created project");
        Ok(project)
    }

    /// Read a stage's output for inspection.
    ///
    /// Stale outputs are returned only when
    /// `pipeline.stale_outputs_readable` is set.
    ///
    /// # Errors
    ///
    /// Returns a dependency error if the output is missing or hidden.
    pub fn inspect<'p>(&self, project: &'p Project, stage: Stage) -> QuillResult<&'p StageOutput> {
        Ok(project.inspect_output(stage, self.settings.stale_outputs_readable)?)
    }

    /// Run `stage` and commit its output.
    ///
    /// Re-running a committed stage creates a new version and marks every
    /// downstream stage stale.
    ///
    /// # Errors
    ///
    /// - `Locked` if another run holds the project
    /// - a dependency error if a prerequisite is missing or stale
    /// - the model or validation failure, wrapped with the stage
    #[instrument(skip(self, project), fields(project = %project.id()))]
    pub async fn run_stage(&self, project: &mut Project, stage: Stage) -> QuillResult<StageOutput> {
        let _lock = self.store.lock(*project.id()).await?;
        project.check_prerequisites(stage)?;

        let model_id = project.active_model().clone();
        let meter = SpendMeter::new();
        let produced = match self.produce(project, stage, &model_id, &meter).await {
            Ok(produced) => produced,
            Err(e) => {
                self.save_spend_locked(project, meter.total()).await;
                return Err(StageError::failed(stage.to_string(), e).into());
            }
        };

        let cost = meter.total();
        let mut updated = project.clone();
        let version = updated.commit(stage, produced.output.clone(), produced.model, cost)?;
        self.store.save(&updated).await?;
        *project = updated;

        info!(%stage, version, cost, "Stage committed");
        Ok(produced.output)
    }

    /// Run `target` and any of its prerequisites that are not current.
    ///
    /// Returns the stages that ran, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failing stage and returns its error.
    pub async fn run_through(&self, project: &mut Project, target: Stage) -> QuillResult<Vec<Stage>> {
        let mut needed = BTreeSet::new();
        collect_prerequisites(target, &mut needed);

        let mut ran = Vec::new();
        for stage in needed {
            if stage == target || project.status(stage) != StageStatus::Committed {
                self.run_stage(project, stage).await?;
                ran.push(stage);
            } else {
                debug!(%stage, "Stage is current, skipping");
            }
        }
        Ok(ran)
    }

    /// Commit a revision batch as a new PROSE version.
    ///
    /// Returns the new version, or `None` when nothing was applied. The
    /// batch's spend is added to the project either way, so an outcome must
    /// be committed once.
    ///
    /// # Errors
    ///
    /// Returns a dependency error if the committed PROSE output is missing or
    /// stale, and a storage error if the save fails.
    #[instrument(skip(self, project, outcome), fields(project = %project.id(), applied = outcome.applied_count()))]
    pub async fn commit_revision(
        &self,
        project: &mut Project,
        outcome: &RevisionOutcome,
    ) -> QuillResult<Option<u32>> {
        let _lock = self.store.lock(*project.id()).await?;
        self.commit_revision_locked(project, outcome).await
    }

    /// Apply the committed REVISION feedback to the committed story.
    ///
    /// Requests run in priority order within `max_cost`; the result is
    /// committed as a new PROSE version when anything was applied.
    ///
    /// # Errors
    ///
    /// Returns a dependency error if PROSE or REVISION is not current, and
    /// the engine's error if the batch aborts. The spend of an aborted batch
    /// is still added to the project.
    #[instrument(skip(self, project), fields(project = %project.id()))]
    pub async fn revise(
        &self,
        project: &mut Project,
        max_cost: f64,
        verbose: bool,
    ) -> QuillResult<RevisionOutcome> {
        let _lock = self.store.lock(*project.id()).await?;

        let story = story_of(project)?.clone();
        let requests = match project.usable_output(Stage::Revision)? {
            StageOutput::Revision(feedback) => feedback.ordered_requests(),
            _ => {
                return Err(StageError::new(StageErrorKind::NotCommitted(
                    Stage::Revision.to_string(),
                ))
                .into());
            }
        };

        let engine = RevisionEngine::new(Arc::clone(&self.composer)).with_options(self.options());
        let model_id = project.active_model().clone();
        let outcome = match engine
            .apply_revisions(&story, &requests, &self.manager, &model_id, max_cost, verbose)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                self.save_spend_locked(project, aborted_spend(&e)).await;
                return Err(e);
            }
        };

        self.commit_revision_locked(project, &outcome).await?;
        Ok(outcome)
    }

    async fn commit_revision_locked(
        &self,
        project: &mut Project,
        outcome: &RevisionOutcome,
    ) -> QuillResult<Option<u32>> {
        story_of(project)?;
        if *outcome.applied_count() == 0 {
            debug!("No revisions applied, keeping current prose");
            if *outcome.spent() > 0.0 {
                let mut updated = project.clone();
                updated.record_spend(*outcome.spent());
                self.store.save(&updated).await?;
                *project = updated;
            }
            return Ok(None);
        }

        let mut updated = project.clone();
        let model = Some(project.active_model().clone());
        let version = updated.commit(
            Stage::Prose,
            StageOutput::Prose(outcome.story().clone()),
            model,
            *outcome.spent(),
        )?;
        self.store.save(&updated).await?;
        *project = updated;

        info!(version, "Committed revised prose");
        Ok(Some(version))
    }

    /// Persist spend billed by a run that failed, keeping the run's error as
    /// the one the caller sees.
    async fn save_spend_locked(&self, project: &mut Project, cost: f64) {
        if cost <= 0.0 {
            return;
        }
        let mut updated = project.clone();
        updated.record_spend(cost);
        match self.store.save(&updated).await {
            Ok(()) => {
                info!(cost, spent = *updated.spent(), "Recorded spend of failed run");
                *project = updated;
            }
            Err(e) => warn!(error = %e, cost, "Could not record spend of failed run"),
        }
    }

    async fn produce(
        &self,
        project: &Project,
        stage: Stage,
        model_id: &str,
        meter: &SpendMeter,
    ) -> QuillResult<Produced> {
        match stage {
            Stage::Export => {
                let story = story_of(project)?;
                Ok(Produced {
                    output: StageOutput::Export(assemble_manuscript(project.title(), story)),
                    model: None,
                })
            }
            Stage::Prose => {
                let context = PromptContext::from_project(project, &[]);
                let story = self.write_prose(&context, model_id, meter).await?;
                Ok(Produced {
                    output: StageOutput::Prose(story),
                    model: Some(model_id.to_string()),
                })
            }
            _ => {
                let template = if stage == Stage::Outline {
                    self.outline_template()?
                } else {
                    Vec::new()
                };
                let context = PromptContext::from_project(project, &template);
                let prompt = self.composer.stage_prompt(stage, &context)?;
                let output = self
                    .invoke_validated(&prompt, model_id, meter, |text| {
                        parse_stage_output(stage, text, context.story)
                    })
                    .await?;
                Ok(Produced {
                    output,
                    model: Some(model_id.to_string()),
                })
            }
        }
    }

    fn outline_template(&self) -> QuillResult<Vec<Act>> {
        let name = &self.settings.outline_template;
        self.templates.get(name).ok_or_else(|| {
            ConfigError::new(format!(
                "Unknown outline template '{}'. Available: {}",
                name,
                self.templates.names().join(", ")
            ))
            .with_key("pipeline.outline_template")
            .into()
        })
    }

    /// Write every breakdown scene, up to `prose_concurrency` at a time.
    async fn write_prose(
        &self,
        context: &PromptContext<'_>,
        model_id: &str,
        meter: &SpendMeter,
    ) -> QuillResult<Story> {
        let concurrency = self.settings.prose_concurrency.max(1);
        info!(scenes = context.breakdown.len(), concurrency, "Writing prose");

        let written: Vec<_> = futures::stream::iter(context.breakdown.iter())
            .map(|scene| async move {
                let prompt = self.composer.scene_prompt(scene, context)?;
                let content = self
                    .invoke_validated(&prompt, model_id, meter, parse_scene_prose)
                    .await?;
                debug!(scene = scene.number, "Scene written");
                let mut scene = scene.clone();
                scene.content = content;
                Ok::<_, QuillError>(scene)
            })
            .buffer_unordered(concurrency)
            .try_collect()
            .await?;

        Ok(Story::new(written))
    }

    /// Invoke the model and parse the response, re-invoking once if the
    /// response has the wrong shape.
    async fn invoke_validated<T, F>(
        &self,
        prompt: &str,
        model_id: &str,
        meter: &SpendMeter,
        parse: F,
    ) -> QuillResult<T>
    where
        F: Fn(&str) -> Result<T, ValidationError>,
    {
        let options = self.options();
        let first = self
            .manager
            .invoke_metered(prompt, model_id, &options, meter)
            .await?;
        let problem = match parse(first.text()) {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        warn!(error = %problem, "Model output had the wrong shape, asking again");
        let retry_prompt = format!(
            "{}\n\nYour previous answer could not be used ({}). Answer again, following the requested format exactly.",
            prompt, problem.kind
        );
        let second = self
            .manager
            .invoke_metered(&retry_prompt, model_id, &options, meter)
            .await?;
        Ok(parse(second.text())?)
    }
}

fn story_of(project: &Project) -> QuillResult<&Story> {
    match project.usable_output(Stage::Prose)? {
        StageOutput::Prose(story) => Ok(story),
        _ => Err(StageError::new(StageErrorKind::NotCommitted(Stage::Prose.to_string())).into()),
    }
}

/// Spend an aborted revision batch was billed before it stopped.
fn aborted_spend(error: &QuillError) -> f64 {
    match error.kind() {
        QuillErrorKind::Revision(RevisionError {
            kind: RevisionErrorKind::Aborted { spent, .. },
            ..
        }) => *spent,
        _ => 0.0,
    }
}

fn collect_prerequisites(stage: Stage, needed: &mut BTreeSet<Stage>) {
    if needed.insert(stage) {
        for prerequisite in stage.prerequisites() {
            collect_prerequisites(*prerequisite, needed);
        }
    }
}
