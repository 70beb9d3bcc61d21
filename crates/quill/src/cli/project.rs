//! Project command handlers.

use super::{Commands, OutputFormat};
use quill::{
    FileSystemProjectStore, ModelManager, Project, ProjectRepository, QuillConfig, QuillResult,
    Stage, StageError, StageErrorKind, StageOutput, StageRunner, StageStatus,
};
use std::path::Path;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::{info, instrument};
use uuid::Uuid;

/// Everything a command needs: the runner and its store.
pub struct Session {
    runner: StageRunner,
}

impl Session {
    /// Build a session from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the project root cannot be created or the budget
    /// ceiling is invalid.
    pub fn from_config(config: &QuillConfig) -> QuillResult<Self> {
        let store = Arc::new(FileSystemProjectStore::new(config.storage.project_root())?);
        let runner = StageRunner::new(ModelManager::from_config(config)?, store)
            .with_settings(config.pipeline.clone());
        Ok(Self { runner })
    }

    /// The model manager used for every call of this session.
    pub fn manager(&self) -> &ModelManager {
        self.runner.manager()
    }

    async fn load(&self, id: Uuid) -> QuillResult<Project> {
        self.runner.store().load(id).await
    }
}

/// Dispatch a parsed command.
///
/// # Errors
///
/// Returns the first error raised by the pipeline or the store.
#[instrument(skip(session, command))]
pub async fn handle_command(
    session: &Session,
    command: Commands,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match command {
        Commands::New {
            title,
            brief,
            model,
        } => {
            let mut project = session.runner.create_project(&title, &brief).await?;
            if let Some(model) = model {
                project.set_active_model(model);
                session.runner.store().save(&project).await?;
            }
            println!("{}", project.id());
        }

        Commands::List { format } => {
            let projects = session.runner.store().list().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&projects)?),
                OutputFormat::Human => {
                    if projects.is_empty() {
                        println!("No projects found.");
                    }
                    for summary in projects {
                        println!(
                            "{}  {:<32} {}/{} stages  ${:.4}  {}",
                            summary.id,
                            summary.title,
                            summary.committed_stages,
                            Stage::iter().count(),
                            summary.spent,
                            summary.updated_at.format("%Y-%m-%d %H:%M"),
                        );
                    }
                }
            }
        }

        Commands::Status { id } => {
            let project = session.load(id).await?;
            print_status(&project);
        }

        Commands::Run { id, stage, through } => {
            let mut project = session.load(id).await?;
            if through {
                let ran = session.runner.run_through(&mut project, stage).await?;
                info!(stages = ran.len(), "Pipeline run finished");
            } else {
                session.runner.run_stage(&mut project, stage).await?;
            }
            print_status(&project);
        }

        Commands::Show { id, stage } => {
            let project = session.load(id).await?;
            let output = session.runner.inspect(&project, stage)?;
            if project.status(stage) == StageStatus::Stale {
                eprintln!("warning: {stage} output is stale");
            }
            println!("{}", serde_json::to_string_pretty(output)?);
        }

        Commands::Revise { max_cost, id } => {
            let mut project = session.load(id).await?;
            let outcome = session.runner.revise(&mut project, max_cost, verbose).await?;
            println!(
                "Applied {} revision(s), {} unapplied, spent ${:.4}",
                outcome.applied_count(),
                outcome.unapplied().len(),
                outcome.spent()
            );
            for unapplied in outcome.unapplied() {
                println!(
                    "  scene {}: {:?}",
                    unapplied.request.scene_number, unapplied.reason
                );
            }
            if let Some(halt) = outcome.halt() {
                println!("Halted: {halt:?}");
            }
        }

        Commands::Export { id, output } => {
            let mut project = session.load(id).await?;
            let StageOutput::Export(manuscript) =
                session.runner.run_stage(&mut project, Stage::Export).await?
            else {
                return Err(StageError::new(StageErrorKind::NotCommitted(
                    Stage::Export.to_string(),
                ))
                .into());
            };
            match output {
                Some(path) => {
                    write_manuscript(&path, &manuscript.body).await?;
                    info!(path = %path.display(), words = manuscript.total_actual_words, "Wrote manuscript");
                }
                None => print!("{}", manuscript.body),
            }
        }

        Commands::Model { id, model } => {
            let _lock = session.runner.store().lock(id).await?;
            let mut project = session.load(id).await?;
            project.set_active_model(model);
            session.runner.store().save(&project).await?;
            println!("{} now uses {}", project.id(), project.active_model());
        }

        Commands::Delete { id } => {
            session.runner.store().delete(id).await?;
            println!("Deleted {id}");
        }
    }

    Ok(())
}

fn print_status(project: &Project) {
    println!("{} ({})", project.title(), project.id());
    println!(
        "model: {}  spent: ${:.4}",
        project.active_model(),
        project.spent()
    );
    for stage in Stage::iter() {
        match project.record(stage) {
            Some(record) => println!(
                "  {:<11} {:<9} v{}  ${:.4}  {}",
                stage.as_ref(),
                project.status(stage),
                record.version(),
                record.cost(),
                record.model().as_deref().unwrap_or("-")
            ),
            None => println!("  {:<11} {}", stage.as_ref(), StageStatus::Pending),
        }
    }
}

async fn write_manuscript(path: &Path, body: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, body).await
}
