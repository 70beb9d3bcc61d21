//! Project state and stage records.

use chrono::{DateTime, Utc};
use quill_core::{Stage, StageOutput};
use quill_error::{StageError, StageErrorKind, StorageError, StorageErrorKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Where a stage stands in a project.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StageStatus {
    /// Never committed
    Pending,
    /// Committed and current
    Committed,
    /// Committed, but an upstream stage has been re-run since
    Stale,
}

/// SHA-256 of the canonical JSON encoding of an output.
pub fn output_digest(output: &StageOutput) -> Result<String, StorageError> {
    let bytes = serde_json::to_vec(output).map_err(|e| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "Failed to encode stage output: {}",
            e
        )))
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// One committed version of a stage's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct StageRecord {
    /// Starts at 1 and increments on every commit
    version: u32,
    /// Whether the output was fully committed
    committed: bool,
    /// Whether an upstream re-run has invalidated this output
    stale: bool,
    /// The output itself
    output: StageOutput,
    /// Model that produced the output, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    /// Cost of the run in USD
    #[serde(default)]
    cost: f64,
    /// When the version was committed
    committed_at: DateTime<Utc>,
    /// SHA-256 of the serialized output
    digest: String,
}

impl StageRecord {
    fn new(
        version: u32,
        output: StageOutput,
        model: Option<String>,
        cost: f64,
    ) -> Result<Self, StorageError> {
        let digest = output_digest(&output)?;
        Ok(Self {
            version,
            committed: true,
            stale: false,
            output,
            model,
            cost,
            committed_at: Utc::now(),
            digest,
        })
    }

    /// Check the stored digest against the output.
    ///
    /// # Errors
    ///
    /// Returns `Corrupt` if they differ.
    pub fn verify(&self, stage: Stage) -> Result<(), StorageError> {
        let actual = output_digest(&self.output)?;
        if actual != self.digest {
            return Err(StorageError::new(StorageErrorKind::Corrupt(format!(
                "{} v{} digest mismatch: recorded {}, computed {}",
                stage, self.version, self.digest, actual
            ))));
        }
        Ok(())
    }

    /// Status of this record.
    pub fn status(&self) -> StageStatus {
        match (self.committed, self.stale) {
            (false, _) => StageStatus::Pending,
            (true, true) => StageStatus::Stale,
            (true, false) => StageStatus::Committed,
        }
    }
}

/// A fiction project and the outputs of its stages.
///
/// # Examples
///
/// ```
/// use quill_core::{Premise, Stage, StageOutput};
/// use quill_storage::{Project, StageStatus};
///
/// let mut project = Project::new("The Lighthouse", "openai:gpt-4o-mini");
/// assert!(project.check_prerequisites(Stage::Characters).is_err());
///
/// let idea = StageOutput::Idea(Premise { title: None, text: "A keeper finds a letter.".into() });
/// project.commit(Stage::Idea, idea, Some("gpt-4o-mini".into()), 0.001).unwrap();
/// assert!(project.check_prerequisites(Stage::Characters).is_ok());
/// assert_eq!(project.status(Stage::Idea), StageStatus::Committed);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Project {
    /// Unique identifier
    id: Uuid,
    /// Display title
    title: String,
    /// Free-form author notes fed to the IDEA prompt
    #[serde(default)]
    brief: String,
    /// Committed stage outputs
    #[serde(default)]
    stages: BTreeMap<Stage, StageRecord>,
    /// Model identifier used for new runs
    active_model: String,
    /// Cumulative billed spend of every run in USD, committed or not
    #[serde(default)]
    spent: f64,
    /// Creation time
    created_at: DateTime<Utc>,
    /// Last change time
    updated_at: DateTime<Utc>,
}

impl Project {
    /// Create an empty project.
    pub fn new(title: impl Into<String>, active_model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            brief: String::new(),
            stages: BTreeMap::new(),
            active_model: active_model.into(),
            spent: 0.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach author notes for the IDEA stage.
    pub fn with_brief(mut self, brief: impl Into<String>) -> Self {
        self.brief = brief.into();
        self
    }

    /// Switch the model used for subsequent runs.
    pub fn set_active_model(&mut self, model: impl Into<String>) {
        self.active_model = model.into();
        self.updated_at = Utc::now();
    }

    /// Record for `stage`, if it was ever committed.
    pub fn record(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.get(&stage)
    }

    /// Status of `stage`.
    pub fn status(&self, stage: Stage) -> StageStatus {
        self.record(stage)
            .map(StageRecord::status)
            .unwrap_or(StageStatus::Pending)
    }

    /// Confirm every prerequisite of `stage` is committed and current.
    ///
    /// # Errors
    ///
    /// Returns `MissingPrerequisite` or `StalePrerequisite` for the first
    /// prerequisite that is not usable.
    pub fn check_prerequisites(&self, stage: Stage) -> Result<(), StageError> {
        for prerequisite in stage.prerequisites() {
            match self.status(*prerequisite) {
                StageStatus::Committed => {}
                StageStatus::Pending => {
                    return Err(StageError::new(StageErrorKind::MissingPrerequisite {
                        stage: stage.to_string(),
                        prerequisite: prerequisite.to_string(),
                    }));
                }
                StageStatus::Stale => {
                    return Err(StageError::new(StageErrorKind::StalePrerequisite {
                        stage: stage.to_string(),
                        prerequisite: prerequisite.to_string(),
                    }));
                }
            }
        }
        Ok(())
    }

    /// Output of `stage` for use as a dependency.
    ///
    /// # Errors
    ///
    /// Returns `NotCommitted` if the stage never ran and `StaleOutput` if it
    /// has been invalidated.
    pub fn usable_output(&self, stage: Stage) -> Result<&StageOutput, StageError> {
        match self.record(stage) {
            Some(record) if record.committed && !record.stale => Ok(&record.output),
            Some(record) if record.committed => Err(StageError::new(
                StageErrorKind::StaleOutput(stage.to_string()),
            )),
            _ => Err(StageError::new(StageErrorKind::NotCommitted(
                stage.to_string(),
            ))),
        }
    }

    /// Output of `stage` for inspection.
    ///
    /// Stale outputs are returned when `stale_readable` is set.
    ///
    /// # Errors
    ///
    /// Returns `NotCommitted` if the stage never ran and `StaleHidden` if it
    /// is stale and stale reads are disabled.
    pub fn inspect_output(
        &self,
        stage: Stage,
        stale_readable: bool,
    ) -> Result<&StageOutput, StageError> {
        match self.record(stage) {
            Some(record) if record.committed && (!record.stale || stale_readable) => {
                Ok(&record.output)
            }
            Some(record) if record.committed => Err(StageError::new(
                StageErrorKind::StaleHidden(stage.to_string()),
            )),
            _ => Err(StageError::new(StageErrorKind::NotCommitted(
                stage.to_string(),
            ))),
        }
    }

    /// Commit a new version of `stage`, returning the version number.
    ///
    /// Clears staleness for `stage` only and marks every committed downstream
    /// stage stale. Earlier outputs are replaced, never merged.
    ///
    /// # Errors
    ///
    /// Returns error if the output cannot be encoded for its digest.
    pub fn commit(
        &mut self,
        stage: Stage,
        output: StageOutput,
        model: Option<String>,
        cost: f64,
    ) -> Result<u32, StorageError> {
        let version = self.record(stage).map(|r| r.version + 1).unwrap_or(1);
        let record = StageRecord::new(version, output, model, cost)?;
        self.stages.insert(stage, record);
        let invalidated = self.mark_downstream_stale(stage);
        self.spent += cost.max(0.0);
        self.updated_at = Utc::now();
        info!(
            project = %self.id,
            stage = %stage,
            version,
            invalidated = invalidated.len(),
            "Committed stage output"
        );
        Ok(version)
    }

    /// Add spend billed by a run that committed nothing.
    ///
    /// Stage records are left untouched.
    pub fn record_spend(&mut self, cost: f64) {
        let cost = cost.max(0.0);
        if cost == 0.0 {
            return;
        }
        self.spent += cost;
        self.updated_at = Utc::now();
        debug!(project = %self.id, cost, spent = self.spent, "Recorded uncommitted spend");
    }

    /// Mark every committed stage downstream of `stage` stale.
    ///
    /// Returns the stages whose status changed.
    pub fn mark_downstream_stale(&mut self, stage: Stage) -> Vec<Stage> {
        let mut changed = Vec::new();
        for downstream in stage.downstream() {
            if let Some(record) = self.stages.get_mut(&downstream) {
                if record.committed && !record.stale {
                    record.stale = true;
                    changed.push(downstream);
                }
            }
        }
        if !changed.is_empty() {
            debug!(project = %self.id, upstream = %stage, ?changed, "Marked downstream stages stale");
        }
        changed
    }

    /// Check every record's digest.
    ///
    /// # Errors
    ///
    /// Returns `Corrupt` for the first mismatch.
    pub fn verify(&self) -> Result<(), StorageError> {
        for (stage, record) in &self.stages {
            record.verify(*stage)?;
        }
        Ok(())
    }
}
