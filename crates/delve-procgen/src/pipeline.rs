//! Ordered stage execution with provides/requires validation.

use std::collections::BTreeSet;

use ahash::AHashSet;
use delve_common::ChunkKey;
use delve_world::{CommitReport, Edits};
use tracing::debug;

use crate::context::GenContext;
use crate::error::{GenError, GenResult};
use crate::stage::Stage;

/// Outcome of one pipeline run.
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Stages executed
    pub stages_run: usize,
    /// Total tile writes and spawns produced by all stages
    pub edits_produced: usize,
    /// Aggregated commit results
    pub commit: CommitReport,
}

impl PipelineReport {
    /// Chunks whose edits were dropped during commit.
    #[must_use]
    pub fn failed_chunks(&self) -> Vec<ChunkKey> {
        self.commit.chunks_failed.iter().map(|(key, _)| *key).collect()
    }
}

/// An ordered list of stages.
///
/// By default each stage's edits are committed before the next stage runs.
/// With batched commits, all edits are merged and committed once at the end.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    batch_commits: bool,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_order())
            .field("batch_commits", &self.batch_commits)
            .finish()
    }
}

impl Pipeline {
    /// Creates an empty pipeline with per-stage commits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches between batched and per-stage commits.
    #[must_use]
    pub fn with_batch_commits(mut self, batch: bool) -> Self {
        self.batch_commits = batch;
        self
    }

    /// Appends a stage.
    pub fn add_stage(&mut self, stage: impl Stage + 'static) {
        self.stages.push(Box::new(stage));
    }

    /// Appends a stage, builder style.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.add_stage(stage);
        self
    }

    /// Whether commits are batched.
    #[must_use]
    pub const fn batch_commits(&self) -> bool {
        self.batch_commits
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Checks stage ids are unique and every requirement is provided by a
    /// strictly earlier stage.
    pub fn validate_dependencies(&self) -> GenResult<()> {
        let mut seen: AHashSet<&str> = AHashSet::new();
        let mut satisfied: BTreeSet<String> = BTreeSet::new();

        for stage in &self.stages {
            if !seen.insert(stage.id()) {
                return Err(GenError::DuplicateStage(stage.id().to_string()));
            }
            let missing: Vec<String> = stage.requires().difference(&satisfied).cloned().collect();
            if !missing.is_empty() {
                return Err(GenError::UnsatisfiedDependency {
                    stage: stage.id().to_string(),
                    missing,
                    available: satisfied.into_iter().collect(),
                });
            }
            satisfied.extend(stage.provides());
        }
        Ok(())
    }

    /// Validates, then runs every stage in order against `ctx`.
    pub fn run(&self, ctx: &mut GenContext<'_>) -> GenResult<PipelineReport> {
        self.validate_dependencies()?;

        let mut report = PipelineReport::default();
        let mut batched = Edits::new();

        for stage in &self.stages {
            debug!("Running stage '{}' over {}", stage.id(), ctx.area());
            let edits = stage.apply(ctx)?;
            report.stages_run += 1;
            report.edits_produced += edits.len();
            debug!("Stage '{}' produced {} edits", stage.id(), edits.len());

            if self.batch_commits {
                batched.merge(edits);
            } else {
                report.commit.absorb(ctx.commit(&edits));
            }
        }

        if self.batch_commits {
            report.commit.absorb(ctx.commit(&batched));
        }

        debug!(
            "Pipeline finished over {}: {} stages, {} edits, {} chunks committed, {} failed",
            ctx.area(),
            report.stages_run,
            report.edits_produced,
            report.commit.chunks_committed,
            report.commit.chunks_failed.len()
        );
        Ok(report)
    }

    /// Stage ids in execution order.
    #[must_use]
    pub fn stage_order(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.id()).collect()
    }

    /// Union of every stage's provides.
    #[must_use]
    pub fn all_provides(&self) -> BTreeSet<String> {
        self.stages.iter().flat_map(|s| s.provides()).collect()
    }

    /// Requirements not satisfied by an earlier stage of this pipeline.
    #[must_use]
    pub fn all_requires(&self) -> BTreeSet<String> {
        let mut provided = BTreeSet::new();
        let mut external = BTreeSet::new();
        for stage in &self.stages {
            external.extend(stage.requires().difference(&provided).cloned());
            provided.extend(stage.provides());
        }
        external
    }
}
