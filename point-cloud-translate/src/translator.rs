/// Top level orchestration of a translation run:
/// validate, plan, prepare, execute, finalize.
use crate::config::TranslateConfig;
use crate::engine::{LasPipelineEngine, PipelineEngine};
use crate::error::{EngineError, TranslateError};
use crate::executor::{PipelineExecutor, TileOutcome};
use crate::job::TileJob;
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::planner::JobPlanner;
use crate::vpc::VirtualPointCloud;
use std::path::{Path, PathBuf};
use tracing::info;

/// Aggregated results of one run
#[derive(Debug, Default)]
pub struct TranslationSummary {
    pub tiles_completed: usize,
    pub tiles_failed: usize,
    pub tiles_skipped: usize,
    pub points_read: u64,
    pub points_written: u64,
    /// Output manifest path, when one was written
    pub manifest: Option<PathBuf>,
}

impl std::fmt::Display for TranslationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Completed: {}, Failed: {}, Skipped: {}, Points: {} read / {} written",
            self.tiles_completed,
            self.tiles_failed,
            self.tiles_skipped,
            self.points_read,
            self.points_written
        )
    }
}

/// Coordinates planning, pipeline construction, execution and manifest
/// reconstruction for one configuration.
pub struct PointCloudTranslator {
    config: TranslateConfig,
    engine: Box<dyn PipelineEngine>,
}

impl PointCloudTranslator {
    /// Create a translator backed by the LAS execution engine
    pub fn new(config: TranslateConfig) -> Self {
        Self::with_engine(config, Box::new(LasPipelineEngine::new()))
    }

    /// Create a translator with a custom execution engine
    pub fn with_engine(config: TranslateConfig, engine: Box<dyn PipelineEngine>) -> Self {
        Self { config, engine }
    }

    /// Run the full translation
    pub fn translate(&self) -> Result<TranslationSummary, TranslateError> {
        let format = self.config.validate()?;

        let plan = JobPlanner::plan(
            &self.config.input,
            &self.config.output,
            format,
            self.config.filter.as_deref(),
        )?;
        info!("planned {} tile job(s)", plan.jobs.len());

        plan.prepare().map_err(|source| TranslateError::Prepare {
            path: plan.output_dir.clone().unwrap_or_default(),
            source,
        })?;

        let work: Vec<(TileJob, Pipeline)> = plan
            .jobs
            .iter()
            .map(|job| {
                let pipeline = PipelineBuilder::build(
                    job,
                    self.config.assign_crs.as_deref(),
                    self.config.transform_crs.as_deref(),
                );
                (job.clone(), pipeline)
            })
            .collect();

        let executor = PipelineExecutor::new(self.engine.as_ref(), self.config.keep_going);
        let outcomes = executor.run(&work);

        let mut summary = TranslationSummary::default();
        let mut failures: Vec<(PathBuf, EngineError)> = Vec::new();
        let mut successful_outputs: Vec<PathBuf> = Vec::new();

        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                TileOutcome::Completed(stats) => {
                    summary.tiles_completed += 1;
                    summary.points_read += stats.points_read;
                    summary.points_written += stats.points_written;
                    if let Some(output) = plan.manifest_outputs.get(index) {
                        successful_outputs.push(output.clone());
                    }
                }
                TileOutcome::Skipped => summary.tiles_skipped += 1,
                TileOutcome::Failed { input, error } => {
                    summary.tiles_failed += 1;
                    failures.push((input, error));
                }
            }
        }

        if !failures.is_empty() {
            if !self.config.keep_going {
                let (input, source) = failures.remove(0);
                return Err(TranslateError::Tile { input, source });
            }

            // Keep-going: the manifest still covers the tiles that made it,
            // in planning order, before the aggregate failure is reported.
            if let Some(manifest_output) = plan.manifest_output.as_deref() {
                if !successful_outputs.is_empty() {
                    write_manifest(&successful_outputs, manifest_output)?;
                }
            }
            return Err(TranslateError::TilesFailed { failures });
        }

        if let Some(manifest_output) = plan.manifest_output.as_deref() {
            write_manifest(&plan.manifest_outputs, manifest_output)?;
            summary.manifest = Some(manifest_output.to_path_buf());
        }

        Ok(summary)
    }
}

/// Build a new manifest over the translated outputs
fn write_manifest(outputs: &[PathBuf], dest: &Path) -> Result<(), TranslateError> {
    let vpc =
        VirtualPointCloud::build_from_files(outputs).map_err(TranslateError::ManifestWrite)?;
    vpc.write(dest).map_err(TranslateError::ManifestWrite)?;
    info!("wrote output manifest {}", dest.display());
    Ok(())
}
