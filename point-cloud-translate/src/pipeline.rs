/// Declarative pipeline descriptions handed to the execution engine
use crate::job::TileJob;
use std::path::PathBuf;

/// Reader stage configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ReaderConfig {
    pub input: PathBuf,
    /// CRS assigned to the data as metadata, without resampling
    pub override_crs: Option<String>,
}

/// Reprojection stage configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ReprojectConfig {
    pub target_crs: String,
    /// Row predicate applied before reprojection
    pub where_expr: Option<String>,
}

/// Standalone filter stage configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConfig {
    pub where_expr: String,
}

/// Writer stage configuration
#[derive(Debug, Clone, PartialEq)]
pub struct WriterConfig {
    pub output: PathBuf,
    /// Forward existing header metadata and dimensions unchanged
    pub forward_metadata: bool,
    /// Row predicate applied to the writer's own row selection
    pub where_expr: Option<String>,
}

/// One step of a processing pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Reader(ReaderConfig),
    Reproject(ReprojectConfig),
    Filter(FilterConfig),
    Writer(WriterConfig),
}

/// An ordered stage sequence describing one conversion job.
/// Construction performs no I/O; execution is the engine's concern.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn reader(&self) -> Option<&ReaderConfig> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Reader(config) => Some(config),
            _ => None,
        })
    }

    pub fn reproject(&self) -> Option<&ReprojectConfig> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Reproject(config) => Some(config),
            _ => None,
        })
    }

    pub fn filter(&self) -> Option<&FilterConfig> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Filter(config) => Some(config),
            _ => None,
        })
    }

    pub fn writer(&self) -> Option<&WriterConfig> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Writer(config) => Some(config),
            _ => None,
        })
    }
}

/// Builds pipelines from tile jobs and the run's CRS options
pub struct PipelineBuilder;

impl PipelineBuilder {
    /// Construct the linear stage sequence for one job:
    /// read, optionally reproject, write. A filter expression is attached
    /// to the writer and, when reprojection is present, to the reprojection
    /// stage as well, so filtering happens before the reprojection cost and
    /// still bounds the writer's own row selection.
    pub fn build(
        job: &TileJob,
        assign_crs: Option<&str>,
        transform_crs: Option<&str>,
    ) -> Pipeline {
        let mut stages = Vec::with_capacity(3);

        stages.push(Stage::Reader(ReaderConfig {
            input: job.input().clone(),
            override_crs: assign_crs.map(str::to_string),
        }));

        if let Some(target) = transform_crs {
            stages.push(Stage::Reproject(ReprojectConfig {
                target_crs: target.to_string(),
                where_expr: job.filter_expression.clone(),
            }));
        }

        stages.push(Stage::Writer(WriterConfig {
            output: job.output_file.clone(),
            forward_metadata: true,
            where_expr: job.filter_expression.clone(),
        }));

        Pipeline::new(stages)
    }
}
