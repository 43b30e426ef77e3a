/// Tile job descriptors produced by planning
use crate::bounds::PointCloudBounds;
use std::path::PathBuf;

/// How a job relates to the dataset it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileMode {
    /// One whole file converted to one output, no tiling context
    Single,
    /// One tile extracted from a virtual point cloud manifest
    FileBased,
}

/// One independent unit of translation work.
/// Jobs are created during planning and never mutated once a pipeline
/// has been built from them.
#[derive(Debug, Clone)]
pub struct TileJob {
    pub mode: TileMode,
    /// Ordered source files; a single entry today, more for future merges
    pub input_files: Vec<PathBuf>,
    /// Destination path, fully resolved before the job is handed on
    pub output_file: PathBuf,
    /// Row filter predicate shared verbatim across all jobs of one run
    pub filter_expression: Option<String>,
    /// Spatial bound reserved for future spatial tiling
    pub bounds_hint: Option<PointCloudBounds>,
}

impl TileJob {
    /// Create a job reading one input and writing one output
    pub fn new(
        mode: TileMode,
        input: PathBuf,
        output: PathBuf,
        filter_expression: Option<String>,
    ) -> Self {
        Self {
            mode,
            input_files: vec![input],
            output_file: output,
            filter_expression,
            bounds_hint: None,
        }
    }

    /// Primary input of this job
    pub fn input(&self) -> &PathBuf {
        &self.input_files[0]
    }
}
