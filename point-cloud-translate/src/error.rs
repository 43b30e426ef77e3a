/// Error types for point cloud translation
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while validating the run configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No output path was provided
    #[error("missing output")]
    MissingOutput,

    /// The requested output format is not one of the supported set
    #[error("unknown output format: {format}")]
    UnsupportedFormat { format: String },
}

/// Errors raised while reading or writing virtual point cloud manifests
#[derive(Error, Debug)]
pub enum VpcError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed manifest {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid manifest {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    /// Reading a tile header while building a manifest failed
    #[error("failed to read tile header {path}: {source}")]
    TileHeader { path: PathBuf, source: las::Error },
}

/// Errors raised while planning the set of tile jobs
#[derive(Error, Debug)]
pub enum PlanError {
    /// A manifest input must produce a manifest output
    #[error("input is a virtual point cloud, output should be too: {output}")]
    FormatMismatch { output: PathBuf },

    #[error(transparent)]
    ManifestRead(#[from] VpcError),

    #[error("manifest {path} references no files")]
    EmptyManifest { path: PathBuf },
}

/// Errors raised inside the pipeline execution engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Las(#[from] las::Error),

    /// A CRS identifier could not be resolved to a projection
    #[error("invalid CRS {crs}: {message}")]
    InvalidCrs { crs: String, message: String },

    /// Reprojection was requested but the source CRS is unknown
    #[error("cannot reproject {input}: source CRS is unknown (pass --assign-crs)")]
    MissingSourceCrs { input: PathBuf },

    /// Coordinate transformation failed for a point
    #[error("reprojection failed: {message}")]
    Transform { message: String },

    /// The filter expression could not be parsed
    #[error("invalid filter expression: {0}")]
    Filter(String),

    /// The pipeline is missing a required stage
    #[error("malformed pipeline: {0}")]
    MalformedPipeline(String),
}

/// Top level error type for a translation run
#[derive(Error, Debug)]
pub enum TranslateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Creating the tile output directory failed
    #[error("failed to create output directory {path}: {source}")]
    Prepare {
        path: PathBuf,
        source: std::io::Error,
    },

    /// One tile failed and the run was aborted
    #[error("tile {input} failed: {source}")]
    Tile { input: PathBuf, source: EngineError },

    /// Multiple tiles failed while running with --keep-going
    #[error("{} tile(s) failed", .failures.len())]
    TilesFailed { failures: Vec<(PathBuf, EngineError)> },

    #[error("failed to write output manifest: {0}")]
    ManifestWrite(#[source] VpcError),
}
