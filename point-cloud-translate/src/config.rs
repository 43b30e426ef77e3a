/// Run configuration and validation
use crate::error::ConfigError;
use std::path::PathBuf;

/// Output encodings the writer can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Uncompressed LAS
    Las,
    /// LASzip compressed
    Laz,
}

impl OutputFormat {
    /// Parse a format name as given on the command line
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "las" => Ok(OutputFormat::Las),
            "laz" => Ok(OutputFormat::Laz),
            _ => Err(ConfigError::UnsupportedFormat {
                format: name.to_string(),
            }),
        }
    }

    /// File extension written for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Las => "las",
            OutputFormat::Laz => "laz",
        }
    }
}

/// Configuration for one translation run, read-only once validated
#[derive(Debug, Clone)]
pub struct TranslateConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Requested output format name; uncompressed when unset
    pub output_format: Option<String>,
    /// CRS assigned to the data without reprojection
    pub assign_crs: Option<String>,
    /// CRS the data is reprojected into
    pub transform_crs: Option<String>,
    /// Row filter predicate passed through to the engine verbatim
    pub filter: Option<String>,
    /// Worker pool override, applied once at process start; hardware
    /// parallelism when unset
    pub threads: Option<usize>,
    /// Run every tile and report failures together instead of failing fast
    pub keep_going: bool,
}

impl TranslateConfig {
    pub fn new(input: PathBuf, output: PathBuf) -> Self {
        Self {
            input,
            output,
            output_format: None,
            assign_crs: None,
            transform_crs: None,
            filter: None,
            threads: None,
            keep_going: false,
        }
    }

    /// Validate the configuration and resolve the output format.
    /// Fails before any work is attempted.
    pub fn validate(&self) -> Result<OutputFormat, ConfigError> {
        if self.output.as_os_str().is_empty() {
            return Err(ConfigError::MissingOutput);
        }

        match &self.output_format {
            Some(name) => OutputFormat::parse(name),
            None => Ok(OutputFormat::Las),
        }
    }
}
