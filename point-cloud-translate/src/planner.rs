/// Job planning: input inspection, output path derivation and the
/// construction of one independent tile job per work item.
use crate::bounds::PointCloudBounds;
use crate::config::OutputFormat;
use crate::constants::VPC_EXTENSION;
use crate::error::PlanError;
use crate::job::{TileJob, TileMode};
use crate::vpc::VirtualPointCloud;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// The full set of work derived from one invocation.
/// `jobs` and `manifest_outputs` are index-aligned for manifest inputs;
/// for single-file inputs `manifest_outputs` is empty. Both sequences are
/// fully populated before any execution starts, so nothing is appended
/// concurrently later.
#[derive(Debug)]
pub struct TranslationPlan {
    pub jobs: Vec<TileJob>,
    /// Output tracking sequence, in source manifest order
    pub manifest_outputs: Vec<PathBuf>,
    /// Tile output subdirectory; a precondition created by `prepare`
    pub output_dir: Option<PathBuf>,
    /// Destination manifest path for manifest inputs
    pub manifest_output: Option<PathBuf>,
}

impl TranslationPlan {
    /// Create the tile output directory. Idempotent; a pre-existing
    /// directory is not an error. Planning itself never touches the
    /// filesystem beyond reading the input manifest.
    pub fn prepare(&self) -> io::Result<()> {
        if let Some(dir) = &self.output_dir {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// True when this run rebuilds a manifest over its outputs
    pub fn writes_manifest(&self) -> bool {
        self.manifest_output.is_some()
    }
}

/// Inspects the input path and produces the plan for a run
pub struct JobPlanner;

impl JobPlanner {
    /// Derive the job set for an input/output pair.
    ///
    /// A `.vpc` input requires a `.vpc` output; each referenced tile
    /// becomes one job writing into `parent(output)/stem(output)/`, named
    /// after the tile's stem with the requested format's extension. Any
    /// other input produces exactly one single-file job.
    pub fn plan(
        input: &Path,
        output: &Path,
        format: OutputFormat,
        filter: Option<&str>,
    ) -> Result<TranslationPlan, PlanError> {
        if !has_manifest_extension(input) {
            let job = TileJob::new(
                TileMode::Single,
                input.to_path_buf(),
                output.to_path_buf(),
                filter.map(str::to_string),
            );
            return Ok(TranslationPlan {
                jobs: vec![job],
                manifest_outputs: Vec::new(),
                output_dir: None,
                manifest_output: None,
            });
        }

        if !has_manifest_extension(output) {
            return Err(PlanError::FormatMismatch {
                output: output.to_path_buf(),
            });
        }

        // For /tmp/hello.vpc all tile outputs land in /tmp/hello/.
        let parent = output.parent().unwrap_or(Path::new("."));
        let stem = output.file_stem().unwrap_or_default();
        let output_dir = parent.join(stem);

        let vpc = VirtualPointCloud::read(input)?;
        if vpc.is_empty() {
            return Err(PlanError::EmptyManifest {
                path: input.to_path_buf(),
            });
        }

        let mut jobs = Vec::with_capacity(vpc.len());
        let mut manifest_outputs = Vec::with_capacity(vpc.len());
        let mut seen = HashSet::new();

        for tile in &vpc.files {
            let tile_stem = tile.path.file_stem().unwrap_or_default();
            let output_file = output_dir.join(format!(
                "{}.{}",
                tile_stem.to_string_lossy(),
                format.extension()
            ));

            if !seen.insert(output_file.clone()) {
                warn!(
                    "tiles with colliding stems map to the same output: {}",
                    output_file.display()
                );
            }

            let mut job = TileJob::new(
                TileMode::FileBased,
                tile.path.clone(),
                output_file.clone(),
                filter.map(str::to_string),
            );
            job.bounds_hint = tile.bbox.map(PointCloudBounds::from_bbox);

            jobs.push(job);
            manifest_outputs.push(output_file);
        }

        Ok(TranslationPlan {
            jobs,
            manifest_outputs,
            output_dir: Some(output_dir),
            manifest_output: Some(output.to_path_buf()),
        })
    }
}

fn has_manifest_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(VPC_EXTENSION))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_manifest(dir: &Path, name: &str, hrefs: &[&str]) -> PathBuf {
        let features: Vec<String> = hrefs
            .iter()
            .map(|href| {
                format!(
                    r#"{{"type": "Feature", "assets": {{"data": {{"href": "{href}"}}}}, "properties": {{}}}}"#
                )
            })
            .collect();
        let manifest = format!(
            r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
            features.join(",")
        );
        let path = dir.join(name);
        fs::write(&path, manifest).unwrap();
        path
    }

    #[test]
    fn test_single_file_input_plans_one_job() {
        let plan = JobPlanner::plan(
            Path::new("/data/a.las"),
            Path::new("/out/a.laz"),
            OutputFormat::Laz,
            None,
        )
        .unwrap();

        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.jobs[0].mode, TileMode::Single);
        assert_eq!(plan.jobs[0].input(), Path::new("/data/a.las"));
        assert_eq!(plan.jobs[0].output_file, Path::new("/out/a.laz"));
        assert!(plan.manifest_outputs.is_empty());
        assert!(plan.output_dir.is_none());
        assert!(!plan.writes_manifest());
    }

    #[test]
    fn test_manifest_input_plans_aligned_jobs_in_order() {
        let dir = TempDir::new().unwrap();
        let input = write_manifest(dir.path(), "set.vpc", &["/data/t1.las", "/data/t2.las"]);
        let output = dir.path().join("out").join("set.vpc");

        let plan = JobPlanner::plan(&input, &output, OutputFormat::Las, None).unwrap();

        assert_eq!(plan.jobs.len(), 2);
        assert_eq!(plan.manifest_outputs.len(), 2);

        let expected_dir = dir.path().join("out").join("set");
        assert_eq!(plan.output_dir.as_deref(), Some(expected_dir.as_path()));
        assert_eq!(plan.manifest_output.as_deref(), Some(output.as_path()));

        for (job, tracked) in plan.jobs.iter().zip(&plan.manifest_outputs) {
            assert_eq!(job.mode, TileMode::FileBased);
            assert_eq!(&job.output_file, tracked);
        }
        assert_eq!(plan.manifest_outputs[0], expected_dir.join("t1.las"));
        assert_eq!(plan.manifest_outputs[1], expected_dir.join("t2.las"));
    }

    #[test]
    fn test_planning_does_not_create_directories() {
        let dir = TempDir::new().unwrap();
        let input = write_manifest(dir.path(), "set.vpc", &["/data/t1.las"]);
        let output = dir.path().join("out").join("set.vpc");

        let plan = JobPlanner::plan(&input, &output, OutputFormat::Las, None).unwrap();
        let tile_dir = plan.output_dir.clone().unwrap();
        assert!(!tile_dir.exists());

        fs::create_dir_all(output.parent().unwrap()).unwrap();
        plan.prepare().unwrap();
        assert!(tile_dir.is_dir());

        // Running prepare again must not fail.
        plan.prepare().unwrap();
    }

    #[test]
    fn test_manifest_input_with_plain_output_is_a_mismatch() {
        let dir = TempDir::new().unwrap();
        let input = write_manifest(dir.path(), "set.vpc", &["/data/t1.las"]);
        let output = dir.path().join("result.las");

        let result = JobPlanner::plan(&input, &output, OutputFormat::Las, None);
        assert!(matches!(result, Err(PlanError::FormatMismatch { .. })));

        // Nothing was created on disk.
        assert!(!dir.path().join("result").exists());
    }

    #[test]
    fn test_unreadable_manifest_fails_planning() {
        let result = JobPlanner::plan(
            Path::new("/does/not/exist.vpc"),
            Path::new("/out/set.vpc"),
            OutputFormat::Las,
            None,
        );
        assert!(matches!(result, Err(PlanError::ManifestRead(_))));
    }

    #[test]
    fn test_empty_manifest_fails_planning() {
        let dir = TempDir::new().unwrap();
        let input = write_manifest(dir.path(), "empty.vpc", &[]);

        let result = JobPlanner::plan(
            &input,
            &dir.path().join("out.vpc"),
            OutputFormat::Las,
            None,
        );
        assert!(matches!(result, Err(PlanError::EmptyManifest { .. })));
    }

    #[test]
    fn test_colliding_stems_map_to_the_same_output() {
        let dir = TempDir::new().unwrap();
        let input = write_manifest(dir.path(), "set.vpc", &["/a/tile.las", "/b/tile.laz"]);
        let output = dir.path().join("set_out.vpc");

        let plan = JobPlanner::plan(&input, &output, OutputFormat::Las, None).unwrap();

        // Documented behaviour: both tiles resolve to one output path.
        assert_eq!(plan.manifest_outputs[0], plan.manifest_outputs[1]);
    }

    #[test]
    fn test_filter_is_shared_across_all_jobs() {
        let dir = TempDir::new().unwrap();
        let input = write_manifest(dir.path(), "set.vpc", &["/data/t1.las", "/data/t2.las"]);
        let output = dir.path().join("set.out.vpc");

        let plan =
            JobPlanner::plan(&input, &output, OutputFormat::Las, Some("Classification == 2"))
                .unwrap();

        for job in &plan.jobs {
            assert_eq!(job.filter_expression.as_deref(), Some("Classification == 2"));
        }
    }
}
