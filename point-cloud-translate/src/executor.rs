/// Parallel execution of prepared tile pipelines.
/// Tiles are mutually independent, so they run concurrently on the worker
/// pool; the returned outcome vector preserves job order regardless of
/// completion order.
use crate::engine::{PipelineEngine, TileStats};
use crate::error::EngineError;
use crate::job::TileJob;
use crate::pipeline::Pipeline;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Result of one tile execution
#[derive(Debug)]
pub enum TileOutcome {
    Completed(TileStats),
    /// Not started because an earlier tile failed in fail-fast mode
    Skipped,
    Failed { input: PathBuf, error: EngineError },
}

impl TileOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, TileOutcome::Failed { .. })
    }
}

/// Initialise the global worker pool.
/// Defaults to hardware parallelism when no override is given.
pub fn init_worker_pool(threads: Option<usize>) -> Result<(), rayon::ThreadPoolBuildError> {
    if let Some(threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }
    Ok(())
}

/// Runs pipelines across the worker pool with a chosen failure policy
pub struct PipelineExecutor<'a> {
    engine: &'a dyn PipelineEngine,
    keep_going: bool,
}

impl<'a> PipelineExecutor<'a> {
    pub fn new(engine: &'a dyn PipelineEngine, keep_going: bool) -> Self {
        Self { engine, keep_going }
    }

    /// Execute every prepared pipeline. Returns once all started tiles
    /// have completed; this is the synchronisation barrier finalisation
    /// relies on. In fail-fast mode the first failure stops tiles that
    /// have not started yet; started tiles always run to completion.
    pub fn run(&self, work: &[(TileJob, Pipeline)]) -> Vec<TileOutcome> {
        let pb = ProgressBar::new(work.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.green/blue}] {pos}/{len} tiles ({percent}%) {msg}")
                .unwrap()
                .progress_chars("█▉▊▋▌▍▎▏"),
        );
        pb.set_message("Translating tiles");

        let cancelled = AtomicBool::new(false);

        let outcomes: Vec<TileOutcome> = work
            .par_iter()
            .map(|(job, pipeline)| {
                if !self.keep_going && cancelled.load(Ordering::Relaxed) {
                    pb.inc(1);
                    return TileOutcome::Skipped;
                }

                match self.engine.execute(pipeline) {
                    Ok(stats) => {
                        pb.inc(1);
                        TileOutcome::Completed(stats)
                    }
                    Err(error) => {
                        cancelled.store(true, Ordering::Relaxed);
                        pb.inc(1);
                        TileOutcome::Failed {
                            input: job.input().clone(),
                            error,
                        }
                    }
                }
            })
            .collect();

        pb.finish_with_message("Tiles translated");
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::TileMode;
    use crate::pipeline::PipelineBuilder;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;

    struct MockEngine {
        fail_inputs: Vec<PathBuf>,
        executions: AtomicUsize,
    }

    impl MockEngine {
        fn failing_on(fail_inputs: &[&str]) -> Self {
            Self {
                fail_inputs: fail_inputs.iter().map(PathBuf::from).collect(),
                executions: AtomicUsize::new(0),
            }
        }
    }

    impl PipelineEngine for MockEngine {
        fn execute(&self, pipeline: &Pipeline) -> Result<TileStats, EngineError> {
            self.executions.fetch_add(1, Ordering::Relaxed);
            let input = &pipeline.reader().unwrap().input;
            if self.fail_inputs.contains(input) {
                Err(EngineError::Filter(format!("mock failure for {input:?}")))
            } else {
                Ok(TileStats {
                    points_read: 10,
                    points_written: 10,
                })
            }
        }
    }

    fn work_for(inputs: &[&str]) -> Vec<(TileJob, Pipeline)> {
        inputs
            .iter()
            .map(|input| {
                let job = TileJob::new(
                    TileMode::FileBased,
                    Path::new(input).to_path_buf(),
                    Path::new("/out").join(Path::new(input).file_name().unwrap()),
                    None,
                );
                let pipeline = PipelineBuilder::build(&job, None, None);
                (job, pipeline)
            })
            .collect()
    }

    #[test]
    fn test_all_tiles_complete_in_job_order() {
        let engine = MockEngine::failing_on(&[]);
        let work = work_for(&["/a/t1.las", "/a/t2.las", "/a/t3.las"]);

        let outcomes = PipelineExecutor::new(&engine, false).run(&work);

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, TileOutcome::Completed(_))));
        assert_eq!(engine.executions.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_keep_going_runs_everything_and_collects_failures() {
        let engine = MockEngine::failing_on(&["/a/t2.las", "/a/t4.las"]);
        let work = work_for(&["/a/t1.las", "/a/t2.las", "/a/t3.las", "/a/t4.las"]);

        let outcomes = PipelineExecutor::new(&engine, true).run(&work);

        assert_eq!(engine.executions.load(Ordering::Relaxed), 4);
        assert!(matches!(outcomes[0], TileOutcome::Completed(_)));
        assert!(outcomes[1].is_failed());
        assert!(matches!(outcomes[2], TileOutcome::Completed(_)));
        assert!(outcomes[3].is_failed());

        // Failed outcomes keep the tile's input path for reporting.
        if let TileOutcome::Failed { input, .. } = &outcomes[1] {
            assert_eq!(input, Path::new("/a/t2.las"));
        }
    }

    #[test]
    fn test_fail_fast_reports_the_failure() {
        let engine = MockEngine::failing_on(&["/a/t1.las"]);
        let work = work_for(&["/a/t1.las", "/a/t2.las", "/a/t3.las"]);

        let outcomes = PipelineExecutor::new(&engine, false).run(&work);

        // The failing tile is reported; the rest either finished before the
        // cancellation flag was observed or were skipped, never lost.
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes.iter().filter(|o| o.is_failed()).count(), 1);
        assert!(outcomes[0].is_failed());
    }
}
