use std::collections::VecDeque;
use std::io;
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crossbeam_channel::Receiver;
use rayon::ThreadPool;

use crate::engine::{ComposeRequest, MediaEngine};
use crate::error::{Error, Result};
use crate::models::FileGroup;
use crate::scan::VIDEO_EXTENSION;

pub const DEFAULT_PARALLELISM: usize = 2;

#[derive(Debug, Clone)]
pub struct StitchConfig {
    pub output_dir: PathBuf,
    pub max_parallel: usize,
    pub extension: String,
    pub cancel: Option<StitchCancelToken>,
}

impl StitchConfig {
    pub fn for_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_parallel: DEFAULT_PARALLELISM,
            extension: VIDEO_EXTENSION.to_string(),
            cancel: None,
        }
    }

    pub fn with_parallelism(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    pub fn output_path(&self, group_id: u32) -> PathBuf {
        self.output_dir
            .join(format!("output_{group_id}.{}", self.extension))
    }
}

/// Stops jobs that have not started yet. Jobs already running are left alone.
#[derive(Clone, Debug, Default)]
pub struct StitchCancelToken {
    cancelled: Arc<AtomicBool>,
}

impl StitchCancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Creates `dir` if needed. Safe to race with other workers doing the same.
pub fn ensure_output_dir(dir: &Path) -> io::Result<()> {
    match std::fs::create_dir_all(dir) {
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        other => other,
    }
}

/// Composes one recording event into `output_{group_id}.<ext>`.
pub fn stitch_group(
    engine: &dyn MediaEngine,
    group: &FileGroup,
    config: &StitchConfig,
) -> Result<PathBuf> {
    let cameras = group.cameras()?;
    let group_id = group.group_id;
    let wrap = |err: Error| Error::Stitch {
        group_id,
        source: Box::new(err),
    };

    ensure_output_dir(&config.output_dir).map_err(|err| wrap(err.into()))?;
    let output = config.output_path(group_id);

    tracing::info!(group_id, output = %output.display(), "stitching group");
    let request = ComposeRequest::new(group_id, &cameras, &output);
    if let Err(err) = engine.compose(&request) {
        remove_partial_output(&output);
        return Err(wrap(err));
    }
    tracing::info!(group_id, output = %output.display(), "stitched group");
    Ok(output)
}

fn remove_partial_output(output: &Path) {
    match std::fs::remove_file(output) {
        Ok(()) => tracing::debug!(output = %output.display(), "removed partial output"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(output = %output.display(), error = %err, "cannot remove partial output")
        }
    }
}

#[derive(Debug, Clone)]
pub struct StitchedGroup {
    pub group: FileGroup,
    pub output: PathBuf,
}

/// Submits every group to a pool of `config.max_parallel` workers.
///
/// The returned iterator yields in submission order, whatever order the jobs
/// finish in. It ends after the first error; jobs still queued or running keep
/// going in the background and their results are dropped.
pub fn stitch_all(
    engine: Arc<dyn MediaEngine>,
    groups: Vec<FileGroup>,
    config: &StitchConfig,
) -> Result<StitchResults> {
    if config.max_parallel == 0 {
        return Err(Error::InvalidArgument(
            "parallelism must be at least 1".to_string(),
        ));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.max_parallel)
        .thread_name(|i| format!("stitch-{i}"))
        .panic_handler(|_| tracing::error!("stitch worker panicked"))
        .build()?;

    tracing::info!(
        groups = groups.len(),
        workers = config.max_parallel,
        output_dir = %config.output_dir.display(),
        "submitting stitch jobs"
    );

    let config = Arc::new(config.clone());
    let mut pending = VecDeque::with_capacity(groups.len());
    for group in groups {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let engine = Arc::clone(&engine);
        let config = Arc::clone(&config);
        let job = group.clone();
        pool.spawn_fifo(move || {
            let cancelled = config
                .cancel
                .as_ref()
                .is_some_and(StitchCancelToken::is_cancelled);
            let result = if cancelled {
                Err(Error::Cancelled)
            } else {
                stitch_group(engine.as_ref(), &job, &config)
            };
            // The receiver is gone once the consumer has stopped.
            let _ = tx.send(result);
        });
        pending.push_back((group, rx));
    }

    Ok(StitchResults {
        pending,
        done: false,
        _pool: pool,
    })
}

/// Lazy, single-pass results of [`stitch_all`].
pub struct StitchResults {
    pending: VecDeque<(FileGroup, Receiver<Result<PathBuf>>)>,
    done: bool,
    // Dropping the pool lets outstanding jobs finish before its threads exit.
    _pool: ThreadPool,
}

impl StitchResults {
    /// Groups not yet yielded.
    pub fn remaining(&self) -> usize {
        if self.done {
            0
        } else {
            self.pending.len()
        }
    }
}

impl Iterator for StitchResults {
    type Item = Result<StitchedGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let (group, rx) = self.pending.pop_front()?;
        let outcome = rx.recv().unwrap_or_else(|_| {
            Err(Error::Stitch {
                group_id: group.group_id,
                source: Box::new(Error::WorkerPanicked),
            })
        });

        match outcome {
            Ok(output) => Some(Ok(StitchedGroup { group, output })),
            Err(err) => {
                tracing::error!(group = %group, error = %err, "stitching failed, stopping");
                self.done = true;
                self.pending.clear();
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

impl FusedIterator for StitchResults {}
