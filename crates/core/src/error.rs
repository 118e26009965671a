use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::models::Position;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("group {group_id}: position {position} missing")]
    MissingPosition { group_id: u32, position: Position },

    #[error("group {group_id}: position {position} appears {count} times")]
    DuplicatePosition {
        group_id: u32,
        position: Position,
        count: usize,
    },

    #[error("stitching group {group_id} failed")]
    Stitch {
        group_id: u32,
        #[source]
        source: Box<Error>,
    },

    #[error("combining into {} failed", .output.display())]
    Concat {
        output: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("{program} exited with {}: {stderr}", exit_label(.status))]
    EngineFailed {
        program: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("{program} did not finish within {after:?}")]
    EngineTimeout { program: String, after: Duration },

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("worker panicked before reporting a result")]
    WorkerPanicked,

    #[error("cancelled")]
    Cancelled,
}

fn exit_label(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}
