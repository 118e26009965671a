//! `MediaEngine` backed by the ffmpeg command line tool.

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::engine::{ComposeRequest, MediaEngine};
use crate::error::{Error, Result};

/// Front (input 0) on the left, internal (1) stacked over rear (2) on the right,
/// normalized audio from the front camera only.
pub const STITCH_FILTER_GRAPH: &str =
    "[1:v][2:v]vstack=inputs=2[right];[0:v][right]hstack=inputs=2[v];[0:a]loudnorm[a]";

#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill any single ffmpeg run that takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn ensure_available(&self) -> Result<()> {
        let out = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .map_err(|err| {
                Error::InvalidArgument(format!(
                    "cannot run {}: {err}",
                    self.program.display()
                ))
            })?;
        if !out.status.success() {
            return Err(Error::EngineFailed {
                program: self.program_name(),
                status: out.status.code(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    pub fn compose_args(request: &ComposeRequest<'_>) -> Vec<OsString> {
        let mut args: Vec<OsString> = common_args();
        for input in [request.front, request.internal, request.rear] {
            args.push("-i".into());
            args.push(input.into());
        }
        args.extend(
            [
                "-filter_complex",
                STITCH_FILTER_GRAPH,
                "-map",
                "[v]",
                "-map",
                "[a]",
            ]
            .map(OsString::from),
        );
        args.push(request.output.into());
        args
    }

    pub fn concat_args(manifest: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = common_args();
        args.extend(["-f", "concat", "-safe", "0", "-i"].map(OsString::from));
        args.push(manifest.into());
        args.extend(["-c", "copy"].map(OsString::from));
        args.push(output.into());
        args
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    fn run(&self, args: Vec<OsString>) -> Result<()> {
        tracing::debug!(program = %self.program.display(), ?args, "spawning");
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // ffmpeg stalls once the stderr pipe is full.
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                buf
            })
        });

        let status = match self.timeout {
            None => child.wait()?,
            Some(limit) => match child.wait_timeout(limit)? {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::EngineTimeout {
                        program: self.program_name(),
                        after: limit,
                    });
                }
            },
        };

        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(Error::EngineFailed {
                program: self.program_name(),
                status: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

fn common_args() -> Vec<OsString> {
    ["-hide_banner", "-loglevel", "error", "-y"]
        .into_iter()
        .map(OsString::from)
        .collect()
}

impl MediaEngine for FfmpegEngine {
    fn compose(&self, request: &ComposeRequest<'_>) -> Result<()> {
        self.run(Self::compose_args(request))
    }

    fn concat(&self, manifest: &Path, output: &Path) -> Result<()> {
        self.run(Self::concat_args(manifest, output))
    }
}
