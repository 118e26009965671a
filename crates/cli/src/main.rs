use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dashstitch_core::concat::{combine, combine_directory};
use dashstitch_core::ffmpeg::FfmpegEngine;
use dashstitch_core::scan::{group_directory, GroupOptions};
use dashstitch_core::stitch::{stitch_all, StitchConfig, DEFAULT_PARALLELISM};
use dashstitch_core::Error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dashstitch",
    version,
    about = "Stitch multi-camera dashcam recordings into one video per event"
)]
struct Cli {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// ffmpeg binary to run
    #[arg(long, global = true, env = "DASHSTITCH_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose front, internal and rear clips of each recording into output_<id>.mp4
    Stitch {
        /// Number of parallel ffmpeg processes to run.
        #[arg(short, long, default_value_t = DEFAULT_PARALLELISM)]
        parallelism: usize,

        /// Directory holding the camera clips.
        #[arg(short, long)]
        src: PathBuf,

        /// Directory for the stitched outputs.
        #[arg(short, long)]
        dst: PathBuf,

        /// Also concatenate the stitched outputs, in group order, into this file.
        #[arg(long)]
        combine: Option<PathBuf>,

        /// Keep groups that lack a camera; they fail when their turn comes.
        #[arg(long, default_value_t = false)]
        allow_incomplete: bool,

        /// Kill any single ffmpeg run after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Concatenate every video in a directory into one file
    Combine {
        /// Directory holding the videos to join.
        #[arg(short, long)]
        src: PathBuf,

        /// Directory receiving the combined file.
        #[arg(short, long)]
        dst: PathBuf,

        /// File name of the combined video.
        #[arg(long, default_value = "out.mp4")]
        name: String,
    },

    /// List the recordings found in a directory without stitching
    Groups {
        #[arg(short, long)]
        src: PathBuf,

        /// Print JSON instead of one line per group.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() {
    if let Err(err) = real_main() {
        eprintln!("error: {err:#}");
        std::process::exit(2);
    }
}

fn real_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Commands::Stitch {
            parallelism,
            src,
            dst,
            combine: combined,
            allow_incomplete,
            timeout_secs,
        } => {
            validate_source(&src)?;
            reject_source_as_destination(&src, &dst)?;
            ensure_destination(&dst)?;

            let options = if allow_incomplete {
                GroupOptions::default()
            } else {
                GroupOptions::strict()
            };
            tracing::debug!(src = %src.display(), ?options, "scanning recordings");
            let groups = group_directory(&src, options)
                .with_context(|| format!("scanning {}", src.display()))?;
            if groups.is_empty() {
                println!("No recordings found in {}", src.display());
                return Ok(());
            }

            let engine = Arc::new(
                FfmpegEngine::new(&cli.ffmpeg).with_timeout(timeout_secs.map(Duration::from_secs)),
            );
            engine.ensure_available().context("ffmpeg not usable")?;

            let config = StitchConfig::for_output_dir(&dst).with_parallelism(parallelism);
            let mut outputs = Vec::with_capacity(groups.len());
            for result in stitch_all(engine.clone(), groups, &config)? {
                let stitched = result?;
                println!(
                    "Stitched group {}: {}",
                    stitched.group,
                    stitched.output.display()
                );
                outputs.push(stitched.output);
            }

            if let Some(target) = combined {
                if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                    ensure_destination(parent)?;
                }
                combine(engine.as_ref(), &outputs, &target)?;
                println!("Combined {} clips into {}", outputs.len(), target.display());
            }
        }

        Commands::Combine { src, dst, name } => {
            validate_source(&src)?;
            ensure_destination(&dst)?;

            let engine = FfmpegEngine::new(&cli.ffmpeg);
            engine.ensure_available().context("ffmpeg not usable")?;

            let target = dst.join(name);
            let inputs = combine_directory(&engine, &src, &target)?;
            println!("Combined {} clips into {}", inputs.len(), target.display());
        }

        Commands::Groups { src, json } => {
            validate_source(&src)?;
            let groups = group_directory(&src, GroupOptions::default())
                .with_context(|| format!("scanning {}", src.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else {
                for group in &groups {
                    let complete = if group.cameras().is_ok() {
                        "complete"
                    } else {
                        "incomplete"
                    };
                    println!("{group} {complete}");
                    for file in &group.files {
                        println!("  {:<8} {}", file.position.to_string(), file.file_path.display());
                    }
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn validate_source(src: &Path) -> Result<()> {
    if !src.exists() {
        return Err(Error::InvalidArgument(format!(
            "source path {} does not exist",
            src.display()
        ))
        .into());
    }
    if !src.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "source path {} is not a directory",
            src.display()
        ))
        .into());
    }
    Ok(())
}

/// Outputs written into the source directory would break the next scan.
fn reject_source_as_destination(src: &Path, dst: &Path) -> Result<()> {
    if !dst.exists() {
        return Ok(());
    }
    let src_real = src
        .canonicalize()
        .with_context(|| format!("resolving {}", src.display()))?;
    let dst_real = dst
        .canonicalize()
        .with_context(|| format!("resolving {}", dst.display()))?;
    if src_real == dst_real {
        return Err(Error::InvalidArgument(format!(
            "destination {} is the source directory",
            dst.display()
        ))
        .into());
    }
    Ok(())
}

fn ensure_destination(dst: &Path) -> Result<()> {
    if dst.exists() && !dst.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "destination path {} is not a directory",
            dst.display()
        ))
        .into());
    }
    std::fs::create_dir_all(dst).with_context(|| format!("creating {}", dst.display()))
}
