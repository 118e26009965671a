use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::engine::MediaEngine;
use crate::error::{Error, Result};
use crate::scan;

/// Joins `inputs`, in order, into `output` without re-encoding.
///
/// The concat manifest lives in a temporary file that is removed on every
/// exit path.
pub fn combine(engine: &dyn MediaEngine, inputs: &[PathBuf], output: &Path) -> Result<()> {
    if inputs.is_empty() {
        return Err(Error::InvalidArgument("nothing to combine".to_string()));
    }

    let cwd = std::env::current_dir()?;
    let manifest = tempfile::Builder::new()
        .prefix("dashstitch-concat-")
        .suffix(".txt")
        .tempfile()?;
    {
        let mut writer = BufWriter::new(manifest.as_file());
        for input in inputs {
            writeln!(writer, "{}", manifest_line(&cwd, input)?)?;
        }
        writer.flush()?;
    }

    tracing::info!(
        inputs = inputs.len(),
        output = %output.display(),
        manifest = %manifest.path().display(),
        "combining clips"
    );
    let result = engine.concat(manifest.path(), output);

    let manifest_path = manifest.path().to_path_buf();
    if let Err(err) = manifest.close() {
        tracing::warn!(manifest = %manifest_path.display(), error = %err, "cannot remove concat manifest");
    }

    result.map_err(|err| Error::Concat {
        output: output.to_path_buf(),
        source: Box::new(err),
    })
}

/// Combines every video in `src`, see [`concat_order`], into `output`.
pub fn combine_directory(engine: &dyn MediaEngine, src: &Path, output: &Path) -> Result<Vec<PathBuf>> {
    let inputs: Vec<PathBuf> = scan::list_videos(src)?
        .into_iter()
        .filter(|p| !same_file(p, output))
        .collect();
    let inputs = concat_order(inputs);
    combine(engine, &inputs, output)?;
    Ok(inputs)
}

/// Stitched outputs (`output_<id>.*`) first, by numeric id; anything else after, by name.
pub fn concat_order(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort_by(|a, b| {
        let key = |p: &Path| (stitched_id(p).map_or(1u8, |_| 0u8), stitched_id(p));
        key(a.as_path())
            .cmp(&key(b.as_path()))
            .then_with(|| a.file_name().cmp(&b.file_name()))
    });
    paths
}

fn stitched_id(path: &Path) -> Option<u32> {
    let digits = path.file_stem()?.to_str()?.strip_prefix("output_")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// The concat demuxer reads its list as UTF-8, so other paths are refused.
fn manifest_line(cwd: &Path, input: &Path) -> Result<String> {
    let absolute = if input.is_absolute() {
        input.to_path_buf()
    } else {
        cwd.join(input)
    };
    let text = absolute.to_str().ok_or_else(|| {
        Error::InvalidArgument(format!(
            "cannot list {} for concat: path is not valid UTF-8",
            absolute.display()
        ))
    })?;
    Ok(format!("file '{}'", text.replace('\'', r"'\''")))
}
