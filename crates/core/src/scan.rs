use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::filename;
use crate::models::{FileGroup, VideoFileInfo};

pub const VIDEO_EXTENSION: &str = "mp4";

#[derive(Debug, Clone, Copy, Default)]
pub struct GroupOptions {
    /// Fail when a group does not hold exactly one file per camera position.
    pub require_complete: bool,
}

impl GroupOptions {
    pub fn strict() -> Self {
        Self {
            require_complete: true,
        }
    }
}

/// Video files directly inside `dir`, sorted by file name.
pub fn list_videos(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::InvalidArgument(format!(
            "not a directory: {}",
            dir.to_string_lossy()
        )));
    }

    let mut videos = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| match err.into_io_error() {
            Some(io) => Error::Io(io),
            None => Error::InvalidArgument(format!("cannot read {}", dir.display())),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if has_video_extension(entry.path()) {
            videos.push(entry.into_path());
        }
    }
    Ok(videos)
}

fn has_video_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(VIDEO_EXTENSION))
        .unwrap_or(false)
}

/// Discovers, parses and groups every video in `dir`.
///
/// A single unparseable file name aborts the whole scan.
pub fn group_directory(dir: &Path, options: GroupOptions) -> Result<Vec<FileGroup>> {
    let records = list_videos(dir)?
        .iter()
        .map(|path| filename::parse(path))
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(dir = %dir.display(), files = records.len(), "parsed video files");

    let groups = group_files(records);
    if options.require_complete {
        for group in &groups {
            group.cameras()?;
        }
    }
    tracing::info!(dir = %dir.display(), groups = groups.len(), "grouped recordings");
    Ok(groups)
}

/// Buckets records by group id, keeping first-seen order inside each bucket,
/// and returns the groups sorted by id.
pub fn group_files(records: impl IntoIterator<Item = VideoFileInfo>) -> Vec<FileGroup> {
    let mut order: Vec<u32> = Vec::new();
    let mut buckets: HashMap<u32, Vec<VideoFileInfo>> = HashMap::new();
    for rec in records {
        let id = rec.group_id;
        buckets
            .entry(id)
            .or_insert_with(|| {
                order.push(id);
                Vec::new()
            })
            .push(rec);
    }

    let mut groups: Vec<FileGroup> = order
        .into_iter()
        .filter_map(|id| buckets.remove(&id).and_then(|files| FileGroup::from_files(id, files)))
        .collect();
    groups.sort_by_key(|g| g.group_id);
    groups
}
