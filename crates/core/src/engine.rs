use std::path::Path;

use crate::error::Result;
use crate::models::CameraSet;

/// Inputs and destination of one composite encode.
#[derive(Debug, Clone, Copy)]
pub struct ComposeRequest<'a> {
    pub group_id: u32,
    pub front: &'a Path,
    pub internal: &'a Path,
    pub rear: &'a Path,
    pub output: &'a Path,
}

impl<'a> ComposeRequest<'a> {
    pub fn new(group_id: u32, cameras: &CameraSet<'a>, output: &'a Path) -> Self {
        Self {
            group_id,
            front: &cameras.front.file_path,
            internal: &cameras.internal.file_path,
            rear: &cameras.rear.file_path,
            output,
        }
    }
}

/// The external media processor.
///
/// `compose` places front on the left and stacks internal over rear on the
/// right, keeps only the front audio with loudness normalization, and encodes
/// the result to `output`, replacing any existing file. `concat` joins the
/// files listed in a concat manifest without re-encoding.
pub trait MediaEngine: Send + Sync {
    fn compose(&self, request: &ComposeRequest<'_>) -> Result<()>;

    fn concat(&self, manifest: &Path, output: &Path) -> Result<()>;
}
