pub mod concat;
pub mod engine;
pub mod error;
pub mod ffmpeg;
pub mod filename;
pub mod models;
pub mod scan;
pub mod stitch;

pub use crate::engine::{ComposeRequest, MediaEngine};
pub use crate::error::{Error, Result};
pub use crate::models::*;
