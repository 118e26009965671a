use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingType {
    Normal,
    Event,
    Parking,
}

impl RecordingType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "N" => Some(Self::Normal),
            "E" => Some(Self::Event),
            "P" => Some(Self::Parking),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Normal => "N",
            Self::Event => "E",
            Self::Parking => "P",
        }
    }
}

/// Camera mounting position. The filename codes are `A`, `B`, `C`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Front,
    Internal,
    Rear,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::Front, Position::Internal, Position::Rear];

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "A" => Some(Self::Front),
            "B" => Some(Self::Internal),
            "C" => Some(Self::Rear),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Front => "A",
            Self::Internal => "B",
            Self::Rear => "C",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Front => "Front",
            Self::Internal => "Internal",
            Self::Rear => "Rear",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoFileInfo {
    pub timestamp: NaiveDateTime,
    pub group_id: u32,
    pub recording_type: RecordingType,
    pub position: Position,
    pub file_path: PathBuf,
}

/// All files recorded by the cameras for one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileGroup {
    pub timestamp: NaiveDateTime,
    pub group_id: u32,
    pub files: Vec<VideoFileInfo>,
}

/// The three inputs of a stitch, one per position.
#[derive(Debug, Clone, Copy)]
pub struct CameraSet<'a> {
    pub front: &'a VideoFileInfo,
    pub internal: &'a VideoFileInfo,
    pub rear: &'a VideoFileInfo,
}

impl FileGroup {
    /// Builds a group from its members in discovery order. Returns `None` for an empty list.
    pub fn from_files(group_id: u32, files: Vec<VideoFileInfo>) -> Option<Self> {
        let timestamp = files.first()?.timestamp;
        Some(Self {
            timestamp,
            group_id,
            files,
        })
    }

    /// Returns the single file recorded at `position`.
    ///
    /// Zero matches is `MissingPosition`, more than one is `DuplicatePosition`.
    pub fn get_by_position(&self, position: Position) -> Result<&VideoFileInfo> {
        let mut matches = self.files.iter().filter(|f| f.position == position);
        let first = matches.next().ok_or(Error::MissingPosition {
            group_id: self.group_id,
            position,
        })?;
        let extra = matches.count();
        if extra > 0 {
            return Err(Error::DuplicatePosition {
                group_id: self.group_id,
                position,
                count: extra + 1,
            });
        }
        Ok(first)
    }

    pub fn cameras(&self) -> Result<CameraSet<'_>> {
        Ok(CameraSet {
            front: self.get_by_position(Position::Front)?,
            internal: self.get_by_position(Position::Internal)?,
            rear: self.get_by_position(Position::Rear)?,
        })
    }
}

impl fmt::Display for FileGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} @ {} ({} files)",
            self.group_id,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.files.len()
        )
    }
}
