//! Decoding of the dashcam naming scheme
//! `YYYYMMDD_HHMMSS_{group}_{N|E|P}_{A|B|C}.<ext>`.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{Error, Result};
use crate::models::{Position, RecordingType, VideoFileInfo};

const TOKEN_COUNT: usize = 5;

pub fn parse(path: &Path) -> Result<VideoFileInfo> {
    let fail = |reason: String| Error::Parse {
        path: path.to_path_buf(),
        reason,
    };

    let stem = path
        .file_stem()
        .ok_or_else(|| fail("no file name".to_string()))?
        .to_str()
        .ok_or_else(|| fail("file name is not valid UTF-8".to_string()))?;

    let tokens: Vec<&str> = stem.split('_').collect();
    let [date, time, group, kind, position] = tokens.as_slice() else {
        return Err(fail(format!(
            "expected {TOKEN_COUNT} '_'-separated fields, found {}",
            tokens.len()
        )));
    };

    let date = parse_date(date).ok_or_else(|| fail(format!("invalid date '{date}'")))?;
    let time = parse_time(time).ok_or_else(|| fail(format!("invalid time '{time}'")))?;
    let group_id = parse_group_id(group).ok_or_else(|| fail(format!("invalid group id '{group}'")))?;
    let recording_type = RecordingType::from_code(kind)
        .ok_or_else(|| fail(format!("unknown recording type '{kind}'")))?;
    let position = Position::from_code(position)
        .ok_or_else(|| fail(format!("unknown camera position '{position}'")))?;

    Ok(VideoFileInfo {
        timestamp: NaiveDateTime::new(date, time),
        group_id,
        recording_type,
        position,
        file_path: path.to_path_buf(),
    })
}

fn all_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if !all_digits(s, 8) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    if !all_digits(s, 6) {
        return None;
    }
    // chrono reads second 60 as a leap second; the cameras never write one.
    NaiveTime::parse_from_str(s, "%H%M%S")
        .ok()
        .filter(|t| t.nanosecond() < 1_000_000_000)
}

fn parse_group_id(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_reference_name() {
        let info = parse(Path::new("/videos/20240703_131044_0417_N_A.MP4")).unwrap();
        assert_eq!(
            (info.timestamp.year(), info.timestamp.month(), info.timestamp.day()),
            (2024, 7, 3)
        );
        assert_eq!(
            (info.timestamp.hour(), info.timestamp.minute(), info.timestamp.second()),
            (13, 10, 44)
        );
        assert_eq!(info.group_id, 417);
        assert_eq!(info.recording_type, RecordingType::Normal);
        assert_eq!(info.position, Position::Front);
        assert_eq!((info.recording_type.code(), info.position.code()), ("N", "A"));
        assert_eq!(info.file_path, Path::new("/videos/20240703_131044_0417_N_A.MP4"));
    }

    #[test]
    fn reparsing_is_stable() {
        let path = Path::new("20231231_235959_9_P_C.mp4");
        let a = parse(path).unwrap();
        let b = parse(path).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.recording_type, RecordingType::Parking);
        assert_eq!(a.position, Position::Rear);
    }

    #[test]
    fn event_internal() {
        let info = parse(Path::new("20240101_000000_12_E_B.mp4")).unwrap();
        assert_eq!(info.recording_type, RecordingType::Event);
        assert_eq!(info.position, Position::Internal);
    }

    fn reason(name: &str) -> String {
        match parse(Path::new(name)) {
            Err(Error::Parse { path, reason }) => {
                assert_eq!(path, Path::new(name));
                reason
            }
            other => panic!("{name}: expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_wrong_token_count() {
        assert!(reason("20240703_131044_0417_N.mp4").contains("found 4"));
        assert!(reason("20240703_131044_0417_N_A_x.mp4").contains("found 6"));
        assert!(reason("clip.mp4").contains("found 1"));
    }

    #[test]
    fn rejects_bad_fields() {
        assert!(reason("20241332_131044_0417_N_A.mp4").contains("date"));
        assert!(reason("2024073_131044_0417_N_A.mp4").contains("date"));
        assert!(reason("20240703_256000_0417_N_A.mp4").contains("time"));
        assert!(reason("20240703_131060_0417_N_A.mp4").contains("time"));
        assert!(reason("20240703_136044_0417_N_A.mp4").contains("time"));
        assert!(reason("20240703_131044_04a7_N_A.mp4").contains("group id"));
        assert!(reason("20240703_131044_-417_N_A.mp4").contains("group id"));
        assert!(reason("20240703_131044_0417_X_A.mp4").contains("recording type"));
        assert!(reason("20240703_131044_0417_n_A.mp4").contains("recording type"));
        assert!(reason("20240703_131044_0417_N_D.mp4").contains("position"));
    }
}
