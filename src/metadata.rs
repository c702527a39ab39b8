use chrono::{Datelike, NaiveDateTime};
use log::debug;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Seek};
use std::path::Path;

/// EXIF encodes dates as "2020:11:04 09:29:03".
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Day-of-week labels, indexed from Sunday = 0.
pub const WEEKDAY_TAGS: [&str; 7] = [
    "d-sun", "d-mon", "d-tues", "d-wed", "d-thurs", "d-fri", "d-sat",
];

/// Extensions we can read embedded EXIF from.
const EMBEDDED_METADATA_EXTS: &[&str] = &[
    "jpg", "jpeg", "tif", "tiff", "png", "webp", "heic", "heif",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimestampSource {
    DateTimeOriginal,
    DateTime,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTimestamp {
    pub datetime: NaiveDateTime,
    pub source: TimestampSource,
}

impl ResolvedTimestamp {
    pub fn weekday_tag(&self) -> &'static str {
        WEEKDAY_TAGS[self.datetime.weekday().num_days_from_sunday() as usize]
    }
}

/// One step of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Exif(TimestampSource),
    Modified,
}

const EMBEDDED_CHAIN: &[Strategy] = &[
    Strategy::Exif(TimestampSource::DateTimeOriginal),
    Strategy::Exif(TimestampSource::DateTime),
];
const MODIFIED_ONLY: &[Strategy] = &[Strategy::Modified];

/// Strategies to try, in order, for a file with this (lowercased) extension.
///
/// Formats we can read EXIF from only ever use the embedded tags; everything
/// else, videos included, goes straight to the filesystem modification time.
pub fn strategies_for(ext: &str) -> &'static [Strategy] {
    if EMBEDDED_METADATA_EXTS.contains(&ext) {
        EMBEDDED_CHAIN
    } else {
        MODIFIED_ONLY
    }
}

/// Resolve the capture time of an open file. `None` means no timestamp could
/// be found; metadata problems never surface as errors.
pub fn resolve_timestamp(file: &File, ext: &str, path: &Path) -> Option<ResolvedTimestamp> {
    let mut decoded: Option<Option<exif::Exif>> = None;

    for strategy in strategies_for(ext) {
        let found = match strategy {
            Strategy::Exif(source) => {
                let exif = decoded.get_or_insert_with(|| read_exif(file, path));
                exif.as_ref().and_then(|exif| exif_datetime(exif, *source, path))
            }
            Strategy::Modified => modified_datetime(file, path),
        };
        if let Some(datetime) = found {
            let source = match strategy {
                Strategy::Exif(source) => *source,
                Strategy::Modified => TimestampSource::Modified,
            };
            return Some(ResolvedTimestamp { datetime, source });
        }
    }

    debug!("No timestamp for {}", path.display());
    None
}

fn read_exif(mut file: &File, path: &Path) -> Option<exif::Exif> {
    if let Err(e) = file.rewind() {
        debug!("Cannot rewind {}: {}", path.display(), e);
        return None;
    }
    let mut reader = BufReader::new(file);
    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => Some(exif),
        Err(e) => {
            debug!("No exif data in {}: {}", path.display(), e);
            None
        }
    }
}

fn exif_datetime(exif: &exif::Exif, source: TimestampSource, path: &Path) -> Option<NaiveDateTime> {
    let tag = match source {
        TimestampSource::DateTimeOriginal => exif::Tag::DateTimeOriginal,
        TimestampSource::DateTime => exif::Tag::DateTime,
        TimestampSource::Modified => return None,
    };
    let field = exif.get_field(tag, exif::In::PRIMARY)?;

    let raw = match &field.value {
        exif::Value::Ascii(parts) => parts.iter().find(|p| !p.is_empty())?,
        other => {
            debug!("{} in {} is not a string: {:?}", tag, path.display(), other);
            return None;
        }
    };
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_end_matches('\0').trim();

    match NaiveDateTime::parse_from_str(text, EXIF_DATETIME_FORMAT) {
        Ok(dt) => Some(dt),
        Err(e) => {
            debug!("Unparseable {} {:?} in {}: {}", tag, text, path.display(), e);
            None
        }
    }
}

fn modified_datetime(file: &File, path: &Path) -> Option<NaiveDateTime> {
    let modified = file.metadata().and_then(|m| m.modified());
    match modified {
        Ok(modified) => {
            let datetime: chrono::DateTime<chrono::Local> = modified.into();
            Some(datetime.naive_local())
        }
        Err(e) => {
            debug!("Cannot stat {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use chrono::{Local, NaiveDate, TimeZone};

    fn resolve(path: &Path) -> Option<ResolvedTimestamp> {
        let ext = path.extension().unwrap().to_str().unwrap().to_ascii_lowercase();
        let file = File::open(path).unwrap();
        resolve_timestamp(&file, &ext, path)
    }

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn test_weekday_tags() {
        // 2020-11-01 was a Sunday
        let expected = ["d-sun", "d-mon", "d-tues", "d-wed", "d-thurs", "d-fri", "d-sat"];
        for (offset, tag) in expected.iter().enumerate() {
            let ts = ResolvedTimestamp {
                datetime: dt(2020, 11, 1 + offset as u32, 23, 59, 59),
                source: TimestampSource::DateTimeOriginal,
            };
            assert_eq!(ts.weekday_tag(), *tag, "2020-11-{:02}", 1 + offset);
        }
        let next_sunday = ResolvedTimestamp {
            datetime: dt(2020, 11, 8, 0, 0, 0),
            source: TimestampSource::Modified,
        };
        assert_eq!(next_sunday.weekday_tag(), "d-sun");
    }

    #[test]
    fn test_strategy_chains() {
        assert_eq!(strategies_for("jpg"), EMBEDDED_CHAIN);
        assert_eq!(strategies_for("heic"), EMBEDDED_CHAIN);
        assert_eq!(strategies_for("gif"), MODIFIED_ONLY);
        assert_eq!(strategies_for("mp4"), MODIFIED_ONLY);
    }

    #[test]
    fn test_date_time_original_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = testutil::write_jpeg(
            dir.path(),
            "a.jpg",
            Some("2020:11:04 09:29:03"),
            Some("2021:01:01 00:00:00"),
        );
        let ts = resolve(&path).unwrap();
        assert_eq!(ts.datetime, dt(2020, 11, 4, 9, 29, 3));
        assert_eq!(ts.source, TimestampSource::DateTimeOriginal);
    }

    #[test]
    fn test_falls_back_to_date_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = testutil::write_jpeg(dir.path(), "a.jpg", None, Some("2020:11:05 12:19:56"));
        let ts = resolve(&path).unwrap();
        assert_eq!(ts.datetime, dt(2020, 11, 5, 12, 19, 56));
        assert_eq!(ts.source, TimestampSource::DateTime);
    }

    #[test]
    fn test_malformed_original_falls_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = testutil::write_jpeg(
            dir.path(),
            "a.jpg",
            Some("not a date at all"),
            Some("2020:11:05 12:19:56"),
        );
        let ts = resolve(&path).unwrap();
        assert_eq!(ts.source, TimestampSource::DateTime);
    }

    #[test]
    fn test_unparseable_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = testutil::write_jpeg(dir.path(), "a.jpg", Some("2020-11-04T09:29:03"), None);
        assert_eq!(resolve(&path), None);
    }

    #[test]
    fn test_jpeg_without_exif_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = testutil::write_plain_jpeg(dir.path(), "plain.jpg");
        assert_eq!(resolve(&path), None);
    }

    #[test]
    fn test_video_uses_modified_time() {
        let dir = tempfile::tempdir().unwrap();
        let secs = 1_604_482_143; // 2020-11-04T09:29:03Z
        let path = testutil::write_with_mtime(dir.path(), "clip.MP4", secs);
        let ts = resolve(&path).unwrap();
        let expected = Local.timestamp_opt(secs as i64, 0).unwrap().naive_local();
        assert_eq!(ts.datetime, expected);
        assert_eq!(ts.source, TimestampSource::Modified);
    }
}
