use crate::metadata::ResolvedTimestamp;

/// Folder name used when no file in the batch yields a timestamp.
pub const DEFAULT_FOLDER_NAME: &str = "tmp";

const DATE_FORMAT: &str = "%Y.%m.%d";
const TIME_FORMAT: &str = "%H.%M.%S";

/// Where one candidate file goes, and what it says about the folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPlan {
    pub file_name: String,
    pub folder_name: Option<String>,
    pub sequence: Option<u64>,
}

/// `2020.11.04_d-wed`
pub fn folder_name(ts: &ResolvedTimestamp) -> String {
    format!("{}_{}", ts.datetime.format(DATE_FORMAT), ts.weekday_tag())
}

/// `2020.11.04_09.29.03_1.jpg`, or the original name when there is no timestamp.
pub fn plan_destination(
    original_name: &str,
    ext: &str,
    timestamp: Option<&ResolvedTimestamp>,
    sequence: u64,
) -> DestinationPlan {
    let Some(ts) = timestamp else {
        return DestinationPlan {
            file_name: original_name.to_string(),
            folder_name: None,
            sequence: None,
        };
    };

    let dot = if ext.is_empty() { "" } else { "." };
    let file_name = format!(
        "{}_{}_{}{}{}",
        ts.datetime.format(DATE_FORMAT),
        ts.datetime.format(TIME_FORMAT),
        sequence,
        dot,
        ext
    );
    DestinationPlan {
        file_name,
        folder_name: Some(folder_name(ts)),
        sequence: Some(sequence),
    }
}

/// Recover the timestamp and sequence number from a synthesized file name.
#[cfg(test)]
pub fn parse_file_name(name: &str) -> Option<(chrono::NaiveDateTime, u64)> {
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if stem.matches('.').count() == 4 => stem,
        _ => name,
    };
    let mut parts = stem.splitn(3, '_');
    let date = parts.next()?;
    let time = parts.next()?;
    let sequence = parts.next()?.parse().ok()?;
    let datetime = chrono::NaiveDateTime::parse_from_str(
        &format!("{} {}", date, time),
        &format!("{} {}", DATE_FORMAT, TIME_FORMAT),
    )
    .ok()?;
    Some((datetime, sequence))
}
