//! Per-item render model for the download list

use crate::download::record::{DownloadRecord, DownloadState};
use crate::progress::ReadProgress;
use crate::util::i18n::LocalizationManager;

/// Warning colour for an unknown read position
pub const UNKNOWN_PROGRESS_COLOUR: Rgb = Rgb(255, 0, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// State of a read-progress lookup for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadLookup {
    Pending,
    Resolved(ReadProgress),
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadProgressDisplay {
    pub text: String,
    pub colour: Option<Rgb>,
}

impl ReadProgressDisplay {
    pub fn from_lookup(lookup: ReadLookup, record: &DownloadRecord) -> Self {
        match lookup {
            ReadLookup::Pending => Self {
                text: String::new(),
                colour: None,
            },
            ReadLookup::Resolved(progress) => Self {
                text: format!("{}/{}", progress.current_page + 1, progress.total_pages),
                colour: Some(progress_colour(progress)),
            },
            ReadLookup::Unknown => Self {
                text: format!("1/{}", record.total),
                colour: Some(UNKNOWN_PROGRESS_COLOUR),
            },
        }
    }
}

/// Red at the first page shading to green at the last
fn progress_colour(progress: ReadProgress) -> Rgb {
    let r = if progress.total_pages > 0 {
        (i64::from(progress.current_page) * 255 / i64::from(progress.total_pages)).clamp(0, 255)
            as u8
    } else {
        0
    };
    Rgb(255 - r, r, 0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowStatus {
    Text(String),
    Progress {
        /// `"finished/total"`, absent while indeterminate
        percent_text: Option<String>,
        indeterminate: bool,
        finished: i32,
        total: i32,
        speed_text: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRow {
    pub id: u64,
    pub title: String,
    pub uploader: String,
    pub category: u32,
    pub rating: f32,
    pub status: RowStatus,
    pub show_start: bool,
    pub show_stop: bool,
    pub read_progress: ReadProgressDisplay,
}

impl DownloadRow {
    pub fn build(record: &DownloadRecord, lookup: ReadLookup, i18n: &LocalizationManager) -> Self {
        let running = record.state.is_running();
        Self {
            id: record.id,
            title: record.title.clone(),
            uploader: record.uploader.clone(),
            category: record.category,
            rating: record.rating,
            status: status(record, i18n),
            show_start: !running,
            show_stop: running,
            read_progress: ReadProgressDisplay::from_lookup(lookup, record),
        }
    }
}

fn status(record: &DownloadRecord, i18n: &LocalizationManager) -> RowStatus {
    match record.state {
        DownloadState::None => RowStatus::Text(i18n.get("download-state-none")),
        DownloadState::Wait => RowStatus::Text(i18n.get("download-state-wait")),
        DownloadState::Finish => RowStatus::Text(i18n.get("download-state-finish")),
        DownloadState::Failed if record.legacy > 0 => RowStatus::Text(i18n.get_with_arg(
            "download-state-failed-retry",
            "count",
            record.legacy,
        )),
        DownloadState::Failed => RowStatus::Text(i18n.get("download-state-failed")),
        DownloadState::Download => {
            let indeterminate = record.total <= 0 || record.finished < 0;
            RowStatus::Progress {
                percent_text: (!indeterminate)
                    .then(|| format!("{}/{}", record.finished, record.total)),
                indeterminate,
                finished: record.finished,
                total: record.total,
                speed_text: format!("{}/S", format_bytes(record.speed.max(0))),
            }
        }
    }
}

/// Binary byte count, e.g. `"999 B"`, `"1.5 KiB"`
pub fn format_bytes(bytes: i64) -> String {
    const UNIT: f64 = 1024.0;
    const PREFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let bytes = bytes as f64;
    let exp = ((bytes.ln() / UNIT.ln()) as usize).clamp(1, PREFIXES.len());
    format!(
        "{:.1} {}iB",
        bytes / UNIT.powi(exp as i32),
        PREFIXES[exp - 1]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i18n() -> LocalizationManager {
        LocalizationManager::bundled()
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(999), "999 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_static_states() {
        let i18n = i18n();
        let record = DownloadRecord::new(1, "t", "x").with_state(DownloadState::Finish);
        let row = DownloadRow::build(&record, ReadLookup::Pending, &i18n);
        assert_eq!(row.status, RowStatus::Text("Finished".to_string()));
        assert!(row.show_start);
        assert!(!row.show_stop);
    }

    #[test]
    fn test_failed_shows_retry_count() {
        let i18n = i18n();
        let mut record = DownloadRecord::new(1, "t", "x").with_state(DownloadState::Failed);
        let row = DownloadRow::build(&record, ReadLookup::Pending, &i18n);
        assert_eq!(row.status, RowStatus::Text("Failed".to_string()));

        record.legacy = 3;
        let row = DownloadRow::build(&record, ReadLookup::Pending, &i18n);
        assert_eq!(row.status, RowStatus::Text("Failed (3)".to_string()));
    }

    #[test]
    fn test_active_progress() {
        let i18n = i18n();
        let mut record = DownloadRecord::new(1, "t", "x")
            .with_state(DownloadState::Download)
            .with_pages(3, 10);
        record.speed = 1536;
        let row = DownloadRow::build(&record, ReadLookup::Pending, &i18n);
        assert_eq!(
            row.status,
            RowStatus::Progress {
                percent_text: Some("3/10".to_string()),
                indeterminate: false,
                finished: 3,
                total: 10,
                speed_text: "1.5 KiB/S".to_string(),
            }
        );
        assert!(row.show_stop);
        assert!(!row.show_start);
    }

    #[test]
    fn test_indeterminate_and_negative_speed() {
        let i18n = i18n();
        let mut record = DownloadRecord::new(1, "t", "x")
            .with_state(DownloadState::Download)
            .with_pages(-1, 10);
        record.speed = -20;
        let RowStatus::Progress {
            percent_text,
            indeterminate,
            speed_text,
            ..
        } = DownloadRow::build(&record, ReadLookup::Pending, &i18n).status
        else {
            panic!("expected progress");
        };
        assert!(indeterminate);
        assert_eq!(percent_text, None);
        assert_eq!(speed_text, "0 B/S");
    }

    #[test]
    fn test_read_progress_display() {
        let record = DownloadRecord::new(1, "t", "x").with_pages(40, 40);
        let known = ReadProgressDisplay::from_lookup(
            ReadLookup::Resolved(ReadProgress { current_page: 20, total_pages: 40 }),
            &record,
        );
        assert_eq!(known.text, "21/40");
        assert_eq!(known.colour, Some(Rgb(128, 127, 0)));

        let unknown = ReadProgressDisplay::from_lookup(ReadLookup::Unknown, &record);
        assert_eq!(unknown.text, "1/40");
        assert_eq!(unknown.colour, Some(UNKNOWN_PROGRESS_COLOUR));

        let pending = ReadProgressDisplay::from_lookup(ReadLookup::Pending, &record);
        assert_eq!(pending.text, "");
    }
}
