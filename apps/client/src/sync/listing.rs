//! Presentation helpers over a listing snapshot: category filter, sorting
//! and human-readable sizes and dates. None of this changes the snapshot.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::api_client::FileRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Cover,
    Resume,
    Skills,
    Other,
}

impl FileCategory {
    /// Generated files are categorized by what their name mentions.
    pub fn of(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("cover") {
            FileCategory::Cover
        } else if name.contains("resume") {
            FileCategory::Resume
        } else if name.contains("skills") || name.contains("development-plan") {
            FileCategory::Skills
        } else {
            FileCategory::Other
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CategoryFilter {
    #[default]
    All,
    Cover,
    Resume,
    Skills,
    Other,
}

impl CategoryFilter {
    pub fn matches(self, record: &FileRecord) -> bool {
        let category = FileCategory::of(&record.name);
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Cover => category == FileCategory::Cover,
            CategoryFilter::Resume => category == FileCategory::Resume,
            CategoryFilter::Skills => category == FileCategory::Skills,
            CategoryFilter::Other => category == FileCategory::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortField {
    #[default]
    Date,
    Name,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

pub fn filter_records(records: &[FileRecord], filter: CategoryFilter) -> Vec<FileRecord> {
    records
        .iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect()
}

/// Stable sort. `Desc` puts the newest (or Z-most) first; undated records
/// count as oldest.
pub fn sort_records(records: &mut [FileRecord], field: SortField, order: SortOrder) {
    records.sort_by(|a, b| {
        let ordering = match field {
            SortField::Date => parse_date(&a.uploaded_date).cmp(&parse_date(&b.uploaded_date)),
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// Accepts RFC 3339, a bare `YYYY-MM-DDTHH:MM:SS` or a bare date.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn format_date(raw: &str) -> String {
    match parse_date(raw) {
        Some(dt) => dt.format("%b %-d, %Y %H:%M").to_string(),
        None => raw.to_string(),
    }
}

pub fn format_file_size(bytes: Option<u64>) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;

    match bytes {
        None | Some(0) => "N/A".to_string(),
        Some(b) if b < KB => format!("{b}B"),
        Some(b) if b < MB => format!("{:.1}KB", b as f64 / KB as f64),
        Some(b) => format!("{:.1}MB", b as f64 / MB as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, date: &str) -> FileRecord {
        FileRecord {
            name: name.to_string(),
            uploaded_date: date.to_string(),
            size_bytes: None,
            download_url: String::new(),
        }
    }

    fn names(records: &[FileRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_category_from_name() {
        assert_eq!(FileCategory::of("Acme-Cover-Letter.docx"), FileCategory::Cover);
        assert_eq!(FileCategory::of("resume-optimized.md"), FileCategory::Resume);
        assert_eq!(FileCategory::of("development-plan.md"), FileCategory::Skills);
        assert_eq!(FileCategory::of("Skills.pdf"), FileCategory::Skills);
        assert_eq!(FileCategory::of("notes.txt"), FileCategory::Other);
        // cover wins over resume
        assert_eq!(FileCategory::of("resume-cover.md"), FileCategory::Cover);
    }

    #[test]
    fn test_filter_records() {
        let records = vec![
            record("cover.md", ""),
            record("resume.md", ""),
            record("other.md", ""),
        ];
        assert_eq!(names(&filter_records(&records, CategoryFilter::All)).len(), 3);
        assert_eq!(
            names(&filter_records(&records, CategoryFilter::Resume)),
            vec!["resume.md"]
        );
        assert!(filter_records(&records, CategoryFilter::Skills).is_empty());
    }

    #[test]
    fn test_sort_by_date_newest_first() {
        let mut records = vec![
            record("old", "2024-01-01T00:00:00Z"),
            record("undated", ""),
            record("new", "2024-06-01T12:00:00+02:00"),
            record("mid", "2024-03-15"),
        ];
        sort_records(&mut records, SortField::Date, SortOrder::Desc);
        assert_eq!(names(&records), vec!["new", "mid", "old", "undated"]);

        sort_records(&mut records, SortField::Date, SortOrder::Asc);
        assert_eq!(names(&records), vec!["undated", "old", "mid", "new"]);
    }

    #[test]
    fn test_sort_by_name_ignores_case() {
        let mut records = vec![record("beta", ""), record("Alpha", ""), record("gamma", "")];
        sort_records(&mut records, SortField::Name, SortOrder::Asc);
        assert_eq!(names(&records), vec!["Alpha", "beta", "gamma"]);
        sort_records(&mut records, SortField::Name, SortOrder::Desc);
        assert_eq!(names(&records), vec!["gamma", "beta", "Alpha"]);
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(None), "N/A");
        assert_eq!(format_file_size(Some(0)), "N/A");
        assert_eq!(format_file_size(Some(512)), "512B");
        assert_eq!(format_file_size(Some(1536)), "1.5KB");
        assert_eq!(format_file_size(Some(5 * 1024 * 1024)), "5.0MB");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-05-01T09:05:00Z"), "May 1, 2024 09:05");
        assert_eq!(format_date("yesterday"), "yesterday");
    }
}
