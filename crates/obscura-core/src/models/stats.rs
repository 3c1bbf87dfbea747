use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{FileStatus, StoredFile};

/// Number of entries in `recent_files`.
const RECENT_FILES_LIMIT: usize = 5;

/// Usage and processing statistics derived from a set of lifecycle records.
/// Read-side only; computed fresh on each request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageStats {
    pub total_files: usize,
    pub total_size_bytes: i64,
    pub total_size_mb: f64,
    pub uploaded_today: usize,
    pub uploaded_this_week: usize,
    pub uploaded_this_month: usize,
    pub processed_today: usize,
    pub processed_this_week: usize,
    pub processed_this_month: usize,
    /// Counts keyed by status name ("uploaded", "processing", ...).
    pub files_by_status: HashMap<String, usize>,
    /// Counts keyed by coarse MIME bucket ("image", "video").
    pub files_by_type: HashMap<String, usize>,
    pub recent_files: Vec<StoredFile>,
}

impl UsageStats {
    /// Aggregate over `files`. Time buckets are calendar-aligned in UTC:
    /// midnight today, the Sunday that started this week, and the first of
    /// the month. "Processed" counts completed files by `processed_at`.
    pub fn compute(files: &[StoredFile], now: DateTime<Utc>) -> Self {
        let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let week_start = day_start - Duration::days(now.weekday().num_days_from_sunday() as i64);
        let month_start = now
            .date_naive()
            .with_day(1)
            .unwrap_or(now.date_naive())
            .and_time(NaiveTime::MIN)
            .and_utc();

        let mut stats = UsageStats {
            total_files: files.len(),
            ..Default::default()
        };

        for file in files {
            stats.total_size_bytes += file.size_bytes;
            *stats
                .files_by_status
                .entry(file.status.to_string())
                .or_default() += 1;
            *stats
                .files_by_type
                .entry(file.type_bucket().to_string())
                .or_default() += 1;

            if file.uploaded_at >= day_start {
                stats.uploaded_today += 1;
            }
            if file.uploaded_at >= week_start {
                stats.uploaded_this_week += 1;
            }
            if file.uploaded_at >= month_start {
                stats.uploaded_this_month += 1;
            }

            if file.status == FileStatus::Completed {
                if let Some(processed_at) = file.processed_at {
                    if processed_at >= day_start {
                        stats.processed_today += 1;
                    }
                    if processed_at >= week_start {
                        stats.processed_this_week += 1;
                    }
                    if processed_at >= month_start {
                        stats.processed_this_month += 1;
                    }
                }
            }
        }

        stats.total_size_mb = stats.total_size_bytes as f64 / (1024.0 * 1024.0);

        let mut recent: Vec<StoredFile> = files.to_vec();
        recent.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        recent.truncate(RECENT_FILES_LIMIT);
        stats.recent_files = recent;

        stats
    }

    pub fn count_with_status(&self, status: FileStatus) -> usize {
        self.files_by_status
            .get(&status.to_string())
            .copied()
            .unwrap_or(0)
    }
}
