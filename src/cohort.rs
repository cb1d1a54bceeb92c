use chrono::{Datelike, Duration, NaiveDate};

use crate::error::EngineResult;
use crate::models::UploadRecord;
use crate::repository::HistoryRepository;

/// Monday=0 .. Sunday=6.
pub fn weekday_index(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

/// First day of the trailing window. Windows reaching past the earliest
/// representable date start at that date.
pub fn window_start(today: NaiveDate, window_days: i64) -> NaiveDate {
    Duration::try_days(window_days.max(1))
        .and_then(|span| today.checked_sub_signed(span))
        .unwrap_or(NaiveDate::MIN)
}

pub fn filter_weekday(rows: &[UploadRecord], weekday: u32) -> Vec<i64> {
    rows.iter()
        .filter(|row| weekday_index(row.upload_date) == weekday)
        .map(|row| i64::from(row.article_count))
        .collect()
}

/// Counts for `newspaper_id` on `weekday` within the trailing window ending `today`.
pub async fn build_weekday_cohort<R: HistoryRepository + ?Sized>(
    repo: &R,
    newspaper_id: i32,
    weekday: u32,
    today: NaiveDate,
    window_days: i64,
) -> EngineResult<Vec<i64>> {
    let since = window_start(today, window_days);
    let rows = repo.upload_history_since(newspaper_id, since).await?;
    let cohort = filter_weekday(&rows, weekday);
    tracing::debug!(
        newspaper_id,
        weekday,
        %since,
        scanned = rows.len(),
        cohort_size = cohort.len(),
        "built weekday cohort"
    );
    Ok(cohort)
}
