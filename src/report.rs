use std::fmt::Write;

use chrono::Duration;

use crate::clock::Clock;
use crate::error::EngineResult;
use crate::models::{WeeklyReport, WeeklyReportEntry};
use crate::repository::HistoryRepository;

pub const REPORT_DAYS: i64 = 7;

/// Per-day article counts for today and the six days before it, newest first.
pub async fn weekly_report<R, C>(
    repo: &R,
    clock: &C,
    newspaper_id: Option<i32>,
) -> EngineResult<WeeklyReport>
where
    R: HistoryRepository + ?Sized,
    C: Clock + ?Sized,
{
    let today = clock.today();
    let mut entries = Vec::with_capacity(REPORT_DAYS as usize);
    let mut total_articles = 0i64;

    for offset in 0..REPORT_DAYS {
        let date = today - Duration::days(offset);
        let article_count = repo.count_articles_on(date, newspaper_id).await?;
        total_articles += article_count;
        entries.push(WeeklyReportEntry {
            date,
            article_count,
        });
    }

    tracing::info!(?newspaper_id, total_articles, "weekly report built");

    Ok(WeeklyReport {
        newspaper_id,
        total_articles,
        entries,
    })
}

pub fn scope_label(newspaper_id: Option<i32>) -> String {
    match newspaper_id {
        Some(id) => format!("newspaper {id}"),
        None => "all newspapers".to_string(),
    }
}

pub fn summary_message(report: &WeeklyReport) -> String {
    let (newest, oldest) = match (report.entries.first(), report.entries.last()) {
        (Some(newest), Some(oldest)) => (newest.date, oldest.date),
        _ => return format!("No uploads recorded for {}", scope_label(report.newspaper_id)),
    };

    format!(
        "{} articles uploaded for {} between {} and {}",
        report.total_articles,
        scope_label(report.newspaper_id),
        oldest,
        newest
    )
}

pub fn render_markdown(report: &WeeklyReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Weekly Upload Report");
    let _ = writeln!(output, "{}", summary_message(report));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Uploads");

    if report.total_articles == 0 {
        let _ = writeln!(output, "No articles uploaded in this window.");
    } else {
        let busiest = report
            .entries
            .iter()
            .map(|entry| entry.article_count)
            .max()
            .unwrap_or(0);
        for entry in &report.entries {
            let marker = if entry.article_count == busiest { " (peak)" } else { "" };
            let _ = writeln!(
                output,
                "- {} ({}): {} articles{}",
                entry.date,
                entry.date.format("%a"),
                entry.article_count,
                marker
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Totals");
    let average = report.total_articles as f64 / REPORT_DAYS as f64;
    let _ = writeln!(
        output,
        "- {} articles, {:.1} per day on average",
        report.total_articles, average
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::repository::memory::InMemoryRepository;
    use chrono::NaiveDate;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn sample_repo() -> InMemoryRepository {
        let mut repo = InMemoryRepository::default();
        repo.newspapers = vec![1, 2];
        repo.add_articles(1, today(), 3);
        repo.add_articles(2, today(), 1);
        repo.add_articles(1, today() - Duration::days(2), 4);
        repo.add_articles(1, today() - Duration::days(6), 2);
        // outside the window
        repo.add_articles(1, today() - Duration::days(7), 9);
        repo.add_articles(1, today() + Duration::days(1), 9);
        repo
    }

    #[tokio::test]
    async fn seven_entries_newest_first() {
        let report = weekly_report(&sample_repo(), &FixedClock(today()), Some(1))
            .await
            .unwrap();

        assert_eq!(report.entries.len(), 7);
        assert_eq!(report.entries[0].date, today());
        assert_eq!(report.entries[6].date, today() - Duration::days(6));
        assert!(report.entries.windows(2).all(|w| w[0].date > w[1].date));

        let counts: Vec<i64> = report.entries.iter().map(|e| e.article_count).collect();
        assert_eq!(counts, vec![3, 0, 4, 0, 0, 0, 2]);
        assert_eq!(report.total_articles, 9);
    }

    #[tokio::test]
    async fn all_newspapers_scope_sums_everyone() {
        let report = weekly_report(&sample_repo(), &FixedClock(today()), None)
            .await
            .unwrap();
        let sum: i64 = report.entries.iter().map(|e| e.article_count).sum();
        assert_eq!(sum, report.total_articles);
        assert_eq!(report.total_articles, 10);
        assert_eq!(report.entries[0].article_count, 4);
    }

    #[tokio::test]
    async fn empty_store_reports_zeroes() {
        let report = weekly_report(&InMemoryRepository::default(), &FixedClock(today()), None)
            .await
            .unwrap();
        assert_eq!(report.entries.len(), 7);
        assert_eq!(report.total_articles, 0);
        assert!(render_markdown(&report).contains("No articles uploaded"));
    }

    #[tokio::test]
    async fn summary_names_scope_and_range() {
        let report = weekly_report(&sample_repo(), &FixedClock(today()), Some(1))
            .await
            .unwrap();
        assert_eq!(
            summary_message(&report),
            "9 articles uploaded for newspaper 1 between 2026-10-13 and 2026-10-19"
        );

        let markdown = render_markdown(&report);
        assert!(markdown.starts_with("# Weekly Upload Report"));
        assert!(markdown.contains("- 2026-10-17 (Sat): 4 articles (peak)"));
    }
}
