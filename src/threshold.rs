use chrono::NaiveDate;

use crate::clock::Clock;
use crate::cohort::{build_weekday_cohort, weekday_index};
use crate::config::EngineSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::{QuartileResult, StatisticsResult};
use crate::repository::HistoryRepository;
use crate::stats::{quartiles, weekday_statistics};

#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdOutcome {
    Expected {
        stats: StatisticsResult,
        today_count: i64,
        threshold: f64,
    },
    HighVariability {
        stats: StatisticsResult,
        today_count: i64,
        threshold: f64,
        quartiles: QuartileResult,
    },
    LowVariability {
        stats: StatisticsResult,
        today_count: i64,
        threshold: f64,
    },
}

impl ThresholdOutcome {
    pub fn tier(&self) -> &'static str {
        match self {
            ThresholdOutcome::Expected { .. } => "expected",
            ThresholdOutcome::HighVariability { .. } => "high-variability",
            ThresholdOutcome::LowVariability { .. } => "low-variability",
        }
    }

    pub fn is_anomalous(&self) -> bool {
        !matches!(self, ThresholdOutcome::Expected { .. })
    }
}

/// Decide the tier for `today_count` against already computed statistics.
///
/// An empty cohort has mean 0 and so a threshold of 0, which every count
/// meets. Quartiles are only taken when the cohort holds data.
pub fn classify(
    stats: StatisticsResult,
    today_count: i64,
    settings: &EngineSettings,
) -> EngineResult<ThresholdOutcome> {
    let threshold = stats.mean * settings.threshold_ratio;

    if today_count as f64 >= threshold {
        return Ok(ThresholdOutcome::Expected {
            stats,
            today_count,
            threshold,
        });
    }

    if !stats.cohort.is_empty() && stats.coefficient_of_variation > settings.cv_cutoff {
        let mut sorted = stats.cohort.clone();
        sorted.sort_unstable();
        let quartiles = quartiles(&sorted)?;
        return Ok(ThresholdOutcome::HighVariability {
            stats,
            today_count,
            threshold,
            quartiles,
        });
    }

    Ok(ThresholdOutcome::LowVariability {
        stats,
        today_count,
        threshold,
    })
}

/// Classify today's article volume for a newspaper against the history of
/// the weekday `upload_date` falls on.
pub async fn evaluate_upload<R, C>(
    repo: &R,
    clock: &C,
    settings: &EngineSettings,
    newspaper_id: i32,
    upload_date: NaiveDate,
) -> EngineResult<ThresholdOutcome>
where
    R: HistoryRepository + ?Sized,
    C: Clock + ?Sized,
{
    if !repo.newspaper_exists(newspaper_id).await? {
        tracing::warn!(newspaper_id, "evaluation requested for unknown newspaper");
        return Err(EngineError::not_found("Newspaper", newspaper_id));
    }

    let today = clock.today();
    let weekday = weekday_index(upload_date);
    let cohort =
        build_weekday_cohort(repo, newspaper_id, weekday, today, settings.window_days).await?;
    let stats = weekday_statistics(&cohort);
    let today_count = repo.count_articles_on(today, Some(newspaper_id)).await?;

    tracing::debug!(
        newspaper_id,
        mean = stats.mean,
        std_dev = stats.std_dev,
        cv = stats.coefficient_of_variation,
        "weekday statistics"
    );

    let outcome = classify(stats, today_count, settings)?;
    tracing::info!(
        newspaper_id,
        today_count,
        tier = outcome.tier(),
        anomalous = outcome.is_anomalous(),
        "upload volume classified"
    );
    Ok(outcome)
}
