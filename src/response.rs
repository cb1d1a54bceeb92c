use serde::Serialize;

use crate::config::EngineSettings;
use crate::models::{QuartileResult, WeeklyReport, WeeklyReportEntry};
use crate::report::summary_message;
use crate::threshold::ThresholdOutcome;

pub const EXPECTED_MESSAGE: &str = "created and within expected volume";
pub const CHECK_EXPECTED_MESSAGE: &str = "within expected volume";
pub const HIGH_VARIABILITY: &str = "high";
pub const LOW_VARIABILITY: &str = "low — inspect frequency distribution";

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsBody {
    pub mean: f64,
    pub std_dev: f64,
    pub cv: f64,
    pub today_count: i64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EvaluationResponse {
    Expected {
        message: String,
        statistics: StatisticsBody,
    },
    HighVariability {
        message: String,
        variability: &'static str,
        interquartile: QuartileResult,
    },
    LowVariability {
        message: String,
        variability: &'static str,
    },
}

impl EvaluationResponse {
    pub fn from_outcome(outcome: &ThresholdOutcome, settings: &EngineSettings) -> Self {
        match outcome {
            ThresholdOutcome::Expected {
                stats,
                today_count,
                threshold,
            } => EvaluationResponse::Expected {
                message: EXPECTED_MESSAGE.to_string(),
                statistics: StatisticsBody {
                    mean: stats.mean,
                    std_dev: stats.std_dev,
                    cv: stats.coefficient_of_variation,
                    today_count: *today_count,
                    threshold: *threshold,
                },
            },
            ThresholdOutcome::HighVariability {
                stats,
                today_count,
                threshold,
                quartiles,
            } => EvaluationResponse::HighVariability {
                message: shortfall_message(*today_count, *threshold, stats.mean, settings),
                variability: HIGH_VARIABILITY,
                interquartile: *quartiles,
            },
            ThresholdOutcome::LowVariability {
                stats,
                today_count,
                threshold,
            } => EvaluationResponse::LowVariability {
                message: shortfall_message(*today_count, *threshold, stats.mean, settings),
                variability: LOW_VARIABILITY,
            },
        }
    }

    /// Same body as [`EvaluationResponse::from_outcome`] for a volume check
    /// that stored nothing, so the expected tier does not claim a creation.
    pub fn for_check(outcome: &ThresholdOutcome, settings: &EngineSettings) -> Self {
        match Self::from_outcome(outcome, settings) {
            EvaluationResponse::Expected { statistics, .. } => EvaluationResponse::Expected {
                message: CHECK_EXPECTED_MESSAGE.to_string(),
                statistics,
            },
            other => other,
        }
    }
}

fn shortfall_message(today_count: i64, threshold: f64, mean: f64, settings: &EngineSettings) -> String {
    format!(
        "{} below threshold {:.2} ({:.0}% of mean {:.2})",
        today_count,
        threshold,
        settings.threshold_ratio * 100.0,
        mean
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyReportResponse {
    pub message: String,
    pub report: Vec<WeeklyReportEntry>,
}

impl From<&WeeklyReport> for WeeklyReportResponse {
    fn from(report: &WeeklyReport) -> Self {
        Self {
            message: summary_message(report),
            report: report.entries.clone(),
        }
    }
}

/// Body returned for lookups that miss, e.g. `{"error": "Article not found"}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn not_found(entity: &str) -> Self {
        Self {
            error: format!("{entity} not found"),
        }
    }
}
