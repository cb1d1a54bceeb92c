use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Newspaper {
    pub id: i32,
    pub name: String,
    pub email_contact: String,
}

/// One day's reported upload volume for a newspaper.
#[derive(Debug, Clone, Serialize)]
pub struct UploadRecord {
    pub id: i32,
    pub newspaper_id: i32,
    pub upload_date: NaiveDate,
    pub article_count: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleEvent {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub newspaper_id: i32,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub newspaper_id: i32,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsResult {
    pub mean: f64,
    pub std_dev: f64,
    /// Percentage, so a value of 20.0 means 20%.
    pub coefficient_of_variation: f64,
    pub cohort: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuartileResult {
    pub q1: i64,
    pub q3: i64,
    pub iqr: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyReportEntry {
    pub date: NaiveDate,
    pub article_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyReport {
    pub newspaper_id: Option<i32>,
    pub total_articles: i64,
    /// Newest first.
    pub entries: Vec<WeeklyReportEntry>,
}
