use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::EngineResult;
use crate::models::UploadRecord;

/// Read-only queries the engine runs against the record store.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Upload-history rows for one newspaper with `upload_date >= since`,
    /// in the store's natural order.
    async fn upload_history_since(
        &self,
        newspaper_id: i32,
        since: NaiveDate,
    ) -> EngineResult<Vec<UploadRecord>>;

    /// Articles whose `uploaded_at` falls on `date`, optionally for one newspaper.
    async fn count_articles_on(
        &self,
        date: NaiveDate,
        newspaper_id: Option<i32>,
    ) -> EngineResult<i64>;

    async fn newspaper_exists(&self, newspaper_id: i32) -> EngineResult<bool>;
}
