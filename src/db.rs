use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::error::{EngineError, EngineResult};
use crate::models::{ArticleEvent, NewArticle, Newspaper, UploadRecord};
use crate::repository::HistoryRepository;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Postgres-backed record store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn insert_newspaper(&self, name: &str, email_contact: &str) -> EngineResult<i32> {
        let id: i32 = sqlx::query(
            r#"
            INSERT INTO upload_watch.newspapers (name, email_contact)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(email_contact)
        .fetch_one(&self.pool)
        .await?
        .get("id");
        Ok(id)
    }

    pub async fn list_newspapers(&self) -> EngineResult<Vec<Newspaper>> {
        let rows = sqlx::query(
            "SELECT id, name, email_contact FROM upload_watch.newspapers ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(newspaper_from_row).collect())
    }

    pub async fn get_newspaper(&self, id: i32) -> EngineResult<Newspaper> {
        sqlx::query("SELECT id, name, email_contact FROM upload_watch.newspapers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|row| newspaper_from_row(&row))
            .ok_or_else(|| EngineError::not_found("Newspaper", id))
    }

    pub async fn update_newspaper(
        &self,
        id: i32,
        name: &str,
        email_contact: &str,
    ) -> EngineResult<()> {
        let result = sqlx::query(
            "UPDATE upload_watch.newspapers SET name = $2, email_contact = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(name)
        .bind(email_contact)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::not_found("Newspaper", id));
        }
        Ok(())
    }

    pub async fn delete_newspaper(&self, id: i32) -> EngineResult<()> {
        let result = sqlx::query("DELETE FROM upload_watch.newspapers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::not_found("Newspaper", id));
        }
        Ok(())
    }

    pub async fn insert_article(&self, article: &NewArticle) -> EngineResult<i32> {
        if !self.newspaper_exists(article.newspaper_id).await? {
            return Err(EngineError::not_found("Newspaper", article.newspaper_id));
        }

        let id: i32 = sqlx::query(
            r#"
            INSERT INTO upload_watch.articles (title, content, newspaper_id, uploaded_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&article.title)
        .bind(&article.content)
        .bind(article.newspaper_id)
        .bind(article.uploaded_at)
        .fetch_one(&self.pool)
        .await?
        .get("id");
        Ok(id)
    }

    pub async fn list_articles(&self) -> EngineResult<Vec<ArticleEvent>> {
        let rows = sqlx::query(
            "SELECT id, title, content, newspaper_id, uploaded_at \
             FROM upload_watch.articles ORDER BY uploaded_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(article_from_row).collect())
    }

    pub async fn get_article(&self, id: i32) -> EngineResult<ArticleEvent> {
        sqlx::query(
            "SELECT id, title, content, newspaper_id, uploaded_at \
             FROM upload_watch.articles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| article_from_row(&row))
        .ok_or_else(|| EngineError::not_found("Article", id))
    }

    pub async fn update_article(&self, id: i32, article: &NewArticle) -> EngineResult<()> {
        if !self.newspaper_exists(article.newspaper_id).await? {
            return Err(EngineError::not_found("Newspaper", article.newspaper_id));
        }

        let result = sqlx::query(
            r#"
            UPDATE upload_watch.articles
            SET title = $2, content = $3, newspaper_id = $4, uploaded_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&article.title)
        .bind(&article.content)
        .bind(article.newspaper_id)
        .bind(article.uploaded_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::not_found("Article", id));
        }
        Ok(())
    }

    pub async fn delete_article(&self, id: i32) -> EngineResult<()> {
        let result = sqlx::query("DELETE FROM upload_watch.articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::not_found("Article", id));
        }
        Ok(())
    }

    pub async fn insert_upload_history(
        &self,
        newspaper_id: i32,
        upload_date: NaiveDate,
        article_count: i32,
    ) -> EngineResult<i32> {
        if !self.newspaper_exists(newspaper_id).await? {
            return Err(EngineError::not_found("Newspaper", newspaper_id));
        }

        let id: i32 = sqlx::query(
            r#"
            INSERT INTO upload_watch.upload_history (newspaper_id, upload_date, article_count)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(newspaper_id)
        .bind(upload_date)
        .bind(article_count)
        .fetch_one(&self.pool)
        .await?
        .get("id");
        Ok(id)
    }

    pub async fn list_upload_history(&self) -> EngineResult<Vec<UploadRecord>> {
        let rows = sqlx::query(
            "SELECT id, newspaper_id, upload_date, article_count \
             FROM upload_watch.upload_history ORDER BY upload_date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(upload_record_from_row).collect())
    }

    pub async fn get_upload_history(&self, id: i32) -> EngineResult<UploadRecord> {
        sqlx::query(
            "SELECT id, newspaper_id, upload_date, article_count \
             FROM upload_watch.upload_history WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(|row| upload_record_from_row(&row))
        .ok_or_else(|| EngineError::not_found("Upload history", id))
    }

    pub async fn update_upload_history(
        &self,
        id: i32,
        newspaper_id: i32,
        upload_date: NaiveDate,
        article_count: i32,
    ) -> EngineResult<()> {
        if !self.newspaper_exists(newspaper_id).await? {
            return Err(EngineError::not_found("Newspaper", newspaper_id));
        }

        let result = sqlx::query(
            r#"
            UPDATE upload_watch.upload_history
            SET newspaper_id = $2, upload_date = $3, article_count = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(newspaper_id)
        .bind(upload_date)
        .bind(article_count)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::not_found("Upload history", id));
        }
        Ok(())
    }

    pub async fn delete_upload_history(&self, id: i32) -> EngineResult<()> {
        let result = sqlx::query("DELETE FROM upload_watch.upload_history WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::not_found("Upload history", id));
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryRepository for PgStore {
    async fn upload_history_since(
        &self,
        newspaper_id: i32,
        since: NaiveDate,
    ) -> EngineResult<Vec<UploadRecord>> {
        let rows = sqlx::query(
            "SELECT id, newspaper_id, upload_date, article_count \
             FROM upload_watch.upload_history \
             WHERE newspaper_id = $1 AND upload_date >= $2",
        )
        .bind(newspaper_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(upload_record_from_row).collect())
    }

    async fn count_articles_on(
        &self,
        date: NaiveDate,
        newspaper_id: Option<i32>,
    ) -> EngineResult<i64> {
        let (start, end) = day_bounds(date);
        let mut query = String::from(
            "SELECT COUNT(*) AS article_count FROM upload_watch.articles \
             WHERE uploaded_at >= $1 AND uploaded_at < $2",
        );
        if newspaper_id.is_some() {
            query.push_str(" AND newspaper_id = $3");
        }

        let mut rows = sqlx::query(&query).bind(start).bind(end);
        if let Some(id) = newspaper_id {
            rows = rows.bind(id);
        }

        let count: i64 = rows.fetch_one(&self.pool).await?.get("article_count");
        Ok(count)
    }

    async fn newspaper_exists(&self, newspaper_id: i32) -> EngineResult<bool> {
        let exists: bool = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM upload_watch.newspapers WHERE id = $1) AS present",
        )
        .bind(newspaper_id)
        .fetch_one(&self.pool)
        .await?
        .get("present");
        Ok(exists)
    }
}

/// Half-open `[midnight, next midnight)` range covering `date`.
pub fn day_bounds(date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = date.and_time(chrono::NaiveTime::MIN);
    (start, start + Duration::days(1))
}

fn newspaper_from_row(row: &PgRow) -> Newspaper {
    Newspaper {
        id: row.get("id"),
        name: row.get("name"),
        email_contact: row.get("email_contact"),
    }
}

fn article_from_row(row: &PgRow) -> ArticleEvent {
    ArticleEvent {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        newspaper_id: row.get("newspaper_id"),
        uploaded_at: row.get("uploaded_at"),
    }
}

fn upload_record_from_row(row: &PgRow) -> UploadRecord {
    UploadRecord {
        id: row.get("id"),
        newspaper_id: row.get("newspaper_id"),
        upload_date: row.get("upload_date"),
        article_count: row.get("article_count"),
    }
}

/// Sample newspapers plus twelve weeks of history and a few articles for today.
pub async fn seed(store: &PgStore, today: NaiveDate) -> anyhow::Result<()> {
    let newspapers = vec![
        ("El Litoral", "redaccion@ellitoral.example", [40, 42, 38, 41, 39, 22, 18]),
        ("Diario Sur", "contacto@diariosur.example", [12, 30, 8, 25, 15, 5, 3]),
        ("La Voz Local", "editor@lavozlocal.example", [9, 10, 9, 11, 10, 6, 4]),
    ];

    for (name, email, weekday_base) in newspapers {
        let newspaper_id = seed_newspaper(store, name, email)
            .await
            .with_context(|| format!("failed to seed newspaper {name}"))?;

        for days_ago in 1..=84i64 {
            let date = today - Duration::days(days_ago);
            let base = weekday_base[crate::cohort::weekday_index(date) as usize];
            // small deterministic wobble so the cohorts are not flat
            let wobble = ((days_ago * 7 + i64::from(newspaper_id)) % 5) as i32 - 2;
            store
                .insert_upload_history(newspaper_id, date, (base + wobble).max(0))
                .await?;
        }

        let uploaded_at = today
            .and_hms_opt(8, 0, 0)
            .context("invalid seed timestamp")?;
        for n in 1..=3 {
            store
                .insert_article(&NewArticle {
                    title: format!("{name} morning edition #{n}"),
                    content: "Seeded article body.".to_string(),
                    newspaper_id,
                    uploaded_at,
                })
                .await?;
        }
    }

    Ok(())
}

/// Reuses the newspaper with this contact address so repeated seeding does
/// not duplicate it.
async fn seed_newspaper(store: &PgStore, name: &str, email_contact: &str) -> EngineResult<i32> {
    let existing: Option<i32> = sqlx::query(
        "SELECT id FROM upload_watch.newspapers WHERE email_contact = $1 ORDER BY id LIMIT 1",
    )
    .bind(email_contact)
    .fetch_optional(store.pool())
    .await?
    .map(|row| row.get("id"));

    match existing {
        Some(id) => Ok(id),
        None => store.insert_newspaper(name, email_contact).await,
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct HistoryCsvRow {
    pub newspaper_id: i32,
    pub upload_date: NaiveDate,
    pub article_count: i32,
}

pub fn read_history_csv(csv_path: &std::path::Path) -> anyhow::Result<Vec<HistoryCsvRow>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut rows = Vec::new();

    for (line, result) in reader.deserialize::<HistoryCsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid row {} in CSV", line + 1))?;
        if row.article_count < 0 {
            anyhow::bail!(
                "row {} has a negative article_count ({})",
                line + 1,
                row.article_count
            );
        }
        rows.push(row);
    }

    Ok(rows)
}

pub async fn import_csv(store: &PgStore, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let rows = read_history_csv(csv_path)?;
    let mut inserted = 0usize;

    for row in rows {
        match store
            .insert_upload_history(row.newspaper_id, row.upload_date, row.article_count)
            .await
        {
            Ok(_) => inserted += 1,
            Err(EngineError::NotFound { entity, id }) => {
                tracing::warn!(entity, id, "skipping history row for missing newspaper");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn day_bounds_cover_one_calendar_day() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!(start, date.and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap().and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn reads_history_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "newspaper_id,upload_date,article_count").unwrap();
        writeln!(file, "1,2026-10-12,14").unwrap();
        writeln!(file, "2,2026-10-13,0").unwrap();

        let rows = read_history_csv(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].newspaper_id, 1);
        assert_eq!(rows[0].upload_date, NaiveDate::from_ymd_opt(2026, 10, 12).unwrap());
        assert_eq!(rows[1].article_count, 0);
    }

    #[test]
    fn rejects_negative_counts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "newspaper_id,upload_date,article_count").unwrap();
        writeln!(file, "1,2026-10-12,-3").unwrap();

        let err = read_history_csv(file.path()).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn contact_email_is_not_a_unique_key() {
        let schema = include_str!("../migrations/0001_init.sql");
        assert!(!schema.contains("UNIQUE"));
    }

    /// Store backed by `DATABASE_URL`; `None` when no database is configured.
    async fn live_store() -> Option<PgStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .ok()?;
        init_db(&pool).await.ok()?;
        Some(PgStore::new(pool))
    }

    fn unique_email(tag: &str) -> String {
        format!("{tag}-{}@upload-watch.test", chrono::Utc::now().timestamp_micros())
    }

    #[tokio::test]
    async fn adding_with_a_known_email_creates_a_new_newspaper() {
        let Some(store) = live_store().await else {
            return;
        };
        let email = unique_email("shared");

        let first = store.insert_newspaper("Gazette A", &email).await.unwrap();
        let second = store.insert_newspaper("Gazette B", &email).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.get_newspaper(first).await.unwrap().name, "Gazette A");
        assert_eq!(store.get_newspaper(second).await.unwrap().name, "Gazette B");

        store.delete_newspaper(first).await.unwrap();
        store.delete_newspaper(second).await.unwrap();
    }

    #[tokio::test]
    async fn updates_records_and_reports_missing_ids() {
        let Some(store) = live_store().await else {
            return;
        };
        let newspaper_id = store
            .insert_newspaper("Morning Post", &unique_email("update"))
            .await
            .unwrap();

        store
            .update_newspaper(newspaper_id, "Evening Post", "desk@post.test")
            .await
            .unwrap();
        let paper = store.get_newspaper(newspaper_id).await.unwrap();
        assert_eq!(paper.name, "Evening Post");
        assert_eq!(paper.email_contact, "desk@post.test");
        assert!(matches!(
            store.update_newspaper(-1, "x", "y").await,
            Err(EngineError::NotFound { entity: "Newspaper", id: -1 })
        ));

        let uploaded_at = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        let mut article = NewArticle {
            title: "Draft".to_string(),
            content: "body".to_string(),
            newspaper_id,
            uploaded_at,
        };
        let article_id = store.insert_article(&article).await.unwrap();
        article.title = "Final".to_string();
        store.update_article(article_id, &article).await.unwrap();
        assert_eq!(store.get_article(article_id).await.unwrap().title, "Final");
        assert!(matches!(
            store.update_article(-1, &article).await,
            Err(EngineError::NotFound { entity: "Article", .. })
        ));
        article.newspaper_id = -1;
        assert!(matches!(
            store.update_article(article_id, &article).await,
            Err(EngineError::NotFound { entity: "Newspaper", .. })
        ));

        let date = NaiveDate::from_ymd_opt(2026, 10, 12).unwrap();
        let history_id = store
            .insert_upload_history(newspaper_id, date, 10)
            .await
            .unwrap();
        store
            .update_upload_history(history_id, newspaper_id, date, 12)
            .await
            .unwrap();
        assert_eq!(
            store.get_upload_history(history_id).await.unwrap().article_count,
            12
        );
        assert!(matches!(
            store.update_upload_history(-1, newspaper_id, date, 1).await,
            Err(EngineError::NotFound { entity: "Upload history", .. })
        ));

        store.delete_newspaper(newspaper_id).await.unwrap();
    }

    #[test]
    fn rejects_malformed_dates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "newspaper_id,upload_date,article_count").unwrap();
        writeln!(file, "1,12/10/2026,3").unwrap();

        assert!(read_history_csv(file.path()).is_err());
    }
}
