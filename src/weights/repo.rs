use sqlx::SqlitePool;

use super::dto::HistoryEntry;

pub struct WeightEntry;

impl WeightEntry {
    /// Inserts one row and returns its generated id. No referential check
    /// against `users` — the store tolerates orphan rows by design of the
    /// original schema.
    pub async fn insert(
        db: &SqlitePool,
        username: &str,
        weight: f64,
        date: &str,
    ) -> sqlx::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO weights (username, weight, date)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(weight)
        .bind(date)
        .execute(db)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Ascending by date; ISO dates make lexicographic order chronological.
    pub async fn list_by_user(db: &SqlitePool, username: &str) -> sqlx::Result<Vec<HistoryEntry>> {
        sqlx::query_as::<_, HistoryEntry>(
            r#"
            SELECT date, weight
            FROM weights
            WHERE username = ?
            ORDER BY date
            "#,
        )
        .bind(username)
        .fetch_all(db)
        .await
    }
}
