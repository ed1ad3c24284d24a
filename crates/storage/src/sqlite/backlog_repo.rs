use async_trait::async_trait;
use chrono::Utc;
use playtrack_core::model::ReportPayload;
use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{BacklogRepository, StorageError, decode_payload, encode_payload};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait]
impl BacklogRepository for SqliteRepository {
    async fn append_pending(
        &self,
        key: &str,
        payload: &ReportPayload,
        limit: Option<usize>,
    ) -> Result<usize, StorageError> {
        let encoded = encode_payload(payload)?;
        let session_id = payload.session_id.as_ref().map(ToString::to_string);

        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
                INSERT INTO pending_sessions (storage_key, session_id, payload, created_at)
                VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(key)
        .bind(session_id)
        .bind(encoded)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        if let Some(limit) = limit {
            let keep = i64::try_from(limit.max(1)).unwrap_or(i64::MAX);
            sqlx::query(
                r"
                    DELETE FROM pending_sessions
                    WHERE storage_key = ?1
                      AND id NOT IN (
                          SELECT id FROM pending_sessions
                          WHERE storage_key = ?1
                          ORDER BY id DESC
                          LIMIT ?2
                      )
                ",
            )
            .bind(key)
            .bind(keep)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        let row = sqlx::query("SELECT COUNT(*) AS n FROM pending_sessions WHERE storage_key = ?1")
            .bind(key)
            .fetch_one(&mut *tx)
            .await
            .map_err(conn)?;
        let count: i64 = row.try_get("n").map_err(ser)?;

        tx.commit().await.map_err(conn)?;

        usize::try_from(count).map_err(|_| ser(format!("invalid backlog count: {count}")))
    }

    async fn list_pending(&self, key: &str) -> Result<Vec<ReportPayload>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT payload
                FROM pending_sessions
                WHERE storage_key = ?1
                ORDER BY id ASC
            ",
        )
        .bind(key)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let raw: String = row.try_get("payload").map_err(ser)?;
            out.push(decode_payload(&raw)?);
        }
        Ok(out)
    }

    async fn clear_pending(&self, key: &str) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM pending_sessions WHERE storage_key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }
}
