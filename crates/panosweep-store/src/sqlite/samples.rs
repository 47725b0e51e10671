//! SampleStore implementation for SQLite

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use panosweep_core::error::{PanosweepError, Result};
use panosweep_core::models::{ClaimToken, LabelProgress, LatLon, SampleId, SamplePoint};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use std::time::Duration;

use super::SqliteStore;
use crate::ports::SampleStore;

/// Rows per INSERT; four bound parameters each keeps a chunk well below
/// SQLite's host parameter limit
const INSERT_CHUNK_ROWS: usize = 1000;

pub(crate) fn sample_from_row(row: &SqliteRow) -> Result<SamplePoint> {
    let decode = |e: sqlx::Error| PanosweepError::Storage(format!("Failed to decode sample row: {}", e));

    Ok(SamplePoint {
        id: SampleId(row.try_get("id").map_err(decode)?),
        lat: row.try_get("lat").map_err(decode)?,
        lon: row.try_get("lon").map_err(decode)?,
        label: row.try_get::<Option<String>, _>("label").map_err(decode)?.unwrap_or_default(),
        searched: row.try_get("searched").map_err(decode)?,
    })
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Oldest `claimed_at` still covered by a lease of this length
fn lease_cutoff(now: i64, lease: Duration) -> i64 {
    now.saturating_sub(i64::try_from(lease.as_millis()).unwrap_or(i64::MAX))
}

async fn insert_points(conn: &mut SqliteConnection, points: &[LatLon], label: &str) -> Result<()> {
    for chunk in points.chunks(INSERT_CHUNK_ROWS) {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO sample_coords (lat, lon, label, searched) ");
        builder.push_values(chunk, |mut row, point| {
            row.push_bind(point.lat).push_bind(point.lon).push_bind(label).push_bind(false);
        });

        builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| PanosweepError::Storage(format!("Failed to insert sample points: {}", e)))?;
    }
    Ok(())
}

#[async_trait]
impl SampleStore for SqliteStore {
    async fn append_samples(&self, points: &[LatLon], label: &str) -> Result<u64> {
        if points.is_empty() {
            return Ok(0);
        }

        let _guard = self.append_lock().lock().await;
        let mut tx = self.transactions().begin_transaction().await?;
        insert_points(&mut **tx.inner_mut()?, points, label).await?;
        tx.commit().await?;

        tracing::debug!(label, count = points.len(), "Appended sample points");
        Ok(points.len() as u64)
    }

    async fn append_stream(
        &self,
        label: &str,
        mut chunks: BoxStream<'_, Result<Vec<LatLon>>>,
    ) -> Result<u64> {
        let _guard = self.append_lock().lock().await;
        let mut tx = self.transactions().begin_transaction().await?;

        let mut appended = 0u64;
        while let Some(chunk) = chunks.next().await {
            let points = match chunk {
                Ok(points) => points,
                Err(err) => {
                    tx.rollback().await?;
                    tracing::debug!(label, discarded = appended, "Abandoned sample append");
                    return Err(err);
                }
            };
            insert_points(&mut **tx.inner_mut()?, &points, label).await?;
            appended += points.len() as u64;
        }
        tx.commit().await?;

        tracing::debug!(label, count = appended, "Appended sample points");
        Ok(appended)
    }

    async fn next_unsearched(&self, limit: usize) -> Result<Vec<SamplePoint>> {
        let rows = sqlx::query(
            r#"
            SELECT id, lat, lon, label, searched FROM sample_coords
            WHERE searched = 0
            ORDER BY id
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await
        .map_err(|e| PanosweepError::Storage(format!("Failed to fetch unsearched points: {}", e)))?;

        rows.iter().map(sample_from_row).collect()
    }

    async fn claim_unsearched(
        &self,
        limit: usize,
        token: &ClaimToken,
        lease: Duration,
    ) -> Result<Vec<SamplePoint>> {
        let now = now_millis();
        let expired_before = lease_cutoff(now, lease);

        // One statement, so two workers can never take the same row
        let rows = sqlx::query(
            r#"
            UPDATE sample_coords SET claim_token = ?, claimed_at = ?
            WHERE id IN (
                SELECT id FROM sample_coords
                WHERE searched = 0 AND (claim_token IS NULL OR claimed_at <= ?)
                ORDER BY id
                LIMIT ?
            )
            RETURNING id, lat, lon, label, searched
            "#,
        )
        .bind(token.as_str())
        .bind(now)
        .bind(expired_before)
        .bind(limit as i64)
        .fetch_all(self.pool())
        .await
        .map_err(|e| PanosweepError::Storage(format!("Failed to claim sample points: {}", e)))?;

        let mut points = rows.iter().map(sample_from_row).collect::<Result<Vec<_>>>()?;
        // RETURNING order is unspecified
        points.sort_by_key(|p| p.id);
        Ok(points)
    }

    async fn renew_claim(&self, id: SampleId, token: &ClaimToken) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE sample_coords SET claimed_at = ? WHERE id = ? AND claim_token = ? AND searched = 0",
        )
        .bind(now_millis())
        .bind(id.0)
        .bind(token.as_str())
        .execute(self.pool())
        .await
        .map_err(|e| PanosweepError::Storage(format!("Failed to renew claim: {}", e)))?;

        if result.rows_affected() == 0 {
            if !self.sample_exists(id).await? {
                return Err(PanosweepError::SampleNotFound { id: id.0 });
            }
            return Ok(false);
        }
        Ok(true)
    }

    async fn release_claim(&self, id: SampleId, token: &ClaimToken) -> Result<()> {
        let result = sqlx::query(
            "UPDATE sample_coords SET claim_token = NULL, claimed_at = NULL WHERE id = ? AND claim_token = ?",
        )
        .bind(id.0)
        .bind(token.as_str())
        .execute(self.pool())
        .await
        .map_err(|e| PanosweepError::Storage(format!("Failed to release claim: {}", e)))?;

        if result.rows_affected() == 0 && !self.sample_exists(id).await? {
            return Err(PanosweepError::SampleNotFound { id: id.0 });
        }
        Ok(())
    }

    async fn mark_searched(&self, id: SampleId) -> Result<()> {
        let result = sqlx::query(
            "UPDATE sample_coords SET searched = 1, claim_token = NULL, claimed_at = NULL WHERE id = ?",
        )
        .bind(id.0)
        .execute(self.pool())
        .await
        .map_err(|e| PanosweepError::Storage(format!("Failed to mark point searched: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(PanosweepError::SampleNotFound { id: id.0 });
        }
        Ok(())
    }

    async fn count_unsearched(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sample_coords WHERE searched = 0")
            .fetch_one(self.pool())
            .await
            .map_err(|e| PanosweepError::Storage(format!("Failed to count unsearched points: {}", e)))?;
        Ok(count as u64)
    }

    async fn count_total(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sample_coords")
            .fetch_one(self.pool())
            .await
            .map_err(|e| PanosweepError::Storage(format!("Failed to count points: {}", e)))?;
        Ok(count as u64)
    }

    async fn label_progress(&self) -> Result<Vec<LabelProgress>> {
        let rows: Vec<(Option<String>, i64, i64)> = sqlx::query_as(
            r#"
            SELECT label, COUNT(*), SUM(CASE WHEN searched = 0 THEN 0 ELSE 1 END)
            FROM sample_coords
            GROUP BY label
            ORDER BY label
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| PanosweepError::Storage(format!("Failed to query label progress: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|(label, total, searched)| LabelProgress {
                label: label.unwrap_or_default(),
                total: total as u64,
                searched: searched as u64,
            })
            .collect())
    }
}

impl SqliteStore {
    async fn sample_exists(&self, id: SampleId) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM sample_coords WHERE id = ?")
            .bind(id.0)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| PanosweepError::Storage(format!("Failed to look up sample point: {}", e)))?;
        Ok(found.is_some())
    }
}
