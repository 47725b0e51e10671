//! PanoramaStore and DiscoveryStore implementations for SQLite

use async_trait::async_trait;
use panosweep_core::error::{PanosweepError, Result};
use panosweep_core::models::{PanoramaRecord, SampleId};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

use super::SqliteStore;
use crate::ports::{DiscoveryStore, PanoramaStore};

/// Insert a panorama, or fold it into the existing row.
///
/// A NULL incoming date or copyright keeps the stored value; position and
/// orientation keep their first-seen values.
async fn upsert_on<'e, E>(executor: E, record: &PanoramaRecord) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let record = record.clone().normalized();

    sqlx::query(
        r#"
        INSERT INTO search_panoramas (pano_id, lat, lon, date, copyright, heading, pitch, roll)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (pano_id) DO UPDATE SET
            date = COALESCE(excluded.date, search_panoramas.date),
            copyright = COALESCE(excluded.copyright, search_panoramas.copyright)
        "#,
    )
    .bind(&record.pano_id)
    .bind(record.lat)
    .bind(record.lon)
    .bind(&record.date)
    .bind(&record.copyright)
    .bind(record.heading)
    .bind(record.pitch)
    .bind(record.roll)
    .execute(executor)
    .await
    .map_err(|e| PanosweepError::Storage(format!("Failed to upsert panorama: {}", e)))?;

    Ok(())
}

fn panorama_from_row(row: &SqliteRow) -> Result<PanoramaRecord> {
    let decode =
        |e: sqlx::Error| PanosweepError::Storage(format!("Failed to decode panorama row: {}", e));

    let record = PanoramaRecord {
        pano_id: row.try_get("pano_id").map_err(decode)?,
        lat: row.try_get("lat").map_err(decode)?,
        lon: row.try_get("lon").map_err(decode)?,
        date: row.try_get("date").map_err(decode)?,
        copyright: row.try_get("copyright").map_err(decode)?,
        heading: row.try_get::<Option<f64>, _>("heading").map_err(decode)?.unwrap_or(0.0),
        pitch: row.try_get::<Option<f64>, _>("pitch").map_err(decode)?.unwrap_or(0.0),
        roll: row.try_get::<Option<f64>, _>("roll").map_err(decode)?.unwrap_or(0.0),
    };
    Ok(record.normalized())
}

#[async_trait]
impl PanoramaStore for SqliteStore {
    async fn upsert_panorama(&self, record: &PanoramaRecord) -> Result<()> {
        upsert_on(self.pool(), record).await
    }

    async fn get_panorama(&self, pano_id: &str) -> Result<Option<PanoramaRecord>> {
        let row = sqlx::query(
            r#"
            SELECT pano_id, lat, lon, date, copyright, heading, pitch, roll
            FROM search_panoramas
            WHERE pano_id = ?
            "#,
        )
        .bind(pano_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| PanosweepError::Storage(format!("Failed to fetch panorama: {}", e)))?;

        row.as_ref().map(panorama_from_row).transpose()
    }

    async fn list_panoramas(&self) -> Result<Vec<PanoramaRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT pano_id, lat, lon, date, copyright, heading, pitch, roll
            FROM search_panoramas
            ORDER BY pano_id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| PanosweepError::Storage(format!("Failed to list panoramas: {}", e)))?;

        rows.iter().map(panorama_from_row).collect()
    }

    async fn count_panoramas(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM search_panoramas")
            .fetch_one(self.pool())
            .await
            .map_err(|e| PanosweepError::Storage(format!("Failed to count panoramas: {}", e)))?;
        Ok(count as u64)
    }

    async fn count_complete_metadata(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM search_panoramas
            WHERE date IS NOT NULL AND date != ''
              AND copyright IS NOT NULL AND copyright != ''
            "#,
        )
        .fetch_one(self.pool())
        .await
        .map_err(|e| PanosweepError::Storage(format!("Failed to count complete metadata: {}", e)))?;
        Ok(count as u64)
    }
}

#[async_trait]
impl DiscoveryStore for SqliteStore {
    async fn record_found(&self, id: SampleId, record: &PanoramaRecord) -> Result<()> {
        let mut tx = self.transactions().begin_transaction().await?;

        upsert_on(&mut **tx.inner_mut()?, record).await?;

        let result = sqlx::query(
            "UPDATE sample_coords SET searched = 1, claim_token = NULL, claimed_at = NULL WHERE id = ?",
        )
        .bind(id.0)
        .execute(&mut **tx.inner_mut()?)
        .await
        .map_err(|e| PanosweepError::Storage(format!("Failed to mark point searched: {}", e)))?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(PanosweepError::SampleNotFound { id: id.0 });
        }

        tx.commit().await?;
        tracing::trace!(sample = %id, pano_id = %record.pano_id, "Recorded panorama");
        Ok(())
    }
}
