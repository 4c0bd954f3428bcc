//! Database schema management for `asv-waterquality`.
//!
//! Ensures required tables and indexes exist before ingestion runs.
//! Applied once on startup from `main.rs`, and only when the Postgres
//! store is configured (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `observations` table holding cleaned readings. Safe to call on
/// every startup; no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Cleaned readings served by `/api/observations`; `id` breaks timestamp ties
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS observations (
            id            BIGSERIAL        PRIMARY KEY,
            "timestamp"   TIMESTAMP        NOT NULL,
            latitude      DOUBLE PRECISION NOT NULL,
            longitude     DOUBLE PRECISION NOT NULL,
            temperature   DOUBLE PRECISION NOT NULL,
            salinity      DOUBLE PRECISION NOT NULL,
            odo           DOUBLE PRECISION NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Store order and time-range filters
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_observations_timestamp
            ON observations ("timestamp", id);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_observations_temperature
            ON observations (temperature);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
