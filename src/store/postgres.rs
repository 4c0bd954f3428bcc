//! PostgreSQL-backed observation store.
//!
//! Filters are translated into SQL so only the requested page leaves the
//! database. Store order is `"timestamp", id`, which matches the in-memory
//! backend (time ascending, insertion order on ties).

use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::Field;
use crate::query::{Filter, ObservationPage};
use crate::Observation;

// ---

/// Rows per multi-row INSERT; 6 binds each keeps well under the protocol limit.
const INSERT_CHUNK: usize = 1000;

const SELECT_OBSERVATIONS: &str =
    r#"SELECT "timestamp", latitude, longitude, temperature, salinity, odo FROM observations"#;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

fn push_conditions(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    // ---
    qb.push(" WHERE TRUE");
    if let Some(start) = filter.start {
        qb.push(r#" AND "timestamp" >= "#).push_bind(start);
    }
    if let Some(end) = filter.end {
        qb.push(r#" AND "timestamp" <= "#).push_bind(end);
    }
    for field in Field::ALL {
        let (min, max) = filter.range(field);
        if let Some(min) = min {
            qb.push(format!(" AND {} >= ", field.as_str())).push_bind(min);
        }
        if let Some(max) = max {
            qb.push(format!(" AND {} <= ", field.as_str())).push_bind(max);
        }
    }
}

/// Every row matching the filter's bounds, in store order.
fn matching_query(filter: &Filter) -> QueryBuilder<'static, Postgres> {
    // ---
    let mut qb = QueryBuilder::new(SELECT_OBSERVATIONS);
    push_conditions(&mut qb, filter);
    qb.push(r#" ORDER BY "timestamp", id"#);
    qb
}

fn count_query(filter: &Filter) -> QueryBuilder<'static, Postgres> {
    // ---
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM observations");
    push_conditions(&mut qb, filter);
    qb
}

/// `LIMIT` and `OFFSET` values; the limit is already clamped by the filter.
fn page_bounds(filter: &Filter) -> (i64, i64) {
    (
        i64::try_from(filter.limit()).unwrap_or(i64::MAX),
        i64::try_from(filter.skip()).unwrap_or(i64::MAX),
    )
}

fn page_query(filter: &Filter) -> QueryBuilder<'static, Postgres> {
    // ---
    let (limit, offset) = page_bounds(filter);
    let mut qb = matching_query(filter);
    qb.push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    qb
}

async fn insert_chunks(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    observations: &[Observation],
) -> Result<(), sqlx::Error> {
    // ---
    for chunk in observations.chunks(INSERT_CHUNK) {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"INSERT INTO observations ("timestamp", latitude, longitude, temperature, salinity, odo) "#,
        );
        qb.push_values(chunk, |mut row, obs| {
            row.push_bind(obs.timestamp)
                .push_bind(obs.latitude)
                .push_bind(obs.longitude)
                .push_bind(obs.temperature)
                .push_bind(obs.salinity)
                .push_bind(obs.odo);
        });
        qb.build().execute(&mut **tx).await?;
    }
    Ok(())
}

impl PgStore {
    // ---
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub async fn insert_many(&self, observations: Vec<Observation>) -> Result<usize> {
        // ---
        let mut tx = self.pool.begin().await?;
        insert_chunks(&mut tx, &observations)
            .await
            .context("Failed to insert observations")?;
        tx.commit().await?;
        Ok(observations.len())
    }

    /// Delete and re-insert in one transaction; on error the old rows stay.
    pub async fn replace_all(&self, observations: Vec<Observation>) -> Result<usize> {
        // ---
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM observations")
            .execute(&mut *tx)
            .await?;
        insert_chunks(&mut tx, &observations)
            .await
            .context("Failed to insert observations")?;
        tx.commit().await?;
        Ok(observations.len())
    }

    pub async fn find_all(&self) -> Result<Vec<Observation>> {
        // ---
        self.find_matching(&Filter::default()).await
    }

    pub async fn find_matching(&self, filter: &Filter) -> Result<Vec<Observation>> {
        // ---
        let mut qb = matching_query(filter);
        let rows = qb
            .build_query_as::<Observation>()
            .fetch_all(&self.pool)
            .await
            .context("Failed to query observations")?;
        Ok(rows)
    }

    pub async fn find_by_filter(&self, filter: &Filter) -> Result<ObservationPage> {
        // ---
        // Count and page must see the same rows, even across a concurrent reload.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let mut count_qb = count_query(filter);
        let count: i64 = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&mut *tx)
            .await
            .context("Failed to count observations")?;

        let mut page_qb = page_query(filter);
        let items = page_qb
            .build_query_as::<Observation>()
            .fetch_all(&mut *tx)
            .await
            .context("Failed to query observations")?;

        tx.commit().await?;
        Ok(ObservationPage::new(count as usize, items))
    }
}
