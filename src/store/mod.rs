//! Observation store gateway.
//!
//! The rest of the crate talks to [`ObservationStore`] only; which backend
//! sits behind it is decided once at startup:
//! - `memory`: default, process-local, lost on restart
//! - `postgres`: selected when `DATABASE_URL` is configured
//!
//! Both backends return observations in the same store order (ascending
//! timestamp, insertion order on ties) and give identical filter results.

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;

use crate::query::{Filter, ObservationPage};
use crate::Observation;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

// ---

#[derive(Debug, Clone)]
pub enum ObservationStore {
    Memory(MemoryStore),
    Postgres(PgStore),
}

impl ObservationStore {
    // ---
    pub fn in_memory() -> Self {
        ObservationStore::Memory(MemoryStore::new())
    }

    pub fn postgres(pool: PgPool) -> Self {
        ObservationStore::Postgres(PgStore::new(pool))
    }

    pub fn backend(&self) -> &'static str {
        match self {
            ObservationStore::Memory(_) => "memory",
            ObservationStore::Postgres(_) => "postgres",
        }
    }

    pub async fn insert_many(&self, observations: Vec<Observation>) -> Result<usize> {
        // ---
        match self {
            ObservationStore::Memory(store) => store.insert_many(observations),
            ObservationStore::Postgres(store) => store.insert_many(observations).await,
        }
    }

    /// Atomically swap the stored collection for `observations`.
    /// On error the previous contents are untouched.
    pub async fn replace_all(&self, observations: Vec<Observation>) -> Result<usize> {
        // ---
        match self {
            ObservationStore::Memory(store) => store.replace_all(observations),
            ObservationStore::Postgres(store) => store.replace_all(observations).await,
        }
    }

    pub async fn find_all(&self) -> Result<Arc<Vec<Observation>>> {
        // ---
        match self {
            ObservationStore::Memory(store) => store.snapshot(),
            ObservationStore::Postgres(store) => Ok(Arc::new(store.find_all().await?)),
        }
    }

    /// Every observation passing the filter's bounds; pagination is ignored.
    pub async fn find_matching(&self, filter: &Filter) -> Result<Vec<Observation>> {
        // ---
        match self {
            ObservationStore::Memory(store) => store.find_matching(filter),
            ObservationStore::Postgres(store) => store.find_matching(filter).await,
        }
    }

    pub async fn find_by_filter(&self, filter: &Filter) -> Result<ObservationPage> {
        // ---
        match self {
            ObservationStore::Memory(store) => store.find_by_filter(filter),
            ObservationStore::Postgres(store) => store.find_by_filter(filter).await,
        }
    }
}
