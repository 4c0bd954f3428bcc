//! In-process observation store.
//!
//! Holds an immutable `Arc<Vec<Observation>>` snapshot behind a lock. Readers
//! clone the `Arc` and work on that snapshot without holding the lock; writers
//! build a complete replacement and swap it in, so a reader never sees a
//! half-written collection.

use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Result};

use crate::query::{self, Filter, ObservationPage};
use crate::Observation;

// ---

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Arc<RwLock<Arc<Vec<Observation>>>>,
}

impl MemoryStore {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Result<Arc<Vec<Observation>>> {
        // ---
        let guard = self
            .snapshot
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(Arc::clone(&guard))
    }

    fn swap(&self, next: Vec<Observation>) -> Result<()> {
        // ---
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        *guard = Arc::new(next);
        Ok(())
    }

    /// Append observations, keeping store order (timestamp, then insertion).
    pub fn insert_many(&self, observations: Vec<Observation>) -> Result<usize> {
        // ---
        let inserted = observations.len();
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;

        let mut next = Vec::with_capacity(guard.len() + inserted);
        next.extend(guard.iter().cloned());
        next.extend(observations);
        next.sort_by_key(|o| o.timestamp);

        *guard = Arc::new(next);
        Ok(inserted)
    }

    /// Replace the whole collection in one swap.
    pub fn replace_all(&self, mut observations: Vec<Observation>) -> Result<usize> {
        // ---
        observations.sort_by_key(|o| o.timestamp);
        let count = observations.len();
        self.swap(observations)?;
        Ok(count)
    }

    pub fn find_matching(&self, filter: &Filter) -> Result<Vec<Observation>> {
        // ---
        let snapshot = self.snapshot()?;
        Ok(snapshot.iter().filter(|o| filter.matches(o)).cloned().collect())
    }

    pub fn find_by_filter(&self, filter: &Filter) -> Result<ObservationPage> {
        // ---
        let snapshot = self.snapshot()?;
        Ok(query::find_observations(&snapshot, filter))
    }
}
