//! Ingestion pipeline: source bytes → normalizer → cleaner → store.
//!
//! Everything up to the store write happens in memory first. The store is
//! touched exactly once, with `replace_all`, so a failed ingestion leaves the
//! previous contents in place and a successful one becomes visible at once.

use std::io;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{debug, info, info_span, Instrument, Span};
use uuid::Uuid;

use crate::clean::clean;
use crate::config::DataSource;
use crate::models::CleaningReport;
use crate::normalize::Normalizer;
use crate::store::ObservationStore;
use crate::{Config, Observation};

// ---

/// Normalized and cleaned observations, ready for the store.
#[derive(Debug)]
pub struct Prepared {
    pub observations: Vec<Observation>,
    pub rows_read: usize,
    pub report: CleaningReport,
}

/// Result of one completed ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub run_id: Uuid,
    pub rows_read: usize,
    pub rows_rejected: usize,
    pub report: CleaningReport,
}

/// Normalize and clean a CSV source without touching any store.
///
/// Row-level problems are counted and skipped. Fails if the header is
/// unusable, the reader breaks mid-file, or no row survives normalization.
pub fn prepare<R: io::Read>(reader: R, threshold: f64) -> Result<Prepared> {
    // ---
    let normalizer = Normalizer::from_reader(reader)?;

    let mut rows_read = 0;
    let mut rows_rejected = 0;
    let mut observations = Vec::new();

    for (idx, row) in normalizer.enumerate() {
        rows_read += 1;
        let row = row.with_context(|| format!("Failed to read CSV record {}", idx + 1))?;
        match row {
            Ok(obs) => observations.push(obs),
            Err(rejection) => {
                rows_rejected += 1;
                debug!("Skipping CSV record {}: {}", idx + 1, rejection);
            }
        }
    }

    info!(
        "Normalized {} of {} rows ({} rejected)",
        observations.len(),
        rows_read,
        rows_rejected
    );

    if observations.is_empty() {
        bail!("Source contains no usable observations ({rows_read} rows read, {rows_rejected} rejected)");
    }

    let (observations, mut report) = clean(observations, threshold);
    report.rejected_rows = rows_rejected;

    info!("Data cleaning complete:");
    info!("  Original rows            : {}", report.original_count);
    info!("  Rows removed as outliers : {}", report.removed_count);
    info!("  Rows remaining           : {}", report.remaining_count);

    Ok(Prepared {
        observations,
        rows_read,
        report,
    })
}

/// Read the whole source into memory.
///
/// URL sources are fetched with `timeout` bounding both the connect and the
/// whole transfer.
pub async fn load_source(source: &DataSource, timeout: Duration) -> Result<Vec<u8>> {
    // ---
    match source {
        DataSource::File(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read data file '{}'", path.display())),
        DataSource::Url(url) => {
            let client = reqwest::Client::builder()
                .connect_timeout(timeout)
                .timeout(timeout)
                .build()
                .context("Failed to build HTTP client")?;
            let response = client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .with_context(|| format!("Failed to fetch data from '{url}'"))?;
            let body = response
                .bytes()
                .await
                .with_context(|| format!("Failed to read response body from '{url}'"))?;
            Ok(body.to_vec())
        }
    }
}

/// An ingestion that has been loaded and cleaned but not yet stored.
#[derive(Debug)]
pub struct Staged {
    pub run_id: Uuid,
    span: Span,
    prepared: Prepared,
}

/// Load, normalize and clean the configured source. The store is not touched.
pub async fn stage(cfg: &Config) -> Result<Staged> {
    // ---
    let run_id = Uuid::new_v4();
    let span = info_span!("ingest", %run_id);

    let prepared = async {
        info!("Loading raw data from {}", cfg.data_source);
        let bytes = load_source(&cfg.data_source, cfg.fetch_timeout).await?;
        prepare(bytes.as_slice(), cfg.zscore_threshold)
    }
    .instrument(span.clone())
    .await?;

    Ok(Staged {
        run_id,
        span,
        prepared,
    })
}

/// Swap the staged observations into the store in one `replace_all`.
pub async fn commit(staged: Staged, store: &ObservationStore) -> Result<IngestOutcome> {
    // ---
    let Staged {
        run_id,
        span,
        prepared,
    } = staged;

    async move {
        let stored = store
            .replace_all(prepared.observations)
            .await
            .with_context(|| format!("Failed to store observations in {} store", store.backend()))?;
        info!("Stored {} observations in {} store", stored, store.backend());

        Ok::<_, anyhow::Error>(IngestOutcome {
            run_id,
            rows_read: prepared.rows_read,
            rows_rejected: prepared.report.rejected_rows,
            report: prepared.report,
        })
    }
    .instrument(span)
    .await
}

/// Load, normalize, clean and store the configured source.
pub async fn run(cfg: &Config, store: &ObservationStore) -> Result<IngestOutcome> {
    // ---
    let staged = stage(cfg).await?;
    commit(staged, store).await
}
