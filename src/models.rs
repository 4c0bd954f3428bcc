//! Simple data models for the water-quality pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

// ---

/// One cleaned sensor reading, as held by the store and served by the API.
///
/// `timestamp` is the instrument's local wall-clock time, built from the
/// separate date and time columns of the source CSV. It serializes as an
/// ISO-8601 string (`2022-10-07T09:12:33`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Observation {
    // ---
    pub timestamp: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: f64,
    pub salinity: f64,
    pub odo: f64,
}

impl Observation {
    // ---
    pub fn value(&self, field: Field) -> f64 {
        // ---
        match field {
            Field::Temperature => self.temperature,
            Field::Salinity => self.salinity,
            Field::Odo => self.odo,
        }
    }
}

/// The measured quantities that can be analysed (stats, outliers, cleaning).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Temperature,
    Salinity,
    Odo,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Temperature, Field::Salinity, Field::Odo];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Temperature => "temperature",
            Field::Salinity => "salinity",
            Field::Odo => "odo",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // ---
        match s {
            "temperature" => Ok(Field::Temperature),
            "salinity" => Ok(Field::Salinity),
            "odo" => Ok(Field::Odo),
            other => Err(QueryError::UnknownField(other.to_string())),
        }
    }
}

/// Outcome of one ingestion-time cleaning pass.
///
/// Counts refer to normalized observations, so
/// `original_count == removed_count + remaining_count` always holds.
/// `rejected_rows` counts source rows the normalizer dropped before cleaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningReport {
    // ---
    pub original_count: usize,
    pub removed_count: usize,
    pub remaining_count: usize,
    pub rejected_rows: usize,
    pub method_description: String,
}
