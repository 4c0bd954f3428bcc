//! Record normalizer: raw CSV rows to canonical [`Observation`]s.
//!
//! Instrument exports name their columns inconsistently (`"Temperature (c)"`,
//! `"Temp °C"`, `"Date m/d/y   "`). Headers are reduced to a canonical form
//! (ASCII letters and digits, lower-cased) and matched against a static alias
//! table once per source. Rows are then read by column index.
//!
//! A row that cannot produce a complete observation is rejected, not fatal.
//! A header that lacks a required column is fatal for the whole source.

use std::fmt;
use std::io;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::ByteRecord;
use thiserror::Error;

use crate::Observation;

// ---

/// Source columns needed to build an [`Observation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Date,
    Time,
    Latitude,
    Longitude,
    Temperature,
    Salinity,
    Odo,
}

impl Column {
    const ALL: [Column; 7] = [
        Column::Date,
        Column::Time,
        Column::Latitude,
        Column::Longitude,
        Column::Temperature,
        Column::Salinity,
        Column::Odo,
    ];

    /// Accepted header spellings, canonical form, most specific first.
    fn aliases(&self) -> &'static [&'static str] {
        // ---
        match self {
            Column::Date => &["datemdy", "date"],
            Column::Time => &["timehhmmss", "time"],
            Column::Latitude => &["latitude", "lat"],
            Column::Longitude => &["longitude", "lon", "long", "lng"],
            Column::Temperature => &[
                "temperaturec",
                "temperature",
                "temp",
                "tempc",
                "watertemperature",
            ],
            Column::Salinity => &["salinityppt", "salinity", "sal"],
            Column::Odo => &["odomgl", "odo", "dissolvedoxygen", "dissolvedoxygenmgl"],
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::Time => "time",
            Column::Latitude => "latitude",
            Column::Longitude => "longitude",
            Column::Temperature => "temperature",
            Column::Salinity => "salinity",
            Column::Odo => "odo",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a single row was excluded from ingestion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("missing {0}")]
    Missing(Column),

    #[error("unparseable {column}: '{value}'")]
    Unparseable { column: Column, value: String },
}

/// Spellings pandas-style exports use for an empty cell.
const MISSING_MARKERS: [&str; 6] = ["na", "n/a", "nan", "null", "none", "#n/a"];

fn canonicalize(header: &str) -> String {
    // ---
    header
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ---

/// Header positions of every required column, resolved once per source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    indices: [usize; 7],
}

impl ColumnMap {
    /// Match a header row against the alias table.
    ///
    /// Fails if any required column has no matching header.
    pub fn resolve<'h, I>(headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'h str>,
    {
        // ---
        let canonical: Vec<String> = headers.into_iter().map(canonicalize).collect();

        let mut indices = [0usize; 7];
        let mut missing = Vec::new();

        for column in Column::ALL {
            let found = column
                .aliases()
                .iter()
                .find_map(|alias| canonical.iter().position(|h| h == alias));
            match found {
                Some(idx) => indices[column as usize] = idx,
                None => missing.push(column.name()),
            }
        }

        if !missing.is_empty() {
            bail!(
                "source is missing required column(s): {} (found headers: {:?})",
                missing.join(", "),
                canonical
            );
        }
        Ok(ColumnMap { indices })
    }

    fn index(&self, column: Column) -> usize {
        self.indices[column as usize]
    }

    fn text<'r>(&self, record: &'r ByteRecord, column: Column) -> Result<&'r str, Rejection> {
        // ---
        let raw = record
            .get(self.index(column))
            .ok_or(Rejection::Missing(column))?;
        let text = std::str::from_utf8(raw)
            .map_err(|_| Rejection::Unparseable {
                column,
                value: String::from_utf8_lossy(raw).into_owned(),
            })?
            .trim();

        if text.is_empty() || MISSING_MARKERS.iter().any(|m| text.eq_ignore_ascii_case(m)) {
            return Err(Rejection::Missing(column));
        }
        Ok(text)
    }

    fn number(&self, record: &ByteRecord, column: Column) -> Result<f64, Rejection> {
        // ---
        let text = self.text(record, column)?;
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(Rejection::Unparseable {
                column,
                value: text.to_string(),
            }),
        }
    }

    fn timestamp(&self, record: &ByteRecord) -> Result<NaiveDateTime, Rejection> {
        // ---
        let date_text = self.text(record, Column::Date)?;
        let time_text = self.text(record, Column::Time)?;

        let date = parse_date(date_text).ok_or_else(|| Rejection::Unparseable {
            column: Column::Date,
            value: date_text.to_string(),
        })?;
        let time = parse_time(time_text).ok_or_else(|| Rejection::Unparseable {
            column: Column::Time,
            value: time_text.to_string(),
        })?;
        Ok(date.and_time(time))
    }

    /// Build one observation from a record, or say why not.
    pub fn normalize(&self, record: &ByteRecord) -> Result<Observation, Rejection> {
        // ---
        Ok(Observation {
            timestamp: self.timestamp(record)?,
            latitude: self.number(record, Column::Latitude)?,
            longitude: self.number(record, Column::Longitude)?,
            temperature: self.number(record, Column::Temperature)?,
            salinity: self.number(record, Column::Salinity)?,
            odo: self.number(record, Column::Odo)?,
        })
    }
}

/// `m/d/y` with a two- or four-digit year.
fn parse_date(text: &str) -> Option<NaiveDate> {
    // ---
    NaiveDate::parse_from_str(text, "%m/%d/%y")
        .or_else(|_| NaiveDate::parse_from_str(text, "%m/%d/%Y"))
        .ok()
}

/// `hh:mm:ss` (optionally fractional), or `hh:mm`.
fn parse_time(text: &str) -> Option<NaiveTime> {
    // ---
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .ok()
}

// ---

/// Lazy, single-pass stream of normalized rows from a CSV source.
///
/// Yields `Err` only for reader-level failures (I/O, broken quoting);
/// the inner `Result` carries row-level rejections.
pub struct Normalizer<R> {
    records: csv::ByteRecordsIntoIter<R>,
    columns: ColumnMap,
}

impl<R: io::Read> Normalizer<R> {
    /// Read the header row and resolve the column map.
    pub fn from_reader(reader: R) -> Result<Self> {
        // ---
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader
            .byte_headers()
            .context("Failed to read CSV header row")?
            .clone();
        let headers: Vec<String> = headers
            .iter()
            .map(|h| String::from_utf8_lossy(h).into_owned())
            .collect();
        let columns = ColumnMap::resolve(headers.iter().map(String::as_str))?;

        Ok(Normalizer {
            records: reader.into_byte_records(),
            columns,
        })
    }
}

impl<R: io::Read> Iterator for Normalizer<R> {
    type Item = csv::Result<Result<Observation, Rejection>>;

    fn next(&mut self) -> Option<Self::Item> {
        // ---
        let record = self.records.next()?;
        Some(record.map(|r| self.columns.normalize(&r)))
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    const ASV_HEADER: &str =
        "Date m/d/y   ,Time hh:mm:ss,Latitude,Longitude,Temperature (c),Salinity (ppt),ODO mg/L";

    fn normalize_all(csv: &str) -> Vec<Result<Observation, Rejection>> {
        // ---
        Normalizer::from_reader(csv.as_bytes())
            .unwrap()
            .map(|row| row.unwrap())
            .collect()
    }

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_asv_export_headers_resolve() {
        // ---
        let csv = format!("{ASV_HEADER}\n10/07/22,09:12:33,25.91,-80.13,28.4,36.1,6.2\n");
        let rows = normalize_all(&csv);

        assert_eq!(
            rows,
            vec![Ok(Observation {
                timestamp: ts(2022, 10, 7, 9, 12, 33),
                latitude: 25.91,
                longitude: -80.13,
                temperature: 28.4,
                salinity: 36.1,
                odo: 6.2,
            })]
        );
    }

    #[test]
    fn test_alias_matching_is_case_and_format_tolerant() {
        // ---
        let headers = [
            "ODO % sat", "odo (mg/L)", "TEMP °C", "sal", "LAT", "Lng", "time", "DATE",
        ];
        let map = ColumnMap::resolve(headers).unwrap();

        assert_eq!(map.index(Column::Odo), 1);
        assert_eq!(map.index(Column::Temperature), 2);
        assert_eq!(map.index(Column::Salinity), 3);
        assert_eq!(map.index(Column::Latitude), 4);
        assert_eq!(map.index(Column::Longitude), 5);
        assert_eq!(map.index(Column::Time), 6);
        assert_eq!(map.index(Column::Date), 7);
    }

    #[test]
    fn test_more_specific_alias_wins() {
        // ---
        let headers = ["Date", "Time", "Lat", "Lon", "Temp", "Temperature (c)", "Sal", "ODO"];
        let map = ColumnMap::resolve(headers).unwrap();
        assert_eq!(map.index(Column::Temperature), 5);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        // ---
        let csv = "Date,Time,Latitude,Longitude,Temperature,ODO\n10/07/22,09:00:00,1,2,3,4\n";
        let err = Normalizer::from_reader(csv.as_bytes()).err().unwrap();
        assert!(err.to_string().contains("salinity"), "{err}");
    }

    #[test]
    fn test_empty_source_is_fatal() {
        // ---
        assert!(Normalizer::from_reader("".as_bytes()).is_err());
    }

    #[test]
    fn test_ten_rows_two_missing_temperature() {
        // ---
        let mut csv = String::from(ASV_HEADER);
        csv.push('\n');
        for i in 0..10 {
            let temp = if i == 3 || i == 7 { String::new() } else { format!("{}.5", 20 + i) };
            csv.push_str(&format!(
                "10/07/2022,10:{i:02}:00,25.9,-80.1,{temp},36.0,6.0\n"
            ));
        }

        let rows = normalize_all(&csv);
        let accepted = rows.iter().filter(|r| r.is_ok()).count();
        let rejected: Vec<_> = rows.iter().filter_map(|r| r.clone().err()).collect();

        assert_eq!(accepted, 8);
        assert_eq!(
            rejected,
            vec![
                Rejection::Missing(Column::Temperature),
                Rejection::Missing(Column::Temperature)
            ]
        );
    }

    #[test]
    fn test_bad_timestamps_are_rejected() {
        // ---
        let csv = format!(
            "{ASV_HEADER}\n\
             13/45/22,09:00:00,1,2,3,4,5\n\
             10/07/22,25:99:00,1,2,3,4,5\n\
             ,09:00:00,1,2,3,4,5\n\
             10/7/2022,9:05,1,2,3,4,5\n"
        );
        let rows = normalize_all(&csv);

        assert!(matches!(
            rows[0],
            Err(Rejection::Unparseable { column: Column::Date, .. })
        ));
        assert!(matches!(
            rows[1],
            Err(Rejection::Unparseable { column: Column::Time, .. })
        ));
        assert_eq!(rows[2], Err(Rejection::Missing(Column::Date)));
        assert_eq!(rows[3].as_ref().unwrap().timestamp, ts(2022, 10, 7, 9, 5, 0));
    }

    #[test]
    fn test_non_numeric_and_missing_markers_are_rejected() {
        // ---
        let csv = format!(
            "{ASV_HEADER}\n\
             10/07/22,09:00:00,abc,2,3,4,5\n\
             10/07/22,09:00:00,1,2,NaN,4,5\n\
             10/07/22,09:00:00,1,2,3,inf,5\n\
             10/07/22,09:00:00,1,2\n"
        );
        let rows = normalize_all(&csv);

        assert_eq!(
            rows[0],
            Err(Rejection::Unparseable {
                column: Column::Latitude,
                value: "abc".to_string()
            })
        );
        assert_eq!(rows[1], Err(Rejection::Missing(Column::Temperature)));
        assert!(matches!(
            rows[2],
            Err(Rejection::Unparseable { column: Column::Salinity, .. })
        ));
        assert_eq!(rows[3], Err(Rejection::Missing(Column::Temperature)));
    }

    #[test]
    fn test_invalid_utf8_is_a_row_rejection() {
        // ---
        let mut bytes = format!("{ASV_HEADER}\n10/07/22,09:00:00,1,2,").into_bytes();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b",4,5\n10/07/22,09:00:01,1,2,3,4,5\n");

        let rows: Vec<_> = Normalizer::from_reader(bytes.as_slice())
            .unwrap()
            .map(|r| r.unwrap())
            .collect();

        assert!(matches!(
            rows[0],
            Err(Rejection::Unparseable { column: Column::Temperature, .. })
        ));
        assert!(rows[1].is_ok());
    }
}
