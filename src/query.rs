//! Query engine over a snapshot of stored observations.
//!
//! Every function here is a pure read: it takes the observations it should
//! look at (the full store, or a filtered subset) and derives a response
//! value. Nothing in this module mutates or caches store contents.
//!
//! Request parameters arrive as strings (`FilterParams`, `OutlierParams`) and
//! are parsed explicitly into [`Filter`] and [`OutlierQuery`]. A value that does
//! not parse is a [`QueryError`], never a silent default.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::models::{CleaningReport, Field, Observation};
use crate::stats::{self, IqrFence, ZScorer};

// ---

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 1000;

/// Range filter plus pagination for one request. All bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    // ---
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub min_sal: Option<f64>,
    pub max_sal: Option<f64>,
    pub min_odo: Option<f64>,
    pub max_odo: Option<f64>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

fn within<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    min.map_or(true, |lo| value >= lo) && max.map_or(true, |hi| value <= hi)
}

impl Filter {
    // ---
    /// `(min, max)` bounds configured for a measured field.
    pub fn range(&self, field: Field) -> (Option<f64>, Option<f64>) {
        // ---
        match field {
            Field::Temperature => (self.min_temp, self.max_temp),
            Field::Salinity => (self.min_sal, self.max_sal),
            Field::Odo => (self.min_odo, self.max_odo),
        }
    }

    pub fn matches(&self, obs: &Observation) -> bool {
        // ---
        within(obs.timestamp, self.start, self.end)
            && Field::ALL.iter().all(|&field| {
                let (min, max) = self.range(field);
                within(obs.value(field), min, max)
            })
    }

    /// Page size after applying the default and the hard ceiling.
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }

    pub fn skip(&self) -> usize {
        self.skip.unwrap_or(0)
    }
}

/// Query-string form of a [`Filter`]; every value still unparsed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    // ---
    pub start: Option<String>,
    pub end: Option<String>,
    pub min_temp: Option<String>,
    pub max_temp: Option<String>,
    pub min_sal: Option<String>,
    pub max_sal: Option<String>,
    pub min_odo: Option<String>,
    pub max_odo: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
}

/// Treat `?min_temp=` the same as an omitted parameter.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number(param: &'static str, value: &Option<String>) -> Result<Option<f64>, QueryError> {
    // ---
    present(value)
        .map(|text| match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(QueryError::InvalidNumber {
                param,
                value: text.to_string(),
            }),
        })
        .transpose()
}

fn parse_count(param: &'static str, value: &Option<String>) -> Result<Option<usize>, QueryError> {
    // ---
    present(value)
        .map(|text| {
            text.parse::<usize>().map_err(|_| QueryError::InvalidCount {
                param,
                value: text.to_string(),
            })
        })
        .transpose()
}

/// Parse a time bound. A bare date means midnight as a start bound and the
/// last instant of that day as an end bound.
fn parse_instant(
    param: &'static str,
    value: &Option<String>,
    end_of_day: bool,
) -> Result<Option<NaiveDateTime>, QueryError> {
    // ---
    let Some(text) = present(value) else {
        return Ok(None);
    };
    let invalid = || QueryError::InvalidTimestamp {
        param,
        value: text.to_string(),
    };
    let trimmed = text.strip_suffix('Z').unwrap_or(text);

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(Some(ts));
        }
    }

    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid())?;
    let time = if end_of_day {
        NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    };
    Ok(Some(date.and_time(time.ok_or_else(invalid)?)))
}

impl TryFrom<&FilterParams> for Filter {
    type Error = QueryError;

    fn try_from(params: &FilterParams) -> Result<Self, Self::Error> {
        // ---
        Ok(Filter {
            start: parse_instant("start", &params.start, false)?,
            end: parse_instant("end", &params.end, true)?,
            min_temp: parse_number("min_temp", &params.min_temp)?,
            max_temp: parse_number("max_temp", &params.max_temp)?,
            min_sal: parse_number("min_sal", &params.min_sal)?,
            max_sal: parse_number("max_sal", &params.max_sal)?,
            min_odo: parse_number("min_odo", &params.min_odo)?,
            max_odo: parse_number("max_odo", &params.max_odo)?,
            limit: parse_count("limit", &params.limit)?,
            skip: parse_count("skip", &params.skip)?,
        })
    }
}

// ---

/// One page of filtered observations plus the unpaginated match count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationPage {
    pub count: usize,
    pub returned: usize,
    pub items: Vec<Observation>,
}

impl ObservationPage {
    pub fn new(count: usize, items: Vec<Observation>) -> Self {
        ObservationPage {
            count,
            returned: items.len(),
            items,
        }
    }
}

/// Filter and paginate `observations`, which must already be in store order
/// (ascending timestamp, ties in insertion order).
pub fn find_observations(observations: &[Observation], filter: &Filter) -> ObservationPage {
    // ---
    let count = observations.iter().filter(|o| filter.matches(o)).count();
    let items = observations
        .iter()
        .filter(|o| filter.matches(o))
        .skip(filter.skip())
        .take(filter.limit())
        .cloned()
        .collect();
    ObservationPage::new(count, items)
}

// ---

/// Describe-style summary of one field. Every value except `count` is `None`
/// when there is no data; `std` (sample) also needs at least two values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

impl FieldStats {
    fn describe(values: &[f64]) -> Self {
        // ---
        let sorted = stats::sorted(values);
        FieldStats {
            count: values.len(),
            mean: stats::mean(values),
            std: stats::sample_std(values),
            min: sorted.first().copied(),
            p25: stats::percentile(&sorted, 0.25),
            p50: stats::percentile(&sorted, 0.50),
            p75: stats::percentile(&sorted, 0.75),
            max: sorted.last().copied(),
        }
    }
}

pub fn compute_stats(observations: &[Observation], fields: &[Field]) -> BTreeMap<Field, FieldStats> {
    // ---
    fields
        .iter()
        .map(|&field| {
            let values: Vec<f64> = observations.iter().map(|o| o.value(field)).collect();
            (field, FieldStats::describe(&values))
        })
        .collect()
}

/// Parse a comma-separated field list; omitted means all fields.
pub fn parse_fields(value: &Option<String>) -> Result<Vec<Field>, QueryError> {
    // ---
    let Some(text) = present(value) else {
        return Ok(Field::ALL.to_vec());
    };
    let mut fields = Vec::new();
    for name in text.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let field = name.parse::<Field>()?;
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
    Ok(fields)
}

// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutlierMethod {
    #[serde(rename = "iqr")]
    Iqr,
    #[serde(rename = "zscore")]
    ZScore,
}

impl OutlierMethod {
    pub fn default_k(&self) -> f64 {
        match self {
            OutlierMethod::Iqr => 1.5,
            OutlierMethod::ZScore => 3.0,
        }
    }
}

impl fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierMethod::Iqr => f.write_str("iqr"),
            OutlierMethod::ZScore => f.write_str("zscore"),
        }
    }
}

impl FromStr for OutlierMethod {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iqr" => Ok(OutlierMethod::Iqr),
            "zscore" => Ok(OutlierMethod::ZScore),
            other => Err(QueryError::UnknownMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierQuery {
    pub field: Field,
    pub method: OutlierMethod,
    pub k: f64,
}

impl OutlierQuery {
    /// Build a query, falling back to the method's default `k`.
    pub fn new(field: Field, method: OutlierMethod, k: Option<f64>) -> Result<Self, QueryError> {
        // ---
        let k = k.unwrap_or_else(|| method.default_k());
        if !k.is_finite() || k < 0.0 {
            return Err(QueryError::InvalidK(k));
        }
        Ok(OutlierQuery { field, method, k })
    }
}

/// Query-string form of an [`OutlierQuery`]. Omitted field and method
/// default to `temperature` and `iqr`; unknown values are errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutlierParams {
    pub field: Option<String>,
    pub method: Option<String>,
    pub k: Option<String>,
}

impl TryFrom<&OutlierParams> for OutlierQuery {
    type Error = QueryError;

    fn try_from(params: &OutlierParams) -> Result<Self, Self::Error> {
        // ---
        let field = present(&params.field)
            .map(str::parse::<Field>)
            .transpose()?
            .unwrap_or(Field::Temperature);
        let method = present(&params.method)
            .map(str::parse::<OutlierMethod>)
            .transpose()?
            .unwrap_or(OutlierMethod::Iqr);
        let k = match present(&params.k) {
            Some(text) => Some(text.parse::<f64>().map_err(|_| QueryError::InvalidNumber {
                param: "k",
                value: text.to_string(),
            })?),
            None => None,
        };
        OutlierQuery::new(field, method, k)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierReport {
    pub method: OutlierMethod,
    pub field: Field,
    pub k: f64,
    pub outlier_count: usize,
    pub outliers: Vec<Observation>,
}

/// Flag outliers in `query.field` using statistics of `observations` itself,
/// so running it over a filtered subset judges records against that subset.
pub fn detect_outliers(observations: &[Observation], query: &OutlierQuery) -> OutlierReport {
    // ---
    let values: Vec<f64> = observations.iter().map(|o| o.value(query.field)).collect();

    let is_outlier: Box<dyn Fn(f64) -> bool> = match query.method {
        OutlierMethod::ZScore => {
            let scorer = ZScorer::fit(&values);
            let k = query.k;
            Box::new(move |v| scorer.score(v).abs() > k)
        }
        OutlierMethod::Iqr => match IqrFence::fit(&values, query.k) {
            Some(fence) => Box::new(move |v| fence.is_outside(v)),
            None => Box::new(|_| false),
        },
    };

    let outliers: Vec<Observation> = observations
        .iter()
        .filter(|o| is_outlier(o.value(query.field)))
        .cloned()
        .collect();

    OutlierReport {
        method: query.method,
        field: query.field,
        k: query.k,
        outlier_count: outliers.len(),
        outliers,
    }
}

// ---

/// Cleaning summary as exposed to API clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub original_rows: usize,
    pub rows_removed: usize,
    pub rows_remaining: usize,
    pub rows_rejected: usize,
    pub cleaning_method: String,
}

pub fn summarize(report: &CleaningReport) -> Summary {
    // ---
    Summary {
        original_rows: report.original_count,
        rows_removed: report.removed_count,
        rows_remaining: report.remaining_count,
        rows_rejected: report.rejected_rows,
        cleaning_method: report.method_description.clone(),
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::test_utils::{base_time, from_tenths, normalish, normalish_observations, observation, rng};
    use approx::assert_relative_eq;
    use chrono::Duration;
    use quickcheck::{quickcheck, TestResult};

    fn temps(temps: &[f64]) -> Vec<Observation> {
        temps
            .iter()
            .enumerate()
            .map(|(i, &t)| observation(i as i64, t, 35.0, 6.0))
            .collect()
    }

    fn params() -> FilterParams {
        FilterParams::default()
    }

    #[test]
    fn test_scenario_503_matching_records() {
        // ---
        let mut data = Vec::new();
        for i in 0..503 {
            data.push(observation(i * 2, 25.0 + (i % 6) as f64, 35.0, 6.0));
        }
        for i in 0..250 {
            data.push(observation(i * 2 + 1, 31.0 + (i % 3) as f64, 35.0, 6.0));
            data.push(observation(2000 + i, 24.99, 35.0, 6.0));
        }
        data.sort_by_key(|o| o.timestamp);

        let filter = Filter {
            min_temp: Some(25.0),
            max_temp: Some(30.0),
            limit: Some(100),
            ..Filter::default()
        };
        let page = find_observations(&data, &filter);

        assert_eq!(page.count, 503);
        assert_eq!(page.returned, 100);
        assert_eq!(page.items.len(), 100);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        // ---
        let data = temps(&[24.9, 25.0, 27.5, 30.0, 30.1]);
        let filter = Filter {
            min_temp: Some(25.0),
            max_temp: Some(30.0),
            ..Filter::default()
        };
        let page = find_observations(&data, &filter);
        let got: Vec<f64> = page.items.iter().map(|o| o.temperature).collect();
        assert_eq!(got, vec![25.0, 27.5, 30.0]);
    }

    #[test]
    fn test_bounds_combine_with_and() {
        // ---
        let data = vec![
            observation(0, 26.0, 30.0, 5.0),
            observation(1, 26.0, 40.0, 5.0),
            observation(2, 26.0, 30.0, 9.0),
            observation(3, 20.0, 30.0, 5.0),
        ];
        let filter = Filter {
            min_temp: Some(25.0),
            max_sal: Some(35.0),
            max_odo: Some(6.0),
            ..Filter::default()
        };
        let page = find_observations(&data, &filter);
        assert_eq!(page.count, 1);
        assert_eq!(page.items[0], data[0]);
    }

    #[test]
    fn test_time_bounds() {
        // ---
        let data = normalish_observations(120, 3);
        let filter = Filter {
            start: Some(base_time() + Duration::minutes(10)),
            end: Some(base_time() + Duration::minutes(19)),
            ..Filter::default()
        };
        let page = find_observations(&data, &filter);
        assert_eq!(page.count, 10);
        assert_eq!(page.items.first().unwrap().timestamp, base_time() + Duration::minutes(10));
        assert_eq!(page.items.last().unwrap().timestamp, base_time() + Duration::minutes(19));
    }

    #[test]
    fn test_empty_match_is_not_an_error() {
        // ---
        let data = normalish_observations(50, 5);
        let filter = Filter {
            min_temp: Some(100.0),
            ..Filter::default()
        };
        assert_eq!(find_observations(&data, &filter), ObservationPage::new(0, Vec::new()));
        assert_eq!(find_observations(&[], &Filter::default()).count, 0);
    }

    #[test]
    fn test_limit_defaults_and_clamps() {
        // ---
        let data = normalish_observations(2500, 9);

        let page = find_observations(&data, &Filter::default());
        assert_eq!(page.count, 2500);
        assert_eq!(page.returned, DEFAULT_LIMIT);

        let huge = Filter {
            limit: Some(5000),
            ..Filter::default()
        };
        assert_eq!(find_observations(&data, &huge).returned, MAX_LIMIT);

        let zero = Filter {
            limit: Some(0),
            ..Filter::default()
        };
        let page = find_observations(&data, &zero);
        assert_eq!((page.count, page.returned), (2500, 0));
    }

    /// Every page of `filter`, fetched `page_size` at a time, concatenated.
    fn all_pages(data: &[Observation], filter: &Filter, page_size: usize) -> Vec<Observation> {
        // ---
        let mut rebuilt = Vec::new();
        let mut skip = 0;
        loop {
            let page = find_observations(
                data,
                &Filter {
                    limit: Some(page_size),
                    skip: Some(skip),
                    ..filter.clone()
                },
            );
            if page.items.is_empty() {
                return rebuilt;
            }
            rebuilt.extend(page.items);
            skip += page_size;
        }
    }

    #[test]
    fn test_pages_reconstruct_full_order() {
        // ---
        let data = normalish_observations(437, 21);
        let base = Filter {
            min_temp: Some(27.5),
            limit: Some(MAX_LIMIT),
            ..Filter::default()
        };
        let full = find_observations(&data, &base).items;
        assert!(full.len() > 100 && full.len() < MAX_LIMIT);

        assert_eq!(all_pages(&data, &base, 37), full);
    }

    quickcheck! {
        fn test_pages_never_gap_or_repeat(temps: Vec<i16>, min_temp: i16, page_size: u8) -> TestResult {
            if page_size == 0 {
                return TestResult::discard();
            }
            let data = from_tenths(&temps);
            let filter = Filter {
                min_temp: Some(f64::from(min_temp) / 10.0),
                ..Filter::default()
            };
            let full: Vec<Observation> = data.iter().filter(|o| filter.matches(o)).cloned().collect();

            TestResult::from_bool(all_pages(&data, &filter, usize::from(page_size)) == full)
        }

        fn test_tightening_bounds_never_grows_count(
            temps: Vec<i16>,
            min_temp: i16,
            max_temp: i16,
            raise: u8,
            lower: u8
        ) -> bool {
            let data = from_tenths(&temps);
            let loose = Filter {
                min_temp: Some(f64::from(min_temp) / 10.0),
                max_temp: Some(f64::from(max_temp) / 10.0),
                ..Filter::default()
            };
            let tight = Filter {
                min_temp: Some((f64::from(min_temp) + f64::from(raise)) / 10.0),
                max_temp: Some((f64::from(max_temp) - f64::from(lower)) / 10.0),
                ..Filter::default()
            };

            find_observations(&data, &tight).count <= find_observations(&data, &loose).count
        }

        fn test_adding_a_bound_never_grows_count(temps: Vec<i16>, max_odo_tenths: i16) -> bool {
            let data = from_tenths(&temps);
            let bounded = Filter {
                max_odo: Some(f64::from(max_odo_tenths) / 10.0),
                ..Filter::default()
            };
            find_observations(&data, &bounded).count <= find_observations(&data, &Filter::default()).count
        }
    }

    #[test]
    fn test_tightening_bounds_is_monotonic() {
        // ---
        let data = normalish_observations(400, 33);
        let mut previous = usize::MAX;
        for step in 0..8 {
            let filter = Filter {
                min_temp: Some(26.0 + 0.25 * step as f64),
                max_sal: Some(37.0 - 0.1 * step as f64),
                ..Filter::default()
            };
            let count = find_observations(&data, &filter).count;
            assert!(count <= previous, "step {step}: {count} > {previous}");
            previous = count;
        }
    }

    #[test]
    fn test_filter_params_parse() {
        // ---
        let p = FilterParams {
            start: Some("2022-10-07T00:00:00".into()),
            end: Some("2022-10-08".into()),
            min_temp: Some("25".into()),
            max_odo: Some(" 7.5 ".into()),
            limit: Some("50".into()),
            skip: Some("".into()),
            ..params()
        };
        let filter = Filter::try_from(&p).unwrap();

        assert_eq!(filter.start, Some(base_time()));
        assert_eq!(
            filter.end,
            Some(
                NaiveDate::from_ymd_opt(2022, 10, 8)
                    .unwrap()
                    .and_hms_nano_opt(23, 59, 59, 999_999_999)
                    .unwrap()
            )
        );
        assert_eq!(filter.min_temp, Some(25.0));
        assert_eq!(filter.max_odo, Some(7.5));
        assert_eq!(filter.limit, Some(50));
        assert_eq!(filter.skip, None);
    }

    #[test]
    fn test_filter_params_accept_common_timestamp_forms() {
        // ---
        let at_nine = base_time() + Duration::hours(9);
        for text in ["2022-10-07T09:00:00", "2022-10-07 09:00:00", "2022-10-07T09:00", "2022-10-07T09:00:00Z"] {
            let p = FilterParams {
                start: Some(text.into()),
                ..params()
            };
            assert_eq!(Filter::try_from(&p).unwrap().start, Some(at_nine), "{text}");
        }
    }

    #[test]
    fn test_filter_params_reject_bad_values() {
        // ---
        let p = FilterParams {
            min_temp: Some("warm".into()),
            ..params()
        };
        assert_eq!(
            Filter::try_from(&p),
            Err(QueryError::InvalidNumber {
                param: "min_temp",
                value: "warm".into()
            })
        );

        let p = FilterParams {
            max_sal: Some("NaN".into()),
            ..params()
        };
        assert!(matches!(Filter::try_from(&p), Err(QueryError::InvalidNumber { param: "max_sal", .. })));

        let p = FilterParams {
            limit: Some("-5".into()),
            ..params()
        };
        assert!(matches!(Filter::try_from(&p), Err(QueryError::InvalidCount { param: "limit", .. })));

        let p = FilterParams {
            end: Some("yesterday".into()),
            ..params()
        };
        assert!(matches!(Filter::try_from(&p), Err(QueryError::InvalidTimestamp { param: "end", .. })));
    }

    #[test]
    fn test_stats_match_describe() {
        // ---
        let data = temps(&[1.0, 2.0, 3.0, 4.0]);
        let stats = compute_stats(&data, &[Field::Temperature]);
        let t = &stats[&Field::Temperature];

        assert_eq!(t.count, 4);
        assert_eq!(t.mean, Some(2.5));
        assert_relative_eq!(t.std.unwrap(), 1.2909944487358056, epsilon = 1e-12);
        assert_eq!(t.min, Some(1.0));
        assert_eq!(t.p25, Some(1.75));
        assert_eq!(t.p50, Some(2.5));
        assert_eq!(t.p75, Some(3.25));
        assert_eq!(t.max, Some(4.0));
        assert!(!stats.contains_key(&Field::Odo));
    }

    #[test]
    fn test_stats_on_empty_input_are_degenerate() {
        // ---
        let stats = compute_stats(&[], &Field::ALL);
        assert_eq!(stats.len(), 3);
        for s in stats.values() {
            assert_eq!(s.count, 0);
            assert_eq!(s.mean, None);
            assert_eq!(s.p50, None);
        }

        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["salinity"]["mean"].is_null());
    }

    #[test]
    fn test_percentiles_ordered_in_stats() {
        // ---
        let data = normalish_observations(333, 17);
        for s in compute_stats(&data, &Field::ALL).values() {
            assert!(s.p25.unwrap() <= s.p50.unwrap());
            assert!(s.p50.unwrap() <= s.p75.unwrap());
            assert!(s.min.unwrap() <= s.p25.unwrap() && s.p75.unwrap() <= s.max.unwrap());
        }
    }

    #[test]
    fn test_parse_fields() {
        // ---
        assert_eq!(parse_fields(&None).unwrap(), Field::ALL.to_vec());
        assert_eq!(
            parse_fields(&Some("odo, temperature,odo".into())).unwrap(),
            vec![Field::Odo, Field::Temperature]
        );
        assert_eq!(
            parse_fields(&Some("odo,ph".into())),
            Err(QueryError::UnknownField("ph".into()))
        );
    }

    /// 200 bounded normal-ish readings plus five far outside the fences.
    fn with_injected_extremes() -> (Vec<Observation>, Vec<Observation>) {
        // ---
        let mut rng = rng(42);
        let mut data: Vec<Observation> = (0..200)
            .map(|i| observation(i, 28.0 + normalish(&mut rng), 36.0, 6.0))
            .collect();
        let extremes = [(13, 40.0), (58, 16.0), (99, 41.5), (150, 15.0), (187, 39.0)];
        for (idx, temp) in extremes {
            data[idx].temperature = temp;
        }
        let expected = extremes.iter().map(|(idx, _)| data[*idx].clone()).collect();
        (data, expected)
    }

    #[test]
    fn test_iqr_flags_exactly_the_injected_extremes() {
        // ---
        let (data, expected) = with_injected_extremes();
        let query = OutlierQuery::new(Field::Temperature, OutlierMethod::Iqr, None).unwrap();
        let report = detect_outliers(&data, &query);

        assert_eq!(report.k, 1.5);
        assert_eq!(report.outlier_count, 5);
        assert_eq!(report.outliers, expected);
    }

    #[test]
    fn test_zscore_flags_exactly_the_injected_extremes() {
        // ---
        let (data, expected) = with_injected_extremes();
        let query = OutlierQuery::new(Field::Temperature, OutlierMethod::ZScore, None).unwrap();
        let report = detect_outliers(&data, &query);

        assert_eq!(report.k, 3.0);
        assert_eq!(report.outliers, expected);
    }

    #[test]
    fn test_zscore_uses_subset_statistics() {
        // ---
        // Against the full set the 27.0 reading is unremarkable; within the
        // narrow filtered subset it stands out.
        let mut values = vec![20.0; 40];
        values.extend((0..40).map(|i| 24.9 + 0.1 * (i % 3) as f64));
        values.push(27.0);
        let data = temps(&values);
        let query = OutlierQuery::new(Field::Temperature, OutlierMethod::ZScore, None).unwrap();

        assert_eq!(detect_outliers(&data, &query).outlier_count, 0);

        let filter = Filter {
            min_temp: Some(24.0),
            limit: Some(MAX_LIMIT),
            ..Filter::default()
        };
        let subset = find_observations(&data, &filter).items;
        let report = detect_outliers(&subset, &query);
        assert_eq!(report.outlier_count, 1);
        assert_eq!(report.outliers[0].temperature, 27.0);
    }

    #[test]
    fn test_outliers_on_empty_and_constant_input() {
        // ---
        for method in [OutlierMethod::Iqr, OutlierMethod::ZScore] {
            let query = OutlierQuery::new(Field::Odo, method, None).unwrap();
            assert_eq!(detect_outliers(&[], &query).outlier_count, 0);
            assert_eq!(detect_outliers(&temps(&[5.0; 12]), &query).outlier_count, 0);
        }
    }

    #[test]
    fn test_outlier_params() {
        // ---
        let defaults = OutlierQuery::try_from(&OutlierParams::default()).unwrap();
        assert_eq!(defaults.field, Field::Temperature);
        assert_eq!(defaults.method, OutlierMethod::Iqr);
        assert_eq!(defaults.k, 1.5);

        let p = OutlierParams {
            field: Some("salinity".into()),
            method: Some("zscore".into()),
            k: None,
        };
        let q = OutlierQuery::try_from(&p).unwrap();
        assert_eq!((q.field, q.method, q.k), (Field::Salinity, OutlierMethod::ZScore, 3.0));

        let p = OutlierParams {
            method: Some("mad".into()),
            ..OutlierParams::default()
        };
        assert_eq!(OutlierQuery::try_from(&p), Err(QueryError::UnknownMethod("mad".into())));

        let p = OutlierParams {
            field: Some("pressure".into()),
            ..OutlierParams::default()
        };
        assert_eq!(OutlierQuery::try_from(&p), Err(QueryError::UnknownField("pressure".into())));

        let p = OutlierParams {
            k: Some("-1".into()),
            ..OutlierParams::default()
        };
        assert_eq!(OutlierQuery::try_from(&p), Err(QueryError::InvalidK(-1.0)));

        let p = OutlierParams {
            k: Some("abc".into()),
            ..OutlierParams::default()
        };
        assert!(matches!(OutlierQuery::try_from(&p), Err(QueryError::InvalidNumber { param: "k", .. })));
    }

    #[test]
    fn test_outlier_report_serializes() {
        // ---
        let data = temps(&[1.0, 1.1, 0.9, 1.0, 50.0]);
        let query = OutlierQuery::new(Field::Temperature, OutlierMethod::Iqr, None).unwrap();
        let json = serde_json::to_value(detect_outliers(&data, &query)).unwrap();

        assert_eq!(json["method"], "iqr");
        assert_eq!(json["field"], "temperature");
        assert_eq!(json["k"], 1.5);
        assert_eq!(json["outlier_count"], 1);
        assert_eq!(json["outliers"][0]["temperature"], 50.0);
        assert_eq!(json["outliers"][0]["salinity"], 35.0);
    }

    #[test]
    fn test_summarize_is_verbatim() {
        // ---
        let report = CleaningReport {
            original_count: 1000,
            removed_count: 12,
            remaining_count: 988,
            rejected_rows: 4,
            method_description: "z-score with threshold 3.0".into(),
        };
        assert_eq!(
            summarize(&report),
            Summary {
                original_rows: 1000,
                rows_removed: 12,
                rows_remaining: 988,
                rows_rejected: 4,
                cleaning_method: "z-score with threshold 3.0".into(),
            }
        );
    }
}
