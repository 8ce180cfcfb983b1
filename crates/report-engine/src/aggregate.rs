//! Grouping + aggregation for categorical widgets.
//!
//! The engine makes a single pass over the (already filtered) rows:
//! - rows are grouped by the text of the widget's x field, in first-seen order
//! - inside a group, rows are split by the legend field into series (or a single primary series)
//! - one [`Accumulator`] per (group, series) tracks sum/count/min/max of the y field
//! - an optional series-independent accumulator per group tracks the secondary (overlay) field
//!
//! Groups are then finalized with the configured aggregation, sorted, and truncated to `topN`.

use crate::error::{ReportError, ReportResult};
use crate::model::{find_field, FieldDescriptor, Row};
use crate::widget::ChartConfig;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Group label used when a row has no value for the x field.
pub const MISSING_GROUP_LABEL: &str = "N/A";
/// Series label used when a row has no value for the legend field.
pub const MISSING_SERIES_LABEL: &str = "Other";

/// Aggregation function applied to a measure.
///
/// `Auto` is only meaningful in widget configs; it is resolved against the field metadata via
/// [`Aggregation::resolve`] before any value is finalized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Auto,
    Count,
    Sum,
    #[serde(alias = "average", alias = "mean")]
    Avg,
    Min,
    Max,
}

impl Aggregation {
    /// Resolves `Auto`: `Sum` for fields marked as measures, `Count` otherwise (including when the
    /// field is unknown).
    pub fn resolve(self, field: Option<&FieldDescriptor>) -> Aggregation {
        match self {
            Aggregation::Auto => {
                if field.is_some_and(|f| f.is_measure) {
                    Aggregation::Sum
                } else {
                    Aggregation::Count
                }
            }
            other => other,
        }
    }

    /// Verb used in axis and legend labels ("Sum of Sales").
    pub fn verb(self) -> &'static str {
        match self {
            Aggregation::Auto | Aggregation::Count => "Count",
            Aggregation::Sum => "Sum",
            Aggregation::Avg => "Average",
            Aggregation::Min => "Minimum",
            Aggregation::Max => "Maximum",
        }
    }
}

/// Sort order for aggregated groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// By x-value text, A→Z.
    Ascending,
    /// By x-value text, Z→A.
    Descending,
    ValueAsc,
    ValueDesc,
}

/// Identifies one series of an aggregated row.
///
/// The primary series is a distinct variant instead of a reserved string so a dataset value can
/// never collide with it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum SeriesKey {
    Primary,
    Legend(String),
}

impl SeriesKey {
    pub fn is_primary(&self) -> bool {
        matches!(self, SeriesKey::Primary)
    }

    pub fn legend_value(&self) -> Option<&str> {
        match self {
            SeriesKey::Primary => None,
            SeriesKey::Legend(value) => Some(value),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesValue {
    pub key: SeriesKey,
    pub value: f64,
}

/// One output row per distinct x-value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedRow {
    pub x_value: String,
    pub series: Vec<SeriesValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_value: Option<f64>,
}

impl AggregatedRow {
    pub fn value(&self, key: &SeriesKey) -> Option<f64> {
        self.series.iter().find(|s| &s.key == key).map(|s| s.value)
    }

    /// Value of the first series (the only one for single-series widgets), `0` when absent.
    pub fn primary_value(&self) -> f64 {
        self.series.first().map(|s| s.value).unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.series.iter().map(|s| s.value).sum()
    }
}

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn update(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        if x < self.min {
            self.min = x;
        }
        if x > self.max {
            self.max = x;
        }
    }

    /// Empty accumulators finalize to `0` for every aggregation; the infinities used as min/max
    /// seeds never escape.
    fn finalize(&self, agg: Aggregation) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        match agg {
            Aggregation::Auto | Aggregation::Count => self.count as f64,
            Aggregation::Sum => self.sum,
            Aggregation::Avg => self.sum / self.count as f64,
            Aggregation::Min => self.min,
            Aggregation::Max => self.max,
        }
    }
}

struct Group {
    x_value: String,
    cells: Vec<Accumulator>,
    secondary: Accumulator,
}

fn non_empty(key: Option<&str>) -> Option<&str> {
    key.map(str::trim).filter(|k| !k.is_empty())
}

/// Groups and aggregates `rows` for a categorical widget.
///
/// Returns an empty vector when the widget has no x field or there are no rows. A value sort over
/// several series fails with [`ReportError::AmbiguousSortTarget`] when `sortSeries` is unset and
/// with [`ReportError::UnknownSortSeries`] when it names none of them.
pub fn aggregate<'a, I>(
    rows: I,
    config: &ChartConfig,
    fields: &[FieldDescriptor],
) -> ReportResult<Vec<AggregatedRow>>
where
    I: IntoIterator<Item = &'a Row>,
{
    let Some(x_key) = non_empty(config.x_key.as_deref()) else {
        return Ok(Vec::new());
    };
    let y_key = non_empty(config.y_key.as_deref());
    let legend_key = non_empty(config.legend_key.as_deref());
    let secondary_key = non_empty(config.secondary_y_key.as_deref());

    let mut series_keys: Vec<SeriesKey> = Vec::new();
    let mut series_index: HashMap<SeriesKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();
    let mut group_index: HashMap<String, usize> = HashMap::new();
    let mut row_count = 0usize;

    for row in rows {
        row_count += 1;
        let x_value = row.value(x_key).text_or(MISSING_GROUP_LABEL);
        let group_idx = match group_index.get(&x_value) {
            Some(idx) => *idx,
            None => {
                let idx = groups.len();
                group_index.insert(x_value.clone(), idx);
                groups.push(Group {
                    x_value,
                    cells: Vec::new(),
                    secondary: Accumulator::new(),
                });
                idx
            }
        };

        let series = match legend_key {
            Some(legend) => SeriesKey::Legend(row.value(legend).text_or(MISSING_SERIES_LABEL)),
            None => SeriesKey::Primary,
        };
        let series_idx = match series_index.get(&series) {
            Some(idx) => *idx,
            None => {
                let idx = series_keys.len();
                series_index.insert(series.clone(), idx);
                series_keys.push(series);
                idx
            }
        };

        let y = y_key.map(|k| row.value(k).coerce_number()).unwrap_or(0.0);
        let group = &mut groups[group_idx];
        if group.cells.len() <= series_idx {
            group.cells.resize(series_idx + 1, Accumulator::new());
        }
        group.cells[series_idx].update(y);

        if let Some(secondary) = secondary_key {
            group.secondary.update(row.value(secondary).coerce_number());
        }
    }

    if groups.is_empty() {
        return Ok(Vec::new());
    }

    let y_agg = config.y_aggregation.resolve(y_key.and_then(|k| find_field(fields, k)));
    let secondary_agg = config
        .secondary_y_aggregation
        .resolve(secondary_key.and_then(|k| find_field(fields, k)));

    let mut out: Vec<AggregatedRow> = groups
        .into_iter()
        .map(|group| {
            let series = series_keys
                .iter()
                .enumerate()
                .map(|(idx, key)| SeriesValue {
                    key: key.clone(),
                    value: group
                        .cells
                        .get(idx)
                        .copied()
                        .unwrap_or_else(Accumulator::new)
                        .finalize(y_agg),
                })
                .collect();
            AggregatedRow {
                x_value: group.x_value,
                series,
                secondary_value: secondary_key.map(|_| group.secondary.finalize(secondary_agg)),
            }
        })
        .collect();

    if let Some(sort_by) = config.sort_by {
        sort_rows(&mut out, sort_by, &series_keys, config.sort_series.as_deref())?;
    }

    if let Some(top_n) = config.top_n.filter(|n| *n > 0) {
        out.truncate(top_n);
    }

    log::debug!(
        "aggregated {row_count} rows into {} group(s) x {} series by {x_key} ({y_agg:?})",
        out.len(),
        series_keys.len()
    );
    Ok(out)
}

fn sort_rows(
    rows: &mut [AggregatedRow],
    sort_by: SortBy,
    series_keys: &[SeriesKey],
    sort_series: Option<&str>,
) -> ReportResult<()> {
    match sort_by {
        SortBy::Ascending => rows.sort_by(|a, b| cmp_label(&a.x_value, &b.x_value)),
        SortBy::Descending => rows.sort_by(|a, b| cmp_label(&b.x_value, &a.x_value)),
        SortBy::ValueAsc | SortBy::ValueDesc => {
            let target = sort_target(series_keys, sort_series)?;
            let key = |row: &AggregatedRow| OrderedFloat(row.value(&target).unwrap_or(0.0));
            if sort_by == SortBy::ValueAsc {
                rows.sort_by(|a, b| key(a).cmp(&key(b)));
            } else {
                rows.sort_by(|a, b| key(b).cmp(&key(a)));
            }
        }
    }
    Ok(())
}

/// Picks the series a value sort orders by. A single series is always the target; with more than
/// one the widget must name an existing series.
fn sort_target(series_keys: &[SeriesKey], sort_series: Option<&str>) -> ReportResult<SeriesKey> {
    if let [only] = series_keys {
        return Ok(only.clone());
    }
    let legend_values = || -> Vec<String> {
        series_keys
            .iter()
            .filter_map(|k| k.legend_value().map(str::to_string))
            .collect()
    };
    let Some(name) = non_empty(sort_series) else {
        return Err(ReportError::AmbiguousSortTarget {
            series: legend_values(),
        });
    };
    series_keys
        .iter()
        .find(|k| k.legend_value() == Some(name))
        .cloned()
        .ok_or_else(|| ReportError::UnknownSortSeries {
            name: name.to_string(),
            series: legend_values(),
        })
}

/// Case-insensitive label ordering with a case-sensitive tiebreak so the order stays total.
fn cmp_label(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}
