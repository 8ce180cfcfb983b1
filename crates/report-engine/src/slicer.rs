//! Slicers: filter controls over the unaggregated rows.
//!
//! A slicer enumerates the distinct values of one field and writes selections through the same
//! [`FilterSink`] contract click cross-filtering uses, so both share one filter state.

use crate::crossfilter::{toggle, FilterTarget};
use crate::filter::{filter_rows, FilterSet, FilterSink};
use crate::model::Row;
use crate::widget::SlicerConfig;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlicerOption {
    pub value: String,
    pub selected: bool,
}

/// Inclusive date interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, swapping the bounds when they arrive reversed.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Rows a slicer enumerates values from.
///
/// By default every row, so all values stay visible whatever is selected elsewhere. With
/// `respectOtherFilters` the rows are filtered by every dimension except the slicer's own.
pub fn source_rows<'a>(rows: &'a [Row], filters: &FilterSet, config: &SlicerConfig) -> Vec<&'a Row> {
    if config.respect_other_filters {
        filter_rows(rows, &filters.without(config.field.trim()))
    } else {
        rows.iter().collect()
    }
}

/// Distinct string-coerced values of `field`, first-seen order, blanks skipped.
pub fn distinct_values<'a, I>(rows: I, field: &str, sort: bool) -> Vec<String>
where
    I: IntoIterator<Item = &'a Row>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for row in rows {
        let Some(text) = row.value(field).as_text() else {
            continue;
        };
        if text.trim().is_empty() || seen.contains(&*text) {
            continue;
        }
        seen.insert(text.to_string());
        out.push(text.into_owned());
    }
    if sort {
        out.sort_by(|a, b| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });
    }
    out
}

pub fn options(values: Vec<String>, filters: &FilterSet, field: &str) -> Vec<SlicerOption> {
    values
        .into_iter()
        .map(|value| SlicerOption {
            selected: filters.contains(field, &value),
            value,
        })
        .collect()
}

/// Parses the date formats submissions carry: `YYYY-MM-DD`, RFC 3339 timestamps, and
/// `YYYY-MM-DD HH:MM:SS`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.date_naive());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|ts| ts.date())
}

/// Min/max over the values that parse as dates; `None` when none do.
pub fn date_bounds(values: &[String]) -> Option<DateRange> {
    let mut dates = values.iter().filter_map(|v| parse_date(v));
    let first = dates.next()?;
    let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some(DateRange::new(min, max))
}

/// The current selection of a date slicer, as a range over the selected values.
pub fn selected_range(filters: &FilterSet, field: &str) -> Option<DateRange> {
    date_bounds(filters.values(field))
}

/// Every value of `values` that falls inside `range`, keeping their original spelling.
pub fn values_in_range(values: &[String], range: DateRange) -> Vec<String> {
    values
        .iter()
        .filter(|v| parse_date(v).is_some_and(|d| range.contains(d)))
        .cloned()
        .collect()
}

/// Toggles one checklist value for the slicer's field.
pub fn toggle_value(filters: &FilterSet, field: &str, value: &str, sink: &mut dyn FilterSink) {
    let target = FilterTarget {
        dimension: field.to_string(),
        value: value.to_string(),
    };
    sink.set_filter(field, toggle(filters, &target));
}

/// Replaces the slicer's selection with the values inside `range`; `None` clears it.
///
/// A range that matches no value writes an empty list, which removes the restriction rather than
/// hiding every row: an empty range shows everything.
pub fn set_date_range(
    values: &[String],
    field: &str,
    range: Option<DateRange>,
    sink: &mut dyn FilterSink,
) {
    let selection = range
        .map(|range| values_in_range(values, range))
        .unwrap_or_default();
    log::debug!(
        "date slicer on {field} selects {} value(s) for {range:?}",
        selection.len()
    );
    if range.is_some() && selection.is_empty() {
        log::info!("no {field} value falls in {range:?}; clearing the {field} filter");
    }
    sink.set_filter(field, selection);
}
