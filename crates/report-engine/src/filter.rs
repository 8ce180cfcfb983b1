//! Report-wide cross-filter state and the row combinator that applies it.
//!
//! A [`FilterSet`] maps a dimension (field name) to the list of string values that are allowed
//! for it. Values within one dimension are OR'ed together, dimensions are AND'ed. A dimension
//! whose list is empty does not restrict anything, so "select nothing" and "no filter" are the
//! same state and the set normalizes them away.
//!
//! The set is a value type: every operation that changes it returns a new set. The report view
//! owns the current set and is the only writer; widgets request changes through a
//! [`FilterSink`].

use crate::aggregate::{MISSING_GROUP_LABEL, MISSING_SERIES_LABEL};
use crate::model::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct FilterSet {
    dimensions: BTreeMap<String, Vec<String>>,
}

impl FilterSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when no dimension restricts the dataset.
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Allowed values for `dimension` (empty when unrestricted).
    pub fn values(&self, dimension: &str) -> &[String] {
        self.dimensions
            .get(dimension)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, dimension: &str, value: &str) -> bool {
        self.values(dimension).iter().any(|v| v == value)
    }

    pub fn active_dimensions(&self) -> impl Iterator<Item = &str> {
        self.dimensions.keys().map(String::as_str)
    }

    /// Returns a copy with `dimension` restricted to exactly `values`.
    ///
    /// An empty `values` list removes the restriction. Duplicates are dropped, keeping the first
    /// occurrence.
    pub fn with_values(&self, dimension: &str, values: Vec<String>) -> Self {
        let mut next = self.clone();
        next.set(dimension, values);
        next
    }

    pub fn with_column_in<I, S>(mut self, dimension: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(dimension, values.into_iter().map(Into::into).collect());
        self
    }

    pub fn without(&self, dimension: &str) -> Self {
        let mut next = self.clone();
        next.dimensions.remove(dimension);
        next
    }

    pub fn cleared(&self) -> Self {
        Self::empty()
    }

    fn set(&mut self, dimension: &str, values: Vec<String>) {
        let mut deduped: Vec<String> = Vec::with_capacity(values.len());
        for value in values {
            if !deduped.contains(&value) {
                deduped.push(value);
            }
        }
        if deduped.is_empty() {
            self.dimensions.remove(dimension);
        } else {
            self.dimensions.insert(dimension.to_string(), deduped);
        }
    }

    /// Whether `row` passes every active dimension.
    ///
    /// A missing field passes when `""` or one of the labels aggregation groups missing values
    /// under ([`MISSING_GROUP_LABEL`], [`MISSING_SERIES_LABEL`]) was selected, so clicking such a
    /// group selects the rows it was built from.
    pub fn matches(&self, row: &Row) -> bool {
        self.dimensions
            .iter()
            .all(|(dimension, allowed)| match row.value(dimension).as_text() {
                Some(value) => allowed.iter().any(|v| v.as_str() == &*value),
                None => allowed.iter().any(|v| selects_missing(v)),
            })
    }
}

impl From<BTreeMap<String, Vec<String>>> for FilterSet {
    fn from(map: BTreeMap<String, Vec<String>>) -> Self {
        let mut out = FilterSet::empty();
        for (dimension, values) in map {
            out.set(&dimension, values);
        }
        out
    }
}

impl From<FilterSet> for BTreeMap<String, Vec<String>> {
    fn from(filters: FilterSet) -> Self {
        filters.dimensions
    }
}

/// The single write path into report filter state.
///
/// Replaces the complete allowed-value list for one dimension; an empty list clears it.
pub trait FilterSink {
    fn set_filter(&mut self, dimension: &str, values: Vec<String>);
}

impl<F> FilterSink for F
where
    F: FnMut(&str, Vec<String>),
{
    fn set_filter(&mut self, dimension: &str, values: Vec<String>) {
        self(dimension, values)
    }
}

impl FilterSink for FilterSet {
    fn set_filter(&mut self, dimension: &str, values: Vec<String>) {
        self.set(dimension, values);
    }
}

fn selects_missing(value: &str) -> bool {
    value.is_empty() || value == MISSING_GROUP_LABEL || value == MISSING_SERIES_LABEL
}

/// Applies `filters` to `rows`, preserving input order. Rows are borrowed, never modified.
pub fn filter_rows<'a>(rows: &'a [Row], filters: &FilterSet) -> Vec<&'a Row> {
    if filters.is_empty() {
        return rows.iter().collect();
    }
    let out: Vec<&Row> = rows.iter().filter(|row| filters.matches(row)).collect();
    log::debug!(
        "filtered {} rows down to {} across {} dimension(s)",
        rows.len(),
        out.len(),
        filters.dimensions.len()
    );
    out
}
