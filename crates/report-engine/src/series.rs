//! Legend series discovery and deterministic color assignment.

use crate::aggregate::{AggregatedRow, SeriesKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Built-in categorical palette, used when the report theme does not provide one.
pub const DEFAULT_PALETTE: [&str; 10] = [
    "#4f46e5", // indigo
    "#10b981", // emerald
    "#f59e0b", // amber
    "#ef4444", // red
    "#06b6d4", // cyan
    "#8b5cf6", // violet
    "#ec4899", // pink
    "#84cc16", // lime
    "#f97316", // orange
    "#64748b", // slate
];

pub fn default_palette() -> Vec<String> {
    DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
}

/// Series keys of an aggregated result, in legend order.
///
/// Every aggregated row carries every discovered series, so the first row is authoritative. The
/// x-value and the secondary overlay live in their own fields and never show up here.
pub fn series_keys(rows: &[AggregatedRow]) -> Vec<SeriesKey> {
    rows.first()
        .map(|row| row.series.iter().map(|s| s.key.clone()).collect())
        .unwrap_or_default()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeriesLayout {
    /// One bar/line/slice per x-value.
    Single,
    /// One grouped/stacked element per series.
    Multi,
}

impl SeriesLayout {
    pub fn of(keys: &[SeriesKey]) -> Self {
        match keys {
            [SeriesKey::Primary] => SeriesLayout::Single,
            _ => SeriesLayout::Multi,
        }
    }
}

/// Color for the series at `index`: the configured override when present, else the palette
/// entry, cycling. An empty palette falls back to [`DEFAULT_PALETTE`].
///
/// Overrides are keyed by legend value; the primary series is looked up under `primary_field`
/// (the widget's y field).
pub fn series_color(
    key: &SeriesKey,
    index: usize,
    palette: &[String],
    overrides: &BTreeMap<String, String>,
    primary_field: Option<&str>,
) -> String {
    let override_key = match key {
        SeriesKey::Primary => primary_field,
        SeriesKey::Legend(value) => Some(value.as_str()),
    };
    if let Some(color) = override_key.and_then(|k| overrides.get(k)) {
        return color.clone();
    }
    if palette.is_empty() {
        DEFAULT_PALETTE[index % DEFAULT_PALETTE.len()].to_string()
    } else {
        palette[index % palette.len()].clone()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub key: SeriesKey,
    pub label: String,
    pub color: String,
}

/// Ordered legend for `keys`. The primary series is labelled `primary_label` (usually the y axis
/// label); legend series use their value.
pub fn legend(
    keys: &[SeriesKey],
    palette: &[String],
    overrides: &BTreeMap<String, String>,
    primary_field: Option<&str>,
    primary_label: &str,
) -> Vec<LegendEntry> {
    keys.iter()
        .enumerate()
        .map(|(index, key)| LegendEntry {
            key: key.clone(),
            label: key.legend_value().unwrap_or(primary_label).to_string(),
            color: series_color(key, index, palette, overrides, primary_field),
        })
        .collect()
}

/// Per-x-value colors for single-series radial charts, where each slice gets its own color.
pub fn slice_colors(rows: &[AggregatedRow], palette: &[String]) -> Vec<String> {
    let none = BTreeMap::new();
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            series_color(
                &SeriesKey::Legend(row.x_value.clone()),
                index,
                palette,
                &none,
                None,
            )
        })
        .collect()
}
