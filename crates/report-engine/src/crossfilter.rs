//! Click-to-filter resolution.
//!
//! Charting layers report clicks in several shapes: a legend/series click carries the series
//! value, a click on the plot area carries the hovered category (`activeLabel` /
//! `activePayload`), and a click on a single bar or slice carries the item itself (`name` /
//! `payload`). [`resolve_click`] normalizes all of them into one `(dimension, value)` pair;
//! [`apply_click`] toggles that pair into the report filters through a [`FilterSink`].

use crate::filter::{FilterSet, FilterSink};
use crate::value::Value;
use crate::widget::ChartConfig;
use serde::{Deserialize, Serialize};

/// Datum attached to a click.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickPayload {
    #[serde(default, alias = "x", alias = "name")]
    pub x_value: Value,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartClick {
    /// Series/legend indicator.
    #[serde(default, alias = "dataKey", skip_serializing_if = "Option::is_none")]
    pub series_key: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_label: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub active_payload: Vec<ClickPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ClickPayload>,
}

impl ChartClick {
    pub fn series(value: impl Into<Value>) -> Self {
        Self {
            series_key: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn category(label: impl Into<Value>) -> Self {
        Self {
            active_label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn item(name: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    fn container_label(&self) -> Option<&Value> {
        self.active_label
            .as_ref()
            .or_else(|| self.active_payload.first().map(|p| &p.x_value))
    }

    fn item_label(&self) -> Option<&Value> {
        self.name
            .as_ref()
            .or_else(|| self.payload.as_ref().map(|p| &p.x_value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterTarget {
    pub dimension: String,
    pub value: String,
}

fn configured(key: Option<&str>) -> Option<&str> {
    key.map(str::trim).filter(|k| !k.is_empty())
}

/// Maps a click to the `(dimension, value)` it filters on.
///
/// The first shape present on the event decides, in priority order: series indicator (needs a
/// legend field), plot-area category, then the clicked item (both need an x field). A shape that
/// is present but whose field is not configured falls through to the next. A blank resolved
/// value resolves to nothing.
pub fn resolve_click(event: &ChartClick, config: &ChartConfig) -> Option<FilterTarget> {
    let legend_key = configured(config.legend_key.as_deref());
    let x_key = configured(config.x_key.as_deref());

    let (dimension, value) = if let (Some(series), Some(legend)) = (&event.series_key, legend_key)
    {
        (legend, series)
    } else if let (Some(label), Some(x)) = (event.container_label(), x_key) {
        (x, label)
    } else if let (Some(label), Some(x)) = (event.item_label(), x_key) {
        (x, label)
    } else {
        return None;
    };

    let value = value.as_text()?;
    if value.trim().is_empty() {
        return None;
    }
    Some(FilterTarget {
        dimension: dimension.to_string(),
        value: value.into_owned(),
    })
}

/// Allowed-value list for `target.dimension` after toggling `target.value`.
///
/// A selected value is removed (an emptied list clears the dimension); an unselected one is
/// appended, so repeated clicks build a multi-select.
pub fn toggle(filters: &FilterSet, target: &FilterTarget) -> Vec<String> {
    let current = filters.values(&target.dimension);
    if current.contains(&target.value) {
        current
            .iter()
            .filter(|v| **v != target.value)
            .cloned()
            .collect()
    } else {
        let mut next = current.to_vec();
        next.push(target.value.clone());
        next
    }
}

pub fn next_filter_set(filters: &FilterSet, target: &FilterTarget) -> FilterSet {
    filters.with_values(&target.dimension, toggle(filters, target))
}

/// Resolves `event` and writes the toggled list through `sink`.
///
/// Does nothing (and returns `None`) when no sink is wired or the click does not resolve.
pub fn apply_click(
    event: &ChartClick,
    config: &ChartConfig,
    filters: &FilterSet,
    sink: Option<&mut dyn FilterSink>,
) -> Option<FilterTarget> {
    let sink = sink?;
    let Some(target) = resolve_click(event, config) else {
        log::debug!("click did not resolve to a filter: {event:?}");
        return None;
    };
    sink.set_filter(&target.dimension, toggle(filters, &target));
    Some(target)
}
