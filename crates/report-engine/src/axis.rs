use crate::aggregate::Aggregation;
use crate::model::{find_field, FieldDescriptor};
use crate::widget::{ChartConfig, DisplayOptions};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisSpec {
    pub label: String,
    pub visible: bool,
    pub tick_font_size: u32,
    pub tick_rotation: i32,
}

fn field_label(fields: &[FieldDescriptor], key: &str) -> String {
    find_field(fields, key)
        .map(|f| f.display_label().to_string())
        .unwrap_or_else(|| key.to_string())
}

/// Human label for an aggregated measure, e.g. `"Sum of Sales"`.
///
/// `aggregation` must already be resolved; `Auto` reads as a count. A count without a measure
/// field counts records.
pub fn axis_label(fields: &[FieldDescriptor], key: Option<&str>, aggregation: Aggregation) -> String {
    match key.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) => format!("{} of {}", aggregation.verb(), field_label(fields, key)),
        None => "Count of Records".to_string(),
    }
}

pub fn x_axis_label(fields: &[FieldDescriptor], x_key: Option<&str>) -> String {
    x_key
        .map(|k| field_label(fields, k))
        .unwrap_or_default()
}

/// Resolved aggregation of the primary measure of `config`.
pub fn y_aggregation(config: &ChartConfig, fields: &[FieldDescriptor]) -> Aggregation {
    config
        .y_aggregation
        .resolve(config.y_key.as_deref().and_then(|k| find_field(fields, k)))
}

pub fn x_axis(config: &ChartConfig, fields: &[FieldDescriptor]) -> AxisSpec {
    let display = &config.display;
    AxisSpec {
        label: x_axis_label(fields, config.x_key.as_deref()),
        visible: display.show_x_axis,
        tick_font_size: display.tick_font_size,
        tick_rotation: display.x_tick_rotation,
    }
}

pub fn y_axis(config: &ChartConfig, fields: &[FieldDescriptor]) -> AxisSpec {
    value_axis(
        &config.display,
        axis_label(fields, config.y_key.as_deref(), y_aggregation(config, fields)),
    )
}

/// Right-hand axis of a combo chart; `None` without a secondary measure.
pub fn secondary_axis(config: &ChartConfig, fields: &[FieldDescriptor]) -> Option<AxisSpec> {
    let key = config
        .secondary_y_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())?;
    let aggregation = config
        .secondary_y_aggregation
        .resolve(find_field(fields, key));
    Some(value_axis(
        &config.display,
        axis_label(fields, Some(key), aggregation),
    ))
}

fn value_axis(display: &DisplayOptions, label: String) -> AxisSpec {
    AxisSpec {
        label,
        visible: display.show_y_axis,
        tick_font_size: display.tick_font_size,
        tick_rotation: 0,
    }
}
