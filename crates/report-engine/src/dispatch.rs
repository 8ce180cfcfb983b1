//! Routes each widget to its rendering path and produces a serializable view model.
//!
//! Categorical charts go through the aggregation engine, slicers read the unaggregated rows, and
//! analytic widgets show whatever their request slot holds. Rendering never fails as a whole: a
//! widget that cannot be rendered becomes an [`RenderedWidget::Error`] or
//! [`RenderedWidget::Unsupported`] placeholder and its siblings are unaffected.

use crate::aggregate::{aggregate, AggregatedRow};
use crate::analytic::{AnalyticRequest, AnalyticSlot, SlotState};
use crate::axis::{axis_label, secondary_axis, x_axis, y_aggregation, y_axis, AxisSpec};
use crate::filter::FilterSet;
use crate::model::{FieldDescriptor, Row};
use crate::series::{legend, series_keys, slice_colors, LegendEntry, SeriesLayout};
use crate::slicer::{self, DateRange, SlicerOption};
use crate::value::Value;
use crate::widget::{
    AnalyticConfig, AnalyticKind, ChartConfig, ChartKind, SlicerConfig, SlicerKind, WidgetConfig,
};
use serde::Serialize;

/// Everything a widget render reads. All of it is borrowed from the report view.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    /// Every row of the dataset.
    pub rows: &'a [Row],
    /// Rows passing the current filters.
    pub filtered: &'a [&'a Row],
    pub fields: &'a [FieldDescriptor],
    pub filters: &'a FilterSet,
    pub palette: &'a [String],
    pub survey_id: &'a str,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartView {
    pub chart: ChartKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub layout: SeriesLayout,
    pub rows: Vec<AggregatedRow>,
    pub legend: Vec<LegendEntry>,
    /// One color per row, for single-series pie/donut charts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub slice_colors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<AxisSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<AxisSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_axis: Option<AxisSpec>,
    pub show_legend: bool,
    pub show_data_labels: bool,
    /// x-values currently selected by the cross-filter, for highlighting.
    pub active_values: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub headline: String,
    pub value: f64,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlicerView {
    pub slicer: SlicerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub field: String,
    pub options: Vec<SlicerOption>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub field: String,
    /// Earliest/latest parseable date among the field's values.
    pub bounds: Option<DateRange>,
    /// Span of the selected values. A chosen range containing no submissions clears the filter,
    /// so it reads back as `None` and every row stays visible.
    pub selected: Option<DateRange>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticView {
    pub analytic: AnalyticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub request: AnalyticRequest,
    pub state: SlotState,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RenderedWidget {
    /// Nothing to draw (no x field, or no rows after filtering).
    Empty {
        type_name: String,
        title: Option<String>,
    },
    Chart(ChartView),
    Card(CardView),
    Text(TextView),
    Slicer(SlicerView),
    DateRange(DateRangeView),
    Analytic(AnalyticView),
    Unsupported {
        type_name: String,
    },
    Error {
        type_name: String,
        message: String,
    },
}

impl RenderedWidget {
    pub fn is_error(&self) -> bool {
        matches!(self, RenderedWidget::Error { .. })
    }
}

fn empty(widget: &WidgetConfig) -> RenderedWidget {
    RenderedWidget::Empty {
        type_name: widget.type_name().to_string(),
        title: widget.title().map(str::to_string),
    }
}

/// Renders one widget. `slot` is the widget's analytic request slot, if it has one.
pub fn render_widget(
    widget: &WidgetConfig,
    ctx: &RenderContext<'_>,
    slot: Option<&AnalyticSlot>,
) -> RenderedWidget {
    match widget {
        WidgetConfig::Chart { kind, config } => render_chart(widget, *kind, config, ctx),
        WidgetConfig::Slicer { kind, config } => render_slicer(widget, *kind, config, ctx),
        WidgetConfig::Analytic { kind, config } => render_analytic(*kind, config, ctx, slot),
        WidgetConfig::Unknown { name } => {
            log::warn!("unsupported widget type {name:?}");
            RenderedWidget::Unsupported {
                type_name: name.clone(),
            }
        }
        WidgetConfig::Invalid {
            type_name, message, ..
        } => RenderedWidget::Error {
            type_name: type_name.clone(),
            message: message.clone(),
        },
    }
}

fn render_chart(
    widget: &WidgetConfig,
    kind: ChartKind,
    config: &ChartConfig,
    ctx: &RenderContext<'_>,
) -> RenderedWidget {
    let title = config.title.clone();

    if kind == ChartKind::Text {
        if let Some(body) = config.text.as_deref().filter(|t| !t.trim().is_empty()) {
            return RenderedWidget::Text(TextView {
                title,
                body: body.to_string(),
            });
        }
    }

    let rows = match aggregate(ctx.filtered.iter().copied(), config, ctx.fields) {
        Ok(rows) => rows,
        Err(err) => {
            return RenderedWidget::Error {
                type_name: kind.tag().to_string(),
                message: err.to_string(),
            }
        }
    };
    if rows.is_empty() {
        return empty(widget);
    }

    let y_label = axis_label(ctx.fields, config.y_key.as_deref(), y_aggregation(config, ctx.fields));

    match kind {
        ChartKind::CardDate => {
            let Some(last) = rows.last() else {
                return empty(widget);
            };
            RenderedWidget::Card(CardView {
                title,
                headline: last.x_value.clone(),
                value: last.primary_value(),
                label: y_label,
            })
        }
        ChartKind::Text => RenderedWidget::Text(TextView {
            title,
            body: rows
                .iter()
                .map(|row| format!("{}: {}", row.x_value, Value::from(row.primary_value())))
                .collect::<Vec<_>>()
                .join("\n"),
        }),
        _ => {
            let keys = series_keys(&rows);
            let layout = SeriesLayout::of(&keys);
            let legend = legend(
                &keys,
                ctx.palette,
                &config.series_colors,
                config.y_key.as_deref(),
                &y_label,
            );
            let slice_colors = if kind.is_radial() && layout == SeriesLayout::Single {
                slice_colors(&rows, ctx.palette)
            } else {
                Vec::new()
            };
            let (x_axis, y_axis, secondary_axis) = if kind.has_axes() {
                (
                    Some(x_axis(config, ctx.fields)),
                    Some(y_axis(config, ctx.fields)),
                    secondary_axis(config, ctx.fields),
                )
            } else {
                (None, None, None)
            };
            let active_values = config
                .x_key
                .as_deref()
                .map(|x| ctx.filters.values(x).to_vec())
                .unwrap_or_default();

            RenderedWidget::Chart(ChartView {
                chart: kind,
                title,
                layout,
                rows,
                legend,
                slice_colors,
                x_axis,
                y_axis,
                secondary_axis,
                show_legend: config.display.show_legend,
                show_data_labels: config.display.show_data_labels,
                active_values,
            })
        }
    }
}

fn render_slicer(
    widget: &WidgetConfig,
    kind: SlicerKind,
    config: &SlicerConfig,
    ctx: &RenderContext<'_>,
) -> RenderedWidget {
    let Some(field) = config.dimension() else {
        return empty(widget);
    };
    let source = slicer::source_rows(ctx.rows, ctx.filters, config);
    let values = slicer::distinct_values(source, field, config.sort_values);

    match kind {
        SlicerKind::List | SlicerKind::Dropdown => RenderedWidget::Slicer(SlicerView {
            slicer: kind,
            title: config.title.clone(),
            field: field.to_string(),
            options: slicer::options(values, ctx.filters, field),
        }),
        SlicerKind::Date => RenderedWidget::DateRange(DateRangeView {
            title: config.title.clone(),
            field: field.to_string(),
            bounds: slicer::date_bounds(&values),
            selected: slicer::selected_range(ctx.filters, field),
        }),
    }
}

fn render_analytic(
    kind: AnalyticKind,
    config: &AnalyticConfig,
    ctx: &RenderContext<'_>,
    slot: Option<&AnalyticSlot>,
) -> RenderedWidget {
    let state = match slot.map(AnalyticSlot::state).unwrap_or_default() {
        SlotState::Ready { payload, .. } if payload.kind() != kind => {
            log::warn!(
                "ignoring {} payload for {} widget",
                payload.kind().tag(),
                kind.tag()
            );
            SlotState::Idle
        }
        state => state,
    };
    RenderedWidget::Analytic(AnalyticView {
        analytic: kind,
        title: config.title.clone(),
        request: AnalyticRequest::new(ctx.survey_id, kind, config),
        state,
    })
}
