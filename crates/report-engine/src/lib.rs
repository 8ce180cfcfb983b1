//! Interactive report engine for survey dashboards.
//!
//! Raw submission rows flow through the cross-filter ([`filter_rows`]), the aggregation engine
//! ([`aggregate`]) and the widget dispatcher ([`render_widget`]) to produce one serializable view
//! model per widget. Clicks and slicer selections resolve to filter writes on the owning
//! [`ReportView`], which re-renders every widget from the new [`FilterSet`].

mod aggregate;
mod analytic;
mod axis;
mod crossfilter;
mod dispatch;
mod error;
mod filter;
mod model;
mod report;
mod serde_defaults;
mod series;
pub mod slicer;
mod value;
mod widget;

pub use crate::aggregate::{
    aggregate, AggregatedRow, Aggregation, SeriesKey, SeriesValue, SortBy, MISSING_GROUP_LABEL,
    MISSING_SERIES_LABEL,
};
pub use crate::analytic::{
    AnalyticDelegate, AnalyticPayload, AnalyticRequest, AnalyticSlot, Anomaly, AnomalyPayload,
    Baseline, CohortPayload, CohortRow, Comparison, Driver, ForecastPayload, KeyDriverPayload,
    PivotPayload, RegressionStats, RequestTicket, SlotState, StatSigPayload, TablePayload,
    TimePoint, Trend, WordCloudPayload, WordFrequency,
};
pub use crate::axis::{axis_label, secondary_axis, x_axis, x_axis_label, y_axis, AxisSpec};
pub use crate::crossfilter::{
    apply_click, next_filter_set, resolve_click, toggle, ChartClick, ClickPayload, FilterTarget,
};
pub use crate::dispatch::{
    render_widget, AnalyticView, CardView, ChartView, DateRangeView, RenderContext,
    RenderedWidget, SlicerView, TextView,
};
pub use crate::error::{DelegateError, ReportError, ReportResult};
pub use crate::filter::{filter_rows, FilterSet, FilterSink};
pub use crate::model::{find_field, Dataset, FieldDescriptor, FieldType, Row};
pub use crate::report::{LayoutItem, ReportDefinition, ReportProvider, ReportTheme, ReportView};
pub use crate::series::{
    default_palette, legend, series_color, series_keys, LegendEntry, SeriesLayout,
    DEFAULT_PALETTE,
};
pub use crate::slicer::{DateRange, SlicerOption};
pub use crate::value::Value;
pub use crate::widget::{
    AnalyticConfig, AnalyticKind, ChartConfig, ChartKind, DisplayOptions, Granularity,
    SlicerConfig, SlicerKind, WidgetConfig,
};
