//! The report view: owner of the dataset, the widget configs and the filter state.
//!
//! `ReportView` is the single writer of the [`FilterSet`]. Charts and slicers never hold filter
//! state of their own; they resolve user input to a `(dimension, values)` write that goes through
//! the view's [`FilterSink`] implementation, and every widget re-renders from the new set.

use crate::analytic::{AnalyticDelegate, AnalyticRequest, AnalyticSlot};
use crate::crossfilter::{apply_click, ChartClick, FilterTarget};
use crate::dispatch::{render_widget, RenderContext, RenderedWidget};
use crate::error::{DelegateError, ReportError, ReportResult};
use crate::filter::{filter_rows, FilterSet, FilterSink};
use crate::model::{Dataset, FieldDescriptor, Row};
use crate::series::default_palette;
use crate::slicer::{self, DateRange};
use crate::widget::{SlicerKind, WidgetConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Grid placement of one widget.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    pub id: String,
    #[serde(default)]
    pub x: u32,
    #[serde(default)]
    pub y: u32,
    #[serde(default = "default_span")]
    pub w: u32,
    #[serde(default = "default_span")]
    pub h: u32,
}

fn default_span() -> u32 {
    1
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTheme {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Categorical palette; empty means the built-in one.
    #[serde(default)]
    pub palette: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub survey_id: String,
    #[serde(default)]
    pub layout: Vec<LayoutItem>,
    #[serde(default)]
    pub widgets: BTreeMap<String, WidgetConfig>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub theme: ReportTheme,
    /// Persisted filters the view starts from.
    #[serde(default)]
    pub filters: FilterSet,
}

/// Source of report definitions and submission rows.
#[async_trait]
pub trait ReportProvider: Send + Sync {
    async fn load_definition(&self, report_id: &str) -> Result<ReportDefinition, DelegateError>;
    async fn load_rows(&self, survey_id: &str) -> Result<Vec<Row>, DelegateError>;
}

#[derive(Debug)]
pub struct ReportView {
    definition: ReportDefinition,
    dataset: Dataset,
    filters: FilterSet,
    palette: Vec<String>,
    slots: BTreeMap<String, Arc<AnalyticSlot>>,
}

impl ReportView {
    /// Fetches the definition, then its survey's rows. Either failure is a blocking
    /// [`ReportError::Load`]; nothing is retried.
    pub async fn load(provider: &dyn ReportProvider, report_id: &str) -> ReportResult<Self> {
        let definition = provider.load_definition(report_id).await.map_err(|err| {
            log::warn!("failed to load report {report_id}: {err}");
            ReportError::Load(format!("report {report_id}: {err}"))
        })?;
        let rows = provider
            .load_rows(&definition.survey_id)
            .await
            .map_err(|err| {
                log::warn!("failed to load rows for survey {}: {err}", definition.survey_id);
                ReportError::Load(format!("survey {}: {err}", definition.survey_id))
            })?;
        log::debug!(
            "loaded report {report_id}: {} widget(s), {} row(s)",
            definition.widgets.len(),
            rows.len()
        );
        Ok(Self::new(definition, rows))
    }

    pub fn new(definition: ReportDefinition, rows: Vec<Row>) -> Self {
        let dataset = Dataset::new(definition.fields.clone(), rows);
        let palette = if definition.theme.palette.is_empty() {
            default_palette()
        } else {
            definition.theme.palette.clone()
        };
        let slots = definition
            .widgets
            .iter()
            .filter(|(_, w)| matches!(w, WidgetConfig::Analytic { .. }))
            .map(|(id, _)| (id.clone(), Arc::new(AnalyticSlot::new())))
            .collect();
        Self {
            filters: definition.filters.clone(),
            definition,
            dataset,
            palette,
            slots,
        }
    }

    pub fn definition(&self) -> &ReportDefinition {
        &self.definition
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn widget(&self, widget_id: &str) -> ReportResult<&WidgetConfig> {
        self.definition
            .widgets
            .get(widget_id)
            .ok_or_else(|| ReportError::UnknownWidget(widget_id.to_string()))
    }

    /// Widget ids in layout order (top-to-bottom, left-to-right), then any widget missing from
    /// the layout by id.
    pub fn widget_ids(&self) -> Vec<String> {
        let mut placed: Vec<&LayoutItem> = self
            .definition
            .layout
            .iter()
            .filter(|item| self.definition.widgets.contains_key(&item.id))
            .collect();
        placed.sort_by_key(|item| (item.y, item.x));
        let mut ids: Vec<String> = placed.iter().map(|item| item.id.clone()).collect();
        for id in self.definition.widgets.keys() {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    pub fn analytic_slot(&self, widget_id: &str) -> Option<Arc<AnalyticSlot>> {
        self.slots.get(widget_id).cloned()
    }

    /// Swaps one widget's configuration, keeping its analytic slot in step with its type. A
    /// changed analytic widget starts over from an idle slot; responses to its old request are
    /// dropped.
    pub fn replace_widget(&mut self, widget_id: &str, widget: WidgetConfig) {
        if matches!(widget, WidgetConfig::Analytic { .. }) {
            let changed = self.definition.widgets.get(widget_id) != Some(&widget);
            match self.slots.get(widget_id) {
                Some(slot) if changed => slot.invalidate(),
                Some(_) => {}
                None => {
                    self.slots
                        .insert(widget_id.to_string(), Arc::new(AnalyticSlot::new()));
                }
            }
        } else if let Some(slot) = self.slots.remove(widget_id) {
            slot.invalidate();
        }
        self.definition
            .widgets
            .insert(widget_id.to_string(), widget);
    }

    /// Cross-filters from a click on a chart widget. Returns the toggled target, or `None` when
    /// the click does not resolve (or the widget is not a chart).
    pub fn handle_click(
        &mut self,
        widget_id: &str,
        event: &ChartClick,
    ) -> ReportResult<Option<FilterTarget>> {
        let WidgetConfig::Chart { config, .. } = self.widget(widget_id)? else {
            return Ok(None);
        };
        let mut pending: Option<(String, Vec<String>)> = None;
        let mut capture = |dimension: &str, values: Vec<String>| {
            pending = Some((dimension.to_string(), values));
        };
        let target = apply_click(event, config, &self.filters, Some(&mut capture));
        if let Some((dimension, values)) = pending {
            self.set_filter(&dimension, values);
        }
        Ok(target)
    }

    /// Toggles one value of a list/dropdown slicer.
    pub fn toggle_slicer_value(&mut self, widget_id: &str, value: &str) -> ReportResult<()> {
        let field = match self.widget(widget_id)? {
            WidgetConfig::Slicer {
                kind: SlicerKind::List | SlicerKind::Dropdown,
                config,
            } => config
                .dimension()
                .ok_or_else(|| ReportError::Config(format!("slicer {widget_id} has no field")))?
                .to_string(),
            _ => return Err(ReportError::NotASlicer(widget_id.to_string())),
        };
        let snapshot = self.filters.clone();
        slicer::toggle_value(&snapshot, &field, value, self);
        Ok(())
    }

    /// Selects every value of a date slicer's field inside `range`; `None` clears the slicer.
    pub fn set_slicer_date_range(
        &mut self,
        widget_id: &str,
        range: Option<DateRange>,
    ) -> ReportResult<()> {
        let field = match self.widget(widget_id)? {
            WidgetConfig::Slicer {
                kind: SlicerKind::Date,
                config,
            } => config
                .dimension()
                .ok_or_else(|| ReportError::Config(format!("slicer {widget_id} has no field")))?
                .to_string(),
            _ => return Err(ReportError::NotASlicer(widget_id.to_string())),
        };
        let values = slicer::distinct_values(&self.dataset.rows, &field, false);
        slicer::set_date_range(&values, &field, range, self);
        Ok(())
    }

    pub fn clear_filters(&mut self) {
        self.filters = self.filters.cleared();
    }

    fn render_with(&self, widget_id: &str, widget: &WidgetConfig, filtered: &[&Row]) -> RenderedWidget {
        let ctx = RenderContext {
            rows: &self.dataset.rows,
            filtered,
            fields: &self.dataset.fields,
            filters: &self.filters,
            palette: &self.palette,
            survey_id: &self.definition.survey_id,
        };
        render_widget(widget, &ctx, self.slots.get(widget_id).map(Arc::as_ref))
    }

    pub fn render(&self, widget_id: &str) -> ReportResult<RenderedWidget> {
        let widget = self.widget(widget_id)?;
        let filtered = filter_rows(&self.dataset.rows, &self.filters);
        Ok(self.render_with(widget_id, widget, &filtered))
    }

    /// Renders every widget in layout order from one filter pass.
    pub fn render_all(&self) -> Vec<(String, RenderedWidget)> {
        let filtered = filter_rows(&self.dataset.rows, &self.filters);
        self.widget_ids()
            .into_iter()
            .filter_map(|id| {
                let widget = self.definition.widgets.get(&id)?;
                let rendered = self.render_with(&id, widget, &filtered);
                Some((id, rendered))
            })
            .collect()
    }

    /// Requests for analytic widgets whose selectors changed since their last request.
    fn analytic_requests(&self) -> Vec<(String, Arc<AnalyticSlot>, AnalyticRequest)> {
        self.definition
            .widgets
            .iter()
            .filter_map(|(id, widget)| match widget {
                WidgetConfig::Analytic { kind, config } => {
                    let slot = self.slots.get(id)?;
                    let request = AnalyticRequest::new(&self.definition.survey_id, *kind, config);
                    slot.is_stale_for(&request)
                        .then(|| (id.clone(), Arc::clone(slot), request))
                }
                _ => None,
            })
            .collect()
    }

    /// Issues one request per analytic widget whose selectors changed (every widget on the first
    /// call), concurrently. Each widget's outcome lands in its own slot; a failing or panicking
    /// delegate only affects its widget. Returns how many responses were applied (stale
    /// responses are not). Use [`retry_analytic`](Self::retry_analytic) to re-issue an unchanged
    /// request.
    pub async fn refresh_analytics(&self, delegate: Arc<dyn AnalyticDelegate>) -> usize {
        let mut tasks = JoinSet::new();
        for (id, slot, request) in self.analytic_requests() {
            let delegate = Arc::clone(&delegate);
            tasks.spawn(async move {
                let applied = slot.run_isolated(delegate, request).await;
                (id, applied)
            });
        }

        let mut applied = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, true)) => applied += 1,
                Ok((id, false)) => log::debug!("analytic widget {id} was superseded"),
                Err(err) => log::warn!("analytic request task failed: {err}"),
            }
        }
        applied
    }

    /// Re-issues the last request of one analytic widget.
    pub async fn retry_analytic(
        &self,
        widget_id: &str,
        delegate: &dyn AnalyticDelegate,
    ) -> ReportResult<bool> {
        self.widget(widget_id)?;
        let Some(slot) = self.slots.get(widget_id) else {
            return Ok(false);
        };
        Ok(slot.retry(delegate).await.unwrap_or(false))
    }
}

impl FilterSink for ReportView {
    fn set_filter(&mut self, dimension: &str, values: Vec<String>) {
        log::debug!("filter {dimension} <- {values:?}");
        self.filters = self.filters.with_values(dimension, values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn definition() -> ReportDefinition {
        serde_json::from_value(json!({
            "id": "r1",
            "surveyId": "s1",
            "layout": [
                {"id": "by_region", "x": 0, "y": 1},
                {"id": "region_slicer", "x": 0, "y": 0},
            ],
            "widgets": {
                "by_region": {"type": "bar", "xKey": "region", "yKey": "sales", "yAggregation": "sum"},
                "region_slicer": {"type": "slicer_list", "field": "region"},
                "drivers": {"type": "key_driver", "metric": "nps"},
            },
            "filters": {"region": [], "channel": ["web"]},
        }))
        .unwrap()
    }

    fn rows() -> Vec<Row> {
        vec![
            Row::from([("region", Value::from("N")), ("channel", Value::from("web"))]),
            Row::from([("region", Value::from("S")), ("channel", Value::from("web"))]),
        ]
    }

    #[test]
    fn starts_from_persisted_filters_without_empty_dimensions() {
        let view = ReportView::new(definition(), rows());
        assert_eq!(
            view.filters().active_dimensions().collect::<Vec<_>>(),
            vec!["channel"]
        );
        assert!(view.analytic_slot("drivers").is_some());
        assert!(view.analytic_slot("by_region").is_none());
    }

    #[test]
    fn widget_ids_follow_layout_then_id() {
        let view = ReportView::new(definition(), rows());
        assert_eq!(view.widget_ids(), vec!["region_slicer", "by_region", "drivers"]);
    }

    #[test]
    fn slicer_operations_reject_other_widgets() {
        let mut view = ReportView::new(definition(), rows());
        assert_eq!(
            view.toggle_slicer_value("by_region", "N"),
            Err(ReportError::NotASlicer("by_region".to_string()))
        );
        assert_eq!(
            view.set_slicer_date_range("region_slicer", None),
            Err(ReportError::NotASlicer("region_slicer".to_string()))
        );
        assert_eq!(
            view.render("missing"),
            Err(ReportError::UnknownWidget("missing".to_string()))
        );
    }

    #[test]
    fn replacing_a_widget_keeps_slots_in_step() {
        let mut view = ReportView::new(definition(), rows());
        view.replace_widget(
            "drivers",
            WidgetConfig::from_json(json!({"type": "pie", "xKey": "region"})),
        );
        assert!(view.analytic_slot("drivers").is_none());
        view.replace_widget(
            "by_region",
            WidgetConfig::from_json(json!({"type": "forecast", "metric": "nps"})),
        );
        assert!(view.analytic_slot("by_region").is_some());
    }

    #[test]
    fn slicer_writes_use_the_trimmed_field() {
        let mut view = ReportView::new(definition(), rows());
        view.replace_widget(
            "region_slicer",
            WidgetConfig::from_json(json!({"type": "slicer_list", "field": " region "})),
        );
        view.toggle_slicer_value("region_slicer", "S").unwrap();
        assert_eq!(view.filters().values("region"), ["S".to_string()]);
        assert!(view.filters().values(" region ").is_empty());

        view.replace_widget(
            "region_slicer",
            WidgetConfig::from_json(json!({"type": "slicer_date", "field": "  "})),
        );
        assert_eq!(
            view.set_slicer_date_range("region_slicer", None),
            Err(ReportError::Config("slicer region_slicer has no field".to_string()))
        );
    }
}
