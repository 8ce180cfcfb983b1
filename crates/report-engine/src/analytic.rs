//! Widgets whose numbers come from an external statistics service.
//!
//! The engine shapes an [`AnalyticRequest`] from the widget's selectors, hands it to an
//! [`AnalyticDelegate`], and renders whatever typed [`AnalyticPayload`] comes back. Each widget
//! owns an [`AnalyticSlot`]; every request takes a fresh generation number and a response is
//! only applied while its generation is still the newest, so a slow response to an old
//! configuration cannot overwrite a newer one.

use crate::error::DelegateError;
use crate::model::Row;
use crate::widget::{AnalyticConfig, AnalyticKind, Granularity};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticRequest {
    pub survey_id: String,
    pub kind: AnalyticKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periods: Option<u32>,
}

fn selector(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl AnalyticRequest {
    /// Shapes the request for one widget. Blank selectors are dropped.
    pub fn new(survey_id: impl Into<String>, kind: AnalyticKind, config: &AnalyticConfig) -> Self {
        Self {
            survey_id: survey_id.into(),
            kind,
            metric: selector(&config.metric),
            field: selector(&config.field),
            group_by: selector(&config.group_by),
            granularity: config.granularity,
            periods: config.periods,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    #[serde(alias = "increasing")]
    Up,
    #[serde(alias = "decreasing")]
    Down,
    #[serde(alias = "stable")]
    Flat,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePoint {
    pub period: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegressionStats {
    pub slope: f64,
    pub intercept: f64,
    #[serde(default)]
    pub r_squared: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPayload {
    #[serde(default)]
    pub historical: Vec<TimePoint>,
    #[serde(default)]
    pub forecast: Vec<TimePoint>,
    #[serde(default)]
    pub regression: RegressionStats,
    pub trend: Trend,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortRow {
    pub cohort: String,
    pub metric_value: f64,
    pub response_count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortPayload {
    #[serde(default)]
    pub cohorts: Vec<CohortRow>,
    pub trend: Trend,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub mean: f64,
    #[serde(alias = "stddev")]
    pub std_dev: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub period: String,
    pub value: f64,
    #[serde(default)]
    pub z_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyPayload {
    pub baseline: Baseline,
    #[serde(default)]
    pub anomalies: Vec<Anomaly>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub field: String,
    pub correlation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_value: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDriverPayload {
    #[serde(default)]
    pub drivers: Vec<Driver>,
}

/// Cross-tab matrix: `values[r][c]` is the cell at `rows[r]` x `columns[c]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotPayload {
    #[serde(default)]
    pub rows: Vec<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<f64>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordFrequency {
    pub word: String,
    pub frequency: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordCloudPayload {
    #[serde(default)]
    pub words: Vec<WordFrequency>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub group: String,
    pub value: f64,
    pub baseline: f64,
    pub p_value: f64,
    #[serde(default)]
    pub significant: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatSigPayload {
    #[serde(default)]
    pub comparisons: Vec<Comparison>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePayload {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

/// Service response, passed through to the UI untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyticPayload {
    Forecast(ForecastPayload),
    Cohort(CohortPayload),
    Anomaly(AnomalyPayload),
    KeyDriver(KeyDriverPayload),
    Pivot(PivotPayload),
    WordCloud(WordCloudPayload),
    StatSig(StatSigPayload),
    Table(TablePayload),
}

impl AnalyticPayload {
    pub fn kind(&self) -> AnalyticKind {
        match self {
            AnalyticPayload::Forecast(_) => AnalyticKind::Forecast,
            AnalyticPayload::Cohort(_) => AnalyticKind::Cohort,
            AnalyticPayload::Anomaly(_) => AnalyticKind::Anomaly,
            AnalyticPayload::KeyDriver(_) => AnalyticKind::KeyDriver,
            AnalyticPayload::Pivot(_) => AnalyticKind::Pivot,
            AnalyticPayload::WordCloud(_) => AnalyticKind::WordCloud,
            AnalyticPayload::StatSig(_) => AnalyticKind::StatSig,
            AnalyticPayload::Table(_) => AnalyticKind::Table,
        }
    }
}

/// Backend computation for analytic widgets; one call per widget request.
#[async_trait]
pub trait AnalyticDelegate: Send + Sync {
    async fn fetch(&self, request: &AnalyticRequest) -> Result<AnalyticPayload, DelegateError>;
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SlotState {
    #[default]
    Idle,
    Loading {
        generation: u64,
    },
    Ready {
        generation: u64,
        payload: AnalyticPayload,
    },
    /// Rendered inline with a retry action.
    Failed {
        generation: u64,
        message: String,
    },
}

impl SlotState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SlotState::Loading { .. })
    }
}

/// Handle for one in-flight request.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestTicket {
    pub generation: u64,
    pub request: AnalyticRequest,
}

#[derive(Debug, Default)]
struct SlotInner {
    generation: u64,
    state: SlotState,
    last_request: Option<AnalyticRequest>,
}

/// Request state of one analytic widget.
#[derive(Debug, Default)]
pub struct AnalyticSlot {
    inner: Mutex<SlotInner>,
}

impl AnalyticSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> SlotState {
        self.lock().state.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn last_request(&self) -> Option<AnalyticRequest> {
        self.lock().last_request.clone()
    }

    /// Whether `request` differs from the last one issued (or nothing was issued yet).
    pub fn is_stale_for(&self, request: &AnalyticRequest) -> bool {
        self.lock().last_request.as_ref() != Some(request)
    }

    /// Starts a new request, superseding any in flight.
    pub fn begin(&self, request: AnalyticRequest) -> RequestTicket {
        let mut inner = self.lock();
        inner.generation += 1;
        let generation = inner.generation;
        inner.state = SlotState::Loading { generation };
        inner.last_request = Some(request.clone());
        RequestTicket {
            generation,
            request,
        }
    }

    /// Forgets the current request and state. Anything still in flight becomes stale.
    pub fn invalidate(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = SlotState::Idle;
        inner.last_request = None;
    }

    /// Applies a response. Returns `false` (and leaves the state alone) when a newer request has
    /// been issued since `generation` started.
    pub fn complete(
        &self,
        generation: u64,
        result: Result<AnalyticPayload, DelegateError>,
    ) -> bool {
        let mut inner = self.lock();
        if generation != inner.generation {
            log::warn!(
                "dropping stale analytic response (generation {generation}, current {})",
                inner.generation
            );
            return false;
        }
        inner.state = match result {
            Ok(payload) => SlotState::Ready {
                generation,
                payload,
            },
            Err(err) => SlotState::Failed {
                generation,
                message: err.to_string(),
            },
        };
        true
    }

    /// Issues `request` through `delegate` and applies the response if still current.
    pub async fn run(&self, delegate: &dyn AnalyticDelegate, request: AnalyticRequest) -> bool {
        let ticket = self.begin(request);
        let result = delegate.fetch(&ticket.request).await;
        if let Err(err) = &result {
            log::warn!("analytic {} request failed: {err}", ticket.request.kind.tag());
        }
        self.complete(ticket.generation, result)
    }

    /// Like [`run`](Self::run), with the delegate call on its own task: a panicking delegate
    /// leaves the slot `Failed` instead of `Loading`.
    pub async fn run_isolated(
        &self,
        delegate: Arc<dyn AnalyticDelegate>,
        request: AnalyticRequest,
    ) -> bool {
        let ticket = self.begin(request);
        let request = ticket.request.clone();
        let result = tokio::spawn(async move { delegate.fetch(&request).await })
            .await
            .unwrap_or_else(|err| {
                Err(DelegateError::Request(format!("delegate task failed: {err}")))
            });
        if let Err(err) = &result {
            log::warn!("analytic {} request failed: {err}", ticket.request.kind.tag());
        }
        self.complete(ticket.generation, result)
    }

    /// Re-issues the last request. `None` when nothing was ever requested.
    pub async fn retry(&self, delegate: &dyn AnalyticDelegate) -> Option<bool> {
        let request = self.last_request()?;
        Some(self.run(delegate, request).await)
    }
}
