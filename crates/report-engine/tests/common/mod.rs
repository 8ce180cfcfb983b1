#![allow(dead_code)]

use async_trait::async_trait;
use report_engine::{
    AnalyticDelegate, AnalyticPayload, AnalyticRequest, DelegateError, FieldDescriptor, FieldType,
    KeyDriverPayload, Driver, ReportDefinition, ReportProvider, Row, Value,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;

pub fn sales_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("region", FieldType::Text).with_label("Region"),
        FieldDescriptor::new("channel", FieldType::Text).with_label("Channel"),
        FieldDescriptor::new("sales", FieldType::Number)
            .with_label("Sales")
            .measure(),
        FieldDescriptor::new("submitted", FieldType::Date).with_label("Submitted"),
    ]
}

pub fn row(region: &str, channel: &str, sales: impl Into<Value>, submitted: &str) -> Row {
    Row::from([
        ("region", Value::from(region)),
        ("channel", Value::from(channel)),
        ("sales", sales.into()),
        ("submitted", Value::from(submitted)),
    ])
}

/// Six submissions across three regions and two channels.
pub fn sales_rows() -> Vec<Row> {
    vec![
        row("North", "web", 100, "2024-01-05"),
        row("North", "email", 150, "2024-01-20"),
        row("South", "web", 200, "2024-02-03"),
        row("South", "web", "40", "2024-02-17"),
        row("East", "email", "n/a", "2024-03-01"),
        row("North", "web", 50.5, "2024-03-09T10:00:00Z"),
    ]
}

pub fn sales_report() -> ReportDefinition {
    serde_json::from_value(json!({
        "id": "weekly",
        "title": "Weekly sales",
        "surveyId": "survey-42",
        "fields": serde_json::to_value(sales_fields()).unwrap(),
        "layout": [
            {"id": "region_slicer", "x": 0, "y": 0, "w": 3},
            {"id": "date_slicer", "x": 3, "y": 0, "w": 3},
            {"id": "by_region", "x": 0, "y": 1, "w": 6, "h": 4},
            {"id": "by_channel", "x": 6, "y": 1, "w": 6, "h": 4},
            {"id": "drivers", "x": 0, "y": 5},
            {"id": "forecast", "x": 6, "y": 5},
        ],
        "widgets": {
            "region_slicer": {"type": "slicer_list", "field": "region", "sortValues": true},
            "date_slicer": {"type": "slicer_date", "field": "submitted"},
            "by_region": {
                "type": "bar",
                "title": "Sales by region",
                "xKey": "region",
                "yKey": "sales",
                "sortBy": "value_desc"
            },
            "by_channel": {
                "type": "stacked_bar",
                "xKey": "region",
                "yKey": "sales",
                "legendKey": "channel",
                "yAggregation": "sum"
            },
            "drivers": {"type": "key_driver", "metric": "sales"},
            "forecast": {"type": "forecast", "metric": "sales", "granularity": "month", "periods": 3},
            "gauge": {"type": "gauge", "xKey": "region"}
        },
        "theme": {"name": "default", "palette": ["#111111", "#222222", "#333333"]},
        "filters": {}
    }))
    .unwrap()
}

pub struct InMemoryProvider {
    pub definitions: HashMap<String, ReportDefinition>,
    pub rows: HashMap<String, Vec<Row>>,
}

impl InMemoryProvider {
    pub fn with_sales_report() -> Self {
        let report = sales_report();
        let mut rows = HashMap::new();
        rows.insert(report.survey_id.clone(), sales_rows());
        let mut definitions = HashMap::new();
        definitions.insert(report.id.clone(), report);
        Self { definitions, rows }
    }
}

#[async_trait]
impl ReportProvider for InMemoryProvider {
    async fn load_definition(&self, report_id: &str) -> Result<ReportDefinition, DelegateError> {
        self.definitions
            .get(report_id)
            .cloned()
            .ok_or_else(|| DelegateError::Status {
                status: 404,
                message: format!("no report {report_id}"),
            })
    }

    async fn load_rows(&self, survey_id: &str) -> Result<Vec<Row>, DelegateError> {
        self.rows
            .get(survey_id)
            .cloned()
            .ok_or_else(|| DelegateError::Request(format!("survey {survey_id} unavailable")))
    }
}

pub fn drivers_payload(field: &str, correlation: f64) -> AnalyticPayload {
    AnalyticPayload::KeyDriver(KeyDriverPayload {
        drivers: vec![Driver {
            field: field.to_string(),
            correlation,
            p_value: None,
        }],
    })
}

/// Answers immediately: key-driver requests succeed, every other kind fails.
pub struct KeyDriverOnly;

#[async_trait]
impl AnalyticDelegate for KeyDriverOnly {
    async fn fetch(&self, request: &AnalyticRequest) -> Result<AnalyticPayload, DelegateError> {
        match request.kind {
            report_engine::AnalyticKind::KeyDriver => Ok(drivers_payload(
                request.metric.as_deref().unwrap_or_default(),
                0.8,
            )),
            other => Err(DelegateError::Status {
                status: 503,
                message: format!("{} service down", other.tag()),
            }),
        }
    }
}

/// Holds every request until the test releases it by metric name.
#[derive(Default)]
pub struct GatedDelegate {
    gates: Mutex<HashMap<String, oneshot::Receiver<Result<AnalyticPayload, DelegateError>>>>,
}

impl GatedDelegate {
    pub fn gate(&self, metric: &str) -> oneshot::Sender<Result<AnalyticPayload, DelegateError>> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(metric.to_string(), rx);
        tx
    }
}

#[async_trait]
impl AnalyticDelegate for GatedDelegate {
    async fn fetch(&self, request: &AnalyticRequest) -> Result<AnalyticPayload, DelegateError> {
        let metric = request.metric.clone().unwrap_or_default();
        let rx = self.gates.lock().unwrap().remove(&metric);
        match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(DelegateError::Request("gate dropped".to_string()))),
            None => Err(DelegateError::Request(format!("no gate for {metric}"))),
        }
    }
}
