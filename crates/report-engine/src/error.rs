pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReportError {
    #[error("failed to load report: {0}")]
    Load(String),
    #[error("unknown widget: {0}")]
    UnknownWidget(String),
    #[error("widget {0} is not a slicer")]
    NotASlicer(String),
    #[error(
        "cannot sort by value across {} series ({}); set sortSeries to pick one",
        series.len(),
        series.join(", ")
    )]
    AmbiguousSortTarget { series: Vec<String> },
    #[error("sortSeries {name:?} is not one of the series ({})", series.join(", "))]
    UnknownSortSeries { name: String, series: Vec<String> },
    #[error("invalid widget config: {0}")]
    Config(String),
}

/// Failure reported by an analytic delegate or a report provider.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DelegateError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("service returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for DelegateError {
    fn from(err: serde_json::Error) -> Self {
        DelegateError::Decode(err.to_string())
    }
}

impl From<DelegateError> for ReportError {
    fn from(err: DelegateError) -> Self {
        ReportError::Load(err.to_string())
    }
}
