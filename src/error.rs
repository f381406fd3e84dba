use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    /// An enumerated control value (scenario, stat, continent, ...) that the
    /// dashboard does not know about.
    #[error("Unknown {kind}: '{value}'")]
    UnknownValue { kind: &'static str, value: String },

    #[error("Config: {0}")]
    Config(String),
}

impl DashboardError {
    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownValue {
            kind,
            value: value.into(),
        }
    }

    /// Configuration errors are the caller's fault; everything else is data or IO.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::UnknownValue { .. } | Self::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(feature = "python")]
impl From<DashboardError> for pyo3::PyErr {
    fn from(err: DashboardError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyRuntimeError, PyValueError};
        if err.is_config() {
            PyValueError::new_err(err.to_string())
        } else {
            PyRuntimeError::new_err(err.to_string())
        }
    }
}
