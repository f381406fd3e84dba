use std::sync::Arc;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyo3_polars::PyDataFrame;

use crate::config::ChartConfig;
use crate::dashboard::Dashboard;
use crate::dataset::DerivedDataset;
use crate::projection::StatChoice;
use crate::schema::{self, aux, identity, Band, Scenario, Year};
use crate::selection::{InteractionEvent, SelectedPoint, SelectionState, ALL_CONTINENTS};

#[pyclass(name = "PlasticDashboard")]
pub struct PyDashboard {
    inner: Dashboard,
}

fn load_config(config_path: Option<&str>) -> PyResult<ChartConfig> {
    match config_path {
        Some(path) => Ok(ChartConfig::from_json_file(path)?),
        None => Ok(ChartConfig::default()),
    }
}

fn build(dataset: DerivedDataset, config_path: Option<&str>) -> PyResult<PyDashboard> {
    let config = load_config(config_path)?;
    Ok(PyDashboard {
        inner: Dashboard::new(Arc::new(dataset), config)?,
    })
}

fn state_from_controls(
    dashboard: &Dashboard,
    year: u16,
    scenario: &str,
    continent: &str,
    stat: &str,
    band: &str,
) -> PyResult<SelectionState> {
    Ok(SelectionState {
        selected_year: Year::try_from(year)?,
        scenario: scenario.parse()?,
        band: band.parse()?,
        continent_filter: dashboard.continent_filter(continent)?,
        stat_choice: stat.parse()?,
        last_interaction: None,
    })
}

#[pymethods]
impl PyDashboard {
    // ── Construction ────────────────────────────────────────────────────────

    /// Load the dataset from a CSV export.
    ///
    /// `config_path` optionally points at a JSON chart configuration.
    #[staticmethod]
    #[pyo3(signature = (path, config_path=None))]
    fn load_csv(path: &str, config_path: Option<&str>) -> PyResult<Self> {
        build(DerivedDataset::load_csv(path)?, config_path)
    }

    #[staticmethod]
    #[pyo3(signature = (path, config_path=None))]
    fn load_parquet(path: &str, config_path: Option<&str>) -> PyResult<Self> {
        build(DerivedDataset::load_parquet(path)?, config_path)
    }

    /// Build from an already-parsed Polars DataFrame (e.g. read from the
    /// source spreadsheet on the Python side).
    #[staticmethod]
    #[pyo3(signature = (df, config_path=None))]
    fn from_frame(df: PyDataFrame, config_path: Option<&str>) -> PyResult<Self> {
        build(DerivedDataset::from_frame(df.0)?, config_path)
    }

    // ── Properties ──────────────────────────────────────────────────────────

    /// Options for the continent dropdown.
    fn continents(&self) -> Vec<String> {
        self.inner.continent_options()
    }

    /// The normalized table including derived percent columns.
    #[getter]
    fn frame(&self) -> PyDataFrame {
        PyDataFrame(self.inner.dataset().frame().clone())
    }

    // ── Interaction ─────────────────────────────────────────────────────────

    /// Chart specs (JSON) for the given control values, no interaction.
    #[pyo3(signature = (year, scenario, continent, stat, band="midpoint"))]
    fn render(
        &self,
        year: u16,
        scenario: &str,
        continent: &str,
        stat: &str,
        band: &str,
    ) -> PyResult<String> {
        let state = state_from_controls(&self.inner, year, scenario, continent, stat, band)?;
        Ok(self.inner.render(&state)?.to_json()?)
    }

    /// Chart specs (JSON) after an interaction.
    ///
    /// `trigger` names the control or chart that fired ("year", "scenario",
    /// "band", "continent", "stat", "map", "scatter" or the page's widget
    /// ids). Control triggers take their new value in `value`; chart
    /// triggers take `(point_index, label)` pairs in `points`, where `None`
    /// or an empty list means the selection was cleared.
    #[pyo3(signature = (year, scenario, continent, stat, trigger, value=None, points=None, band="midpoint"))]
    #[allow(clippy::too_many_arguments)]
    fn update(
        &self,
        year: u16,
        scenario: &str,
        continent: &str,
        stat: &str,
        trigger: &str,
        value: Option<&str>,
        points: Option<Vec<(usize, Option<String>)>>,
        band: &str,
    ) -> PyResult<String> {
        let state = state_from_controls(&self.inner, year, scenario, continent, stat, band)?;
        let points = points.map(|pts| {
            pts.into_iter()
                .map(|(point_index, label)| SelectedPoint { point_index, label })
                .collect()
        });
        let event = self.inner.event_from_source(trigger, value, points)?;
        Ok(self.inner.handle(&state, event)?.to_json()?)
    }

    /// JSON in, JSON out: `state_json` is a serialized state (as returned in
    /// the `state` field of a previous update) and `event_json` a tagged event.
    fn handle_json(&self, state_json: &str, event_json: &str) -> PyResult<String> {
        let state: SelectionState = serde_json::from_str(state_json)
            .map_err(|e| PyValueError::new_err(format!("Invalid state: {e}")))?;
        let event: InteractionEvent = serde_json::from_str(event_json)
            .map_err(|e| PyValueError::new_err(format!("Invalid event: {e}")))?;
        Ok(self.inner.handle(&state, event)?.to_json()?)
    }
}

/// Install a `tracing` subscriber writing to stderr.
///
/// `filter` uses env-filter syntax, e.g. "info" or "_core=debug".
#[pyfunction]
#[pyo3(signature = (filter="info"))]
fn init_logging(filter: &str) -> PyResult<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))
}

/// Export schema constants and control values as Python submodules
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Identity
    let ident = PyModule::new(m.py(), "identity")?;
    ident.add("COUNTRY", identity::COUNTRY)?;
    ident.add("ISO_CODE", identity::ISO_CODE)?;
    ident.add("CONTINENT", identity::CONTINENT)?;
    m.add_submodule(&ident)?;

    // Auxiliary 2015 statistics
    let auxiliary = PyModule::new(m.py(), "aux")?;
    auxiliary.add("MISMANAGED_FRACTION_2015", aux::MISMANAGED_FRACTION_2015)?;
    auxiliary.add("MSW_PER_CAPITA_2015", aux::MSW_PER_CAPITA_2015)?;
    m.add_submodule(&auxiliary)?;

    // Control values
    let controls = PyModule::new(m.py(), "controls")?;
    controls.add("YEARS", Year::ALL.map(Year::value).to_vec())?;
    controls.add(
        "SCENARIOS",
        Scenario::ALL.map(|s| s.letter()).to_vec(),
    )?;
    controls.add("BANDS", Band::ALL.map(Band::as_str).to_vec())?;
    controls.add("STATS", StatChoice::ALL.map(StatChoice::label).to_vec())?;
    controls.add("ALL_CONTINENTS", ALL_CONTINENTS)?;
    m.add_submodule(&controls)?;

    // Full raw schema, for validating spreadsheets before loading
    m.add("REQUIRED_COLUMNS", schema::required_columns())?;

    Ok(())
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyDashboard>()?;
    m.add_function(wrap_pyfunction!(init_logging, m)?)?;
    add_schema_exports(m)?;
    Ok(())
}
