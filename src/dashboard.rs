use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::config::ChartConfig;
use crate::dataset::DerivedDataset;
use crate::error::{DashboardError, Result};
use crate::selection::{
    ContinentFilter, InteractionEvent, ResolvedSelection, SelectedPoint, SelectionState,
    ALL_CONTINENTS,
};
use crate::visualization::{
    build_map, build_scatter, build_time_series, ChartContext, MapChart, ScatterChart,
    TimeSeriesChart,
};

/// Entry point for the presentation layer.
///
/// Holds the immutable dataset and the chart configuration. Every method takes
/// `&self`, so one instance can serve any number of sessions; per-request
/// state lives in the [`SelectionState`] the caller passes in.
#[derive(Debug, Clone)]
pub struct Dashboard {
    dataset: Arc<DerivedDataset>,
    config: ChartConfig,
}

/// Everything the page needs after one interaction.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardUpdate {
    pub state: SelectionState,
    pub selection: ResolvedSelection,
    pub map: MapChart,
    pub scatter: ScatterChart,
    pub time_series: TimeSeriesChart,
}

impl DashboardUpdate {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Dashboard {
    pub fn new(dataset: Arc<DerivedDataset>, config: ChartConfig) -> Result<Self> {
        config.validate()?;
        for label in [config.all_continents_label.trim(), ALL_CONTINENTS] {
            if dataset.has_continent(label) {
                return Err(DashboardError::Config(format!(
                    "'{label}' is both the all-continents option and a continent in the dataset"
                )));
            }
        }
        Ok(Self { dataset, config })
    }

    /// Load a CSV export with the default chart configuration.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let dataset = DerivedDataset::load_csv(path)?;
        Self::new(Arc::new(dataset), ChartConfig::default())
    }

    pub fn dataset(&self) -> &Arc<DerivedDataset> {
        &self.dataset
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    /// Options for the continent filter: the "everything" label first, then
    /// every continent in the dataset.
    pub fn continent_options(&self) -> Vec<String> {
        std::iter::once(self.config.all_continents_label.clone())
            .chain(self.dataset.continents().iter().cloned())
            .collect()
    }

    /// Parse a continent dropdown value, including this dashboard's "all"
    /// label.
    pub fn continent_filter(&self, value: &str) -> Result<ContinentFilter> {
        ContinentFilter::parse_with(value, &self.config.all_continents_label)
    }

    /// [`InteractionEvent::from_source`] against this dashboard's labels.
    pub fn event_from_source(
        &self,
        source: &str,
        value: Option<&str>,
        points: Option<Vec<SelectedPoint>>,
    ) -> Result<InteractionEvent> {
        InteractionEvent::from_source_with_label(
            source,
            value,
            points,
            &self.config.all_continents_label,
        )
    }

    /// Apply `event` to `previous` and recompute all three charts.
    pub fn handle(
        &self,
        previous: &SelectionState,
        event: InteractionEvent,
    ) -> Result<DashboardUpdate> {
        let state = previous.apply(event);
        self.render(&state)
    }

    /// Compute all three charts for `state`, e.g. on first page load.
    pub fn render(&self, state: &SelectionState) -> Result<DashboardUpdate> {
        state.continent_filter.validate(&self.dataset)?;

        let selection = state.resolve(&self.dataset)?;
        let metrics = state.projection();
        debug!(
            year = %state.selected_year,
            percent_column = %metrics.percent_column,
            stat = %state.stat_choice,
            selected = selection.len(),
            "rendering dashboard"
        );

        let ctx = ChartContext::new(&self.dataset, &metrics, &self.config)?;
        let map = build_map(&ctx, &selection)?;
        let scatter = build_scatter(&ctx, &selection)?;
        let time_series = build_time_series(&self.dataset, &selection, &self.config)?;

        Ok(DashboardUpdate {
            state: state.clone(),
            selection,
            map,
            scatter,
            time_series,
        })
    }
}
