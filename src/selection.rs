//! Interaction events, the control state they update, and resolution of the
//! authoritative set of selected countries.
//!
//! Three sources compete for the selection: the continent filter, the map and
//! the scatter plot. A chart event carrying points wins over the continent
//! filter; anything else (a control change or a chart deselect) falls back to
//! the continent filter. Resolution is a pure function of the latest event and
//! the current filter value.
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::DerivedDataset;
use crate::error::{DashboardError, Result};
use crate::projection::{ProjectedMetrics, StatChoice};
use crate::schema::{Band, Scenario, Year};

pub const ALL_CONTINENTS: &str = "All continents";

// ── Continent filter ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContinentFilter {
    All,
    Named(String),
}

impl ContinentFilter {
    pub fn named(continent: impl Into<String>) -> Self {
        Self::Named(continent.into())
    }

    /// Fails on continents the dataset does not contain.
    pub fn validate(&self, dataset: &DerivedDataset) -> Result<()> {
        match self {
            ContinentFilter::All => Ok(()),
            ContinentFilter::Named(c) if dataset.has_continent(c) => Ok(()),
            ContinentFilter::Named(c) => Err(DashboardError::unknown("continent", c.as_str())),
        }
    }
}

impl fmt::Display for ContinentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContinentFilter::All => f.write_str(ALL_CONTINENTS),
            ContinentFilter::Named(c) => f.write_str(c),
        }
    }
}

impl ContinentFilter {
    /// Parse a dropdown value where `all_label` is the page's "everything"
    /// option. [`ALL_CONTINENTS`] is accepted too, since serialized states
    /// always carry it.
    pub fn parse_with(s: &str, all_label: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DashboardError::unknown("continent", s));
        }
        if trimmed == all_label.trim() || trimmed == ALL_CONTINENTS {
            Ok(ContinentFilter::All)
        } else {
            Ok(ContinentFilter::Named(trimmed.to_string()))
        }
    }
}

impl FromStr for ContinentFilter {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_with(s, ALL_CONTINENTS)
    }
}

impl TryFrom<String> for ContinentFilter {
    type Error = DashboardError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ContinentFilter> for String {
    fn from(value: ContinentFilter) -> Self {
        value.to_string()
    }
}

// ── Events ──────────────────────────────────────────────────────────────────

/// A clicked or lasso-selected chart point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedPoint {
    pub point_index: usize,
    #[serde(default)]
    pub label: Option<String>,
}

impl SelectedPoint {
    pub fn new(point_index: usize) -> Self {
        Self {
            point_index,
            label: None,
        }
    }
}

/// The most recent user interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "payload", rename_all = "snake_case")]
pub enum InteractionEvent {
    YearChanged(Year),
    ScenarioChanged(Scenario),
    BandChanged(Band),
    ContinentChanged(ContinentFilter),
    StatChanged(StatChoice),
    MapSelectionChanged(Vec<SelectedPoint>),
    ScatterSelectionChanged(Vec<SelectedPoint>),
}

/// Which control or chart produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionSource {
    Year,
    Scenario,
    Band,
    Continent,
    Stat,
    Map,
    Scatter,
}

impl InteractionSource {
    pub fn is_chart(self) -> bool {
        matches!(self, InteractionSource::Map | InteractionSource::Scatter)
    }
}

/// Accepts the short source names and the widget ids used by the page.
impl FromStr for InteractionSource {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        let source = match s.trim().to_ascii_lowercase().as_str() {
            "year" | "year-slider" => InteractionSource::Year,
            "scenario" | "scenario-type" => InteractionSource::Scenario,
            "band" | "estimation" | "estimation-type" => InteractionSource::Band,
            "continent" | "continent-filter" => InteractionSource::Continent,
            "stat" | "stats-type" => InteractionSource::Stat,
            "map" | "map-graph" => InteractionSource::Map,
            "scatter" | "scatter-graph" => InteractionSource::Scatter,
            _ => return Err(DashboardError::unknown("interaction source", s)),
        };
        Ok(source)
    }
}

impl InteractionEvent {
    /// Build an event from the loose (source tag, scalar value, point list)
    /// triple a callback framework hands over. Chart events without points
    /// are deselects.
    pub fn from_source(
        source: &str,
        value: Option<&str>,
        points: Option<Vec<SelectedPoint>>,
    ) -> Result<Self> {
        Self::from_source_with_label(source, value, points, ALL_CONTINENTS)
    }

    /// Like [`InteractionEvent::from_source`], with a custom label for the
    /// "all continents" dropdown option.
    pub fn from_source_with_label(
        source: &str,
        value: Option<&str>,
        points: Option<Vec<SelectedPoint>>,
        all_label: &str,
    ) -> Result<Self> {
        let source: InteractionSource = source.parse()?;
        let scalar = || {
            value.ok_or_else(|| DashboardError::Config(format!("{source:?} event carries no value")))
        };
        let event = match source {
            InteractionSource::Year => InteractionEvent::YearChanged(scalar()?.parse()?),
            InteractionSource::Scenario => InteractionEvent::ScenarioChanged(scalar()?.parse()?),
            InteractionSource::Band => InteractionEvent::BandChanged(scalar()?.parse()?),
            InteractionSource::Continent => InteractionEvent::ContinentChanged(
                ContinentFilter::parse_with(scalar()?, all_label)?,
            ),
            InteractionSource::Stat => InteractionEvent::StatChanged(scalar()?.parse()?),
            InteractionSource::Map => {
                InteractionEvent::MapSelectionChanged(points.unwrap_or_default())
            }
            InteractionSource::Scatter => {
                InteractionEvent::ScatterSelectionChanged(points.unwrap_or_default())
            }
        };
        Ok(event)
    }

    pub fn source(&self) -> InteractionSource {
        match self {
            InteractionEvent::YearChanged(_) => InteractionSource::Year,
            InteractionEvent::ScenarioChanged(_) => InteractionSource::Scenario,
            InteractionEvent::BandChanged(_) => InteractionSource::Band,
            InteractionEvent::ContinentChanged(_) => InteractionSource::Continent,
            InteractionEvent::StatChanged(_) => InteractionSource::Stat,
            InteractionEvent::MapSelectionChanged(_) => InteractionSource::Map,
            InteractionEvent::ScatterSelectionChanged(_) => InteractionSource::Scatter,
        }
    }

    /// Points carried by a chart event; `None` for control events.
    pub fn chart_points(&self) -> Option<&[SelectedPoint]> {
        match self {
            InteractionEvent::MapSelectionChanged(points)
            | InteractionEvent::ScatterSelectionChanged(points) => Some(points),
            _ => None,
        }
    }
}

// ── Control state ───────────────────────────────────────────────────────────

/// Current widget values plus the interaction that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    pub selected_year: Year,
    pub scenario: Scenario,
    #[serde(default = "default_band")]
    pub band: Band,
    pub continent_filter: ContinentFilter,
    pub stat_choice: StatChoice,
    #[serde(default)]
    pub last_interaction: Option<InteractionEvent>,
}

fn default_band() -> Band {
    Band::Midpoint
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            selected_year: Year::Y2015,
            scenario: Scenario::A,
            band: default_band(),
            continent_filter: ContinentFilter::All,
            stat_choice: StatChoice::GdpPerCapita,
            last_interaction: None,
        }
    }
}

impl SelectionState {
    /// Next state after `event`. Chart events leave the control values alone.
    pub fn apply(&self, event: InteractionEvent) -> SelectionState {
        let mut next = self.clone();
        match &event {
            InteractionEvent::YearChanged(year) => next.selected_year = *year,
            InteractionEvent::ScenarioChanged(scenario) => next.scenario = *scenario,
            InteractionEvent::BandChanged(band) => next.band = *band,
            InteractionEvent::ContinentChanged(filter) => next.continent_filter = filter.clone(),
            InteractionEvent::StatChanged(stat) => next.stat_choice = *stat,
            InteractionEvent::MapSelectionChanged(_)
            | InteractionEvent::ScatterSelectionChanged(_) => {}
        }
        next.last_interaction = Some(event);
        next
    }

    pub fn projection(&self) -> ProjectedMetrics {
        ProjectedMetrics::new(self.selected_year, self.scenario, self.band, self.stat_choice)
    }

    pub fn resolve(&self, dataset: &DerivedDataset) -> Result<ResolvedSelection> {
        resolve(dataset, self.last_interaction.as_ref(), &self.continent_filter)
    }
}

// ── Resolution ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrigin {
    /// Points clicked or lasso-selected on the map or scatter plot.
    Chart,
    Continent,
    All,
}

/// Countries currently in scope for highlighting and aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSelection {
    pub indices: BTreeSet<usize>,
    /// Display names of the selected rows, in row order.
    pub country_names: Vec<String>,
    pub origin: SelectionOrigin,
}

impl ResolvedSelection {
    pub fn all(dataset: &DerivedDataset) -> Result<Self> {
        Ok(Self {
            indices: (0..dataset.height()).collect(),
            country_names: dataset.country_names()?,
            origin: SelectionOrigin::All,
        })
    }

    fn from_rows(
        dataset: &DerivedDataset,
        indices: BTreeSet<usize>,
        origin: SelectionOrigin,
    ) -> Result<Self> {
        let names = dataset.country_names()?;
        let country_names = indices.iter().map(|&i| names[i].clone()).collect();
        Ok(Self {
            indices,
            country_names,
            origin,
        })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, row: usize) -> bool {
        self.indices.contains(&row)
    }

    /// Row-aligned highlight mask.
    pub fn mask(&self, height: usize) -> Vec<bool> {
        (0..height).map(|i| self.contains(i)).collect()
    }

    pub fn sorted_indices(&self) -> Vec<usize> {
        self.indices.iter().copied().collect()
    }
}

/// Resolve the selected rows for the latest interaction.
///
/// A map or scatter event with at least one point selects exactly those
/// points, ignoring the continent filter. Every other trigger selects the
/// continent filter's rows. Point indices outside the dataset are dropped.
pub fn resolve(
    dataset: &DerivedDataset,
    trigger: Option<&InteractionEvent>,
    continent: &ContinentFilter,
) -> Result<ResolvedSelection> {
    let chart_points = trigger
        .and_then(InteractionEvent::chart_points)
        .filter(|points| !points.is_empty());

    let resolved = match chart_points {
        Some(points) => {
            let height = dataset.height();
            let mut indices = BTreeSet::new();
            for point in points {
                if point.point_index < height {
                    indices.insert(point.point_index);
                } else {
                    warn!(
                        point_index = point.point_index,
                        label = point.label.as_deref().unwrap_or(""),
                        rows = height,
                        "dropping selected point outside dataset"
                    );
                }
            }
            ResolvedSelection::from_rows(dataset, indices, SelectionOrigin::Chart)?
        }
        None => match continent {
            ContinentFilter::All => ResolvedSelection::all(dataset)?,
            ContinentFilter::Named(name) => {
                continent.validate(dataset)?;
                let rows = dataset.rows_in_continent(name)?.into_iter().collect();
                ResolvedSelection::from_rows(dataset, rows, SelectionOrigin::Continent)?
            }
        },
    };

    debug!(
        trigger = ?trigger.map(InteractionEvent::source),
        continent = %continent,
        selected = resolved.len(),
        "selection resolved"
    );
    Ok(resolved)
}
