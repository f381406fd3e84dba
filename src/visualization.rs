/// Visualization module: declarative chart specs for the dashboard.
///
/// Produces three renderer-agnostic specs per interaction:
/// - Choropleth map of the mismanaged plastic share per country
/// - Scatter plot of that share against a comparison statistic
/// - Scenario time series of summed mismanaged plastic with uncertainty bands
///
/// Nothing here renders. Each builder extracts values from the dataset and the
/// request-scoped metric view and returns a `Serialize` struct the
/// presentation layer turns into whatever its charting library expects.
use serde::{Serialize, Serializer};

use crate::aggregation::{scenario_totals, take_rows, ScenarioTotals};
use crate::config::ChartConfig;
use crate::dataset::DerivedDataset;
use crate::error::Result;
use crate::projection::{MetricView, ProjectedMetrics};
use crate::schema::{Scenario, Year};
use crate::selection::{ResolvedSelection, SelectionOrigin};

pub const MAP_TITLE: &str = "Mismanaged plastic proportion by country";
pub const SCATTER_TITLE: &str = "Mismanaged plastic proportion and statistics";
pub const TIME_SERIES_TITLE: &str = "Mismanaged plastic evolution";
pub const PERCENT_AXIS_TITLE: &str = "% mismanaged plastic";

const TRANSPARENT: &str = "rgba(0,0,0,0)";

/// Template over the 7-field hover tuple, see [`HoverTuple`].
pub const HOVER_TEMPLATE: &str = concat!(
    "<b>%{customdata[0]} - %{customdata[6]}</b><br /><br />",
    "<b>Mismanaged plastic proportion:</b> %{customdata[1]} %<br /><br />",
    "<b>Population (%{customdata[6]}):</b> %{customdata[2]} millions<br />",
    "<b>GDP per capita (%{customdata[6]}):</b> %{customdata[3]} (2016 USD)<br />",
    "<b>% overall recycling (2015):</b> %{customdata[4]} %<br />",
    "<b>Total MSW (Municipal Solid Waste) per capita (2015):</b> %{customdata[5]} kg/year<br />",
);

// ── Shared structures ───────────────────────────────────────────────────────

/// Per-country hover payload. Serialized as a 7-element array so templates
/// can index it positionally.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverTuple {
    pub country: String,
    /// Mismanaged share in percent, 2 decimals.
    pub percent: Option<f64>,
    /// Population in millions (the source column is in thousands).
    pub population_millions: Option<f64>,
    /// GDP per capita truncated to whole 2016 USD.
    pub gdp_per_capita: Option<i64>,
    /// Recycled share in percent (from the 2015 mismanaged fraction), 2 decimals.
    pub recycling_percent: Option<f64>,
    pub msw_per_capita: Option<f64>,
    pub year: String,
}

impl Serialize for HoverTuple {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        (
            &self.country,
            self.percent,
            self.population_millions,
            self.gdp_per_capita,
            self.recycling_percent,
            self.msw_per_capita,
            &self.year,
        )
            .serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Margin {
    pub r: u32,
    pub t: u32,
    pub l: u32,
    pub b: u32,
}

impl Margin {
    fn top(t: u32) -> Self {
        Self { r: 0, t, l: 0, b: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: String,
    pub grid_color: String,
    pub tick_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_values: Option<Vec<u16>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick_text: Option<Vec<String>>,
}

impl Axis {
    fn new(title: impl Into<String>, config: &ChartConfig) -> Self {
        Self {
            title: title.into(),
            grid_color: config.grid_color.clone(),
            tick_color: config.tick_color.clone(),
            tick_values: None,
            tick_text: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLayout {
    pub title: String,
    pub height: u32,
    pub paper_bgcolor: String,
    pub plot_bgcolor: String,
    pub margin: Margin,
    pub hover_font_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<Axis>,
}

// ── Map ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub iso_code: String,
    pub country: String,
    /// Mismanaged share in percent; `None` where undefined.
    pub value: Option<f64>,
    pub highlighted: bool,
    pub hover: HoverTuple,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapChart {
    pub points: Vec<MapPoint>,
    pub selected_points: Vec<usize>,
    pub colorscale: String,
    pub zmin: f64,
    pub zmid: f64,
    pub zmax: f64,
    pub colorbar_title: String,
    pub hover_template: String,
    pub layout: ChartLayout,
}

// ── Scatter ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub country: String,
    pub x: Option<f64>,
    /// Mismanaged share in percent, also the marker colour.
    pub y: Option<f64>,
    pub highlighted: bool,
    pub hover: HoverTuple,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterChart {
    pub points: Vec<ScatterPoint>,
    pub selected_points: Vec<usize>,
    pub colorscale: String,
    pub colorbar_title: String,
    pub hover_template: String,
    pub layout: ChartLayout,
}

// ── Time series ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSeries {
    pub scenario: Scenario,
    pub name: String,
    pub line_color: String,
    pub fill_color: String,
    pub years: Vec<u16>,
    pub lower: Vec<f64>,
    pub midpoint: Vec<f64>,
    pub higher: Vec<f64>,
    /// Closed outline of the uncertainty band: years then years reversed.
    pub band_x: Vec<u16>,
    /// Higher values then lower values reversed.
    pub band_y: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesChart {
    pub series: Vec<ScenarioSeries>,
    /// Number of countries aggregated (the whole dataset on fallback).
    pub aggregated_rows: usize,
    pub layout: ChartLayout,
}

/// Line colour (r, g, b) per scenario; the band uses the same colour at 15% alpha.
fn scenario_rgb(scenario: Scenario) -> (u8, u8, u8) {
    match scenario {
        Scenario::A => (134, 42, 92),
        Scenario::B => (251, 120, 19),
        Scenario::C => (33, 140, 116),
    }
}

// ── Builders ────────────────────────────────────────────────────────────────

/// Everything the map and scatter builders share for one request.
pub struct ChartContext<'a> {
    pub dataset: &'a DerivedDataset,
    pub metrics: &'a ProjectedMetrics,
    pub config: &'a ChartConfig,
    pub view: MetricView,
    countries: Vec<String>,
    hover: Vec<HoverTuple>,
}

impl<'a> ChartContext<'a> {
    pub fn new(
        dataset: &'a DerivedDataset,
        metrics: &'a ProjectedMetrics,
        config: &'a ChartConfig,
    ) -> Result<Self> {
        let view = metrics.view(dataset)?;
        let countries = dataset.country_names()?;
        let hover = hover_tuples(&countries, &view, &metrics.year_label());
        Ok(Self {
            dataset,
            metrics,
            config,
            view,
            countries,
            hover,
        })
    }

    pub fn hover(&self) -> &[HoverTuple] {
        &self.hover
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn as_percent(ratio: Option<f64>) -> Option<f64> {
    ratio.map(|r| r * 100.0)
}

fn hover_tuples(countries: &[String], view: &MetricView, year: &str) -> Vec<HoverTuple> {
    countries
        .iter()
        .enumerate()
        .map(|(i, country)| HoverTuple {
            country: country.clone(),
            percent: as_percent(view.percent[i]).map(round2),
            population_millions: view.population[i].map(|p| p / 1000.0),
            gdp_per_capita: view.gdp_per_capita[i].map(|g| g.trunc() as i64),
            recycling_percent: as_percent(view.recycling[i]).map(round2),
            msw_per_capita: view.msw_per_capita[i],
            year: year.to_string(),
        })
        .collect()
}

/// One point per country over the full dataset; the selection only drives
/// the highlight mask.
pub fn build_map(ctx: &ChartContext<'_>, selection: &ResolvedSelection) -> Result<MapChart> {
    let iso_codes = ctx.dataset.iso_codes()?;
    let points = ctx
        .countries
        .iter()
        .enumerate()
        .map(|(i, country)| MapPoint {
            iso_code: iso_codes[i].clone(),
            country: country.clone(),
            value: as_percent(ctx.view.percent[i]),
            highlighted: selection.contains(i),
            hover: ctx.hover[i].clone(),
        })
        .collect();

    Ok(MapChart {
        points,
        selected_points: selection.sorted_indices(),
        colorscale: ctx.config.colorscale.clone(),
        zmin: 100.0,
        zmid: 50.0,
        zmax: 0.0,
        colorbar_title: PERCENT_AXIS_TITLE.to_string(),
        hover_template: HOVER_TEMPLATE.to_string(),
        layout: ChartLayout {
            title: MAP_TITLE.to_string(),
            height: ctx.config.map_height,
            paper_bgcolor: TRANSPARENT.to_string(),
            plot_bgcolor: TRANSPARENT.to_string(),
            margin: Margin::top(30),
            hover_font_size: ctx.config.hover_font_size,
            x_axis: None,
            y_axis: None,
        },
    })
}

/// Share of mismanaged plastic against the chosen statistic, full dataset
/// with the same highlight mask as the map.
pub fn build_scatter(
    ctx: &ChartContext<'_>,
    selection: &ResolvedSelection,
) -> Result<ScatterChart> {
    let points = ctx
        .countries
        .iter()
        .enumerate()
        .map(|(i, country)| ScatterPoint {
            country: country.clone(),
            x: ctx.view.stat[i],
            y: as_percent(ctx.view.percent[i]),
            highlighted: selection.contains(i),
            hover: ctx.hover[i].clone(),
        })
        .collect();

    Ok(ScatterChart {
        points,
        selected_points: selection.sorted_indices(),
        colorscale: ctx.config.colorscale.clone(),
        colorbar_title: PERCENT_AXIS_TITLE.to_string(),
        hover_template: HOVER_TEMPLATE.to_string(),
        layout: ChartLayout {
            title: SCATTER_TITLE.to_string(),
            height: ctx.config.scatter_height,
            paper_bgcolor: ctx.config.paper_bgcolor.clone(),
            plot_bgcolor: ctx.config.plot_bgcolor.clone(),
            margin: Margin::top(40),
            hover_font_size: ctx.config.hover_font_size,
            x_axis: Some(Axis::new(ctx.metrics.x_axis_title(), ctx.config)),
            y_axis: Some(Axis::new(PERCENT_AXIS_TITLE, ctx.config)),
        },
    })
}

/// Summed mismanaged plastic per scenario over the selected countries, or
/// over every country when the selection is empty.
pub fn build_time_series(
    dataset: &DerivedDataset,
    selection: &ResolvedSelection,
    config: &ChartConfig,
) -> Result<TimeSeriesChart> {
    let (group, aggregated_rows) = if selection.is_empty() {
        (dataset.frame().clone(), dataset.height())
    } else {
        let rows = selection.sorted_indices();
        (take_rows(dataset.frame(), &rows)?, rows.len())
    };

    let series = scenario_totals(&group)?
        .iter()
        .map(scenario_series)
        .collect();

    let title = match selection.origin {
        SelectionOrigin::Chart | SelectionOrigin::Continent if !selection.is_empty() => format!(
            "{TIME_SERIES_TITLE} - {}",
            selection.country_names.join(config.title_separator.as_str())
        ),
        _ => TIME_SERIES_TITLE.to_string(),
    };

    let years: Vec<u16> = Year::ALL.iter().map(|y| y.value()).collect();
    let mut x_axis = Axis::new("Year", config);
    x_axis.tick_text = Some(years.iter().map(|y| y.to_string()).collect());
    x_axis.tick_values = Some(years);

    Ok(TimeSeriesChart {
        series,
        aggregated_rows,
        layout: ChartLayout {
            title,
            height: config.time_series_height,
            paper_bgcolor: config.paper_bgcolor.clone(),
            plot_bgcolor: config.plot_bgcolor.clone(),
            margin: Margin::top(40),
            hover_font_size: config.hover_font_size,
            x_axis: Some(x_axis),
            y_axis: Some(Axis::new("MPW (kg)", config)),
        },
    })
}

fn scenario_series(totals: &ScenarioTotals) -> ScenarioSeries {
    let years: Vec<u16> = Year::ALL.iter().map(|y| y.value()).collect();
    let band_x: Vec<u16> = years.iter().chain(years.iter().rev()).copied().collect();
    let band_y: Vec<f64> = totals
        .higher
        .iter()
        .chain(totals.lower.iter().rev())
        .copied()
        .collect();
    let (r, g, b) = scenario_rgb(totals.scenario);

    ScenarioSeries {
        scenario: totals.scenario,
        name: totals.scenario.label(),
        line_color: format!("rgb({r}, {g}, {b})"),
        fill_color: format!("rgba({r}, {g}, {b}, 0.15)"),
        years,
        lower: totals.lower.to_vec(),
        midpoint: totals.midpoint.to_vec(),
        higher: totals.higher.to_vec(),
        band_x,
        band_y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::StatChoice;
    use crate::schema::Band;
    use crate::selection::{resolve, ContinentFilter, InteractionEvent, SelectedPoint};
    use crate::test_support::{raw_frame, sample_countries, sample_dataset};

    fn context<'a>(
        ds: &'a DerivedDataset,
        metrics: &'a ProjectedMetrics,
        config: &'a ChartConfig,
    ) -> ChartContext<'a> {
        ChartContext::new(ds, metrics, config).unwrap()
    }

    fn chart_selection(ds: &DerivedDataset, rows: &[usize]) -> ResolvedSelection {
        let points = rows.iter().copied().map(SelectedPoint::new).collect();
        resolve(ds, Some(&InteractionEvent::MapSelectionChanged(points)), &ContinentFilter::All)
            .unwrap()
    }

    #[test]
    fn hover_tuple_for_two_country_dataset() {
        let countries = sample_countries()[..2].to_vec();
        let ds = DerivedDataset::from_frame(raw_frame(&countries)).unwrap();
        let metrics = ProjectedMetrics::new(Year::Y2015, Scenario::A, Band::Midpoint, StatChoice::Population);
        let config = ChartConfig::default();
        let ctx = context(&ds, &metrics, &config);

        let expected = HoverTuple {
            country: "France".into(),
            percent: Some(10.0),
            population_millions: Some(64.457),
            gdp_per_capita: Some(41_466),
            recycling_percent: Some(95.0),
            msw_per_capita: Some(510.0),
            year: "2015".into(),
        };
        assert_eq!(ctx.hover()[0], expected);
        assert_eq!(
            serde_json::to_value(&ctx.hover()[0]).unwrap(),
            serde_json::json!(["France", 10.0, 64.457, 41466, 95.0, 510.0, "2015"])
        );
        assert_eq!(ctx.hover()[1].percent, Some(2.0));
    }

    #[test]
    fn map_covers_full_dataset_with_highlight_mask() {
        let ds = sample_dataset();
        let metrics = ProjectedMetrics::new(Year::Y2015, Scenario::A, Band::Midpoint, StatChoice::GdpPerCapita);
        let config = ChartConfig::default();
        let ctx = context(&ds, &metrics, &config);
        let selection = chart_selection(&ds, &[2]);

        let map = build_map(&ctx, &selection).unwrap();
        assert_eq!(map.points.len(), ds.height());
        assert_eq!(map.selected_points, vec![2]);
        let highlighted: Vec<bool> = map.points.iter().map(|p| p.highlighted).collect();
        assert_eq!(highlighted, vec![false, false, true, false, false]);
        assert_eq!(map.points[0].value, Some(10.0));
        assert_eq!(map.points[2].iso_code, "CHN");
        // Undefined share stays undefined, never zero.
        assert_eq!(map.points[4].value, None);
        assert_eq!(map.points[4].hover.percent, None);
        assert_eq!(map.layout.height, 380);
    }

    #[test]
    fn baseline_year_values_are_scenario_invariant() {
        let ds = sample_dataset();
        let config = ChartConfig::default();
        let selection = ResolvedSelection::all(&ds).unwrap();

        let values = |scenario: Scenario| {
            let metrics = ProjectedMetrics::new(Year::Y2015, scenario, Band::Midpoint, StatChoice::Population);
            let ctx = context(&ds, &metrics, &config);
            let map = build_map(&ctx, &selection).unwrap();
            let scatter = build_scatter(&ctx, &selection).unwrap();
            (
                map.points.iter().map(|p| p.value).collect::<Vec<_>>(),
                scatter.points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>(),
            )
        };
        assert_eq!(values(Scenario::A), values(Scenario::B));
        assert_eq!(values(Scenario::A), values(Scenario::C));
    }

    #[test]
    fn scatter_plots_stat_against_percent() {
        let ds = sample_dataset();
        let metrics = ProjectedMetrics::new(Year::Y2060, Scenario::C, Band::Midpoint, StatChoice::MswPerCapita);
        let config = ChartConfig::default();
        let ctx = context(&ds, &metrics, &config);
        let scatter = build_scatter(&ctx, &ResolvedSelection::all(&ds).unwrap()).unwrap();

        assert_eq!(scatter.points[1].x, Some(630.0));
        let expected = 4.0 * 0.6 * 2.0 / (200.0 * 2.0) * 100.0;
        assert!((scatter.points[1].y.unwrap() - expected).abs() < 1e-9);
        assert!(scatter.points.iter().all(|p| p.highlighted));
        assert_eq!(scatter.layout.x_axis.as_ref().unwrap().title, "Total MSW per capita");
        assert_eq!(scatter.layout.y_axis.as_ref().unwrap().title, PERCENT_AXIS_TITLE);
        assert_eq!(scatter.points[1].hover.year, "2060");
    }

    #[test]
    fn time_series_falls_back_to_full_dataset_on_empty_selection() {
        let ds = sample_dataset();
        let config = ChartConfig::default();
        let empty = chart_selection(&ds, &[99]);
        assert!(empty.is_empty());

        let fallback = build_time_series(&ds, &empty, &config).unwrap();
        let full = build_time_series(&ds, &ResolvedSelection::all(&ds).unwrap(), &config).unwrap();

        assert_eq!(fallback.aggregated_rows, ds.height());
        assert_eq!(fallback.series, full.series);
        assert_eq!(fallback.series.len(), 3);
        assert!(fallback.series.iter().all(|s| s.midpoint.len() == 4));
        assert!(fallback.series[0].midpoint.iter().all(|v| *v > 0.0));
        assert_eq!(fallback.layout.title, TIME_SERIES_TITLE);
    }

    #[test]
    fn time_series_aggregates_only_selected_rows() {
        let ds = sample_dataset();
        let config = ChartConfig::default();
        let selection = chart_selection(&ds, &[0, 1]);
        let chart = build_time_series(&ds, &selection, &config).unwrap();

        assert_eq!(chart.aggregated_rows, 2);
        assert_eq!(chart.layout.title, "Mismanaged plastic evolution - France, Germany");
        // 2015 midpoint: 10 + 4
        assert!((chart.series[0].midpoint[0] - 14.0).abs() < 1e-9);
        // 2060 scenario B midpoint: (10 + 4) * 0.8 * 2.0
        assert!((chart.series[1].midpoint[3] - 22.4).abs() < 1e-9);
    }

    #[test]
    fn continent_selection_names_countries_in_title() {
        let ds = sample_dataset();
        let config = ChartConfig::default();
        let selection = resolve(&ds, None, &ContinentFilter::named("Asia")).unwrap();
        let chart = build_time_series(&ds, &selection, &config).unwrap();
        assert_eq!(chart.layout.title, "Mismanaged plastic evolution - China, India");
    }

    #[test]
    fn bands_are_ordered_for_monotonic_input() {
        let ds = sample_dataset();
        let chart = build_time_series(&ds, &ResolvedSelection::all(&ds).unwrap(), &ChartConfig::default())
            .unwrap();
        for series in &chart.series {
            for i in 0..4 {
                assert!(series.higher[i] >= series.midpoint[i]);
                assert!(series.midpoint[i] >= series.lower[i]);
            }
        }
    }

    #[test]
    fn band_polygon_is_closed_outline() {
        let ds = sample_dataset();
        let chart = build_time_series(&ds, &ResolvedSelection::all(&ds).unwrap(), &ChartConfig::default())
            .unwrap();
        let a = &chart.series[0];
        assert_eq!(a.band_x, vec![2015, 2020, 2040, 2060, 2060, 2040, 2020, 2015]);
        assert_eq!(a.band_y[..4], a.higher[..]);
        assert_eq!(a.band_y[4], a.lower[3]);
        assert_eq!(a.band_y[7], a.lower[0]);
        assert_eq!(a.line_color, "rgb(134, 42, 92)");
        assert_eq!(a.fill_color, "rgba(134, 42, 92, 0.15)");
        assert_eq!(a.name, "Scenario A");
        let x_axis = chart.layout.x_axis.as_ref().unwrap();
        assert_eq!(x_axis.tick_text.as_deref().unwrap(), ["2015", "2020", "2040", "2060"]);
    }
}
