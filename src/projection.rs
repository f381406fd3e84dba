use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::DerivedDataset;
use crate::error::{DashboardError, Result};
use crate::schema::{self, aux, Band, Scenario, Year};

/// Names of the request-scoped columns produced by [`ProjectedMetrics::view`].
pub mod view_columns {
    pub const ACTIVE_PERCENT: &str = "active_percent";
    pub const STAT_VALUE: &str = "stat_value";
    pub const POPULATION: &str = "population";
    pub const GDP_PER_CAPITA: &str = "gdp_per_capita";
    pub const RECYCLING: &str = "recycling";
    pub const MSW_PER_CAPITA: &str = "msw_per_capita";
}

// ── Statistic choice ────────────────────────────────────────────────────────

/// Comparison statistic plotted on the scatter x-axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StatChoice {
    Population,
    GdpPerCapita,
    Recycling,
    MswPerCapita,
}

impl StatChoice {
    pub const ALL: [StatChoice; 4] = [
        StatChoice::Population,
        StatChoice::GdpPerCapita,
        StatChoice::Recycling,
        StatChoice::MswPerCapita,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StatChoice::Population => "Population",
            StatChoice::GdpPerCapita => "GDP per capita",
            StatChoice::Recycling => "% recycling",
            StatChoice::MswPerCapita => "Total MSW per capita",
        }
    }

    /// Where the x values come from. Recycling and MSW only exist for 2015
    /// and ignore the selected year.
    pub fn accessor(self, year: Year) -> StatAccessor {
        match self {
            StatChoice::Population => StatAccessor::Column(schema::population(year)),
            StatChoice::GdpPerCapita => StatAccessor::Column(schema::gdp_per_capita(year)),
            StatChoice::Recycling => {
                StatAccessor::Complement(aux::MISMANAGED_FRACTION_2015.to_string())
            }
            StatChoice::MswPerCapita => {
                StatAccessor::Column(aux::MSW_PER_CAPITA_2015.to_string())
            }
        }
    }
}

impl fmt::Display for StatChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StatChoice {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        StatChoice::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DashboardError::unknown("statistic", s))
    }
}

impl TryFrom<String> for StatChoice {
    type Error = DashboardError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<StatChoice> for String {
    fn from(value: StatChoice) -> Self {
        value.label().to_string()
    }
}

/// Typed reference to the column (or derived expression) behind a statistic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatAccessor {
    Column(String),
    /// `1 - column`
    Complement(String),
}

impl StatAccessor {
    pub fn source_column(&self) -> &str {
        match self {
            StatAccessor::Column(c) | StatAccessor::Complement(c) => c,
        }
    }

    pub fn expr(&self) -> Expr {
        match self {
            StatAccessor::Column(c) => col(c.as_str()),
            StatAccessor::Complement(c) => lit(1.0) - col(c.as_str()),
        }
    }
}

// ── Projection ──────────────────────────────────────────────────────────────

/// Which columns to plot for a (year, scenario, band, statistic) choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedMetrics {
    pub year: Year,
    pub scenario: Scenario,
    pub band: Band,
    pub stat: StatChoice,
    /// Percent column used for map colour and scatter y.
    pub percent_column: String,
    pub stat_accessor: StatAccessor,
}

impl ProjectedMetrics {
    /// 2015 has no scenario branching, so the scenario only matters for
    /// projected years.
    pub fn new(year: Year, scenario: Scenario, band: Band, stat: StatChoice) -> Self {
        Self {
            year,
            scenario,
            band,
            stat,
            percent_column: schema::percent(band, scenario, year),
            stat_accessor: stat.accessor(year),
        }
    }

    pub fn x_axis_title(&self) -> &'static str {
        self.stat.label()
    }

    pub fn year_label(&self) -> String {
        self.year.to_string()
    }

    /// Request-scoped view holding the active percent, the chosen statistic
    /// and the hover fields. Never written back into the shared dataset.
    pub fn view(&self, dataset: &DerivedDataset) -> Result<MetricView> {
        use view_columns::*;

        let df = dataset
            .frame()
            .clone()
            .lazy()
            .select([
                col(self.percent_column.as_str()).alias(ACTIVE_PERCENT),
                self.stat_accessor.expr().alias(STAT_VALUE),
                col(schema::population(self.year).as_str()).alias(POPULATION),
                col(schema::gdp_per_capita(self.year).as_str()).alias(GDP_PER_CAPITA),
                StatChoice::Recycling
                    .accessor(self.year)
                    .expr()
                    .alias(RECYCLING),
                col(aux::MSW_PER_CAPITA_2015).alias(MSW_PER_CAPITA),
            ])
            .collect()?;

        Ok(MetricView {
            percent: float_column(&df, ACTIVE_PERCENT)?,
            stat: float_column(&df, STAT_VALUE)?,
            population: float_column(&df, POPULATION)?,
            gdp_per_capita: float_column(&df, GDP_PER_CAPITA)?,
            recycling: float_column(&df, RECYCLING)?,
            msw_per_capita: float_column(&df, MSW_PER_CAPITA)?,
        })
    }
}

/// Per-row values extracted for one request, aligned with dataset rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricView {
    /// Ratio in [0, 1]; `None` where undefined.
    pub percent: Vec<Option<f64>>,
    pub stat: Vec<Option<f64>>,
    pub population: Vec<Option<f64>>,
    pub gdp_per_capita: Vec<Option<f64>>,
    /// Recycled fraction (1 - 2015 mismanaged fraction).
    pub recycling: Vec<Option<f64>>,
    pub msw_per_capita: Vec<Option<f64>>,
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let ca = df.column(name)?.f64()?;
    Ok(ca.into_iter().map(|v| v.filter(|x| x.is_finite())).collect())
}
