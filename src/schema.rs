/// Column-name table for the plastic-waste projection dataset.
/// Single source of truth for every column the core reads or derives;
/// exported to Python via PyO3.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DashboardError;

// ── Identity columns ────────────────────────────────────────────────────────
pub mod identity {
    pub const COUNTRY: &str = "Country";
    pub const ISO_CODE: &str = "ISO code";
    pub const CONTINENT: &str = "Continent";

    pub const ALL: [&str; 3] = [COUNTRY, ISO_CODE, CONTINENT];
}

// ── Auxiliary statistics (2015 only) ────────────────────────────────────────
pub mod aux {
    pub const MISMANAGED_FRACTION_2015: &str = "2015 median Mismanaged MSW fraction (%)";
    pub const MSW_PER_CAPITA_2015: &str = "2015 median Per Capita MSW (kg.y-1)";
}

// ── Estimation band ─────────────────────────────────────────────────────────

/// Uncertainty range label on an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Lower,
    Midpoint,
    Higher,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Lower, Band::Midpoint, Band::Higher];

    pub fn as_str(self) -> &'static str {
        match self {
            Band::Lower => "lower",
            Band::Midpoint => "midpoint",
            Band::Higher => "higher",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Band {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lower" => Ok(Band::Lower),
            "midpoint" => Ok(Band::Midpoint),
            "higher" => Ok(Band::Higher),
            _ => Err(DashboardError::unknown("estimation band", s)),
        }
    }
}

// ── Scenario ────────────────────────────────────────────────────────────────

/// Future waste-management trajectory.
///
/// A: business as usual, B: improved waste management,
/// C: reduced use and improved management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Scenario {
    A,
    B,
    C,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [Scenario::A, Scenario::B, Scenario::C];

    pub fn letter(self) -> &'static str {
        match self {
            Scenario::A => "A",
            Scenario::B => "B",
            Scenario::C => "C",
        }
    }

    /// Legend label, e.g. "Scenario A".
    pub fn label(self) -> String {
        format!("Scenario {}", self.letter())
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

/// Accepts "A", "scenarioA" and "Scenario A" in any case.
impl FromStr for Scenario {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        let letter = normalized.strip_prefix("scenario").unwrap_or(&normalized);
        match letter {
            "a" => Ok(Scenario::A),
            "b" => Ok(Scenario::B),
            "c" => Ok(Scenario::C),
            _ => Err(DashboardError::unknown("scenario", s)),
        }
    }
}

impl TryFrom<String> for Scenario {
    type Error = DashboardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Scenario> for String {
    fn from(value: Scenario) -> Self {
        value.letter().to_string()
    }
}

// ── Year ────────────────────────────────────────────────────────────────────

/// Years the dataset carries figures for. 2015 is the observed baseline and
/// has no scenario branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Year {
    Y2015,
    Y2020,
    Y2040,
    Y2060,
}

impl Year {
    pub const ALL: [Year; 4] = [Year::Y2015, Year::Y2020, Year::Y2040, Year::Y2060];
    pub const PROJECTED: [Year; 3] = [Year::Y2020, Year::Y2040, Year::Y2060];

    pub fn value(self) -> u16 {
        match self {
            Year::Y2015 => 2015,
            Year::Y2020 => 2020,
            Year::Y2040 => 2040,
            Year::Y2060 => 2060,
        }
    }

    pub fn is_baseline(self) -> bool {
        self == Year::Y2015
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl TryFrom<u16> for Year {
    type Error = DashboardError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Year::ALL
            .into_iter()
            .find(|y| y.value() == value)
            .ok_or_else(|| DashboardError::unknown("year", value.to_string()))
    }
}

impl From<Year> for u16 {
    fn from(value: Year) -> Self {
        value.value()
    }
}

impl FromStr for Year {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u16 = s
            .trim()
            .parse()
            .map_err(|_| DashboardError::unknown("year", s))?;
        Year::try_from(value)
    }
}

// ── Column lookup ───────────────────────────────────────────────────────────

/// Mismanaged plastic waste mass. The scenario is ignored for 2015.
pub fn mpw(band: Band, scenario: Scenario, year: Year) -> String {
    if year.is_baseline() {
        format!("{band}-mpw-2015")
    } else {
        format!("{band}-mpw-scenario{scenario}-{year}")
    }
}

/// Total plastic waste mass. Never scenario-dependent.
pub fn total_pw(band: Band, year: Year) -> String {
    format!("{band}-total-pw-{year}")
}

/// Derived mismanaged / total ratio. The scenario is ignored for 2015.
pub fn percent(band: Band, scenario: Scenario, year: Year) -> String {
    if year.is_baseline() {
        format!("{band}-percent-2015")
    } else {
        format!("{band}-percent-scenario{scenario}-{year}")
    }
}

pub fn population(year: Year) -> String {
    format!("{year} Population (x1000 ppl)")
}

pub fn gdp_per_capita(year: Year) -> String {
    format!("{year} Per Capita GDP (2016 USD)")
}

/// One derived percent column and the raw columns it is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PercentSource {
    pub band: Band,
    /// `None` for the 2015 baseline.
    pub scenario: Option<Scenario>,
    pub year: Year,
}

impl PercentSource {
    fn scenario_or_default(&self) -> Scenario {
        self.scenario.unwrap_or(Scenario::A)
    }

    pub fn name(&self) -> String {
        percent(self.band, self.scenario_or_default(), self.year)
    }

    pub fn numerator(&self) -> String {
        mpw(self.band, self.scenario_or_default(), self.year)
    }

    pub fn denominator(&self) -> String {
        total_pw(self.band, self.year)
    }
}

/// Every percent column the normalizer derives: one baseline per band plus
/// one per (band, scenario, projected year).
pub fn percent_sources() -> Vec<PercentSource> {
    let mut out = Vec::with_capacity(Band::ALL.len() * (1 + Scenario::ALL.len() * 3));
    for band in Band::ALL {
        out.push(PercentSource {
            band,
            scenario: None,
            year: Year::Y2015,
        });
        for scenario in Scenario::ALL {
            for year in Year::PROJECTED {
                out.push(PercentSource {
                    band,
                    scenario: Some(scenario),
                    year,
                });
            }
        }
    }
    out
}

/// Every numeric column the raw table must carry.
pub fn numeric_columns() -> Vec<String> {
    let mut cols = Vec::new();
    for band in Band::ALL {
        cols.push(mpw(band, Scenario::A, Year::Y2015));
        for scenario in Scenario::ALL {
            for year in Year::PROJECTED {
                cols.push(mpw(band, scenario, year));
            }
        }
        for year in Year::ALL {
            cols.push(total_pw(band, year));
        }
    }
    for year in Year::ALL {
        cols.push(population(year));
        cols.push(gdp_per_capita(year));
    }
    cols.push(aux::MISMANAGED_FRACTION_2015.to_string());
    cols.push(aux::MSW_PER_CAPITA_2015.to_string());
    cols
}

/// Full raw schema: identity columns followed by numeric columns.
pub fn required_columns() -> Vec<String> {
    identity::ALL
        .iter()
        .map(|c| c.to_string())
        .chain(numeric_columns())
        .collect()
}
