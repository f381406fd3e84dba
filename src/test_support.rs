//! Synthetic datasets shared by the unit tests.

use polars::prelude::*;

use crate::dataset::DerivedDataset;
use crate::schema::{self, aux, identity, Band, Scenario, Year};

#[derive(Debug, Clone)]
pub struct FixtureCountry {
    pub name: &'static str,
    pub iso: &'static str,
    pub continent: &'static str,
    /// Midpoint 2015 mismanaged mass; every other mpw value is scaled from it.
    pub mpw: f64,
    /// 2015 total plastic waste; projected years scale it by the same growth.
    pub total: f64,
    pub population: f64,
    pub gdp: f64,
    pub mismanaged_fraction: f64,
    pub msw: f64,
}

pub fn band_factor(band: Band) -> f64 {
    match band {
        Band::Lower => 0.5,
        Band::Midpoint => 1.0,
        Band::Higher => 1.5,
    }
}

pub fn scenario_factor(scenario: Scenario) -> f64 {
    match scenario {
        Scenario::A => 1.0,
        Scenario::B => 0.8,
        Scenario::C => 0.6,
    }
}

pub fn growth(year: Year) -> f64 {
    match year {
        Year::Y2015 => 1.0,
        Year::Y2020 => 1.1,
        Year::Y2040 => 1.5,
        Year::Y2060 => 2.0,
    }
}

impl FixtureCountry {
    pub fn mpw_for(&self, band: Band, scenario: Scenario, year: Year) -> f64 {
        let scenario = if year.is_baseline() {
            1.0
        } else {
            scenario_factor(scenario)
        };
        self.mpw * band_factor(band) * scenario * growth(year)
    }

    pub fn total_for(&self, year: Year) -> f64 {
        self.total * growth(year)
    }
}

pub fn sample_countries() -> Vec<FixtureCountry> {
    vec![
        FixtureCountry {
            name: "France",
            iso: "FRA",
            continent: "Europe",
            mpw: 10.0,
            total: 100.0,
            population: 64_457.0,
            gdp: 41_466.7,
            mismanaged_fraction: 0.05,
            msw: 510.0,
        },
        FixtureCountry {
            name: "Germany",
            iso: "DEU",
            continent: "Europe",
            mpw: 4.0,
            total: 200.0,
            population: 81_708.0,
            gdp: 47_821.9,
            mismanaged_fraction: 0.01,
            msw: 630.0,
        },
        FixtureCountry {
            name: "China",
            iso: "CHN",
            continent: "Asia",
            mpw: 300.0,
            total: 600.0,
            population: 1_397_029.0,
            gdp: 8_147.9,
            mismanaged_fraction: 0.42,
            msw: 290.0,
        },
        FixtureCountry {
            name: "India",
            iso: "IND",
            continent: "Asia",
            mpw: 120.0,
            total: 240.0,
            population: 1_310_152.0,
            gdp: 1_639.7,
            mismanaged_fraction: 0.6,
            msw: 120.0,
        },
        FixtureCountry {
            name: "Tuvalu",
            iso: "TUV",
            continent: "Oceania",
            mpw: 0.1,
            total: 0.0,
            population: 11.0,
            gdp: 3_700.0,
            mismanaged_fraction: 0.3,
            msw: 200.0,
        },
    ]
}

/// Raw table carrying every column of the documented schema.
pub fn raw_frame(countries: &[FixtureCountry]) -> DataFrame {
    let mut columns: Vec<Column> = Vec::new();

    let text = |name: &str, f: fn(&FixtureCountry) -> &'static str| -> Column {
        let values: Vec<&str> = countries.iter().map(f).collect();
        Column::new(name.into(), values)
    };
    columns.push(text(identity::COUNTRY, |c| c.name));
    columns.push(text(identity::ISO_CODE, |c| c.iso));
    columns.push(text(identity::CONTINENT, |c| c.continent));

    let mut numeric = |name: String, f: &dyn Fn(&FixtureCountry) -> f64| {
        let values: Vec<f64> = countries.iter().map(f).collect();
        columns.push(Column::new(name.as_str().into(), values));
    };

    for band in Band::ALL {
        numeric(schema::mpw(band, Scenario::A, Year::Y2015), &|c: &FixtureCountry| {
            c.mpw_for(band, Scenario::A, Year::Y2015)
        });
        for scenario in Scenario::ALL {
            for year in Year::PROJECTED {
                numeric(schema::mpw(band, scenario, year), &|c: &FixtureCountry| {
                    c.mpw_for(band, scenario, year)
                });
            }
        }
        for year in Year::ALL {
            numeric(schema::total_pw(band, year), &|c: &FixtureCountry| c.total_for(year));
        }
    }
    for year in Year::ALL {
        numeric(schema::population(year), &|c: &FixtureCountry| c.population * growth(year));
        numeric(schema::gdp_per_capita(year), &|c: &FixtureCountry| c.gdp * growth(year));
    }
    numeric(aux::MISMANAGED_FRACTION_2015.to_string(), &|c: &FixtureCountry| {
        c.mismanaged_fraction
    });
    numeric(aux::MSW_PER_CAPITA_2015.to_string(), &|c: &FixtureCountry| c.msw);

    DataFrame::new(columns).expect("fixture frame")
}

pub fn sample_dataset() -> DerivedDataset {
    DerivedDataset::from_frame(raw_frame(&sample_countries())).expect("fixture dataset")
}
