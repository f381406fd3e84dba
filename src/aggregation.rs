use std::collections::HashMap;

use polars::prelude::*;

use crate::error::{DashboardError, Result};
use crate::schema::{self, Band, Scenario, Year};

/// Restrict a frame to the given row indices, in the given order.
pub fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = rows
        .iter()
        .map(|&i| {
            IdxSize::try_from(i)
                .map_err(|_| DashboardError::InvalidData(format!("row index {i} out of range")))
        })
        .collect::<Result<_>>()?;
    let idx = IdxCa::from_vec("rows".into(), idx);
    Ok(df.take(&idx)?)
}

/// Column sums over every row of `group`. Nulls are skipped, so an all-null
/// column sums to zero.
pub fn sum_columns(group: &DataFrame, columns: &[String]) -> Result<HashMap<String, f64>> {
    let mut results = HashMap::with_capacity(columns.len());
    for col_name in columns {
        let s = group.column(col_name.as_str())?.as_materialized_series();
        let val = s.sum_reduce()?;
        let f = val.value().try_extract::<f64>().unwrap_or(0.0);
        results.insert(col_name.clone(), f);
    }
    Ok(results)
}

/// Summed mismanaged plastic mass for one scenario, one value per year.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioTotals {
    pub scenario: Scenario,
    pub lower: [f64; 4],
    pub midpoint: [f64; 4],
    pub higher: [f64; 4],
}

impl ScenarioTotals {
    pub fn band(&self, band: Band) -> &[f64; 4] {
        match band {
            Band::Lower => &self.lower,
            Band::Midpoint => &self.midpoint,
            Band::Higher => &self.higher,
        }
    }
}

/// Sum every (scenario, band, year) mpw column over `group`. The 2015
/// baseline is shared by all scenarios.
pub fn scenario_totals(group: &DataFrame) -> Result<Vec<ScenarioTotals>> {
    let mut columns = Vec::new();
    for scenario in Scenario::ALL {
        for band in Band::ALL {
            for year in Year::ALL {
                let name = schema::mpw(band, scenario, year);
                if !columns.contains(&name) {
                    columns.push(name);
                }
            }
        }
    }
    let sums = sum_columns(group, &columns)?;

    let series = |band: Band, scenario: Scenario| -> [f64; 4] {
        Year::ALL.map(|year| {
            sums.get(&schema::mpw(band, scenario, year))
                .copied()
                .unwrap_or(0.0)
        })
    };

    Ok(Scenario::ALL
        .iter()
        .map(|&scenario| ScenarioTotals {
            scenario,
            lower: series(Band::Lower, scenario),
            midpoint: series(Band::Midpoint, scenario),
            higher: series(Band::Higher, scenario),
        })
        .collect())
}
