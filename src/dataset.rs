use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use tracing::{info, warn};

use crate::error::{DashboardError, Result};
use crate::schema::{self, identity, Band, Scenario, Year};

/// Per-country plastic waste table augmented with derived percent columns.
///
/// Built once at startup and never mutated afterwards. Per-request views are
/// made with `frame().clone().lazy()`, which shares the underlying buffers.
#[derive(Debug, Clone)]
pub struct DerivedDataset {
    frame: DataFrame,
    continents: Vec<String>,
}

impl DerivedDataset {
    // ── Loading ─────────────────────────────────────────────────────────────

    /// Load a CSV export of the spreadsheet.
    ///
    /// Every column is read as a string, header whitespace is trimmed and the
    /// numeric columns are parsed afterwards. Cells that do not parse become
    /// null rather than failing the load.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .try_into_reader_with_file_path(Some(path))?
            .finish()?;
        Self::from_frame(df)
    }

    /// Load a parquet export of the spreadsheet.
    pub fn load_parquet(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let df = ParquetReader::new(file).finish()?;
        Self::from_frame(df)
    }

    /// Validate the raw schema, normalize dtypes and derive percent columns.
    pub fn from_frame(raw: DataFrame) -> Result<Self> {
        let raw = trim_column_names(raw)?;
        require_columns(&raw, &schema::required_columns())?;

        let frame = normalize_dtypes(raw)?
            .lazy()
            .with_columns(percent_exprs())
            .collect()?;

        for source in schema::percent_sources() {
            let name = source.name();
            let undefined = frame.column(name.as_str())?.null_count();
            if undefined > 0 {
                warn!(
                    column = %name,
                    rows = undefined,
                    "percent undefined (missing or zero total plastic waste)"
                );
            }
        }

        let continents: Vec<String> = frame
            .column(identity::CONTINENT)?
            .str()?
            .into_iter()
            .flatten()
            .map(|s| s.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        info!(
            rows = frame.height(),
            continents = continents.len(),
            "plastic waste dataset loaded"
        );

        Ok(Self { frame, continents })
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// Distinct continent names, sorted.
    pub fn continents(&self) -> &[String] {
        &self.continents
    }

    pub fn has_continent(&self, name: &str) -> bool {
        self.continents.iter().any(|c| c == name)
    }

    pub fn country_names(&self) -> Result<Vec<String>> {
        self.text_values(identity::COUNTRY)
    }

    pub fn iso_codes(&self) -> Result<Vec<String>> {
        self.text_values(identity::ISO_CODE)
    }

    /// Row indices whose continent equals `continent`.
    pub fn rows_in_continent(&self, continent: &str) -> Result<Vec<usize>> {
        let rows = self
            .frame
            .column(identity::CONTINENT)?
            .str()?
            .into_iter()
            .enumerate()
            .filter_map(|(i, c)| (c == Some(continent)).then_some(i))
            .collect();
        Ok(rows)
    }

    /// Text column with nulls rendered as empty strings.
    pub fn text_values(&self, column: &str) -> Result<Vec<String>> {
        let values = self
            .frame
            .column(column)?
            .str()?
            .into_iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect();
        Ok(values)
    }

    /// Numeric column with nulls and non-finite values mapped to `None`.
    pub fn float_values(&self, column: &str) -> Result<Vec<Option<f64>>> {
        let ca = self
            .frame
            .column(column)
            .map_err(|_| DashboardError::MissingColumn(column.to_string()))?
            .f64()?;
        Ok(ca.into_iter().map(|v| v.filter(|x| x.is_finite())).collect())
    }

    /// Derived mismanaged / total ratio for one combination. The scenario is
    /// ignored for 2015.
    pub fn percent_values(
        &self,
        band: Band,
        scenario: Scenario,
        year: Year,
    ) -> Result<Vec<Option<f64>>> {
        self.float_values(&schema::percent(band, scenario, year))
    }
}

// ── Normalization helpers ───────────────────────────────────────────────────

fn trim_column_names(mut df: DataFrame) -> Result<DataFrame> {
    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed)?;
    Ok(df)
}

fn require_columns(df: &DataFrame, required: &[String]) -> Result<()> {
    for col_name in required {
        if df.column(col_name.as_str()).is_err() {
            return Err(DashboardError::MissingColumn(col_name.clone()));
        }
    }
    Ok(())
}

/// Identity columns become stripped strings, every numeric column becomes
/// Float64. String cells are stripped before parsing; unparseable cells
/// become null.
fn normalize_dtypes(df: DataFrame) -> Result<DataFrame> {
    let mut casts: Vec<Expr> = identity::ALL
        .iter()
        .map(|c| {
            col(*c)
                .cast(DataType::String)
                .str()
                .strip_chars(lit(" \t\r\n"))
        })
        .collect();

    for name in schema::numeric_columns() {
        let is_text = df.column(name.as_str())?.dtype() == &DataType::String;
        let expr = if is_text {
            col(name.as_str())
                .str()
                .strip_chars(lit(" \t\r\n"))
                .cast(DataType::Float64)
        } else {
            col(name.as_str()).cast(DataType::Float64)
        };
        casts.push(expr);
    }

    Ok(df.lazy().with_columns(casts).collect()?)
}

/// `percent = mpw / total` where total is strictly positive, null otherwise.
fn percent_exprs() -> Vec<Expr> {
    schema::percent_sources()
        .into_iter()
        .map(|source| {
            let mpw = source.numerator();
            let total = source.denominator();
            when(
                col(total.as_str())
                    .gt(lit(0.0))
                    .and(col(mpw.as_str()).is_not_null()),
            )
            .then(col(mpw.as_str()) / col(total.as_str()))
            .otherwise(lit(NULL).cast(DataType::Float64))
            .alias(source.name())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{raw_frame, sample_countries, sample_dataset, FixtureCountry};
    use proptest::prelude::*;

    #[test]
    fn derives_percent_from_mpw_and_total() {
        let ds = sample_dataset();
        let percent = ds
            .percent_values(Band::Midpoint, Scenario::A, Year::Y2015)
            .unwrap();
        assert_eq!(percent[0], Some(0.1));
        assert_eq!(percent[2], Some(0.5));

        // 2020 scenario B: 0.8 * 1.1 * mpw / (1.1 * total)
        let projected = ds
            .percent_values(Band::Higher, Scenario::B, Year::Y2020)
            .unwrap();
        let expected = 10.0 * 1.5 * 0.8 * 1.1 / (100.0 * 1.1);
        assert!((projected[0].unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn zero_total_is_undefined_not_zero() {
        let ds = sample_dataset();
        for source in schema::percent_sources() {
            let values = ds.float_values(&source.name()).unwrap();
            assert_eq!(values[4], None, "{}", source.name());
            // The row itself is retained for other columns.
            assert_eq!(ds.country_names().unwrap()[4], "Tuvalu");
        }
    }

    #[test]
    fn baseline_percent_is_scenario_invariant() {
        let ds = sample_dataset();
        let a = ds.percent_values(Band::Midpoint, Scenario::A, Year::Y2015).unwrap();
        let c = ds.percent_values(Band::Midpoint, Scenario::C, Year::Y2015).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn missing_column_fails_fast() {
        let df = raw_frame(&sample_countries())
            .drop("higher-mpw-scenarioC-2060")
            .unwrap();
        let err = DerivedDataset::from_frame(df).unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumn(c) if c == "higher-mpw-scenarioC-2060"));
    }

    #[test]
    fn continents_are_distinct_and_sorted() {
        let ds = sample_dataset();
        assert_eq!(ds.continents(), ["Asia", "Europe", "Oceania"]);
        assert!(ds.has_continent("Asia"));
        assert!(!ds.has_continent("Antarctica"));
        assert_eq!(ds.rows_in_continent("Europe").unwrap(), vec![0, 1]);
        assert!(ds.rows_in_continent("Antarctica").unwrap().is_empty());
    }

    #[test]
    fn loads_csv_with_untidy_cells() {
        let mut df = raw_frame(&sample_countries());
        df.with_column(Column::new(
            schema::aux::MSW_PER_CAPITA_2015.into(),
            vec!["n/a", " 630 ", "290", "120", "200"],
        ))
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("igr204-data.csv");
        let mut file = File::create(&path).unwrap();
        CsvWriter::new(&mut file).finish(&mut df).unwrap();

        // Pad the first header.
        let text = std::fs::read_to_string(&path).unwrap();
        let text = text.replacen("Country,", " Country ,", 1);
        std::fs::write(&path, text).unwrap();

        let ds = DerivedDataset::load_csv(&path).unwrap();
        assert_eq!(ds.height(), 5);
        assert_eq!(ds.country_names().unwrap()[0], "France");
        let msw = ds.float_values(schema::aux::MSW_PER_CAPITA_2015).unwrap();
        assert_eq!(msw[0], None);
        assert_eq!(msw[1], Some(630.0));
        let percent = ds.percent_values(Band::Midpoint, Scenario::A, Year::Y2015).unwrap();
        assert_eq!(percent[0], Some(0.1));
    }

    #[test]
    fn identity_cells_are_stripped() {
        let mut df = raw_frame(&sample_countries());
        df.with_column(Column::new(
            identity::CONTINENT.into(),
            vec!["Europe ", " Europe", "Asia", "Asia\t", "Oceania"],
        ))
        .unwrap();
        df.with_column(Column::new(
            identity::COUNTRY.into(),
            vec![" France ", "Germany", "China", "India", "Tuvalu"],
        ))
        .unwrap();

        let ds = DerivedDataset::from_frame(df).unwrap();
        assert_eq!(ds.continents(), ["Asia", "Europe", "Oceania"]);
        assert_eq!(ds.rows_in_continent("Europe").unwrap(), vec![0, 1]);
        assert_eq!(ds.country_names().unwrap()[0], "France");
    }

    #[test]
    fn loads_parquet() {
        let mut df = raw_frame(&sample_countries());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("igr204-data.parquet");
        let file = File::create(&path).unwrap();
        ParquetWriter::new(file).finish(&mut df).unwrap();

        let ds = DerivedDataset::load_parquet(&path).unwrap();
        assert_eq!(ds.height(), 5);
        assert_eq!(ds.iso_codes().unwrap()[3], "IND");
    }

    proptest! {
        #[test]
        fn percent_is_ratio_within_unit_range(
            rows in prop::collection::vec((1.0f64..1e7, 0.0f64..=1.0), 1..8)
        ) {
            let countries: Vec<FixtureCountry> = rows
                .iter()
                .map(|(total, ratio)| FixtureCountry {
                    // Higher band is 1.5x midpoint, keep it within the total.
                    mpw: total * ratio / 1.5,
                    total: *total,
                    ..sample_countries()[0].clone()
                })
                .collect();
            let ds = DerivedDataset::from_frame(raw_frame(&countries)).unwrap();

            for source in schema::percent_sources() {
                let values = ds.float_values(&source.name()).unwrap();
                let mpw = ds.float_values(&source.numerator()).unwrap();
                let total = ds.float_values(&source.denominator()).unwrap();
                for i in 0..countries.len() {
                    let p = values[i].unwrap();
                    let expected = mpw[i].unwrap() / total[i].unwrap();
                    prop_assert!((p - expected).abs() <= 1e-12);
                    prop_assert!((0.0..=1.0 + 1e-12).contains(&p));
                }
            }
        }
    }
}
