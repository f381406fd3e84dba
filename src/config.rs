use std::path::Path;

use serde::Deserialize;

use crate::error::{DashboardError, Result};
use crate::selection::ALL_CONTINENTS;

/// Presentation settings copied into every chart spec.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub map_height: u32,
    pub scatter_height: u32,
    pub time_series_height: u32,
    /// Named colourscale understood by the renderer.
    pub colorscale: String,
    pub paper_bgcolor: String,
    pub plot_bgcolor: String,
    pub grid_color: String,
    pub tick_color: String,
    pub hover_font_size: u32,
    /// Label of the continent filter's "everything" option.
    pub all_continents_label: String,
    /// Separator between country names in the time-series title.
    pub title_separator: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            map_height: 380,
            scatter_height: 360,
            time_series_height: 360,
            colorscale: "balance".to_string(),
            paper_bgcolor: "rgb(255,255,255)".to_string(),
            plot_bgcolor: "rgb(229,229,229)".to_string(),
            grid_color: "rgb(255,255,255)".to_string(),
            tick_color: "rgb(127,127,127)".to_string(),
            hover_font_size: 12,
            all_continents_label: ALL_CONTINENTS.to_string(),
            title_separator: ", ".to_string(),
        }
    }
}

impl ChartConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: ChartConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, height) in [
            ("map_height", self.map_height),
            ("scatter_height", self.scatter_height),
            ("time_series_height", self.time_series_height),
        ] {
            if height == 0 {
                return Err(DashboardError::Config(format!("{name} must be greater than 0")));
            }
        }
        if self.colorscale.trim().is_empty() {
            return Err(DashboardError::Config("colorscale must not be empty".into()));
        }
        if self.all_continents_label.trim().is_empty() {
            return Err(DashboardError::Config(
                "all_continents_label must not be empty".into(),
            ));
        }
        Ok(())
    }
}
