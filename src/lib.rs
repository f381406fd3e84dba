//! Derived metrics and cross-filter computations behind the ocean plastic
//! pollution dashboard.
//!
//! The crate turns the per-country plastic waste table into three declarative
//! chart specs (map, scatter, scenario time series) for a given set of control
//! values and the latest user interaction. Rendering and serving the page are
//! left to the caller; with the `python` feature the same API is exposed as the
//! `_core` Python extension module.

pub mod aggregation;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod error;
pub mod projection;
pub mod schema;
pub mod selection;
pub mod visualization;

#[cfg(feature = "python")]
mod python;

#[cfg(test)]
mod test_support;

pub use config::ChartConfig;
pub use dashboard::{Dashboard, DashboardUpdate};
pub use dataset::DerivedDataset;
pub use error::{DashboardError, Result};
pub use projection::{ProjectedMetrics, StatChoice};
pub use schema::{Band, Scenario, Year};
pub use selection::{
    resolve, ContinentFilter, InteractionEvent, ResolvedSelection, SelectedPoint, SelectionState,
};
