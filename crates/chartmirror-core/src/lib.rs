//! chartmirror core - chart model and value handling
//!
//! This crate provides the foundational types shared by the mirror and the
//! image inspector:
//! - `Chart` / `LoadedChart`: `Chart.yaml` metadata and chart loading from
//!   directories or `.tgz` archives
//! - `Values`: value sets with deep merge, subchart scoping and null
//!   normalization
//! - `TemplateContext`: what templates see while rendering
//! - `archive`: chart archive helpers

pub mod archive;
pub mod chart;
pub mod context;
pub mod error;
pub mod values;

pub use chart::{ARCHIVE_SUFFIX, CHART_FILE, Chart, ChartKind, Dependency, LoadedChart, Maintainer};
pub use context::{Capabilities, ChartInfo, ReleaseInfo, TemplateContext};
pub use error::{CoreError, Result};
pub use values::{Values, normalize_nulls};
