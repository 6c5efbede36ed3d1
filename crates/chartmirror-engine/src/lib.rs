//! chartmirror engine - chart rendering and image extraction
//!
//! This crate provides:
//! - A MiniJinja-based template engine with Helm-flavoured filters
//! - `ChartRenderer`, which renders a chart and its enabled subcharts
//! - `ImageScanner`, which pulls `image:` references out of rendered documents
//! - `ImagesService`, which walks a chart, a chart archive or a directory of
//!   archives and returns every image it finds

pub mod chart_renderer;
pub mod engine;
pub mod error;
pub mod filters;
pub mod functions;
pub mod images;
pub mod inspect;
pub mod subchart;

pub use chart_renderer::{ChartRenderer, Manifests};
pub use engine::{Engine, EngineBuilder};
pub use error::{EngineError, Result, TemplateError, TemplateErrorKind};
pub use images::{ImageScanner, sanitize_image};
pub use inspect::{ImageScan, ImagesService, InspectOptions};
