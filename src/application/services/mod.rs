//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, Confirmer)
//! but are themselves concrete structs, not traits.

mod chart;
mod document;
mod export;
mod raster;
mod script;
mod templates;

pub use chart::{ChartSession, EditOutcome};
pub use document::{ImagePlacement, PageGeometry, PageText, PdfComposer};
pub use export::{
    ExportArtifact, ExportFormat, ExportGuard, ExportMetadata, ExportService, ExportSnapshot,
};
pub use raster::{load_font, ChartRasterizer, RasterOptions};
pub use script::{
    parse_script, run_script, ScriptCommand, ScriptLine, StepReport, StepStatus, ZoomAction,
};
pub use templates::{LoadedTemplate, TemplateService};
