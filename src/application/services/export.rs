//! Export pipeline
//!
//! Turns a frozen snapshot of the chart into a downloadable artifact:
//! rasterize, then either wrap the raster in a document page or encode
//! it directly. Only one export may be in flight per service.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Local};
use image::ImageFormat;
use regex::Regex;
use tracing::{info, instrument};

use crate::application::error_ext::{operation_failed, IoResultExt};
use crate::application::services::document::{PageText, PdfComposer};
use crate::application::services::raster::ChartRasterizer;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{ChartLayout, OrganizationNode, ViewTransform};
use crate::infrastructure::traits::FileSystem;

/// Free-text context printed on the page and used for the file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportMetadata {
    pub task_reference: String,
    pub event_name: String,
    pub operational_period: String,
}

fn or_fallback<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback
    } else {
        trimmed
    }
}

impl ExportMetadata {
    pub fn title_line(&self) -> String {
        format!(
            "ICS Organization Chart - {}",
            or_fallback(&self.event_name, "Incident")
        )
    }

    pub fn subtitle_line(&self) -> String {
        format!(
            "Task: {}  |  Op Period: {}",
            or_fallback(&self.task_reference, "N/A"),
            or_fallback(&self.operational_period, "Unspecified")
        )
    }

    /// Deterministic file name from the task reference.
    pub fn file_name(&self, format: ExportFormat) -> ApplicationResult<String> {
        let unsafe_chars =
            Regex::new(r"[^A-Za-z0-9._-]").map_err(operation_failed("compile file name pattern"))?;
        let task = or_fallback(&self.task_reference, "Draft");
        let safe = unsafe_chars.replace_all(task, "_");
        Ok(format!("ICS_Chart_{}.{}", safe, format.extension()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Pdf,
    Png,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Png => "png",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ApplicationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "png" => Ok(ExportFormat::Png),
            other => Err(ApplicationError::Config {
                message: format!("unknown export format: {other}"),
            }),
        }
    }
}

/// Everything an export needs, copied out of the live session.
///
/// Owning its data makes the export independent of later edits.
#[derive(Debug, Clone)]
pub struct ExportSnapshot {
    pub tree: OrganizationNode,
    pub layout: ChartLayout,
    pub transform: ViewTransform,
    pub metadata: ExportMetadata,
    pub taken_at: DateTime<Local>,
}

#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
    /// Pixel size of the embedded raster
    pub raster_size: (u32, u32),
}

/// Marks an export as in flight; released on drop.
#[derive(Debug)]
pub struct ExportGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

pub struct ExportService {
    rasterizer: ChartRasterizer,
    composer: PdfComposer,
    busy: AtomicBool,
}

impl ExportService {
    pub fn new(rasterizer: ChartRasterizer, composer: PdfComposer) -> Self {
        Self {
            rasterizer,
            composer,
            busy: AtomicBool::new(false),
        }
    }

    pub fn rasterizer(&self) -> &ChartRasterizer {
        &self.rasterizer
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the pipeline; a second claim fails until the guard drops.
    pub fn begin_export(&self) -> ApplicationResult<ExportGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ApplicationError::ExportBusy)?;
        Ok(ExportGuard { busy: &self.busy })
    }

    /// Render `snapshot` into an artifact; nothing is written on failure.
    #[instrument(level = "debug", skip(self, snapshot), fields(format = %format))]
    pub fn export(
        &self,
        snapshot: &ExportSnapshot,
        format: ExportFormat,
    ) -> ApplicationResult<ExportArtifact> {
        let _guard = self.begin_export()?;
        let image = self.rasterizer.capture(&snapshot.layout, snapshot.transform)?;
        let raster_size = image.dimensions();

        let bytes = match format {
            ExportFormat::Pdf => {
                let text = PageText {
                    title: snapshot.metadata.title_line(),
                    subtitle: snapshot.metadata.subtitle_line(),
                    generated_at: snapshot.taken_at,
                };
                self.composer.compose(&image, &text)?
            }
            ExportFormat::Png => {
                let mut buffer = Cursor::new(Vec::new());
                image
                    .write_to(&mut buffer, ImageFormat::Png)
                    .map_err(operation_failed("encode png"))?;
                buffer.into_inner()
            }
        };

        Ok(ExportArtifact {
            file_name: snapshot.metadata.file_name(format)?,
            format,
            bytes,
            raster_size,
        })
    }

    /// Write the artifact into `dir`, creating it if needed.
    pub fn save(
        &self,
        artifact: &ExportArtifact,
        dir: &Path,
        fs: &dyn FileSystem,
    ) -> ApplicationResult<PathBuf> {
        if !fs.is_dir(dir) {
            fs.create_dir_all(dir)
                .with_path_context("create output directory", dir)?;
        }
        let target = dir.join(&artifact.file_name);
        fs.write_bytes(&target, &artifact.bytes)
            .with_path_context("write export", &target)?;
        info!("exported {} ({} bytes)", target.display(), artifact.bytes.len());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_empty_metadata_when_formatting_then_fallbacks() {
        let meta = ExportMetadata::default();
        assert_eq!(meta.title_line(), "ICS Organization Chart - Incident");
        assert_eq!(meta.subtitle_line(), "Task: N/A  |  Op Period: Unspecified");
        assert_eq!(meta.file_name(ExportFormat::Pdf).unwrap(), "ICS_Chart_Draft.pdf");
    }

    #[test]
    fn given_unsafe_task_when_naming_file_then_sanitized() {
        let meta = ExportMetadata {
            task_reference: "T-42/North Side".into(),
            ..Default::default()
        };
        assert_eq!(
            meta.file_name(ExportFormat::Png).unwrap(),
            "ICS_Chart_T-42_North_Side.png"
        );
    }

    #[test]
    fn given_claimed_pipeline_when_claimed_again_then_busy_until_released() {
        let service = ExportService::new(
            ChartRasterizer::new(Default::default()),
            PdfComposer::default(),
        );
        let guard = service.begin_export().unwrap();
        assert!(matches!(
            service.begin_export(),
            Err(ApplicationError::ExportBusy)
        ));
        drop(guard);
        assert!(!service.is_busy());
        assert!(service.begin_export().is_ok());
    }
}
