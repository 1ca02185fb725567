//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use tracing::warn;

use crate::application::services::{
    load_font, ChartRasterizer, ChartSession, ExportService, PageGeometry, PdfComposer,
    RasterOptions, TemplateService,
};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::{LayoutEngine, TemplateCatalog};
use crate::infrastructure::traits::{
    AutoConfirmer, Confirmer, FileSystem, RealFileSystem, TerminalConfirmer,
};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Confirmation capability for destructive edits
    pub confirmer: Arc<dyn Confirmer>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    ///
    /// `assume_yes` replaces the terminal prompt with automatic consent.
    pub fn new(settings: Settings, assume_yes: bool) -> Self {
        let confirmer: Arc<dyn Confirmer> = if assume_yes {
            Arc::new(AutoConfirmer::yes())
        } else {
            Arc::new(TerminalConfirmer)
        };
        Self::with_deps(settings, Arc::new(RealFileSystem), confirmer)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        confirmer: Arc<dyn Confirmer>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            confirmer,
        }
    }

    pub fn template_service(&self) -> TemplateService {
        TemplateService::new(self.fs.clone())
    }

    /// Built-in templates plus those from the configured directory.
    pub fn catalog(&self) -> ApplicationResult<TemplateCatalog> {
        self.template_service()
            .catalog(self.settings.templates_dir.as_deref())
    }

    /// Session on `template`, or on the configured default template.
    pub fn session(&self, template: Option<&str>) -> ApplicationResult<ChartSession> {
        let name = template.unwrap_or(&self.settings.default_template);
        ChartSession::with_template(
            name,
            LayoutEngine::new(self.settings.layout),
            self.settings.viewport,
            self.catalog()?,
            self.confirmer.clone(),
        )
    }

    /// Export pipeline; a font that fails to load only disables labels.
    pub fn export_service(&self) -> ExportService {
        let export = &self.settings.export;
        let mut rasterizer = ChartRasterizer::new(RasterOptions::from(export));
        if let Some(path) = &export.font {
            match load_font(self.fs.as_ref(), path) {
                Ok(font) => rasterizer = rasterizer.with_font(font),
                Err(e) => warn!("labels disabled: {}", e),
            }
        }
        ExportService::new(rasterizer, PdfComposer::new(PageGeometry::from(export)))
    }
}
