//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Config file: `--config PATH` or `$XDG_CONFIG_HOME/icschart/icschart.toml`
//! 3. Environment variables: `ICSCHART_*` prefix, `__` between sections and keys

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::services::PageGeometry;
use crate::application::ApplicationError;
use crate::domain::{LayoutConfig, ZoomLimits, DEFAULT_TEMPLATE};

/// Lowest supersampling factor that keeps printed lines crisp.
pub const MIN_SUPERSAMPLE: u32 = 3;

/// Raster and document settings for exports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportSettings {
    /// Raster pixels per layout unit
    pub supersample: u32,
    /// Blank border around the chart, in layout units
    pub padding: f32,
    /// Opaque background colour (RGB)
    pub background: [u8; 3],
    /// TrueType/OpenType font for node labels; boxes only when unset
    pub font: Option<PathBuf>,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
    /// Longest raster edge accepted before the capture is refused
    pub max_edge_px: u32,
    /// Where exported files are written
    pub output_dir: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            supersample: MIN_SUPERSAMPLE,
            padding: 80.0,
            background: [255, 255, 255],
            font: None,
            page_width_mm: 297.0,
            page_height_mm: 210.0,
            margin_mm: 10.0,
            max_edge_px: 16_384,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Unified configuration for icschart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Template loaded when a session starts
    pub default_template: String,
    /// Directory scanned recursively for `*.toml` templates
    pub templates_dir: Option<PathBuf>,
    pub layout: LayoutConfig,
    pub viewport: ZoomLimits,
    pub export: ExportSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_template: DEFAULT_TEMPLATE.to_string(),
            templates_dir: None,
            layout: LayoutConfig::default(),
            viewport: ZoomLimits::default(),
            export: ExportSettings::default(),
        }
    }
}

/// Get the XDG config directory for icschart.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "icschart").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("icschart.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables leave the input as is.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(raw.as_ref()) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            debug!("expand_path: keeping {}: {}", raw, e);
            path.to_path_buf()
        }
    }
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// An explicit `config_path` must exist; the global file is optional.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_with_env(config_path, None)
    }

    /// Like [`Settings::load`], reading `ICSCHART_*` overrides from `env`
    /// instead of the process environment when given.
    pub fn load_with_env(
        config_path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ApplicationError> {
        let defaults = Config::try_from(&Settings::default()).map_err(config_err)?;
        let mut builder = Config::builder().add_source(defaults);

        match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ApplicationError::Config {
                        message: format!("config file not found: {}", path.display()),
                    });
                }
                debug!("load: config file {}", path.display());
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                if let Some(global) = global_config_path().filter(|p| p.exists()) {
                    debug!("load: global config {}", global.display());
                    builder = builder
                        .add_source(File::from(global).format(FileFormat::Toml).required(false));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("ICSCHART")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;
        settings.expand_paths();
        settings.validate();
        Ok(settings)
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.templates_dir = self.templates_dir.as_deref().map(expand_path);
        self.export.font = self.export.font.as_deref().map(expand_path);
        self.export.output_dir = expand_path(&self.export.output_dir);
    }

    /// Clamp out-of-range values back into their working range.
    pub fn validate(&mut self) {
        if self.export.supersample < MIN_SUPERSAMPLE {
            warn!(
                "export.supersample {} below minimum, using {}",
                self.export.supersample, MIN_SUPERSAMPLE
            );
            self.export.supersample = MIN_SUPERSAMPLE;
        }
        let zoom = self.viewport;
        if !(zoom.min > 0.0 && zoom.min <= zoom.max && zoom.step > 0.0) {
            warn!("viewport zoom limits {:?} invalid, using defaults", zoom);
            self.viewport = ZoomLimits::default();
        }
        let layout = self.layout;
        if !(layout.node_width > 0.0 && layout.node_height > 0.0)
            || layout.sibling_gap < 0.0
            || layout.level_gap < 0.0
        {
            warn!("layout {:?} invalid, using defaults", layout);
            self.layout = LayoutConfig::default();
        }
        if self.export.padding < 0.0 {
            self.export.padding = 0.0;
        }
        let defaults = ExportSettings::default();
        if !PageGeometry::from(&self.export).is_usable() {
            warn!("export page geometry invalid, using A4 landscape");
            self.export.page_width_mm = defaults.page_width_mm;
            self.export.page_height_mm = defaults.page_height_mm;
            self.export.margin_mm = defaults.margin_mm;
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# icschart configuration
#
# Locations (by precedence, lowest to highest):
#   File: ~/.config/icschart/icschart.toml  (or --config PATH)
#   Env:  ICSCHART_* variables, e.g. ICSCHART_EXPORT__SUPERSAMPLE=4

# Template loaded at session start
# default_template = "General"

# Directory with extra templates (*.toml, searched recursively)
# templates_dir = "~/.config/icschart/templates"

[layout]
# node_width = 256.0
# node_height = 96.0
# sibling_gap = 24.0
# level_gap = 56.0
# stem_length = 32.0

[viewport]
# min = 0.3
# max = 2.0
# step = 0.1

[export]
# Raster pixels per layout unit (minimum 3)
# supersample = 3
# padding = 80.0
# background = [255, 255, 255]
# Font used for node labels; without it only boxes and connectors are drawn
# font = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
# page_width_mm = 297.0
# page_height_mm = 210.0
# margin_mm = 10.0
# max_edge_px = 16384
# output_dir = "."
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
