//! Template directory service
//!
//! Loads extra chart templates from `*.toml` files below a directory and
//! merges them over the built-in presets.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::application::error_ext::IoResultExt;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{validate_template, DomainError, OrganizationNode, TemplateCatalog};
use crate::infrastructure::traits::FileSystem;

/// On-disk template: optional display name plus the full tree.
#[derive(Debug, Deserialize)]
struct TemplateFile {
    name: Option<String>,
    root: OrganizationNode,
}

/// A template read from disk.
#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    pub name: String,
    pub path: PathBuf,
    pub tree: OrganizationNode,
}

pub struct TemplateService {
    fs: Arc<dyn FileSystem>,
}

impl TemplateService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Parse and validate a single template file.
    pub fn load_file(&self, path: &Path) -> ApplicationResult<LoadedTemplate> {
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read template", path)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file: TemplateFile = toml::from_str(&content).map_err(|e| {
            ApplicationError::Domain(DomainError::InvalidTemplate {
                name: stem.clone(),
                reason: e.message().to_string(),
            })
        })?;
        let name = file
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(stem);
        validate_template(&name, &file.root)?;
        Ok(LoadedTemplate {
            name,
            path: path.to_path_buf(),
            tree: file.root,
        })
    }

    /// All templates below `dir`, in path order.
    #[instrument(level = "debug", skip(self))]
    pub fn load_dir(&self, dir: &Path) -> ApplicationResult<Vec<LoadedTemplate>> {
        if !self.fs.is_dir(dir) {
            return Err(ApplicationError::Config {
                message: format!("templates directory not found: {}", dir.display()),
            });
        }
        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();
        debug!("load_dir: {} template file(s)", paths.len());
        paths.iter().map(|p| self.load_file(p)).collect()
    }

    /// Built-in presets overlaid with the templates found in `dir`.
    pub fn catalog(&self, dir: Option<&Path>) -> ApplicationResult<TemplateCatalog> {
        let mut catalog = TemplateCatalog::builtin();
        if let Some(dir) = dir {
            for template in self.load_dir(dir)? {
                debug!("catalog: {} from {}", template.name, template.path.display());
                catalog.insert(template.name, template.tree);
            }
        }
        Ok(catalog)
    }
}
