//! Session manifests: the form fields and the photos to lay out.
//!
//! TOML or JSON, chosen by file extension. Photo paths are relative to the
//! manifest's directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::collection::{AccidentTag, AccidentTags};
use crate::config::FormDefaults;
use crate::form::{DateMode, DocumentFormat, FormContext};
use crate::import::discovery::discover_images;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub form: ManifestForm,

    /// Directory scanned for additional photos, appended after `photos`.
    #[serde(default)]
    pub photos_dir: Option<PathBuf>,

    #[serde(default)]
    pub photos: Vec<PhotoEntry>,

    #[serde(skip)]
    base_dir: PathBuf,
}

/// Form fields; anything left out falls back to the configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestForm {
    pub format: Option<DocumentFormat>,
    pub case_reason: Option<String>,
    pub unit: Option<String>,
    pub address: Option<String>,
    pub photographer: Option<String>,
    pub date_mode: Option<DateMode>,
    pub manual_date: Option<String>,
}

impl ManifestForm {
    pub fn resolve(&self, defaults: &FormDefaults) -> FormContext {
        let pick = |value: &Option<String>, fallback: &str| {
            value.clone().unwrap_or_else(|| fallback.to_string())
        };
        FormContext {
            case_reason: pick(&self.case_reason, ""),
            unit: pick(&self.unit, &defaults.unit),
            case_address: pick(&self.address, &defaults.address),
            photographer: pick(&self.photographer, &defaults.photographer),
            format: self.format.unwrap_or(defaults.format),
            date_mode: self.date_mode.unwrap_or(defaults.date_mode),
            manual_date: pick(&self.manual_date, ""),
        }
    }
}

/// One photo and the annotations to apply after import.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhotoEntry {
    pub path: PathBuf,

    #[serde(default)]
    pub description: Option<String>,

    /// Custom display date.
    #[serde(default)]
    pub date: Option<String>,

    /// Custom address.
    #[serde(default)]
    pub address: Option<String>,

    /// Degrees, a multiple of 90; negative turns counter-clockwise.
    #[serde(default)]
    pub rotate: i32,

    #[serde(default)]
    pub tags: Vec<AccidentTag>,

    /// Free text for the `other` tag.
    #[serde(default)]
    pub other: Option<String>,

    /// 1-based target position, applied after every photo is imported.
    #[serde(default)]
    pub position: Option<usize>,

    /// Remove the photo again after import (asks for confirmation).
    #[serde(default)]
    pub remove: bool,
}

impl PhotoEntry {
    pub fn accident_tags(&self) -> AccidentTags {
        let mut tags = AccidentTags::new();
        for tag in &self.tags {
            tags.set(*tag, true);
        }
        if let Some(other) = &self.other {
            tags.other_text = other.clone();
        }
        tags
    }

    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty() || self.other.is_some()
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;

        let is_json = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let mut manifest: Manifest = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("invalid JSON manifest {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("invalid TOML manifest {}", path.display()))?
        };

        manifest.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        for entry in &self.photos {
            if entry.rotate % 90 != 0 {
                anyhow::bail!(
                    "{}: rotate must be a multiple of 90, got {}",
                    entry.path.display(),
                    entry.rotate
                );
            }
            if entry.position == Some(0) {
                anyhow::bail!("{}: position is 1-based", entry.path.display());
            }
        }
        Ok(())
    }

    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Files discovered under `photos_dir`, minus those already listed explicitly.
    pub fn discovered_photos(&self, extensions: &[String]) -> Result<Vec<PathBuf>> {
        let Some(dir) = &self.photos_dir else {
            return Ok(Vec::new());
        };
        let listed: Vec<PathBuf> = self
            .photos
            .iter()
            .map(|p| self.resolve_path(&p.path))
            .collect();

        Ok(discover_images(&self.resolve_path(dir), extensions)?
            .into_iter()
            .filter(|p| !listed.contains(p))
            .collect())
    }
}
