use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::form::{DateMode, DocumentFormat, FormContext};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "PHOTOSHEET_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub form: FormDefaults,

    #[serde(default)]
    pub import: ImportConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Form values used when a manifest leaves them out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormDefaults {
    #[serde(default)]
    pub unit: String,

    #[serde(default)]
    pub photographer: String,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub format: DocumentFormat,

    #[serde(default)]
    pub date_mode: DateMode,
}

impl FormDefaults {
    /// Form snapshot seeded from these defaults; case-specific fields start empty.
    pub fn to_form(&self) -> FormContext {
        FormContext {
            unit: self.unit.clone(),
            photographer: self.photographer.clone(),
            case_address: self.address.clone(),
            format: self.format,
            date_mode: self.date_mode,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// Command run as `<converter> <input.heic> <output.jpg>`.
    #[serde(default = "default_heic_converter")]
    pub heic_converter: String,

    /// Longest side of import thumbnails, in pixels.
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
}

fn default_image_extensions() -> Vec<String> {
    vec![
        "jpg".to_string(),
        "jpeg".to_string(),
        "png".to_string(),
        "gif".to_string(),
        "webp".to_string(),
        "bmp".to_string(),
        "heic".to_string(),
        "heif".to_string(),
    ]
}

fn default_heic_converter() -> String {
    "heif-convert".to_string()
}

fn default_thumbnail_size() -> u32 {
    800
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            image_extensions: default_image_extensions(),
            heic_converter: default_heic_converter(),
            thumbnail_size: default_thumbnail_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Longest side of images embedded in DOCX output.
    #[serde(default = "default_document_max_dimension")]
    pub document_max_dimension: u32,

    /// How long the export guard stays closed after an export settles.
    #[serde(default = "default_release_delay_ms")]
    pub release_delay_ms: u64,

    /// Program used to open print output; platform default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub print_opener: Option<String>,

    #[serde(default = "default_open_print")]
    pub open_print: bool,
}

fn default_output_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photosheet")
}

fn default_document_max_dimension() -> u32 {
    1200
}

fn default_release_delay_ms() -> u64 {
    1000
}

fn default_open_print() -> bool {
    true
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            document_max_dimension: default_document_max_dimension(),
            release_delay_ms: default_release_delay_ms(),
            print_opener: None,
            open_print: default_open_print(),
        }
    }
}

impl ExportConfig {
    pub fn release_delay(&self) -> Duration {
        Duration::from_millis(self.release_delay_ms)
    }
}

impl Config {
    /// Load from the default location, honouring `PHOTOSHEET_CONFIG`.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`, writing a default file there first if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("invalid config file {}", path.display()))?;
            Ok(config)
        } else {
            // Create default config
            let config = Config::default();
            config.save_to(path)?;
            tracing::info!("Wrote default config to {}", path.display());
            Ok(config)
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("photosheet")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_creates_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = Config::load_from(&path).unwrap();

        assert!(path.exists());
        assert_eq!(config.import.thumbnail_size, 800);
        assert_eq!(config.export.document_max_dimension, 1200);
        assert_eq!(config.export.release_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[form]\nunit = \"第一分局\"\nformat = \"traffic-accident\"\n\n[export]\nrelease_delay_ms = 10\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.form.unit, "第一分局");
        assert_eq!(config.form.format, DocumentFormat::TrafficAccident);
        assert_eq!(config.form.date_mode, DateMode::Auto);
        assert_eq!(config.export.release_delay_ms, 10);
        assert!(config.export.open_print);
        assert_eq!(config.import.heic_converter, "heif-convert");
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut config = Config::default();
        config.export.print_opener = Some("firefox".into());
        let parsed: Config = toml::from_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.export.print_opener.as_deref(), Some("firefox"));
        assert_eq!(parsed.import.image_extensions, config.import.image_extensions);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[export]\nrelease_delay_ms = \"soon\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
