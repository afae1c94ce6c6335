//! Case-level form fields shared by every photo on a sheet.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which government form layout to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentFormat {
    /// 刑案照片黏貼表: shared case header, photographer/address/description rows.
    #[default]
    Criminal,
    /// 交通事故照片黏貼紀錄表: checklist description line per photo.
    TrafficAccident,
}

impl DocumentFormat {
    /// Heading printed at the top of every page.
    pub fn title(&self) -> &'static str {
        match self {
            DocumentFormat::Criminal => "刑案照片黏貼表",
            DocumentFormat::TrafficAccident => "(非)道路交通事故照片黏貼紀錄表",
        }
    }

    /// Short name used in artifact file names.
    pub fn display_name(&self) -> &'static str {
        match self {
            DocumentFormat::Criminal => "刑案",
            DocumentFormat::TrafficAccident => "交通事故",
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            DocumentFormat::Criminal => "criminal",
            DocumentFormat::TrafficAccident => "traffic-accident",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "criminal" => Ok(DocumentFormat::Criminal),
            "traffic-accident" | "traffic" => Ok(DocumentFormat::TrafficAccident),
            other => Err(format!("unknown format: {}", other)),
        }
    }
}

/// Where the displayed photo date comes from when no custom date is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateMode {
    /// Prefer the capture date read from the file, fall back to the manual date.
    #[default]
    Auto,
    /// Always use the manual date.
    Manual,
}

/// Snapshot of the shared case fields, taken once per export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormContext {
    /// Case reason; also the prefix of zip entry names.
    pub case_reason: String,
    pub unit: String,
    pub case_address: String,
    /// Photographer or case number.
    pub photographer: String,
    pub format: DocumentFormat,
    pub date_mode: DateMode,
    pub manual_date: String,
}

impl FormContext {
    /// Trimmed case reason used as the file-name prefix.
    pub fn file_prefix(&self) -> &str {
        self.case_reason.trim()
    }
}
