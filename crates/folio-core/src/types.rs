// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Folio PDF engine.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a staged upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StageId(pub Uuid);

impl StageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short hex form used inside file names.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for StageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A file materialised under the managed staging root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedFile {
    pub id: StageId,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

/// How a document is divided by the splitter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "split_type", rename_all = "snake_case")]
pub enum SplitStrategy {
    /// One output per page.
    #[default]
    Individual,
    /// One output holding the pages named by a page-range expression.
    Selected { pages: String },
    /// `parts` outputs of `ceil(total / parts)` pages each.
    Equal { parts: u32 },
    /// Outputs of `chunk_size` pages, the last holding the remainder.
    Chunk { chunk_size: u32 },
}

impl SplitStrategy {
    /// Purpose tag used in generated file names.
    pub fn purpose(&self) -> &'static str {
        match self {
            Self::Individual => "page",
            Self::Selected { .. } => "selected",
            Self::Equal { .. } => "part",
            Self::Chunk { .. } => "chunk",
        }
    }
}

/// One document produced by a split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitEntry {
    pub path: PathBuf,
    /// File name offered to the downloader.
    pub display_name: String,
    /// Human-readable pages covered, e.g. `"4-6"` or `"1-3, 5"`.
    pub page_range_label: String,
    /// 1-based position among the outputs of the split.
    pub sequence: u32,
    /// Source pages (1-based) in output order.
    pub pages: Vec<u32>,
}

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------

/// Named compression level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Largest output, least loss.
    Low,
    #[default]
    Medium,
    /// Smallest output, most loss.
    High,
}

impl CompressionLevel {
    /// Resolve a user-supplied level name. Matching is case-insensitive and
    /// anything unrecognised (including an empty name) resolves to `Medium`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// The fixed preset for this level.
    pub fn preset(&self) -> CompressionPreset {
        match self {
            Self::Low => CompressionPreset {
                target_dpi: 150,
                image_quality: 85,
                profile: StructuralProfile::Mild,
            },
            Self::Medium => CompressionPreset {
                target_dpi: 120,
                image_quality: 65,
                profile: StructuralProfile::Balanced,
            },
            Self::High => CompressionPreset {
                target_dpi: 96,
                image_quality: 50,
                profile: StructuralProfile::Aggressive,
            },
        }
    }
}

impl std::fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural optimisation profile passed to the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuralProfile {
    Mild,
    Balanced,
    Aggressive,
}

impl StructuralProfile {
    /// Ghostscript `-dPDFSETTINGS` value.
    pub fn pdf_settings(&self) -> &'static str {
        match self {
            Self::Mild => "/ebook",
            Self::Balanced => "/printer",
            Self::Aggressive => "/screen",
        }
    }
}

/// Immutable compression parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionPreset {
    /// Downsample resolution for colour, gray and mono images.
    pub target_dpi: u32,
    /// JPEG quality, 0–100.
    pub image_quality: u8,
    pub profile: StructuralProfile,
}

/// Outcome of a compression request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionReport {
    pub output_path: PathBuf,
    pub level: CompressionLevel,
    pub original_size: u64,
    pub compressed_size: u64,
    /// Size reduction in percent, two decimals, never negative.
    pub reduction_percent: f64,
    /// Whether the external optimizer produced the output.
    pub used_external_tool: bool,
    /// Optimizer binary that succeeded, if any.
    pub optimizer: Option<String>,
}

impl CompressionReport {
    /// `max(0, original - compressed) * 100 / original`, rounded to two
    /// decimals; zero for an empty original.
    pub fn reduction(original_size: u64, compressed_size: u64) -> f64 {
        if original_size == 0 {
            return 0.0;
        }
        let reduced = original_size.saturating_sub(compressed_size) as f64;
        (reduced * 100.0 / original_size as f64 * 100.0).round() / 100.0
    }
}

/// Render a byte count as `"512 B"`, `"1.50 KB"`, `"2.00 MB"`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(CompressionLevel::from_name("LOW"), CompressionLevel::Low);
        assert_eq!(CompressionLevel::from_name(" High "), CompressionLevel::High);
        assert_eq!(CompressionLevel::from_name("medium"), CompressionLevel::Medium);
    }

    #[test]
    fn unknown_level_defaults_to_medium() {
        assert_eq!(CompressionLevel::from_name(""), CompressionLevel::Medium);
        assert_eq!(CompressionLevel::from_name("extreme"), CompressionLevel::Medium);
    }

    #[test]
    fn presets_match_table() {
        let low = CompressionLevel::Low.preset();
        assert_eq!((low.target_dpi, low.image_quality), (150, 85));
        assert_eq!(low.profile.pdf_settings(), "/ebook");

        let medium = CompressionLevel::Medium.preset();
        assert_eq!((medium.target_dpi, medium.image_quality), (120, 65));
        assert_eq!(medium.profile.pdf_settings(), "/printer");

        let high = CompressionLevel::High.preset();
        assert_eq!((high.target_dpi, high.image_quality), (96, 50));
        assert_eq!(high.profile.pdf_settings(), "/screen");
    }

    #[test]
    fn reduction_is_clamped_and_rounded() {
        assert_eq!(CompressionReport::reduction(0, 0), 0.0);
        assert_eq!(CompressionReport::reduction(100, 150), 0.0);
        assert_eq!(CompressionReport::reduction(100, 100), 0.0);
        assert_eq!(CompressionReport::reduction(200, 50), 75.0);
        assert_eq!(CompressionReport::reduction(3, 2), 33.33);
    }

    #[test]
    fn bytes_are_formatted_with_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(2 * 1024 * 1024), "2.00 MB");
    }

    #[test]
    fn split_strategy_deserializes_from_tagged_json() {
        let strategy: SplitStrategy =
            serde_json::from_str(r#"{"split_type":"chunk","chunk_size":3}"#).unwrap();
        assert_eq!(strategy, SplitStrategy::Chunk { chunk_size: 3 });
        assert_eq!(strategy.purpose(), "chunk");
    }
}
