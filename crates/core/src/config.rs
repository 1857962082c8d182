//! Editor configuration
//!
//! Every tunable the engine uses lives here so hosts can override them from
//! a JSON file; absent fields fall back to the defaults below.

use crate::annotation::Color;
use crate::fonts::FontFamily;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Default style for newly placed text annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextDefaults {
    pub font_size: f32,
    pub font_family: FontFamily,
    pub bold: bool,
    pub italic: bool,
    pub color: Color,
}

impl Default for TextDefaults {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            font_family: FontFamily::Helvetica,
            bold: false,
            italic: false,
            color: Color::BLACK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Depth of each undo stack; the oldest entry is evicted past this.
    pub history_depth: usize,
    /// Distance from a corner (surface px) that still grabs the resize handle.
    pub handle_tolerance: f32,
    /// Side length of the drawn corner squares.
    pub handle_size: f32,
    /// Whiteout drafts smaller than this on either axis are discarded.
    pub min_whiteout_size: f32,
    pub min_signature_width: f32,
    pub min_font_size: f32,
    pub max_font_size: f32,
    /// Pinch distance change (px) that triggers one zoom step.
    pub pinch_threshold: f32,
    pub double_tap_window_ms: u64,
    pub double_tap_distance: f32,
    pub max_file_size: u64,
    /// Raster pixels per document unit when pages are rendered.
    pub render_scale: f32,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    /// Initial width of a placed signature as a fraction of the page width.
    pub signature_width_ratio: f32,
    pub zoom_steps: Vec<f32>,
    pub locked_outline: Color,
    pub selection_color: Color,
    pub text: TextDefaults,
    /// TrueType/OpenType font for drawing text onto composited page rasters.
    /// Without one, glyphs are drawn as solid boxes.
    pub glyph_font: Option<PathBuf>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: 50,
            handle_tolerance: 12.0,
            handle_size: 8.0,
            min_whiteout_size: 5.0,
            min_signature_width: 50.0,
            min_font_size: 6.0,
            max_font_size: 120.0,
            pinch_threshold: 30.0,
            double_tap_window_ms: 300,
            double_tap_distance: 30.0,
            max_file_size: 50 * 1024 * 1024,
            render_scale: 1.5,
            thumbnail_width: 160,
            thumbnail_height: 220,
            signature_width_ratio: 0.25,
            zoom_steps: vec![0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 3.0],
            locked_outline: Color::rgb(22, 163, 74),
            selection_color: Color::rgb(37, 99, 235),
            text: TextDefaults::default(),
            glyph_font: None,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EditorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_depth == 0 {
            return Err(ConfigError::Invalid("history_depth must be at least 1".to_owned()));
        }
        if self.min_font_size <= 0.0 || self.min_font_size > self.max_font_size {
            return Err(ConfigError::Invalid(format!(
                "font clamp {}..={} is empty",
                self.min_font_size, self.max_font_size
            )));
        }
        if self.render_scale <= 0.0 {
            return Err(ConfigError::Invalid("render_scale must be positive".to_owned()));
        }
        if self.zoom_steps.is_empty() || self.zoom_steps.windows(2).any(|pair| pair[0] >= pair[1])
        {
            return Err(ConfigError::Invalid(
                "zoom_steps must be a non-empty ascending list".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn clamp_font_size(&self, size: f32) -> f32 {
        size.clamp(self.min_font_size, self.max_font_size)
    }
}
