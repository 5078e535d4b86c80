//! Viewer options
//!
//! Everything has a default; an options file only needs the keys it changes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerOptions {
    /// Taxonomic level selected when the page opens (if present in the data)
    #[serde(default = "default_level")]
    pub default_level: String,
    #[serde(default = "default_chart_height")]
    pub chart_height: u32,
    #[serde(default = "default_slider_step")]
    pub slider_step: f64,
    /// Vega categorical scheme used for sample colors
    #[serde(default = "default_color_scheme")]
    pub color_scheme: String,
}

fn default_level() -> String { "kingdom".to_string() }
fn default_chart_height() -> u32 { 450 }
fn default_slider_step() -> f64 { 0.01 }
fn default_color_scheme() -> String { "tableau10".to_string() }

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            default_level: default_level(),
            chart_height: default_chart_height(),
            slider_step: default_slider_step(),
            color_scheme: default_color_scheme(),
        }
    }
}

impl ViewerOptions {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_str(&json)?)
    }
}
