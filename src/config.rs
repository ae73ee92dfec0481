use crate::types::VariableKey;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub data: PathBuf,   // .json or .csv
    pub shapes: PathBuf, // .geojson/.json or .shp
    #[serde(default = "default_join_column_shape")]
    pub join_column_shape: String,
    #[serde(default = "default_join_column_data")]
    pub join_column_data: String,
}

fn default_join_column_shape() -> String {
    "zcta5".to_string()
}

fn default_join_column_data() -> String {
    "zipcode".to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
    /// Extra width to the right of the map reserved for the legend.
    pub legend_margin: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            legend_margin: 150.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RenderConfig {
    pub fallback_fill: String,
    /// Treat a value of exactly 0 as missing (fallback fill).
    pub zero_is_missing: bool,
    pub initial_variable: VariableKey,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fallback_fill: "#ccc".to_string(),
            zero_is_missing: true,
            initial_variable: VariableKey::SleepDeprivation,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse TOML configuration")
    }
}
