use std::path::Path;

use serde::{Deserialize, Serialize};
use tile_swap_core::{Result, TileLayout, TileSwapError};
use tile_swap_rules::DEFAULT_LAYER_COUNT;

/// Engine settings, deserialized from a TOML file.
///
/// Every field has a default, so an empty file is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSwapConfig {
    #[serde(default)]
    pub layout: TileLayout,
    #[serde(default)]
    pub compositor: CompositorConfig,
}

/// Settings of the per-map compositor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositorConfig {
    /// Tile layers visited by each pass, starting at layer 0
    #[serde(default = "default_layer_count")]
    pub layer_count: usize,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            layer_count: DEFAULT_LAYER_COUNT,
        }
    }
}

fn default_layer_count() -> usize {
    DEFAULT_LAYER_COUNT
}

impl TileSwapConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| TileSwapError::ConfigParse(err.to_string()))
    }

    /// Read and parse a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| TileSwapError::ConfigParse(err.to_string()))
    }
}
