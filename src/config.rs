//! Configuration for the graphics subsystem
//!
//! Precedence: environment variables > config file > defaults.
//! The config file is TOML; every section and field is optional.

use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::blitter::BlitterType;
use crate::caps::{EnvSource, ProcessEnv};
use crate::protocol::{ChunkLimit, PackingMode};

/// Hard ceiling on how long the capability query may block
pub const MAX_PROBE_TIMEOUT_MS: u64 = 200;

/// Capability probe settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// How long to wait for the terminal to answer, in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
    /// Write a query to the terminal instead of trusting the environment alone
    #[serde(default = "default_true")]
    pub active_query: bool,
}

fn default_probe_timeout_ms() -> u64 {
    150
}
fn default_true() -> bool {
    true
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.min(MAX_PROBE_TIMEOUT_MS))
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_probe_timeout_ms(),
            active_query: true,
        }
    }
}

/// Kitty graphics protocol settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KittyConfig {
    /// Chunk size used when the terminal does not report one
    #[serde(default = "default_chunk_size")]
    pub max_chunk_size: usize,
    /// Whether the chunk size bounds raw or base64 bytes
    #[serde(default)]
    pub chunk_limit: ChunkLimit,
}

fn default_chunk_size() -> usize {
    4096
}

impl Default for KittyConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_chunk_size(),
            chunk_limit: ChunkLimit::default(),
        }
    }
}

/// Sixel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SixelConfig {
    /// Palette size, background slot included
    #[serde(default = "default_sixel_colors")]
    pub max_colors: usize,
    #[serde(default)]
    pub packing: PackingMode,
}

fn default_sixel_colors() -> usize {
    256
}

impl Default for SixelConfig {
    fn default() -> Self {
        Self {
            max_colors: default_sixel_colors(),
            packing: PackingMode::default(),
        }
    }
}

/// Cell rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Width of one terminal cell in pixels (sixel output size)
    #[serde(default = "default_cell_width")]
    pub cell_width_px: u32,
    /// Height of one terminal cell in pixels
    #[serde(default = "default_cell_height")]
    pub cell_height_px: u32,
    /// Luminance difference under which a half-block cell collapses to a full block
    #[serde(default = "default_half_block_threshold")]
    pub half_block_threshold: f64,
    /// Use this blitter when the terminal supports it
    #[serde(default)]
    pub force_blitter: Option<BlitterType>,
}

fn default_cell_width() -> u32 {
    10
}
fn default_cell_height() -> u32 {
    20
}
fn default_half_block_threshold() -> f64 {
    0.02
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cell_width_px: default_cell_width(),
            cell_height_px: default_cell_height(),
            half_block_threshold: default_half_block_threshold(),
            force_blitter: None,
        }
    }
}

/// Graphics configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphicsConfig {
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub kitty: KittyConfig,
    #[serde(default)]
    pub sixel: SixelConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

/// Configuration error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    pub message: String,
    pub field: Option<String>,
}

impl ConfigError {
    fn field(field: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(field) = &self.field {
            write!(f, "Config error in '{}': {}", field, self.message)
        } else {
            write!(f, "Config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl GraphicsConfig {
    /// Load with full precedence from the process environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, &ProcessEnv)
    }

    /// Load with full precedence: env > file > defaults
    ///
    /// A missing file is not an error; an unreadable or invalid one is logged
    /// and skipped.
    pub fn load_with_env(path: Option<&Path>, env: &dyn EnvSource) -> Result<Self, ConfigError> {
        let mut config = GraphicsConfig::default();

        if let Some(path) = path {
            if path.exists() {
                match Self::load_from_file(path) {
                    Ok(file_config) => config = file_config,
                    Err(e) => warn!("Failed to load config from {:?}: {}", path, e),
                }
            }
        }

        config.apply_env(env);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            message: format!("Failed to read config file: {}", e),
            field: None,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError {
            message: format!("Failed to parse config file: {}", e),
            field: None,
        })
    }

    /// Apply `MOCHI_GFX_*` environment variables
    pub fn apply_env(&mut self, env: &dyn EnvSource) {
        if let Some(ms) = env
            .var("MOCHI_GFX_PROBE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
        {
            self.probe.timeout_ms = ms;
        }
        if let Some(val) = env.var("MOCHI_GFX_ACTIVE_QUERY") {
            self.probe.active_query = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Some(size) = env.var("MOCHI_GFX_CHUNK_SIZE").and_then(|v| v.parse().ok()) {
            self.kitty.max_chunk_size = size;
        }
        if let Some(colors) = env
            .var("MOCHI_GFX_SIXEL_COLORS")
            .and_then(|v| v.parse().ok())
        {
            self.sixel.max_colors = colors;
        }
        if let Some(val) = env.var("MOCHI_GFX_BLITTER") {
            match val.parse::<BlitterType>() {
                Ok(blitter) => self.render.force_blitter = Some(blitter),
                Err(e) => warn!("Ignoring MOCHI_GFX_BLITTER: {}", e),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe.timeout_ms == 0 || self.probe.timeout_ms > MAX_PROBE_TIMEOUT_MS {
            return Err(ConfigError::field(
                "probe.timeout_ms",
                format!("must be between 1 and {}", MAX_PROBE_TIMEOUT_MS),
            ));
        }
        if !(4..=1_048_576).contains(&self.kitty.max_chunk_size) {
            return Err(ConfigError::field(
                "kitty.max_chunk_size",
                "must be between 4 and 1048576",
            ));
        }
        if !(2..=256).contains(&self.sixel.max_colors) {
            return Err(ConfigError::field(
                "sixel.max_colors",
                "must be between 2 and 256",
            ));
        }
        if self.render.cell_width_px == 0 || self.render.cell_height_px == 0 {
            return Err(ConfigError::field(
                "render.cell_width_px",
                "cell dimensions must be non-zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.render.half_block_threshold) {
            return Err(ConfigError::field(
                "render.half_block_threshold",
                "must be between 0.0 and 1.0",
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError {
            message: format!("Failed to serialize config: {}", e),
            field: None,
        })
    }
}
