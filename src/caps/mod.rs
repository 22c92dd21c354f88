//! Terminal capability detection
//!
//! Capabilities come from two places:
//! - Environment variables (TERM, COLORTERM, TERM_PROGRAM, locale, ...)
//! - An optional active query written to the terminal, answered within a
//!   short timeout
//!
//! Both sources sit behind traits ([`EnvSource`], [`QueryChannel`]) and the
//! probe itself behind [`CapabilityProvider`], so tests and embedders can
//! supply synthetic capability sets without touching the process environment.

mod env;
mod probe;
mod query;

use serde::{Deserialize, Serialize};

pub use env::{detect_from_env, EnvSource, MapEnv, ProcessEnv};
pub use probe::CapabilityProbe;
pub use query::{
    parse_query_response, QueryChannel, QueryResponse, RawModeGuard, TtyChannel,
    CAPABILITY_QUERY, KITTY_QUERY_ID,
};

/// Snapshot of what the terminal can display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalCapabilities {
    /// Chunked-transport pixel protocol (kitty graphics)
    pub kitty_graphics: bool,
    /// Row-packed pixel protocol (sixel)
    pub sixel_graphics: bool,
    /// Unicode 13 sextant block characters (2x3 per cell)
    pub sextants: bool,
    /// Quadrant block characters (2x2 per cell)
    pub quadrants: bool,
    /// Upper/lower half blocks (1x2 per cell)
    pub half_blocks: bool,
    /// Braille patterns (2x4 per cell)
    pub braille: bool,
    /// Terminal can display UTF-8 at all
    pub unicode: bool,
    /// Color depth in bits (1, 4, 8 or 24)
    pub color_bits: u8,
    /// Number of distinct colors
    pub max_colors: u32,
    /// TERM_PROGRAM or TERM, whichever identified the terminal
    pub terminal_id: String,
    /// Largest chunk the terminal accepts per graphics directive, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chunk_size: Option<usize>,
}

impl TerminalCapabilities {
    /// The result used when nothing can be detected: ASCII only, 16 colors
    pub fn conservative() -> Self {
        Self {
            kitty_graphics: false,
            sixel_graphics: false,
            sextants: false,
            quadrants: false,
            half_blocks: false,
            braille: false,
            unicode: false,
            color_bits: 4,
            max_colors: 16,
            terminal_id: "unknown".to_string(),
            max_chunk_size: None,
        }
    }

    /// Whether either pixel protocol is available
    pub fn has_pixel_transport(&self) -> bool {
        self.kitty_graphics || self.sixel_graphics
    }

    pub fn truecolor(&self) -> bool {
        self.color_bits >= 24
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for TerminalCapabilities {
    fn default() -> Self {
        Self::conservative()
    }
}

/// Source of terminal capabilities, memoized by the implementation
pub trait CapabilityProvider {
    /// Cached capabilities, detecting them on first use
    fn detect(&mut self) -> &TerminalCapabilities;

    /// Drop the cache and detect again
    fn refresh(&mut self) -> &TerminalCapabilities;
}

/// A fixed capability set
#[derive(Debug, Clone, Default)]
pub struct StaticCapabilities(pub TerminalCapabilities);

impl CapabilityProvider for StaticCapabilities {
    fn detect(&mut self) -> &TerminalCapabilities {
        &self.0
    }

    fn refresh(&mut self) -> &TerminalCapabilities {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conservative_defaults() {
        let caps = TerminalCapabilities::default();
        assert!(!caps.has_pixel_transport());
        assert!(!caps.unicode);
        assert_eq!(caps.max_colors, 16);
        assert!(!caps.truecolor());
    }

    #[test]
    fn test_capabilities_json_roundtrip() {
        let mut caps = TerminalCapabilities::conservative();
        caps.kitty_graphics = true;
        caps.max_chunk_size = Some(2048);
        let json = caps.to_json().unwrap();
        assert!(json.contains("\"kitty_graphics\": true"));
        assert_eq!(TerminalCapabilities::from_json(&json).unwrap(), caps);
    }

    #[test]
    fn test_static_provider() {
        let mut caps = TerminalCapabilities::conservative();
        caps.quadrants = true;
        let mut provider = StaticCapabilities(caps.clone());
        assert_eq!(provider.detect(), &caps);
        assert_eq!(provider.refresh(), &caps);
    }
}
