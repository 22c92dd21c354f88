//! Capability sniffing from environment variables

use std::collections::HashMap;

use super::TerminalCapabilities;

/// Read access to environment variables
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

/// A fixed set of variables, for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MapEnv(HashMap<String, String>);

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }
}

impl EnvSource for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.0.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for MapEnv {
    fn from(pairs: [(&str, &str); N]) -> Self {
        pairs
            .into_iter()
            .fold(MapEnv::new(), |env, (k, v)| env.with(k, v))
    }
}

/// TERM_PROGRAM values of terminals that speak the kitty graphics protocol
const KITTY_PROGRAMS: &[&str] = &["kitty", "wezterm", "ghostty"];

/// TERM prefixes / TERM_PROGRAM values of terminals known to decode sixel
const SIXEL_TERMS: &[&str] = &["foot", "mlterm", "yaft", "contour", "xterm-sixel"];
const SIXEL_PROGRAMS: &[&str] = &["wezterm", "mlterm", "contour"];

/// Terminals whose fonts cover the Unicode 13 sextant block
const SEXTANT_TERMS: &[&str] = &["kitty", "wezterm", "foot", "ghostty", "contour"];

/// TERM values that cannot render anything beyond ASCII
const ASCII_TERMS: &[&str] = &["dumb", "linux", "vt100", "vt220"];

fn lower(env: &dyn EnvSource, key: &str) -> String {
    env.var(key).unwrap_or_default().to_ascii_lowercase()
}

fn locale_is_utf8(env: &dyn EnvSource) -> bool {
    // LC_ALL overrides LC_CTYPE which overrides LANG
    ["LC_ALL", "LC_CTYPE", "LANG"]
        .iter()
        .find_map(|key| env.var(key))
        .map(|v| {
            let v = v.to_ascii_lowercase();
            v.contains("utf-8") || v.contains("utf8")
        })
        .unwrap_or(false)
}

/// Detect capabilities from the environment alone
pub fn detect_from_env(env: &dyn EnvSource) -> TerminalCapabilities {
    let term = lower(env, "TERM");
    let program = lower(env, "TERM_PROGRAM");
    let colorterm = lower(env, "COLORTERM");

    let is_kitty_like = term.contains("kitty")
        || term.contains("ghostty")
        || env.var("KITTY_WINDOW_ID").is_some()
        || env.var("GHOSTTY_RESOURCES_DIR").is_some()
        || KITTY_PROGRAMS.contains(&program.as_str());

    let sixel_graphics = SIXEL_TERMS.iter().any(|t| term.starts_with(t))
        || SIXEL_PROGRAMS.contains(&program.as_str());

    let ascii_only = ASCII_TERMS.contains(&term.as_str());
    let unicode = !ascii_only && (locale_is_utf8(env) || is_kitty_like);

    let sextants = unicode
        && SEXTANT_TERMS
            .iter()
            .any(|t| term.contains(t) || program.contains(t));

    let (color_bits, max_colors) = if term == "dumb" {
        (1, 2)
    } else if colorterm == "truecolor" || colorterm == "24bit" || is_kitty_like {
        (24, 1 << 24)
    } else if term.contains("256color") {
        (8, 256)
    } else {
        (4, 16)
    };

    let terminal_id = env
        .var("TERM_PROGRAM")
        .or_else(|| env.var("TERM"))
        .unwrap_or_else(|| "unknown".to_string());

    TerminalCapabilities {
        kitty_graphics: is_kitty_like,
        sixel_graphics,
        sextants,
        quadrants: unicode,
        half_blocks: unicode,
        braille: unicode,
        unicode,
        color_bits,
        max_colors,
        terminal_id,
        max_chunk_size: None,
    }
}
