//! Blitter selection
//!
//! A blitter is a strategy for turning pixels into terminal output. True
//! pixel protocols come first; after that the character blitters trade
//! resolution for compatibility, down to plain ASCII which always works.
//!
//! Selection is a fixed priority list, first match wins:
//! 1. image content and a pixel protocol -> [`BlitterType::PixelTransport`]
//! 2. high detail and sextants -> [`BlitterType::Sextant`]
//! 3. multiple colors and quadrants -> [`BlitterType::Quadrant`]
//! 4. chart content and braille -> [`BlitterType::Braille`]
//! 5. unicode -> [`BlitterType::HalfBlock`]
//! 6. otherwise [`BlitterType::AsciiFallback`]

mod cells;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::caps::TerminalCapabilities;
use crate::error::{GraphicsError, Result};

pub use cells::{render_cells, Cell, CellGrid, ASCII_RAMP};

/// Rendering strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlitterType {
    /// Real pixels over kitty graphics or sixel
    PixelTransport,
    /// 2x3 sub-cells (Unicode 13 sextants)
    Sextant,
    /// 2x2 sub-cells (quadrant blocks)
    Quadrant,
    /// 1x2 sub-cells (upper half block)
    HalfBlock,
    /// 2x4 dots (braille patterns)
    Braille,
    /// One character per cell from a density ramp
    AsciiFallback,
}

/// How much color a blitter can put in one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorTier {
    /// Foreground only
    SingleColor,
    /// Foreground and background
    TwoColor,
    /// Every pixel its own color
    FullColor,
}

/// Sub-pixels covered by one terminal cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRatio {
    pub width: u32,
    pub height: u32,
}

/// Static description of a blitter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlitterInfo {
    pub pixel_ratio: PixelRatio,
    pub color_tier: ColorTier,
    /// Higher means it works on more terminals
    pub compatibility_tier: u8,
}

impl BlitterType {
    /// All blitters, most capable first
    pub const ALL: [BlitterType; 6] = [
        BlitterType::PixelTransport,
        BlitterType::Sextant,
        BlitterType::Quadrant,
        BlitterType::Braille,
        BlitterType::HalfBlock,
        BlitterType::AsciiFallback,
    ];

    pub fn info(self) -> BlitterInfo {
        let (width, height, color_tier, compatibility_tier) = match self {
            BlitterType::PixelTransport => (1, 1, ColorTier::FullColor, 0),
            BlitterType::Sextant => (2, 3, ColorTier::TwoColor, 1),
            BlitterType::Quadrant => (2, 2, ColorTier::TwoColor, 2),
            BlitterType::Braille => (2, 4, ColorTier::SingleColor, 3),
            BlitterType::HalfBlock => (1, 2, ColorTier::TwoColor, 4),
            BlitterType::AsciiFallback => (1, 1, ColorTier::SingleColor, 5),
        };
        BlitterInfo {
            pixel_ratio: PixelRatio { width, height },
            color_tier,
            compatibility_tier,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlitterType::PixelTransport => "pixel-transport",
            BlitterType::Sextant => "sextant",
            BlitterType::Quadrant => "quadrant",
            BlitterType::HalfBlock => "half-block",
            BlitterType::Braille => "braille",
            BlitterType::AsciiFallback => "ascii-fallback",
        }
    }

    /// Whether `caps` can display this blitter
    pub fn is_supported(self, caps: &TerminalCapabilities) -> bool {
        match self {
            BlitterType::PixelTransport => caps.has_pixel_transport(),
            BlitterType::Sextant => caps.sextants,
            BlitterType::Quadrant => caps.quadrants,
            BlitterType::Braille => caps.braille,
            BlitterType::HalfBlock => caps.half_blocks || caps.unicode,
            BlitterType::AsciiFallback => true,
        }
    }
}

impl fmt::Display for BlitterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlitterType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "pixel-transport" | "pixel" | "kitty" | "sixel" => Ok(BlitterType::PixelTransport),
            "sextant" => Ok(BlitterType::Sextant),
            "quadrant" => Ok(BlitterType::Quadrant),
            "half-block" | "halfblock" => Ok(BlitterType::HalfBlock),
            "braille" => Ok(BlitterType::Braille),
            "ascii-fallback" | "ascii" => Ok(BlitterType::AsciiFallback),
            other => Err(format!("unknown blitter '{}'", other)),
        }
    }
}

/// What kind of thing is being drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    #[default]
    Image,
    Chart,
    Text,
    Canvas,
}

/// Descriptor of a render request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphicsContent {
    pub kind: ContentKind,
    pub multi_color: bool,
    pub high_detail: bool,
    pub animated: bool,
    /// Pixel size of the source, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<(u32, u32)>,
}

impl GraphicsContent {
    pub fn new(kind: ContentKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn image() -> Self {
        Self::new(ContentKind::Image)
    }

    pub fn chart() -> Self {
        Self::new(ContentKind::Chart)
    }

    pub fn with_multi_color(mut self, multi_color: bool) -> Self {
        self.multi_color = multi_color;
        self
    }

    pub fn with_high_detail(mut self, high_detail: bool) -> Self {
        self.high_detail = high_detail;
        self
    }

    pub fn with_animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }
}

/// Pick a blitter for `content` on a terminal with `caps`
pub fn select(content: &GraphicsContent, caps: &TerminalCapabilities) -> BlitterType {
    if content.kind == ContentKind::Image && caps.has_pixel_transport() {
        BlitterType::PixelTransport
    } else if content.high_detail && caps.sextants {
        BlitterType::Sextant
    } else if content.multi_color && caps.quadrants {
        BlitterType::Quadrant
    } else if content.kind == ContentKind::Chart && caps.braille {
        BlitterType::Braille
    } else if caps.unicode {
        BlitterType::HalfBlock
    } else {
        BlitterType::AsciiFallback
    }
}

/// Static table lookup
pub fn info(blitter: BlitterType) -> BlitterInfo {
    blitter.info()
}

/// Blitters usable on `caps`, most capable first, always ending in ASCII
pub fn supported_list(caps: &TerminalCapabilities) -> Vec<BlitterType> {
    BlitterType::ALL
        .into_iter()
        .filter(|b| b.is_supported(caps))
        .collect()
}

/// `blitter` if `caps` supports it
pub fn require(blitter: BlitterType, caps: &TerminalCapabilities) -> Result<BlitterType> {
    if blitter.is_supported(caps) {
        Ok(blitter)
    } else {
        Err(GraphicsError::UnsupportedProtocol(blitter))
    }
}

/// Selection with an optional forced preference
#[derive(Debug, Clone, Copy, Default)]
pub struct BlitterSelector {
    preferred: Option<BlitterType>,
}

impl BlitterSelector {
    pub fn new(preferred: Option<BlitterType>) -> Self {
        Self { preferred }
    }

    /// The preferred blitter when supported, else the priority list
    pub fn select(&self, content: &GraphicsContent, caps: &TerminalCapabilities) -> BlitterType {
        if let Some(preferred) = self.preferred {
            match require(preferred, caps) {
                Ok(blitter) => return blitter,
                Err(e) => debug!("{}, falling back to automatic selection", e),
            }
        }
        select(content, caps)
    }
}
