//! Wire encoders for pixel transports
//!
//! - [`sixel`]: palette-indexed image packed six rows at a time
//! - [`kitty`]: raw bytes sent as chunked base64 with an image id registry
//!
//! Both write to any [`std::io::Write`] sink; buffering and flushing belong
//! to the caller.

pub mod kitty;
pub mod sixel;

use serde::{Deserialize, Serialize};

pub use kitty::{ChunkLimit, ImageHandle, KittyEncoder, Placement, UploadFormat};
pub use sixel::SixelEncoder;

/// Escape
pub const ESC: u8 = 0x1b;

/// String terminator (`ESC \`)
pub const ST: &[u8] = b"\x1b\\";

/// Which pixels of a sixel strip get drawn, and in which colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackingMode {
    /// One pass per strip in colour register 0, bits set for every
    /// non-background pixel
    #[default]
    Mask,
    /// One pass per palette entry present in the strip
    PerColor,
}
