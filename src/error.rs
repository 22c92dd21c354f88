//! Error types for graphics operations

use std::io;
use thiserror::Error;

use crate::blitter::BlitterType;
use crate::config::ConfigError;
use crate::visual::PixelFormat;

/// Graphics error type
#[derive(Error, Debug)]
pub enum GraphicsError {
    /// Requested blitter or transport is not available on this terminal
    #[error("Unsupported protocol: {0:?} is not available")]
    UnsupportedProtocol(BlitterType),

    /// Writing an image to the terminal failed part way through
    #[error("Transmission of image {image_id} failed: {source}")]
    TransmissionFailure {
        image_id: u32,
        #[source]
        source: io::Error,
    },

    /// Buffer length does not match width * height * bytes per pixel
    #[error("Invalid dimensions: {width}x{height} {format:?} needs {expected} bytes, got {actual}")]
    InvalidDimension {
        width: u32,
        height: u32,
        format: PixelFormat,
        expected: usize,
        actual: usize,
    },

    /// Operation referenced an unknown or destroyed plane
    #[error("Plane not found: {0}")]
    PlaneNotFound(String),

    /// Plane creation with an id that is already live
    #[error("Duplicate plane id: {0}")]
    DuplicateId(String),

    /// Placement or removal referenced an id the encoder never registered
    #[error("Unknown image id: {0}")]
    UnknownImage(u32),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Nix error
    #[error("System error: {0}")]
    Nix(#[from] nix::Error),
}

/// Result type for graphics operations
pub type Result<T> = std::result::Result<T, GraphicsError>;
