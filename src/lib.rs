//! Mochi Graphics Library
//!
//! Renders raster and pseudo-raster graphics inside text terminals with
//! widely different capabilities.
//!
//! - `caps`: terminal capability detection (environment + active query)
//! - `blitter`: rendering strategy selection and character-cell renderers
//! - `color`: RGBA color math, xterm palette, quantization
//! - `transform`: scale/rotate/flip over raw pixel buffers
//! - `protocol`: kitty graphics and sixel encoders
//! - `compositor`: z-ordered plane tree with per-pass blending
//! - `animation`: frame-stepped fades and gradients

pub mod animation;
pub mod blitter;
pub mod caps;
pub mod color;
pub mod compositor;
pub mod config;
pub mod error;
pub mod protocol;
pub mod transform;
pub mod visual;

pub use animation::{Animation, AnimationOutcome, Sleeper, StopSignal, ThreadSleeper};
pub use blitter::{BlitterSelector, BlitterType, ContentKind, GraphicsContent};
pub use caps::{CapabilityProbe, CapabilityProvider, StaticCapabilities, TerminalCapabilities};
pub use color::ColorChannel;
pub use compositor::{Compositor, Plane, PlaneContent, PlaneSpec, PlaneState, RenderStats};
pub use config::GraphicsConfig;
pub use error::{GraphicsError, Result};
pub use protocol::{ImageHandle, KittyEncoder, PackingMode, Placement, SixelEncoder, UploadFormat};
pub use visual::{PixelFormat, Visual};
