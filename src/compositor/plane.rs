//! Plane model

use serde::{Deserialize, Serialize};

use crate::blitter::GraphicsContent;
use crate::color::ColorChannel;
use crate::visual::Visual;

/// Lifecycle of a plane; destroyed planes leave the registry entirely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaneState {
    /// Created but not rendered yet
    Created,
    Visible,
    Hidden,
}

/// What a plane draws
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlaneContent {
    /// Nothing of its own; children still draw
    #[default]
    Empty,
    /// Every cell set to one background colour
    Fill(ColorChannel),
    /// Pixels, scaled to the plane and rendered with a selected blitter
    Visual {
        visual: Visual,
        descriptor: GraphicsContent,
    },
}

impl PlaneContent {
    pub fn visual(visual: Visual, descriptor: GraphicsContent) -> Self {
        PlaneContent::Visual { visual, descriptor }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            PlaneContent::Empty => "empty",
            PlaneContent::Fill(_) => "fill",
            PlaneContent::Visual { .. } => "visual",
        }
    }
}

/// Arguments to [`Compositor::create_plane`](super::Compositor::create_plane)
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneSpec {
    pub id: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub z_index: i32,
    pub transparent: bool,
    pub parent: Option<String>,
}

impl PlaneSpec {
    pub fn new(id: impl Into<String>, x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            width,
            height,
            z_index: 0,
            transparent: false,
            parent: None,
        }
    }

    pub fn z_index(mut self, z: i32) -> Self {
        self.z_index = z;
        self
    }

    pub fn transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }
}

/// A rectangular region in cell coordinates
#[derive(Debug, Clone)]
pub struct Plane {
    pub(super) id: String,
    pub(super) x: u32,
    pub(super) y: u32,
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) z_index: i32,
    pub(super) state: PlaneState,
    pub(super) transparent: bool,
    pub(super) parent: Option<String>,
    pub(super) children: Vec<String>,
    pub(super) content: PlaneContent,
    /// Creation sequence, breaks z-index ties
    pub(super) seq: u64,
}

impl Plane {
    pub(super) fn from_spec(spec: PlaneSpec, seq: u64) -> Self {
        Self {
            id: spec.id,
            x: spec.x,
            y: spec.y,
            width: spec.width,
            height: spec.height,
            z_index: spec.z_index,
            state: PlaneState::Created,
            transparent: spec.transparent,
            parent: spec.parent,
            children: Vec::new(),
            content: PlaneContent::Empty,
            seq,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> (u32, u32) {
        (self.x, self.y)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn state(&self) -> PlaneState {
        self.state
    }

    /// Created and Visible planes are drawn
    pub fn is_visible(&self) -> bool {
        self.state != PlaneState::Hidden
    }

    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn content(&self) -> &PlaneContent {
        &self.content
    }

    pub fn creation_seq(&self) -> u64 {
        self.seq
    }
}
