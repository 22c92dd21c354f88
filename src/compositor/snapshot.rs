//! Serializable view of the plane tree
//!
//! Snapshots capture plane geometry, state and render order for tests and
//! debugging. Pixel data is summarized, not copied.

use serde::{Deserialize, Serialize};

use super::plane::{Plane, PlaneContent, PlaneState};

/// The whole compositor at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositorSnapshot {
    /// Planes in render order
    pub planes: Vec<PlaneSnapshot>,
    /// Ids in the order they would be drawn, hidden ones included
    pub render_order: Vec<String>,
}

/// One plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneSnapshot {
    pub id: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub z_index: i32,
    pub state: PlaneState,
    pub transparent: bool,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub content: ContentSnapshot,
}

/// Plane content without pixel data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentSnapshot {
    Empty,
    Fill { color: String },
    Visual { width: u32, height: u32 },
}

impl From<&Plane> for PlaneSnapshot {
    fn from(plane: &Plane) -> Self {
        let content = match plane.content() {
            PlaneContent::Empty => ContentSnapshot::Empty,
            PlaneContent::Fill(color) => ContentSnapshot::Fill {
                color: color.to_display_string(),
            },
            PlaneContent::Visual { visual, .. } => ContentSnapshot::Visual {
                width: visual.width(),
                height: visual.height(),
            },
        };
        Self {
            id: plane.id().to_string(),
            x: plane.x,
            y: plane.y,
            width: plane.width,
            height: plane.height,
            z_index: plane.z_index,
            state: plane.state,
            transparent: plane.transparent,
            parent: plane.parent.clone(),
            children: plane.children.clone(),
            content,
        }
    }
}

impl CompositorSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
