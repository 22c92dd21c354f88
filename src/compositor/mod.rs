//! Plane compositor
//!
//! Owns a tree of rectangular planes and draws them back to front. Render
//! order is one total order over every live plane: ascending z-index, ties
//! broken by creation order. A plane is drawn only when it and all of its
//! ancestors are visible.
//!
//! There is no persistent framebuffer. Each pass redraws from the plane
//! model into a scratch cell canvas, which transparent planes blend against.

mod canvas;
mod plane;
mod snapshot;

use std::collections::HashMap;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::blitter::{render_cells, BlitterSelector, BlitterType, CellGrid};
use crate::caps::{CapabilityProvider, TerminalCapabilities};
use crate::config::GraphicsConfig;
use crate::error::{GraphicsError, Result};
use crate::protocol::{
    ImageHandle, KittyEncoder, PackingMode, Placement, SixelEncoder, UploadFormat,
};
use crate::visual::Visual;

use canvas::{emit_cells, Canvas, ColorDepth};

pub use plane::{Plane, PlaneContent, PlaneSpec, PlaneState};
pub use snapshot::{CompositorSnapshot, ContentSnapshot, PlaneSnapshot};

/// Counters for one render pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    /// Planes drawn without error
    pub planes_drawn: usize,
    /// Planes skipped because they or an ancestor are hidden
    pub planes_skipped: usize,
    /// Planes sent through a pixel transport
    pub pixel_planes: usize,
    /// Planes whose render failed; the pass carried on without them
    pub failures: usize,
    pub bytes_written: usize,
}

/// Counts bytes on their way to the terminal
struct CountingWriter<W> {
    inner: W,
    count: usize,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Z-ordered plane registry and renderer
pub struct Compositor {
    caps: Box<dyn CapabilityProvider>,
    config: GraphicsConfig,
    selector: BlitterSelector,
    kitty: KittyEncoder,
    sixel: SixelEncoder,
    planes: HashMap<String, Plane>,
    /// Every live plane id in render order
    order: Vec<String>,
    next_seq: u64,
    /// Kitty uploads still valid for a plane's current content and size
    uploads: HashMap<String, ImageHandle>,
    /// Uploads to delete at the start of the next pass
    stale_uploads: Vec<ImageHandle>,
    last_stats: RenderStats,
}

impl Compositor {
    /// Detects capabilities immediately; the kitty chunk size depends on them
    pub fn new(mut caps: Box<dyn CapabilityProvider>, config: GraphicsConfig) -> Self {
        let kitty = KittyEncoder::from_config(&config.kitty, caps.detect());
        Self {
            caps,
            selector: BlitterSelector::new(config.render.force_blitter),
            kitty,
            sixel: SixelEncoder::from_config(&config.sixel),
            config,
            planes: HashMap::new(),
            order: Vec::new(),
            next_seq: 0,
            uploads: HashMap::new(),
            stale_uploads: Vec::new(),
            last_stats: RenderStats::default(),
        }
    }

    /// Like [`Compositor::new`], rejecting a config that fails validation
    pub fn try_new(caps: Box<dyn CapabilityProvider>, config: GraphicsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(caps, config))
    }

    pub fn config(&self) -> &GraphicsConfig {
        &self.config
    }

    pub fn capabilities(&mut self) -> &TerminalCapabilities {
        self.caps.detect()
    }

    /// Re-detect capabilities; cached uploads are kept
    pub fn refresh_capabilities(&mut self) -> &TerminalCapabilities {
        self.caps.refresh()
    }

    pub fn last_stats(&self) -> RenderStats {
        self.last_stats
    }

    /// Kitty image registry
    pub fn kitty(&self) -> &KittyEncoder {
        &self.kitty
    }

    /// Create a plane in the `Created` state with empty content
    pub fn create_plane(&mut self, spec: PlaneSpec) -> Result<&Plane> {
        if self.planes.contains_key(&spec.id) {
            return Err(GraphicsError::DuplicateId(spec.id));
        }
        if let Some(parent) = &spec.parent {
            let parent = self
                .planes
                .get_mut(parent)
                .ok_or_else(|| GraphicsError::PlaneNotFound(parent.clone()))?;
            parent.children.push(spec.id.clone());
        }

        let id = spec.id.clone();
        let plane = Plane::from_spec(spec, self.next_seq);
        self.next_seq += 1;
        debug!(
            plane = %id,
            z = plane.z_index,
            parent = ?plane.parent,
            "plane created"
        );
        self.planes.insert(id.clone(), plane);
        self.order.push(id.clone());
        self.sort_order();

        self.planes
            .get(&id)
            .ok_or(GraphicsError::PlaneNotFound(id))
    }

    /// Destroy a plane and its whole subtree, children first
    ///
    /// Returns false if `id` is not a live plane.
    pub fn destroy_plane(&mut self, id: &str) -> bool {
        let Some(plane) = self.planes.get(id) else {
            return false;
        };
        if let Some(parent_id) = plane.parent.clone() {
            if let Some(parent) = self.planes.get_mut(&parent_id) {
                parent.children.retain(|c| c != id);
            }
        }

        let mut doomed = Vec::new();
        self.collect_subtree(id, &mut doomed);
        for dead in &doomed {
            self.planes.remove(dead);
            if let Some(handle) = self.uploads.remove(dead) {
                self.stale_uploads.push(handle);
            }
        }
        self.order.retain(|o| !doomed.contains(o));
        debug!(plane = %id, removed = doomed.len(), "plane destroyed");
        true
    }

    /// Post-order: descendants before `id`
    fn collect_subtree(&self, id: &str, out: &mut Vec<String>) {
        if let Some(plane) = self.planes.get(id) {
            for child in &plane.children {
                self.collect_subtree(child, out);
            }
            out.push(id.to_string());
        }
    }

    fn sort_order(&mut self) {
        let planes = &self.planes;
        self.order.sort_by_key(|id| {
            planes
                .get(id)
                .map_or((i32::MAX, u64::MAX), |p| (p.z_index, p.seq))
        });
    }

    fn plane_mut(&mut self, id: &str) -> Result<&mut Plane> {
        self.planes
            .get_mut(id)
            .ok_or_else(|| GraphicsError::PlaneNotFound(id.to_string()))
    }

    fn invalidate_upload(&mut self, id: &str) {
        if let Some(handle) = self.uploads.remove(id) {
            self.stale_uploads.push(handle);
        }
    }

    pub fn set_z_index(&mut self, id: &str, z: i32) -> Result<()> {
        self.plane_mut(id)?.z_index = z;
        self.sort_order();
        Ok(())
    }

    pub fn show(&mut self, id: &str) -> Result<()> {
        self.plane_mut(id)?.state = PlaneState::Visible;
        Ok(())
    }

    pub fn hide(&mut self, id: &str) -> Result<()> {
        self.plane_mut(id)?.state = PlaneState::Hidden;
        Ok(())
    }

    pub fn move_plane(&mut self, id: &str, x: u32, y: u32) -> Result<()> {
        let plane = self.plane_mut(id)?;
        plane.x = x;
        plane.y = y;
        Ok(())
    }

    pub fn resize_plane(&mut self, id: &str, width: u32, height: u32) -> Result<()> {
        let plane = self.plane_mut(id)?;
        plane.width = width;
        plane.height = height;
        self.invalidate_upload(id);
        Ok(())
    }

    pub fn set_content(&mut self, id: &str, content: PlaneContent) -> Result<()> {
        self.plane_mut(id)?.content = content;
        self.invalidate_upload(id);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Plane> {
        self.planes.get(id)
    }

    /// Every live plane in render order
    pub fn all(&self) -> Vec<&Plane> {
        self.order.iter().filter_map(|id| self.planes.get(id)).collect()
    }

    pub fn count(&self) -> usize {
        self.planes.len()
    }

    /// Planes with `min <= z_index <= max`, in render order
    pub fn find_by_z_range(&self, min: i32, max: i32) -> Vec<&Plane> {
        self.all()
            .into_iter()
            .filter(|p| (min..=max).contains(&p.z_index))
            .collect()
    }

    pub fn render_order(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn snapshot(&self) -> CompositorSnapshot {
        CompositorSnapshot {
            planes: self.all().into_iter().map(PlaneSnapshot::from).collect(),
            render_order: self.order.clone(),
        }
    }

    /// The plane and every ancestor are visible
    fn is_drawable(&self, id: &str) -> bool {
        let mut current = self.planes.get(id);
        while let Some(plane) = current {
            if !plane.is_visible() {
                return false;
            }
            current = plane.parent.as_deref().and_then(|p| self.planes.get(p));
        }
        true
    }

    /// Draw every visible plane back to front, then flush once
    ///
    /// A plane that fails to render is logged and counted in the returned
    /// stats; the rest of the pass continues. Only a failed flush is
    /// returned as an error.
    pub fn render_all<W: Write>(&mut self, out: &mut W) -> Result<RenderStats> {
        let caps = self.caps.detect().clone();
        let depth = ColorDepth::from_bits(caps.color_bits);
        let mut out = CountingWriter {
            inner: out,
            count: 0,
        };
        let mut stats = RenderStats::default();

        for handle in std::mem::take(&mut self.stale_uploads) {
            if let Err(e) = self.kitty.remove(&mut out, handle) {
                warn!(image_id = handle.id(), "failed to delete stale image: {}", e);
            }
        }

        let drawable: Vec<String> = self
            .order
            .iter()
            .filter(|id| self.is_drawable(id))
            .cloned()
            .collect();
        stats.planes_skipped = self.order.len() - drawable.len();

        let (cols, rows) = drawable
            .iter()
            .filter_map(|id| self.planes.get(id))
            .fold((0u32, 0u32), |(c, r), p| {
                (
                    c.max(p.x.saturating_add(p.width)),
                    r.max(p.y.saturating_add(p.height)),
                )
            });
        let mut canvas = Canvas::new(cols, rows);

        for id in &drawable {
            match self.render_plane(id, &caps, depth, &mut canvas, &mut out) {
                Ok(pixels) => {
                    stats.planes_drawn += 1;
                    if pixels {
                        stats.pixel_planes += 1;
                    }
                }
                Err(e) => {
                    warn!(plane = %id, "plane render failed: {}", e);
                    stats.failures += 1;
                }
            }
            if let Some(plane) = self.planes.get_mut(id) {
                if plane.state == PlaneState::Created {
                    plane.state = PlaneState::Visible;
                }
            }
        }

        out.flush()?;
        stats.bytes_written = out.count;
        trace!(?stats, "render pass complete");
        self.last_stats = stats;
        Ok(stats)
    }

    /// Returns true when the plane went out through a pixel transport
    fn render_plane<W: Write>(
        &mut self,
        id: &str,
        caps: &TerminalCapabilities,
        depth: ColorDepth,
        canvas: &mut Canvas,
        out: &mut W,
    ) -> Result<bool> {
        let plane = self
            .planes
            .get(id)
            .ok_or_else(|| GraphicsError::PlaneNotFound(id.to_string()))?;
        let (x, y, width, height) = (plane.x, plane.y, plane.width, plane.height);
        let (z, transparent) = (plane.z_index, plane.transparent);
        if width == 0 || height == 0 {
            return Ok(false);
        }

        let grid = match &plane.content {
            PlaneContent::Empty => return Ok(false),
            PlaneContent::Fill(color) => CellGrid::filled(width, height, *color),
            PlaneContent::Visual { visual, descriptor } => {
                let blitter = self.selector.select(descriptor, caps);
                if blitter == BlitterType::PixelTransport {
                    let (visual, multi_color) = (visual.clone(), descriptor.multi_color);
                    self.render_pixels(id, &visual, multi_color, z, caps, out)?;
                    return Ok(true);
                }
                let ratio = blitter.info().pixel_ratio;
                let scaled = visual.scaled(width * ratio.width, height * ratio.height)?;
                render_cells(&scaled, blitter, self.config.render.half_block_threshold)
            }
        };

        let drawn = canvas.draw(&grid, x, y, transparent);
        out.write_all(emit_cells(&drawn, x, y, depth).as_bytes())?;
        Ok(false)
    }

    fn render_pixels<W: Write>(
        &mut self,
        id: &str,
        visual: &Visual,
        multi_color: bool,
        z: i32,
        caps: &TerminalCapabilities,
        out: &mut W,
    ) -> Result<()> {
        let plane = self
            .planes
            .get(id)
            .ok_or_else(|| GraphicsError::PlaneNotFound(id.to_string()))?;
        let (x, y, width, height) = (plane.x, plane.y, plane.width, plane.height);
        write!(out, "\x1b[{};{}H", y + 1, x + 1)?;

        if caps.kitty_graphics {
            let cached = self
                .uploads
                .get(id)
                .copied()
                .filter(|&h| self.kitty.is_registered(h));
            let handle = match cached {
                Some(handle) => handle,
                None => {
                    let rgba = visual.to_rgba();
                    let handle = self.kitty.upload(out, rgba.data(), UploadFormat::Other)?;
                    self.uploads.insert(id.to_string(), handle);
                    handle
                }
            };
            let placement = Placement::cells(width, height).with_z_index(z);
            self.kitty.display(out, handle, &placement)?;
        } else {
            let target = visual.scaled(
                width * self.config.render.cell_width_px,
                height * self.config.render.cell_height_px,
            )?;
            // A mask only shows register 0
            let sixel = if multi_color {
                self.sixel.with_packing(PackingMode::PerColor)
            } else {
                self.sixel
            };
            out.write_all(&sixel.encode_visual(&target))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("planes", &self.planes.len())
            .field("order", &self.order)
            .field("uploads", &self.uploads)
            .field("last_stats", &self.last_stats)
            .finish()
    }
}
