//! Kitty graphics protocol encoder
//!
//! Commands are APC sequences: `ESC _G <key=value,...>[;<base64>] ESC \`.
//! Uploads are sent strictly in order as chunks; only the first chunk carries
//! metadata.
//!
//! `max_chunk_size` bounds the raw bytes of a chunk by default
//! ([`ChunkLimit::Raw`]), so a 4096 cap puts up to 5460 base64 bytes on the
//! wire per chunk and a 10,000 byte upload takes three chunks. Terminals that
//! enforce the cap on the encoded payload, as kitty itself does at 4096, need
//! [`ChunkLimit::Encoded`].
//!
//! Reference: https://sw.kovidgoyal.net/kitty/graphics-protocol/

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use super::ST;
use crate::caps::{TerminalCapabilities, KITTY_QUERY_ID};
use crate::config::KittyConfig;
use crate::error::{GraphicsError, Result};

const APC_START: &[u8] = b"\x1b_G";

/// Id of an uploaded image, unique per encoder while registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageHandle(pub u32);

impl ImageHandle {
    pub fn id(self) -> u32 {
        self.0
    }
}

/// Payload format code (`f=`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadFormat {
    Png,
    Jpeg,
    Other,
}

impl UploadFormat {
    pub fn code(self) -> u32 {
        match self {
            UploadFormat::Png => 100,
            UploadFormat::Jpeg => 24,
            UploadFormat::Other => 1,
        }
    }
}

/// What `max_chunk_size` is measured against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkLimit {
    /// Raw bytes before base64
    #[default]
    Raw,
    /// Base64 bytes on the wire
    Encoded,
}

/// Where and how to show an uploaded image; unset keys are omitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub x: Option<u32>,
    pub y: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub columns: Option<u32>,
    pub rows: Option<u32>,
    pub z_index: Option<i32>,
}

impl Placement {
    /// Scale the image into a `columns` x `rows` cell box
    pub fn cells(columns: u32, rows: u32) -> Self {
        Self {
            columns: Some(columns),
            rows: Some(rows),
            ..Self::default()
        }
    }

    pub fn with_z_index(mut self, z: i32) -> Self {
        self.z_index = Some(z);
        self
    }

    fn write_keys(&self, control: &mut String) {
        let keys = [
            ("x", self.x.map(i64::from)),
            ("y", self.y.map(i64::from)),
            ("w", self.width.map(i64::from)),
            ("h", self.height.map(i64::from)),
            ("c", self.columns.map(i64::from)),
            ("r", self.rows.map(i64::from)),
            ("z", self.z_index.map(i64::from)),
        ];
        for (key, value) in keys {
            if let Some(v) = value {
                let _ = write!(control, ",{}={}", key, v);
            }
        }
    }
}

fn command(control: &str, payload: Option<&[u8]>) -> Vec<u8> {
    let mut out = Vec::with_capacity(control.len() + payload.map_or(0, |p| p.len() + 1) + 5);
    out.extend_from_slice(APC_START);
    out.extend_from_slice(control.as_bytes());
    if let Some(payload) = payload {
        out.push(b';');
        out.extend_from_slice(payload);
    }
    out.extend_from_slice(ST);
    out
}

/// Chunked-transport encoder with its own image id registry
#[derive(Debug, Clone)]
pub struct KittyEncoder {
    max_chunk_size: usize,
    chunk_limit: ChunkLimit,
    next_id: u32,
    registry: BTreeMap<u32, UploadFormat>,
}

impl Default for KittyEncoder {
    fn default() -> Self {
        Self::new(KittyConfig::default().max_chunk_size)
    }
}

impl KittyEncoder {
    pub fn new(max_chunk_size: usize) -> Self {
        Self {
            max_chunk_size: max_chunk_size.max(1),
            chunk_limit: ChunkLimit::Raw,
            next_id: 1,
            registry: BTreeMap::new(),
        }
    }

    /// Chunk size reported by the terminal, else the configured one
    pub fn from_config(config: &KittyConfig, caps: &TerminalCapabilities) -> Self {
        Self::new(caps.max_chunk_size.unwrap_or(config.max_chunk_size))
            .with_chunk_limit(config.chunk_limit)
    }

    pub fn with_chunk_limit(mut self, chunk_limit: ChunkLimit) -> Self {
        self.chunk_limit = chunk_limit;
        self
    }

    pub fn chunk_limit(&self) -> ChunkLimit {
        self.chunk_limit
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Raw bytes per chunk: whole base64 groups, so no chunk but the last
    /// carries padding
    fn raw_chunk_size(&self) -> usize {
        match self.chunk_limit {
            ChunkLimit::Raw if self.max_chunk_size < 3 => self.max_chunk_size,
            ChunkLimit::Raw => self.max_chunk_size - self.max_chunk_size % 3,
            ChunkLimit::Encoded => (self.max_chunk_size / 4).max(1) * 3,
        }
    }

    pub fn is_registered(&self, handle: ImageHandle) -> bool {
        self.registry.contains_key(&handle.0)
    }

    pub fn format_of(&self, handle: ImageHandle) -> Option<UploadFormat> {
        self.registry.get(&handle.0).copied()
    }

    /// Registered handles in id order
    pub fn handles(&self) -> impl Iterator<Item = ImageHandle> + '_ {
        self.registry.keys().map(|&id| ImageHandle(id))
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    fn allocate(&mut self, format: UploadFormat) -> ImageHandle {
        let mut id = self.next_id;
        while id == 0 || id == KITTY_QUERY_ID || self.registry.contains_key(&id) {
            id = id.wrapping_add(1);
        }
        self.next_id = id.wrapping_add(1);
        self.registry.insert(id, format);
        ImageHandle(id)
    }

    /// Transmission commands for one image, in send order
    fn chunks(
        &self,
        action: char,
        handle: ImageHandle,
        data: &[u8],
        format: UploadFormat,
        placement: Option<&Placement>,
    ) -> Vec<Vec<u8>> {
        let pieces: Vec<&[u8]> = if data.is_empty() {
            vec![data]
        } else {
            data.chunks(self.raw_chunk_size()).collect()
        };
        let last = pieces.len() - 1;

        pieces
            .iter()
            .enumerate()
            .map(|(n, piece)| {
                let more = u8::from(n != last);
                let mut control = String::new();
                if n == 0 {
                    let _ = write!(
                        control,
                        "a={},f={},i={},t=d,s={}",
                        action,
                        format.code(),
                        handle.0,
                        data.len()
                    );
                    if let Some(placement) = placement {
                        placement.write_keys(&mut control);
                    }
                    let _ = write!(control, ",m={}", more);
                } else {
                    let _ = write!(control, "i={},m={}", handle.0, more);
                }
                let encoded = STANDARD.encode(piece);
                command(&control, Some(encoded.as_bytes()))
            })
            .collect()
    }

    fn transmit<W: Write>(
        &mut self,
        out: &mut W,
        action: char,
        data: &[u8],
        format: UploadFormat,
        placement: Option<&Placement>,
    ) -> Result<ImageHandle> {
        let handle = self.allocate(format);
        let chunks = self.chunks(action, handle, data, format, placement);
        let count = chunks.len();

        for chunk in &chunks {
            if let Err(source) = out.write_all(chunk) {
                self.registry.remove(&handle.0);
                warn!(
                    image_id = handle.0,
                    "image transmission failed, dropping partial upload: {}", source
                );
                return Err(GraphicsError::TransmissionFailure {
                    image_id: handle.0,
                    source,
                });
            }
        }

        trace!(
            image_id = handle.0,
            bytes = data.len(),
            chunks = count,
            "image transmitted"
        );
        Ok(handle)
    }

    /// Send `data` to the terminal without showing it
    pub fn upload<W: Write>(
        &mut self,
        out: &mut W,
        data: &[u8],
        format: UploadFormat,
    ) -> Result<ImageHandle> {
        self.transmit(out, 't', data, format, None)
    }

    /// Place an uploaded image
    pub fn display<W: Write>(
        &self,
        out: &mut W,
        handle: ImageHandle,
        placement: &Placement,
    ) -> Result<()> {
        if !self.is_registered(handle) {
            return Err(GraphicsError::UnknownImage(handle.0));
        }
        let mut control = format!("a=p,i={}", handle.0);
        placement.write_keys(&mut control);
        out.write_all(&command(&control, None))?;
        Ok(())
    }

    /// Delete an image and unregister its id
    ///
    /// Returns false if the handle was not registered.
    pub fn remove<W: Write>(&mut self, out: &mut W, handle: ImageHandle) -> Result<bool> {
        if self.registry.remove(&handle.0).is_none() {
            return Ok(false);
        }
        let control = format!("a=d,d=i,i={}", handle.0);
        out.write_all(&command(&control, None))?;
        Ok(true)
    }

    /// Delete every image on screen and clear the registry
    pub fn remove_all<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.registry.clear();
        out.write_all(&command("a=d,d=A", None))?;
        Ok(())
    }

    /// Upload, then place
    pub fn render_image<W: Write>(
        &mut self,
        out: &mut W,
        data: &[u8],
        format: UploadFormat,
        placement: &Placement,
    ) -> Result<ImageHandle> {
        let handle = self.upload(out, data, format)?;
        self.display(out, handle, placement)?;
        Ok(handle)
    }

    /// Upload and place in one command stream (`a=T`)
    pub fn transmit_and_display<W: Write>(
        &mut self,
        out: &mut W,
        data: &[u8],
        format: UploadFormat,
        placement: &Placement,
    ) -> Result<ImageHandle> {
        self.transmit(out, 'T', data, format, Some(placement))
    }

    /// Ask whether the terminal speaks the protocol; the reply is
    /// `ESC _G i=31;OK ESC \` on success
    pub fn query<W: Write>(out: &mut W) -> io::Result<()> {
        let control = format!("i={},s=1,v=1,a=q,t=d,f=24", KITTY_QUERY_ID);
        out.write_all(&command(&control, Some(b"AAAA")))
    }
}
