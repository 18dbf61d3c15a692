//! Multi-camera frame decoder.
//!
//! The simulator writes `camera_count` blocks at a fixed stride from the
//! camera zone base. Each block is a 16-byte header followed by a payload
//! sized for the largest supported image; only the first
//! `width × height × channels` bytes are meaningful.
//!
//! Blocks carry no label. The i-th block belongs to the i-th enabled
//! stream in the order RGB, Depth, Normals, Semantic; blocks beyond the
//! enabled streams get a synthetic `cam{i}` label.

use std::collections::BTreeMap;

use col::shm::layout::{GLOBAL_HEADER_BYTES, MAX_CAMERAS, ShmLayout};
use col::shm::records::{CameraBlockHeader, GlobalHeader, HyperParams};
use col::shm::streams::{StreamFlags, StreamLabel};
use tracing::debug;

use crate::error::{ShmError, ShmResult};
use crate::segment::Segment;

/// Borrowed view of one camera image.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Assigned stream label.
    pub label: StreamLabel,
    /// Camera block index.
    pub block: usize,
    /// Block header as written by the simulator.
    pub header: CameraBlockHeader,
    /// Segment offset of the first pixel byte.
    pub offset: usize,
    /// Row-major `height × width × channels` pixel bytes.
    pub pixels: &'a [u8],
}

impl Frame<'_> {
    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.header.width as usize
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.header.height as usize
    }

    /// Bytes per pixel.
    pub fn channels(&self) -> usize {
        self.header.channels as usize
    }

    /// `(height, width, channels)`, the shape consumers reshape into.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height(), self.width(), self.channels())
    }

    /// Whether the block holds no pixels yet.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Pixel bytes of row `y`, or `None` past the last row.
    pub fn row(&self, y: usize) -> Option<&[u8]> {
        let stride = self.width().checked_mul(self.channels())?;
        let start = y.checked_mul(stride)?;
        self.pixels.get(start..start.checked_add(stride)?)
    }
}

/// Result of one decode call.
#[derive(Debug, Clone)]
pub struct FrameSet<'a> {
    /// Global header read at the start of the decode.
    pub header: GlobalHeader,
    /// Frames keyed by label.
    pub frames: BTreeMap<StreamLabel, Frame<'a>>,
    /// Active-flags vector (RGB, Depth, Normals, Semantic) used for labelling.
    pub active: [bool; MAX_CAMERAS],
}

impl<'a> FrameSet<'a> {
    /// Frame for `label`.
    pub fn get(&self, label: StreamLabel) -> Option<&Frame<'a>> {
        self.frames.get(&label)
    }

    /// Number of decoded frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no camera block was reported.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames in block order.
    pub fn in_block_order(&self) -> Vec<&Frame<'a>> {
        let mut frames: Vec<_> = self.frames.values().collect();
        frames.sort_by_key(|f| f.block);
        frames
    }
}

/// Decoder bound to the session's enabled streams.
#[derive(Debug, Clone, Copy)]
pub struct FrameDecoder {
    layout: ShmLayout,
    streams: StreamFlags,
    verify_identity: bool,
}

impl FrameDecoder {
    /// Decoder for the given enabled streams.
    pub fn new(layout: ShmLayout, streams: StreamFlags) -> Self {
        Self {
            layout,
            streams,
            verify_identity: false,
        }
    }

    /// Decoder for the streams enabled in a configuration record.
    pub fn from_hyper(layout: ShmLayout, params: &HyperParams) -> Self {
        Self::new(layout, StreamFlags::from_hyper(params))
    }

    /// Reject blocks whose camera id differs from the slot index of their
    /// label (RGB = 0, Depth = 1, Normals = 2, Semantic = 3). Off by default.
    pub fn with_identity_check(mut self, enabled: bool) -> Self {
        self.verify_identity = enabled;
        self
    }

    /// Enabled streams.
    pub fn streams(&self) -> StreamFlags {
        self.streams
    }

    /// Read the global header.
    pub fn read_header(&self, segment: &Segment) -> ShmResult<GlobalHeader> {
        let bytes: [u8; GLOBAL_HEADER_BYTES] = segment.read_array(self.layout.header_offset())?;
        Ok(GlobalHeader::decode(&bytes))
    }

    /// Number of camera blocks the segment has room for.
    fn block_capacity(&self, segment: &Segment) -> usize {
        segment.len().saturating_sub(self.layout.camera_offset()) / self.layout.block_stride()
    }

    fn validate_block(&self, block: usize, header: &CameraBlockHeader) -> ShmResult<()> {
        let max = self.layout.max_resolution as u64;
        let invalid = |reason: String| ShmError::InvalidFrame { block, reason };

        if header.width as u64 > max || header.height as u64 > max {
            return Err(invalid(format!(
                "resolution {}x{} exceeds maximum {max}x{max}",
                header.width, header.height
            )));
        }
        if header.channels as usize > self.layout.bytes_per_pixel {
            return Err(invalid(format!(
                "{} channels exceeds maximum {}",
                header.channels, self.layout.bytes_per_pixel
            )));
        }
        Ok(())
    }

    /// Decode every active camera block.
    ///
    /// # Errors
    /// - [`ShmError::InvalidFrame`] if the header reports more blocks than
    ///   the segment holds, or a block exceeds the maximum resolution.
    pub fn decode<'a>(&self, segment: &'a Segment) -> ShmResult<FrameSet<'a>> {
        let header = self.read_header(segment)?;
        let count = header.camera_count as usize;

        let capacity = self.block_capacity(segment);
        if count > capacity {
            return Err(ShmError::InvalidFrame {
                block: capacity,
                reason: format!("camera count {count} exceeds segment capacity {capacity}"),
            });
        }

        let labels = self.streams.labels();
        let mut frames = BTreeMap::new();

        for block in 0..count {
            let base = self.layout.camera_block_offset(block);
            let block_header = CameraBlockHeader::decode(&segment.read_array(base)?);
            self.validate_block(block, &block_header)?;

            let label = labels
                .get(block)
                .copied()
                .unwrap_or(StreamLabel::Slot(block));

            if self.verify_identity
                && let Some(slot) = label.slot_index()
                && block_header.camera_id as usize != slot
            {
                return Err(ShmError::InvalidFrame {
                    block,
                    reason: format!(
                        "camera id {} does not match {label} (slot {slot})",
                        block_header.camera_id
                    ),
                });
            }

            let offset = base + self.layout.camera_header_bytes;
            let pixels = segment.read(offset, block_header.pixel_bytes() as usize)?;
            debug!(
                "{label}: {}x{} chan={} off={offset:#X}",
                block_header.width, block_header.height, block_header.channels
            );

            frames.insert(
                label,
                Frame {
                    label,
                    block,
                    header: block_header,
                    offset,
                    pixels,
                },
            );
        }

        Ok(FrameSet {
            header,
            frames,
            active: self.streams.active(),
        })
    }
}
