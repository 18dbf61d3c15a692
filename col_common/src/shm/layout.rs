//! Segment layout descriptor.
//!
//! Both processes derive identical offsets from the same constants, so the
//! layout is a pure `const` computation with no I/O. Changing any constant
//! requires redeploying the simulator with the same values.
//!
//! ```text
//! 0x0000  global header          48 B   simulator
//! 0x0030  action record          20 B   control
//! 0x0044  hyperparameter record  84 B   control (payload) / both (state word)
//! 0x0098  diagnostic log        256 B   simulator (opaque)
//! 0x0198  remote-call slot        4 B   external  (opaque)
//! 0x019C  remote-call args     2048 B   external  (opaque)
//! 0x099C  camera blocks      4 × stride simulator
//! ```

use static_assertions::const_assert_eq;

/// Size of the global header written by the simulator.
pub const GLOBAL_HEADER_BYTES: usize = 48;
/// Size of the action record.
pub const ACTION_BYTES: usize = 20;
/// Size of the hyperparameter zone (state word included).
pub const HYPER_BYTES: usize = 84;
/// Size of the diagnostic log zone.
pub const LOG_BYTES: usize = 256;
/// Size of the remote-call slot.
pub const FUNC_BYTES: usize = 4;
/// Size of the remote-call argument zone.
pub const ARGS_BYTES: usize = 2048;
/// Size of the per-camera block header.
pub const CAMERA_HEADER_BYTES: usize = 16;
/// Maximum image width and height in pixels.
pub const MAX_RESOLUTION: usize = 2048;
/// Maximum bytes per pixel (and maximum channel count).
pub const BYTES_PER_PIXEL: usize = 4;
/// Number of camera slots in the segment.
pub const MAX_CAMERAS: usize = 4;

/// Byte layout of the shared segment.
///
/// Every method is `const` so offsets can be checked at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShmLayout {
    /// Global header size.
    pub global_header_bytes: usize,
    /// Action record size.
    pub action_bytes: usize,
    /// Hyperparameter zone size.
    pub hyper_bytes: usize,
    /// Diagnostic log size.
    pub log_bytes: usize,
    /// Remote-call slot size.
    pub func_bytes: usize,
    /// Remote-call argument zone size.
    pub args_bytes: usize,
    /// Camera block header size.
    pub camera_header_bytes: usize,
    /// Maximum image side in pixels.
    pub max_resolution: usize,
    /// Maximum bytes per pixel.
    pub bytes_per_pixel: usize,
    /// Number of camera slots.
    pub max_cameras: usize,
}

/// The layout shared with the simulator.
pub const LAYOUT: ShmLayout = ShmLayout::new();

impl ShmLayout {
    /// Layout built from the module constants.
    pub const fn new() -> Self {
        Self {
            global_header_bytes: GLOBAL_HEADER_BYTES,
            action_bytes: ACTION_BYTES,
            hyper_bytes: HYPER_BYTES,
            log_bytes: LOG_BYTES,
            func_bytes: FUNC_BYTES,
            args_bytes: ARGS_BYTES,
            camera_header_bytes: CAMERA_HEADER_BYTES,
            max_resolution: MAX_RESOLUTION,
            bytes_per_pixel: BYTES_PER_PIXEL,
            max_cameras: MAX_CAMERAS,
        }
    }

    /// Offset of the global header.
    pub const fn header_offset(&self) -> usize {
        0
    }

    /// Offset of the action record.
    pub const fn action_offset(&self) -> usize {
        self.global_header_bytes
    }

    /// Offset of the hyperparameter zone (its state word).
    pub const fn hyper_offset(&self) -> usize {
        self.action_offset() + self.action_bytes
    }

    /// Offset of the packed hyperparameter payload, right after the state word.
    pub const fn hyper_payload_offset(&self) -> usize {
        self.hyper_offset() + 4
    }

    /// Offset of the diagnostic log zone.
    pub const fn log_offset(&self) -> usize {
        self.hyper_offset() + self.hyper_bytes
    }

    /// Offset of the remote-call slot.
    pub const fn func_offset(&self) -> usize {
        self.log_offset() + self.log_bytes
    }

    /// Offset of the remote-call argument zone.
    pub const fn args_offset(&self) -> usize {
        self.func_offset() + self.func_bytes
    }

    /// Offset of the first camera block.
    pub const fn camera_offset(&self) -> usize {
        self.args_offset() + self.args_bytes
    }

    /// Pixel payload capacity of one camera block.
    pub const fn max_pixel_bytes(&self) -> usize {
        self.max_resolution * self.max_resolution * self.bytes_per_pixel
    }

    /// Fixed distance between consecutive camera blocks.
    pub const fn block_stride(&self) -> usize {
        self.camera_header_bytes + self.max_pixel_bytes()
    }

    /// Offset of camera block `index`. Does not check `index < max_cameras`.
    pub const fn camera_block_offset(&self, index: usize) -> usize {
        self.camera_offset() + index * self.block_stride()
    }

    /// Offset of the pixel payload of camera block `index`.
    pub const fn camera_pixels_offset(&self, index: usize) -> usize {
        self.camera_block_offset(index) + self.camera_header_bytes
    }

    /// Total segment size in bytes.
    pub const fn total_size(&self) -> usize {
        self.camera_offset() + self.block_stride() * self.max_cameras
    }
}

impl Default for ShmLayout {
    fn default() -> Self {
        Self::new()
    }
}

/// Total size of the shared segment.
pub const fn shm_size_bytes() -> usize {
    LAYOUT.total_size()
}

const_assert_eq!(LAYOUT.action_offset(), 0x30);
const_assert_eq!(LAYOUT.hyper_offset(), 0x44);
const_assert_eq!(LAYOUT.log_offset(), 0x98);
const_assert_eq!(LAYOUT.func_offset(), 0x198);
const_assert_eq!(LAYOUT.args_offset(), 0x19C);
const_assert_eq!(LAYOUT.camera_offset(), 0x99C);
const_assert_eq!(LAYOUT.hyper_offset() % 4, 0);
const_assert_eq!(LAYOUT.block_stride() % 4, 0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_offsets_are_stable() {
        assert_eq!(LAYOUT.header_offset(), 0);
        assert_eq!(LAYOUT.action_offset(), 48);
        assert_eq!(LAYOUT.hyper_offset(), 68);
        assert_eq!(LAYOUT.hyper_payload_offset(), 72);
        assert_eq!(LAYOUT.log_offset(), 152);
        assert_eq!(LAYOUT.func_offset(), 408);
        assert_eq!(LAYOUT.args_offset(), 412);
        assert_eq!(LAYOUT.camera_offset(), 2460);
    }

    #[test]
    fn block_stride_is_sized_for_max_resolution() {
        assert_eq!(LAYOUT.block_stride(), 16 + 2048 * 2048 * 4);
        assert_eq!(LAYOUT.block_stride(), 16_777_232);
    }

    #[test]
    fn camera_blocks_are_equally_spaced() {
        for i in 0..MAX_CAMERAS {
            assert_eq!(
                LAYOUT.camera_block_offset(i),
                LAYOUT.camera_offset() + i * LAYOUT.block_stride()
            );
            assert_eq!(
                LAYOUT.camera_pixels_offset(i),
                LAYOUT.camera_block_offset(i) + CAMERA_HEADER_BYTES
            );
        }
    }

    #[test]
    fn total_size_covers_every_block() {
        assert_eq!(shm_size_bytes(), 67_111_388);
        assert_eq!(
            LAYOUT.camera_block_offset(MAX_CAMERAS),
            shm_size_bytes(),
            "one-past-last block starts exactly at the end"
        );
    }

    #[test]
    fn layout_is_deterministic() {
        assert_eq!(ShmLayout::new(), ShmLayout::default());
        assert_eq!(ShmLayout::new().total_size(), LAYOUT.total_size());
    }
}
