//! Camera stream flags and label assignment.
//!
//! The simulator writes one block per active camera, in the fixed order
//! RGB, Depth, Normals, Semantic, skipping disabled streams. Which streams
//! are active is known only from the configuration, so labels are assigned
//! positionally: the first active label goes to block 0, and so on.

use std::fmt;

use bitflags::bitflags;
use heapless::Vec;

use super::layout::MAX_CAMERAS;
use super::records::HyperParams;

bitflags! {
    /// Set of enabled camera streams.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StreamFlags: u32 {
        /// Color image.
        const RGB = 1 << 0;
        /// Depth image.
        const DEPTH = 1 << 1;
        /// Surface normals image.
        const NORMALS = 1 << 2;
        /// Semantic segmentation image.
        const SEMANTIC = 1 << 3;
    }
}

/// Label of a decoded camera stream.
///
/// Ordering follows declaration order, with synthetic slots last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StreamLabel {
    /// Color image.
    Rgb,
    /// Depth image.
    Depth,
    /// Surface normals image.
    Normals,
    /// Semantic segmentation image.
    Semantic,
    /// Block with no configured label, keyed by its block index.
    Slot(usize),
}

/// Fixed label order shared with the simulator.
pub const LABEL_ORDER: [StreamLabel; MAX_CAMERAS] = [
    StreamLabel::Rgb,
    StreamLabel::Depth,
    StreamLabel::Normals,
    StreamLabel::Semantic,
];

const FLAG_ORDER: [StreamFlags; MAX_CAMERAS] = [
    StreamFlags::RGB,
    StreamFlags::DEPTH,
    StreamFlags::NORMALS,
    StreamFlags::SEMANTIC,
];

impl StreamLabel {
    /// Position in the fixed order, `None` for synthetic slots.
    pub fn slot_index(self) -> Option<usize> {
        LABEL_ORDER.iter().position(|l| *l == self)
    }

    /// Display name as frame consumers key it (`"RGB"`, `"cam2"`, ...).
    pub fn name(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StreamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rgb => f.write_str("RGB"),
            Self::Depth => f.write_str("Depth"),
            Self::Normals => f.write_str("Normals"),
            Self::Semantic => f.write_str("Semantic"),
            Self::Slot(i) => write!(f, "cam{i}"),
        }
    }
}

impl StreamFlags {
    /// Flags from the per-stream toggles of a configuration record.
    /// Any non-zero toggle counts as enabled.
    pub fn from_hyper(hp: &HyperParams) -> Self {
        Self::from_active([hp.rgb != 0, hp.depth != 0, hp.normals != 0, hp.semantic != 0])
    }

    /// Flags from a vector in label order.
    pub fn from_active(active: [bool; MAX_CAMERAS]) -> Self {
        FLAG_ORDER
            .iter()
            .zip(active)
            .filter(|(_, on)| *on)
            .fold(Self::empty(), |acc, (flag, _)| acc | *flag)
    }

    /// Raw active-flags vector in label order.
    pub fn active(self) -> [bool; MAX_CAMERAS] {
        FLAG_ORDER.map(|flag| self.contains(flag))
    }

    /// Enabled labels in the fixed declaration order.
    pub fn labels(self) -> Vec<StreamLabel, MAX_CAMERAS> {
        let mut out = Vec::new();
        for (label, flag) in LABEL_ORDER.iter().zip(FLAG_ORDER) {
            if self.contains(flag) {
                // Capacity equals LABEL_ORDER.len(); push cannot fail.
                let _ = out.push(*label);
            }
        }
        out
    }

    /// Label for camera block `index`: the `index`-th enabled label, or a
    /// synthetic slot label once the enabled labels are exhausted.
    pub fn label_for_block(self, index: usize) -> StreamLabel {
        self.labels()
            .get(index)
            .copied()
            .unwrap_or(StreamLabel::Slot(index))
    }
}
