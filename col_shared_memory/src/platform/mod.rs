//! Platform-specific segment mapping.
//!
//! On Unix the simulator creates the segment as a file under `/dev/shm`
//! and this process attaches to it. Elsewhere the region is allocated
//! directly by this process.

#[cfg(unix)]
mod linux;
#[cfg(unix)]
pub use linux::*;

use memmap2::MmapMut;

use crate::error::ShmResult;

/// Allocate a private zero-filled region of `size` bytes.
pub fn anonymous_mmap(size: usize) -> ShmResult<MmapMut> {
    Ok(MmapMut::map_anon(size)?)
}
