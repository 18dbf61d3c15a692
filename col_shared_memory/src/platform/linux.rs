//! Linux-specific shared memory operations

use crate::error::{ShmError, ShmResult};
use col::consts::SHM_DIR;
use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

/// Filesystem path of the named segment.
pub fn segment_path(name: &str) -> PathBuf {
    Path::new(SHM_DIR).join(name)
}

/// Whether the segment file exists and is already sized for the layout.
///
/// The simulator creates the file before sizing it, so an undersized file
/// is treated as not there yet.
pub fn segment_ready(path: &Path, size: usize) -> bool {
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() >= size as u64)
        .unwrap_or(false)
}

/// Attach to an existing segment file, mapping exactly `size` bytes.
pub fn attach_segment_mmap(path: &Path, size: usize) -> ShmResult<MmapMut> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;

    let actual = file.metadata()?.len() as usize;
    if actual < size {
        return Err(ShmError::InvalidSize {
            size: actual,
            expected: size,
        });
    }

    let mmap = unsafe { MmapOptions::new().len(size).map_mut(&file)? };
    Ok(mmap)
}

/// Create (or truncate to size) a segment file and map it.
///
/// This is the simulator-side operation; the control process only uses it
/// to stand in for the simulator in tools and tests.
pub fn create_segment_mmap(path: &Path, size: usize) -> ShmResult<MmapMut> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .mode(0o600) // Owner read/write only
        .open(path)?;

    file.set_len(size as u64)?;

    let mmap = unsafe { MmapOptions::new().len(size).map_mut(&file)? };
    Ok(mmap)
}
