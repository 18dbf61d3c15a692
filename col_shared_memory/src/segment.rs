//! Shared memory segment accessor.
//!
//! [`Segment`] owns the mapping for the whole session and is the only way
//! to touch segment bytes. Every access is bounds-checked against the
//! mapped length; a failed check never writes anything.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use col::consts::ACQUIRE_POLL_INTERVAL;
use col::shm::layout::{LAYOUT, ShmLayout};
use memmap2::MmapMut;
use tracing::{debug, info};

use crate::error::{ShmError, ShmResult};
use crate::platform;
use crate::poll::Deadline;

/// Mapped shared-memory region sized by [`ShmLayout::total_size`].
///
/// The mapping is released when the segment is dropped.
pub struct Segment {
    name: String,
    layout: ShmLayout,
    mmap: MmapMut,
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("name", &self.name)
            .field("size", &self.mmap.len())
            .finish()
    }
}

impl Segment {
    /// Acquire the named segment created by the simulator.
    ///
    /// Polls every 100 ms for `/dev/shm/<name>` until it exists with the
    /// layout size, giving up with [`ShmError::NotFound`] after `timeout`.
    /// `None` waits forever.
    #[cfg(unix)]
    pub fn acquire(name: &str, timeout: Option<Duration>) -> ShmResult<Self> {
        let path = platform::segment_path(name);
        let mut segment = Self::acquire_path(&path, timeout)?;
        segment.name = name.to_string();
        Ok(segment)
    }

    /// Acquire the named segment.
    ///
    /// Named mappings shared with the simulator exist only under
    /// `/dev/shm`; elsewhere this fails with [`ShmError::Unsupported`]
    /// instead of mapping a region the simulator cannot see.
    #[cfg(not(unix))]
    pub fn acquire(name: &str, _timeout: Option<Duration>) -> ShmResult<Self> {
        Err(ShmError::Unsupported {
            operation: "named segment acquisition",
            name: name.to_string(),
        })
    }

    /// Acquire a segment backed by an arbitrary file path.
    #[cfg(unix)]
    pub fn acquire_path(path: &Path, timeout: Option<Duration>) -> ShmResult<Self> {
        let size = LAYOUT.total_size();
        let deadline = Deadline::start(timeout);

        debug!("Waiting for segment {} ({} bytes)", path.display(), size);
        while !platform::segment_ready(path, size) {
            if deadline.expired() {
                return Err(ShmError::NotFound {
                    name: path.display().to_string(),
                });
            }
            deadline.sleep(ACQUIRE_POLL_INTERVAL);
        }

        let mmap = platform::attach_segment_mmap(path, size)?;
        info!(
            "Attached segment {} ({} bytes) after {:?}",
            path.display(),
            size,
            deadline.elapsed()
        );
        Self::from_mmap(path.display().to_string(), mmap)
    }

    /// Create the backing file and map it, as the simulator does.
    ///
    /// Used by tools and tests that stand in for the simulator.
    #[cfg(unix)]
    pub fn create_path(path: &Path) -> ShmResult<Self> {
        let mmap = platform::create_segment_mmap(path, LAYOUT.total_size())?;
        Self::from_mmap(path.display().to_string(), mmap)
    }

    /// Allocate a private zero-filled segment.
    pub fn anonymous(name: &str) -> ShmResult<Self> {
        let mmap = platform::anonymous_mmap(LAYOUT.total_size())?;
        Self::from_mmap(name.to_string(), mmap)
    }

    fn from_mmap(name: String, mmap: MmapMut) -> ShmResult<Self> {
        let expected = LAYOUT.total_size();
        if mmap.len() < expected {
            return Err(ShmError::InvalidSize {
                size: mmap.len(),
                expected,
            });
        }
        Ok(Self {
            name,
            layout: LAYOUT,
            mmap,
        })
    }

    /// Segment name (or backing path).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Layout the segment was mapped with.
    pub fn layout(&self) -> &ShmLayout {
        &self.layout
    }

    /// Mapped size in bytes.
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Always false for a mapped segment; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    fn check_bounds(&self, offset: usize, len: usize) -> ShmResult<usize> {
        let size = self.mmap.len();
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(end),
            _ => Err(ShmError::OutOfBounds { offset, len, size }),
        }
    }

    /// Borrow `len` bytes at `offset`. The view cannot outlive the segment.
    pub fn read(&self, offset: usize, len: usize) -> ShmResult<&[u8]> {
        let end = self.check_bounds(offset, len)?;
        Ok(&self.mmap[offset..end])
    }

    /// Copy `N` bytes at `offset` into an array.
    pub fn read_array<const N: usize>(&self, offset: usize) -> ShmResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read(offset, N)?);
        Ok(out)
    }

    /// Write `bytes` at `offset`. Nothing is written if the range is out of bounds.
    pub fn write(&mut self, offset: usize, bytes: &[u8]) -> ShmResult<()> {
        let end = self.check_bounds(offset, bytes.len())?;
        self.mmap[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Read a little-endian `u32`.
    pub fn read_u32(&self, offset: usize) -> ShmResult<u32> {
        Ok(u32::from_le_bytes(self.read_array(offset)?))
    }

    /// Read a little-endian `i32`.
    pub fn read_i32(&self, offset: usize) -> ShmResult<i32> {
        Ok(i32::from_le_bytes(self.read_array(offset)?))
    }

    /// Read a little-endian `f32`.
    pub fn read_f32(&self, offset: usize) -> ShmResult<f32> {
        Ok(f32::from_le_bytes(self.read_array(offset)?))
    }

    /// Write a little-endian `u32`.
    pub fn write_u32(&mut self, offset: usize, value: u32) -> ShmResult<()> {
        self.write(offset, &value.to_le_bytes())
    }

    /// Write a little-endian `i32`.
    pub fn write_i32(&mut self, offset: usize, value: i32) -> ShmResult<()> {
        self.write(offset, &value.to_le_bytes())
    }

    /// Write a little-endian `f32`.
    pub fn write_f32(&mut self, offset: usize, value: f32) -> ShmResult<()> {
        self.write(offset, &value.to_le_bytes())
    }

    fn check_word(&self, offset: usize) -> ShmResult<()> {
        self.check_bounds(offset, 4)?;
        let address = self.mmap.as_ptr() as usize + offset;
        if address % std::mem::align_of::<AtomicU32>() != 0 {
            return Err(ShmError::AlignmentError {
                offset,
                alignment: std::mem::align_of::<AtomicU32>(),
            });
        }
        Ok(())
    }

    /// Load a little-endian flag word with acquire ordering.
    ///
    /// Everything the counterpart wrote before releasing this word is
    /// visible after the load.
    pub fn load_u32_acquire(&self, offset: usize) -> ShmResult<u32> {
        self.check_word(offset)?;
        // SAFETY: in bounds and 4-byte aligned (checked above); the mapping
        // lives as long as `&self`.
        let word = unsafe { &*(self.mmap.as_ptr().add(offset) as *const AtomicU32) };
        Ok(u32::from_le(word.load(Ordering::Acquire)))
    }

    /// Store a little-endian flag word with release ordering.
    ///
    /// All earlier writes to the segment are visible to a reader that
    /// observes the new value.
    pub fn store_u32_release(&mut self, offset: usize, value: u32) -> ShmResult<()> {
        self.check_word(offset)?;
        // SAFETY: in bounds and 4-byte aligned (checked above); `&mut self`
        // serializes this process's writers.
        let word = unsafe { &*(self.mmap.as_mut_ptr().add(offset) as *const AtomicU32) };
        word.store(value.to_le(), Ordering::Release);
        Ok(())
    }

    /// Compare-and-swap a little-endian flag word.
    ///
    /// Returns `Ok(previous)` when the swap happened and `Err(actual)` when
    /// the word no longer held `current`.
    pub fn compare_exchange_u32(
        &mut self,
        offset: usize,
        current: u32,
        new: u32,
    ) -> ShmResult<Result<u32, u32>> {
        self.check_word(offset)?;
        // SAFETY: in bounds and 4-byte aligned (checked above).
        let word = unsafe { &*(self.mmap.as_mut_ptr().add(offset) as *const AtomicU32) };
        Ok(word
            .compare_exchange(current.to_le(), new.to_le(), Ordering::AcqRel, Ordering::Acquire)
            .map(u32::from_le)
            .map_err(u32::from_le))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_segment_has_layout_size() {
        let seg = Segment::anonymous("test").unwrap();
        assert_eq!(seg.len(), LAYOUT.total_size());
        assert!(!seg.is_empty());
        assert_eq!(seg.read_u32(0).unwrap(), 0);
    }

    #[test]
    fn typed_fields_are_little_endian() {
        let mut seg = Segment::anonymous("test").unwrap();
        seg.write_u32(100, 0x0403_0201).unwrap();
        assert_eq!(seg.read(100, 4).unwrap(), &[1, 2, 3, 4]);

        seg.write_i32(104, -2).unwrap();
        assert_eq!(seg.read_i32(104).unwrap(), -2);

        seg.write_f32(108, 0.5).unwrap();
        assert_eq!(seg.read_f32(108).unwrap(), 0.5);
    }

    #[test]
    fn out_of_bounds_is_rejected_without_partial_write() {
        let mut seg = Segment::anonymous("test").unwrap();
        let size = seg.len();

        let tail = size - 2;
        let err = seg.write(tail, &[0xAA; 4]).unwrap_err();
        assert!(matches!(err, ShmError::OutOfBounds { offset, len: 4, .. } if offset == tail));
        assert_eq!(seg.read(tail, 2).unwrap(), &[0, 0]);

        assert!(seg.read(size, 1).is_err());
        assert!(seg.read(size, 0).is_ok());
        assert!(matches!(
            seg.read(usize::MAX, 2),
            Err(ShmError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn flag_words_round_trip() {
        let mut seg = Segment::anonymous("test").unwrap();
        let off = LAYOUT.hyper_offset();
        seg.store_u32_release(off, 1).unwrap();
        assert_eq!(seg.load_u32_acquire(off).unwrap(), 1);
        assert_eq!(seg.read_u32(off).unwrap(), 1);

        assert_eq!(seg.compare_exchange_u32(off, 1, 2).unwrap(), Ok(1));
        assert_eq!(seg.compare_exchange_u32(off, 1, 0).unwrap(), Err(2));
    }

    #[cfg(not(unix))]
    #[test]
    fn named_acquire_is_unsupported_without_dev_shm() {
        assert!(matches!(
            Segment::acquire("paris3d_ipc", Some(Duration::ZERO)),
            Err(ShmError::Unsupported { .. })
        ));
    }

    #[test]
    fn misaligned_flag_word_is_rejected() {
        let seg = Segment::anonymous("test").unwrap();
        assert!(matches!(
            seg.load_u32_acquire(LAYOUT.hyper_offset() + 1),
            Err(ShmError::AlignmentError { alignment: 4, .. })
        ));
    }
}
