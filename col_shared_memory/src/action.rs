//! Latest-value action channel.
//!
//! The control process overwrites the 20-byte action record every tick.
//! There is no acknowledgment and no queue: the simulator picks up
//! whatever record is current when it looks, so a fast writer may
//! overwrite actions the simulator never saw.
//!
//! Axes are written first and the index last with release ordering, so a
//! reader that sees a new index also sees its axes.

use col::shm::records::{ActionAxes, ActionRecord};
use tracing::trace;

use crate::error::ShmResult;
use crate::segment::Segment;

/// Single-writer publisher of control actions.
#[derive(Debug, Clone, Default)]
pub struct ActionChannel {
    next_index: i32,
    last: Option<ActionRecord>,
}

impl ActionChannel {
    /// Channel whose first action has index 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel whose first action has the given index.
    pub fn starting_at(index: i32) -> Self {
        Self {
            next_index: index,
            last: None,
        }
    }

    /// Index the next published action will carry.
    pub fn next_index(&self) -> i32 {
        self.next_index
    }

    /// Last record published through this channel.
    pub fn last(&self) -> Option<ActionRecord> {
        self.last
    }

    /// Publish `axes` under the next index, replacing the previous action.
    pub fn publish(&mut self, segment: &mut Segment, axes: ActionAxes) -> ShmResult<ActionRecord> {
        let offset = segment.layout().action_offset();
        let record = ActionRecord {
            index: self.next_index,
            axes,
        };

        segment.write(offset + 4, &axes.encode())?;
        segment.store_u32_release(offset, record.index as u32)?;
        trace!("Published action {:?}", record);

        self.next_index = self.next_index.wrapping_add(1);
        self.last = Some(record);
        Ok(record)
    }

    /// Read the record currently in the segment.
    pub fn current(segment: &Segment) -> ShmResult<ActionRecord> {
        let offset = segment.layout().action_offset();
        let index = segment.load_u32_acquire(offset)? as i32;
        let mut record = ActionRecord::decode(&segment.read_array(offset)?);
        record.index = index;
        Ok(record)
    }
}
