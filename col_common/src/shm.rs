//! Shared memory wire format.
//!
//! This module contains:
//! - `layout`: Zone offsets, block stride and total segment size.
//! - `records`: Little-endian encode/decode of every fixed-width record.
//! - `streams`: Camera stream flags and label assignment.

pub mod layout;
pub mod records;
pub mod streams;
