//! On-disk and in-ring binary layout.
//!
//! Every persisted integer uses a fixed, explicit width and little-endian
//! byte order so the format survives across builds and platforms.
//!
//! Persistent backing file:
//!
//! ```text
//! ┌─────────────────┬─────────────────┬────────────────────────────────┐
//! │ read cursor     │ write cursor    │ data region                    │
//! │ (u64 LE, @0)    │ (u64 LE, @8)    │ (capacity bytes, @16)          │
//! └─────────────────┴─────────────────┴────────────────────────────────┘
//! ```
//!
//! Cursors are stored as absolute file offsets, so `begin` for a file-backed
//! region equals [`QUEUE_HEADER_BYTES`]. The volatile backend has no header
//! and its region begins at 0.
//!
//! Records inside the data region:
//!
//! ```text
//! ┌─────────────────┬──────────────────────┐
//! │ length          │ payload              │
//! │ (u64 LE, 8B)    │ (length bytes)       │
//! └─────────────────┴──────────────────────┘
//! ```
//!
//! Either field may be split across the wraparound boundary.

use crate::error::QueueError;
use sluice_store::Store;

const READ_CURSOR_SLOT: u64 = 0;
const WRITE_CURSOR_SLOT: u64 = 8;

/// Bytes of persisted cursor state ahead of the data region.
pub const QUEUE_HEADER_BYTES: u64 = 16;

/// Width of the record length prefix.
pub const RECORD_PREFIX_BYTES: usize = 8;

/// Encodes a record length prefix.
#[inline]
pub fn encode_prefix(len: usize) -> [u8; RECORD_PREFIX_BYTES] {
    (len as u64).to_le_bytes()
}

/// Decodes a record length prefix.
#[inline]
pub fn decode_prefix(raw: [u8; RECORD_PREFIX_BYTES]) -> u64 {
    u64::from_le_bytes(raw)
}

/// Recovers the persisted cursor pair from a store's header.
pub fn load_cursors<S: Store>(store: &S) -> Result<(u64, u64), QueueError> {
    let mut slot = [0u8; 8];
    store.read_at(READ_CURSOR_SLOT, &mut slot)?;
    let read = u64::from_le_bytes(slot);
    store.read_at(WRITE_CURSOR_SLOT, &mut slot)?;
    Ok((read, u64::from_le_bytes(slot)))
}

/// Commits the cursor pair into a store's header.
pub fn store_cursors<S: Store>(store: &S, read: u64, write: u64) -> Result<(), QueueError> {
    store.write_at(READ_CURSOR_SLOT, &read.to_le_bytes())?;
    store.write_at(WRITE_CURSOR_SLOT, &write.to_le_bytes())?;
    Ok(())
}
