//! Fixed-layout offset bookkeeping file.
//!
//! A small helper for a drain scheme that journals records into a flat file
//! and tracks three positions at fixed header slots:
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────────┬────────────────────────┐
//! │ file_read    │ user_read    │ user_write   │ record bytes ...       │
//! │ (u64 LE, @0) │ (u64 LE, @8) │ (u64 LE, @16)│ (absolute offsets)     │
//! └──────────────┴──────────────┴──────────────┴────────────────────────┘
//! ```
//!
//! Records carry `u16` little-endian length values. This scheme is
//! independent of the ring engine; callers drive it directly.

use crate::file::FileStore;
use crate::store::Store;
use std::io;
use std::path::Path;

const FILE_READ_SLOT: u64 = 0;
const USER_READ_SLOT: u64 = 8;
const USER_WRITE_SLOT: u64 = 16;

/// Bytes reserved for the three offset slots.
pub const OFFSET_HEADER_BYTES: u64 = 24;

/// The bookkeeping file, opened read-write for its whole lifetime.
pub struct OffsetTable {
    store: FileStore,
}

impl OffsetTable {
    /// Opens the table at `path`, creating a `size`-byte file when absent.
    ///
    /// A fresh table starts with all three offsets pointing at the first
    /// byte after the header.
    pub fn open<P: AsRef<Path>>(path: P, size: u64) -> io::Result<Self> {
        let path = path.as_ref();
        match FileStore::open_rw(path) {
            Ok(store) => Ok(Self { store }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let table = Self {
                    store: FileStore::create_rw(path, size)?,
                };
                table.commit_offsets(
                    OFFSET_HEADER_BYTES,
                    OFFSET_HEADER_BYTES,
                    OFFSET_HEADER_BYTES,
                )?;
                Ok(table)
            }
            Err(e) => Err(e),
        }
    }

    /// Persists the three bookkeeping offsets in slot order.
    pub fn commit_offsets(&self, file_read: u64, user_read: u64, user_write: u64) -> io::Result<()> {
        self.store.write_at(FILE_READ_SLOT, &file_read.to_le_bytes())?;
        self.store.write_at(USER_READ_SLOT, &user_read.to_le_bytes())?;
        self.store.write_at(USER_WRITE_SLOT, &user_write.to_le_bytes())
    }

    /// Loads the three bookkeeping offsets in slot order.
    pub fn offsets(&self) -> io::Result<(u64, u64, u64)> {
        let mut slot = [0u8; 8];
        self.store.read_at(FILE_READ_SLOT, &mut slot)?;
        let file_read = u64::from_le_bytes(slot);
        self.store.read_at(USER_READ_SLOT, &mut slot)?;
        let user_read = u64::from_le_bytes(slot);
        self.store.read_at(USER_WRITE_SLOT, &mut slot)?;
        Ok((file_read, user_read, u64::from_le_bytes(slot)))
    }

    /// Copies the whole file, header included, into `buf`.
    ///
    /// `buf` must be exactly the table size.
    pub fn snapshot_into(&self, buf: &mut [u8]) -> io::Result<()> {
        if buf.len() as u64 != self.store.size() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "snapshot buffer must match the table size",
            ));
        }
        self.store.read_at(0, buf)
    }

    /// Writes a record's length value at `offset` as `u16` little-endian.
    pub fn write_record_len(&self, offset: u64, len: u16) -> io::Result<()> {
        self.store.write_at(offset, &len.to_le_bytes())
    }

    /// Writes record bytes at `offset`. Record lengths are bounded by `u16`.
    pub fn write_record(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        let len = u16::try_from(data.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "record exceeds u16 length")
        })?;
        match offset.checked_add(u64::from(len)) {
            Some(end) if end <= self.store.size() => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "record exceeds the table size",
                ));
            }
        }
        self.store.write_at(offset, data)
    }

    /// Total file size in bytes.
    pub fn size(&self) -> u64 {
        self.store.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_path(label: &str) -> String {
        format!("/tmp/sluice_offsets_{}_{}", label, std::process::id())
    }

    #[test]
    fn fresh_table_points_all_offsets_past_the_header() {
        let path = test_path("fresh");
        let _ = std::fs::remove_file(&path);

        let table = OffsetTable::open(&path, 256).unwrap();
        assert_eq!(
            table.offsets().unwrap(),
            (OFFSET_HEADER_BYTES, OFFSET_HEADER_BYTES, OFFSET_HEADER_BYTES)
        );

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn offsets_survive_reopen() {
        let path = test_path("reopen");
        let _ = std::fs::remove_file(&path);

        {
            let table = OffsetTable::open(&path, 256).unwrap();
            table.commit_offsets(100, 120, 140).unwrap();
        }

        let table = OffsetTable::open(&path, 256).unwrap();
        assert_eq!(table.offsets().unwrap(), (100, 120, 140));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn records_and_lengths_land_where_addressed() {
        let path = test_path("records");
        let _ = std::fs::remove_file(&path);

        let table = OffsetTable::open(&path, 64).unwrap();
        let at = OFFSET_HEADER_BYTES;
        table.write_record_len(at, 5).unwrap();
        table.write_record(at + 2, b"hello").unwrap();

        let mut snapshot = vec![0u8; 64];
        table.snapshot_into(&mut snapshot).unwrap();
        let at = at as usize;
        assert_eq!(&snapshot[at..at + 2], &5u16.to_le_bytes());
        assert_eq!(&snapshot[at + 2..at + 7], b"hello");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn oversized_records_and_snapshots_are_rejected() {
        let path = test_path("bounds");
        let _ = std::fs::remove_file(&path);

        let table = OffsetTable::open(&path, 32).unwrap();
        let err = table.write_record(30, b"spill").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let mut short = vec![0u8; 16];
        let err = table.snapshot_into(&mut short).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let _ = std::fs::remove_file(&path);
    }
}
