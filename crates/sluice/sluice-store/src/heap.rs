use crate::store::Store;
use std::cell::UnsafeCell;
use std::io;
use std::ptr;

/// Volatile backing store: a zeroed heap block.
///
/// Offsets address the block directly (`0..capacity`). Transfers are plain
/// memory copies and never block.
///
/// # Concurrency contract
///
/// `read_at` and `write_at` take `&self` so that one reader and one writer
/// can move bytes at the same time. Concurrent calls must touch disjoint
/// offset ranges. The ring engine upholds this: writes are admitted only
/// into free space, reads stay inside filled space, and the two never
/// overlap while a transfer is in flight.
pub struct HeapStore {
    block: Box<[UnsafeCell<u8>]>,
}

// SAFETY: the block is plain bytes behind `UnsafeCell`; cross-thread access
// follows the disjoint-range contract above, so no two threads touch the
// same byte concurrently.
unsafe impl Send for HeapStore {}
unsafe impl Sync for HeapStore {}

impl HeapStore {
    /// Allocates a zeroed block of `capacity` bytes.
    ///
    /// Reports `ErrorKind::OutOfMemory` instead of aborting when the
    /// allocator cannot satisfy the request.
    pub fn allocate(capacity: usize) -> io::Result<Self> {
        let mut block: Vec<UnsafeCell<u8>> = Vec::new();
        block.try_reserve_exact(capacity).map_err(|_| {
            io::Error::new(io::ErrorKind::OutOfMemory, "heap store allocation failed")
        })?;
        block.resize_with(capacity, || UnsafeCell::new(0));
        Ok(Self {
            block: block.into_boxed_slice(),
        })
    }

    #[inline]
    fn base(&self) -> *mut u8 {
        UnsafeCell::raw_get(self.block.as_ptr())
    }

    fn checked_offset(&self, offset: u64, len: usize) -> io::Result<usize> {
        let offset = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset out of range"))?;
        match offset.checked_add(len) {
            Some(end) if end <= self.block.len() => Ok(offset),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "transfer exceeds heap store bounds",
            )),
        }
    }
}

impl Store for HeapStore {
    fn size(&self) -> u64 {
        self.block.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let offset = self.checked_offset(offset, buf.len())?;
        // SAFETY: the range is in bounds, and concurrent writers stay out of
        // it per the disjoint-range contract.
        unsafe { ptr::copy_nonoverlapping(self.base().add(offset), buf.as_mut_ptr(), buf.len()) };
        Ok(())
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let offset = self.checked_offset(offset, buf.len())?;
        // SAFETY: the range is in bounds, and concurrent readers stay out of
        // it per the disjoint-range contract.
        unsafe { ptr::copy_nonoverlapping(buf.as_ptr(), self.base().add(offset), buf.len()) };
        Ok(())
    }
}
