//! The queue engine: admission, record framing, and the lock discipline.
//!
//! # Locking
//!
//! Three independent locks coordinate concurrent access:
//!
//! - the **position lock** guards the `(read, write)` cursor pair and is
//!   held only to snapshot both cursors or to commit one of them, never
//!   across a data transfer;
//! - the **writer gate** serializes writers from admission check through
//!   cursor commit;
//! - the **reader gate** serializes readers the same way.
//!
//! One reader and one writer can therefore move bytes concurrently (their
//! critical sections only meet at the short position-lock windows), while
//! multiple readers or multiple writers queue up behind their gate instead
//! of failing.
//!
//! No operation waits for space or data: a write that does not fit fails
//! immediately and a read from an empty queue returns 0 bytes. Poll-and-
//! backoff is the caller's responsibility.

use crate::error::QueueError;
use crate::layout::{self, QUEUE_HEADER_BYTES, RECORD_PREFIX_BYTES};
use crate::ring::Region;
use crate::transfer::{read_split, write_split};
use sluice_store::{FileStore, HeapStore, Store};
use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace, warn};

#[derive(Debug, Copy, Clone)]
struct Cursors {
    read: u64,
    write: u64,
}

/// A bounded FIFO queue of length-framed byte records over any [`Store`].
///
/// Each queue is an independent instance owning its storage, cursors, and
/// locks; open as many as needed and tear them down individually.
#[derive(Debug)]
pub struct ByteQueue<S: Store> {
    store: S,
    region: Region,
    /// Whether close/drop must commit cursors into the store's header.
    persist: bool,
    closed: bool,
    positions: Mutex<Cursors>,
    write_gate: Mutex<()>,
    read_gate: Mutex<()>,
}

/// Volatile queue: heap-block storage, nothing survives drop.
pub type MemQueue = ByteQueue<HeapStore>;

/// Persistent queue: file-backed storage, cursors survive restart.
pub type FileQueue = ByteQueue<FileStore>;

// Poisoning is absorbed: a panicking peer leaves cursors uncommitted, never
// torn, so the data it was moving is simply not published.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: Store> ByteQueue<S> {
    fn with_store(store: S, region: Region, cursors: (u64, u64), persist: bool) -> Self {
        Self {
            store,
            region,
            persist,
            closed: false,
            positions: Mutex::new(Cursors {
                read: cursors.0,
                write: cursors.1,
            }),
            write_gate: Mutex::new(()),
            read_gate: Mutex::new(()),
        }
    }

    /// Queue capacity in bytes.
    pub fn capacity(&self) -> u64 {
        self.region.capacity()
    }

    fn snapshot(&self) -> Cursors {
        *lock(&self.positions)
    }

    /// Appends one record, returning the number of payload bytes written.
    ///
    /// Admission requires the 8-byte length prefix plus the payload to fit
    /// in the free space with at least one byte to spare; otherwise
    /// [`QueueError::OutOfSpace`] is returned and nothing is mutated.
    pub fn write(&self, data: &[u8]) -> Result<usize, QueueError> {
        if data.is_empty() {
            return Err(QueueError::InvalidArgument("record must not be empty"));
        }

        let _writer = lock(&self.write_gate);

        let Cursors { read, write } = self.snapshot();
        trace!(
            read = read - self.region.begin(),
            write = write - self.region.begin(),
            "positions before write"
        );

        let available = self.region.empty_space(read, write);
        let needed = (RECORD_PREFIX_BYTES + data.len()) as u64;
        // Strict: a write that exactly filled the ring would make the
        // cursors equal again, and equality must keep meaning empty.
        if available <= needed {
            return Err(QueueError::OutOfSpace {
                requested: data.len(),
                available,
            });
        }

        let pos = write_split(
            &self.store,
            self.region,
            write,
            &layout::encode_prefix(data.len()),
        )?;
        let pos = write_split(&self.store, self.region, pos, data)?;

        lock(&self.positions).write = pos;
        Ok(data.len())
    }

    /// Removes the record at the head of the queue into `buf`, returning
    /// the number of payload bytes read.
    ///
    /// Returns `Ok(0)` when the queue is empty, which is not an error.
    /// When `buf` is smaller than the head record, fails with
    /// [`QueueError::BufferTooSmall`] and leaves the record queued; it
    /// stays at the head until a caller supplies a large-enough buffer.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, QueueError> {
        if buf.is_empty() {
            return Err(QueueError::InvalidArgument(
                "destination buffer must not be empty",
            ));
        }

        let _reader = lock(&self.read_gate);

        let Cursors { read, write } = self.snapshot();
        trace!(
            read = read - self.region.begin(),
            write = write - self.region.begin(),
            "positions before read"
        );

        if !self.region.has_data(read, write) {
            return Ok(0);
        }

        let mut prefix = [0u8; RECORD_PREFIX_BYTES];
        let pos = read_split(&self.store, self.region, read, &mut prefix)?;
        let length = layout::decode_prefix(prefix);
        if length > buf.len() as u64 {
            return Err(QueueError::BufferTooSmall {
                record: length,
                buffer: buf.len(),
            });
        }

        let pos = read_split(&self.store, self.region, pos, &mut buf[..length as usize])?;

        lock(&self.positions).read = pos;
        Ok(length as usize)
    }

    fn commit_header(&self) -> Result<(), QueueError> {
        let Cursors { read, write } = self.snapshot();
        layout::store_cursors(&self.store, read, write)
    }

    /// Shuts the queue down.
    ///
    /// The persistent backend first commits the current cursors into the
    /// backing file's header; a failure there is surfaced, since ignoring
    /// it would lose cursor state on the next open. Dropping a queue
    /// without `close` commits best-effort and only logs a failure.
    pub fn close(mut self) -> Result<(), QueueError> {
        if self.persist {
            self.commit_header()?;
        }
        self.closed = true;
        debug!("queue closed");
        Ok(())
    }
}

impl<S: Store> Drop for ByteQueue<S> {
    fn drop(&mut self) {
        if self.persist && !self.closed {
            if let Err(e) = self.commit_header() {
                warn!(error = %e, "failed to persist cursors on drop");
            }
        }
    }
}

impl ByteQueue<HeapStore> {
    /// Opens a volatile queue over a zeroed heap block of `capacity` bytes.
    ///
    /// Both cursors start at the region's begin. Fails with
    /// [`QueueError::OutOfMemory`] when the block cannot be allocated.
    pub fn open(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::InvalidArgument("capacity must not be zero"));
        }
        let store = HeapStore::allocate(capacity).map_err(|e| match e.kind() {
            io::ErrorKind::OutOfMemory => QueueError::OutOfMemory(capacity),
            _ => QueueError::Io(e),
        })?;
        let region = Region::new(0, capacity as u64);
        debug!(capacity, "memory queue opened");
        Ok(Self::with_store(
            store,
            region,
            (region.begin(), region.begin()),
            false,
        ))
    }
}

impl ByteQueue<FileStore> {
    /// Opens a persistent queue at `path` with `capacity` data bytes.
    ///
    /// A missing file is created, preallocated to header + capacity, and
    /// gets both persisted cursors initialized to the region's begin. An
    /// existing file has its cursors recovered from the header instead. In
    /// both cases the file's size must equal header + capacity: capacity is
    /// immutable once a queue exists on disk, and reopening with any other
    /// value fails with [`QueueError::InvalidSize`].
    pub fn open<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::InvalidArgument("capacity must not be zero"));
        }
        let path = path.as_ref();
        let region = Region::new(QUEUE_HEADER_BYTES, capacity as u64);
        let expected = QUEUE_HEADER_BYTES + capacity as u64;

        let (store, cursors) = match FileStore::open_rw(path) {
            Ok(store) => {
                let cursors = layout::load_cursors(&store)?;
                (store, cursors)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let store = FileStore::create_rw(path, expected)?;
                layout::store_cursors(&store, region.begin(), region.begin())?;
                (store, (region.begin(), region.begin()))
            }
            Err(e) => return Err(e.into()),
        };

        if store.size() != expected {
            return Err(QueueError::InvalidSize {
                expected,
                actual: store.size(),
            });
        }

        debug!(
            path = %path.display(),
            capacity,
            read = cursors.0,
            write = cursors.1,
            "file queue opened"
        );
        Ok(Self::with_store(store, region, cursors, true))
    }
}
