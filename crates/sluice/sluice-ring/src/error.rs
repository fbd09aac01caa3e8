use std::io;

/// Everything a queue operation can fail with.
///
/// `read` reports an empty queue as `Ok(0)`, not as an error. No operation
/// retries internally or waits for space/data; backoff is the caller's job.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Zero-capacity queue, empty record, or empty destination buffer.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Write admission failed: prefix + payload does not fit in the free
    /// space. Nothing was mutated.
    #[error("record of {requested} bytes does not fit in {available} free bytes")]
    OutOfSpace { requested: usize, available: u64 },

    /// The record at the head of the queue is larger than the caller's
    /// buffer. The record stays queued until a large-enough buffer arrives.
    #[error("destination buffer of {buffer} bytes is smaller than the {record}-byte head record")]
    BufferTooSmall { record: u64, buffer: usize },

    /// The backing file's size disagrees with the requested capacity.
    /// Capacity is immutable once a queue exists on disk.
    #[error("backing file is {actual} bytes, expected {expected}")]
    InvalidSize { expected: u64, actual: u64 },

    /// The volatile backend could not allocate its block.
    #[error("failed to allocate {0} bytes for the in-memory queue")]
    OutOfMemory(usize),

    /// Propagated backing-storage failure.
    #[error("storage i/o failed")]
    Io(#[from] io::Error),
}
