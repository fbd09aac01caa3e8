mod error;
mod layout;
mod queue;
mod ring;
mod transfer;

pub use error::QueueError;
pub use queue::{ByteQueue, FileQueue, MemQueue};
pub use ring::Region;
pub use sluice_store::{FileStore, HeapStore, Store};
