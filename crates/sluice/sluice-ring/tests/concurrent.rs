//! Concurrency tests: one reader and one writer make progress in parallel;
//! multiple writers serialize behind the writer gate.

use sluice_ring::{ByteQueue, FileQueue, MemQueue, QueueError, Store};
use std::sync::Arc;
use std::thread;

fn test_path(label: &str) -> String {
    format!("/tmp/sluice_conc_{}_{}", label, std::process::id())
}

/// Writer thread pushes sequence-stamped records with backoff on a full
/// ring; the reader drains until it has seen every record, verifying FIFO
/// order by the embedded sequence number.
fn spsc_exchange<S: Store + Send + Sync + 'static>(queue: Arc<ByteQueue<S>>, records: u64) {
    let writer = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            for seq in 0..records {
                let record = seq.to_le_bytes();
                loop {
                    match queue.write(&record) {
                        Ok(8) => break,
                        Ok(n) => panic!("short write: {n}"),
                        Err(QueueError::OutOfSpace { .. }) => thread::yield_now(),
                        Err(e) => panic!("writer failed: {e}"),
                    }
                }
            }
        })
    };

    let mut buf = [0u8; 64];
    let mut expected = 0u64;
    while expected < records {
        match queue.read(&mut buf).unwrap() {
            0 => thread::yield_now(),
            8 => {
                let seq = u64::from_le_bytes(buf[..8].try_into().unwrap());
                assert_eq!(seq, expected, "records must arrive in FIFO order");
                expected += 1;
            }
            n => panic!("short read: {n}"),
        }
    }

    writer.join().unwrap();
    assert_eq!(queue.read(&mut buf).unwrap(), 0);
}

#[test]
fn mem_single_writer_single_reader() {
    let queue = Arc::new(MemQueue::open(1 << 12).unwrap());
    spsc_exchange(queue, 10_000);
}

#[test]
fn file_single_writer_single_reader() {
    let path = test_path("spsc");
    let _ = std::fs::remove_file(&path);

    let queue = Arc::new(FileQueue::open(&path, 1 << 12).unwrap());
    spsc_exchange(queue, 2_000);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn concurrent_writers_serialize_without_losing_records() {
    // Room for every record up front: 2 writers x 500 records x 17 frame
    // bytes, so neither writer ever needs a concurrent reader.
    let queue = Arc::new(MemQueue::open(1 << 15).unwrap());
    let writers = 2u8;
    let per_writer = 500u64;

    let handles: Vec<_> = (0..writers)
        .map(|tag| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for seq in 0..per_writer {
                    let mut record = [0u8; 9];
                    record[0] = tag;
                    record[1..].copy_from_slice(&seq.to_le_bytes());
                    queue.write(&record).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Interleaving across writers is arbitrary, but each writer's own
    // records must come out in the order it wrote them.
    let mut next_seq = vec![0u64; writers as usize];
    let mut buf = [0u8; 9];
    let mut total = 0u64;
    loop {
        match queue.read(&mut buf).unwrap() {
            0 => break,
            9 => {
                let tag = buf[0] as usize;
                let seq = u64::from_le_bytes(buf[1..].try_into().unwrap());
                assert_eq!(seq, next_seq[tag]);
                next_seq[tag] += 1;
                total += 1;
            }
            n => panic!("short read: {n}"),
        }
    }
    assert_eq!(total, writers as u64 * per_writer);
}
