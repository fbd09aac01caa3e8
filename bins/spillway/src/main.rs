//! spillway: drains a sluice queue into numbered files.
//!
//! Takes a target directory as its sole argument, detaches into the
//! background, and polls the configured file-backed queue. Every non-empty
//! read is written verbatim to a newly created, monotonically numbered file
//! in the target directory. A termination signal lets the current iteration
//! finish, commits the queue cursors, and exits.

mod daemon;

use anyhow::Context;
use sluice_ring::FileQueue;
use spillway_config::SpillwayConfig;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Optional configuration; every field has a default when the file is absent.
const CONFIG_PATH: &str = "/etc/spillway.toml";

/// One read must fit any record a drain file can hold.
const DRAIN_BUFFER_BYTES: usize = u16::MAX as usize;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args();
    let app = args.next().unwrap_or_else(|| "spillway".into());
    let Some(dir) = args.next() else {
        eprintln!("usage: {app} <path to dir>");
        std::process::exit(1);
    };

    // Resolve before detaching: the daemon's working directory is `/`.
    let target_dir = std::fs::canonicalize(&dir)
        .with_context(|| format!("target directory '{dir}' is not usable"))?;

    let config = SpillwayConfig::load_if_present(CONFIG_PATH)?;

    daemon::detach(Path::new(&config.log_file))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .init();

    let stop = daemon::termination_flag()?;

    let queue = FileQueue::open(&config.queue_path, config.queue_capacity)
        .with_context(|| format!("failed to open queue at '{}'", config.queue_path))?;

    info!(
        queue = %config.queue_path,
        dir = %target_dir.display(),
        "started"
    );

    drain(
        &queue,
        &target_dir,
        &stop,
        Duration::from_micros(config.poll_interval_us),
    )?;

    queue.close().context("failed to commit queue cursors")?;
    info!("done");
    Ok(())
}

/// Polls the queue until the termination flag flips; every non-empty read
/// becomes one numbered file in the target directory.
fn drain(
    queue: &FileQueue,
    dir: &Path,
    stop: &AtomicBool,
    pause: Duration,
) -> anyhow::Result<()> {
    let mut buf = vec![0u8; DRAIN_BUFFER_BYTES];
    // Seed the counter from what is already there so a restarted drain
    // never clobbers earlier output.
    let mut counter = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list '{}'", dir.display()))?
        .count() as u64;

    while !stop.load(Ordering::Relaxed) {
        match queue.read(&mut buf) {
            Ok(0) => std::thread::sleep(pause),
            Ok(n) => {
                let file = dir.join(format!("sluice_rec_{counter}"));
                std::fs::write(&file, &buf[..n])
                    .with_context(|| format!("failed to write '{}'", file.display()))?;
                counter += 1;
            }
            Err(e) => {
                warn!(error = %e, "queue read failed");
                std::thread::sleep(pause);
            }
        }
    }
    Ok(())
}
