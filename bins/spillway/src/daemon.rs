//! Process detachment and termination signaling.

use anyhow::Context;
use daemonize::Daemonize;
use signal_hook::consts::{SIGINT, SIGTERM};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Forks into the background: new session, umask 0, working directory `/`,
/// stdout/stderr appended to `log_file` so everything the process prints
/// lands in the log.
pub fn detach(log_file: &Path) -> anyhow::Result<()> {
    let stdout = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file '{}'", log_file.display()))?;
    let stderr = stdout
        .try_clone()
        .context("failed to clone log file handle")?;

    Daemonize::new()
        .umask(0o000)
        .working_directory("/")
        .stdout(stdout)
        .stderr(stderr)
        .start()
        .context("failed to daemonize")?;
    Ok(())
}

/// Registers a flag that flips on SIGTERM or SIGINT. The drain loop checks
/// it between iterations and finishes the current one before exiting.
pub fn termination_flag() -> anyhow::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    for signal in [SIGTERM, SIGINT] {
        signal_hook::flag::register(signal, Arc::clone(&flag))
            .with_context(|| format!("failed to install handler for signal {signal}"))?;
    }
    Ok(flag)
}
