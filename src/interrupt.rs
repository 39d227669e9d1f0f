//! Ctrl-C and SIGTERM handling
//!
//! While a run holds an [`InterruptGuard`], a signal only raises a flag. The
//! [`SystemRunner`](crate::operations::SystemRunner) notices it, stops the tool
//! it is waiting on and returns [`PipelineError::Interrupted`], so the
//! workspace is removed by the regular error path and the process exits 130
//! from `main`. Without a guard (before the workspace exists or after it was
//! closed) a signal exits the process straight away.

use crate::errors::{PipelineError, Result};
use log::warn;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread;

/// Exit status after an interrupt, as a shell would report SIGINT
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

const IDLE: u8 = 0;
const ARMED: u8 = 1;
const INTERRUPTED: u8 = 2;

static STATE: AtomicU8 = AtomicU8::new(IDLE);
static WATCHING: AtomicBool = AtomicBool::new(false);

/// Keeps signals deferred to the pipeline until dropped or disarmed
#[must_use = "signals exit immediately once the guard is dropped"]
#[derive(Debug)]
pub struct InterruptGuard {
    _private: (),
}

impl InterruptGuard {
    fn arm() -> Self {
        STATE.store(ARMED, Ordering::SeqCst);
        InterruptGuard { _private: () }
    }

    /// Stop deferring signals. Fails if one arrived while the guard was armed.
    pub fn disarm(self) -> Result<()> {
        if STATE.swap(IDLE, Ordering::SeqCst) == INTERRUPTED {
            return Err(PipelineError::Interrupted { step: None });
        }
        Ok(())
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        STATE.store(IDLE, Ordering::SeqCst);
    }
}

/// Start the signal watcher (once per process) and defer signals to the caller
pub fn install() -> Result<InterruptGuard> {
    if !WATCHING.swap(true, Ordering::SeqCst) {
        if let Err(e) = spawn_watcher() {
            WATCHING.store(false, Ordering::SeqCst);
            return Err(e);
        }
    }
    Ok(InterruptGuard::arm())
}

/// Whether a signal arrived while a guard was armed
pub fn requested() -> bool {
    STATE.load(Ordering::SeqCst) == INTERRUPTED
}

/// Fail with [`PipelineError::Interrupted`] once a signal has been received
pub fn checkpoint() -> Result<()> {
    if requested() {
        return Err(PipelineError::Interrupted { step: None });
    }
    Ok(())
}

/// Record a received signal. Returns `true` when nothing defers it and the
/// process should exit now.
fn raise() -> bool {
    match STATE.compare_exchange(ARMED, INTERRUPTED, Ordering::SeqCst, Ordering::SeqCst) {
        Ok(_) => {
            warn!("⚠ Interrupted, stopping after cleanup");
            false
        }
        Err(current) => current == IDLE,
    }
}

fn spawn_watcher() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("interrupt-watcher".to_string())
        .spawn(move || runtime.block_on(watch()))?;

    Ok(())
}

#[cfg(unix)]
async fn watch() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut interrupt, mut terminate) =
        match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
            (Ok(interrupt), Ok(terminate)) => (interrupt, terminate),
            (Err(e), _) | (_, Err(e)) => {
                warn!("⚠ Could not install signal handlers: {}", e);
                return;
            }
        };

    loop {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
        if raise() {
            std::process::exit(i32::from(INTERRUPTED_EXIT_CODE));
        }
    }
}

#[cfg(not(unix))]
async fn watch() {
    loop {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        if raise() {
            std::process::exit(i32::from(INTERRUPTED_EXIT_CODE));
        }
    }
}
