//! Periodic run loop.
//!
//! Spawns a thread that runs the job immediately, then once per interval.
//! Runs never overlap: the next one starts only after the previous returned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::AssemblyError;

/// Sleep granularity for shutdown responsiveness.
const SLEEP_GRANULARITY: Duration = Duration::from_millis(250);

/// Handle for the scheduler thread.
///
/// Supports graceful shutdown via `shutdown()` or automatic cleanup on `Drop`.
pub struct ScheduleHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl ScheduleHandle {
    /// Request graceful shutdown. A run in progress completes, no new run starts.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Block until the scheduler thread exits.
    pub fn join(mut self) {
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Start running `job` every `interval` on a separate thread.
pub fn start_scheduler<F>(interval: Duration, job: F) -> ScheduleHandle
where
    F: FnMut() -> Result<(), AssemblyError> + Send + 'static,
{
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();

    let handle = std::thread::spawn(move || {
        tracing::info!("Assembling scheduler started (every {}s)", interval.as_secs());
        scheduler_loop(interval, &flag, job);
    });

    ScheduleHandle {
        shutdown,
        handle: Some(handle),
    }
}

fn scheduler_loop<F>(interval: Duration, shutdown: &AtomicBool, mut job: F)
where
    F: FnMut() -> Result<(), AssemblyError>,
{
    while !shutdown.load(Ordering::Relaxed) {
        let started = Instant::now();
        if let Err(e) = job() {
            tracing::error!(error = %e, fatal = e.is_fatal(), "Scheduled run failed, retrying next interval");
        }

        // Sleep in small increments for responsive shutdown
        while started.elapsed() < interval {
            if shutdown.load(Ordering::Relaxed) {
                tracing::info!("Assembling scheduler shutting down");
                return;
            }
            let remaining = interval.saturating_sub(started.elapsed());
            std::thread::sleep(remaining.min(SLEEP_GRANULARITY));
        }
    }
    tracing::info!("Assembling scheduler shutting down");
}
