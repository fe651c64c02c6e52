use anyhow::{Context, Result};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A periodic task running on its own thread.
///
/// The task first runs one `interval` after [`AutoSyncHandle::start`] and
/// then every `interval`. Stopping happens through the handle: [`cancel`]
/// waits for the worker to finish, and dropping the handle does the same.
/// A run in progress is never interrupted.
///
/// [`cancel`]: AutoSyncHandle::cancel
pub struct AutoSyncHandle {
    stop: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl AutoSyncHandle {
    pub fn start<F>(interval: Duration, mut task: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();

        let worker = thread::Builder::new()
            .name("auto-sync".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => task(),
                    // explicit stop or handle dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .context("Failed to spawn auto-sync thread")?;

        log::debug!("Auto-sync started, every {}s", interval.as_secs());
        Ok(AutoSyncHandle {
            stop: Some(stop),
            worker: Some(worker),
        })
    }

    /// Stop the schedule and wait for the worker to exit.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    /// Block on the worker. It only exits when stopped through this handle,
    /// so `watch` uses this to run until the process is interrupted.
    pub fn wait(mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Auto-sync worker panicked");
            }
        }
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            // the worker may already be gone
            let _ = stop.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Auto-sync worker panicked");
            }
            log::debug!("Auto-sync stopped");
        }
    }
}

impl Drop for AutoSyncHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_runs_repeatedly_until_cancelled() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let handle = AutoSyncHandle::start(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while runs.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        handle.cancel();

        let after_cancel = runs.load(Ordering::SeqCst);
        assert!(after_cancel >= 3);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(runs.load(Ordering::SeqCst), after_cancel);
    }

    #[test]
    fn test_drop_stops_promptly() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);

        let started = Instant::now();
        let handle = AutoSyncHandle::start(Duration::from_secs(3600), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        drop(handle);

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
