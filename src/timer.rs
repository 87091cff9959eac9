//! Wall-clock instrumentation around one planner run.
//!
//! A background ticker advances a coarse progress counter for display while
//! the run is in flight. Starting a new run always stops the previous ticker
//! first, so only one ticker ever writes the displayed value.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

struct Ticker {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    fn spawn(interval: Duration, ticks: Arc<AtomicU64>) -> Self {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = std::thread::spawn(move || {
            loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        ticks.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
        Self { stop, handle }
    }

    fn halt(self) {
        let _ = self.stop.send(());
        let _ = self.handle.join();
    }
}

pub struct ExecutionTimer {
    tick_interval: Duration,
    started: Option<Instant>,
    finished: Option<Duration>,
    ticks: Arc<AtomicU64>,
    ticker: Option<Ticker>,
}

impl ExecutionTimer {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            started: None,
            finished: None,
            ticks: Arc::new(AtomicU64::new(0)),
            ticker: None,
        }
    }

    /// Clears any previous run and starts timing a new one.
    pub fn start(&mut self) {
        self.reset();
        // Fresh counter so a lagging old ticker can never touch it.
        self.ticks = Arc::new(AtomicU64::new(0));
        self.started = Some(Instant::now());
        self.ticker = Some(Ticker::spawn(self.tick_interval, Arc::clone(&self.ticks)));
    }

    /// Stops the ticker and records the final elapsed time.
    pub fn finish(&mut self) -> Duration {
        if let Some(ticker) = self.ticker.take() {
            ticker.halt();
        }
        let elapsed = self.elapsed();
        self.finished = Some(elapsed);
        elapsed
    }

    pub fn reset(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.halt();
        }
        self.started = None;
        self.finished = None;
        self.ticks.store(0, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }

    /// Exact elapsed time; frozen once the run has finished.
    pub fn elapsed(&self) -> Duration {
        match (self.finished, self.started) {
            (Some(finished), _) => finished,
            (None, Some(started)) => started.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    /// Coarse progress value advanced by the ticker, for display.
    pub fn progress(&self) -> Duration {
        self.tick_interval * self.ticks.load(Ordering::Relaxed) as u32
    }

    /// Final elapsed time of the last completed run.
    pub fn final_elapsed(&self) -> Option<Duration> {
        self.finished
    }
}

impl Drop for ExecutionTimer {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.halt();
        }
    }
}
