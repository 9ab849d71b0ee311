//! Time measurement helpers.

use log::{debug, info};
use std::sync::atomic::{compiler_fence, Ordering::SeqCst};
use std::time::*;

/// Run `f` and return its result together with the time it took.
pub fn measure<Out, F: FnOnce() -> Out>(f: F) -> (Out, Duration) {
    compiler_fence(SeqCst);
    let start = Instant::now();
    let res = f();
    let t_passed = start.elapsed();
    compiler_fence(SeqCst);
    (res, t_passed)
}

/// Run `f` and log how long it took.
pub fn report_time<Out, F: FnOnce() -> Out>(name: &str, f: F) -> Out {
    debug!("starting {}", name);
    let (res, t_passed) = measure(f);
    info!("{} done - took: {}ms", name, t_passed.as_secs_f64() * 1000.0);
    res
}

/// Run `f`, log how long it took and report the time in ms under `key`.
pub fn report_time_with_key<Out, F: FnOnce() -> Out>(name: &str, key: &'static str, f: F) -> Out {
    debug!("starting {}", name);
    let (res, t_passed) = measure(f);
    let t_passed = t_passed.as_secs_f64() * 1000.0;
    info!("{} done - took: {}ms", name, t_passed);
    report!(key, t_passed);
    res
}

/// Measures the time passed since it was started.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Timer {
        Timer { start: Instant::now() }
    }

    pub fn get_passed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn get_passed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}
