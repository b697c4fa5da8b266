//! Timing of detection phases.
//!
//! Every [`HaarObjectDetector`][crate::detection::HaarObjectDetector] owns one [`Timer`] per
//! phase of a search (integral image, window scan, merging). They can be inspected via
//! [`timers`][crate::detection::HaarObjectDetector::timers] and are usually logged after a batch
//! of detections.

use std::{
    fmt, mem,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

/// Weight of the newest sample in the moving average.
const SMOOTHING: f32 = 0.3;

/// Collects the durations of a repeated operation.
///
/// Samples are combined into an exponential moving average and a running total. Formatting the
/// timer with `{}` prints the collected statistics and starts a new measurement period.
pub struct Timer {
    name: &'static str,
    period: Mutex<Period>,
}

#[derive(Default)]
struct Period {
    /// Smoothed sample duration in seconds.
    smoothed: Option<f32>,
    total: Duration,
    samples: usize,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            period: Mutex::new(Period::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs `op` and records how long it took.
    pub fn time<T>(&self, op: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        op()
    }

    /// Starts a sample that ends when the returned guard is dropped.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            timer: self,
            started: Instant::now(),
        }
    }

    /// Number of samples recorded in the current period.
    pub fn count(&self) -> usize {
        self.period().samples
    }

    /// Smoothed duration of a sample, or [`None`] if the current period has no samples.
    pub fn average(&self) -> Option<Duration> {
        self.period().smoothed.map(Duration::from_secs_f32)
    }

    /// Sum of all sample durations in the current period.
    pub fn total(&self) -> Duration {
        self.period().total
    }

    fn add_sample(&self, elapsed: Duration) {
        let secs = elapsed.as_secs_f32();
        let mut period = self.period();
        period.smoothed = Some(match period.smoothed {
            None => secs,
            Some(prev) => prev + SMOOTHING * (secs - prev),
        });
        period.total += elapsed;
        period.samples += 1;
    }

    fn period(&self) -> MutexGuard<'_, Period> {
        self.period.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Prints `name: <samples>x<average>ms (<total>ms)` and starts a new period.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let period = mem::take(&mut *self.period());
        let avg_ms = period.smoothed.unwrap_or(0.0) * 1000.0;
        let total_ms = period.total.as_secs_f32() * 1000.0;
        write!(
            f,
            "{}: {}x{avg_ms:.01}ms ({total_ms:.01}ms)",
            self.name, period.samples
        )
    }
}

/// Clones start with an empty period.
impl Clone for Timer {
    fn clone(&self) -> Self {
        Self::new(self.name)
    }
}

/// Returned by [`Timer::start`].
pub struct TimerGuard<'a> {
    timer: &'a Timer,
    started: Instant,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.add_sample(self.started.elapsed());
    }
}
