/// Performance measurement utilities
/// Draw calls are counted per pipeline stage and can be timed with scoped timers.
pub mod profiling;

pub use profiling::{CounterSnapshot, PipelineCounters, PIPELINE_COUNTERS};

use std::time::{Duration, Instant};

/// Logs the time spent in a scope when dropped.
pub struct PerfTimer {
    name: &'static str,
    start: Instant,
}

impl PerfTimer {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        log::debug!("[PERF] {}: {}μs", self.name, self.elapsed().as_micros());
    }
}

/// Frame time accumulator
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub frames: u64,
    pub clear_us: f64,
    pub draw_us: f64,
    pub present_us: f64,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, clear: Duration, draw: Duration, present: Duration) {
        self.frames += 1;
        self.clear_us += clear.as_secs_f64() * 1e6;
        self.draw_us += draw.as_secs_f64() * 1e6;
        self.present_us += present.as_secs_f64() * 1e6;
    }

    /// Average per frame, in microseconds.
    pub fn averages(&self) -> (f64, f64, f64) {
        let n = self.frames.max(1) as f64;
        (self.clear_us / n, self.draw_us / n, self.present_us / n)
    }

    pub fn log_summary(&self) {
        let (clear, draw, present) = self.averages();
        let total = (clear + draw + present).max(f64::EPSILON);
        log::info!("========== FRAME SUMMARY ({} frames) ==========", self.frames);
        log::info!("Clear:    {:8.2}μs ({:5.1}%)", clear, clear / total * 100.0);
        log::info!("Draw:     {:8.2}μs ({:5.1}%)", draw, draw / total * 100.0);
        log::info!("Present:  {:8.2}μs ({:5.1}%)", present, present / total * 100.0);
        log::info!("Total:    {:8.2}μs", total);
    }
}

/// Macro for easy performance measurement
#[macro_export]
macro_rules! perf_scope {
    ($name:expr) => {
        let _timer = $crate::perf::PerfTimer::new($name);
    };
}
