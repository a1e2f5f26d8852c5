/// Pipeline call counters.
///
/// The counters are always present so the API does not change with the
/// `profiling` feature, but the [`count_call!`](crate::count_call) and
/// [`count_add!`](crate::count_add) macros compile to nothing without it.
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for every stage a triangle can stop at.
pub struct PipelineCounters {
    // Draw calls
    pub draw_calls: AtomicU64,
    pub meshes_drawn: AtomicU64,
    pub meshes_skipped: AtomicU64,

    // Triangle fate
    pub triangles_submitted: AtomicU64,
    pub triangles_culled: AtomicU64,
    pub triangles_discarded: AtomicU64,
    pub triangles_clipped: AtomicU64,
    pub triangles_rasterized: AtomicU64,

    // Lighting
    pub specular_table_rebuilds: AtomicU64,
}

impl PipelineCounters {
    pub const fn new() -> Self {
        Self {
            draw_calls: AtomicU64::new(0),
            meshes_drawn: AtomicU64::new(0),
            meshes_skipped: AtomicU64::new(0),
            triangles_submitted: AtomicU64::new(0),
            triangles_culled: AtomicU64::new(0),
            triangles_discarded: AtomicU64::new(0),
            triangles_clipped: AtomicU64::new(0),
            triangles_rasterized: AtomicU64::new(0),
            specular_table_rebuilds: AtomicU64::new(0),
        }
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        for c in self.all() {
            c.store(0, Ordering::Relaxed);
        }
    }

    fn all(&self) -> [&AtomicU64; 9] {
        [
            &self.draw_calls,
            &self.meshes_drawn,
            &self.meshes_skipped,
            &self.triangles_submitted,
            &self.triangles_culled,
            &self.triangles_discarded,
            &self.triangles_clipped,
            &self.triangles_rasterized,
            &self.specular_table_rebuilds,
        ]
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            draw_calls: self.draw_calls.load(Ordering::Relaxed),
            meshes_drawn: self.meshes_drawn.load(Ordering::Relaxed),
            meshes_skipped: self.meshes_skipped.load(Ordering::Relaxed),
            triangles_submitted: self.triangles_submitted.load(Ordering::Relaxed),
            triangles_culled: self.triangles_culled.load(Ordering::Relaxed),
            triangles_discarded: self.triangles_discarded.load(Ordering::Relaxed),
            triangles_clipped: self.triangles_clipped.load(Ordering::Relaxed),
            triangles_rasterized: self.triangles_rasterized.load(Ordering::Relaxed),
            specular_table_rebuilds: self.specular_table_rebuilds.load(Ordering::Relaxed),
        }
    }
}

impl Default for PipelineCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub draw_calls: u64,
    pub meshes_drawn: u64,
    pub meshes_skipped: u64,
    pub triangles_submitted: u64,
    pub triangles_culled: u64,
    pub triangles_discarded: u64,
    pub triangles_clipped: u64,
    pub triangles_rasterized: u64,
    pub specular_table_rebuilds: u64,
}

impl CounterSnapshot {
    /// Log a formatted report at info level.
    pub fn log_report(&self) {
        log::info!("=== Pipeline Counters ===");
        log::info!(
            "draw calls {:10}  meshes drawn {:8}  meshes skipped {:8}",
            self.draw_calls,
            self.meshes_drawn,
            self.meshes_skipped
        );
        log::info!("triangles submitted   {:12}", self.triangles_submitted);
        log::info!("          culled      {:12}", self.triangles_culled);
        log::info!("          discarded   {:12}", self.triangles_discarded);
        log::info!("          clipped     {:12}", self.triangles_clipped);
        log::info!("          rasterized  {:12}", self.triangles_rasterized);
        if self.triangles_submitted > 0 {
            let kept = self.triangles_rasterized as f64 / self.triangles_submitted as f64 * 100.0;
            log::info!("rasterized / submitted {:10.2}%", kept);
        }
        log::info!("specular table rebuilds {:10}", self.specular_table_rebuilds);
    }
}

/// Global pipeline counters instance
pub static PIPELINE_COUNTERS: PipelineCounters = PipelineCounters::new();

/// Increment a counter (only when the profiling feature is enabled)
#[macro_export]
macro_rules! count_call {
    ($counter:ident) => {
        #[cfg(feature = "profiling")]
        {
            $crate::perf::PIPELINE_COUNTERS
                .$counter
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

/// Add to a counter (only when the profiling feature is enabled)
#[macro_export]
macro_rules! count_add {
    ($counter:ident, $value:expr) => {
        #[cfg(feature = "profiling")]
        {
            $crate::perf::PIPELINE_COUNTERS
                .$counter
                .fetch_add($value as u64, std::sync::atomic::Ordering::Relaxed);
        }
        #[cfg(not(feature = "profiling"))]
        {
            let _ = $value;
        }
    };
}
