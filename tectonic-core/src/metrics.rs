//! Balancer metrics
//!
//! Lock-free counters, gauges, and histograms with Prometheus text export.
//! Gauges carry `f64` values because the interesting balancer quantities
//! (normalized costs) are fractional.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counter metric (monotonically increasing)
pub struct Counter {
    value: AtomicU64,
    name: &'static str,
    help: &'static str,
}

impl Counter {
    /// Create a new counter
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            value: AtomicU64::new(0),
            name,
            help,
        }
    }

    /// Increment by 1
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment by delta
    pub fn inc_by(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    /// Get current value
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Format as Prometheus metric
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP {} {}\n# TYPE {} counter\n{} {}\n",
            self.name, self.help, self.name, self.name, self.get()
        )
    }
}

/// Gauge metric holding a floating point value
///
/// The value is stored as raw `f64` bits in an atomic word.
pub struct Gauge {
    bits: AtomicU64,
    name: &'static str,
    help: &'static str,
}

impl Gauge {
    /// Create a new gauge starting at 0.0
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        Self {
            bits: AtomicU64::new(0),
            name,
            help,
        }
    }

    /// Set value
    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    /// Get current value
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Format as Prometheus metric
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP {} {}\n# TYPE {} gauge\n{} {}\n",
            self.name, self.help, self.name, self.name, self.get()
        )
    }
}

/// Histogram for duration measurements
pub struct Histogram {
    buckets: Vec<(f64, AtomicU64)>,
    sum_micros: AtomicU64,
    count: AtomicU64,
    name: &'static str,
    help: &'static str,
}

impl Histogram {
    /// Create with buckets sized for balance runs (milliseconds to tens of
    /// seconds)
    pub fn new(name: &'static str, help: &'static str) -> Self {
        Self::with_buckets(
            name,
            help,
            vec![0.001, 0.005, 0.025, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0],
        )
    }

    /// Create with custom bucket bounds
    pub fn with_buckets(name: &'static str, help: &'static str, bounds: Vec<f64>) -> Self {
        let buckets = bounds.into_iter().map(|b| (b, AtomicU64::new(0))).collect();
        Self {
            buckets,
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
            name,
            help,
        }
    }

    /// Observe a value in seconds
    pub fn observe(&self, value: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_micros
            .fetch_add((value * 1_000_000.0) as u64, Ordering::Relaxed);
        for (bound, count) in &self.buckets {
            if value <= *bound {
                count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Time a closure and record the elapsed seconds
    pub fn time<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.observe(start.elapsed().as_secs_f64());
        result
    }

    /// Format as Prometheus metric
    pub fn to_prometheus(&self) -> String {
        let mut output = format!(
            "# HELP {} {}\n# TYPE {} histogram\n",
            self.name, self.help, self.name
        );
        for (bound, count) in &self.buckets {
            output.push_str(&format!(
                "{}_bucket{{le=\"{}\"}} {}\n",
                self.name,
                bound,
                count.load(Ordering::Relaxed)
            ));
        }
        let sum_secs = self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        output.push_str(&format!("{}_sum {}\n", self.name, sum_secs));
        output.push_str(&format!(
            "{}_count {}\n",
            self.name,
            self.count.load(Ordering::Relaxed)
        ));
        output
    }
}

/// Standard balancer metrics
pub mod standard {
    use super::*;
    use std::sync::LazyLock;

    /// Balance invocations that ran the optimizer loop
    pub static BALANCE_RUNS: LazyLock<Counter> = LazyLock::new(|| {
        Counter::new(
            "tectonic_balance_runs_total",
            "Balance invocations that ran the optimizer",
        )
    });

    /// Balance invocations skipped by the pre-check
    pub static BALANCE_SKIPPED: LazyLock<Counter> = LazyLock::new(|| {
        Counter::new(
            "tectonic_balance_skipped_total",
            "Balance invocations skipped as already balanced",
        )
    });

    /// Total region moves emitted across all plans
    pub static PLAN_MOVES: LazyLock<Counter> = LazyLock::new(|| {
        Counter::new(
            "tectonic_plan_moves_total",
            "Region moves emitted in balance plans",
        )
    });

    pub static LAST_COST_BEFORE: LazyLock<Gauge> = LazyLock::new(|| {
        Gauge::new(
            "tectonic_last_cost_before",
            "Weighted cluster cost before the last balance run",
        )
    });

    pub static LAST_COST_AFTER: LazyLock<Gauge> = LazyLock::new(|| {
        Gauge::new(
            "tectonic_last_cost_after",
            "Weighted cluster cost after the last balance run",
        )
    });

    pub static LAST_STEP_COUNT: LazyLock<Gauge> = LazyLock::new(|| {
        Gauge::new(
            "tectonic_last_step_count",
            "Optimizer steps taken by the last balance run",
        )
    });

    pub static BALANCE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
        Histogram::new(
            "tectonic_balance_duration_seconds",
            "Wall clock duration of balance runs",
        )
    });
}

/// Gather all balancer metrics in Prometheus text format
pub fn gather_balancer_metrics() -> String {
    let mut output = String::new();
    output.push_str(&standard::BALANCE_RUNS.to_prometheus());
    output.push_str(&standard::BALANCE_SKIPPED.to_prometheus());
    output.push_str(&standard::PLAN_MOVES.to_prometheus());
    output.push_str(&standard::LAST_COST_BEFORE.to_prometheus());
    output.push_str(&standard::LAST_COST_AFTER.to_prometheus());
    output.push_str(&standard::LAST_STEP_COUNT.to_prometheus());
    output.push_str(&standard::BALANCE_DURATION.to_prometheus());
    output
}
