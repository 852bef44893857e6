//! Metrics for the Proclusive workflow service
//!
//! In-process counters, gauges and latency histograms, rendered as JSON or in
//! the Prometheus text exposition format at `GET /metrics`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Global metrics registry
pub struct MetricsRegistry {
    /// Counter metrics
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,

    /// Gauge metrics (current values)
    gauges: RwLock<HashMap<String, Arc<AtomicU64>>>,

    /// Histogram metrics (bucketed)
    histograms: RwLock<HashMap<String, Arc<Histogram>>>,

    /// Service start time
    start_time: Instant,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            gauges: RwLock::new(HashMap::new()),
            histograms: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Increment a counter
    pub async fn inc_counter(&self, name: &str) {
        self.add_counter(name, 1).await;
    }

    /// Add to a counter
    pub async fn add_counter(&self, name: &str, value: u64) {
        let counters = self.counters.read().await;
        if let Some(counter) = counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
            return;
        }
        drop(counters);

        let mut counters = self.counters.write().await;
        let counter = counters
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(0)));
        counter.fetch_add(value, Ordering::Relaxed);
    }

    /// Set a gauge value
    pub async fn set_gauge(&self, name: &str, value: u64) {
        let gauges = self.gauges.read().await;
        if let Some(gauge) = gauges.get(name) {
            gauge.store(value, Ordering::Relaxed);
            return;
        }
        drop(gauges);

        let mut gauges = self.gauges.write().await;
        gauges.insert(name.to_string(), Arc::new(AtomicU64::new(value)));
    }

    /// Get a counter value
    pub async fn get_counter(&self, name: &str) -> u64 {
        let counters = self.counters.read().await;
        counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Get a gauge value
    pub async fn get_gauge(&self, name: &str) -> u64 {
        let gauges = self.gauges.read().await;
        gauges
            .get(name)
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Record a histogram observation
    pub async fn observe_histogram(&self, name: &str, value: f64) {
        let histograms = self.histograms.read().await;
        if let Some(histogram) = histograms.get(name) {
            histogram.observe(value);
            return;
        }
        drop(histograms);

        let mut histograms = self.histograms.write().await;
        let histogram = histograms
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Histogram::default()));
        histogram.observe(value);
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get all metrics as JSON
    pub async fn to_json(&self) -> serde_json::Value {
        let counters = self.counters.read().await;
        let gauges = self.gauges.read().await;
        let histograms = self.histograms.read().await;

        let counter_values: BTreeMap<&str, u64> = counters
            .iter()
            .map(|(k, v)| (k.as_str(), v.load(Ordering::Relaxed)))
            .collect();

        let gauge_values: BTreeMap<&str, u64> = gauges
            .iter()
            .map(|(k, v)| (k.as_str(), v.load(Ordering::Relaxed)))
            .collect();

        let histogram_values: BTreeMap<&str, serde_json::Value> = histograms
            .iter()
            .map(|(k, h)| (k.as_str(), h.to_json()))
            .collect();

        serde_json::json!({
            "uptime_seconds": self.uptime_seconds(),
            "counters": counter_values,
            "gauges": gauge_values,
            "histograms": histogram_values,
        })
    }

    /// Export metrics in Prometheus format, sorted by name
    pub async fn to_prometheus(&self) -> String {
        let counters = self.counters.read().await;
        let gauges = self.gauges.read().await;
        let histograms = self.histograms.read().await;

        let mut output = String::new();

        output.push_str("# HELP proclusive_uptime_seconds Time since service start\n");
        output.push_str("# TYPE proclusive_uptime_seconds gauge\n");
        output.push_str(&format!(
            "proclusive_uptime_seconds {}\n\n",
            self.uptime_seconds()
        ));

        let sorted: BTreeMap<_, _> = counters.iter().collect();
        for (name, counter) in sorted {
            let prometheus_name = prometheus_name(name);
            output.push_str(&format!("# TYPE {} counter\n", prometheus_name));
            output.push_str(&format!(
                "{} {}\n",
                prometheus_name,
                counter.load(Ordering::Relaxed)
            ));
        }

        let sorted: BTreeMap<_, _> = gauges.iter().collect();
        for (name, gauge) in sorted {
            let prometheus_name = prometheus_name(name);
            output.push_str(&format!("# TYPE {} gauge\n", prometheus_name));
            output.push_str(&format!(
                "{} {}\n",
                prometheus_name,
                gauge.load(Ordering::Relaxed)
            ));
        }

        let sorted: BTreeMap<_, _> = histograms.iter().collect();
        for (name, histogram) in sorted {
            output.push_str(&histogram.to_prometheus(name));
        }

        output
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn prometheus_name(name: &str) -> String {
    name.replace(['.', '-'], "_")
}

/// Fixed-bucket histogram
pub struct Histogram {
    /// Upper bucket boundaries
    buckets: Vec<f64>,

    /// Count per bucket
    counts: Vec<AtomicU64>,

    /// Sum of all observations in milliseconds
    sum_millis: AtomicU64,

    /// Total count of observations
    count: AtomicU64,
}

impl Histogram {
    pub fn new(buckets: Vec<f64>) -> Self {
        let counts = buckets.iter().map(|_| AtomicU64::new(0)).collect();
        Self {
            buckets,
            counts,
            sum_millis: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record an observation
    pub fn observe(&self, value: f64) {
        self.sum_millis
            .fetch_add((value * 1000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        if let Some(i) = self.buckets.iter().position(|bucket| value <= *bucket) {
            self.counts[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    fn sum(&self) -> f64 {
        self.sum_millis.load(Ordering::Relaxed) as f64 / 1000.0
    }

    /// Get histogram as JSON
    pub fn to_json(&self) -> serde_json::Value {
        let bucket_counts: Vec<u64> = self
            .counts
            .iter()
            .map(|c| c.load(Ordering::Relaxed))
            .collect();

        serde_json::json!({
            "buckets": self.buckets,
            "counts": bucket_counts,
            "sum": self.sum(),
            "count": self.count(),
        })
    }

    /// Export as Prometheus format
    pub fn to_prometheus(&self, name: &str) -> String {
        let prometheus_name = prometheus_name(name);
        let mut output = String::new();

        output.push_str(&format!("# TYPE {} histogram\n", prometheus_name));

        let mut cumulative = 0u64;
        for (bucket, count) in self.buckets.iter().zip(&self.counts) {
            cumulative += count.load(Ordering::Relaxed);
            output.push_str(&format!(
                "{}_bucket{{le=\"{}\"}} {}\n",
                prometheus_name, bucket, cumulative
            ));
        }

        output.push_str(&format!(
            "{}_bucket{{le=\"+Inf\"}} {}\n",
            prometheus_name,
            self.count()
        ));
        output.push_str(&format!("{}_sum {}\n", prometheus_name, self.sum()));
        output.push_str(&format!("{}_count {}\n", prometheus_name, self.count()));

        output
    }
}

impl Default for Histogram {
    fn default() -> Self {
        // Latency in seconds
        Self::new(vec![
            0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ])
    }
}

/// Predefined metric names
pub mod metric_names {
    // Verification engine
    pub const POINTS_REVIEWED: &str = "proclusive.points.reviewed";
    pub const APPLICATIONS_SUBMITTED: &str = "proclusive.applications.submitted";
    pub const APPLICATIONS_APPROVED: &str = "proclusive.applications.approved";
    pub const APPLICATIONS_REJECTED: &str = "proclusive.applications.rejected";
    pub const APPLICATIONS_UNDER_REVIEW: &str = "proclusive.applications.under_review";
    /// Gauge, refreshed whenever the pending queue is listed
    pub const APPLICATIONS_PENDING: &str = "proclusive.applications.pending";
    pub const BADGES_GRANTED: &str = "proclusive.badges.granted";

    // Referral workflow
    pub const REFERRALS_SUBMITTED: &str = "proclusive.referrals.submitted";
    pub const REFERRAL_TRANSITIONS: &str = "proclusive.referrals.transitions";
    pub const REFERRALS_COMPLETED: &str = "proclusive.referrals.completed";

    // Side effects
    pub const AUDIT_WRITES: &str = "proclusive.audit.writes";
    pub const AUDIT_FAILURES: &str = "proclusive.audit.failures";
    pub const NOTIFICATIONS_SENT: &str = "proclusive.notifications.sent";
    pub const NOTIFICATION_FAILURES: &str = "proclusive.notifications.failures";
    pub const NOTIFICATION_LATENCY: &str = "proclusive.notifications.latency_seconds";

    // Rejected operations
    pub const VALIDATION_ERRORS: &str = "proclusive.errors.validation";
    pub const TRANSITION_ERRORS: &str = "proclusive.errors.transition";

    // Reconciliation
    pub const RECONCILE_FINDINGS: &str = "proclusive.reconcile.findings";
    pub const RECONCILE_REPAIRS: &str = "proclusive.reconcile.repairs";
}

/// Time an async operation into a latency histogram
pub async fn timed<F, T>(metrics: &MetricsRegistry, metric_name: &str, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let result = f.await;
    metrics
        .observe_histogram(metric_name, start.elapsed().as_secs_f64())
        .await;
    result
}
