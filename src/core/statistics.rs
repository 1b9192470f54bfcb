//! Tracker metrics, exported in Prometheus format.
//!
//! The registry is a process singleton: components grab the [`METRICS`]
//! handle and observe through it. All metric types use atomic operations
//! internally, so concurrent observation is safe. The exporter endpoint
//! lives in [`crate::servers::metrics`].
use std::time::Duration;

use prometheus::{Encoder, Gauge, HistogramOpts, HistogramVec, IntGauge, Opts, Registry, TextEncoder};
use swarm_tracker_primitives::AddressFamily;

lazy_static! {
    /// The process-wide metrics registry.
    pub static ref REGISTRY: Registry = Registry::new();

    /// The process-wide metrics handle, registered into [`struct@REGISTRY`].
    pub static ref METRICS: Metrics = Metrics::new(&REGISTRY);
}

/// Label value of the `error` dimension for requests that succeeded.
const NO_ERROR: &str = "";

/// Response duration buckets, in milliseconds.
const DURATION_BUCKETS: &[f64] = &[0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0];

/// The metrics collected by the tracker.
pub struct Metrics {
    /// UDP request latency, labelled by action, address family and
    /// failure reason.
    udp_response_duration_milliseconds: HistogramVec,

    /// HTTP request latency, labelled by action, address family and
    /// failure reason.
    http_response_duration_milliseconds: HistogramVec,

    /// Number of swarms currently in the store.
    infohashes_count: IntGauge,

    /// Number of seeders across all swarms.
    seeders_count: IntGauge,

    /// Number of leechers across all swarms.
    leechers_count: IntGauge,

    /// Duration of the last garbage collection sweep.
    gc_duration_milliseconds: Gauge,
}

impl Metrics {
    /// Creates the metrics and registers them into `registry`.
    ///
    /// # Panics
    ///
    /// Will panic if a metric cannot be built or is already registered,
    /// which only happens when two handles are created against the same
    /// registry.
    #[must_use]
    pub fn new(registry: &Registry) -> Self {
        let udp_response_duration_milliseconds = HistogramVec::new(
            HistogramOpts::new(
                "swarm_tracker_udp_response_duration_milliseconds",
                "UDP response latency in milliseconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["action", "address_family", "error"],
        )
        .expect("the udp duration histogram should build");
        registry
            .register(Box::new(udp_response_duration_milliseconds.clone()))
            .expect("the udp duration histogram should register");

        let http_response_duration_milliseconds = HistogramVec::new(
            HistogramOpts::new(
                "swarm_tracker_http_response_duration_milliseconds",
                "HTTP response latency in milliseconds",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["action", "address_family", "error"],
        )
        .expect("the http duration histogram should build");
        registry
            .register(Box::new(http_response_duration_milliseconds.clone()))
            .expect("the http duration histogram should register");

        let infohashes_count = IntGauge::with_opts(Opts::new(
            "swarm_tracker_infohashes_count",
            "Number of swarms currently tracked",
        ))
        .expect("the infohashes gauge should build");
        registry
            .register(Box::new(infohashes_count.clone()))
            .expect("the infohashes gauge should register");

        let seeders_count = IntGauge::with_opts(Opts::new("swarm_tracker_seeders_count", "Number of seeders across all swarms"))
            .expect("the seeders gauge should build");
        registry
            .register(Box::new(seeders_count.clone()))
            .expect("the seeders gauge should register");

        let leechers_count =
            IntGauge::with_opts(Opts::new("swarm_tracker_leechers_count", "Number of leechers across all swarms"))
                .expect("the leechers gauge should build");
        registry
            .register(Box::new(leechers_count.clone()))
            .expect("the leechers gauge should register");

        let gc_duration_milliseconds = Gauge::with_opts(Opts::new(
            "swarm_tracker_gc_duration_milliseconds",
            "Duration of the last garbage collection sweep in milliseconds",
        ))
        .expect("the gc duration gauge should build");
        registry
            .register(Box::new(gc_duration_milliseconds.clone()))
            .expect("the gc duration gauge should register");

        Self {
            udp_response_duration_milliseconds,
            http_response_duration_milliseconds,
            infohashes_count,
            seeders_count,
            leechers_count,
            gc_duration_milliseconds,
        }
    }

    /// Records the latency of one UDP request.
    pub fn observe_udp_response(&self, action: &str, family: AddressFamily, error: Option<&str>, elapsed: Duration) {
        self.udp_response_duration_milliseconds
            .with_label_values(&[action, family.metric_label(), error.unwrap_or(NO_ERROR)])
            .observe(as_millis_f64(elapsed));
    }

    /// Records the latency of one HTTP request.
    pub fn observe_http_response(&self, action: &str, family: AddressFamily, error: Option<&str>, elapsed: Duration) {
        self.http_response_duration_milliseconds
            .with_label_values(&[action, family.metric_label(), error.unwrap_or(NO_ERROR)])
            .observe(as_millis_f64(elapsed));
    }

    /// Publishes the totals computed by the store reporting task.
    #[allow(clippy::cast_possible_wrap)]
    pub fn set_swarm_totals(&self, infohashes: usize, seeders: usize, leechers: usize) {
        self.infohashes_count.set(infohashes as i64);
        self.seeders_count.set(seeders as i64);
        self.leechers_count.set(leechers as i64);
    }

    /// Publishes the duration of the last garbage collection sweep.
    pub fn set_gc_duration(&self, elapsed: Duration) {
        self.gc_duration_milliseconds.set(as_millis_f64(elapsed));
    }
}

fn as_millis_f64(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

/// Exports the whole registry in Prometheus text format.
///
/// # Errors
///
/// Will return `Err` if the encoder fails or produces invalid UTF-8.
pub fn export() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use swarm_tracker_primitives::AddressFamily;

    use super::{export, METRICS};

    #[test]
    fn the_exported_registry_should_contain_the_tracker_metrics() {
        METRICS.observe_udp_response("announce", AddressFamily::V4, None, Duration::from_millis(2));
        METRICS.set_swarm_totals(1, 2, 3);

        let exported = export().unwrap();

        assert!(exported.contains("swarm_tracker_udp_response_duration_milliseconds"));
        assert!(exported.contains("swarm_tracker_infohashes_count"));
        assert!(exported.contains("swarm_tracker_seeders_count"));
        assert!(exported.contains("swarm_tracker_leechers_count"));
    }
}
