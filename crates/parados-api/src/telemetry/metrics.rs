//! Prometheus metrics for the prediction service
//!
//! - `parados_predict_requests_total` (counter) - requests by outcome
//! - `parados_predict_duration_seconds` (histogram) - end-to-end predict latency
//! - `parados_model_loaded` (gauge) - 1 when a model is loaded

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use super::{Result, TelemetryError};

/// Outcome label values for `parados_predict_requests_total`
pub mod outcome {
    pub const SUCCESS: &str = "success";
    pub const INVALID: &str = "invalid";
    pub const UNAVAILABLE: &str = "unavailable";
    pub const ERROR: &str = "error";
}

/// Metrics for the prediction service, with their own registry
pub struct PredictionMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    duration_seconds: Histogram,
    model_loaded: IntGauge,
}

impl PredictionMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("predict_requests_total", "Total number of prediction requests")
                .namespace("parados"),
            &["outcome"],
        )?;

        let duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "predict_duration_seconds",
                "Prediction request duration in seconds",
            )
            .namespace("parados")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;

        let model_loaded = IntGauge::with_opts(
            Opts::new("model_loaded", "Whether a model is loaded (1) or not (0)")
                .namespace("parados"),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(duration_seconds.clone()))?;
        registry.register(Box::new(model_loaded.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            duration_seconds,
            model_loaded,
        })
    }

    /// Record a finished predict request
    pub fn record_request(&self, outcome: &str, duration_secs: f64) {
        self.requests_total.with_label_values(&[outcome]).inc();
        self.duration_seconds.observe(duration_secs);
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.model_loaded.set(i64::from(loaded));
    }

    pub fn requests(&self, outcome: &str) -> u64 {
        self.requests_total.with_label_values(&[outcome]).get()
    }

    /// Text exposition of every metric in the registry
    pub fn encode(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| TelemetryError::Encoding(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Encoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_encode() {
        let metrics = PredictionMetrics::new().unwrap();
        metrics.record_request(outcome::SUCCESS, 0.01);
        metrics.record_request(outcome::SUCCESS, 0.02);
        metrics.record_request(outcome::UNAVAILABLE, 0.0);
        metrics.set_model_loaded(true);

        assert_eq!(metrics.requests(outcome::SUCCESS), 2);
        assert_eq!(metrics.requests(outcome::INVALID), 0);

        let text = metrics.encode().unwrap();
        assert!(text.contains("parados_predict_requests_total{outcome=\"success\"} 2"));
        assert!(text.contains("parados_model_loaded 1"));
        assert!(text.contains("parados_predict_duration_seconds_count 3"));
    }

    #[test]
    fn test_independent_registries() {
        let a = PredictionMetrics::new().unwrap();
        let b = PredictionMetrics::new().unwrap();
        a.record_request(outcome::ERROR, 0.1);
        assert_eq!(b.requests(outcome::ERROR), 0);
    }
}
