//! Minimal counters/latency snapshot backing `GET /router/metrics` (§6.3).

use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Hash, EncodeLabelSet)]
struct ServiceLabel {
	service: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EncodeLabelValue)]
enum Outcome {
	Success,
	Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, EncodeLabelSet)]
struct OutcomeLabel {
	service: String,
	outcome: Outcome,
}

/// Process-lifetime counters and a latency histogram, keyed by service
/// name. Cheap to clone (everything inside is already `Arc`-backed by
/// `prometheus_client`), so it can be shared the same way the registry is.
#[derive(Clone)]
pub struct RouterMetrics {
	executions: Family<OutcomeLabel, Counter>,
	latency_ms: Family<ServiceLabel, Histogram>,
}

impl RouterMetrics {
	pub fn new() -> Self {
		Self {
			executions: Family::default(),
			latency_ms: Family::new_with_constructor(|| {
				Histogram::new([1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 5000.0].into_iter())
			}),
		}
	}

	pub fn record_success(&self, service: &str, duration_ms: f64) {
		self.executions
			.get_or_create(&OutcomeLabel {
				service: service.to_string(),
				outcome: Outcome::Success,
			})
			.inc();
		self.latency_ms.get_or_create(&ServiceLabel { service: service.to_string() }).observe(duration_ms);
	}

	pub fn record_error(&self, service: &str, duration_ms: f64) {
		self.executions
			.get_or_create(&OutcomeLabel {
				service: service.to_string(),
				outcome: Outcome::Error,
			})
			.inc();
		self.latency_ms.get_or_create(&ServiceLabel { service: service.to_string() }).observe(duration_ms);
	}

	/// Snapshot of per-service success/error totals for `GET /router/metrics`
	/// — a plain JSON-friendly struct rather than the Prometheus text
	/// exposition format, per §6.3's "minimal counters/latencies snapshot".
	pub fn snapshot(&self, services: &[String]) -> Vec<ServiceMetricsSnapshot> {
		services
			.iter()
			.map(|service| {
				let success = self
					.executions
					.get_or_create(&OutcomeLabel {
						service: service.clone(),
						outcome: Outcome::Success,
					})
					.get();
				let error = self
					.executions
					.get_or_create(&OutcomeLabel {
						service: service.clone(),
						outcome: Outcome::Error,
					})
					.get();
				ServiceMetricsSnapshot {
					service: service.clone(),
					success_count: success,
					error_count: error,
				}
			})
			.collect()
	}
}

impl Default for RouterMetrics {
	fn default() -> Self {
		Self::new()
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceMetricsSnapshot {
	pub service: String,
	pub success_count: u64,
	pub error_count: u64,
}
