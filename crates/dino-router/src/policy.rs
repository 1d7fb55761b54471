use crate::descriptor::ServiceDescriptor;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Tag-based selection strategy. Unknown policy strings normalize to
/// `FirstHealthy` rather than erroring — see `SelectionPolicy::parse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPolicy {
	FirstHealthy,
	RoundRobin,
	LowestLatency,
}

impl SelectionPolicy {
	pub const DEFAULT_NAME: &'static str = "first_healthy";

	/// Normalize (lower-case, trim) and map to a known policy; anything
	/// unrecognized — including the empty string — falls back to
	/// `FirstHealthy`.
	pub fn parse(raw: &str) -> Self {
		match raw.trim().to_ascii_lowercase().as_str() {
			"round_robin" => Self::RoundRobin,
			"lowest_latency" => Self::LowestLatency,
			_ => Self::FirstHealthy,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::FirstHealthy => "first_healthy",
			Self::RoundRobin => "round_robin",
			Self::LowestLatency => "lowest_latency",
		}
	}
}

/// Per-tag monotonic cursors backing `round_robin` selection. Lives
/// alongside (not inside) the registry: the cursor survives descriptors
/// coming and going, so a tag's rotation doesn't reset just because one
/// candidate was briefly unregistered.
#[derive(Default)]
pub struct RoundRobinState {
	cursors: Mutex<HashMap<String, usize>>,
}

impl RoundRobinState {
	pub fn new() -> Self {
		Self::default()
	}

	fn next(&self, tag: &str, len: usize) -> usize {
		let mut guard = self.cursors.lock();
		let cursor = guard.entry(tag.to_ascii_lowercase()).or_insert(0);
		let chosen = *cursor % len;
		*cursor = cursor.wrapping_add(1);
		chosen
	}
}

/// Select among `healthy` (already filtered, non-empty) per `policy`, for
/// round-robin tracking rotation under `tag`.
pub fn select<'a>(
	healthy: &'a [Arc<ServiceDescriptor>],
	tag: &str,
	policy: SelectionPolicy,
	round_robin: &RoundRobinState,
) -> &'a Arc<ServiceDescriptor> {
	debug_assert!(!healthy.is_empty());
	match policy {
		SelectionPolicy::FirstHealthy => healthy.iter().min_by(|a, b| a.name.cmp(&b.name)).expect("non-empty"),
		SelectionPolicy::RoundRobin => {
			let mut sorted: Vec<&Arc<ServiceDescriptor>> = healthy.iter().collect();
			sorted.sort_by(|a, b| a.name.cmp(&b.name));
			let idx = round_robin.next(tag, sorted.len());
			sorted[idx]
		},
		SelectionPolicy::LowestLatency => healthy
			.iter()
			.min_by(|a, b| {
				a.latency_ms_or_infinity()
					.partial_cmp(&b.latency_ms_or_infinity())
					.unwrap_or(std::cmp::Ordering::Equal)
					.then_with(|| a.name.cmp(&b.name))
			})
			.expect("non-empty"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::health::{HealthSnapshot, HealthState};
	use serde_json::Value;

	fn descriptor(name: &str, latency_ms: Option<f64>) -> Arc<ServiceDescriptor> {
		Arc::new(ServiceDescriptor {
			name: name.to_string(),
			version: "1.0.0".to_string(),
			tags: vec!["llm".to_string()],
			adapter_kind: None,
			adapter_config: Value::Object(Default::default()),
			input_schema: None,
			output_schema: None,
			rate_limits: None,
			health: latency_ms.map(|l| HealthSnapshot::new(HealthState::Healthy, l)),
			metadata: Value::Object(Default::default()),
		})
	}

	#[test]
	fn parse_falls_back_to_first_healthy() {
		assert_eq!(SelectionPolicy::parse("ROUND_ROBIN "), SelectionPolicy::RoundRobin);
		assert_eq!(SelectionPolicy::parse("bogus"), SelectionPolicy::FirstHealthy);
		assert_eq!(SelectionPolicy::parse(""), SelectionPolicy::FirstHealthy);
	}

	#[test]
	fn first_healthy_picks_lexicographically_smallest() {
		let healthy = vec![descriptor("zebra", None), descriptor("alpha", None)];
		let rr = RoundRobinState::new();
		let chosen = select(&healthy, "llm", SelectionPolicy::FirstHealthy, &rr);
		assert_eq!(chosen.name, "alpha");
	}

	#[test]
	fn lowest_latency_picks_smallest_with_name_tiebreak() {
		let healthy = vec![descriptor("a", Some(300.0)), descriptor("b", Some(120.0))];
		let rr = RoundRobinState::new();
		let chosen = select(&healthy, "llm", SelectionPolicy::LowestLatency, &rr);
		assert_eq!(chosen.name, "b");
	}

	#[test]
	fn lowest_latency_treats_missing_as_infinity() {
		let healthy = vec![descriptor("a", None), descriptor("b", Some(10.0))];
		let rr = RoundRobinState::new();
		let chosen = select(&healthy, "llm", SelectionPolicy::LowestLatency, &rr);
		assert_eq!(chosen.name, "b");
	}

	#[test]
	fn round_robin_alternates_starting_from_smallest_name() {
		let healthy = vec![descriptor("y", None), descriptor("x", None)];
		let rr = RoundRobinState::new();
		let mut picks = Vec::new();
		for _ in 0..10 {
			picks.push(select(&healthy, "t", SelectionPolicy::RoundRobin, &rr).name.clone());
		}
		assert_eq!(picks.iter().filter(|n| n.as_str() == "x").count(), 5);
		assert_eq!(picks.iter().filter(|n| n.as_str() == "y").count(), 5);
		assert_eq!(picks[0], "x");
		assert_eq!(picks[1], "y");
	}
}
