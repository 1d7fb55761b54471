use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete service health states.
///
/// Serializes and parses upper-case (`"HEALTHY"`, `"DEGRADED"`, `"DOWN"`)
/// regardless of the case used in config or a caller-supplied health
/// mapping, matching the source's `state.upper()` normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthState {
	Healthy,
	Degraded,
	Down,
}

impl HealthState {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Healthy => "HEALTHY",
			Self::Degraded => "DEGRADED",
			Self::Down => "DOWN",
		}
	}
}

impl fmt::Display for HealthState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for HealthState {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"HEALTHY" => Ok(Self::Healthy),
			"DEGRADED" => Ok(Self::Degraded),
			"DOWN" => Ok(Self::Down),
			other => Err(format!("unknown health state: {other}")),
		}
	}
}

/// Mutable health snapshot attached to a descriptor.
///
/// Absence of a snapshot on a descriptor means "optimistic-healthy" — see
/// `ServiceRegistry::is_healthy`. The snapshot itself, once present, is only
/// ever replaced wholesale by `ServiceRegistry::update_health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
	pub state: HealthState,
	pub latency_ms: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl HealthSnapshot {
	pub fn new(state: HealthState, latency_ms: f64) -> Self {
		Self {
			state,
			latency_ms,
			error: None,
		}
	}

	pub fn with_error(state: HealthState, latency_ms: f64, error: impl Into<String>) -> Self {
		Self {
			state,
			latency_ms,
			error: Some(error.into()),
		}
	}
}

/// Call `adapter.ping()` and classify the result per `§4.9 CheckHealth`:
/// `Ok(true)` -> Healthy, `Ok(false)` -> Degraded, ping failure -> Down.
/// Never panics; the caller always gets back a state plus elapsed wall time.
pub async fn ping_with_timing<F, Fut>(ping: F) -> (HealthState, u64)
where
	F: FnOnce() -> Fut,
	Fut: std::future::Future<Output = anyhow::Result<bool>>,
{
	let started = std::time::Instant::now();
	let state = match ping().await {
		Ok(true) => HealthState::Healthy,
		Ok(false) => HealthState::Degraded,
		Err(err) => {
			tracing::debug!(error = %err, "ping failed");
			HealthState::Down
		},
	};
	let duration_ms = started.elapsed().as_millis() as u64;
	(state, duration_ms)
}
