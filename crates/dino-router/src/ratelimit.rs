use crate::descriptor::RateLimits;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// Resolve a per-service requests-per-minute cap from its raw `rate_limits`
/// mapping, checking `rpm` then `per_minute` (case-insensitive on the key,
/// first match wins). Returns `None` — meaning "unlimited" — when neither
/// key is present or the value isn't a non-negative integer.
pub fn resolve_rpm(rate_limits: Option<&RateLimits>) -> Option<u64> {
	let map = rate_limits?;
	for candidate in ["rpm", "per_minute"] {
		if let Some(value) = map.iter().find(|(k, _)| k.eq_ignore_ascii_case(candidate)).map(|(_, v)| v) {
			if let Some(n) = value.as_u64() {
				return Some(n);
			}
			if let Some(f) = value.as_f64().filter(|f| *f >= 0.0) {
				return Some(f.round() as u64);
			}
		}
	}
	None
}

/// Sliding 60-second window limiter, one deque of call timestamps per
/// service name. `rpm == 0` means the service is blocked outright; `None`
/// (checked by the caller via [`resolve_rpm`]) means unlimited.
///
/// Mirrors the source's `_enforce_rate_limit`: expired timestamps are
/// trimmed from the front of the deque before counting, and admission pushes
/// a new timestamp only when the call is allowed.
pub struct RateLimiter {
	windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl Default for RateLimiter {
	fn default() -> Self {
		Self::new()
	}
}

impl RateLimiter {
	pub fn new() -> Self {
		Self {
			windows: Mutex::new(HashMap::new()),
		}
	}

	/// `true` if a call to `service` is admitted under `rpm` right now, given
	/// calls recorded so far in the trailing 60-second window. Admitting a
	/// call records it immediately so concurrent admission checks observe
	/// each other.
	pub fn allow(&self, service: &str, rpm: u64) -> bool {
		self.allow_at(service, rpm, Instant::now())
	}

	fn allow_at(&self, service: &str, rpm: u64, now: Instant) -> bool {
		if rpm == 0 {
			return false;
		}
		let mut guard = self.windows.lock();
		let deque = guard.entry(service.to_string()).or_default();
		while let Some(&front) = deque.front() {
			if now.duration_since(front) > WINDOW {
				deque.pop_front();
			} else {
				break;
			}
		}
		if (deque.len() as u64) >= rpm {
			return false;
		}
		deque.push_back(now);
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn resolve_rpm_checks_rpm_then_per_minute_case_insensitively() {
		let mut map = RateLimits::new();
		map.insert("RPM".to_string(), json!(30));
		assert_eq!(resolve_rpm(Some(&map)), Some(30));

		let mut map = RateLimits::new();
		map.insert("per_minute".to_string(), json!(12));
		assert_eq!(resolve_rpm(Some(&map)), Some(12));

		assert_eq!(resolve_rpm(None), None);
		assert_eq!(resolve_rpm(Some(&RateLimits::new())), None);
	}

	#[test]
	fn admits_up_to_rpm_then_blocks() {
		let limiter = RateLimiter::new();
		assert!(limiter.allow("echo", 2));
		assert!(limiter.allow("echo", 2));
		assert!(!limiter.allow("echo", 2));
	}

	#[test]
	fn zero_rpm_always_blocks() {
		let limiter = RateLimiter::new();
		assert!(!limiter.allow("echo", 0));
	}

	#[test]
	fn window_slides_past_expired_entries() {
		let limiter = RateLimiter::new();
		let t0 = Instant::now();
		assert!(limiter.allow_at("echo", 1, t0));
		assert!(!limiter.allow_at("echo", 1, t0 + Duration::from_secs(30)));
		assert!(limiter.allow_at("echo", 1, t0 + Duration::from_secs(61)));
	}

	#[test]
	fn services_have_independent_windows() {
		let limiter = RateLimiter::new();
		assert!(limiter.allow("a", 1));
		assert!(limiter.allow("b", 1));
		assert!(!limiter.allow("a", 1));
	}
}
