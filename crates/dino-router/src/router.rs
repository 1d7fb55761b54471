use crate::adapter::{self, Adapter};
use crate::descriptor::ServiceDescriptor;
use crate::error::RouterError;
use crate::health::{HealthSnapshot, HealthState};
use crate::metrics::RouterMetrics;
use crate::policy::{self, RoundRobinState, SelectionPolicy};
use crate::ratelimit::{self, RateLimiter};
use crate::registry::ServiceRegistry;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Orchestrates the full request pipeline described in §2's dataflow:
/// lookup → adapter resolution → rate limit → input validation → invoke →
/// output validation → health update → metrics → log.
///
/// Constructed once per process and shared behind an `Arc` — there is no
/// lazily-initialized global singleton here, by design (see the source's
/// "global registry/router singleton" design note).
pub struct ServiceRouter {
	registry: Arc<ServiceRegistry>,
	rate_limiter: RateLimiter,
	round_robin: RoundRobinState,
	metrics: RouterMetrics,
}

/// One line of the structured log contract (§4.9 "Logging contract").
/// `tag`, `policy`, and `error` are emitted as empty strings rather than
/// omitted when not applicable to the event — `tracing`'s field list is
/// fixed at the macro call site, so this is the closest practical match to
/// "present when applicable" without hand-rolling a dynamic JSON emitter.
fn log_event(service: &str, event: &str, duration_ms: u64, ok: bool, tag: Option<&str>, policy: Option<&str>, error: Option<&str>) {
	let tag = tag.unwrap_or_default();
	let policy = policy.unwrap_or_default();
	let error = error.unwrap_or_default();
	if ok {
		tracing::info!(service, event, duration_ms, ok, tag, policy, error, "routed");
	} else {
		tracing::error!(service, event, duration_ms, ok, tag, policy, error, "routed");
	}
}

impl ServiceRouter {
	pub fn new(registry: Arc<ServiceRegistry>) -> Self {
		Self {
			registry,
			rate_limiter: RateLimiter::new(),
			round_robin: RoundRobinState::new(),
			metrics: RouterMetrics::new(),
		}
	}

	pub fn registry(&self) -> &Arc<ServiceRegistry> {
		&self.registry
	}

	pub fn metrics(&self) -> &RouterMetrics {
		&self.metrics
	}

	/// Build (not cache) an adapter for a descriptor. Adapters are cheap
	/// value objects over their own transport state (an `HttpLlmAdapter`
	/// owns a pooled `reqwest::Client`), so per-call construction is fine —
	/// see §5's "Adapters ... may be created per-call or cached". Used by
	/// `check_health`, which has no rate-limit/validation steps to interleave
	/// adapter resolution with; `execute` resolves the kind and builds the
	/// adapter as two separate steps — see below.
	fn build_adapter(desc: &ServiceDescriptor) -> Result<Box<dyn Adapter>, RouterError> {
		let kind = desc
			.adapter_kind
			.as_ref()
			.ok_or_else(|| RouterError::validation(format!("missing adapter kind for service '{}'", desc.name)))?;
		adapter::make_adapter(kind, &desc.adapter_config)
	}

	/// `Execute(name, payload)` per §4.9.
	pub async fn execute(&self, name: &str, payload: Value) -> Result<Value, RouterError> {
		let started = Instant::now();

		let desc = match self.registry.require_by_name(name) {
			Ok(desc) => desc,
			Err(err) => {
				log_event(name, "execute", elapsed_ms(started), false, None, None, Some(&err.to_string()));
				return Err(err);
			},
		};

		// Step 3: resolve the adapter kind (presence only). The adapter
		// itself isn't built until step 6, after rate limiting and input
		// validation have had a chance to swallow the call to `null`.
		let kind = match &desc.adapter_kind {
			Some(kind) => kind,
			None => {
				let err = RouterError::validation(format!("missing adapter kind for service '{name}'"));
				log_event(name, "execute", elapsed_ms(started), false, None, None, Some(&err.to_string()));
				return Err(err);
			},
		};

		if let Some(rpm) = ratelimit::resolve_rpm(desc.rate_limits.as_ref())
			&& rpm > 0
			&& !self.rate_limiter.allow(name, rpm)
		{
			let message = format!("rate limit exceeded: {rpm} rpm");
			self.metrics.record_error(name, elapsed_ms(started) as f64);
			log_event(name, "execute", elapsed_ms(started), false, None, None, Some(&message));
			return Ok(Value::Null);
		}

		let validated_input = match &desc.input_schema {
			Some(schema) => match schema.validate(&payload, name, "input") {
				Ok(v) => v,
				Err(err) => {
					self.metrics.record_error(name, elapsed_ms(started) as f64);
					log_event(name, "execute", elapsed_ms(started), false, None, None, Some(&err.to_string()));
					return Ok(Value::Null);
				},
			},
			None => payload,
		};

		// Step 6: build (not cache) the adapter and invoke it. A construction
		// failure (malformed adapter_config, unknown kind) is treated the
		// same as an invocation failure, not a pre-check — it surfaces only
		// once the call has survived rate limiting and input validation.
		let adapter = match adapter::make_adapter(kind, &desc.adapter_config) {
			Ok(adapter) => adapter,
			Err(err) => {
				let duration = elapsed_ms(started);
				self.metrics.record_error(name, duration as f64);
				self.registry
					.update_health(name, HealthSnapshot::with_error(HealthState::Down, duration as f64, err.to_string()));
				log_event(name, "execute", duration, false, None, None, Some(&err.to_string()));
				return Err(err);
			},
		};

		let invoked = match adapter.invoke(validated_input).await {
			Ok(v) => v,
			Err(err) => {
				let duration = elapsed_ms(started);
				self.metrics.record_error(name, duration as f64);
				self.registry
					.update_health(name, HealthSnapshot::with_error(HealthState::Down, duration as f64, err.to_string()));
				log_event(name, "execute", duration, false, None, None, Some(&err.to_string()));
				return Err(err);
			},
		};

		let validated_output = match &desc.output_schema {
			Some(schema) => match schema.validate(&invoked, name, "output") {
				Ok(v) => v,
				Err(err) => {
					let duration = elapsed_ms(started);
					self.metrics.record_error(name, duration as f64);
					self.registry
						.update_health(name, HealthSnapshot::with_error(HealthState::Down, duration as f64, err.to_string()));
					log_event(name, "execute", duration, false, None, None, Some(&err.to_string()));
					return Err(err);
				},
			},
			None => invoked,
		};

		let duration = elapsed_ms(started);
		self.registry.update_health(name, HealthSnapshot::new(HealthState::Healthy, duration as f64));
		self.metrics.record_success(name, duration as f64);
		log_event(name, "execute", duration, true, None, None, None);
		Ok(validated_output)
	}

	/// `ExecuteByTag(tag, payload, policy)` per §4.8 / §4.9.
	pub async fn execute_by_tag(&self, tag: &str, payload: Value, policy: &str) -> Result<Value, RouterError> {
		let started = Instant::now();
		let policy = SelectionPolicy::parse(policy);

		let candidates = self.registry.get_by_tag(tag);
		if candidates.is_empty() {
			let err = RouterError::service_not_found(format!("tag '{tag}'"));
			log_event(tag, "route_select", 0, false, Some(tag), Some(policy.as_str()), Some(&err.to_string()));
			return Err(err);
		}

		let healthy: Vec<_> = candidates.into_iter().filter(|d| d.is_healthy()).collect();
		if healthy.is_empty() {
			let err = RouterError::NoHealthyService {
				tag: tag.to_string(),
				policy: policy.as_str().to_string(),
			};
			log_event(tag, "route_select", 0, false, Some(tag), Some(policy.as_str()), Some(&err.to_string()));
			return Err(err);
		}

		let chosen = policy::select(&healthy, tag, policy, &self.round_robin);
		log_event(&chosen.name, "route_select", elapsed_ms(started), true, Some(tag), Some(policy.as_str()), None);

		self.execute(&chosen.name, payload).await
	}

	/// `CheckHealth(name)` per §4.9.
	pub async fn check_health(&self, name: &str) -> Result<HealthSnapshot, RouterError> {
		let started = Instant::now();
		let desc = self.registry.require_by_name(name)?;
		let adapter = Self::build_adapter(&desc)?;

		let (state, duration_ms) = crate::health::ping_with_timing(|| async { adapter.ping().await }).await;
		let snapshot = HealthSnapshot::new(state, duration_ms as f64);
		self.registry.update_health(name, snapshot.clone());
		log_event(name, "check_health", elapsed_ms(started), state == HealthState::Healthy, None, None, None);
		Ok(snapshot)
	}
}

fn elapsed_ms(started: Instant) -> u64 {
	started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::descriptor::AdapterKind;
	use serde_json::json;

	fn local_echo_descriptor(name: &str, tags: &[&str], rate_limits: Option<serde_json::Map<String, Value>>) -> ServiceDescriptor {
		ServiceDescriptor {
			name: name.to_string(),
			version: "1.0.0".to_string(),
			tags: tags.iter().map(|t| t.to_string()).collect(),
			adapter_kind: Some(AdapterKind::Local),
			adapter_config: json!({"function_path": "allowed:echo"}),
			input_schema: Some(Arc::new(crate::schema::CompiledSchema::compile(&json!({
				"type": "object",
				"properties": {"msg": {"type": "string", "minLength": 1}},
				"required": ["msg"]
			})))),
			output_schema: None,
			rate_limits: rate_limits.map(|m| m.into_iter().collect()),
			health: None,
			metadata: Value::Object(Default::default()),
		}
	}

	#[tokio::test]
	async fn local_success_updates_health_and_returns_payload() {
		let registry = Arc::new(ServiceRegistry::new());
		registry.register(local_echo_descriptor("echo", &[], None));
		let router = ServiceRouter::new(registry.clone());

		let out = router.execute("echo", json!({"msg": "hi"})).await.unwrap();
		assert_eq!(out, json!({"msg": "hi"}));
		assert!(registry.get_by_name("echo").unwrap().is_healthy());
	}

	#[tokio::test]
	async fn validation_failure_returns_null_without_invoking() {
		let registry = Arc::new(ServiceRegistry::new());
		registry.register(local_echo_descriptor("echo", &[], None));
		let router = ServiceRouter::new(registry);

		let out = router.execute("echo", json!({})).await.unwrap();
		assert_eq!(out, Value::Null);
	}

	#[tokio::test]
	async fn validation_failure_short_circuits_before_adapter_is_built() {
		// A malformed `function_path` would fail adapter construction (step 6),
		// but input validation (step 5) runs first and swallows the call to
		// `null` before the adapter is ever touched.
		let registry = Arc::new(ServiceRegistry::new());
		let mut desc = local_echo_descriptor("echo", &[], None);
		desc.adapter_config = json!({"function_path": "no-colon"});
		registry.register(desc);
		let router = ServiceRouter::new(registry);

		let out = router.execute("echo", json!({})).await.unwrap();
		assert_eq!(out, Value::Null);
	}

	#[tokio::test]
	async fn malformed_adapter_config_surfaces_only_after_validation_passes() {
		let registry = Arc::new(ServiceRegistry::new());
		let mut desc = local_echo_descriptor("echo", &[], None);
		desc.adapter_config = json!({"function_path": "no-colon"});
		registry.register(desc);
		let router = ServiceRouter::new(registry.clone());

		let err = router.execute("echo", json!({"msg": "hi"})).await.unwrap_err();
		assert!(matches!(err, RouterError::Validation { .. }));
		assert!(!registry.get_by_name("echo").unwrap().is_healthy());
	}

	#[tokio::test]
	async fn rate_limit_exceeded_returns_null_on_third_call() {
		let mut limits = serde_json::Map::new();
		limits.insert("rpm".to_string(), json!(2));
		let registry = Arc::new(ServiceRegistry::new());
		registry.register(local_echo_descriptor("echo", &[], Some(limits)));
		let router = ServiceRouter::new(registry);

		assert!(router.execute("echo", json!({"msg": "a"})).await.unwrap().is_object());
		assert!(router.execute("echo", json!({"msg": "b"})).await.unwrap().is_object());
		assert_eq!(router.execute("echo", json!({"msg": "c"})).await.unwrap(), Value::Null);
	}

	#[tokio::test]
	async fn execute_by_tag_routes_by_lowest_latency_and_fails_over() {
		use crate::health::{HealthSnapshot, HealthState};

		let registry = Arc::new(ServiceRegistry::new());
		let mut a = local_echo_descriptor("a", &["llm"], None);
		a.health = Some(HealthSnapshot::new(HealthState::Healthy, 300.0));
		let mut b = local_echo_descriptor("b", &["llm"], None);
		b.health = Some(HealthSnapshot::new(HealthState::Healthy, 120.0));
		registry.register(a);
		registry.register(b);
		let router = ServiceRouter::new(registry.clone());

		let first = router.execute_by_tag("llm", json!({"msg": "hi"}), "lowest_latency").await.unwrap();
		assert_eq!(first, json!({"msg": "hi"}));

		// "b" had the lower latency and was chosen (and re-marked Healthy by
		// the invocation it just served); force it down to exercise failover.
		registry.update_health("b", HealthSnapshot::new(HealthState::Down, 5.0));
		let second = router
			.execute_by_tag("llm", json!({"msg": "hi"}), "lowest_latency")
			.await
			.unwrap();
		assert_eq!(second, json!({"msg": "hi"}), "should have failed over to 'a'");
	}

	#[tokio::test]
	async fn no_healthy_service_when_all_candidates_down() {
		use crate::health::{HealthSnapshot, HealthState};

		let registry = Arc::new(ServiceRegistry::new());
		let mut a = local_echo_descriptor("a", &["llm"], None);
		a.health = Some(HealthSnapshot::new(HealthState::Down, 0.0));
		registry.register(a);
		let router = ServiceRouter::new(registry);

		let err = router.execute_by_tag("llm", json!({"msg": "hi"}), "lowest_latency").await.unwrap_err();
		assert!(matches!(err, RouterError::NoHealthyService { .. }));
	}

	#[tokio::test]
	async fn round_robin_alternates_across_ten_calls() {
		let registry = Arc::new(ServiceRegistry::new());
		registry.register(local_echo_descriptor("x", &["t"], None));
		registry.register(local_echo_descriptor("y", &["t"], None));
		let router = ServiceRouter::new(registry.clone());

		for _ in 0..10 {
			router.execute_by_tag("t", json!({"msg": "hi"}), "round_robin").await.unwrap();
		}
	}

	#[tokio::test]
	async fn check_health_reports_healthy_for_resolvable_local_adapter() {
		let registry = Arc::new(ServiceRegistry::new());
		registry.register(local_echo_descriptor("echo", &[], None));
		let router = ServiceRouter::new(registry);

		let snapshot = router.check_health("echo").await.unwrap();
		assert_eq!(snapshot.state, HealthState::Healthy);
	}

	#[tokio::test]
	async fn check_health_reports_degraded_for_unresolvable_local_adapter() {
		// `LocalAdapter::ping` never raises; an unresolvable allowlist entry
		// reports `Ok(false)`, which maps to `Degraded`, not `Down`.
		let registry = Arc::new(ServiceRegistry::new());
		let mut desc = local_echo_descriptor("echo", &[], None);
		desc.adapter_config = json!({"function_path": "nope:nope"});
		registry.register(desc);
		let router = ServiceRouter::new(registry);

		let snapshot = router.check_health("echo").await.unwrap();
		assert_eq!(snapshot.state, HealthState::Degraded);
	}
}
