use crate::health::HealthSnapshot;
use crate::schema::CompiledSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Which adapter implementation a descriptor's `adapter_config` is
/// interpreted by. New kinds extend this enum; an unrecognized string in a
/// manifest is kept as `Other` so loading never fails on it — only the
/// adapter factory (`adapter::make_adapter`) rejects it, at invocation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterKind {
	Local,
	HttpLlm,
	Other(String),
}

impl AdapterKind {
	pub fn as_str(&self) -> &str {
		match self {
			Self::Local => "local",
			Self::HttpLlm => "http_llm",
			Self::Other(s) => s,
		}
	}

	/// Normalize a free-form manifest string (`kind` or legacy `adapter`
	/// field) the way the source's `_resolve_adapter_kind` does: trim and
	/// lower-case before matching known kinds.
	pub fn parse(raw: &str) -> Option<Self> {
		let trimmed = raw.trim();
		if trimmed.is_empty() {
			return None;
		}
		Some(match trimmed.to_ascii_lowercase().as_str() {
			"local" => Self::Local,
			"http_llm" | "lmstudio" | "http-llm" => Self::HttpLlm,
			other => Self::Other(other.to_string()),
		})
	}
}

impl Serialize for AdapterKind {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for AdapterKind {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;
		Self::parse(&raw).ok_or_else(|| serde::de::Error::custom("adapter kind must not be empty"))
	}
}

/// Raw `rate_limits` mapping on a descriptor, resolved by
/// `ratelimit::resolve_rpm` per the `rpm` / `per_minute` (case-insensitive)
/// lookup rules in the spec.
pub type RateLimits = HashMap<String, Value>;

/// Immutable-by-convention description of one registered service.
///
/// Everything except `health` is set once at registration and never mutated
/// in place; `health` is only ever replaced wholesale, and only through
/// `ServiceRegistry::update_health`. Cloning a descriptor is cheap — the
/// schemas are `Arc`-wrapped — which is what lets the registry hand out
/// lock-free snapshots.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
	pub name: String,
	pub version: String,
	pub tags: Vec<String>,
	pub adapter_kind: Option<AdapterKind>,
	pub adapter_config: Value,
	pub input_schema: Option<Arc<CompiledSchema>>,
	pub output_schema: Option<Arc<CompiledSchema>>,
	pub rate_limits: Option<RateLimits>,
	pub health: Option<HealthSnapshot>,
	pub metadata: Value,
}

impl ServiceDescriptor {
	/// Case-insensitive tag membership, matching `ServiceRegistry::get_by_tag`.
	pub fn has_tag(&self, tag: &str) -> bool {
		self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
	}

	/// `health` absent, or `health.state == Healthy`, counts as healthy —
	/// the "optimistic-by-default" rule newly-registered services get
	/// before their first ping or invocation.
	pub fn is_healthy(&self) -> bool {
		match &self.health {
			None => true,
			Some(h) => h.state == crate::health::HealthState::Healthy,
		}
	}

	/// `+inf` for missing/negative latency, matching `_select_lowest_latency`'s
	/// tie-break-to-infinity behavior for unranked candidates.
	pub fn latency_ms_or_infinity(&self) -> f64 {
		match &self.health {
			Some(h) if h.latency_ms >= 0.0 => h.latency_ms,
			_ => f64::INFINITY,
		}
	}
}

/// Wire shape of one manifest/API entry (`§6.1`), deserialized directly from
/// YAML or a `POST /router/register`-style JSON body before being compiled
/// into a [`ServiceDescriptor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptorSpec {
	pub name: String,
	#[serde(default)]
	pub version: String,
	#[serde(default)]
	pub tags: Vec<String>,
	/// Accepts either `kind` or the legacy `adapter` key; `kind` wins when
	/// both are present.
	#[serde(default)]
	pub kind: Option<String>,
	#[serde(default)]
	pub adapter: Option<String>,
	#[serde(default)]
	pub adapter_config: Value,
	#[serde(default)]
	pub input_schema: Option<Value>,
	#[serde(default)]
	pub output_schema: Option<Value>,
	#[serde(default)]
	pub rate_limits: Option<RateLimits>,
	#[serde(default = "default_metadata")]
	pub metadata: Value,
}

fn default_metadata() -> Value {
	Value::Object(Default::default())
}

impl ServiceDescriptorSpec {
	pub fn resolved_kind(&self) -> Option<AdapterKind> {
		self.kind
			.as_deref()
			.or(self.adapter.as_deref())
			.and_then(AdapterKind::parse)
	}

	pub fn compile(self) -> ServiceDescriptor {
		let adapter_kind = self.resolved_kind();
		ServiceDescriptor {
			name: self.name,
			version: self.version,
			tags: self.tags,
			adapter_kind,
			adapter_config: if self.adapter_config.is_null() {
				Value::Object(Default::default())
			} else {
				self.adapter_config
			},
			input_schema: self.input_schema.as_ref().map(|s| Arc::new(CompiledSchema::compile(s))),
			output_schema: self.output_schema.as_ref().map(|s| Arc::new(CompiledSchema::compile(s))),
			rate_limits: self.rate_limits,
			health: None,
			metadata: self.metadata,
		}
	}
}
