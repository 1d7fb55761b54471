//! Service manifest loading per §4.10 and §6.1: read a YAML file, expand
//! `${VAR}`-style environment references inside `adapter_config`, and
//! soft-probe `http_llm` descriptors so a missing/unreachable endpoint
//! shows up as `Degraded` rather than failing the whole load.

use crate::adapter::http_llm::HttpLlmAdapter;
use crate::adapter::Adapter;
use crate::descriptor::{AdapterKind, ServiceDescriptor, ServiceDescriptorSpec};
use crate::health::{HealthSnapshot, HealthState};
use serde_json::Value;
use std::path::Path;

pub const DEFAULT_MANIFEST_ENV: &str = "DINO_SERVICES_FILE";
pub const DEFAULT_MANIFEST_PATH: &str = "config/services.lmstudio.yaml";

/// Resolve the manifest path: `DINO_SERVICES_FILE` if set, else the
/// built-in default.
pub fn manifest_path() -> String {
	std::env::var(DEFAULT_MANIFEST_ENV).unwrap_or_else(|_| DEFAULT_MANIFEST_PATH.to_string())
}

/// Read and compile every descriptor in the manifest at `path`. Per
/// §4.10 the loader never raises: a missing file or malformed top level
/// yields an empty list with a debug log, and a malformed individual entry
/// is skipped (also logged) rather than aborting the whole load.
pub async fn load_manifest(path: impl AsRef<Path>) -> Vec<ServiceDescriptor> {
	let path = path.as_ref();
	let raw = match tokio::fs::read_to_string(path).await {
		Ok(raw) => raw,
		Err(err) => {
			tracing::debug!(path = %path.display(), error = %err, "could not read service manifest");
			return Vec::new();
		},
	};

	let specs: Vec<ServiceDescriptorSpec> = match serde_yaml::from_str(&raw) {
		Ok(specs) => specs,
		Err(err) => {
			tracing::debug!(path = %path.display(), error = %err, "could not parse service manifest");
			return Vec::new();
		},
	};

	let mut descriptors = Vec::with_capacity(specs.len());
	for spec in specs {
		let name = spec.name.clone();
		let mut spec = spec;
		spec.adapter_config = expand_env(spec.adapter_config);

		let mut descriptor = spec.compile();
		soft_probe(&mut descriptor).await;
		tracing::debug!(service = %name, "loaded service descriptor");
		descriptors.push(descriptor);
	}
	descriptors
}

/// Recursively substitute `${VAR}` / `$VAR` references inside string leaves
/// of `adapter_config`, via the same shell-style expansion rules
/// `shellexpand` applies elsewhere in this workspace. Unset variables are
/// left as the literal (unexpanded) text — the loader never raises.
fn expand_env(value: Value) -> Value {
	match value {
		Value::String(s) => Value::String(shellexpand::env(&s).map(|c| c.into_owned()).unwrap_or(s)),
		Value::Array(items) => Value::Array(items.into_iter().map(expand_env).collect()),
		Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, expand_env(v))).collect()),
		other => other,
	}
}

/// Soft validation for freshly-loaded descriptors: an `http_llm` descriptor
/// missing `base_url` is marked `Degraded` without attempting a probe;
/// otherwise it's probed with the same short-timeout HEAD/GET as
/// `Adapter::ping`, and marked `Healthy`/`Degraded` accordingly. Every other
/// kind is left with no health snapshot (optimistic-healthy).
async fn soft_probe(descriptor: &mut ServiceDescriptor) {
	if descriptor.adapter_kind != Some(AdapterKind::HttpLlm) {
		return;
	}

	let Some(base_url) = descriptor.adapter_config.get("base_url").and_then(Value::as_str) else {
		descriptor.health = Some(HealthSnapshot::with_error(HealthState::Degraded, 0.0, "missing base_url"));
		return;
	};

	match HttpLlmAdapter::from_config(&descriptor.adapter_config) {
		Ok(adapter) => {
			let (state, latency_ms) = crate::health::ping_with_timing(|| async { adapter.ping().await }).await;
			descriptor.health = Some(HealthSnapshot::new(state, latency_ms as f64));
		},
		Err(err) => {
			tracing::debug!(base_url, error = %err, "skipping soft probe, invalid adapter_config");
			descriptor.health = Some(HealthSnapshot::with_error(HealthState::Degraded, 0.0, err.to_string()));
		},
	}
}
