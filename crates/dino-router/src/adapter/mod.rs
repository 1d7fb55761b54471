pub mod http_llm;
pub mod local;

use crate::descriptor::AdapterKind;
use crate::error::RouterError;
use async_trait::async_trait;
use serde_json::Value;

/// Invocation transport for one adapter kind.
///
/// `ping` must not raise under normal conditions — a failing reachability
/// check is reported as `Ok(false)`/`Err` to the caller, who maps it to a
/// health state (see `health::ping_with_timing`), not propagated as an
/// `Execute` failure.
#[async_trait]
pub trait Adapter: Send + Sync {
	async fn ping(&self) -> anyhow::Result<bool>;
	async fn invoke(&self, payload: Value) -> Result<Value, RouterError>;
}

/// Build an adapter for `kind`, configured from `config` (a descriptor's
/// `adapter_config`). Unknown kinds are rejected as validation errors, not
/// adapter errors — they're a manifest problem, not a transport one.
pub fn make_adapter(kind: &AdapterKind, config: &Value) -> Result<Box<dyn Adapter>, RouterError> {
	match kind {
		AdapterKind::Local => Ok(Box::new(local::LocalAdapter::from_config(config)?)),
		AdapterKind::HttpLlm => Ok(Box::new(http_llm::HttpLlmAdapter::from_config(config)?)),
		AdapterKind::Other(other) => Err(RouterError::validation(format!("unknown adapter kind '{other}'"))),
	}
}
