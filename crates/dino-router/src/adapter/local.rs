//! In-process function adapter. `function_path` is a `"module:function"`
//! token pair resolved against a fixed allowlist table — there is no
//! dynamic code loading, reflection, or plugin mechanism.

use super::Adapter;
use crate::error::RouterError;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;

type LocalFn = fn(Value) -> Value;

/// `echo` returns its payload verbatim. `uppercase_msg` is a small worked
/// example showing the allowlist isn't limited to identity functions.
fn echo(payload: Value) -> Value {
	payload
}

fn uppercase_msg(mut payload: Value) -> Value {
	if let Some(obj) = payload.as_object_mut()
		&& let Some(Value::String(msg)) = obj.get("msg").cloned()
	{
		obj.insert("msg".to_string(), Value::String(msg.to_uppercase()));
	}
	payload
}

/// module -> (function name -> implementation). Extending this table is the
/// only way to expose a new local function; there is deliberately no path
/// from manifest content to arbitrary code.
static ALLOWLIST: Lazy<HashMap<&'static str, HashMap<&'static str, LocalFn>>> = Lazy::new(|| {
	let mut modules = HashMap::new();
	let mut allowed = HashMap::new();
	allowed.insert("echo", echo as LocalFn);
	allowed.insert("uppercase_msg", uppercase_msg as LocalFn);
	modules.insert("allowed", allowed);
	modules
});

pub struct LocalAdapter {
	module: String,
	function: String,
}

impl LocalAdapter {
	pub fn from_config(config: &Value) -> Result<Self, RouterError> {
		let function_path = config
			.get("function_path")
			.and_then(Value::as_str)
			.ok_or_else(|| RouterError::validation("local adapter config missing 'function_path'"))?;
		let (module, function) = function_path
			.split_once(':')
			.ok_or_else(|| RouterError::validation(format!("malformed function_path '{function_path}', expected 'module:function'")))?;
		Ok(Self {
			module: module.to_string(),
			function: function.to_string(),
		})
	}

	fn resolve(&self) -> Result<LocalFn, RouterError> {
		ALLOWLIST
			.get(self.module.as_str())
			.and_then(|fns| fns.get(self.function.as_str()))
			.copied()
			.ok_or_else(|| {
				RouterError::adapter(
					"local",
					format!("'{}:{}' is not on the local adapter allowlist", self.module, self.function),
				)
			})
	}
}

#[async_trait]
impl Adapter for LocalAdapter {
	async fn ping(&self) -> anyhow::Result<bool> {
		Ok(self.resolve().is_ok())
	}

	async fn invoke(&self, payload: Value) -> Result<Value, RouterError> {
		let f = self.resolve()?;
		Ok(f(payload))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[tokio::test]
	async fn invokes_allowed_function() {
		let adapter = LocalAdapter::from_config(&json!({"function_path": "allowed:echo"})).unwrap();
		let out = adapter.invoke(json!({"msg": "hi"})).await.unwrap();
		assert_eq!(out, json!({"msg": "hi"}));
	}

	#[tokio::test]
	async fn rejects_function_outside_allowlist() {
		let adapter = LocalAdapter::from_config(&json!({"function_path": "evil:exec"})).unwrap();
		let err = adapter.invoke(json!({})).await.unwrap_err();
		assert!(matches!(err, RouterError::Adapter { kind, .. } if kind == "local"));
	}

	#[tokio::test]
	async fn ping_reflects_resolvability() {
		let ok = LocalAdapter::from_config(&json!({"function_path": "allowed:echo"})).unwrap();
		assert!(ok.ping().await.unwrap());
		let bad = LocalAdapter::from_config(&json!({"function_path": "nope:nope"})).unwrap();
		assert!(!bad.ping().await.unwrap());
	}

	#[test]
	fn malformed_function_path_is_rejected_at_config_time() {
		assert!(LocalAdapter::from_config(&json!({"function_path": "no-colon"})).is_err());
		assert!(LocalAdapter::from_config(&json!({})).is_err());
	}
}
