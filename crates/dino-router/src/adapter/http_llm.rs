//! Remote adapter for LM Studio-compatible HTTP endpoints.

use super::Adapter;
use crate::error::RouterError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(1);
const INVOKE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpLlmAdapter {
	base_url: String,
	client: reqwest::Client,
}

impl HttpLlmAdapter {
	pub fn from_config(config: &Value) -> Result<Self, RouterError> {
		let base_url = config
			.get("base_url")
			.and_then(Value::as_str)
			.ok_or_else(|| RouterError::validation("http_llm adapter config missing 'base_url'"))?;
		let client = reqwest::Client::builder()
			.build()
			.map_err(|e| RouterError::adapter("http_llm", format!("failed to build HTTP client: {e}")))?;
		Ok(Self {
			base_url: base_url.trim_end_matches('/').to_string(),
			client,
		})
	}
}

#[async_trait]
impl Adapter for HttpLlmAdapter {
	/// Short-timeout HEAD; on anything but a 2xx, fall back to a short-timeout
	/// GET. Success iff either yields 2xx. Transport failures on both count
	/// as an unreachable probe (`Ok(false)`), not an error — see the
	/// `Adapter::ping` contract.
	async fn ping(&self) -> anyhow::Result<bool> {
		let head = self.client.head(&self.base_url).timeout(PROBE_TIMEOUT).send().await;
		if let Ok(resp) = &head
			&& resp.status().is_success()
		{
			return Ok(true);
		}
		let get = self.client.get(&self.base_url).timeout(PROBE_TIMEOUT).send().await;
		Ok(get.map(|resp| resp.status().is_success()).unwrap_or(false))
	}

	async fn invoke(&self, payload: Value) -> Result<Value, RouterError> {
		let response = self
			.client
			.post(&self.base_url)
			.timeout(INVOKE_TIMEOUT)
			.json(&payload)
			.send()
			.await
			.map_err(|e| RouterError::adapter("http_llm", format!("request failed: {e}")))?;

		let status = response.status();
		if status.as_u16() >= 400 {
			return Err(RouterError::adapter("http_llm", format!("upstream returned status {status}")));
		}

		response
			.json::<Value>()
			.await
			.map_err(|e| RouterError::adapter("http_llm", format!("failed to parse response body: {e}")))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn requires_base_url() {
		assert!(HttpLlmAdapter::from_config(&json!({})).is_err());
	}

	#[test]
	fn trims_trailing_slash() {
		let adapter = HttpLlmAdapter::from_config(&json!({"base_url": "http://localhost:1234/"})).unwrap();
		assert_eq!(adapter.base_url, "http://localhost:1234");
	}
}
