use serde_json::Value;

/// Closed error taxonomy for the router core.
///
/// Callers are expected to match on variants (not on `Display` text) to
/// decide how to react; the optional `details` payload on `Validation` and
/// `Adapter` carries structured context for logging or an HTTP mapping layer.
#[derive(thiserror::Error, Debug)]
pub enum RouterError {
	#[error("service '{0}' not found")]
	ServiceNotFound(String),
	#[error("{message}")]
	Validation {
		message: String,
		details: Option<Value>,
	},
	#[error("no healthy service available for tag '{tag}' with policy '{policy}'")]
	NoHealthyService { tag: String, policy: String },
	#[error("adapter error ({kind}): {reason}")]
	Adapter { kind: String, reason: String },
	#[error("{method} {path} is not implemented")]
	NotImplemented { method: String, path: String },
}

impl RouterError {
	pub fn service_not_found(name: impl Into<String>) -> Self {
		Self::ServiceNotFound(name.into())
	}

	pub fn validation(message: impl Into<String>) -> Self {
		Self::Validation {
			message: message.into(),
			details: None,
		}
	}

	pub fn validation_with_details(message: impl Into<String>, details: Value) -> Self {
		Self::Validation {
			message: message.into(),
			details: Some(details),
		}
	}

	pub fn adapter(kind: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::Adapter {
			kind: kind.into(),
			reason: reason.into(),
		}
	}

	/// Stable discriminant an HTTP collaborator can map to a status code
	/// without pattern-matching on `Display` text.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::ServiceNotFound(_) => "service_not_found",
			Self::Validation { .. } => "validation_error",
			Self::NoHealthyService { .. } => "no_healthy_service",
			Self::Adapter { .. } => "adapter_error",
			Self::NotImplemented { .. } => "not_implemented",
		}
	}
}
