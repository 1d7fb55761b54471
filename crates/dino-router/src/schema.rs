//! A minimal JSON-Schema subset, enough for the manifests this router reads:
//! object roots with typed properties and `required`, array `items.type`,
//! `minLength` on strings, `minItems` on arrays. No `oneOf`, `$ref`, formats,
//! or numeric ranges — see the crate-level docs for the full list of
//! exclusions.
//!
//! A [`CompiledSchema`] is built once, at registration time, from the raw
//! `serde_json::Value` schema on a descriptor (see `descriptor::ServiceDescriptor`)
//! and reused for every subsequent call — replacing the source's per-request
//! dynamic model construction with a cached validator.

use crate::error::RouterError;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonType {
	String,
	Integer,
	Number,
	Boolean,
	Array,
	Object,
}

impl JsonType {
	fn parse(raw: &str) -> Option<Self> {
		match raw {
			"string" => Some(Self::String),
			"integer" => Some(Self::Integer),
			"number" => Some(Self::Number),
			"boolean" => Some(Self::Boolean),
			"array" => Some(Self::Array),
			"object" => Some(Self::Object),
			_ => None,
		}
	}

	fn matches(self, v: &Value) -> bool {
		match self {
			Self::String => v.is_string(),
			Self::Integer => v.is_i64() || v.is_u64(),
			Self::Number => v.is_number(),
			Self::Boolean => v.is_boolean(),
			Self::Array => v.is_array(),
			Self::Object => v.is_object(),
		}
	}

	fn name(self) -> &'static str {
		match self {
			Self::String => "string",
			Self::Integer => "integer",
			Self::Number => "number",
			Self::Boolean => "boolean",
			Self::Array => "array",
			Self::Object => "object",
		}
	}
}

#[derive(Debug, Clone)]
struct PropertySchema {
	jtype: Option<JsonType>,
	min_length: Option<u64>,
	min_items: Option<u64>,
	items: Option<Box<PropertySchema>>,
}

#[derive(Debug, Clone)]
enum Root {
	/// `{"type": "object", "properties": {...}, "required": [...]}`
	Object {
		properties: Vec<(String, PropertySchema)>,
		required: Vec<String>,
	},
	/// Any other declared root `type`; the payload is validated wrapped as
	/// `{"value": payload}` and unwrapped again on success.
	Scalar(PropertySchema),
}

#[derive(Debug, Clone)]
pub struct CompiledSchema {
	root: Root,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
	pub path: String,
	pub message: String,
}

fn coerce_nonneg_int(v: Option<&Value>) -> Option<u64> {
	match v? {
		Value::Number(n) => {
			if let Some(u) = n.as_u64() {
				Some(u)
			} else {
				n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)
			}
		},
		_ => None,
	}
}

fn compile_property(prop: &Value) -> PropertySchema {
	let Value::Object(map) = prop else {
		return PropertySchema {
			jtype: None,
			min_length: None,
			min_items: None,
			items: None,
		};
	};
	let jtype = map.get("type").and_then(Value::as_str).and_then(JsonType::parse);
	let min_length = coerce_nonneg_int(map.get("minLength"));
	let min_items = coerce_nonneg_int(map.get("minItems"));
	let items = map.get("items").map(|i| Box::new(compile_property(i)));
	PropertySchema {
		jtype,
		min_length,
		min_items,
		items,
	}
}

impl CompiledSchema {
	pub fn compile(schema: &Value) -> Self {
		let obj = schema.as_object();
		let stype = obj.and_then(|o| o.get("type")).and_then(Value::as_str).unwrap_or("object");

		if stype != "object" {
			return Self {
				root: Root::Scalar(compile_property(schema)),
			};
		}

		let mut properties = Vec::new();
		if let Some(props) = obj.and_then(|o| o.get("properties")).and_then(Value::as_object) {
			for (key, prop) in props {
				properties.push((key.clone(), compile_property(prop)));
			}
		}
		let required = obj
			.and_then(|o| o.get("required"))
			.and_then(Value::as_array)
			.map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
			.unwrap_or_default();

		Self {
			root: Root::Object { properties, required },
		}
	}

	/// Validate `payload`, returning the validated value with `null`-valued
	/// keys stripped on success, or a `RouterError::Validation` carrying a
	/// list of `{path, message}` issues on failure.
	pub fn validate(&self, payload: &Value, service: &str, action: &str) -> Result<Value, RouterError> {
		let mut issues = Vec::new();
		let validated = match &self.root {
			Root::Object { properties, required } => {
				let map = match payload.as_object() {
					Some(m) => m.clone(),
					None => {
						issues.push(ValidationIssue {
							path: "$".to_string(),
							message: "expected an object".to_string(),
						});
						Map::new()
					},
				};
				let mut out = validate_object(&map, properties, required, &mut issues);
				out.retain(|_, v| !v.is_null());
				Value::Object(out)
			},
			Root::Scalar(prop) => {
				let wrapped = Value::Object(Map::from_iter([("value".to_string(), payload.clone())]));
				let wrapped_required = vec!["value".to_string()];
				let props = vec![("value".to_string(), prop.clone())];
				let map = wrapped.as_object().unwrap();
				let out = validate_object(map, &props, &wrapped_required, &mut issues);
				out.get("value").cloned().unwrap_or(Value::Null)
			},
		};

		if issues.is_empty() {
			Ok(validated)
		} else {
			Err(RouterError::validation_with_details(
				format!("{action} validation failed for '{service}'"),
				serde_json::to_value(issues).unwrap_or(Value::Null),
			))
		}
	}
}

fn validate_object(
	payload: &Map<String, Value>,
	properties: &[(String, PropertySchema)],
	required: &[String],
	issues: &mut Vec<ValidationIssue>,
) -> Map<String, Value> {
	let mut out = payload.clone();

	for (key, prop) in properties {
		let is_required = required.iter().any(|r| r == key);
		match payload.get(key) {
			None | Some(Value::Null) => {
				if is_required {
					issues.push(ValidationIssue {
						path: format!("$.{key}"),
						message: "field is required".to_string(),
					});
				}
				out.remove(key);
			},
			Some(value) => {
				validate_value(key, value, prop, issues);
			},
		}
	}

	for key in required {
		if !properties.iter().any(|(k, _)| k == key) && !payload.contains_key(key) {
			issues.push(ValidationIssue {
				path: format!("$.{key}"),
				message: "field is required".to_string(),
			});
		}
	}

	// Keys not declared in `properties` pass through untouched — additional
	// properties are allowed.
	out
}

fn validate_value(key: &str, value: &Value, prop: &PropertySchema, issues: &mut Vec<ValidationIssue>) {
	if let Some(jtype) = prop.jtype {
		if !jtype.matches(value) {
			issues.push(ValidationIssue {
				path: format!("$.{key}"),
				message: format!("expected type {}", jtype.name()),
			});
			return;
		}
		if jtype == JsonType::String
			&& let (Some(min), Some(s)) = (prop.min_length, value.as_str())
			&& (s.chars().count() as u64) < min
		{
			issues.push(ValidationIssue {
				path: format!("$.{key}"),
				message: format!("string shorter than minLength {min}"),
			});
		}
		if jtype == JsonType::Array && let Some(items) = value.as_array() {
			if let Some(min) = prop.min_items
				&& (items.len() as u64) < min
			{
				issues.push(ValidationIssue {
					path: format!("$.{key}"),
					message: format!("array shorter than minItems {min}"),
				});
			}
			if let Some(item_schema) = &prop.items {
				for (idx, item) in items.iter().enumerate() {
					validate_value(&format!("{key}[{idx}]"), item, item_schema, issues);
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn compile(schema: Value) -> CompiledSchema {
		CompiledSchema::compile(&schema)
	}

	#[test]
	fn passes_through_with_no_constraints() {
		let schema = compile(json!({"type": "object"}));
		let out = schema.validate(&json!({"a": 1, "b": null}), "svc", "input").unwrap();
		// additional properties pass through untyped; null-valued keys are
		// excluded from the result regardless of whether they were declared.
		assert_eq!(out["a"], 1);
		assert!(out.get("b").is_none());
	}

	#[test]
	fn required_field_missing_fails() {
		let schema = compile(json!({
			"type": "object",
			"properties": {"msg": {"type": "string", "minLength": 1}},
			"required": ["msg"]
		}));
		let err = schema.validate(&json!({}), "echo", "input").unwrap_err();
		assert!(matches!(err, RouterError::Validation { .. }));
	}

	#[test]
	fn required_field_present_succeeds_and_strips_nulls() {
		let schema = compile(json!({
			"type": "object",
			"properties": {
				"msg": {"type": "string", "minLength": 1},
				"note": {"type": "string"}
			},
			"required": ["msg"]
		}));
		let out = schema
			.validate(&json!({"msg": "hi", "note": null, "extra": true}), "echo", "input")
			.unwrap();
		assert_eq!(out["msg"], "hi");
		assert!(out.get("note").is_none());
		assert_eq!(out["extra"], true);
	}

	#[test]
	fn min_length_violation_fails() {
		let schema = compile(json!({
			"type": "object",
			"properties": {"msg": {"type": "string", "minLength": 3}},
			"required": ["msg"]
		}));
		assert!(schema.validate(&json!({"msg": "hi"}), "echo", "input").is_err());
	}

	#[test]
	fn array_items_and_min_items() {
		let schema = compile(json!({
			"type": "object",
			"properties": {
				"tags": {"type": "array", "minItems": 2, "items": {"type": "string"}}
			},
			"required": ["tags"]
		}));
		assert!(schema.validate(&json!({"tags": ["a"]}), "svc", "input").is_err());
		assert!(schema.validate(&json!({"tags": [1, 2]}), "svc", "input").is_err());
		assert!(schema.validate(&json!({"tags": ["a", "b"]}), "svc", "input").is_ok());
	}

	#[test]
	fn non_object_root_wraps_and_unwraps() {
		let schema = compile(json!({"type": "string", "minLength": 1}));
		let out = schema.validate(&json!("hello"), "svc", "output").unwrap();
		assert_eq!(out, json!("hello"));
		assert!(schema.validate(&json!(""), "svc", "output").is_err());
	}
}
