use serde::Serialize;

/// Informational build metadata exposed by `GET /version`.
///
/// `build` and `commit` come from the environment at process startup
/// (`DINO_BUILD`, `DINO_COMMIT`); neither is required and both are `None`
/// when unset, matching the source's best-effort version lookup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
	pub version: String,
	pub build: Option<String>,
	pub commit: Option<String>,
}

impl BuildInfo {
	pub fn from_env() -> Self {
		Self {
			version: env!("CARGO_PKG_VERSION").to_string(),
			build: std::env::var("DINO_BUILD").ok().filter(|s| !s.is_empty()),
			commit: std::env::var("DINO_COMMIT").ok().filter(|s| !s.is_empty()),
		}
	}
}
