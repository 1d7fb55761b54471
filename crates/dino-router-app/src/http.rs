//! Thin HTTP surface over the router core (§6.3). Out-of-scope as a
//! "collaborator" per the specification's own framing, but wired up here so
//! the core is reachable the way the source exposes it.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dino_core::version::BuildInfo;
use dino_router::{RouterError, ServiceRouter};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
	pub router: Arc<ServiceRouter>,
	pub build_info: BuildInfo,
}

pub fn build(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/version", get(version))
		.route("/router/execute", post(router_execute))
		.route("/router/executeBy", post(router_execute_by))
		.route("/router/metrics", get(router_metrics))
		.with_state(state)
}

#[derive(Serialize)]
struct HealthChecks {
	router: &'static str,
	adapters: &'static str,
	storage: &'static str,
	time: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
	status: &'static str,
	checks: HealthChecks,
}

/// `GET /health`. The router and its adapters are the only checks this
/// binary actually owns; `storage` and `time` report `"ok"` unconditionally
/// — they describe external collaborators out of this crate's scope.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
	let registered = state.router.registry().len();
	let status = if registered == 0 { "degraded" } else { "ok" };
	let code = if status == "ok" { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
	let body = HealthResponse {
		status,
		checks: HealthChecks {
			router: "ok",
			adapters: if registered == 0 { "degraded" } else { "ok" },
			storage: "ok",
			time: "ok",
		},
	};
	(code, Json(body))
}

async fn version(State(state): State<AppState>) -> impl IntoResponse {
	Json(state.build_info)
}

#[derive(Deserialize)]
struct ExecuteRequest {
	service: String,
	#[serde(default)]
	payload: Value,
}

async fn router_execute(State(state): State<AppState>, Json(req): Json<ExecuteRequest>) -> Response {
	match state.router.execute(&req.service, req.payload).await {
		Ok(result) => Json(result).into_response(),
		Err(err) => error_response(err),
	}
}

#[derive(Deserialize)]
struct ExecuteByTagRequest {
	tag: String,
	#[serde(default)]
	payload: Value,
	#[serde(default = "default_policy")]
	policy: String,
}

fn default_policy() -> String {
	"first_healthy".to_string()
}

async fn router_execute_by(State(state): State<AppState>, Json(req): Json<ExecuteByTagRequest>) -> Response {
	match state.router.execute_by_tag(&req.tag, req.payload, &req.policy).await {
		Ok(result) => Json(result).into_response(),
		Err(err) => error_response(err),
	}
}

async fn router_metrics(State(state): State<AppState>) -> impl IntoResponse {
	let names: Vec<String> = state.router.registry().list().iter().map(|d| d.name.clone()).collect();
	Json(state.router.metrics().snapshot(&names))
}

/// Map the core's typed errors to HTTP statuses per §7: the core raises
/// typed errors and leaves status mapping to the collaborator (this
/// module).
fn error_response(err: RouterError) -> Response {
	let status = match &err {
		RouterError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
		RouterError::Validation { .. } => StatusCode::BAD_REQUEST,
		RouterError::NoHealthyService { .. } => StatusCode::SERVICE_UNAVAILABLE,
		RouterError::Adapter { .. } => StatusCode::INTERNAL_SERVER_ERROR,
		RouterError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
	};
	(status, Json(json!({"error": err.kind(), "message": err.to_string()}))).into_response()
}
