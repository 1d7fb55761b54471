mod http;

use anyhow::Context;
use clap::Parser;
use dino_core::version::BuildInfo;
use dino_router::ServiceRegistry;
use dino_router::ServiceRouter;
use std::sync::Arc;

/// Service Router — dispatches requests to registered backend services
/// under policy-driven selection, rate limiting, and schema validation.
#[derive(Debug, Parser)]
#[command(name = "dino-router", version)]
struct Cli {
	/// Path to the service manifest. Defaults to `DINO_SERVICES_FILE`, or
	/// `config/services.lmstudio.yaml` if that's unset too.
	#[arg(long)]
	services_file: Option<String>,

	/// Address to bind the HTTP surface to.
	#[arg(long, default_value = "0.0.0.0:8088")]
	addr: String,

	/// Emit structured JSON logs instead of human-readable ones.
	#[arg(long, default_value_t = true)]
	json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	dino_core::telemetry::init(cli.json_logs);

	let manifest_path = cli.services_file.clone().unwrap_or_else(dino_router::config::manifest_path);
	let registry = Arc::new(ServiceRegistry::new());
	for descriptor in dino_router::config::load_manifest(&manifest_path).await {
		tracing::info!(service = %descriptor.name, "registered service from manifest");
		registry.register(descriptor);
	}
	tracing::info!(path = %manifest_path, count = registry.len(), "service manifest loaded");

	let router = Arc::new(ServiceRouter::new(registry));
	let state = http::AppState {
		router,
		build_info: BuildInfo::from_env(),
	};

	let app = http::build(state);
	let listener = tokio::net::TcpListener::bind(&cli.addr)
		.await
		.with_context(|| format!("failed to bind {}", cli.addr))?;
	tracing::info!(addr = %cli.addr, "dino-router listening");

	let mut shutdown = dino_core::signal::shutdown_trigger();
	axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			shutdown.signaled().await;
			tracing::info!("shutdown signal received, draining connections");
		})
		.await
		.context("server loop exited with an error")?;

	Ok(())
}
