use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the global `tracing` subscriber.
///
/// Verbosity is controlled by `RUST_LOG` (defaults to `info` when unset).
/// When `json` is true, events are emitted as one-line JSON objects so the
/// router's structured log events (`service`, `event`, `duration_ms`, `ok`,
/// ...) land on stdout exactly as documented, rather than reformatted.
///
/// Safe to call more than once; subsequent calls are no-ops.
pub fn init(json: bool) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let registry = tracing_subscriber::registry().with(filter);
	let result = if json {
		registry.with(fmt::layer().json().flatten_event(true)).try_init()
	} else {
		registry.with(fmt::layer()).try_init()
	};
	if let Err(err) = result {
		// Already initialized (e.g. by a test harness); not fatal.
		tracing::trace!("telemetry already initialized: {err}");
	}
}
