use tokio::sync::watch;

/// Fires once when the process receives `SIGINT`/ctrl-c (or, on unix, `SIGTERM`).
///
/// `dino-router-app`'s admin server awaits [`ShutdownTrigger::signaled`] to
/// stop accepting new connections; library code never touches this directly.
#[derive(Clone)]
pub struct ShutdownTrigger {
	rx: watch::Receiver<bool>,
}

pub fn shutdown_trigger() -> ShutdownTrigger {
	let (tx, rx) = watch::channel(false);
	tokio::spawn(async move {
		wait_for_signal().await;
		let _ = tx.send(true);
	});
	ShutdownTrigger { rx }
}

impl ShutdownTrigger {
	pub async fn signaled(&mut self) {
		// Already fired (possible if called after the signal arrived).
		if *self.rx.borrow() {
			return;
		}
		let _ = self.rx.changed().await;
	}
}

#[cfg(unix)]
async fn wait_for_signal() {
	use tokio::signal::unix::{SignalKind, signal};
	let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
	tokio::select! {
		_ = tokio::signal::ctrl_c() => {},
		_ = term.recv() => {},
	}
}

#[cfg(not(unix))]
async fn wait_for_signal() {
	let _ = tokio::signal::ctrl_c().await;
}
