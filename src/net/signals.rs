use formgraph_core::gql::Reloader;

const TARGET: &str = "formgraph::net::signals";

/// Resolves once the server should shut down
///
/// A hangup signal triggers a schema reload instead.
#[cfg(unix)]
pub async fn shutdown(reloader: Reloader) {
	use tokio::signal::unix::{SignalKind, signal};
	let (Ok(mut hangup), Ok(mut interrupt), Ok(mut quit), Ok(mut terminate)) = (
		signal(SignalKind::hangup()),
		signal(SignalKind::interrupt()),
		signal(SignalKind::quit()),
		signal(SignalKind::terminate()),
	) else {
		error!(target: TARGET, "Unable to listen for signals, falling back to ctrl-c");
		return ctrl_c().await;
	};
	let name = loop {
		tokio::select! {
			_ = hangup.recv() => {
				info!(target: TARGET, "Received SIGHUP, reloading the schema");
				if !reloader.notify() {
					warn!(target: TARGET, "The schema reloader has stopped");
				}
			},
			_ = interrupt.recv() => break "SIGINT",
			_ = quit.recv() => break "SIGQUIT",
			_ = terminate.recv() => break "SIGTERM",
		}
	};
	warn!(target: TARGET, "Received {name}, shutting down gracefully");
}

#[cfg(not(unix))]
pub async fn shutdown(_reloader: Reloader) {
	ctrl_c().await
}

async fn ctrl_c() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		error!(target: TARGET, "Unable to listen for ctrl-c: {e}");
		std::future::pending::<()>().await;
	}
	warn!(target: TARGET, "Received ctrl-c, shutting down gracefully");
}
