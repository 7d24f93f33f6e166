use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::cnf::RELOAD_CHANNEL_SIZE;

use super::cache::SchemaRegistry;

const TARGET: &str = "formgraph::gql::reload";

/// Turns descriptor change notifications into schema reloads
///
/// At most one reload runs at a time and at most one more is queued behind it. Notifications
/// arriving while one is queued are folded into it, since the queued reload reads the latest
/// descriptors anyway.
#[derive(Clone, Debug)]
pub struct Reloader {
	tx: mpsc::Sender<()>,
}

impl Reloader {
	/// Starts the reload task for a registry
	pub fn spawn(registry: Arc<SchemaRegistry>) -> (Self, JoinHandle<()>) {
		let (tx, mut rx) = mpsc::channel::<()>(RELOAD_CHANNEL_SIZE);
		let handle = tokio::spawn(async move {
			while rx.recv().await.is_some() {
				while rx.try_recv().is_ok() {
					debug!(target: TARGET, "Coalescing a pending change notification");
				}
				if let Err(e) = registry.reload().await {
					error!(target: TARGET, "Schema reload failed: {e}");
				}
			}
			trace!(target: TARGET, "Reload task stopped");
		});
		(Self {
			tx,
		}, handle)
	}

	/// Signals that descriptors may have changed
	///
	/// Returns `false` once the reload task has stopped.
	pub fn notify(&self) -> bool {
		match self.tx.try_send(()) {
			Ok(()) => true,
			Err(TrySendError::Full(())) => {
				debug!(target: TARGET, "A reload is already queued, coalescing");
				true
			}
			Err(TrySendError::Closed(())) => false,
		}
	}
}
