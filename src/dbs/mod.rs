use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use formgraph_core::catalog::{FileCatalog, MemoryCatalog};
use formgraph_core::gql::Reloader;
use formgraph_core::kvs::{Datastore, MemCollection};
use tokio::task::JoinHandle;

use crate::err::Error;

const TARGET: &str = "formgraph::dbs";

/// Sets up the descriptor catalog and the record collection
pub async fn init(catalog: Option<&Path>, import: Option<&Path>) -> Result<Arc<Datastore>, Error> {
	let ds = match catalog {
		Some(path) => {
			info!(target: TARGET, "Reading descriptors from {}", path.display());
			Datastore::new(Arc::new(FileCatalog::new(path)), Arc::new(MemCollection::new()))
		}
		None => {
			warn!(target: TARGET, "No catalog was specified, serving an empty catalog");
			Datastore::memory(Arc::new(MemoryCatalog::default()))
		}
	};
	if let Some(path) = import {
		ds.import(path).await?;
	}
	Ok(Arc::new(ds))
}

/// What identifies one version of the catalog file
type Stamp = Option<(SystemTime, u64)>;

async fn stamp(path: &Path) -> Stamp {
	let meta = tokio::fs::metadata(path).await.ok()?;
	Some((meta.modified().ok()?, meta.len()))
}

/// Polls the catalog file and notifies the reloader whenever it changes
pub fn watch(path: PathBuf, interval: Duration, reloader: Reloader) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut last = stamp(&path).await;
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		// The first tick completes immediately
		ticker.tick().await;
		loop {
			ticker.tick().await;
			let current = stamp(&path).await;
			if current == last {
				continue;
			}
			last = current;
			debug!(target: TARGET, "Catalog {} changed", path.display());
			if !reloader.notify() {
				trace!(target: TARGET, "Reloader stopped, no longer watching {}", path.display());
				break;
			}
		}
	})
}
