use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use formgraph_core::gql::{Reloader, SchemaRegistry, StaticBase};

use super::LogArguments;
use crate::err::Error;
use crate::net::{self, AppState};
use crate::{dbs, telemetry};

const TARGET: &str = "formgraph::cli";

#[derive(Args, Debug)]
pub struct StartCommandArguments {
	#[arg(help = "The hostname or IP address to listen for connections on")]
	#[arg(env = "FORMGRAPH_BIND", short = 'b', long = "bind")]
	#[arg(default_value = "127.0.0.1:8000")]
	pub(crate) listen_address: SocketAddr,
	#[arg(help = "The JSON file holding the resource and form descriptors")]
	#[arg(env = "FORMGRAPH_CATALOG", long = "catalog")]
	pub(crate) catalog: Option<PathBuf>,
	#[arg(help = "A JSON file of records to load into the collection at startup")]
	#[arg(env = "FORMGRAPH_IMPORT_FILE", long = "import-file")]
	pub(crate) import_file: Option<PathBuf>,
	#[arg(help = "Where the generated schema is written after every swap")]
	#[arg(env = "FORMGRAPH_SCHEMA_OUTPUT", long = "schema-output")]
	#[arg(default_value = "schema.graphql")]
	pub(crate) schema_output: PathBuf,
	#[arg(help = "Seconds between checks of the catalog file for changes, 0 to disable")]
	#[arg(env = "FORMGRAPH_WATCH_INTERVAL", long = "watch-interval")]
	#[arg(default_value_t = 2)]
	pub(crate) watch_interval: u64,
	#[command(flatten)]
	pub(crate) log: LogArguments,
}

pub async fn init(
	StartCommandArguments {
		listen_address,
		catalog,
		import_file,
		schema_output,
		watch_interval,
		log,
	}: StartCommandArguments,
) -> Result<(), Error> {
	// Initialize logging
	telemetry::builder().with_log_level(&log.log).with_format(log.log_format).init()?;
	// Set up the catalog and the record collection
	let ds = dbs::init(catalog.as_deref(), import_file.as_deref()).await?;
	// Build the first schema generation
	let registry = Arc::new(SchemaRegistry::new(ds, Arc::new(StaticBase), Some(schema_output)).await?);
	let (reloader, task) = Reloader::spawn(registry.clone());
	// Poll the catalog file for changes
	let watcher = match catalog {
		Some(path) if watch_interval > 0 => {
			Some(dbs::watch(path, Duration::from_secs(watch_interval), reloader.clone()))
		}
		_ => None,
	};
	// Start the web server
	let state = AppState {
		registry,
		reloader,
	};
	net::init(listen_address, state).await?;
	// Stop the background tasks
	if let Some(watcher) = watcher {
		watcher.abort();
	}
	task.abort();
	info!(target: TARGET, "Server stopped. Bye!");
	Ok(())
}
