use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use formgraph_core::gql::{SchemaRegistry, StaticBase};
use tokio::io::AsyncWriteExt;

use super::LogArguments;
use crate::err::Error;
use crate::{dbs, telemetry};

#[derive(Args, Debug)]
pub struct SchemaCommandArguments {
	#[arg(help = "The JSON file holding the resource and form descriptors")]
	#[arg(env = "FORMGRAPH_CATALOG", long = "catalog")]
	catalog: PathBuf,
	#[arg(help = "Path to the file to write the schema to, or - for standard output")]
	#[arg(short = 'o', long = "output", default_value = "-")]
	output: String,
	#[command(flatten)]
	log: LogArguments,
}

pub async fn init(
	SchemaCommandArguments {
		catalog,
		output,
		log,
	}: SchemaCommandArguments,
) -> Result<(), Error> {
	// Initialize logging
	telemetry::builder().with_log_level(&log.log).with_format(log.log_format).init()?;
	let ds = dbs::init(Some(catalog.as_path()), None).await?;
	let registry = SchemaRegistry::new(ds, Arc::new(StaticBase), None).await?;
	let snapshot = registry.current();
	if snapshot.fallback {
		return Err(Error::Other(format!(
			"Unable to generate a schema from {}, see the log for details",
			catalog.display()
		)));
	}
	match output.as_str() {
		"-" => {
			let mut stdout = tokio::io::stdout();
			stdout.write_all(snapshot.sdl.as_bytes()).await?;
			stdout.flush().await?;
		}
		path => {
			tokio::fs::write(path, &snapshot.sdl).await?;
			info!("Wrote the schema of {} entities to {path}", snapshot.entities.len());
		}
	}
	Ok(())
}
