mod schema;
mod start;
mod version;

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use crate::cnf::LOGO;
use crate::telemetry::{self, LogFormat};
use schema::SchemaCommandArguments;
use start::StartCommandArguments;
use version::VersionCommandArguments;

const INFO: &str = "
To get started using formgraph, point the server at a descriptor catalog:

  $ formgraph start --catalog catalog.json

Every resource and form in the catalog is served as a GraphQL type on /graphql.
";

#[derive(Parser, Debug)]
#[command(name = "formgraph command-line interface and server", bin_name = "formgraph")]
#[command(about = INFO, before_help = LOGO)]
#[command(disable_version_flag = true, arg_required_else_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
	#[command(about = "Start the GraphQL server")]
	Start(StartCommandArguments),
	#[command(about = "Generate the GraphQL schema of a catalog")]
	Schema(SchemaCommandArguments),
	#[command(about = "Output the command-line tool version information")]
	Version(VersionCommandArguments),
}

/// Logging options shared by every command
#[derive(Args, Debug)]
pub struct LogArguments {
	#[arg(help = "The logging level for the command-line tool")]
	#[arg(env = "FORMGRAPH_LOG", short = 'l', long = "log")]
	#[arg(default_value = "info")]
	#[arg(value_parser = log_filter)]
	pub log: String,
	#[arg(help = "The format of the emitted log lines")]
	#[arg(env = "FORMGRAPH_LOG_FORMAT", long = "log-format")]
	#[arg(value_enum, default_value_t = LogFormat::Text)]
	pub log_format: LogFormat,
}

/// Accepts a level name or any list of filter directives
fn log_filter(value: &str) -> Result<String, String> {
	telemetry::filter_from_value(value).map(|_| value.to_string()).map_err(|e| e.to_string())
}

#[tokio::main]
pub async fn init() -> ExitCode {
	let args = Cli::parse();
	let output = match args.command {
		Commands::Start(args) => start::init(args).await,
		Commands::Schema(args) => schema::init(args).await,
		Commands::Version(args) => version::init(args).await,
	};
	if let Err(e) = output {
		error!("{}", e);
		eprintln!("{e}");
		ExitCode::FAILURE
	} else {
		ExitCode::SUCCESS
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn verify_cli() {
		Cli::command().debug_assert();
	}

	#[test]
	fn start_defaults() {
		let cli = Cli::try_parse_from(["formgraph", "start", "--catalog", "catalog.json"]).unwrap();
		let Commands::Start(args) = cli.command else {
			panic!("expected the start command");
		};
		assert_eq!(args.listen_address.to_string(), "127.0.0.1:8000");
		assert_eq!(args.watch_interval, 2);
		assert_eq!(args.schema_output.to_str(), Some("schema.graphql"));
		assert_eq!(args.log.log, "info");
	}

	#[test]
	fn accepts_filter_directives() {
		let cli = Cli::try_parse_from(["formgraph", "start", "--log", "formgraph_core::gql=debug,warn"]).unwrap();
		let Commands::Start(args) = cli.command else {
			panic!("expected the start command");
		};
		assert_eq!(args.log.log, "formgraph_core::gql=debug,warn");
		assert!(Cli::try_parse_from(["formgraph", "start", "--log", "trace"]).is_ok());
	}

	#[test]
	fn rejects_unparsable_directives() {
		assert!(Cli::try_parse_from(["formgraph", "start", "--log", "formgraph=loudest"]).is_err());
	}
}
