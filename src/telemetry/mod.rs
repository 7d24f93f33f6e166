use tracing::Subscriber;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer};

use crate::err::Error;

/// How log lines are written to stderr
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
	#[default]
	Text,
	Json,
}

#[derive(Debug, Default)]
pub struct Builder {
	filter: Option<EnvFilter>,
	format: LogFormat,
}

pub fn builder() -> Builder {
	Builder::default()
}

impl Builder {
	/// Set the log level on the telemetry builder
	pub fn with_log_level(self, log_level: &str) -> Self {
		match filter_from_value(log_level) {
			Ok(filter) => self.with_filter(filter),
			Err(e) => {
				eprintln!("Invalid log level {log_level:?}, using the default filter: {e}");
				self
			}
		}
	}

	/// Set the filter on the telemetry builder
	pub fn with_filter(mut self, filter: EnvFilter) -> Self {
		self.filter = Some(filter);
		self
	}

	pub fn with_format(mut self, format: LogFormat) -> Self {
		self.format = format;
		self
	}

	/// Build a tracing dispatcher with the fmt subscriber
	pub fn build(self) -> Box<dyn Subscriber + Send + Sync + 'static> {
		let filter = self.filter.unwrap_or_else(|| EnvFilter::new(default_directives("info")));
		let layer = match self.format {
			LogFormat::Text => tracing_subscriber::fmt::layer()
				.compact()
				.with_ansi(true)
				.with_writer(std::io::stderr)
				.boxed(),
			LogFormat::Json => tracing_subscriber::fmt::layer()
				.json()
				.with_current_span(false)
				.with_writer(std::io::stderr)
				.boxed(),
		};
		Box::new(tracing_subscriber::registry().with(layer.with_filter(filter)))
	}

	/// Install the tracing dispatcher globally
	pub fn init(self) -> Result<(), Error> {
		self.build().try_init().map_err(|e| Error::Telemetry(e.to_string()))
	}
}

fn default_directives(level: &str) -> String {
	format!("error,formgraph={level},formgraph_core={level},tower_http={level}")
}

/// Creates an EnvFilter from a log level name or a list of directives
pub fn filter_from_value(v: &str) -> Result<EnvFilter, ParseError> {
	match v {
		// Don't show any logs at all
		"none" => Ok(EnvFilter::default()),
		// Show all logs from every crate
		"full" => Ok(EnvFilter::default().add_directive(tracing::Level::TRACE.into())),
		"error" => Ok(EnvFilter::new("error")),
		"warn" | "info" | "debug" | "trace" => Ok(EnvFilter::new(default_directives(v))),
		// Treat anything else as a list of directives
		_ => EnvFilter::builder().parse(v),
	}
}
