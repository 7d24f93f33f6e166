//! This binary is the command-line tool and GraphQL server of formgraph.

#![forbid(unsafe_code)]

use std::process::ExitCode;

fn main() -> ExitCode {
	formgraph::init()
}
