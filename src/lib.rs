//! The formgraph server.
//!
//! This crate wires the schema registry from `formgraph-core` to an HTTP endpoint, a set of
//! change triggers, and the command-line interface.

#![forbid(unsafe_code)]

#[macro_use]
extern crate tracing;

mod cli;
mod cnf;
mod dbs;
mod err;
mod net;
mod telemetry;

pub use cli::init;
