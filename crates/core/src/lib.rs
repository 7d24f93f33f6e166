//! The formgraph core.
//!
//! This crate turns user-defined resource and form descriptors into a live GraphQL schema whose
//! resolvers read a single generic record collection. It contains the descriptor catalog, the
//! document filter and its compiler, the incremental identifier allocator, and the schema
//! synthesis pipeline with its atomically swappable registry.

#![forbid(unsafe_code)]

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod catalog;
pub mod cnf;
pub mod doc;
pub mod err;
pub mod filter;
pub mod gql;
pub mod idg;
pub mod kvs;
