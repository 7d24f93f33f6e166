//! The GraphQL layer: entity type synthesis, relationship discovery, resolvers and the
//! hot-swapped schema registry.

pub mod base;
pub mod cache;
pub mod error;
pub mod meta;
pub mod relations;
pub mod reload;
pub mod resolvers;
pub mod schema;
pub mod tables;
mod utils;

pub use base::{BaseSchema, ListCount, StaticBase};
pub use cache::{SchemaRegistry, Snapshot};
pub use error::GqlError;
pub use relations::{Cardinality, Relationship};
pub use reload::Reloader;
pub use schema::{Assembly, assemble};
pub use tables::{EntityField, EntityType};
