use thiserror::Error;

/// An error originating from the formgraph core
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// The backing record collection could not be reached
	#[error("The record collection is unavailable: {0}")]
	CollectionUnavailable(String),

	/// The descriptor catalog could not be read
	#[error("The descriptor catalog is unavailable: {0}")]
	CatalogUnavailable(String),

	/// The field descriptors of an entity are malformed
	#[error("The descriptors of '{entity}' are invalid: {reason}")]
	InvalidDescriptor {
		entity: String,
		reason: String,
	},

	/// A synthesized type name is reserved by the base schema
	#[error("The entity '{entity}' synthesizes the type '{name}' which is reserved by the base schema")]
	ReservedTypeName {
		entity: String,
		name: String,
	},

	/// A synthesized type name is already used by another entity
	#[error("The entity '{entity}' synthesizes the type '{name}' which is already defined")]
	DuplicateTypeName {
		entity: String,
		name: String,
	},

	/// The requested resource or form does not exist
	#[error("The entity '{0}' does not exist")]
	EntityNotFound(String),

	/// A record with the same identifier is already stored
	#[error("A record with the id '{0}' already exists")]
	RecordExists(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}
