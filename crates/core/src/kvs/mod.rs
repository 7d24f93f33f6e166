//! The generic record collection and the datastore which ties it to the descriptor catalog.

mod ds;
mod mem;

pub use ds::{Datastore, ImportEntry};
pub use mem::MemCollection;

use anyhow::Result;

use crate::doc::{Cond, Record, Sort};

/// The store holding every record of every resource and form
///
/// Implementations surface an unreachable backend as an error, which resolvers pass on to the
/// caller unchanged. Missing records are not errors.
#[async_trait::async_trait]
pub trait Collection: Send + Sync + 'static {
	/// Fetches a single record by its identifier
	async fn get(&self, id: &str) -> Result<Option<Record>>;

	/// Fetches the records matching a filter, ordered and paginated
	async fn find(
		&self,
		cond: &Cond,
		sort: &[Sort],
		skip: usize,
		limit: Option<usize>,
	) -> Result<Vec<Record>>;

	/// Counts the records matching a filter
	async fn count(&self, cond: &Cond) -> Result<usize>;

	/// Stores a new record
	async fn insert(&self, record: Record) -> Result<()>;
}
