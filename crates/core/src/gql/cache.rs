use std::fmt::{self, Debug};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_graphql::dynamic::Schema;
use async_graphql::{Request, Response};
use tokio::sync::Mutex;

use crate::catalog::EntityDefinition;
use crate::kvs::Datastore;

use super::base::BaseSchema;
use super::error::GqlError;
use super::resolvers::ResolverTable;
use super::schema::{Assembly, assemble, fallback};
use super::tables::EntityType;

const TARGET: &str = "formgraph::gql::cache";

/// One immutable generation of the served schema
pub struct Snapshot {
	pub generation: u64,
	pub schema: Schema,
	pub sdl: String,
	pub resolvers: Arc<ResolverTable>,
	pub entities: Vec<Arc<EntityType>>,
	/// Whether this generation only holds the base schema after a failed synthesis
	pub fallback: bool,
	fingerprint: Option<String>,
}

impl Snapshot {
	fn new(assembly: Assembly, generation: u64, fingerprint: Option<String>, fallback: bool) -> Self {
		Self {
			generation,
			schema: assembly.schema,
			sdl: assembly.sdl,
			resolvers: assembly.resolvers,
			entities: assembly.entities,
			fallback,
			fingerprint,
		}
	}

	pub async fn execute(&self, request: impl Into<Request>) -> Response {
		self.schema.execute(request).await
	}
}

impl Debug for Snapshot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Snapshot")
			.field("generation", &self.generation)
			.field("entities", &self.entities.len())
			.field("fallback", &self.fallback)
			.finish_non_exhaustive()
	}
}

fn fingerprint(defs: &[EntityDefinition]) -> Option<String> {
	serde_json::to_string(defs).ok()
}

/// Writes the schema text next to its destination and renames it into place
async fn persist(path: &Path, sdl: &str) -> std::io::Result<()> {
	let path = path.to_path_buf();
	let sdl = sdl.to_string();
	tokio::task::spawn_blocking(move || {
		let dir = match path.parent() {
			Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
			_ => PathBuf::from("."),
		};
		let mut file = tempfile::NamedTempFile::new_in(dir)?;
		file.write_all(sdl.as_bytes())?;
		file.flush()?;
		file.persist(&path).map_err(|e| e.error)?;
		Ok(())
	})
	.await
	.map_err(std::io::Error::other)?
}

/// Holds the live schema and replaces it atomically when descriptors change
///
/// Every request runs against the snapshot that was live when it arrived, so a request never
/// observes two generations, and a new generation only becomes visible once it is complete.
pub struct SchemaRegistry {
	datastore: Arc<Datastore>,
	base: Arc<dyn BaseSchema>,
	artifact: Option<PathBuf>,
	live: ArcSwap<Snapshot>,
	reload: Mutex<()>,
}

impl Debug for SchemaRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SchemaRegistry")
			.field("artifact", &self.artifact)
			.field("live", &self.live.load())
			.finish_non_exhaustive()
	}
}

impl SchemaRegistry {
	/// Builds the first generation
	///
	/// When the catalog cannot be read or the synthesized schema cannot be finished, the
	/// registry starts with the base schema alone and the next reload tries again.
	pub async fn new(
		datastore: Arc<Datastore>,
		base: Arc<dyn BaseSchema>,
		artifact: Option<PathBuf>,
	) -> Result<Self, GqlError> {
		let store = datastore.collection().clone();
		let snapshot = match datastore.catalog().exposed().await {
			Ok(defs) => match assemble(&defs, base.as_ref(), &store, 1) {
				Ok(assembly) => Snapshot::new(assembly, 1, fingerprint(&defs), false),
				Err(e) => {
					error!(target: TARGET, "Serving the base schema only: {e}");
					Snapshot::new(fallback(base.as_ref(), &store, 1)?, 1, None, true)
				}
			},
			Err(e) => {
				error!(target: TARGET, "Serving the base schema only, the catalog is unreadable: {e}");
				Snapshot::new(fallback(base.as_ref(), &store, 1)?, 1, None, true)
			}
		};
		let registry = Self {
			datastore,
			base,
			artifact,
			live: ArcSwap::from_pointee(snapshot),
			reload: Mutex::new(()),
		};
		registry.write_artifact(&registry.current()).await;
		info!(target: TARGET, "Serving schema generation 1 with {} entities", registry.current().entities.len());
		Ok(registry)
	}

	pub fn datastore(&self) -> &Arc<Datastore> {
		&self.datastore
	}

	/// The snapshot serving new requests
	pub fn current(&self) -> Arc<Snapshot> {
		self.live.load_full()
	}

	/// Runs a request against the snapshot that is live on entry
	pub async fn execute(&self, request: impl Into<Request>) -> Response {
		let snapshot = self.current();
		snapshot.execute(request).await
	}

	/// Rebuilds the schema from the current descriptors and swaps it in
	///
	/// Reloads are serialized. A reload whose descriptors are unchanged keeps the current
	/// generation. When the catalog cannot be read, or the new schema cannot be finished, the
	/// current generation stays live and the error is returned.
	pub async fn reload(&self) -> Result<Arc<Snapshot>, GqlError> {
		let _guard = self.reload.lock().await;
		let current = self.current();
		let defs = match self.datastore.catalog().exposed().await {
			Ok(defs) => defs,
			Err(e) => {
				error!(target: TARGET, "Keeping schema generation {}: {e}", current.generation);
				return Err(e.into());
			}
		};
		let fingerprint = fingerprint(&defs);
		if !current.fallback && fingerprint.is_some() && current.fingerprint == fingerprint {
			debug!(target: TARGET, "Descriptors are unchanged, keeping generation {}", current.generation);
			return Ok(current);
		}
		let generation = current.generation + 1;
		let store = self.datastore.collection().clone();
		let assembly = match assemble(&defs, self.base.as_ref(), &store, generation) {
			Ok(assembly) => assembly,
			Err(e) => {
				error!(target: TARGET, "Keeping schema generation {}: {e}", current.generation);
				return Err(e);
			}
		};
		let next = Arc::new(Snapshot::new(assembly, generation, fingerprint, false));
		self.write_artifact(&next).await;
		self.live.store(next.clone());
		info!(target: TARGET, "Swapped in schema generation {generation} with {} entities", next.entities.len());
		Ok(next)
	}

	async fn write_artifact(&self, snapshot: &Snapshot) {
		let Some(path) = &self.artifact else {
			return;
		};
		match persist(path, &snapshot.sdl).await {
			Ok(()) => debug!(target: TARGET, "Wrote schema generation {} to {}", snapshot.generation, path.display()),
			Err(e) => warn!(target: TARGET, "Unable to write the schema to {}: {e}", path.display()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::{FieldDescriptor, FieldKind, MemoryCatalog};
	use crate::gql::base::StaticBase;

	async fn registry(artifact: Option<PathBuf>) -> (Arc<MemoryCatalog>, SchemaRegistry) {
		let catalog = Arc::new(MemoryCatalog::new(vec![EntityDefinition::resource("customers", "Customer")]));
		let ds = Arc::new(Datastore::memory(catalog.clone()));
		let registry = SchemaRegistry::new(ds, Arc::new(StaticBase), artifact).await.unwrap();
		(catalog, registry)
	}

	#[tokio::test]
	async fn unchanged_descriptors_keep_the_generation() {
		let (_, registry) = registry(None).await;
		assert_eq!(registry.current().generation, 1);
		let again = registry.reload().await.unwrap();
		assert_eq!(again.generation, 1);
	}

	#[tokio::test]
	async fn changed_descriptors_swap_in_a_new_generation() {
		let (catalog, registry) = registry(None).await;
		let before = registry.current();
		catalog
			.upsert(
				EntityDefinition::resource("customers", "Customer")
					.with_field(FieldDescriptor::new("name", FieldKind::Text)),
			)
			.await;
		let after = registry.reload().await.unwrap();
		assert_eq!(after.generation, 2);
		assert!(after.sdl.contains("name: String"));
		assert!(!before.sdl.contains("name: String"));
		assert_eq!(registry.current().generation, 2);
	}

	#[tokio::test]
	async fn writes_the_schema_artifact() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("schema.graphql");
		let (catalog, registry) = registry(Some(path.clone())).await;
		let text = tokio::fs::read_to_string(&path).await.unwrap();
		assert_eq!(text, registry.current().sdl);
		catalog.upsert(EntityDefinition::resource("invoices", "Invoice")).await;
		registry.reload().await.unwrap();
		let text = tokio::fs::read_to_string(&path).await.unwrap();
		assert!(text.contains("type Invoice"));
	}
}
