use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Collection, MemCollection};
use crate::catalog::{DescriptorSource, MemoryCatalog, Origin};
use crate::doc::Record;
use crate::err::Error;
use crate::idg::IdAllocator;

const TARGET: &str = "formgraph::kvs";

/// A record to load into the collection at startup
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportEntry {
	/// The resource or form the record belongs to
	pub entity: String,
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default)]
	pub created_at: Option<DateTime<Utc>>,
	#[serde(default)]
	pub created_by: Option<String>,
	#[serde(default)]
	pub data: Map<String, Value>,
}

/// The descriptor catalog and the record collection served by the engine
pub struct Datastore {
	catalog: Arc<dyn DescriptorSource>,
	collection: Arc<dyn Collection>,
	ids: IdAllocator,
}

impl fmt::Debug for Datastore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Datastore").finish_non_exhaustive()
	}
}

impl Datastore {
	pub fn new(catalog: Arc<dyn DescriptorSource>, collection: Arc<dyn Collection>) -> Self {
		Self {
			catalog,
			ids: IdAllocator::new(collection.clone()),
			collection,
		}
	}

	/// A datastore with an in-memory catalog and collection
	pub fn memory(catalog: Arc<MemoryCatalog>) -> Self {
		Self::new(catalog, Arc::new(MemCollection::new()))
	}

	pub fn catalog(&self) -> &Arc<dyn DescriptorSource> {
		&self.catalog
	}

	pub fn collection(&self) -> &Arc<dyn Collection> {
		&self.collection
	}

	pub fn ids(&self) -> &IdAllocator {
		&self.ids
	}

	/// Stores a new record for a resource or form
	///
	/// Resource records receive the next incremental identifier of their resource.
	pub async fn create_record(
		&self,
		entity: &str,
		data: Map<String, Value>,
		created_by: Option<String>,
	) -> Result<Record> {
		self.create(ImportEntry {
			entity: entity.to_string(),
			id: None,
			created_at: None,
			created_by,
			data,
		})
		.await
	}

	async fn create(&self, entry: ImportEntry) -> Result<Record> {
		let def = self
			.catalog
			.entity(&entry.entity)
			.await?
			.ok_or_else(|| Error::EntityNotFound(entry.entity.clone()))?;
		let mut record = match entry.id {
			Some(id) => Record::with_id(id, def.origin, &def.id, entry.data),
			None => Record::new(def.origin, &def.id, entry.data),
		};
		if let Some(at) = entry.created_at {
			record.created_at = at;
		}
		record.created_by = entry.created_by;
		if def.origin == Origin::Resource {
			let id = self.ids.allocate(&def.name, record.created_at.year()).await?;
			record.incremental_id = Some(id);
		}
		if let Err(e) = self.collection.insert(record.clone()).await {
			if let Some(id) = &record.incremental_id {
				self.ids.release(id).await;
			}
			return Err(e);
		}
		debug!(target: TARGET, "Created record {} for {}", record.id, def.id);
		Ok(record)
	}

	/// Loads a JSON array of records, returning how many were stored
	pub async fn import(&self, path: &Path) -> Result<usize> {
		let bytes = tokio::fs::read(path).await.map_err(Error::Io)?;
		let entries: Vec<ImportEntry> = serde_json::from_slice(&bytes).map_err(Error::Json)?;
		let total = entries.len();
		for entry in entries {
			self.create(entry).await?;
		}
		info!(target: TARGET, "Imported {total} records from {}", path.display());
		Ok(total)
	}
}
