use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{DescriptorSource, EntityDefinition};
use crate::err::Error;

const TARGET: &str = "formgraph::catalog";

/// A descriptor source held in memory, edited through its own methods
#[derive(Debug, Default)]
pub struct MemoryCatalog {
	entities: RwLock<Vec<EntityDefinition>>,
}

impl MemoryCatalog {
	pub fn new(entities: Vec<EntityDefinition>) -> Self {
		Self {
			entities: RwLock::new(entities),
		}
	}

	/// Inserts or replaces an entity definition
	pub async fn upsert(&self, entity: EntityDefinition) {
		let mut lock = self.entities.write().await;
		match lock.iter_mut().find(|e| e.id == entity.id) {
			Some(existing) => *existing = entity,
			None => lock.push(entity),
		}
	}

	/// Removes an entity definition
	pub async fn remove(&self, id: &str) -> Option<EntityDefinition> {
		let mut lock = self.entities.write().await;
		let pos = lock.iter().position(|e| e.id == id)?;
		Some(lock.remove(pos))
	}

	pub async fn replace(&self, entities: Vec<EntityDefinition>) {
		*self.entities.write().await = entities;
	}
}

#[async_trait::async_trait]
impl DescriptorSource for MemoryCatalog {
	async fn entities(&self) -> Result<Vec<EntityDefinition>> {
		Ok(self.entities.read().await.clone())
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
	List(Vec<EntityDefinition>),
	Wrapped {
		entities: Vec<EntityDefinition>,
	},
}

/// A descriptor source backed by a JSON file, read on every request
#[derive(Debug, Clone)]
pub struct FileCatalog {
	path: PathBuf,
}

impl FileCatalog {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

#[async_trait::async_trait]
impl DescriptorSource for FileCatalog {
	async fn entities(&self) -> Result<Vec<EntityDefinition>> {
		trace!(target: TARGET, "Reading descriptor catalog from {}", self.path.display());
		let bytes = tokio::fs::read(&self.path)
			.await
			.map_err(|e| Error::CatalogUnavailable(format!("{}: {e}", self.path.display())))?;
		let file: CatalogFile = serde_json::from_slice(&bytes).map_err(Error::Json)?;
		Ok(match file {
			CatalogFile::List(v) => v,
			CatalogFile::Wrapped {
				entities,
			} => entities,
		})
	}
}
