//! The descriptor catalog: the read-only view of every user-defined resource and form.

mod field;
mod source;

pub use field::{Choice, FieldDescriptor, FieldKind, ScalarType, normalize};
pub use source::{FileCatalog, MemoryCatalog};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// The identifier of a resource or form
pub type EntityId = String;

/// Whether an entity was defined as a resource or as a form
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
	#[default]
	Resource,
	Form,
}

impl Origin {
	/// The record key which links a record to its owning entity
	pub fn owner_key(&self) -> &'static str {
		match self {
			Self::Resource => "resource",
			Self::Form => "form",
		}
	}
}

fn default_active() -> bool {
	true
}

/// A resource or form together with its ordered field descriptors
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDefinition {
	pub id: EntityId,
	pub name: String,
	#[serde(default)]
	pub origin: Origin,
	#[serde(default = "default_active")]
	pub active: bool,
	#[serde(default)]
	pub core: bool,
	#[serde(default)]
	pub fields: Vec<FieldDescriptor>,
}

impl EntityDefinition {
	pub fn resource(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			origin: Origin::Resource,
			active: true,
			core: false,
			fields: Vec::new(),
		}
	}

	pub fn form(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			origin: Origin::Form,
			..Self::resource(id, name)
		}
	}

	pub fn with_field(mut self, field: FieldDescriptor) -> Self {
		self.fields.push(field);
		self
	}

	/// Resources are always exposed, forms only when they are active and not part of the core set
	pub fn is_exposed(&self) -> bool {
		match self.origin {
			Origin::Resource => true,
			Origin::Form => self.active && !self.core,
		}
	}

	/// Looks up a descriptor by its stored name, its normalized name or its reference scalar name
	pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
		self.fields
			.iter()
			.find(|f| f.name == name)
			.or_else(|| self.fields.iter().find(|f| normalize(&f.name) == name))
			.or_else(|| self.fields.iter().find(|f| f.kind.is_reference() && f.scalar_name() == name))
	}
}

/// The read interface of the descriptor store
#[async_trait::async_trait]
pub trait DescriptorSource: Send + Sync + 'static {
	/// Returns every stored resource and form
	async fn entities(&self) -> Result<Vec<EntityDefinition>>;

	/// Returns a single resource or form
	async fn entity(&self, id: &str) -> Result<Option<EntityDefinition>> {
		Ok(self.entities().await?.into_iter().find(|e| e.id == id))
	}

	/// Returns the resources and forms which are exposed through the schema
	async fn exposed(&self) -> Result<Vec<EntityDefinition>> {
		Ok(self.entities().await?.into_iter().filter(EntityDefinition::is_exposed).collect())
	}
}
