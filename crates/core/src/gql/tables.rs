use std::collections::BTreeSet;

use crate::catalog::{EntityDefinition, FieldDescriptor, FieldKind, Origin, ScalarType};
use crate::err::Error;

use super::utils::{plural, singular, type_name};

const TARGET: &str = "formgraph::gql";

/// How the value of a synthesized field is produced from a record
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolverKind {
	Id,
	CreatedAt,
	CreatedBy,
	/// Reads `data[key]` coerced to the declared type
	Scalar,
	/// Reads the raw identifiers stored in a reference field
	Reference,
}

/// One field of a synthesized entity type
#[derive(Clone, Debug)]
pub struct EntityField {
	/// The GraphQL field name
	pub name: String,
	/// The key of the value inside the record data
	pub key: Option<String>,
	pub ty: ScalarType,
	pub required: bool,
	pub resolver: ResolverKind,
	pub descriptor: Option<FieldDescriptor>,
}

impl EntityField {
	fn builtin(name: &str, ty: ScalarType, resolver: ResolverKind) -> Self {
		Self {
			name: name.to_string(),
			key: None,
			ty,
			required: resolver == ResolverKind::Id,
			resolver,
			descriptor: None,
		}
	}

	fn from_descriptor(fd: &FieldDescriptor) -> Self {
		Self {
			name: fd.scalar_name(),
			key: Some(fd.name.clone()),
			ty: fd.kind.scalar_type(),
			required: fd.required,
			resolver: if fd.kind.is_reference() {
				ResolverKind::Reference
			} else {
				ResolverKind::Scalar
			},
			descriptor: Some(fd.clone()),
		}
	}

	/// The editor kind, with built-in fields reported as text or datetime
	pub fn kind(&self) -> FieldKind {
		match (&self.descriptor, self.resolver) {
			(Some(fd), _) => fd.kind,
			(None, ResolverKind::CreatedAt) => FieldKind::Datetime,
			_ => FieldKind::Text,
		}
	}

	pub fn is_builtin(&self) -> bool {
		self.descriptor.is_none()
	}
}

/// The typed view synthesized for one resource or form
#[derive(Clone, Debug)]
pub struct EntityType {
	pub definition: EntityDefinition,
	/// The object type name
	pub name: String,
	/// The item query name
	pub singular: String,
	/// The plural used for reverse relationships
	pub plural: String,
	/// `id`, `createdAt`, `createdBy`, then one field per descriptor
	pub fields: Vec<EntityField>,
}

impl EntityType {
	pub fn id(&self) -> &str {
		&self.definition.id
	}

	pub fn origin(&self) -> Origin {
		self.definition.origin
	}

	pub fn field(&self, name: &str) -> Option<&EntityField> {
		self.fields.iter().find(|f| f.name == name)
	}

	pub fn filter_name(&self) -> String {
		format!("{}Filter", self.name)
	}

	pub fn meta_name(&self) -> String {
		format!("{}Meta", self.name)
	}

	pub fn collection_field(&self) -> String {
		format!("all{}", plural(&self.name))
	}

	pub fn meta_field(&self) -> String {
		format!("_{}Meta", self.singular)
	}

	pub fn count_field(&self) -> String {
		format!("_all{}Meta", plural(&self.name))
	}

	/// Every type name this entity adds to the schema
	pub fn type_names(&self) -> [String; 3] {
		[self.name.clone(), self.filter_name(), self.meta_name()]
	}

	/// Every root query field this entity adds to the schema
	pub fn root_fields(&self) -> [String; 4] {
		[self.singular.clone(), self.collection_field(), self.meta_field(), self.count_field()]
	}
}

/// Builds the entity type of a single definition, checking its descriptors
pub fn entity(def: &EntityDefinition) -> Result<EntityType, Error> {
	let invalid = |reason: String| Error::InvalidDescriptor {
		entity: def.id.clone(),
		reason,
	};
	let name = type_name(&def.name);
	let mut fields = vec![
		EntityField::builtin("id", ScalarType::Id, ResolverKind::Id),
		EntityField::builtin("createdAt", ScalarType::String, ResolverKind::CreatedAt),
		EntityField::builtin("createdBy", ScalarType::String, ResolverKind::CreatedBy),
	];
	let mut seen: BTreeSet<String> = fields.iter().map(|f| f.name.clone()).collect();
	for fd in &def.fields {
		fd.validate(&def.id).map_err(invalid)?;
		// Stored under `data.<name>`, so the name must stay a single path segment
		if fd.name.contains('.') || fd.name.starts_with('$') {
			return Err(invalid(format!("the field name '{}' is not a valid document key", fd.name)));
		}
		let field = EntityField::from_descriptor(fd);
		if field.name.starts_with("__") {
			return Err(invalid(format!("the field name '{}' is reserved", field.name)));
		}
		if !seen.insert(field.name.clone()) {
			return Err(invalid(format!("the field name '{}' is used twice", field.name)));
		}
		fields.push(field);
	}
	let singular = singular(&name);
	Ok(EntityType {
		definition: def.clone(),
		plural: plural(&singular),
		singular,
		name,
		fields,
	})
}

/// Synthesizes the entity types of every exposed definition
///
/// Entities are ordered by type name so that the output is a pure function of the input.
/// Entities whose descriptors are invalid, or whose type or root field names collide with the
/// base schema or with an entity earlier in that order, are left out and returned as errors.
pub fn synthesize(
	defs: &[EntityDefinition],
	reserved: &BTreeSet<String>,
	reserved_roots: &BTreeSet<String>,
) -> (Vec<EntityType>, Vec<Error>) {
	let mut candidates: Vec<&EntityDefinition> = defs.iter().filter(|d| d.is_exposed()).collect();
	candidates.sort_by(|a, b| {
		type_name(&a.name).cmp(&type_name(&b.name)).then_with(|| a.id.cmp(&b.id))
	});
	let mut types = BTreeSet::new();
	let mut roots = BTreeSet::new();
	let mut entities = Vec::new();
	let mut rejected = Vec::new();
	for def in candidates {
		let result = entity(def).and_then(|e| {
			for name in e.type_names() {
				if reserved.contains(&name) || name.starts_with("__") {
					return Err(Error::ReservedTypeName {
						entity: def.id.clone(),
						name,
					});
				}
				if types.contains(&name) {
					return Err(Error::DuplicateTypeName {
						entity: def.id.clone(),
						name,
					});
				}
			}
			if let Some(name) = e.root_fields().into_iter().find(|n| reserved_roots.contains(n)) {
				return Err(Error::ReservedTypeName {
					entity: def.id.clone(),
					name,
				});
			}
			if let Some(name) = e.root_fields().into_iter().find(|n| roots.contains(n)) {
				return Err(Error::DuplicateTypeName {
					entity: def.id.clone(),
					name,
				});
			}
			Ok(e)
		});
		match result {
			Ok(e) => {
				trace!(target: TARGET, "Synthesized type {} from {}", e.name, def.id);
				types.extend(e.type_names());
				roots.extend(e.root_fields());
				entities.push(e);
			}
			Err(e) => {
				error!(target: TARGET, "Skipping entity {}: {e}", def.id);
				rejected.push(e);
			}
		}
	}
	(entities, rejected)
}
