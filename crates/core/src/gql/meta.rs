use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::catalog::{FieldKind, ScalarType};

use super::relations::Relationship;
use super::tables::{EntityField, EntityType};

/// Whether the field can appear in a filter
fn filterable(field: &EntityField) -> bool {
	field.ty != ScalarType::Json || field.kind().is_multi()
}

/// Whether the field can be used as a sort key
fn sortable(field: &EntityField) -> bool {
	!matches!(field.ty, ScalarType::Json | ScalarType::IdList)
}

/// The descriptor of a single field, without relationship information
pub fn descriptor(field: &EntityField) -> Map<String, Value> {
	let kind = field.kind();
	let mut out = Map::new();
	out.insert("name".into(), json!(field.name));
	out.insert("type".into(), json!(kind.as_str()));
	out.insert("required".into(), json!(field.required));
	out.insert("readOnly".into(), json!(field.is_builtin()));
	out.insert("filterable".into(), json!(filterable(field)));
	out.insert("sortable".into(), json!(sortable(field)));
	if let Some(key) = &field.key {
		out.insert("key".into(), json!(key));
	}
	let Some(fd) = &field.descriptor else {
		return out;
	};
	if !fd.choices.is_empty() {
		out.insert("choices".into(), json!(fd.choices));
	}
	if let Some(target) = &fd.resource_ref {
		out.insert("resource".into(), json!(target));
	}
	if let Some(display) = &fd.display_field {
		out.insert("displayField".into(), json!(display));
	}
	for (key, nested) in [("rows", &fd.rows), ("columns", &fd.columns), ("items", &fd.items)] {
		if !nested.is_empty() {
			out.insert(key.into(), json!(nested));
		}
	}
	if matches!(kind, FieldKind::Matrix | FieldKind::MatrixDropdown) && !out.contains_key("rows") {
		out.insert("rows".into(), json!([]));
	}
	out
}

/// The descriptors of every field of an entity, keyed by field name
///
/// Reference fields carry their relationship and, while `depth` allows, the descriptors of
/// the referenced entity under `meta`.
pub fn entity_meta(
	entity: &EntityType,
	relationships: &[Relationship],
	by_name: &BTreeMap<&str, &EntityType>,
	depth: usize,
) -> Map<String, Value> {
	let mut out = Map::new();
	for field in &entity.fields {
		let mut d = descriptor(field);
		let relation =
			relationships.iter().find(|r| r.from == entity.name && r.field == field.name);
		if let Some(r) = relation {
			d.insert(
				"relationship".into(),
				json!({
					"name": r.forward,
					"type": r.to,
					"reverse": r.reverse,
					"cardinality": r.cardinality.as_str(),
				}),
			);
			if depth > 0 {
				if let Some(target) = by_name.get(r.to.as_str()) {
					let nested = entity_meta(target, relationships, by_name, depth - 1);
					d.insert("meta".into(), Value::Object(nested));
				}
			}
		}
		out.insert(field.name.clone(), Value::Object(d));
	}
	out
}
