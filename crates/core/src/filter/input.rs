use serde_json::{Map, Value};

use super::{Logic, Node, Predicate};
use crate::catalog::EntityDefinition;

const TARGET: &str = "formgraph::filter";

const BUILTINS: [&str; 3] = ["id", "createdAt", "createdBy"];

const RANGES: [(&str, &str); 4] = [("_lte", "lte"), ("_gte", "gte"), ("_lt", "lt"), ("_gt", "gt")];

/// Builds a predicate tree from the flat filter object accepted by collection queries
///
/// Plain keys compare for equality, `_lt`/`_lte`/`_gt`/`_gte` suffixed keys compare by range,
/// `q` searches every text field, `ids` restricts the identifiers, and `logic`/`filters` carry a
/// nested predicate tree.
pub fn from_object(entity: &EntityDefinition, filter: &Map<String, Value>) -> Node {
	let mut nodes = Vec::new();
	for (key, value) in filter {
		if value.is_null() {
			continue;
		}
		match key.as_str() {
			"q" => {
				if let Some(q) = value.as_str().map(str::trim).filter(|q| !q.is_empty()) {
					nodes.push(search(entity, q));
				}
			}
			"ids" => nodes.push(Node::predicate("ids", "in", value.clone())),
			"logic" => {}
			"filters" => {
				let logic = filter
					.get("logic")
					.and_then(Value::as_str)
					.and_then(|l| l.parse::<Logic>().ok())
					.unwrap_or_default();
				nodes.push(Node::tree(logic, elements(value)));
			}
			key => nodes.push(field(entity, key, value)),
		}
	}
	Node::tree(Logic::And, nodes)
}

/// Reads the elements of a `filters` list one at a time, dropping only the malformed ones
fn elements(value: &Value) -> Vec<Node> {
	let Some(items) = value.as_array() else {
		warn!(target: TARGET, "Dropping predicate tree, filters must be a list: {value}");
		return Vec::new();
	};
	items.iter().filter_map(element).collect()
}

fn element(value: &Value) -> Option<Node> {
	if let Some(filters) = value.get("filters") {
		let logic = match value.get("logic") {
			None | Some(Value::Null) => Logic::default(),
			Some(l) => match l.as_str().and_then(|l| l.parse::<Logic>().ok()) {
				Some(logic) => logic,
				None => {
					warn!(target: TARGET, "Dropping predicate group with unknown logic {l}");
					return None;
				}
			},
		};
		return Some(Node::tree(logic, elements(filters)));
	}
	match serde_json::from_value::<Predicate>(value.clone()) {
		Ok(p) => Some(Node::Predicate(p)),
		Err(e) => {
			warn!(target: TARGET, "Dropping malformed predicate {value}: {e}");
			None
		}
	}
}

fn field(entity: &EntityDefinition, key: &str, value: &Value) -> Node {
	if entity.field(key).is_none() && !BUILTINS.contains(&key) {
		for (suffix, op) in RANGES {
			if let Some(name) = key.strip_suffix(suffix) {
				return Node::predicate(name, op, value.clone());
			}
		}
	}
	Node::predicate(key, "eq", value.clone())
}

fn search(entity: &EntityDefinition, q: &str) -> Node {
	let value = Value::String(q.to_string());
	let mut nodes = vec![Node::predicate("id", "contains", value.clone())];
	for fd in entity.fields.iter().filter(|f| f.kind.is_text()) {
		nodes.push(Node::predicate(fd.name.as_str(), "contains", value.clone()));
	}
	Node::tree(Logic::Or, nodes)
}
