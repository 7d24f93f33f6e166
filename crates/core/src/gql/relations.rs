use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{ScalarType, normalize};

use super::tables::{EntityType, ResolverKind};

const TARGET: &str = "formgraph::gql";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cardinality {
	/// A `resource` field: many owners point at one target
	ManyToOne,
	/// A `resources` field: owners point at several targets
	ManyToMany,
}

impl Cardinality {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::ManyToOne => "manyToOne",
			Self::ManyToMany => "manyToMany",
		}
	}
}

/// A traversal between two entity types derived from a reference field
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Relationship {
	/// The owning type, which declares the reference field
	pub from: String,
	/// The referenced type
	pub to: String,
	/// The scalar field holding the stored identifiers, e.g. `customer_id`
	pub field: String,
	/// The record data key of the reference field
	pub key: String,
	/// The field on `from` returning the referenced record(s)
	pub forward: String,
	/// The list field on `to` returning the owning records
	pub reverse: String,
	pub cardinality: Cardinality,
}

impl Relationship {
	pub fn many(&self) -> bool {
		self.cardinality == Cardinality::ManyToMany
	}
}

struct Pending<'a> {
	from: &'a EntityType,
	to: &'a EntityType,
	field: &'a str,
	key: &'a str,
	source: String,
	cardinality: Cardinality,
}

/// Takes the first free candidate name, numbering the last one when all are taken
fn unique(used: &mut BTreeSet<String>, candidates: Vec<String>) -> String {
	for candidate in &candidates {
		if used.insert(candidate.clone()) {
			return candidate.clone();
		}
	}
	let base = candidates.last().cloned().unwrap_or_default();
	let mut n = 2;
	loop {
		let candidate = format!("{base}_{n}");
		if used.insert(candidate.clone()) {
			return candidate;
		}
		n += 1;
	}
}

/// Finds the forward and reverse traversals of every reference field
///
/// The forward field is named after the target type (`customer`) and the reverse field after
/// the owner's plural (`invoices`). When an owner references the same target more than once,
/// or the plain name is taken, the source field name disambiguates. References to entities
/// that are not part of the set are dropped.
pub fn resolve(entities: &[EntityType]) -> Vec<Relationship> {
	let by_id: BTreeMap<&str, &EntityType> = entities.iter().map(|e| (e.id(), e)).collect();
	let mut used: BTreeMap<&str, BTreeSet<String>> = entities
		.iter()
		.map(|e| (e.name.as_str(), e.fields.iter().map(|f| f.name.clone()).collect()))
		.collect();

	let mut pending = Vec::new();
	for e in entities {
		for f in e.fields.iter().filter(|f| f.resolver == ResolverKind::Reference) {
			let Some(fd) = &f.descriptor else {
				continue;
			};
			let Some(target) = fd.resource_ref.as_deref() else {
				continue;
			};
			let Some(to) = by_id.get(target) else {
				debug!(target: TARGET, "Dropping relationship {}.{} to missing entity {target}", e.name, f.name);
				continue;
			};
			pending.push(Pending {
				from: e,
				to,
				field: &f.name,
				key: f.key.as_deref().unwrap_or(&fd.name),
				source: normalize(&fd.name),
				cardinality: if f.ty == ScalarType::IdList {
					Cardinality::ManyToMany
				} else {
					Cardinality::ManyToOne
				},
			});
		}
	}

	let shared = |p: &Pending| {
		pending.iter().filter(|q| q.from.name == p.from.name && q.to.name == p.to.name).count() > 1
	};

	let mut forwards = Vec::with_capacity(pending.len());
	for p in &pending {
		let mut candidates = Vec::new();
		if !shared(p) {
			candidates.push(match p.cardinality {
				Cardinality::ManyToOne => p.to.singular.clone(),
				Cardinality::ManyToMany => p.to.plural.clone(),
			});
		}
		candidates.push(p.source.clone());
		let set = used.entry(p.from.name.as_str()).or_default();
		forwards.push(unique(set, candidates));
	}

	let mut out = Vec::with_capacity(pending.len());
	for (p, forward) in pending.iter().zip(forwards) {
		let mut candidates = Vec::new();
		if !shared(p) {
			candidates.push(p.from.plural.clone());
		}
		candidates.push(format!("{}_{}", p.from.plural, p.source));
		let set = used.entry(p.to.name.as_str()).or_default();
		let reverse = unique(set, candidates);
		trace!(target: TARGET, "Relationship {}.{forward} <-> {}.{reverse}", p.from.name, p.to.name);
		out.push(Relationship {
			from: p.from.name.clone(),
			to: p.to.name.clone(),
			field: p.field.to_string(),
			key: p.key.to_string(),
			forward,
			reverse,
			cardinality: p.cardinality,
		});
	}
	out
}
