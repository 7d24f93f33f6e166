//! Compilation of predicate trees into document filters.
//!
//! Unknown fields and operators are dropped from the compiled filter with a warning, so a single
//! bad clause never fails a whole query.

mod input;
mod placeholder;

pub use input::from_object;
pub use placeholder::{Moment, resolve};

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::catalog::{EntityDefinition, FieldKind};
use crate::doc::{Cond, raw_id};

const TARGET: &str = "formgraph::filter";

/// How the children of a tree are combined
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logic {
	#[default]
	#[serde(alias = "AND")]
	And,
	#[serde(alias = "OR")]
	Or,
}

impl FromStr for Logic {
	type Err = ();
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"and" => Ok(Self::And),
			"or" => Ok(Self::Or),
			_ => Err(()),
		}
	}
}

/// A nested group of predicates
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
	#[serde(default)]
	pub logic: Logic,
	pub filters: Vec<Node>,
}

/// A single `field operator value` clause
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
	pub field: String,
	pub operator: String,
	#[serde(default)]
	pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
	Tree(Tree),
	Predicate(Predicate),
}

impl Node {
	pub fn predicate(field: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
		Node::Predicate(Predicate {
			field: field.into(),
			operator: operator.into(),
			value,
		})
	}

	pub fn tree(logic: Logic, filters: Vec<Node>) -> Self {
		Node::Tree(Tree {
			logic,
			filters,
		})
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operator {
	Eq,
	Neq,
	Lt,
	Lte,
	Gt,
	Gte,
	StartsWith,
	EndsWith,
	Contains,
	DoesNotContain,
	IsEmpty,
	IsNotEmpty,
	IsNull,
	IsNotNull,
	In,
	NotIn,
}

impl FromStr for Operator {
	type Err = ();
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s.to_ascii_lowercase().as_str() {
			"eq" => Self::Eq,
			"neq" => Self::Neq,
			"lt" => Self::Lt,
			"lte" => Self::Lte,
			"gt" => Self::Gt,
			"gte" => Self::Gte,
			"startswith" => Self::StartsWith,
			"endswith" => Self::EndsWith,
			"contains" => Self::Contains,
			"doesnotcontain" => Self::DoesNotContain,
			"isempty" => Self::IsEmpty,
			"isnotempty" => Self::IsNotEmpty,
			"isnull" => Self::IsNull,
			"isnotnull" => Self::IsNotNull,
			"in" => Self::In,
			"notin" => Self::NotIn,
			_ => return Err(()),
		})
	}
}

impl fmt::Display for Operator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

/// A resolved filter target: the document path and the declared kind stored there
#[derive(Clone, Debug)]
struct Target {
	path: String,
	kind: FieldKind,
}

/// Compiles predicate trees for one entity
pub struct FilterCompiler<'a> {
	entity: &'a EntityDefinition,
	now: DateTime<Utc>,
}

impl<'a> FilterCompiler<'a> {
	pub fn new(entity: &'a EntityDefinition) -> Self {
		Self {
			entity,
			now: Utc::now(),
		}
	}

	/// Sets the instant date placeholders are resolved against
	pub fn at(mut self, now: DateTime<Utc>) -> Self {
		self.now = now;
		self
	}

	pub fn compile(&self, node: &Node) -> Cond {
		match node {
			Node::Tree(tree) => {
				let children: Vec<Cond> = tree
					.filters
					.iter()
					.map(|n| self.compile(n))
					.filter(|c| !c.is_all())
					.collect();
				match tree.logic {
					Logic::And => Cond::and(children),
					Logic::Or => Cond::or(children),
				}
			}
			Node::Predicate(p) => self.predicate(p).unwrap_or_default(),
		}
	}

	fn predicate(&self, p: &Predicate) -> Option<Cond> {
		if p.field == "ids" {
			let ids: Vec<Value> = list(&p.value).iter().filter_map(raw_id).map(Value::String).collect();
			return Some(Cond::field("id", json!({ "$in": ids })));
		}
		let Ok(op) = p.operator.parse::<Operator>() else {
			warn!(target: TARGET, "Dropping filter on '{}' with unknown operator '{}'", p.field, p.operator);
			return None;
		};
		let Some(target) = self.target(&p.field) else {
			warn!(target: TARGET, "Dropping filter on unknown field '{}' of {}", p.field, self.entity.name);
			return None;
		};
		let cond = match op {
			Operator::IsEmpty | Operator::IsNull | Operator::IsNotEmpty | Operator::IsNotNull => {
				Some(empty(&target, op))
			}
			_ if target.kind.is_multi() => self.multi(&target, op, &p.value),
			_ if target.kind.is_temporal() => self.temporal(&target, op, &p.value),
			_ if target.kind.is_reference() => reference(&target, op, &p.value),
			_ => scalar(&target, op, &p.value),
		};
		if cond.is_none() {
			warn!(target: TARGET, "Dropping filter '{} {op}' with unusable value {}", p.field, p.value);
		}
		cond
	}

	fn target(&self, field: &str) -> Option<Target> {
		let builtin = |path: &str, kind| {
			Some(Target {
				path: path.to_string(),
				kind,
			})
		};
		match field {
			"id" => builtin("id", FieldKind::Text),
			"createdAt" => builtin("createdAt", FieldKind::Datetime),
			"createdBy" => builtin("createdBy", FieldKind::Text),
			"incrementalId" => builtin("incrementalId", FieldKind::Text),
			_ => self.entity.field(field).map(|fd| Target {
				path: format!("data.{}", fd.name),
				kind: fd.kind,
			}),
		}
	}

	fn multi(&self, t: &Target, op: Operator, value: &Value) -> Option<Cond> {
		let values = list(value);
		match op {
			Operator::Eq => Some(set_equals(t, values)),
			Operator::Neq => Some(Cond::nor(vec![set_equals(t, values)])),
			Operator::Contains | Operator::In => {
				Some(Cond::field(&t.path, json!({ "$in": identifier_variants(&values) })))
			}
			Operator::DoesNotContain | Operator::NotIn => {
				Some(Cond::field(&t.path, json!({ "$nin": identifier_variants(&values) })))
			}
			_ => scalar(t, op, value),
		}
	}

	fn temporal(&self, t: &Target, op: Operator, value: &Value) -> Option<Cond> {
		if t.kind == FieldKind::Time {
			let text = value.as_str()?.trim();
			let text = match resolve(text, self.now) {
				Some(m) if !text.contains(':') => m.instant.format("%H:%M").to_string(),
				_ => text.to_string(),
			};
			return scalar(t, op, &Value::String(text));
		}
		match op {
			Operator::Contains
			| Operator::StartsWith
			| Operator::EndsWith
			| Operator::DoesNotContain => scalar(t, op, value),
			Operator::In | Operator::NotIn => {
				let values = list(value);
				if values.is_empty() {
					return scalar(t, op, value);
				}
				let days = values
					.iter()
					.map(|v| self.moment(v).map(|m| self.equals(t, m)))
					.collect::<Option<Vec<_>>>()?;
				let any = Cond::or(days);
				Some(match op {
					Operator::In => any,
					_ => Cond::nor(vec![any]),
				})
			}
			Operator::Eq => Some(self.equals(t, self.moment(value)?)),
			Operator::Neq => Some(Cond::nor(vec![self.equals(t, self.moment(value)?)])),
			Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
				let m = self.moment(value)?;
				let spec = if self.is_day(t, &m) {
					match op {
						Operator::Lt => json!({ "$lt": date(m.day_start()) }),
						Operator::Lte => json!({ "$lt": date(m.next_day()) }),
						Operator::Gt => json!({ "$gte": date(m.next_day()) }),
						_ => json!({ "$gte": date(m.day_start()) }),
					}
				} else {
					json!({ mongo(op): date(m.instant) })
				};
				Some(Cond::field(&t.path, spec))
			}
			Operator::IsEmpty | Operator::IsNotEmpty | Operator::IsNull | Operator::IsNotNull => {
				Some(empty(t, op))
			}
		}
	}

	fn moment(&self, value: &Value) -> Option<Moment> {
		resolve(value.as_str()?, self.now)
	}

	fn is_day(&self, t: &Target, m: &Moment) -> bool {
		t.kind == FieldKind::Date || m.whole_day
	}

	/// Dates match the whole day, timestamps match the exact instant
	fn equals(&self, t: &Target, m: Moment) -> Cond {
		if self.is_day(t, &m) {
			Cond::field(&t.path, json!({ "$gte": date(m.day_start()), "$lt": date(m.next_day()) }))
		} else {
			Cond::field(&t.path, date(m.instant))
		}
	}
}

fn date(at: DateTime<Utc>) -> Value {
	json!({ "$date": at.to_rfc3339_opts(SecondsFormat::Millis, true) })
}

fn mongo(op: Operator) -> &'static str {
	match op {
		Operator::Lt => "$lt",
		Operator::Lte => "$lte",
		Operator::Gt => "$gt",
		_ => "$gte",
	}
}

/// A single value or a list of values as a list
fn list(value: &Value) -> Vec<Value> {
	match value {
		Value::Null => Vec::new(),
		Value::Array(v) => v.clone(),
		v => vec![v.clone()],
	}
}

fn number(text: &str) -> Option<Value> {
	if let Ok(i) = text.parse::<i64>() {
		return Some(json!(i));
	}
	text.parse::<f64>()
		.ok()
		.filter(|f| f.is_finite())
		.and_then(serde_json::Number::from_f64)
		.map(Value::Number)
}

/// The string and numeric forms of a numeric-looking value
fn numeric_forms(value: &Value) -> Option<(Value, Value)> {
	match value {
		Value::String(s) => {
			let n = number(s.trim())?;
			Some((value.clone(), n))
		}
		Value::Number(n) => Some((Value::String(n.to_string()), value.clone())),
		_ => None,
	}
}

fn variants(value: &Value) -> Vec<Value> {
	match numeric_forms(value) {
		Some((s, n)) => vec![s, n],
		None => vec![value.clone()],
	}
}

fn is_identifier(text: &str) -> bool {
	(text.len() == 24 && text.chars().all(|c| c.is_ascii_hexdigit()))
		|| uuid::Uuid::parse_str(text).is_ok()
}

/// Each value as stored raw and, when it looks like an identifier, as a typed identifier
fn identifier_variants(values: &[Value]) -> Vec<Value> {
	let mut out = Vec::with_capacity(values.len() * 2);
	for v in values {
		out.push(v.clone());
		if let Some(s) = v.as_str().filter(|s| is_identifier(s)) {
			out.push(json!({ "$oid": s }));
		}
	}
	out
}

/// References may be stored raw or as typed identifiers, so both forms are matched
fn reference(t: &Target, op: Operator, value: &Value) -> Option<Cond> {
	let ids: Vec<Value> = list(value)
		.iter()
		.filter_map(raw_id)
		.flat_map(|id| [json!(id), json!({ "$oid": id })])
		.collect();
	match op {
		Operator::Eq | Operator::In => Some(Cond::field(&t.path, json!({ "$in": ids }))),
		Operator::Neq | Operator::NotIn => Some(Cond::field(&t.path, json!({ "$nin": ids }))),
		_ => scalar(t, op, value),
	}
}

fn set_equals(t: &Target, values: Vec<Value>) -> Cond {
	Cond::field(&t.path, json!({ "$size": values.len(), "$all": values }))
}

/// Absent, null and (for collections) empty values are all treated as empty
fn empty(t: &Target, op: Operator) -> Cond {
	let mut states = vec![
		Cond::field(&t.path, json!({ "$exists": false })),
		Cond::field(&t.path, Value::Null),
	];
	if t.kind.is_multi() {
		states.push(Cond::field(&t.path, json!({ "$size": 0 })));
	} else if matches!(op, Operator::IsEmpty | Operator::IsNotEmpty) {
		states.push(Cond::field(&t.path, json!("")));
	}
	match op {
		Operator::IsEmpty | Operator::IsNull => Cond::or(states),
		_ => Cond::nor(states),
	}
}

fn text(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Bool(b) => Some(b.to_string()),
		_ => None,
	}
}

fn scalar(t: &Target, op: Operator, value: &Value) -> Option<Cond> {
	let path = t.path.as_str();
	match op {
		Operator::Eq => Some(match numeric_forms(value) {
			Some((s, n)) => Cond::or(vec![Cond::field(path, s), Cond::field(path, n)]),
			None => Cond::field(path, value.clone()),
		}),
		Operator::Neq => Some(Cond::field(path, json!({ "$nin": variants(value) }))),
		Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
			let operand = match numeric_forms(value) {
				Some((_, n)) if t.kind.is_numeric() => n,
				_ => value.clone(),
			};
			Some(Cond::field(path, json!({ mongo(op): operand })))
		}
		Operator::Contains | Operator::StartsWith | Operator::EndsWith | Operator::DoesNotContain => {
			let escaped = regex::escape(&text(value)?);
			let pattern = match op {
				Operator::StartsWith => format!("^{escaped}"),
				Operator::EndsWith => format!("{escaped}$"),
				_ => escaped,
			};
			let re = json!({ "$regex": pattern, "$options": "i" });
			Some(match op {
				Operator::DoesNotContain => Cond::field(path, json!({ "$not": re })),
				_ => Cond::field(path, re),
			})
		}
		Operator::In => {
			let values: Vec<Value> = list(value).iter().flat_map(variants).collect();
			Some(Cond::field(path, json!({ "$in": values })))
		}
		Operator::NotIn => {
			let values: Vec<Value> = list(value).iter().flat_map(variants).collect();
			Some(Cond::field(path, json!({ "$nin": values })))
		}
		Operator::IsEmpty | Operator::IsNotEmpty | Operator::IsNull | Operator::IsNotNull => {
			Some(empty(t, op))
		}
	}
}
