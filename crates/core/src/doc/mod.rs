//! The generic record stored for every resource and form entry.

mod cond;

pub use cond::{Cond, Sort, parse_instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::Origin;

/// The single physical storage unit behind every synthesized entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resource: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub form: Option<String>,
	pub created_at: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub created_by: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub incremental_id: Option<String>,
	#[serde(default)]
	pub data: Map<String, Value>,
}

impl Record {
	/// Creates a record owned by the given resource or form with a fresh identifier
	pub fn new(origin: Origin, owner: impl Into<String>, data: Map<String, Value>) -> Self {
		Self::with_id(uuid::Uuid::now_v7().to_string(), origin, owner, data)
	}

	pub fn with_id(
		id: impl Into<String>,
		origin: Origin,
		owner: impl Into<String>,
		data: Map<String, Value>,
	) -> Self {
		let owner = owner.into();
		let (resource, form) = match origin {
			Origin::Resource => (Some(owner), None),
			Origin::Form => (None, Some(owner)),
		};
		Self {
			id: id.into(),
			resource,
			form,
			created_at: Utc::now(),
			created_by: None,
			incremental_id: None,
			data,
		}
	}

	/// The resource or form this record belongs to
	pub fn owner(&self) -> Option<&str> {
		self.form.as_deref().or(self.resource.as_deref())
	}

	pub fn is_owned_by(&self, origin: Origin, owner: &str) -> bool {
		match origin {
			Origin::Resource => self.resource.as_deref() == Some(owner),
			Origin::Form => self.form.as_deref() == Some(owner),
		}
	}

	/// The record as a plain JSON document, the shape filters are evaluated against
	pub fn to_document(&self) -> Value {
		serde_json::to_value(self).unwrap_or(Value::Null)
	}
}

/// Extracts the raw identifier from a stored reference value
pub fn raw_id(value: &Value) -> Option<String> {
	match value {
		Value::String(s) if !s.is_empty() => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Object(o) => o
			.get("$oid")
			.or_else(|| o.get("id"))
			.and_then(Value::as_str)
			.map(str::to_string),
		_ => None,
	}
}

/// Extracts every raw identifier from a stored single or multiple reference value
pub fn raw_ids(value: &Value) -> Vec<String> {
	match value {
		Value::Array(v) => v.iter().filter_map(raw_id).collect(),
		v => raw_id(v).into_iter().collect(),
	}
}
