use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The editor type of a field, as stored by the admin layer
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum FieldKind {
	Text,
	Comment,
	Email,
	Url,
	Numeric,
	Rating,
	Range,
	Boolean,
	Date,
	Datetime,
	Time,
	Dropdown,
	Radiogroup,
	Checkbox,
	Tagbox,
	Matrix,
	MatrixDropdown,
	MultipleText,
	Paneldynamic,
	File,
	Resource,
	Resources,
	#[serde(other)]
	Other,
}

/// The GraphQL representation of a field value
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ScalarType {
	Id,
	IdList,
	String,
	Float,
	Boolean,
	Json,
}

impl FieldKind {
	/// Fields which point at another resource
	pub fn is_reference(&self) -> bool {
		matches!(self, Self::Resource | Self::Resources)
	}

	/// Fields which store a collection of values
	pub fn is_multi(&self) -> bool {
		matches!(self, Self::Checkbox | Self::Tagbox | Self::Resources)
	}

	/// Fields searched by the free-text filter
	pub fn is_text(&self) -> bool {
		matches!(
			self,
			Self::Text
				| Self::Comment
				| Self::Email
				| Self::Url
				| Self::Dropdown
				| Self::Radiogroup
				| Self::Other
		)
	}

	pub fn is_numeric(&self) -> bool {
		matches!(self, Self::Numeric | Self::Rating | Self::Range)
	}

	pub fn is_temporal(&self) -> bool {
		matches!(self, Self::Date | Self::Datetime | Self::Time)
	}

	/// Fields which accept the `_lt`, `_lte`, `_gt` and `_gte` filter suffixes
	pub fn is_rangeable(&self) -> bool {
		self.is_numeric() || self.is_temporal()
	}

	pub fn scalar_type(&self) -> ScalarType {
		match self {
			Self::Resource => ScalarType::Id,
			Self::Resources => ScalarType::IdList,
			Self::Numeric | Self::Rating | Self::Range => ScalarType::Float,
			Self::Boolean => ScalarType::Boolean,
			Self::Checkbox
			| Self::Tagbox
			| Self::Matrix
			| Self::MatrixDropdown
			| Self::MultipleText
			| Self::Paneldynamic
			| Self::File => ScalarType::Json,
			_ => ScalarType::String,
		}
	}

	/// The stable lowercase name used in meta descriptors
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Text => "text",
			Self::Comment => "comment",
			Self::Email => "email",
			Self::Url => "url",
			Self::Numeric => "numeric",
			Self::Rating => "rating",
			Self::Range => "range",
			Self::Boolean => "boolean",
			Self::Date => "date",
			Self::Datetime => "datetime",
			Self::Time => "time",
			Self::Dropdown => "dropdown",
			Self::Radiogroup => "radiogroup",
			Self::Checkbox => "checkbox",
			Self::Tagbox => "tagbox",
			Self::Matrix => "matrix",
			Self::MatrixDropdown => "matrixDropdown",
			Self::MultipleText => "multipleText",
			Self::Paneldynamic => "paneldynamic",
			Self::File => "file",
			Self::Resource => "resource",
			Self::Resources => "resources",
			Self::Other => "other",
		}
	}
}

/// One selectable option of a choice field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Choice {
	pub value: Value,
	#[serde(default)]
	pub text: String,
}

/// The stored definition of a single resource or form field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
	pub name: String,
	#[serde(rename = "type")]
	pub kind: FieldKind,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub resource_ref: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub display_field: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub choices: Vec<Choice>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub rows: Vec<FieldDescriptor>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub columns: Vec<FieldDescriptor>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub items: Vec<FieldDescriptor>,
	#[serde(default)]
	pub required: bool,
}

impl FieldDescriptor {
	pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
		Self {
			name: name.into(),
			kind,
			resource_ref: None,
			display_field: None,
			choices: Vec::new(),
			rows: Vec::new(),
			columns: Vec::new(),
			items: Vec::new(),
			required: false,
		}
	}

	/// Creates a reference field pointing at another resource
	pub fn reference(name: impl Into<String>, target: impl Into<String>, many: bool) -> Self {
		let kind = if many {
			FieldKind::Resources
		} else {
			FieldKind::Resource
		};
		Self {
			resource_ref: Some(target.into()),
			..Self::new(name, kind)
		}
	}

	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}

	/// The GraphQL name of the stored value of this field
	pub fn scalar_name(&self) -> String {
		let name = normalize(&self.name);
		match self.kind {
			FieldKind::Resource => format!("{name}_id"),
			FieldKind::Resources => format!("{name}_ids"),
			_ => name,
		}
	}

	/// Checks the structural rules of a descriptor owned by `owner`
	pub fn validate(&self, owner: &str) -> Result<(), String> {
		if self.name.trim().is_empty() {
			return Err("a field has an empty name".to_string());
		}
		match (self.kind.is_reference(), &self.resource_ref) {
			(true, None) => {
				return Err(format!("the reference field '{}' has no target resource", self.name));
			}
			(false, Some(_)) => {
				return Err(format!(
					"the field '{}' of type '{}' cannot reference a resource",
					self.name,
					self.kind.as_str()
				));
			}
			(true, Some(target)) if target == owner => {
				return Err(format!("the field '{}' references its own entity", self.name));
			}
			_ => {}
		}
		for sub in self.rows.iter().chain(&self.columns).chain(&self.items) {
			sub.validate(owner)?;
		}
		Ok(())
	}
}

/// Replaces every character which is not valid in a GraphQL name with an underscore
pub fn normalize(name: &str) -> String {
	let mut out: String = name
		.trim()
		.chars()
		.map(|c| {
			if c.is_ascii_alphanumeric() || c == '_' {
				c
			} else {
				'_'
			}
		})
		.collect();
	if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
		out.insert(0, '_');
	}
	out
}
