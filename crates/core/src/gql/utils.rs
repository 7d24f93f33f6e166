use async_graphql::Value as GqlValue;

use crate::catalog::normalize;

pub(crate) trait GqlValueUtils {
	fn as_i64(&self) -> Option<i64>;
	fn as_string(&self) -> Option<String>;
}

impl GqlValueUtils for GqlValue {
	fn as_i64(&self) -> Option<i64> {
		if let GqlValue::Number(n) = self {
			n.as_i64()
		} else {
			None
		}
	}

	fn as_string(&self) -> Option<String> {
		match self {
			GqlValue::String(s) => Some(s.to_owned()),
			GqlValue::Enum(e) => Some(e.to_string()),
			_ => None,
		}
	}
}

/// The object type name of an entity: `purchase order` becomes `Purchase_order`
pub(crate) fn type_name(entity: &str) -> String {
	let name = normalize(entity);
	let mut chars = name.chars();
	match chars.next() {
		Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
		None => name,
	}
}

/// Lower-cases the first character: `Invoice` becomes `invoice`
pub(crate) fn singular(type_name: &str) -> String {
	let mut chars = type_name.chars();
	match chars.next() {
		Some(c) => c.to_ascii_lowercase().to_string() + chars.as_str(),
		None => String::new(),
	}
}

/// A simple English plural: `invoice` becomes `invoices`, `category` becomes `categories`
pub(crate) fn plural(word: &str) -> String {
	let lower = word.to_ascii_lowercase();
	if lower.ends_with('y')
		&& !lower.ends_with("ay")
		&& !lower.ends_with("ey")
		&& !lower.ends_with("oy")
		&& !lower.ends_with("uy")
	{
		format!("{}ies", &word[..word.len() - 1])
	} else if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
		format!("{word}es")
	} else {
		format!("{word}s")
	}
}
