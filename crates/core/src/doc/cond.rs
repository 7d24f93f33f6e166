use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

const TARGET: &str = "formgraph::doc";

/// A MongoDB-like document filter
///
/// The filter is kept as its JSON form so that it can be handed unchanged to a document store
/// which understands the same algebra. [`Cond::matches`] evaluates it in process for the
/// in-memory collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cond(pub Value);

impl Default for Cond {
	fn default() -> Self {
		Self::all()
	}
}

impl Cond {
	/// The filter which matches every document
	pub fn all() -> Self {
		Cond(Value::Object(Map::new()))
	}

	/// A filter on a single document path
	pub fn field(path: impl Into<String>, spec: Value) -> Self {
		let mut map = Map::new();
		map.insert(path.into(), spec);
		Cond(Value::Object(map))
	}

	pub fn is_all(&self) -> bool {
		matches!(&self.0, Value::Object(m) if m.is_empty())
	}

	/// Matches documents matched by every given filter
	pub fn and(conds: Vec<Cond>) -> Self {
		let conds: Vec<Cond> = conds.into_iter().filter(|c| !c.is_all()).collect();
		Self::combine("$and", conds)
	}

	/// Matches documents matched by any given filter
	pub fn or(conds: Vec<Cond>) -> Self {
		if conds.iter().any(Cond::is_all) {
			return Self::all();
		}
		Self::combine("$or", conds)
	}

	/// Matches documents matched by none of the given filters
	pub fn nor(conds: Vec<Cond>) -> Self {
		if conds.is_empty() {
			return Self::all();
		}
		Cond(json!({ "$nor": conds.into_iter().map(|c| c.0).collect::<Vec<_>>() }))
	}

	fn combine(op: &str, mut conds: Vec<Cond>) -> Self {
		match conds.len() {
			0 => Self::all(),
			1 => conds.remove(0),
			_ => Cond(json!({ op: conds.into_iter().map(|c| c.0).collect::<Vec<_>>() })),
		}
	}

	/// Evaluates the filter against a document
	pub fn matches(&self, doc: &Value) -> bool {
		matches_value(&self.0, doc)
	}
}

/// A single sort key over a document path
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sort {
	pub path: String,
	pub ascending: bool,
}

impl Sort {
	pub fn asc(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			ascending: true,
		}
	}

	pub fn desc(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			ascending: false,
		}
	}

	/// Orders two documents by a list of sort keys
	pub fn compare(sorts: &[Sort], a: &Value, b: &Value) -> Ordering {
		for sort in sorts {
			let ord = compare_values(lookup(a, &sort.path), lookup(b, &sort.path));
			let ord = if sort.ascending {
				ord
			} else {
				ord.reverse()
			};
			if ord != Ordering::Equal {
				return ord;
			}
		}
		Ordering::Equal
	}
}

/// Parses a stored date or timestamp, assuming UTC when no offset is present
pub fn parse_instant(input: &str) -> Option<DateTime<Utc>> {
	let input = input.trim();
	if let Ok(v) = DateTime::parse_from_rfc3339(input) {
		return Some(v.with_timezone(&Utc));
	}
	for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
		if let Ok(v) = NaiveDateTime::parse_from_str(input, fmt) {
			return Some(v.and_utc());
		}
	}
	NaiveDate::parse_from_str(input, "%Y-%m-%d")
		.ok()
		.and_then(|d| d.and_hms_opt(0, 0, 0))
		.map(|v| v.and_utc())
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
	path.split('.').try_fold(doc, |v, part| match v {
		Value::Object(m) => m.get(part),
		Value::Array(a) => part.parse::<usize>().ok().and_then(|i| a.get(i)),
		_ => None,
	})
}

fn children(spec: &Value) -> &[Value] {
	spec.as_array().map(Vec::as_slice).unwrap_or(&[])
}

fn matches_value(cond: &Value, doc: &Value) -> bool {
	match cond {
		Value::Object(m) => matches_doc(m, doc),
		_ => false,
	}
}

fn matches_doc(cond: &Map<String, Value>, doc: &Value) -> bool {
	cond.iter().all(|(key, spec)| match key.as_str() {
		"$and" => children(spec).iter().all(|c| matches_value(c, doc)),
		"$or" => {
			let list = children(spec);
			list.is_empty() || list.iter().any(|c| matches_value(c, doc))
		}
		"$nor" => !children(spec).iter().any(|c| matches_value(c, doc)),
		path => matches_field(lookup(doc, path), spec),
	})
}

/// Extended JSON operands such as `{"$date": ..}` are values, not operator maps
fn is_operand(map: &Map<String, Value>) -> bool {
	map.len() == 1 && (map.contains_key("$date") || map.contains_key("$oid"))
}

fn is_operator_map(map: &Map<String, Value>) -> bool {
	!map.is_empty() && !is_operand(map) && map.keys().all(|k| k.starts_with('$'))
}

fn matches_field(value: Option<&Value>, spec: &Value) -> bool {
	match spec {
		Value::Object(ops) if is_operator_map(ops) => {
			ops.iter().all(|(op, arg)| apply(value, op, arg, ops))
		}
		_ => equals(value, spec),
	}
}

fn apply(value: Option<&Value>, op: &str, arg: &Value, ops: &Map<String, Value>) -> bool {
	match op {
		"$eq" => equals(value, arg),
		"$ne" => !equals(value, arg),
		"$gt" => compares(value, arg, |o| o == Ordering::Greater),
		"$gte" => compares(value, arg, |o| o != Ordering::Less),
		"$lt" => compares(value, arg, |o| o == Ordering::Less),
		"$lte" => compares(value, arg, |o| o != Ordering::Greater),
		"$in" => children(arg).iter().any(|a| equals(value, a)),
		"$nin" => !children(arg).iter().any(|a| equals(value, a)),
		"$exists" => arg.as_bool().unwrap_or(true) == value.is_some(),
		"$size" => match (value, arg.as_u64()) {
			(Some(Value::Array(a)), Some(n)) => a.len() as u64 == n,
			_ => false,
		},
		"$all" => match value {
			Some(Value::Array(items)) => {
				children(arg).iter().all(|x| items.iter().any(|e| same(e, x)))
			}
			_ => false,
		},
		"$regex" => regex_matches(value, arg, ops.get("$options")),
		"$options" => true,
		"$not" => !matches_field(value, arg),
		_ => {
			warn!(target: TARGET, "Ignoring unknown filter operator {op}");
			false
		}
	}
}

fn equals(value: Option<&Value>, arg: &Value) -> bool {
	if arg.is_null() {
		return match value {
			None | Some(Value::Null) => true,
			Some(Value::Array(items)) => items.iter().any(Value::is_null),
			_ => false,
		};
	}
	match value {
		None => false,
		Some(v @ Value::Array(items)) => same(v, arg) || items.iter().any(|e| same(e, arg)),
		Some(v) => same(v, arg),
	}
}

fn date_operand(operand: &Value) -> Option<DateTime<Utc>> {
	match operand {
		Value::Object(o) if is_operand(o) => o.get("$date").and_then(Value::as_str).and_then(parse_instant),
		_ => None,
	}
}

fn instant(stored: &Value) -> Option<DateTime<Utc>> {
	match stored {
		Value::String(s) => parse_instant(s),
		v => date_operand(v),
	}
}

fn same(stored: &Value, operand: &Value) -> bool {
	if let Some(date) = date_operand(operand) {
		return instant(stored) == Some(date);
	}
	match (stored, operand) {
		(Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
		(a, b) => a == b,
	}
}

fn order(stored: &Value, operand: &Value) -> Option<Ordering> {
	if let Some(date) = date_operand(operand) {
		return instant(stored).map(|s| s.cmp(&date));
	}
	match (stored, operand) {
		(Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
		(Value::String(a), Value::String(b)) => Some(a.cmp(b)),
		(Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
		_ => None,
	}
}

fn compares(value: Option<&Value>, arg: &Value, pred: impl Fn(Ordering) -> bool) -> bool {
	match value {
		Some(Value::Array(items)) => items.iter().any(|e| order(e, arg).is_some_and(&pred)),
		Some(v) => order(v, arg).is_some_and(pred),
		None => false,
	}
}

fn regex_matches(value: Option<&Value>, pattern: &Value, options: Option<&Value>) -> bool {
	let Some(pattern) = pattern.as_str() else {
		return false;
	};
	let insensitive = options.and_then(Value::as_str).is_some_and(|o| o.contains('i'));
	let re = match RegexBuilder::new(pattern).case_insensitive(insensitive).build() {
		Ok(re) => re,
		Err(e) => {
			warn!(target: TARGET, "Ignoring invalid regular expression {pattern}: {e}");
			return false;
		}
	};
	match value {
		Some(Value::String(s)) => re.is_match(s),
		Some(Value::Number(n)) => re.is_match(&n.to_string()),
		Some(Value::Array(items)) => items.iter().any(|e| e.as_str().is_some_and(|s| re.is_match(s))),
		_ => false,
	}
}

fn rank(v: Option<&Value>) -> u8 {
	match v {
		None | Some(Value::Null) => 0,
		Some(Value::Number(_)) => 1,
		Some(Value::String(_)) => 2,
		Some(Value::Object(_)) => 3,
		Some(Value::Array(_)) => 4,
		Some(Value::Bool(_)) => 5,
	}
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
	match (a, b) {
		(Some(Value::Number(x)), Some(Value::Number(y))) => {
			x.as_f64().unwrap_or(0.0).total_cmp(&y.as_f64().unwrap_or(0.0))
		}
		(Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
		(Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
		_ => rank(a).cmp(&rank(b)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn doc() -> Value {
		json!({
			"id": "I1",
			"resource": "invoices",
			"createdAt": "2024-03-05T10:00:00Z",
			"data": {
				"customer": "C1",
				"total": 42,
				"legacy": "42",
				"name": "Acme Widgets",
				"tags": ["a", "b"],
				"due": "2024-03-10",
				"empty": [],
				"nothing": null,
				"owner": {"$oid": "650000000000000000000001"}
			}
		})
	}

	#[rstest]
	#[case::identity(json!({}), true)]
	#[case::plain_eq(json!({"data.customer": "C1"}), true)]
	#[case::plain_mismatch(json!({"data.customer": "C2"}), false)]
	#[case::number_eq(json!({"data.total": 42.0}), true)]
	#[case::string_is_not_number(json!({"data.legacy": 42}), false)]
	#[case::ne(json!({"data.customer": {"$ne": "C2"}}), true)]
	#[case::gt(json!({"data.total": {"$gt": 40}}), true)]
	#[case::lte(json!({"data.total": {"$lte": 41}}), false)]
	#[case::in_list(json!({"data.customer": {"$in": ["C0", "C1"]}}), true)]
	#[case::nin_list(json!({"data.customer": {"$nin": ["C0", "C1"]}}), false)]
	#[case::array_element(json!({"data.tags": "b"}), true)]
	#[case::array_whole(json!({"data.tags": ["a", "b"]}), true)]
	#[case::size_all(json!({"data.tags": {"$size": 2, "$all": ["b", "a"]}}), true)]
	#[case::size_mismatch(json!({"data.tags": {"$size": 1, "$all": ["a"]}}), false)]
	#[case::missing_is_null(json!({"data.absent": null}), true)]
	#[case::null_is_null(json!({"data.nothing": null}), true)]
	#[case::exists(json!({"data.nothing": {"$exists": true}}), true)]
	#[case::not_exists(json!({"data.absent": {"$exists": false}}), true)]
	#[case::empty_array(json!({"data.empty": {"$size": 0}}), true)]
	#[case::regex(json!({"data.name": {"$regex": "widget", "$options": "i"}}), true)]
	#[case::regex_case(json!({"data.name": {"$regex": "widget"}}), false)]
	#[case::not_regex(json!({"data.name": {"$not": {"$regex": "^acme", "$options": "i"}}}), false)]
	#[case::oid(json!({"data.owner": {"$in": [{"$oid": "650000000000000000000001"}]}}), true)]
	#[case::oid_is_not_string(json!({"data.owner": "650000000000000000000001"}), false)]
	#[case::date_range(json!({"data.due": {"$gte": {"$date": "2024-03-10T00:00:00Z"}, "$lt": {"$date": "2024-03-11T00:00:00Z"}}}), true)]
	#[case::created_before(json!({"createdAt": {"$lt": {"$date": "2024-03-05T09:00:00Z"}}}), false)]
	#[case::and(json!({"$and": [{"data.customer": "C1"}, {"data.total": 42}]}), true)]
	#[case::or(json!({"$or": [{"data.customer": "C2"}, {"data.total": 42}]}), true)]
	#[case::nor(json!({"$nor": [{"data.customer": "C2"}, {"data.total": 42}]}), false)]
	#[case::empty_or(json!({"$or": []}), true)]
	fn evaluates_filters(#[case] cond: Value, #[case] expected: bool) {
		assert_eq!(Cond(cond).matches(&doc()), expected);
	}

	#[test]
	fn combinators_simplify() {
		assert!(Cond::and(vec![]).is_all());
		assert!(Cond::or(vec![]).is_all());
		assert!(Cond::nor(vec![]).is_all());
		let single = Cond::field("a", json!(1));
		assert_eq!(Cond::and(vec![Cond::all(), single.clone()]), single);
		assert!(Cond::or(vec![Cond::all(), single]).is_all());
	}

	#[rstest]
	#[case::rfc3339("2024-03-05T10:00:00+02:00", "2024-03-05T08:00:00Z")]
	#[case::naive("2024-03-05T10:00:00", "2024-03-05T10:00:00Z")]
	#[case::minutes("2024-03-05T10:00", "2024-03-05T10:00:00Z")]
	#[case::date("2024-03-05", "2024-03-05T00:00:00Z")]
	fn parses_instants(#[case] input: &str, #[case] expected: &str) {
		let expected = DateTime::parse_from_rfc3339(expected).unwrap().with_timezone(&Utc);
		assert_eq!(parse_instant(input), Some(expected));
	}

	#[test]
	fn sorts_by_type_rank_then_value() {
		let mut docs = vec![
			json!({"id": "3", "v": "b"}),
			json!({"id": "1", "v": 2}),
			json!({"id": "2"}),
			json!({"id": "4", "v": "a"}),
		];
		docs.sort_by(|a, b| Sort::compare(&[Sort::asc("v")], a, b));
		let ids: Vec<_> = docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
		assert_eq!(ids, vec!["2", "1", "4", "3"]);
		docs.sort_by(|a, b| Sort::compare(&[Sort::desc("id")], a, b));
		assert_eq!(docs[0]["id"], json!("4"));
	}
}
