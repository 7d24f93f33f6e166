use std::collections::BTreeMap;
use std::sync::Arc;

use async_graphql::dynamic::{FieldValue, ResolverContext};
use async_graphql::{Number, Value as GqlValue};
use serde_json::{Value, json};

use crate::catalog::ScalarType;
use crate::cnf::{DEFAULT_PER_PAGE, MAX_PER_PAGE, RELATION_META_DEPTH};
use crate::doc::{Cond, Record, Sort, raw_id, raw_ids};
use crate::err::Error;
use crate::filter::{self, FilterCompiler};
use crate::kvs::Collection;

use super::base::ListCount;
use super::error::{GqlError, internal_error, resolver_error, type_error};
use super::meta;
use super::relations::Relationship;
use super::tables::{EntityType, ResolverKind};
use super::utils::GqlValueUtils;

const TARGET: &str = "formgraph::gql";

/// The resolvers of one schema generation, keyed by `(type, field)`
pub type ResolverTable = BTreeMap<(String, String), Arc<Resolver>>;

/// The root type owning every query entry point
pub const QUERY: &str = "Query";

/// The root field reporting the schema generation
pub const GENERATION: &str = "_generation";

/// Placeholder parent value of a `<Type>Meta` object
pub struct MetaRoot;

/// How a single schema field is resolved
#[derive(Debug)]
pub enum Resolver {
	/// `<entity>(id)`
	Item(Arc<EntityType>),
	/// `all<Entities>(page, perPage, sortField, sortOrder, filter)`
	Collection(Arc<EntityType>),
	/// `_all<Entities>Meta(filter)`
	Count(Arc<EntityType>),
	/// `_<entity>Meta`
	Meta(Arc<EntityType>),
	Id,
	CreatedAt,
	CreatedBy,
	Scalar {
		key: String,
		ty: ScalarType,
	},
	Reference {
		key: String,
		many: bool,
	},
	Forward {
		key: String,
		many: bool,
		target: Arc<EntityType>,
	},
	Reverse {
		key: String,
		owner: Arc<EntityType>,
	},
	MetaField(Value),
	Generation(u64),
}

fn parent<'a>(ctx: &ResolverContext<'a>) -> Result<&'a Record, GqlError> {
	let value: &'a FieldValue<'a> = ctx.parent_value;
	value
		.try_downcast_ref::<Record>()
		.map_err(|_| internal_error("Expected a record as the parent value"))
}

fn owner(entity: &EntityType) -> Cond {
	Cond::field(entity.origin().owner_key(), json!(entity.id()))
}

/// The path a sort field refers to in the stored document
fn sort_path(entity: &EntityType, field: &str) -> Option<String> {
	match field {
		"id" | "createdAt" | "createdBy" | "incrementalId" => Some(field.to_string()),
		_ => entity.definition.field(field).map(|fd| format!("data.{}", fd.name)),
	}
}

fn sort(entity: &EntityType, field: Option<&GqlValue>, order: Option<&GqlValue>) -> Vec<Sort> {
	let ascending =
		!order.and_then(GqlValueUtils::as_string).is_some_and(|o| o.eq_ignore_ascii_case("desc"));
	let path = match field.and_then(GqlValueUtils::as_string) {
		None => "id".to_string(),
		Some(f) => sort_path(entity, &f).unwrap_or_else(|| {
			warn!(target: TARGET, "Ignoring unknown sort field {f} on {}", entity.name);
			"id".to_string()
		}),
	};
	let tiebreak = path != "id";
	let mut sorts = vec![Sort {
		path,
		ascending,
	}];
	if tiebreak {
		sorts.push(Sort::asc("id"));
	}
	sorts
}

/// Compiles the `filter` argument of a collection, count or reverse field
fn filter(entity: &EntityType, value: Option<&GqlValue>) -> Result<Cond, GqlError> {
	let Some(value) = value.filter(|v| !matches!(v, GqlValue::Null)) else {
		return Ok(Cond::all());
	};
	match value.clone().into_json() {
		Ok(Value::Object(map)) => {
			let node = filter::from_object(&entity.definition, &map);
			Ok(FilterCompiler::new(&entity.definition).compile(&node))
		}
		Ok(_) => Err(resolver_error(format!("The filter of {} must be an object", entity.name))),
		Err(e) => Err(resolver_error(format!("Invalid filter: {e}"))),
	}
}

/// Converts a stored value to the declared GraphQL type, yielding null when it does not fit
pub fn json_to_gql_value(value: &Value, ty: ScalarType) -> Result<GqlValue, GqlError> {
	if value.is_null() {
		return Ok(GqlValue::Null);
	}
	let out = match ty {
		ScalarType::Id => raw_id(value).map(GqlValue::String).unwrap_or(GqlValue::Null),
		ScalarType::IdList => {
			GqlValue::List(raw_ids(value).into_iter().map(GqlValue::String).collect())
		}
		ScalarType::String => match value {
			Value::String(s) => GqlValue::String(s.clone()),
			Value::Number(n) => GqlValue::String(n.to_string()),
			Value::Bool(b) => GqlValue::String(b.to_string()),
			other => GqlValue::String(other.to_string()),
		},
		ScalarType::Float => {
			let f = match value {
				Value::Number(n) => n.as_f64(),
				Value::String(s) => s.trim().parse::<f64>().ok(),
				_ => None,
			};
			f.and_then(Number::from_f64).map(GqlValue::Number).unwrap_or(GqlValue::Null)
		}
		ScalarType::Boolean => match value {
			Value::Bool(b) => GqlValue::Boolean(*b),
			Value::String(s) if s.eq_ignore_ascii_case("true") => GqlValue::Boolean(true),
			Value::String(s) if s.eq_ignore_ascii_case("false") => GqlValue::Boolean(false),
			_ => GqlValue::Null,
		},
		ScalarType::Json => GqlValue::from_json(value.clone())
			.map_err(|_| type_error(ty, &GqlValue::String(value.to_string())))?,
	};
	Ok(out)
}

/// A failed read means the collection could not be reached
fn unavailable(e: anyhow::Error) -> GqlError {
	match e.downcast::<Error>() {
		Ok(e @ Error::CollectionUnavailable(_)) => e.into(),
		Ok(e) => Error::CollectionUnavailable(e.to_string()).into(),
		Err(e) => Error::CollectionUnavailable(e.to_string()).into(),
	}
}

fn string(value: impl Into<String>) -> FieldValue<'static> {
	FieldValue::value(GqlValue::String(value.into()))
}

impl Resolver {
	pub async fn resolve<'a>(
		&self,
		ctx: ResolverContext<'a>,
		store: &Arc<dyn Collection>,
	) -> Result<Option<FieldValue<'a>>, GqlError> {
		let args = ctx.args.as_index_map();
		match self {
			Resolver::Item(entity) => {
				let id = args
					.get("id")
					.and_then(GqlValueUtils::as_string)
					.ok_or_else(|| resolver_error(format!("{} requires an id", entity.singular)))?;
				let record = store.get(&id).await.map_err(unavailable)?;
				Ok(record
					.filter(|r| r.is_owned_by(entity.origin(), entity.id()))
					.map(FieldValue::owned_any))
			}
			Resolver::Collection(entity) => {
				let page = args.get("page").and_then(GqlValueUtils::as_i64).unwrap_or(0).max(0);
				let per_page = args
					.get("perPage")
					.and_then(GqlValueUtils::as_i64)
					.map(|n| n.max(0) as usize)
					.unwrap_or(*DEFAULT_PER_PAGE)
					.min(*MAX_PER_PAGE);
				let order = sort(entity, args.get("sortField"), args.get("sortOrder"));
				let cond = Cond::and(vec![owner(entity), filter(entity, args.get("filter"))?]);
				let skip = (page as usize).saturating_mul(per_page);
				let records = store.find(&cond, &order, skip, Some(per_page)).await.map_err(unavailable)?;
				Ok(Some(FieldValue::list(records.into_iter().map(FieldValue::owned_any))))
			}
			Resolver::Count(entity) => {
				let cond = Cond::and(vec![owner(entity), filter(entity, args.get("filter"))?]);
				let count = store.count(&cond).await.map_err(unavailable)?;
				Ok(Some(FieldValue::owned_any(ListCount(count))))
			}
			Resolver::Meta(_) => Ok(Some(FieldValue::owned_any(MetaRoot))),
			Resolver::Id => Ok(Some(string(parent(&ctx)?.id.clone()))),
			Resolver::CreatedAt => Ok(Some(string(parent(&ctx)?.created_at.to_rfc3339()))),
			Resolver::CreatedBy => Ok(parent(&ctx)?.created_by.clone().map(string)),
			Resolver::Scalar {
				key,
				ty,
			} => match parent(&ctx)?.data.get(key) {
				Some(v) => Ok(Some(FieldValue::value(json_to_gql_value(v, *ty)?))),
				None => Ok(None),
			},
			Resolver::Reference {
				key,
				many,
			} => {
				let ty = if *many {
					ScalarType::IdList
				} else {
					ScalarType::Id
				};
				match parent(&ctx)?.data.get(key) {
					Some(v) => Ok(Some(FieldValue::value(json_to_gql_value(v, ty)?))),
					None => Ok(None),
				}
			}
			Resolver::Forward {
				key,
				many,
				target,
			} => {
				let stored = parent(&ctx)?.data.get(key).cloned().unwrap_or(Value::Null);
				if *many {
					let ids = raw_ids(&stored);
					if ids.is_empty() {
						return Ok(Some(FieldValue::list(Vec::<FieldValue>::new())));
					}
					let cond = Cond::and(vec![owner(target), Cond::field("id", json!({ "$in": ids }))]);
					let mut records = store.find(&cond, &[], 0, None).await.map_err(unavailable)?;
					records.sort_by_key(|r| ids.iter().position(|id| *id == r.id));
					Ok(Some(FieldValue::list(records.into_iter().map(FieldValue::owned_any))))
				} else {
					let Some(id) = raw_id(&stored) else {
						return Ok(None);
					};
					let record = store.get(&id).await.map_err(unavailable)?;
					Ok(record
						.filter(|r| r.is_owned_by(target.origin(), target.id()))
						.map(FieldValue::owned_any))
				}
			}
			Resolver::Reverse {
				key,
				owner: source,
			} => {
				let id = parent(&ctx)?.id.clone();
				let link = Cond::field(
					format!("data.{key}"),
					json!({ "$in": [id.clone(), { "$oid": id }] }),
				);
				let cond = Cond::and(vec![owner(source), link, filter(source, args.get("filter"))?]);
				let order = sort(source, args.get("sortField"), args.get("sortOrder"));
				let records = store.find(&cond, &order, 0, None).await.map_err(unavailable)?;
				Ok(Some(FieldValue::list(records.into_iter().map(FieldValue::owned_any))))
			}
			Resolver::MetaField(v) => {
				let value = GqlValue::from_json(v.clone())
					.map_err(|e| internal_error(format!("Unable to convert metadata: {e}")))?;
				Ok(Some(FieldValue::value(value)))
			}
			Resolver::Generation(generation) => {
				Ok(Some(FieldValue::value(GqlValue::Number(Number::from(*generation)))))
			}
		}
	}
}

/// Builds the resolver of every field in a schema generation
pub fn build(
	entities: &[Arc<EntityType>],
	relationships: &[Relationship],
	generation: u64,
) -> ResolverTable {
	let mut table = ResolverTable::new();
	let mut add = |ty: &str, field: &str, resolver: Resolver| {
		table.insert((ty.to_string(), field.to_string()), Arc::new(resolver));
	};
	let by_name: BTreeMap<&str, &EntityType> =
		entities.iter().map(|e| (e.name.as_str(), e.as_ref())).collect();
	let shared: BTreeMap<&str, &Arc<EntityType>> =
		entities.iter().map(|e| (e.name.as_str(), e)).collect();

	for e in entities {
		add(QUERY, &e.singular, Resolver::Item(e.clone()));
		add(QUERY, &e.collection_field(), Resolver::Collection(e.clone()));
		add(QUERY, &e.meta_field(), Resolver::Meta(e.clone()));
		add(QUERY, &e.count_field(), Resolver::Count(e.clone()));
		for f in &e.fields {
			let resolver = match (f.resolver, &f.key) {
				(ResolverKind::Id, _) => Resolver::Id,
				(ResolverKind::CreatedAt, _) => Resolver::CreatedAt,
				(ResolverKind::CreatedBy, _) => Resolver::CreatedBy,
				(ResolverKind::Scalar, Some(key)) => Resolver::Scalar {
					key: key.clone(),
					ty: f.ty,
				},
				(ResolverKind::Reference, Some(key)) => Resolver::Reference {
					key: key.clone(),
					many: f.ty == ScalarType::IdList,
				},
				(_, None) => continue,
			};
			add(&e.name, &f.name, resolver);
		}
		let described = meta::entity_meta(e, relationships, &by_name, RELATION_META_DEPTH);
		for (name, descriptor) in described {
			add(&e.meta_name(), &name, Resolver::MetaField(descriptor));
		}
	}

	for r in relationships {
		let (Some(from), Some(to)) = (shared.get(r.from.as_str()), shared.get(r.to.as_str()))
		else {
			continue;
		};
		add(&r.from, &r.forward, Resolver::Forward {
			key: r.key.clone(),
			many: r.many(),
			target: Arc::clone(to),
		});
		add(&r.to, &r.reverse, Resolver::Reverse {
			key: r.key.clone(),
			owner: Arc::clone(from),
		});
	}

	add(QUERY, GENERATION, Resolver::Generation(generation));
	table
}
