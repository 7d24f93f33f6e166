use std::collections::BTreeSet;
use std::sync::Arc;

use async_graphql::dynamic::{
	Field, FieldFuture, InputObject, InputValue, Object, Schema, Type, TypeRef,
};
use indexmap::IndexMap;

use crate::catalog::{EntityDefinition, Origin, ScalarType};
use crate::kvs::Collection;

use super::base::{BaseSchema, JSON, LIST_METADATA};
use super::error::{GqlError, internal_error, schema_error};
use super::relations::{self, Relationship};
use super::resolvers::{self, GENERATION, QUERY, ResolverTable};
use super::tables::{self, EntityField, EntityType, ResolverKind};

const TARGET: &str = "formgraph::gql";

/// A finished schema together with everything it was built from
pub struct Assembly {
	pub schema: Schema,
	pub sdl: String,
	pub resolvers: Arc<ResolverTable>,
	pub entities: Vec<Arc<EntityType>>,
	pub relationships: Vec<Relationship>,
}

/// Synthesizes the entity types of the given definitions and merges them into the base schema
///
/// Entities which cannot be synthesized are skipped. The function only fails when the merged
/// schema cannot be finished.
pub fn assemble(
	defs: &[EntityDefinition],
	base: &dyn BaseSchema,
	store: &Arc<dyn Collection>,
	generation: u64,
) -> Result<Assembly, GqlError> {
	let mut roots = base.root_fields();
	roots.insert(GENERATION.to_string());
	let (entities, rejected) = tables::synthesize(defs, &base.type_names(), &roots);
	if !rejected.is_empty() {
		warn!(target: TARGET, "{} of {} entities were left out of the schema", rejected.len(), defs.len());
	}
	let relationships = relations::resolve(&entities);
	let entities: Vec<Arc<EntityType>> = entities.into_iter().map(Arc::new).collect();
	let resolvers = Arc::new(resolvers::build(&entities, &relationships, generation));
	let schema = generate(&entities, &relationships, &resolvers, base, store)?;
	let sdl = schema.sdl();
	trace!(target: TARGET, "Generated schema {generation} with {} entities", entities.len());
	Ok(Assembly {
		schema,
		sdl,
		resolvers,
		entities,
		relationships,
	})
}

/// The schema holding only the base types
pub fn fallback(
	base: &dyn BaseSchema,
	store: &Arc<dyn Collection>,
	generation: u64,
) -> Result<Assembly, GqlError> {
	assemble(&[], base, store, generation)
}

fn generate(
	entities: &[Arc<EntityType>],
	relationships: &[Relationship],
	table: &ResolverTable,
	base: &dyn BaseSchema,
	store: &Arc<dyn Collection>,
) -> Result<Schema, GqlError> {
	let mut objects: IndexMap<String, Object> = IndexMap::new();
	let mut types: Vec<Type> = Vec::new();
	let mut query = Object::new(QUERY);

	for e in entities {
		let mut object = Object::new(&e.name).description(format!(
			"{} `{}`",
			match e.origin() {
				Origin::Resource => "Records of the resource",
				Origin::Form => "Submissions of the form",
			},
			e.definition.name
		));
		for f in &e.fields {
			object = object.field(field(table, store, &e.name, &f.name, output_type(f))?);
		}
		objects.insert(e.name.clone(), object);
		types.push(Type::InputObject(filter_input(e)));

		let mut meta = Object::new(e.meta_name());
		for f in &e.fields {
			meta = meta.field(field(table, store, &e.meta_name(), &f.name, TypeRef::named_nn(JSON))?);
		}
		types.push(Type::Object(meta));

		query = query
			.field(
				field(table, store, QUERY, &e.singular, TypeRef::named(&e.name))?
					.argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID))),
			)
			.field(
				field(table, store, QUERY, &e.collection_field(), TypeRef::named_nn_list_nn(&e.name))?
					.argument(InputValue::new("page", TypeRef::named(TypeRef::INT)))
					.argument(InputValue::new("perPage", TypeRef::named(TypeRef::INT)))
					.argument(InputValue::new("sortField", TypeRef::named(TypeRef::STRING)))
					.argument(InputValue::new("sortOrder", TypeRef::named(TypeRef::STRING)))
					.argument(InputValue::new("filter", TypeRef::named(e.filter_name()))),
			)
			.field(field(table, store, QUERY, &e.meta_field(), TypeRef::named_nn(e.meta_name()))?)
			.field(
				field(table, store, QUERY, &e.count_field(), TypeRef::named_nn(LIST_METADATA))?
					.argument(InputValue::new("filter", TypeRef::named(e.filter_name()))),
			);
	}

	for r in relationships {
		let forward = if r.many() {
			TypeRef::named_nn_list_nn(&r.to)
		} else {
			TypeRef::named(&r.to)
		};
		extend(&mut objects, &r.from, field(table, store, &r.from, &r.forward, forward)?)?;
		let reverse = field(table, store, &r.to, &r.reverse, TypeRef::named_nn_list_nn(&r.from))?
			.argument(InputValue::new("filter", TypeRef::named(format!("{}Filter", r.from))))
			.argument(InputValue::new("sortField", TypeRef::named(TypeRef::STRING)))
			.argument(InputValue::new("sortOrder", TypeRef::named(TypeRef::STRING)));
		extend(&mut objects, &r.to, reverse)?;
	}

	query = query.field(field(table, store, QUERY, GENERATION, TypeRef::named_nn(TypeRef::INT))?);

	let (mut schema, query) = base.register(Schema::build(QUERY, None, None), query);
	schema = schema.register(query);
	for (_, object) in objects {
		schema = schema.register(object);
	}
	for ty in types {
		schema = schema.register(ty);
	}
	schema.finish().map_err(|e| schema_error(format!("there was an error generating schema: {e:?}")))
}

/// Wires a schema field to its entry in the resolver table
fn field(
	table: &ResolverTable,
	store: &Arc<dyn Collection>,
	ty: &str,
	name: &str,
	type_ref: TypeRef,
) -> Result<Field, GqlError> {
	let resolver = table
		.get(&(ty.to_string(), name.to_string()))
		.cloned()
		.ok_or_else(|| internal_error(format!("No resolver registered for {ty}.{name}")))?;
	let store = store.clone();
	Ok(Field::new(name, type_ref, move |ctx| {
		let resolver = resolver.clone();
		let store = store.clone();
		FieldFuture::new(async move {
			let value = resolver.resolve(ctx, &store).await?;
			Ok(value)
		})
	}))
}

/// Adds a relationship field to an already declared entity object
fn extend(objects: &mut IndexMap<String, Object>, ty: &str, field: Field) -> Result<(), GqlError> {
	let object = objects
		.get_mut(ty)
		.ok_or_else(|| internal_error(format!("Relationship refers to the unknown type {ty}")))?;
	let taken = std::mem::replace(object, Object::new(ty));
	*object = taken.field(field);
	Ok(())
}

fn scalar(ty: ScalarType) -> &'static str {
	match ty {
		ScalarType::Id | ScalarType::IdList => TypeRef::ID,
		ScalarType::String => TypeRef::STRING,
		ScalarType::Float => TypeRef::FLOAT,
		ScalarType::Boolean => TypeRef::BOOLEAN,
		ScalarType::Json => JSON,
	}
}

fn output_type(f: &EntityField) -> TypeRef {
	match f.ty {
		_ if f.resolver == ResolverKind::Id => TypeRef::named_nn(TypeRef::ID),
		ScalarType::IdList => TypeRef::named_list(TypeRef::ID),
		ty => TypeRef::named(scalar(ty)),
	}
}

/// The `<Type>Filter` input: one key per field, range keys for ordered fields, and the
/// `q`, `ids`, `logic` and `filters` keys
fn filter_input(e: &EntityType) -> InputObject {
	let mut input = InputObject::new(e.filter_name());
	let mut seen = BTreeSet::new();
	let mut add = |input: InputObject, name: String, ty: TypeRef| {
		if seen.insert(name.clone()) {
			input.field(InputValue::new(name, ty))
		} else {
			debug!(target: TARGET, "Filter key {name} of {} is already taken", e.name);
			input
		}
	};
	input = add(input, "q".into(), TypeRef::named(TypeRef::STRING));
	input = add(input, "ids".into(), TypeRef::named_list(TypeRef::ID));
	input = add(input, "logic".into(), TypeRef::named(TypeRef::STRING));
	input = add(input, "filters".into(), TypeRef::named_list(JSON));
	for f in &e.fields {
		let kind = f.kind();
		let ty = match f.ty {
			ScalarType::IdList => TypeRef::named_list(TypeRef::ID),
			ScalarType::Json if kind.is_multi() => TypeRef::named_list(TypeRef::STRING),
			ScalarType::Json => continue,
			ty => TypeRef::named(scalar(ty)),
		};
		input = add(input, f.name.clone(), ty);
		if kind.is_rangeable() {
			let bound = if kind.is_numeric() {
				TypeRef::FLOAT
			} else {
				TypeRef::STRING
			};
			for suffix in ["lt", "lte", "gt", "gte"] {
				input = add(input, format!("{}_{suffix}", f.name), TypeRef::named(bound));
			}
		}
	}
	input
}
