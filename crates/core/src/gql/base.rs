use std::collections::BTreeSet;

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, Object, Scalar, SchemaBuilder, TypeRef};
use async_graphql::{Number, Value as GqlValue};

/// The scalar carrying arbitrary JSON values
pub const JSON: &str = "JSON";

/// The object returned by the `_all<Entities>Meta` count queries
pub const LIST_METADATA: &str = "ListMetadata";

/// The root field reporting the server version
pub const VERSION: &str = "_version";

/// Parent value of a `ListMetadata` object
#[derive(Clone, Copy, Debug)]
pub struct ListCount(pub usize);

/// The hand-written part of the schema which synthesized types are merged into
pub trait BaseSchema: Send + Sync + 'static {
	/// Every type name the base schema defines or relies on
	fn type_names(&self) -> BTreeSet<String>;

	/// Every root query field the base schema defines
	fn root_fields(&self) -> BTreeSet<String>;

	/// Adds the base types to the builder and the base root fields to the query type
	fn register(&self, builder: SchemaBuilder, query: Object) -> (SchemaBuilder, Object);
}

/// The base schema served by formgraph: the `JSON` scalar, `ListMetadata` and `_version`
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticBase;

impl BaseSchema for StaticBase {
	fn type_names(&self) -> BTreeSet<String> {
		[
			"Query",
			"Mutation",
			"Subscription",
			JSON,
			LIST_METADATA,
			TypeRef::STRING,
			TypeRef::INT,
			TypeRef::FLOAT,
			TypeRef::BOOLEAN,
			TypeRef::ID,
		]
		.into_iter()
		.map(String::from)
		.collect()
	}

	fn root_fields(&self) -> BTreeSet<String> {
		BTreeSet::from([VERSION.to_string()])
	}

	fn register(&self, builder: SchemaBuilder, query: Object) -> (SchemaBuilder, Object) {
		let json = Scalar::new(JSON).description("An arbitrary JSON value");
		let meta = Object::new(LIST_METADATA).field(Field::new(
			"count",
			TypeRef::named_nn(TypeRef::INT),
			|ctx| {
				FieldFuture::new(async move {
					let ListCount(count) = ctx.parent_value.try_downcast_ref::<ListCount>()?;
					Ok(Some(FieldValue::value(GqlValue::Number(Number::from(*count as u64)))))
				})
			},
		));
		let query = query.field(Field::new(VERSION, TypeRef::named_nn(TypeRef::STRING), |_| {
			FieldFuture::new(async move {
				Ok(Some(FieldValue::value(GqlValue::String(env!("CARGO_PKG_VERSION").to_string()))))
			})
		}));
		(builder.register(json).register(meta), query)
	}
}
