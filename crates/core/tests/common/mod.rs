#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Result, ensure};
use async_graphql::{Request, Variables};
use formgraph_core::catalog::{EntityDefinition, FieldDescriptor, FieldKind, MemoryCatalog, Origin};
use formgraph_core::doc::Record;
use formgraph_core::gql::{SchemaRegistry, StaticBase};
use formgraph_core::kvs::Datastore;
use serde_json::{Map, Value};

pub struct Fixture {
	pub catalog: Arc<MemoryCatalog>,
	pub ds: Arc<Datastore>,
	pub registry: Arc<SchemaRegistry>,
}

/// Customers, invoices pointing at customers, and a survey form
pub fn invoicing() -> Vec<EntityDefinition> {
	vec![
		EntityDefinition::resource("customers", "Customer")
			.with_field(FieldDescriptor::new("name", FieldKind::Text))
			.with_field(FieldDescriptor::new("vip", FieldKind::Boolean)),
		EntityDefinition::resource("invoices", "Invoice")
			.with_field(FieldDescriptor::new("total", FieldKind::Numeric))
			.with_field(FieldDescriptor::new("issued", FieldKind::Date))
			.with_field(FieldDescriptor::new("tags", FieldKind::Checkbox))
			.with_field(FieldDescriptor::reference("customer", "customers", false)),
		EntityDefinition::form("survey", "Survey")
			.with_field(FieldDescriptor::new("score", FieldKind::Rating)),
	]
}

pub async fn fixture(defs: Vec<EntityDefinition>) -> Result<Fixture> {
	let catalog = Arc::new(MemoryCatalog::new(defs));
	let ds = Arc::new(Datastore::memory(catalog.clone()));
	let registry = Arc::new(SchemaRegistry::new(ds.clone(), Arc::new(StaticBase), None).await?);
	Ok(Fixture {
		catalog,
		ds,
		registry,
	})
}

/// Stores a record with a fixed identifier
pub async fn seed(ds: &Datastore, origin: Origin, owner: &str, id: &str, data: Value) -> Result<()> {
	let data: Map<String, Value> = serde_json::from_value(data)?;
	ds.collection().insert(Record::with_id(id, origin, owner, data)).await
}

/// Runs a query and returns its data, failing on any GraphQL error
pub async fn query(registry: &SchemaRegistry, query: &str, variables: Value) -> Result<Value> {
	let request = Request::new(query).variables(Variables::from_json(variables));
	let res = registry.execute(request).await;
	ensure!(res.errors.is_empty(), "query failed: {:?}", res.errors);
	Ok(res.data.into_json()?)
}
