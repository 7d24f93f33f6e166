//! End-to-end queries against a synthesized schema backed by the in-memory collection

#![allow(clippy::unwrap_used)]

mod common;

use std::collections::BTreeSet;

use anyhow::Result;
use async_graphql::Request;
use formgraph_core::catalog::{EntityDefinition, FieldDescriptor, FieldKind, MemoryCatalog, Origin};
use formgraph_core::doc::{Cond, Record, Sort};
use formgraph_core::err::Error;
use formgraph_core::gql::{SchemaRegistry, StaticBase};
use formgraph_core::kvs::{Collection, Datastore};
use serde_json::{Value, json};
use std::sync::Arc;

use common::{fixture, invoicing, query, seed};

async fn seeded() -> Result<common::Fixture> {
	let f = fixture(invoicing()).await?;
	seed(&f.ds, Origin::Resource, "customers", "C1", json!({ "name": "Acme", "vip": true })).await?;
	seed(&f.ds, Origin::Resource, "customers", "C2", json!({ "name": "Globex" })).await?;
	seed(
		&f.ds,
		Origin::Resource,
		"invoices",
		"I1",
		json!({ "total": 10, "issued": "2024-01-15", "tags": ["a", "b"], "customer": "C1" }),
	)
	.await?;
	seed(
		&f.ds,
		Origin::Resource,
		"invoices",
		"I2",
		json!({ "total": 25.5, "issued": "2024-02-01", "tags": ["a", "b", "c"], "customer": { "$oid": "C1" } }),
	)
	.await?;
	seed(
		&f.ds,
		Origin::Resource,
		"invoices",
		"I3",
		json!({ "total": 7, "issued": "2024-02-20", "tags": ["b", "a"], "customer": "C2" }),
	)
	.await?;
	seed(&f.ds, Origin::Form, "survey", "S1", json!({ "score": 4 })).await?;
	Ok(f)
}

fn ids(list: &Value) -> BTreeSet<String> {
	list.as_array()
		.map(|a| a.iter().filter_map(|r| r["id"].as_str().map(String::from)).collect())
		.unwrap_or_default()
}

#[test_log::test(tokio::test)]
async fn resolves_an_invoice_with_its_customer() -> Result<()> {
	let f = seeded().await?;
	let data = query(
		&f.registry,
		r#"{ invoice(id: "I1") { id total customer_id customer { id name invoices { id } } } }"#,
		Value::Null,
	)
	.await?;
	let invoice = &data["invoice"];
	assert_eq!(invoice["id"], "I1");
	assert_eq!(invoice["total"], json!(10.0));
	assert_eq!(invoice["customer_id"], "C1");
	assert_eq!(invoice["customer"]["id"], "C1");
	assert_eq!(invoice["customer"]["name"], "Acme");
	assert_eq!(ids(&invoice["customer"]["invoices"]), BTreeSet::from(["I1".into(), "I2".into()]));
	Ok(())
}

#[tokio::test]
async fn missing_and_foreign_records_resolve_to_null() -> Result<()> {
	let f = seeded().await?;
	let data = query(&f.registry, r#"{ a: invoice(id: "nope") { id } b: invoice(id: "C1") { id } }"#, Value::Null)
		.await?;
	assert_eq!(data["a"], Value::Null);
	assert_eq!(data["b"], Value::Null);
	Ok(())
}

#[tokio::test]
async fn stored_values_round_trip() -> Result<()> {
	let f = seeded().await?;
	let record = f
		.ds
		.create_record(
			"customers",
			serde_json::from_value(json!({ "name": "Initech", "vip": false }))?,
			Some("alice".into()),
		)
		.await?;
	let data = query(
		&f.registry,
		"query ($id: ID!) { customer(id: $id) { id name vip createdBy createdAt } }",
		json!({ "id": record.id }),
	)
	.await?;
	let customer = &data["customer"];
	assert_eq!(customer["id"], json!(record.id));
	assert_eq!(customer["name"], "Initech");
	assert_eq!(customer["vip"], false);
	assert_eq!(customer["createdBy"], "alice");
	assert_eq!(customer["createdAt"], json!(record.created_at.to_rfc3339()));
	assert!(record.incremental_id.is_some_and(|id| id.ends_with("-C00000001")));
	Ok(())
}

#[tokio::test]
async fn relationships_are_symmetric() -> Result<()> {
	let f = seeded().await?;
	let data = query(
		&f.registry,
		"{ allInvoices { id customer { id } } allCustomers { id invoices { id } } }",
		Value::Null,
	)
	.await?;
	let customers = data["allCustomers"].as_array().unwrap();
	for invoice in data["allInvoices"].as_array().unwrap() {
		for customer in customers {
			let linked = invoice["customer"]["id"] == customer["id"];
			let listed = ids(&customer["invoices"]).contains(invoice["id"].as_str().unwrap());
			assert_eq!(linked, listed, "{invoice} / {customer}");
		}
	}
	Ok(())
}

#[tokio::test]
async fn empty_filters_are_the_identity() -> Result<()> {
	let f = seeded().await?;
	let data = query(
		&f.registry,
		r#"{ a: allInvoices { id } b: allInvoices(filter: {}) { id } c: allInvoices(filter: { filters: [] }) { id } }"#,
		Value::Null,
	)
	.await?;
	assert_eq!(data["a"], data["b"]);
	assert_eq!(data["a"], data["c"]);
	assert_eq!(ids(&data["a"]).len(), 3);
	Ok(())
}

#[tokio::test]
async fn multi_value_equality_is_set_equality() -> Result<()> {
	let f = seeded().await?;
	let data = query(
		&f.registry,
		"query ($f: InvoiceFilter) { allInvoices(filter: $f) { id } }",
		json!({ "f": { "filters": [{ "field": "tags", "operator": "eq", "value": ["b", "a"] }] } }),
	)
	.await?;
	assert_eq!(ids(&data["allInvoices"]), BTreeSet::from(["I1".into(), "I3".into()]));
	Ok(())
}

#[tokio::test]
async fn filters_sorts_and_paginates() -> Result<()> {
	let f = seeded().await?;
	let data = query(
		&f.registry,
		r#"{
			cheap: allInvoices(filter: { total_lt: 20 }, sortField: "total", sortOrder: "DESC") { id }
			page: allInvoices(page: 1, perPage: 2) { id }
			february: allInvoices(filter: { issued_gte: "2024-02-01" }) { id }
			count: _allInvoicesMeta(filter: { customer_id: "C1" }) { count }
			acme: allCustomers(filter: { q: "acm" }) { id }
			surveys: allSurveys { id score }
		}"#,
		Value::Null,
	)
	.await?;
	assert_eq!(data["cheap"], json!([{ "id": "I1" }, { "id": "I3" }]));
	assert_eq!(data["page"], json!([{ "id": "I3" }]));
	assert_eq!(ids(&data["february"]), BTreeSet::from(["I2".into(), "I3".into()]));
	assert_eq!(data["count"]["count"], 2);
	assert_eq!(data["acme"], json!([{ "id": "C1" }]));
	assert_eq!(data["surveys"], json!([{ "id": "S1", "score": 4.0 }]));
	Ok(())
}

#[tokio::test]
async fn reverse_fields_accept_filters() -> Result<()> {
	let f = seeded().await?;
	let data = query(
		&f.registry,
		r#"{ customer(id: "C1") { invoices(filter: { total_gt: 20 }) { id } } }"#,
		Value::Null,
	)
	.await?;
	assert_eq!(data["customer"]["invoices"], json!([{ "id": "I2" }]));
	Ok(())
}

#[tokio::test]
async fn exposes_field_metadata() -> Result<()> {
	let f = seeded().await?;
	let data = query(&f.registry, "{ _invoiceMeta { total customer_id } }", Value::Null).await?;
	let meta = &data["_invoiceMeta"];
	assert_eq!(meta["total"]["type"], "numeric");
	assert_eq!(meta["customer_id"]["relationship"]["name"], "customer");
	assert_eq!(meta["customer_id"]["meta"]["name"]["type"], "text");
	Ok(())
}

#[tokio::test]
async fn identical_descriptors_yield_identical_schemas() -> Result<()> {
	let a = fixture(invoicing()).await?;
	let mut reversed = invoicing();
	reversed.reverse();
	let b = fixture(reversed).await?;
	assert_eq!(a.registry.current().sdl, b.registry.current().sdl);
	Ok(())
}

#[test_log::test(tokio::test)]
async fn colliding_entities_do_not_break_the_schema() -> Result<()> {
	let mut defs = invoicing();
	defs.push(EntityDefinition::resource("meta", "ListMetadata"));
	defs.push(EntityDefinition::resource("dupe", "customer"));
	let f = fixture(defs).await?;
	let snapshot = f.registry.current();
	assert!(!snapshot.fallback);
	assert_eq!(snapshot.entities.len(), 3);
	query(&f.registry, "{ allCustomers { id } _allCustomersMeta { count } }", Value::Null).await?;
	Ok(())
}

#[tokio::test]
async fn repeated_targets_get_distinct_reverse_fields() -> Result<()> {
	let defs = vec![
		EntityDefinition::resource("people", "Person"),
		EntityDefinition::resource("tickets", "Ticket")
			.with_field(FieldDescriptor::reference("author", "people", false))
			.with_field(FieldDescriptor::reference("assignee", "people", false)),
	];
	let f = fixture(defs).await?;
	seed(&f.ds, Origin::Resource, "people", "P1", json!({})).await?;
	seed(&f.ds, Origin::Resource, "tickets", "T1", json!({ "author": "P1" })).await?;
	let data = query(
		&f.registry,
		r#"{ person(id: "P1") { tickets_author { id } tickets_assignee { id } } }"#,
		Value::Null,
	)
	.await?;
	assert_eq!(data["person"]["tickets_author"], json!([{ "id": "T1" }]));
	assert_eq!(data["person"]["tickets_assignee"], json!([]));
	Ok(())
}

#[tokio::test]
async fn registry_reports_its_generation() -> Result<()> {
	let registry = SchemaRegistry::new(
		Arc::new(Datastore::memory(Arc::new(MemoryCatalog::new(vec![])))),
		Arc::new(StaticBase),
		None,
	)
	.await?;
	let data = query(&registry, "{ _generation _version }", Value::Null).await?;
	assert_eq!(data["_generation"], 1);
	assert_eq!(data["_version"], env!("CARGO_PKG_VERSION"));
	Ok(())
}

#[test_log::test(tokio::test)]
async fn malformed_clauses_do_not_widen_results() -> Result<()> {
	let f = seeded().await?;
	let data = query(
		&f.registry,
		"query ($f: InvoiceFilter) { allInvoices(filter: $f) { id } }",
		json!({ "f": { "filters": [
			{ "field": "total", "operator": "gte", "value": 20 },
			{ "field": "total" },
			{ "field": "total", "operator": null },
			{ "logic": "nand", "filters": [] }
		] } }),
	)
	.await?;
	assert_eq!(data["allInvoices"], json!([{ "id": "I2" }]));
	Ok(())
}

/// A collection whose backend can never be reached
struct Unreachable;

#[async_trait::async_trait]
impl Collection for Unreachable {
	async fn get(&self, _: &str) -> Result<Option<Record>> {
		anyhow::bail!("connection refused")
	}

	async fn find(&self, _: &Cond, _: &[Sort], _: usize, _: Option<usize>) -> Result<Vec<Record>> {
		anyhow::bail!("connection refused")
	}

	async fn count(&self, _: &Cond) -> Result<usize> {
		Err(Error::CollectionUnavailable("timed out".into()).into())
	}

	async fn insert(&self, _: Record) -> Result<()> {
		anyhow::bail!("connection refused")
	}
}

#[test_log::test(tokio::test)]
async fn unreachable_collections_surface_as_query_errors() -> Result<()> {
	let catalog = Arc::new(MemoryCatalog::new(invoicing()));
	let ds = Arc::new(Datastore::new(catalog, Arc::new(Unreachable)));
	let registry = SchemaRegistry::new(ds, Arc::new(StaticBase), None).await?;
	for q in [r#"{ customer(id: "C1") { id } }"#, "{ allInvoices { id } }", "{ _allInvoicesMeta { count } }"] {
		let res = registry.execute(Request::new(q)).await;
		assert_eq!(res.errors.len(), 1, "{q}");
		assert!(res.errors[0].message.contains("The record collection is unavailable"), "{q}");
	}
	Ok(())
}
