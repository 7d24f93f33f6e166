//! Hot reload of the schema while requests are in flight

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_graphql::Request;
use formgraph_core::catalog::{EntityDefinition, FieldDescriptor, FieldKind, FileCatalog, MemoryCatalog, Origin};
use formgraph_core::doc::{Cond, Record, Sort};
use formgraph_core::gql::{Reloader, SchemaRegistry, StaticBase};
use formgraph_core::kvs::{Collection, Datastore, MemCollection};
use serde_json::{Value, json};
use tokio::sync::Notify;

use common::{query, seed};

/// A collection whose first `find` waits until the test releases it
#[derive(Default)]
struct Gated {
	inner: MemCollection,
	armed: AtomicBool,
	entered: Notify,
	release: Notify,
}

#[async_trait::async_trait]
impl Collection for Gated {
	async fn get(&self, id: &str) -> Result<Option<Record>> {
		self.inner.get(id).await
	}

	async fn find(
		&self,
		cond: &Cond,
		sort: &[Sort],
		skip: usize,
		limit: Option<usize>,
	) -> Result<Vec<Record>> {
		if self.armed.swap(false, Ordering::SeqCst) {
			self.entered.notify_one();
			self.release.notified().await;
		}
		self.inner.find(cond, sort, skip, limit).await
	}

	async fn count(&self, cond: &Cond) -> Result<usize> {
		self.inner.count(cond).await
	}

	async fn insert(&self, record: Record) -> Result<()> {
		self.inner.insert(record).await
	}
}

#[test_log::test(tokio::test)]
async fn in_flight_requests_finish_on_their_generation() -> Result<()> {
	let catalog = Arc::new(MemoryCatalog::new(vec![EntityDefinition::resource("customers", "Customer")]));
	let store = Arc::new(Gated::default());
	let ds = Arc::new(Datastore::new(catalog.clone(), store.clone()));
	let registry = Arc::new(SchemaRegistry::new(ds.clone(), Arc::new(StaticBase), None).await?);
	seed(&ds, Origin::Resource, "customers", "C1", json!({ "name": "Acme" })).await?;

	store.armed.store(true, Ordering::SeqCst);
	let in_flight = tokio::spawn({
		let registry = registry.clone();
		async move { registry.execute(Request::new("{ _generation allCustomers { id } }")).await }
	});
	store.entered.notified().await;

	catalog
		.upsert(
			EntityDefinition::resource("customers", "Customer")
				.with_field(FieldDescriptor::new("name", FieldKind::Text)),
		)
		.await;
	let next = registry.reload().await?;
	assert_eq!(next.generation, 2);
	store.release.notify_one();

	let res = in_flight.await?;
	assert!(res.errors.is_empty(), "{:?}", res.errors);
	assert_eq!(res.data.into_json()?, json!({ "_generation": 1, "allCustomers": [{ "id": "C1" }] }));

	let data = query(&registry, "{ _generation allCustomers { id name } }", Value::Null).await?;
	assert_eq!(data, json!({ "_generation": 2, "allCustomers": [{ "id": "C1", "name": "Acme" }] }));
	Ok(())
}

#[tokio::test]
async fn superseded_snapshots_keep_their_schema() -> Result<()> {
	let catalog = Arc::new(MemoryCatalog::new(vec![EntityDefinition::resource("customers", "Customer")]));
	let ds = Arc::new(Datastore::memory(catalog.clone()));
	let registry = SchemaRegistry::new(ds, Arc::new(StaticBase), None).await?;
	let old = registry.current();
	catalog.remove("customers").await;
	registry.reload().await?;
	assert!(old.execute("{ allCustomers { id } }").await.errors.is_empty());
	assert!(!registry.execute("{ allCustomers { id } }").await.errors.is_empty());
	Ok(())
}

#[test_log::test(tokio::test)]
async fn unreadable_catalog_serves_the_base_schema() -> Result<()> {
	let dir = tempfile::tempdir()?;
	let path = dir.path().join("catalog.json");
	let ds = Arc::new(Datastore::new(Arc::new(FileCatalog::new(&path)), Arc::new(MemCollection::new())));
	let registry = SchemaRegistry::new(ds, Arc::new(StaticBase), None).await?;

	let snapshot = registry.current();
	assert!(snapshot.fallback);
	assert!(snapshot.entities.is_empty());
	let data = query(&registry, "{ _generation }", Value::Null).await?;
	assert_eq!(data["_generation"], 1);

	let defs = vec![EntityDefinition::resource("customers", "Customer")];
	tokio::fs::write(&path, serde_json::to_vec(&defs)?).await?;
	let next = registry.reload().await?;
	assert_eq!(next.generation, 2);
	assert!(!next.fallback);
	query(&registry, "{ allCustomers { id } }", Value::Null).await?;

	tokio::fs::write(&path, b"{ not json").await?;
	assert!(registry.reload().await.is_err());
	assert_eq!(registry.current().generation, 2);
	query(&registry, "{ allCustomers { id } }", Value::Null).await?;
	Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_notifications_settle_on_one_schema() -> Result<()> {
	let catalog = Arc::new(MemoryCatalog::new(vec![]));
	let ds = Arc::new(Datastore::memory(catalog.clone()));
	let registry = Arc::new(SchemaRegistry::new(ds, Arc::new(StaticBase), None).await?);
	let (reloader, _task) = Reloader::spawn(registry.clone());

	let writers = (0..8).map(|i| {
		let catalog = catalog.clone();
		let reloader = reloader.clone();
		tokio::spawn(async move {
			catalog.upsert(EntityDefinition::resource(format!("r{i}"), format!("Thing{i}"))).await;
			reloader.notify()
		})
	});
	for notified in futures::future::join_all(writers).await {
		assert!(notified?);
	}
	reloader.notify();

	for _ in 0..300 {
		if registry.current().entities.len() == 8 {
			let data = query(&registry, "{ allThing7s { id } }", Value::Null).await?;
			assert_eq!(data["allThing7s"], json!([]));
			return Ok(());
		}
		tokio::time::sleep(std::time::Duration::from_millis(10)).await;
	}
	anyhow::bail!("the schema never settled")
}
