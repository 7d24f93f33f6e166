use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::Value;
use tokio::sync::RwLock;

use super::Collection;
use crate::doc::{Cond, Record, Sort};
use crate::err::Error;

const TARGET: &str = "formgraph::kvs";

/// An in-memory record collection
///
/// Each record is kept next to its document form so that filters do not
/// re-serialize the record on every evaluation.
#[derive(Debug, Default)]
pub struct MemCollection {
	records: RwLock<BTreeMap<String, (Record, Value)>>,
}

impl MemCollection {
	pub fn new() -> Self {
		Self::default()
	}

	/// Removes a record, returning it when it existed
	pub async fn remove(&self, id: &str) -> Option<Record> {
		self.records.write().await.remove(id).map(|(r, _)| r)
	}

	pub async fn len(&self) -> usize {
		self.records.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.records.read().await.is_empty()
	}
}

#[async_trait::async_trait]
impl Collection for MemCollection {
	async fn get(&self, id: &str) -> Result<Option<Record>> {
		Ok(self.records.read().await.get(id).map(|(r, _)| r.clone()))
	}

	async fn find(
		&self,
		cond: &Cond,
		sort: &[Sort],
		skip: usize,
		limit: Option<usize>,
	) -> Result<Vec<Record>> {
		trace!(target: TARGET, "Finding records matching {}", cond.0);
		let lock = self.records.read().await;
		let mut found: Vec<&(Record, Value)> =
			lock.values().filter(|(_, doc)| cond.matches(doc)).collect();
		if !sort.is_empty() {
			found.sort_by(|(_, a), (_, b)| Sort::compare(sort, a, b));
		}
		let found = found.into_iter().skip(skip).map(|(r, _)| r.clone());
		Ok(match limit {
			Some(limit) => found.take(limit).collect(),
			None => found.collect(),
		})
	}

	async fn count(&self, cond: &Cond) -> Result<usize> {
		Ok(self.records.read().await.values().filter(|(_, doc)| cond.matches(doc)).count())
	}

	async fn insert(&self, record: Record) -> Result<()> {
		let mut lock = self.records.write().await;
		if lock.contains_key(&record.id) {
			return Err(Error::RecordExists(record.id).into());
		}
		let doc = record.to_document();
		lock.insert(record.id.clone(), (record, doc));
		Ok(())
	}
}
