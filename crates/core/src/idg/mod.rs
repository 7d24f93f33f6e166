//! Incremental identifiers of the form `2024-I00000003`.
//!
//! Numbers are issued per `(year, letter)` prefix. Unused numbers below the highest issued one
//! ("holes") are handed out again before the sequence grows. The cache is process local: two
//! allocators sharing one collection can issue the same number unless an external lock
//! serializes them.

use std::collections::BTreeMap;
use std::sync::{Arc, LazyLock};

use anyhow::Result;
use regex::Regex;
use serde_json::json;
use tokio::sync::Mutex;

use crate::cnf::ID_NUMBER_WIDTH;
use crate::doc::Cond;
use crate::kvs::Collection;

const TARGET: &str = "formgraph::idg";

static INCREMENTAL_ID: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^(\d{4}-[A-Z0-9])(\d+)$").unwrap());

/// The prefix shared by every identifier of a resource in a given year
pub fn prefix(resource: &str, year: i32) -> String {
	let letter = resource
		.chars()
		.find(char::is_ascii_alphanumeric)
		.map(|c| c.to_ascii_uppercase())
		.unwrap_or('X');
	format!("{year}-{letter}")
}

/// Splits a stored identifier into its prefix and number
pub fn parse(id: &str) -> Option<(String, u64)> {
	let caps = INCREMENTAL_ID.captures(id)?;
	let number = caps[2].parse::<u64>().ok().filter(|n| *n > 0)?;
	Some((caps[1].to_string(), number))
}

pub fn format(prefix: &str, number: u64) -> String {
	format!("{prefix}{number:0width$}", width = *ID_NUMBER_WIDTH)
}

/// Computes the ascending unused numbers of a prefix, ending with the next fresh number
pub fn holes(mut numbers: Vec<u64>) -> Vec<u64> {
	numbers.sort_unstable();
	numbers.dedup();
	let mut holes = Vec::new();
	let mut expected = 1;
	for n in numbers {
		while expected < n {
			holes.push(expected);
			expected += 1;
		}
		expected = n + 1;
	}
	holes.push(expected);
	holes
}

#[derive(Debug, Default)]
struct State {
	holes: BTreeMap<String, Vec<u64>>,
	previous: BTreeMap<String, u64>,
}

impl State {
	fn next(&mut self, prefix: &str) -> u64 {
		let holes = self.holes.entry(prefix.to_string()).or_insert_with(|| vec![1]);
		// Sequential appends take the successor of the previous number
		let index = self
			.previous
			.get(prefix)
			.and_then(|prev| holes.binary_search(&(prev + 1)).ok())
			.unwrap_or(0);
		let number = holes.remove(index);
		if holes.is_empty() {
			holes.push(number + 1);
		}
		self.previous.insert(prefix.to_string(), number);
		number
	}

	fn release(&mut self, prefix: &str, number: u64) {
		let Some(holes) = self.holes.get_mut(prefix) else {
			return;
		};
		if let Err(index) = holes.binary_search(&number) {
			holes.insert(index, number);
		}
		self.previous.remove(prefix);
	}
}

/// Issues incremental identifiers for newly created records
pub struct IdAllocator {
	collection: Arc<dyn Collection>,
	state: Mutex<Option<State>>,
}

impl IdAllocator {
	pub fn new(collection: Arc<dyn Collection>) -> Self {
		Self {
			collection,
			state: Mutex::new(None),
		}
	}

	/// Allocates the next identifier for a resource in the given year
	pub async fn allocate(&self, resource: &str, year: i32) -> Result<String> {
		let prefix = prefix(resource, year);
		let mut lock = self.state.lock().await;
		let mut state = match lock.take() {
			Some(state) => state,
			None => self.build().await?,
		};
		let number = state.next(&prefix);
		*lock = Some(state);
		let id = format(&prefix, number);
		trace!(target: TARGET, "Allocated incremental id {id}");
		Ok(id)
	}

	/// Returns an identifier which was allocated but never stored
	pub async fn release(&self, id: &str) {
		let Some((prefix, number)) = parse(id) else {
			return;
		};
		if let Some(state) = self.state.lock().await.as_mut() {
			state.release(&prefix, number);
			trace!(target: TARGET, "Released incremental id {id}");
		}
	}

	/// Discards the cache so the next allocation rebuilds it from the collection
	pub async fn reset(&self) {
		*self.state.lock().await = None;
	}

	async fn build(&self) -> Result<State> {
		let cond = Cond(json!({ "incrementalId": { "$exists": true } }));
		let records = self.collection.find(&cond, &[], 0, None).await?;
		let mut issued: BTreeMap<String, Vec<u64>> = BTreeMap::new();
		for record in records {
			let Some(id) = record.incremental_id else {
				continue;
			};
			match parse(&id) {
				Some((prefix, number)) => issued.entry(prefix).or_default().push(number),
				None => warn!(target: TARGET, "Excluding unparseable incremental id {id} of record {}", record.id),
			}
		}
		debug!(target: TARGET, "Built incremental id cache for {} prefixes", issued.len());
		Ok(State {
			holes: issued.into_iter().map(|(prefix, numbers)| (prefix, holes(numbers))).collect(),
			previous: BTreeMap::new(),
		})
	}
}
