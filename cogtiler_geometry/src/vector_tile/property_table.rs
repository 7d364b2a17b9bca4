use super::value::TileValue;
use anyhow::{Result, anyhow};
use std::{collections::HashMap, hash::Hash};

/// An interning list: every distinct entry gets a stable index in insertion order.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexedList<T: Clone + Eq + Hash> {
	list: Vec<T>,
	map: HashMap<T, u32>,
}

impl<T: Clone + Eq + Hash> Default for IndexedList<T> {
	fn default() -> Self {
		IndexedList {
			list: Vec::new(),
			map: HashMap::new(),
		}
	}
}

impl<T: Clone + Eq + Hash> IndexedList<T> {
	pub fn add(&mut self, entry: T) -> u32 {
		if let Some(index) = self.map.get(&entry) {
			return *index;
		}
		let index = self.list.len() as u32;
		self.map.insert(entry.clone(), index);
		self.list.push(entry);
		index
	}

	/// Appends without deduplication, as read from the wire.
	pub fn push(&mut self, entry: T) {
		let index = self.list.len() as u32;
		self.map.entry(entry.clone()).or_insert(index);
		self.list.push(entry);
	}

	pub fn get(&self, index: u32) -> Option<&T> {
		self.list.get(index as usize)
	}

	pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
		self.list.iter()
	}

	pub fn len(&self) -> usize {
		self.list.len()
	}

	pub fn is_empty(&self) -> bool {
		self.list.is_empty()
	}
}

/// The key and value tables of a layer, referenced by feature tags.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyTable {
	pub keys: IndexedList<String>,
	pub values: IndexedList<TileValue>,
}

impl PropertyTable {
	/// Interns the properties and returns the flat `[key, value, key, value, ...]` tag list.
	pub fn encode_tags(&mut self, properties: &[(String, TileValue)]) -> Vec<u32> {
		let mut tags = Vec::with_capacity(properties.len() * 2);
		for (key, value) in properties {
			tags.push(self.keys.add(key.clone()));
			tags.push(self.values.add(value.clone()));
		}
		tags
	}

	pub fn decode_tags(&self, tags: &[u32]) -> Result<Vec<(String, TileValue)>> {
		if tags.len() % 2 != 0 {
			return Err(anyhow!("odd number of feature tags ({})", tags.len()));
		}
		tags
			.chunks_exact(2)
			.map(|pair| {
				let key = self.keys.get(pair[0]).ok_or_else(|| anyhow!("key index {} not found", pair[0]))?;
				let value = self
					.values
					.get(pair[1])
					.ok_or_else(|| anyhow!("value index {} not found", pair[1]))?;
				Ok((key.clone(), value.clone()))
			})
			.collect()
	}
}
