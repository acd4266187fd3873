// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Value;

/// An unordered collection that keeps a count per distinct element.
///
/// Entries are kept in a sorted map so that two multisets with the same
/// contents compare and hash identically regardless of insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Multiset {
	entries: BTreeMap<Value, u64>,
}

impl Multiset {
	pub fn new() -> Self {
		Self::default()
	}

	/// Total number of elements, counting duplicates.
	pub fn len(&self) -> u64 {
		self.entries.values().sum()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn distinct_len(&self) -> usize {
		self.entries.len()
	}

	pub fn insert(&mut self, value: Value) {
		self.insert_count(value, 1);
	}

	pub fn insert_count(&mut self, value: Value, count: u64) {
		if count == 0 {
			return;
		}
		*self.entries.entry(value).or_insert(0) += count;
	}

	pub fn contains(&self, value: &Value) -> bool {
		self.entries.contains_key(value)
	}

	pub fn count(&self, value: &Value) -> u64 {
		self.entries.get(value).copied().unwrap_or(0)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&Value, u64)> {
		self.entries.iter().map(|(value, count)| (value, *count))
	}

	/// All elements flattened, duplicates repeated.
	pub fn elements(&self) -> impl Iterator<Item = &Value> {
		self.entries.iter().flat_map(|(value, count)| {
			std::iter::repeat(value).take(*count as usize)
		})
	}

	/// Multiset union: counts are added.
	pub fn fuse(&self, other: &Self) -> Self {
		let mut result = self.clone();
		for (value, count) in other.iter() {
			result.insert_count(value.clone(), count);
		}
		result
	}

	/// Multiset intersection: counts are the pairwise minimum.
	pub fn intersect(&self, other: &Self) -> Self {
		let mut result = Self::new();
		for (value, count) in self.iter() {
			let shared = count.min(other.count(value));
			result.insert_count(value.clone(), shared);
		}
		result
	}
}

impl FromIterator<Value> for Multiset {
	fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
		let mut result = Self::new();
		for value in iter {
			result.insert(value);
		}
		result
	}
}

impl Display for Multiset {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "MULTISET[")?;
		let mut first = true;
		for value in self.elements() {
			if !first {
				write!(f, ", ")?;
			}
			first = false;
			write!(f, "{}", value)?;
		}
		write!(f, "]")
	}
}

// Serialized as a sequence of (value, count) pairs so map keys never have
// to be strings.
impl Serialize for Multiset {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq =
			serializer.serialize_seq(Some(self.entries.len()))?;
		for (value, count) in self.iter() {
			seq.serialize_element(&(value, count))?;
		}
		seq.end()
	}
}

impl<'de> Deserialize<'de> for Multiset {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		struct EntriesVisitor;

		impl<'de> Visitor<'de> for EntriesVisitor {
			type Value = Multiset;

			fn expecting(
				&self,
				f: &mut Formatter<'_>,
			) -> std::fmt::Result {
				f.write_str("a sequence of (value, count) pairs")
			}

			fn visit_seq<A>(
				self,
				mut seq: A,
			) -> Result<Self::Value, A::Error>
			where
				A: SeqAccess<'de>,
			{
				let mut result = Multiset::new();
				while let Some((value, count)) =
					seq.next_element::<(Value, u64)>()?
				{
					result.insert_count(value, count);
				}
				Ok(result)
			}
		}

		deserializer.deserialize_seq(EntriesVisitor)
	}
}
