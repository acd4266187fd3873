// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Value;
use crate::domain::DomainId;

/// The column layout of a row: ordered names with their domains.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowShape {
	columns: IndexMap<String, DomainId>,
}

impl RowShape {
	pub fn new(columns: impl IntoIterator<Item = (String, DomainId)>) -> Self {
		Self {
			columns: columns.into_iter().collect(),
		}
	}

	pub fn len(&self) -> usize {
		self.columns.len()
	}

	pub fn is_empty(&self) -> bool {
		self.columns.is_empty()
	}

	pub fn column_index(&self, name: &str) -> Option<usize> {
		self.columns.get_index_of(name)
	}

	pub fn column_name(&self, index: usize) -> Option<&str> {
		self.columns.get_index(index).map(|(name, _)| name.as_str())
	}

	pub fn domain_at(&self, index: usize) -> Option<DomainId> {
		self.columns.get_index(index).map(|(_, domain)| *domain)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, DomainId)> {
		self.columns
			.iter()
			.map(|(name, domain)| (name.as_str(), *domain))
	}
}

/// A row value: ordered named fields.
///
/// Field names participate in structural equality; positional comparison of
/// the values alone is done by the expression comparison rules.
#[derive(
	Clone,
	Debug,
	Default,
	PartialEq,
	Eq,
	Hash,
	PartialOrd,
	Ord,
	Serialize,
	Deserialize,
)]
pub struct RowValue {
	fields: Vec<(String, Value)>,
}

impl RowValue {
	pub fn new(fields: Vec<(String, Value)>) -> Self {
		Self {
			fields,
		}
	}

	pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
		Self {
			fields: values
				.into_iter()
				.enumerate()
				.map(|(i, value)| (format!("c{}", i + 1), value))
				.collect(),
		}
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	pub fn get(&self, name: &str) -> Option<&Value> {
		self.fields
			.iter()
			.find(|(field, _)| field == name)
			.map(|(_, value)| value)
	}

	pub fn get_at(&self, index: usize) -> Option<&Value> {
		self.fields.get(index).map(|(_, value)| value)
	}

	/// Replace the value of a named field. False when no such field.
	pub fn set(&mut self, name: &str, value: Value) -> bool {
		match self.fields.iter_mut().find(|(field, _)| field == name)
		{
			Some((_, slot)) => {
				*slot = value;
				true
			}
			None => false,
		}
	}

	pub fn name_at(&self, index: usize) -> Option<&str> {
		self.fields.get(index).map(|(name, _)| name.as_str())
	}

	pub fn values(&self) -> impl Iterator<Item = &Value> {
		self.fields.iter().map(|(_, value)| value)
	}

	pub fn into_values(self) -> impl Iterator<Item = Value> {
		self.fields.into_iter().map(|(_, value)| value)
	}

	pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.fields
			.iter()
			.map(|(name, value)| (name.as_str(), value))
	}
}

impl Display for RowValue {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "(")?;
		let mut first = true;
		for value in self.values() {
			if !first {
				write!(f, ", ")?;
			}
			first = false;
			write!(f, "{}", value)?;
		}
		write!(f, ")")
	}
}
