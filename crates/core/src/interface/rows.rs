// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::sync::Arc;

use emberdb_type::{Result, RowShape, Value};

use crate::graph::NodeId;

/// A materialized set of rows sharing one shape.
///
/// Cursors, FOR loops and subqueries all consume row sources through this
/// one representation; ordering is whatever the provider produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
	pub shape: Arc<RowShape>,
	pub rows: Vec<Vec<Value>>,
}

impl RowBatch {
	pub fn new(shape: Arc<RowShape>) -> Self {
		Self {
			shape,
			rows: Vec::new(),
		}
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	/// The values of one column across all rows, by column name.
	pub fn column(&self, name: &str) -> Option<Vec<Value>> {
		let index = self.shape.column_index(name)?;
		Some(self.rows
			.iter()
			.map(|row| {
				row.get(index).cloned().unwrap_or(Value::Null)
			})
			.collect())
	}

	pub fn row(&self, index: usize) -> Option<&[Value]> {
		self.rows.get(index).map(Vec::as_slice)
	}
}

/// Supplies rows for the row-source nodes of a graph.
///
/// The graph does not know what a table is; every `source` reference in a
/// cursor declaration, FOR loop or subquery is resolved through this trait
/// by whoever embeds the interpreter.
pub trait RowProvider: Send + Sync {
	fn rows(&self, source: NodeId) -> Result<RowBatch>;
}

#[cfg(test)]
mod tests {
	use emberdb_type::DomainId;

	use super::*;

	#[test]
	fn test_column_extraction() {
		let shape = Arc::new(RowShape::new(vec![
			("a".to_string(), DomainId::INTEGER),
			("b".to_string(), DomainId::CHARACTER),
		]));
		let batch = RowBatch {
			shape,
			rows: vec![
				vec![Value::Int(1), Value::utf8("x")],
				vec![Value::Int(2), Value::utf8("y")],
			],
		};
		assert_eq!(batch.len(), 2);
		assert_eq!(
			batch.column("a"),
			Some(vec![Value::Int(1), Value::Int(2)])
		);
		assert_eq!(batch.column("missing"), None);
		assert_eq!(
			batch.row(1),
			Some(&[Value::Int(2), Value::utf8("y")][..])
		);
	}
}
