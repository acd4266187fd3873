// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Window partitions.
//!
//! A [`Partition`] holds the rows sharing one PARTITION BY key, sorted
//! by the window's ORDER BY. The sort is stable, so rows with equal keys
//! keep their arrival order and a row can always be found again through
//! its source position.

pub mod frame;

use std::cmp::Ordering;

use emberdb_type::Value;

pub use frame::{Frame, ResolvedBound};

/// One row as a window sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowRow {
	/// The evaluated ORDER BY keys, in declaration order.
	pub key: Vec<Value>,
	/// The evaluated function operand for this row.
	pub value: Value,
	/// Index of the row in the source row set.
	pub source: usize,
}

/// The rows of one partition, in window order.
#[derive(Debug, Clone)]
pub struct Partition {
	rows: Vec<WindowRow>,
	descending: Vec<bool>,
}

impl Partition {
	pub fn new(mut rows: Vec<WindowRow>, descending: Vec<bool>) -> Self {
		rows.sort_by(|a, b| cmp_keys(&a.key, &b.key, &descending));
		Self {
			rows,
			descending,
		}
	}

	pub fn len(&self) -> usize {
		self.rows.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rows.is_empty()
	}

	pub fn rows(&self) -> &[WindowRow] {
		&self.rows
	}

	pub fn row(&self, position: usize) -> Option<&WindowRow> {
		self.rows.get(position)
	}

	pub fn descending(&self) -> &[bool] {
		&self.descending
	}

	/// The partition position of the row that came from `source`.
	pub fn position_of(&self, source: usize) -> Option<usize> {
		self.rows.iter().position(|row| row.source == source)
	}

	/// Order the keys of two partition positions, honoring the sort
	/// directions.
	pub fn compare(&self, a: usize, b: usize) -> Ordering {
		cmp_keys(&self.rows[a].key, &self.rows[b].key, &self.descending)
	}

	/// Rows are peers when their whole order key matches.
	pub fn peers(&self, a: usize, b: usize) -> bool {
		self.compare(a, b) == Ordering::Equal
	}

	/// ROW_NUMBER for the row at `bookmark`, one-based.
	pub fn row_number(&self, bookmark: usize) -> Value {
		Value::Int(bookmark as i64 + 1)
	}

	/// RANK for the row at `bookmark`: one more than the number of rows
	/// strictly before its peer group.
	pub fn rank(&self, bookmark: usize) -> Value {
		let first = (0..self.rows.len())
			.position(|i| self.peers(i, bookmark))
			.unwrap_or(bookmark);
		Value::Int(first as i64 + 1)
	}
}

/// Item-by-item key comparison; items beyond `descending` sort ascending.
fn cmp_keys(a: &[Value], b: &[Value], descending: &[bool]) -> Ordering {
	for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
		let mut ordering = x.cmp(y);
		if descending.get(i).copied().unwrap_or(false) {
			ordering = ordering.reverse();
		}
		if ordering != Ordering::Equal {
			return ordering;
		}
	}
	Ordering::Equal
}
