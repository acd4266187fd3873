// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use emberdb_type::{Condition, DiagnosticsItem, Value};
use indexmap::IndexMap;

/// The diagnostics area of a running context: what GET DIAGNOSTICS
/// reads and every raise rewrites.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticsArea {
	items: IndexMap<DiagnosticsItem, Value>,
}

impl DiagnosticsArea {
	/// Read one slot; unset slots read as NULL.
	pub fn get(&self, item: DiagnosticsItem) -> Value {
		self.items.get(&item).cloned().unwrap_or(Value::Null)
	}

	pub fn set(&mut self, item: DiagnosticsItem, value: Value) {
		self.items.insert(item, value);
	}

	pub fn set_row_count(&mut self, count: i64) {
		self.set(DiagnosticsItem::RowCount, Value::Int(count));
	}

	/// Replace the area with the given condition, keeping the
	/// statement-level row count.
	pub fn record(&mut self, condition: &Condition) {
		let row_count = self.items.get(&DiagnosticsItem::RowCount).cloned();
		self.items.clear();
		if let Some(count) = row_count {
			self.items.insert(DiagnosticsItem::RowCount, count);
		}
		self.items.insert(DiagnosticsItem::Number, Value::Int(1));
		self.items.insert(
			DiagnosticsItem::ReturnedSqlstate,
			Value::utf8(condition.code()),
		);
		for (item, value) in condition.items() {
			self.items.insert(item, value.clone());
		}
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}
}
