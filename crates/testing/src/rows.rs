// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::collections::HashMap;
use std::sync::Arc;

use emberdb_core::graph::NodeId;
use emberdb_core::{RowBatch, RowProvider};
use emberdb_type::error::diagnostic::internal;
use emberdb_type::{DomainId, Error, Result, RowShape, Value};
use parking_lot::RwLock;

/// A row provider backed by batches registered up front, keyed by the
/// source node they answer for.
#[derive(Default)]
pub struct FixtureRows {
	batches: RwLock<HashMap<NodeId, RowBatch>>,
}

impl FixtureRows {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn put(&self, source: NodeId, batch: RowBatch) {
		self.batches.write().insert(source, batch);
	}

	/// Register a batch from column headers and row literals.
	pub fn table(
		&self,
		source: NodeId,
		columns: &[(&str, DomainId)],
		rows: Vec<Vec<Value>>,
	) {
		let shape = Arc::new(RowShape::new(columns.iter().map(
			|(name, domain)| ((*name).to_string(), *domain),
		)));
		self.put(
			source,
			RowBatch {
				shape,
				rows,
			},
		);
	}
}

impl RowProvider for FixtureRows {
	fn rows(&self, source: NodeId) -> Result<RowBatch> {
		self.batches.read().get(&source).cloned().ok_or_else(|| {
			Error(internal::internal(format!(
				"fixture has no rows for {}",
				source
			)))
		})
	}
}
