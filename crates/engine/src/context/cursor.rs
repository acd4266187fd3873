// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::sync::Arc;

use emberdb_core::graph::FetchHow;
use emberdb_core::{NodeId, RowBatch};
use emberdb_type::{RowShape, Value};

/// A declared cursor and, while open, its materialized rows plus the
/// current position.
///
/// Positions are stable while the cursor stays open: the batch is
/// materialized once at OPEN and a failed move leaves the position
/// where it was.
#[derive(Debug)]
pub struct Cursor {
	pub source: NodeId,
	state: Option<OpenCursor>,
}

#[derive(Debug)]
struct OpenCursor {
	batch: RowBatch,
	/// Index of the current row; `None` before the first fetch.
	position: Option<usize>,
}

impl Cursor {
	pub fn new(source: NodeId) -> Self {
		Self {
			source,
			state: None,
		}
	}

	pub fn is_open(&self) -> bool {
		self.state.is_some()
	}

	/// False when the cursor is already open.
	pub fn open(&mut self, batch: RowBatch) -> bool {
		if self.state.is_some() {
			return false;
		}
		self.state = Some(OpenCursor {
			batch,
			position: None,
		});
		true
	}

	/// False when the cursor was not open.
	pub fn close(&mut self) -> bool {
		self.state.take().is_some()
	}

	pub fn shape(&self) -> Option<&Arc<RowShape>> {
		self.state.as_ref().map(|open| &open.batch.shape)
	}

	pub fn position(&self) -> Option<usize> {
		self.state.as_ref().and_then(|open| open.position)
	}

	/// Move the position and read the row there. `None` means no data:
	/// the move fell outside the batch and the position is unchanged.
	///
	/// ABSOLUTE counts from 1, negative values count back from the end,
	/// and 0 lands before the first row. RELATIVE from the initial
	/// position behaves like ABSOLUTE.
	pub fn seek(
		&mut self,
		how: FetchHow,
		offset: Option<i64>,
	) -> Option<Vec<Value>> {
		let open = self.state.as_mut()?;
		let len = open.batch.len() as i64;
		let current = open.position.map(|position| position as i64);
		let target = match how {
			FetchHow::Next => current.map_or(0, |p| p + 1),
			FetchHow::Prior => current.map_or(-1, |p| p - 1),
			FetchHow::First => 0,
			FetchHow::Last => len - 1,
			FetchHow::Absolute => {
				let n = offset?;
				if n > 0 {
					n - 1
				} else if n < 0 {
					len + n
				} else {
					-1
				}
			}
			FetchHow::Relative => {
				let n = offset?;
				match current {
					Some(p) => p.saturating_add(n),
					None if n > 0 => n - 1,
					None => -1,
				}
			}
		};
		if target < 0 || target >= len {
			return None;
		}
		let index = target as usize;
		open.position = Some(index);
		open.batch.row(index).map(<[Value]>::to_vec)
	}
}
