// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::sync::atomic::{AtomicU64, Ordering};

use emberdb_core::UndoHook;
use emberdb_type::Result;
use parking_lot::Mutex;

/// An undo hook that hands out increasing savepoints and remembers
/// every rollback, so tests can assert which mark an UNDO handler
/// unwound to.
#[derive(Default)]
pub struct RecordingUndo {
	next: AtomicU64,
	rollbacks: Mutex<Vec<u64>>,
}

impl RecordingUndo {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn rollbacks(&self) -> Vec<u64> {
		self.rollbacks.lock().clone()
	}
}

impl UndoHook for RecordingUndo {
	fn savepoint(&self) -> u64 {
		self.next.fetch_add(1, Ordering::Relaxed)
	}

	fn rollback_to(&self, savepoint: u64) -> Result<()> {
		self.rollbacks.lock().push(savepoint);
		Ok(())
	}
}
