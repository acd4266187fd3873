// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::sync::atomic::{AtomicU64, Ordering};

use emberdb_type::Result;

/// Collaborator-side undo coordination for UNDO handlers.
///
/// Declaring an UNDO handler snapshots a savepoint; when the handler
/// fires, external work done since then is rolled back before the
/// handler action runs. Local variable bindings are restored separately
/// by the activation stack.
pub trait UndoHook: Send + Sync {
	/// Mark the current point of external work.
	fn savepoint(&self) -> u64;

	/// Discard external work done after `savepoint`.
	fn rollback_to(&self, savepoint: u64) -> Result<()>;
}

/// The default hook for embedders without undoable side effects.
#[derive(Debug, Default)]
pub struct NoopUndo {
	marks: AtomicU64,
}

impl NoopUndo {
	pub fn new() -> Self {
		Self::default()
	}
}

impl UndoHook for NoopUndo {
	fn savepoint(&self) -> u64 {
		self.marks.fetch_add(1, Ordering::Relaxed)
	}

	fn rollback_to(&self, _savepoint: u64) -> Result<()> {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_noop_savepoints_are_distinct() {
		let undo = NoopUndo::new();
		let a = undo.savepoint();
		let b = undo.savepoint();
		assert_ne!(a, b);
		undo.rollback_to(a).unwrap();
	}
}
