// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use emberdb_core::NodeId;
use emberdb_core::graph::HandlerDisposition;
use emberdb_type::{Condition, DomainId, RowShape, Value};
use indexmap::IndexMap;

use super::cursor::Cursor;

/// Identifies one activation for the lifetime of a context. Ids are
/// never reused, so an EXIT control naming a popped activation can only
/// propagate, never re-match.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ActivationId(pub u64);

impl Display for ActivationId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "activation#{}", self.0)
	}
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ActivationKind {
	/// A compound statement body, or the base scope of a run.
	Block,
	/// One pass of a loop body.
	Loop,
	/// A routine invocation frame.
	Routine,
	/// A handler action running against its condition.
	Handler,
}

/// A declared variable: its domain constrains every later assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
	pub domain: DomainId,
	pub value: Value,
}

/// The row a FOR loop or SELECT INTO scope is currently positioned on.
#[derive(Debug, Clone)]
pub struct RowBinding {
	pub shape: Arc<RowShape>,
	pub values: Vec<Value>,
	/// Position of this row within the batch it came from, used to
	/// anchor window evaluation.
	pub source: usize,
}

impl RowBinding {
	pub fn field(&self, name: &str) -> Option<&Value> {
		let index = self.shape.column_index(name)?;
		self.values.get(index)
	}
}

/// A declared condition handler together with the undo marker captured
/// at declaration time.
#[derive(Debug, Clone)]
pub struct Handler {
	pub disposition: HandlerDisposition,
	pub action: NodeId,
	/// Undo savepoint taken when the handler was declared.
	pub savepoint: u64,
	/// Locals of the declaring activation at declaration time, restored
	/// by an UNDO disposition.
	pub snapshot: Vec<(String, Binding)>,
}

/// One frame of the activation stack: the locals, handlers and cursors
/// of a lexical scope, dropped together when the scope ends.
#[derive(Debug)]
pub struct Activation {
	pub id: ActivationId,
	pub kind: ActivationKind,
	pub label: Option<String>,
	pub locals: IndexMap<String, Binding>,
	/// Handlers keyed by the condition text they were declared for, in
	/// declaration order. A later declaration for the same condition
	/// replaces the earlier one.
	pub handlers: IndexMap<String, Handler>,
	pub cursors: IndexMap<String, Cursor>,
	pub row: Option<RowBinding>,
	/// Set while a handler action runs in this activation; RESIGNAL
	/// picks up the nearest one.
	pub active_condition: Option<Condition>,
	/// The (defining activation, condition key) of the handler this
	/// frame is executing, so the search can skip a handler that is
	/// already running.
	pub running_handler: Option<(ActivationId, String)>,
	/// Declared return domain when this is a routine frame.
	pub returns: Option<DomainId>,
}

impl Activation {
	pub fn new(
		id: ActivationId,
		kind: ActivationKind,
		label: Option<String>,
	) -> Self {
		Self {
			id,
			kind,
			label,
			locals: IndexMap::new(),
			handlers: IndexMap::new(),
			cursors: IndexMap::new(),
			row: None,
			active_condition: None,
			running_handler: None,
			returns: None,
		}
	}

	pub fn locals_snapshot(&self) -> Vec<(String, Binding)> {
		self.locals
			.iter()
			.map(|(name, binding)| (name.clone(), binding.clone()))
			.collect()
	}

	/// Reset the locals to a snapshot taken earlier. Variables declared
	/// after the snapshot disappear; values revert.
	pub fn restore_locals(&mut self, snapshot: &[(String, Binding)]) {
		self.locals = snapshot.iter().cloned().collect();
	}
}
