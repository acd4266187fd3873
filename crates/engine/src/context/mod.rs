// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! The mutable state one run of a graph owns: the activation stack,
//! the diagnostics area, aggregate registers and the collaborator
//! handles everything else reaches through.

mod activation;
mod cursor;
mod diagnostics;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub use activation::{
	Activation, ActivationId, ActivationKind, Binding, Handler, RowBinding,
};
pub use cursor::Cursor;
pub use diagnostics::DiagnosticsArea;
use emberdb_core::{Node, NodeId, NodeStore, RowProvider, UndoHook};
use emberdb_function::RegisterSet;
use emberdb_type::error::diagnostic::{internal, runtime};
use emberdb_type::{
	Condition, Domain, DomainId, DomainProvider, Error, Fragment, Result,
	Timestamp, Value,
};
use indexmap::IndexMap;

use crate::execute::Control;
use crate::options::ExecutionOptions;

/// Everything a single run of the evaluator and interpreter mutates.
///
/// The graph, the domain registry, the row provider and the undo hook
/// are borrowed from the embedder; the activation stack, registers and
/// diagnostics area live and die with the run.
pub struct ExecutionContext<'a> {
	store: &'a NodeStore,
	domains: &'a dyn DomainProvider,
	rows: &'a dyn RowProvider,
	undo: &'a dyn UndoHook,
	options: ExecutionOptions,
	cancel: Arc<AtomicBool>,
	activations: Vec<Activation>,
	next_activation: u64,
	registers: RegisterSet,
	group: Vec<Value>,
	accumulating: bool,
	building_window: bool,
	diagnostics: DiagnosticsArea,
	matching: Vec<(NodeId, NodeId)>,
	transfer: Option<Control>,
	now: Timestamp,
}

impl<'a> ExecutionContext<'a> {
	pub fn new(
		store: &'a NodeStore,
		domains: &'a dyn DomainProvider,
		rows: &'a dyn RowProvider,
		undo: &'a dyn UndoHook,
		options: ExecutionOptions,
		cancel: Arc<AtomicBool>,
	) -> Self {
		let mut context = Self {
			store,
			domains,
			rows,
			undo,
			options,
			cancel,
			activations: Vec::new(),
			next_activation: 0,
			registers: RegisterSet::new(),
			group: Vec::new(),
			accumulating: false,
			building_window: false,
			diagnostics: DiagnosticsArea::default(),
			matching: Vec::new(),
			transfer: None,
			now: wall_clock(),
		};
		// the base scope of the run; never popped
		let base = context.allocate_activation();
		context.activations.push(Activation::new(
			base,
			ActivationKind::Block,
			None,
		));
		context
	}

	pub fn store(&self) -> &'a NodeStore {
		self.store
	}

	pub fn domains(&self) -> &'a dyn DomainProvider {
		self.domains
	}

	pub fn rows(&self) -> &'a dyn RowProvider {
		self.rows
	}

	pub fn undo(&self) -> &'a dyn UndoHook {
		self.undo
	}

	pub fn options(&self) -> &ExecutionOptions {
		&self.options
	}

	/// The clock of this run. CURRENT_DATE, CURRENT_TIME and
	/// CURRENT_TIMESTAMP all read it, so they are stable across one
	/// execution.
	pub fn now(&self) -> Timestamp {
		self.now
	}

	pub fn cancelled(&self) -> bool {
		self.cancel.load(Ordering::Relaxed)
	}

	pub fn lookup(&self, id: NodeId) -> Result<Arc<Node>> {
		self.store.lookup(id)
	}

	pub fn resolve_domain(&self, id: DomainId) -> Result<Domain> {
		self.domains
			.lookup(id)
			.or_else(|| Domain::builtin(id))
			.ok_or_else(|| {
				Error(internal::internal(format!(
					"domain {:?} is not registered",
					id
				)))
			})
	}

	// --- activation stack ---

	fn allocate_activation(&mut self) -> ActivationId {
		let id = ActivationId(self.next_activation);
		self.next_activation += 1;
		id
	}

	pub fn push_activation(
		&mut self,
		kind: ActivationKind,
		label: Option<String>,
	) -> Result<ActivationId> {
		if self.activations.len() >= self.options.max_activation_depth
		{
			return Err(Error(runtime::limit_exceeded(
				Fragment::None,
				"activation depth",
				self.options.max_activation_depth as u64,
			)));
		}
		let id = self.allocate_activation();
		self.activations.push(Activation::new(id, kind, label));
		Ok(id)
	}

	/// Drop the innermost activation and with it every binding, cursor
	/// and handler it declared. The base scope stays.
	pub fn pop_activation(&mut self) {
		if self.activations.len() > 1 {
			self.activations.pop();
		}
	}

	pub fn current(&mut self) -> &mut Activation {
		debug_assert!(!self.activations.is_empty());
		let index = self.activations.len() - 1;
		&mut self.activations[index]
	}

	pub fn activations(&self) -> &[Activation] {
		&self.activations
	}

	pub fn activation_mut(
		&mut self,
		index: usize,
	) -> Option<&mut Activation> {
		self.activations.get_mut(index)
	}

	pub fn base_activation(&self) -> ActivationId {
		debug_assert!(!self.activations.is_empty());
		self.activations[0].id
	}

	// --- bindings ---

	pub fn declare(&mut self, name: String, domain: DomainId, value: Value) {
		self.current().locals.insert(
			name,
			Binding {
				domain,
				value,
			},
		);
	}

	/// The value of the nearest binding for `name`, walking the
	/// activation stack outward.
	pub fn read(&self, name: &str) -> Option<Value> {
		self.activations.iter().rev().find_map(|activation| {
			activation
				.locals
				.get(name)
				.map(|binding| binding.value.clone())
		})
	}

	pub fn binding_domain(&self, name: &str) -> Option<DomainId> {
		self.activations.iter().rev().find_map(|activation| {
			activation
				.locals
				.get(name)
				.map(|binding| binding.domain)
		})
	}

	/// Overwrite the nearest binding for `name`. False when no scope
	/// declares it.
	pub fn write(&mut self, name: &str, value: Value) -> bool {
		for activation in self.activations.iter_mut().rev() {
			if let Some(binding) = activation.locals.get_mut(name) {
				binding.value = value;
				return true;
			}
		}
		false
	}

	/// The named field of the nearest row binding, walking outward.
	pub fn row_field(&self, name: &str) -> Option<Value> {
		self.activations.iter().rev().find_map(|activation| {
			activation
				.row
				.as_ref()
				.and_then(|row| row.field(name).cloned())
		})
	}

	pub fn bind_row(&mut self, row: RowBinding) {
		self.current().row = Some(row);
	}

	/// The batch position of the nearest row binding; windows anchor
	/// their current row on it.
	pub fn current_row_source(&self) -> Option<usize> {
		self.activations.iter().rev().find_map(|activation| {
			activation.row.as_ref().map(|row| row.source)
		})
	}

	// --- cursors ---

	pub fn declare_cursor(&mut self, name: String, source: NodeId) {
		self.current().cursors.insert(name, Cursor::new(source));
	}

	pub fn find_cursor(&mut self, name: &str) -> Option<&mut Cursor> {
		let index = self
			.activations
			.iter()
			.rposition(|activation| {
				activation.cursors.contains_key(name)
			})?;
		self.activations[index].cursors.get_mut(name)
	}

	// --- conditions and diagnostics ---

	pub fn nearest_condition(&self) -> Option<&Condition> {
		self.activations
			.iter()
			.rev()
			.find_map(|activation| activation.active_condition.as_ref())
	}

	pub fn diagnostics(&self) -> &DiagnosticsArea {
		&self.diagnostics
	}

	pub fn diagnostics_mut(&mut self) -> &mut DiagnosticsArea {
		&mut self.diagnostics
	}

	// --- control transfer out of expressions ---

	pub fn set_transfer(&mut self, control: Control) {
		self.transfer = Some(control);
	}

	pub fn take_transfer(&mut self) -> Option<Control> {
		self.transfer.take()
	}

	pub fn transfer_pending(&self) -> bool {
		self.transfer.is_some()
	}

	// --- aggregation ---

	pub fn registers_mut(&mut self) -> &mut RegisterSet {
		&mut self.registers
	}

	pub fn group(&self) -> &[Value] {
		&self.group
	}

	pub fn set_group(&mut self, key: Vec<Value>) {
		self.group = key;
	}

	pub fn accumulating(&self) -> bool {
		self.accumulating
	}

	pub fn set_accumulating(&mut self, on: bool) {
		self.accumulating = on;
	}

	pub fn building_window(&self) -> bool {
		self.building_window
	}

	pub fn set_building_window(&mut self, on: bool) {
		self.building_window = on;
	}

	// --- structural matching ---

	/// Record that two nodes are to be treated as equivalent by
	/// structural matching, the way a grouping clause pairs its
	/// expressions with select items.
	pub fn add_matching(&mut self, left: NodeId, right: NodeId) {
		if !self.matched(left, right) {
			self.matching.push((left, right));
		}
	}

	pub fn matched(&self, left: NodeId, right: NodeId) -> bool {
		self.matching.iter().any(|(a, b)| {
			(*a == left && *b == right)
				|| (*a == right && *b == left)
		})
	}

	/// The base scope's bindings, consumed when the run finishes.
	pub fn into_variables(mut self) -> IndexMap<String, Value> {
		match self.activations.first_mut() {
			Some(base) => std::mem::take(&mut base.locals)
				.into_iter()
				.map(|(name, binding)| (name, binding.value))
				.collect(),
			None => IndexMap::new(),
		}
	}
}

fn wall_clock() -> Timestamp {
	let micros = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|elapsed| elapsed.as_micros() as i64)
		.unwrap_or(0);
	Timestamp::from_micros_since_epoch(micros)
}

#[cfg(test)]
mod tests {
	use emberdb_core::{NoopUndo, RowBatch, StandardDomains};
	use emberdb_type::RowShape;

	use super::*;

	struct NoRows;

	impl RowProvider for NoRows {
		fn rows(&self, source: NodeId) -> Result<RowBatch> {
			Err(Error(internal::internal(format!(
				"no rows behind {}",
				source
			))))
		}
	}

	fn with_context(test: impl FnOnce(ExecutionContext<'_>)) {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let rows = NoRows;
		let undo = NoopUndo::new();
		let context = ExecutionContext::new(
			&store,
			&domains,
			&rows,
			&undo,
			ExecutionOptions::default(),
			Arc::new(AtomicBool::new(false)),
		);
		test(context);
	}

	#[test]
	fn test_bindings_walk_outward() {
		with_context(|mut ctx| {
			ctx.declare(
				"x".to_string(),
				DomainId::INTEGER,
				Value::Int(1),
			);
			ctx.push_activation(ActivationKind::Block, None)
				.unwrap();
			ctx.declare(
				"y".to_string(),
				DomainId::INTEGER,
				Value::Int(2),
			);
			assert_eq!(ctx.read("x"), Some(Value::Int(1)));
			assert_eq!(ctx.read("y"), Some(Value::Int(2)));
			assert!(ctx.write("x", Value::Int(9)));
			ctx.pop_activation();
			assert_eq!(ctx.read("x"), Some(Value::Int(9)));
			// y died with its scope
			assert_eq!(ctx.read("y"), None);
			assert!(!ctx.write("y", Value::Int(0)));
		});
	}

	#[test]
	fn test_activation_depth_is_limited() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let rows = NoRows;
		let undo = NoopUndo::new();
		let mut options = ExecutionOptions::default();
		options.max_activation_depth = 3;
		let mut ctx = ExecutionContext::new(
			&store,
			&domains,
			&rows,
			&undo,
			options,
			Arc::new(AtomicBool::new(false)),
		);
		ctx.push_activation(ActivationKind::Block, None).unwrap();
		ctx.push_activation(ActivationKind::Block, None).unwrap();
		let error = ctx
			.push_activation(ActivationKind::Block, None)
			.unwrap_err();
		assert_eq!(error.code, "54001");
	}

	#[test]
	fn test_row_fields_shadow_outer_rows() {
		with_context(|mut ctx| {
			let shape = Arc::new(RowShape::new(vec![(
				"n".to_string(),
				DomainId::INTEGER,
			)]));
			ctx.bind_row(RowBinding {
				shape: shape.clone(),
				values: vec![Value::Int(1)],
				source: 0,
			});
			ctx.push_activation(ActivationKind::Loop, None)
				.unwrap();
			ctx.bind_row(RowBinding {
				shape,
				values: vec![Value::Int(2)],
				source: 5,
			});
			assert_eq!(ctx.row_field("n"), Some(Value::Int(2)));
			assert_eq!(ctx.current_row_source(), Some(5));
			ctx.pop_activation();
			assert_eq!(ctx.row_field("n"), Some(Value::Int(1)));
		});
	}

	#[test]
	fn test_cursor_found_across_scopes() {
		with_context(|mut ctx| {
			ctx.declare_cursor("c".to_string(), NodeId(7));
			ctx.push_activation(ActivationKind::Block, None)
				.unwrap();
			assert!(ctx.find_cursor("c").is_some());
			assert!(ctx.find_cursor("other").is_none());
		});
	}

	#[test]
	fn test_matching_is_symmetric() {
		with_context(|mut ctx| {
			ctx.add_matching(NodeId(1), NodeId(2));
			assert!(ctx.matched(NodeId(1), NodeId(2)));
			assert!(ctx.matched(NodeId(2), NodeId(1)));
			assert!(!ctx.matched(NodeId(1), NodeId(3)));
		});
	}
}
