// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! One run of a published graph, from label verification to outcome.
//!
//! A [`Session`] borrows the store and the collaborator handles once;
//! every [`Session::run`] then executes one root node on a fresh
//! [`ExecutionContext`], so no state leaks between runs except what the
//! embedder carries over from the returned [`Outcome`].

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use emberdb_core::{
	NodeId, NodeStore, RowProvider, UndoHook, verify_labels,
};
use emberdb_type::error::diagnostic::{internal, signal};
use emberdb_type::{DomainProvider, Error, Result, Value};
use indexmap::IndexMap;
use tracing::instrument;

use crate::context::{DiagnosticsArea, ExecutionContext};
use crate::evaluate::eval;
use crate::execute::{Control, obey};
use crate::options::ExecutionOptions;

/// What one run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
	/// The root expression's value, or the value a RETURN carried out.
	pub value: Option<Value>,
	/// The bindings left in the base scope when the run finished.
	pub variables: IndexMap<String, Value>,
	/// The diagnostics area as the run left it; the last handled
	/// condition and statement row counts survive here.
	pub diagnostics: DiagnosticsArea,
}

pub struct Session<'a> {
	store: &'a NodeStore,
	domains: &'a dyn DomainProvider,
	rows: &'a dyn RowProvider,
	undo: &'a dyn UndoHook,
	options: ExecutionOptions,
	cancel: Arc<AtomicBool>,
}

impl<'a> Session<'a> {
	pub fn new(
		store: &'a NodeStore,
		domains: &'a dyn DomainProvider,
		rows: &'a dyn RowProvider,
		undo: &'a dyn UndoHook,
	) -> Self {
		Self {
			store,
			domains,
			rows,
			undo,
			options: ExecutionOptions::default(),
			cancel: Arc::new(AtomicBool::new(false)),
		}
	}

	pub fn with_options(mut self, options: ExecutionOptions) -> Self {
		self.options = options;
		self
	}

	/// A flag other threads can set to cancel the running statement.
	pub fn cancel_flag(&self) -> Arc<AtomicBool> {
		self.cancel.clone()
	}

	/// Run one root node to completion.
	///
	/// A SIGNAL no handler consumed surfaces as the error of its own
	/// SQLSTATE; everything the run bound at the base scope comes back
	/// in the outcome.
	#[instrument(level = "debug", skip(self), fields(root = %root))]
	pub fn run(&self, root: NodeId) -> Result<Outcome> {
		verify_labels(self.store, root)?;
		let mut ctx = ExecutionContext::new(
			self.store,
			self.domains,
			self.rows,
			self.undo,
			self.options.clone(),
			self.cancel.clone(),
		);
		let node = ctx.lookup(root)?;
		let value = if node.expression().is_some() {
			let value = eval(&mut ctx, root)?;
			match ctx.take_transfer() {
				None if value.is_pending() => {
					return Err(Error(internal::internal(
						"the root expression never left \
						 the accumulating phase",
					)));
				}
				None => Some(value),
				Some(Control::Signal(condition)) => {
					return Err(Error(
						signal::unhandled_condition(
							&condition,
							node.fragment.clone(),
						),
					));
				}
				Some(other) => {
					return Err(Error(internal::internal(
						format!(
							"control {:?} escaped the run",
							other
						),
					)));
				}
			}
		} else {
			match obey(&mut ctx, root)? {
				Control::Normal => None,
				Control::Return(value) => Some(value),
				Control::Exit(exited)
					if exited == ctx.base_activation() =>
				{
					None
				}
				Control::Signal(condition) => {
					return Err(Error(
						signal::unhandled_condition(
							&condition,
							node.fragment.clone(),
						),
					));
				}
				other => {
					return Err(Error(internal::internal(
						format!(
							"control {:?} escaped the run",
							other
						),
					)));
				}
			}
		};
		let diagnostics = std::mem::take(ctx.diagnostics_mut());
		Ok(Outcome {
			value,
			variables: ctx.into_variables(),
			diagnostics,
		})
	}
}
