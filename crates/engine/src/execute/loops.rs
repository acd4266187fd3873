// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! The four loop forms. Every iteration runs in its own activation so
//! declarations made in the body die with the iteration, and every
//! form counts iterations against the configured ceiling.

use emberdb_core::{Node, NodeId};
use emberdb_type::error::diagnostic::runtime;
use emberdb_type::{DomainId, Error, Result, RowValue, Value};

use super::{
	Control, Evaluated, eval_for_statement, eval_or_transfer, is_true,
	obey_list,
};
use crate::context::{
	ActivationId, ActivationKind, ExecutionContext, RowBinding,
};

/// What one finished iteration means for the loop that ran it.
enum Step {
	Continue,
	Finished,
	Propagate(Control),
}

fn settle(label: &Option<String>, iteration: ActivationId, control: Control) -> Step {
	match control {
		Control::Normal => Step::Continue,
		Control::Iterate(target) if matches_label(label, &target) => {
			Step::Continue
		}
		Control::Break(target) if matches_label(label, &target) => {
			Step::Finished
		}
		// an EXIT handler declared in the body leaves its
		// iteration, not the loop
		Control::Exit(exited) if exited == iteration => Step::Continue,
		other => Step::Propagate(other),
	}
}

/// An unlabelled BREAK or ITERATE targets the innermost loop.
fn matches_label(label: &Option<String>, target: &Option<String>) -> bool {
	match target {
		None => true,
		Some(target) => label.as_deref() == Some(target.as_str()),
	}
}

fn guard(
	ctx: &ExecutionContext<'_>,
	node: &Node,
	iterations: &mut u64,
) -> Result<()> {
	*iterations += 1;
	let limit = ctx.options().max_loop_iterations;
	if *iterations > limit {
		return Err(Error(runtime::limit_exceeded(
			node.fragment.clone(),
			"loop iterations",
			limit,
		)));
	}
	Ok(())
}

pub(crate) fn run_loop(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	label: &Option<String>,
	body: &[NodeId],
) -> Result<Control> {
	let mut iterations = 0u64;
	loop {
		guard(ctx, node, &mut iterations)?;
		let id = ctx.push_activation(
			ActivationKind::Loop,
			label.clone(),
		)?;
		let outcome = obey_list(ctx, body);
		ctx.pop_activation();
		match settle(label, id, outcome?) {
			Step::Continue => {}
			Step::Finished => return Ok(Control::Normal),
			Step::Propagate(control) => return Ok(control),
		}
	}
}

pub(crate) fn run_while(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	label: &Option<String>,
	condition: NodeId,
	body: &[NodeId],
) -> Result<Control> {
	let mut iterations = 0u64;
	loop {
		guard(ctx, node, &mut iterations)?;
		let chosen = eval_or_transfer!(ctx, condition);
		if !is_true(&chosen) {
			return Ok(Control::Normal);
		}
		let id = ctx.push_activation(
			ActivationKind::Loop,
			label.clone(),
		)?;
		let outcome = obey_list(ctx, body);
		ctx.pop_activation();
		match settle(label, id, outcome?) {
			Step::Continue => {}
			Step::Finished => return Ok(Control::Normal),
			Step::Propagate(control) => return Ok(control),
		}
	}
}

pub(crate) fn run_repeat(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	label: &Option<String>,
	body: &[NodeId],
	until: NodeId,
) -> Result<Control> {
	let mut iterations = 0u64;
	loop {
		guard(ctx, node, &mut iterations)?;
		let id = ctx.push_activation(
			ActivationKind::Loop,
			label.clone(),
		)?;
		// the UNTIL test runs inside the iteration scope so it
		// can see declarations the body made
		let outcome = repeat_iteration(ctx, body, until);
		ctx.pop_activation();
		let control = match outcome? {
			Some(control) => control,
			None => return Ok(Control::Normal),
		};
		match settle(label, id, control) {
			Step::Continue => {}
			Step::Finished => return Ok(Control::Normal),
			Step::Propagate(control) => return Ok(control),
		}
	}
}

/// Run one REPEAT round. `None` means the UNTIL condition came back
/// true and the loop is done.
fn repeat_iteration(
	ctx: &mut ExecutionContext<'_>,
	body: &[NodeId],
	until: NodeId,
) -> Result<Option<Control>> {
	match obey_list(ctx, body)? {
		Control::Normal => {}
		other => return Ok(Some(other)),
	}
	Ok(match eval_for_statement(ctx, until)? {
		Evaluated::Value(value) if is_true(&value) => None,
		Evaluated::Value(_) => Some(Control::Normal),
		Evaluated::Interrupted(control) => Some(control),
	})
}

pub(crate) fn run_for(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	label: &Option<String>,
	cursor: Option<&str>,
	source: NodeId,
	body: &[NodeId],
) -> Result<Control> {
	let batch = ctx.rows().rows(source)?;
	let mut iterations = 0u64;
	for (index, row) in batch.rows.iter().enumerate() {
		guard(ctx, node, &mut iterations)?;
		let id = ctx.push_activation(
			ActivationKind::Loop,
			label.clone(),
		)?;
		ctx.bind_row(RowBinding {
			shape: batch.shape.clone(),
			values: row.clone(),
			source: index,
		});
		if let Some(name) = cursor {
			// the loop variable names the whole row
			let fields = batch
				.shape
				.iter()
				.zip(row.iter())
				.map(|((column, _), value)| {
					(column.to_string(), value.clone())
				})
				.collect();
			ctx.declare(
				name.to_string(),
				DomainId::CONTENT,
				Value::Row(Box::new(RowValue::new(fields))),
			);
		}
		let outcome = obey_list(ctx, body);
		ctx.pop_activation();
		match settle(label, id, outcome?) {
			Step::Continue => {}
			Step::Finished => return Ok(Control::Normal),
			Step::Propagate(control) => return Ok(control),
		}
	}
	Ok(Control::Normal)
}
