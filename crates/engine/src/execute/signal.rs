// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Raising, searching and dispatching conditions. Interception happens
//! at the raise site, while the activation stack below the handler is
//! still standing, so CONTINUE can resume arbitrarily deep and UNDO
//! can restore the defining block before control climbs back out.

use std::collections::HashMap;

use emberdb_core::graph::HandlerDisposition;
use emberdb_core::{Node, NodeId};
use emberdb_type::error::diagnostic::signal as signal_diag;
use emberdb_type::{
	Condition, DEFAULT_SIGNAL_STATE, DiagnosticsItem, Error, Result, Value,
};
use once_cell::sync::Lazy;
use tracing::debug;

use super::{Control, assign_to, eval_or_transfer, obey};
use crate::context::{
	ActivationId, ActivationKind, ExecutionContext, Handler,
};

/// Standard condition class texts, used when a SIGNAL carries no
/// MESSAGE_TEXT of its own.
static CLASS_DESCRIPTIONS: Lazy<HashMap<&'static str, &'static str>> =
	Lazy::new(|| {
		HashMap::from([
			("01", "warning"),
			("02", "no data"),
			("07", "dynamic SQL error"),
			("08", "connection exception"),
			("0A", "feature not supported"),
			("0K", "resignal when handler not active"),
			("20", "case not found for case statement"),
			("21", "cardinality violation"),
			("22", "data exception"),
			("23", "integrity constraint violation"),
			("24", "invalid cursor state"),
			("25", "invalid transaction state"),
			("28", "invalid authorization specification"),
			("2D", "invalid transaction termination"),
			("34", "invalid cursor name"),
			("3D", "invalid catalog name"),
			("40", "transaction rollback"),
			("42", "syntax error or access rule violation"),
			("44", "with check option violation"),
			("45", "unhandled user-defined exception"),
			("54", "program limit exceeded"),
			("57", "operator intervention"),
		])
	});

fn default_message(code: &str) -> String {
	let class = code.get(..2).unwrap_or("");
	match CLASS_DESCRIPTIONS.get(class) {
		Some(description) => (*description).to_string(),
		None => format!("condition {}", code),
	}
}

/// Decide what an error escaping a statement means. Faults without a
/// SQLSTATE and operator intervention stay errors; everything else
/// becomes a condition and goes through the handler search.
pub(crate) fn intercept(
	ctx: &mut ExecutionContext<'_>,
	error: Error,
) -> Result<Control> {
	if error.code.starts_with("57") {
		return Err(error);
	}
	let Some(condition) = Condition::from_diagnostic(&error.0) else {
		return Err(error);
	};
	raise_condition(ctx, condition)
}

/// Record the condition, then either dispatch it to a handler or let
/// it travel outward as `Control::Signal`.
pub(crate) fn raise_condition(
	ctx: &mut ExecutionContext<'_>,
	condition: Condition,
) -> Result<Control> {
	ctx.diagnostics_mut().record(&condition);
	debug!(code = condition.code(), "condition raised");
	if condition.is_uncatchable() {
		return Ok(Control::Signal(condition));
	}
	match find_handler(ctx, condition.code()) {
		Some(found) => run_handler(ctx, found, condition),
		None => Ok(Control::Signal(condition)),
	}
}

struct Found {
	index: usize,
	id: ActivationId,
	key: String,
	handler: Handler,
}

/// Walk the activations from the raise site outward. Within one
/// activation the exact code beats the class wildcard, which beats the
/// generic name. Handlers already running for this raise chain are
/// skipped so a handler never catches itself.
fn find_handler(ctx: &ExecutionContext<'_>, code: &str) -> Option<Found> {
	let busy: Vec<(ActivationId, &str)> = ctx
		.activations()
		.iter()
		.filter_map(|activation| {
			activation
				.running_handler
				.as_ref()
				.map(|(id, key)| (*id, key.as_str()))
		})
		.collect();
	let class = code.get(..2).unwrap_or("");
	let wildcard = code
		.chars()
		.next()
		.filter(char::is_ascii_digit)
		.map(|_| format!("{}000", class));
	let generic = match class {
		"01" => "SQLWARNING",
		"02" => "NOT FOUND",
		_ => "SQLEXCEPTION",
	};
	for (index, activation) in
		ctx.activations().iter().enumerate().rev()
	{
		let mut candidates = vec![code];
		if let Some(wildcard) = wildcard.as_deref() {
			candidates.push(wildcard);
		}
		candidates.push(generic);
		for key in candidates {
			if busy.contains(&(activation.id, key)) {
				continue;
			}
			if let Some(handler) = activation.handlers.get(key) {
				return Some(Found {
					index,
					id: activation.id,
					key: key.to_string(),
					handler: handler.clone(),
				});
			}
		}
	}
	None
}

fn run_handler(
	ctx: &mut ExecutionContext<'_>,
	found: Found,
	condition: Condition,
) -> Result<Control> {
	let Found {
		index,
		id,
		key,
		handler,
	} = found;
	if handler.disposition == HandlerDisposition::Undo {
		// unwind the work and the defining block's bindings to
		// their state at declaration, before the action looks
		ctx.undo().rollback_to(handler.savepoint)?;
		if let Some(activation) = ctx.activation_mut(index) {
			activation.restore_locals(&handler.snapshot);
		}
	}
	let control = run_action(ctx, id, &key, &handler, condition)?;
	Ok(match (handler.disposition, control) {
		(HandlerDisposition::Continue, Control::Normal) => {
			Control::Normal
		}
		(_, Control::Normal) => Control::Exit(id),
		(_, other) => other,
	})
}

fn run_action(
	ctx: &mut ExecutionContext<'_>,
	defining: ActivationId,
	key: &str,
	handler: &Handler,
	condition: Condition,
) -> Result<Control> {
	ctx.push_activation(ActivationKind::Handler, None)?;
	{
		let current = ctx.current();
		current.active_condition = Some(condition);
		current.running_handler = Some((defining, key.to_string()));
	}
	let outcome = obey(ctx, handler.action);
	ctx.pop_activation();
	outcome
}

pub(crate) fn run_signal(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	resignal: bool,
	code: &Option<String>,
	items: &[(DiagnosticsItem, NodeId)],
) -> Result<Control> {
	let mut condition = if resignal {
		let Some(active) = ctx.nearest_condition().cloned() else {
			return Err(Error(
				signal_diag::resignal_outside_handler(
					node.fragment.clone(),
				),
			));
		};
		let mut active = active;
		if let Some(code) = code {
			active.set_code(code.clone());
		}
		active
	} else {
		match code {
			Some(code) => Condition::new(code.clone()),
			None => Condition::new(DEFAULT_SIGNAL_STATE),
		}
	};
	for (item, value) in items {
		let value = eval_or_transfer!(ctx, *value);
		condition.set_item(*item, value);
	}
	if condition.item(DiagnosticsItem::MessageText).is_none() {
		condition.set_item(
			DiagnosticsItem::MessageText,
			Value::utf8(default_message(condition.code())),
		);
	}
	raise_condition(ctx, condition)
}

pub(crate) fn run_get_diagnostics(
	ctx: &mut ExecutionContext<'_>,
	items: &[(NodeId, DiagnosticsItem)],
) -> Result<Control> {
	for (target, item) in items {
		let value = ctx.diagnostics().get(*item);
		assign_to(ctx, *target, value)?;
	}
	Ok(Control::Normal)
}
