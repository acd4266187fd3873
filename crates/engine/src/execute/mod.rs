// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! The statement interpreter. `obey` runs one statement node and
//! reports how control left it; executors propagate non-normal
//! control outward as values, never by unwinding the host stack.

pub(crate) mod call;
mod cursor;
mod loops;
mod signal;

use emberdb_core::graph::{ExpressionNode, StatementNode};
use emberdb_core::{Node, NodeId};
use emberdb_type::error::diagnostic::{
	arithmetic, cast, internal, routine, runtime,
};
use emberdb_type::{Condition, DomainKind, Error, Result, Value, coerce};
use tracing::instrument;

use crate::context::{ActivationKind, ExecutionContext, Handler};
use crate::evaluate;

/// How control left a statement.
///
/// Executors inspect the variants they are responsible for and pass
/// the rest to their caller: loops consume their own BREAK and
/// ITERATE, compounds convert an EXIT naming their activation, call
/// frames absorb RETURN, and an unconsumed SIGNAL reaches the session
/// as an unhandled condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
	Normal,
	Return(Value),
	Break(Option<String>),
	Iterate(Option<String>),
	Exit(crate::context::ActivationId),
	Signal(Condition),
}

/// An expression result observed at a statement boundary: either a
/// value, or a control transfer that a routine called inside the
/// expression set in motion.
pub(crate) enum Evaluated {
	Value(Value),
	Interrupted(Control),
}

pub(crate) fn eval_for_statement(
	ctx: &mut ExecutionContext<'_>,
	id: NodeId,
) -> Result<Evaluated> {
	let value = evaluate::eval(ctx, id)?;
	Ok(match ctx.take_transfer() {
		Some(control) => Evaluated::Interrupted(control),
		None => Evaluated::Value(value),
	})
}

macro_rules! eval_or_transfer {
	($ctx:expr, $id:expr) => {
		match $crate::execute::eval_for_statement($ctx, $id)? {
			$crate::execute::Evaluated::Value(value) => value,
			$crate::execute::Evaluated::Interrupted(control) => {
				return Ok(control);
			}
		}
	};
}
pub(crate) use eval_or_transfer;

/// Run one statement. Errors carrying a catchable SQLSTATE are turned
/// into conditions here, at the raise site, where the activation stack
/// is still intact for the handler search.
#[instrument(level = "trace", skip_all, fields(node = %id))]
pub fn obey(ctx: &mut ExecutionContext<'_>, id: NodeId) -> Result<Control> {
	if ctx.cancelled() {
		return Err(Error(runtime::cancelled()));
	}
	let node = ctx.lookup(id)?;
	match dispatch(ctx, &node) {
		Ok(control) => Ok(control),
		Err(error) => signal::intercept(ctx, error),
	}
}

/// Run statements in order until one of them leaves abnormally.
pub fn obey_list(
	ctx: &mut ExecutionContext<'_>,
	body: &[NodeId],
) -> Result<Control> {
	for id in body {
		match obey(ctx, *id)? {
			Control::Normal => {}
			other => return Ok(other),
		}
	}
	Ok(Control::Normal)
}

fn dispatch(ctx: &mut ExecutionContext<'_>, node: &Node) -> Result<Control> {
	let Some(statement) = node.statement() else {
		if node.expression().is_some() {
			// an expression in statement position runs for effect
			match eval_for_statement(ctx, node.id)? {
				Evaluated::Value(_) => {}
				Evaluated::Interrupted(control) => {
					return Ok(control);
				}
			}
		}
		// routine definitions are data, running one is a no-op
		return Ok(Control::Normal);
	};
	match statement {
		StatementNode::Compound {
			label,
			body,
		} => compound(ctx, label.clone(), body),
		StatementNode::DeclareVariable {
			name,
			domain,
			init,
		} => {
			let value = match init {
				Some(init) => {
					let value =
						eval_or_transfer!(ctx, *init);
					let target =
						ctx.resolve_domain(*domain)?;
					coerce(
						value,
						&target,
						ctx.domains(),
						&node.fragment,
					)?
				}
				None => ctx
					.resolve_domain(*domain)?
					.default_value(),
			};
			ctx.declare(name.clone(), *domain, value);
			Ok(Control::Normal)
		}
		StatementNode::DeclareHandler {
			disposition,
			conditions,
			action,
		} => {
			let handler = Handler {
				disposition: *disposition,
				action: *action,
				savepoint: ctx.undo().savepoint(),
				snapshot: ctx.current().locals_snapshot(),
			};
			for condition in conditions {
				ctx.current().handlers.insert(
					condition.clone(),
					handler.clone(),
				);
			}
			Ok(Control::Normal)
		}
		StatementNode::DeclareCursor {
			name,
			source,
		} => {
			ctx.declare_cursor(name.clone(), *source);
			Ok(Control::Normal)
		}
		StatementNode::Assign {
			target,
			value,
		} => {
			let value = eval_or_transfer!(ctx, *value);
			assign_to(ctx, *target, value)?;
			Ok(Control::Normal)
		}
		StatementNode::MultipleAssign {
			targets,
			value,
		} => {
			let value = eval_or_transfer!(ctx, *value);
			let row = match value {
				Value::Row(row) => *row,
				other => {
					return Err(Error(
						cast::cannot_coerce(
							node.fragment
								.clone(),
							DomainKind::Row,
							&other,
						),
					));
				}
			};
			if row.len() != targets.len() {
				return Err(Error(cast::row_arity_mismatch(
					node.fragment.clone(),
					targets.len(),
					row.len(),
				)));
			}
			for (index, target) in targets.iter().enumerate() {
				let field = row
					.get_at(index)
					.cloned()
					.unwrap_or(Value::Null);
				assign_to(ctx, *target, field)?;
			}
			Ok(Control::Normal)
		}
		StatementNode::Branch {
			condition,
			then_body,
			elsifs,
			otherwise,
		} => {
			let chosen = eval_or_transfer!(ctx, *condition);
			if is_true(&chosen) {
				return obey_list(ctx, then_body);
			}
			for (elsif, body) in elsifs {
				let chosen = eval_or_transfer!(ctx, *elsif);
				if is_true(&chosen) {
					return obey_list(ctx, body);
				}
			}
			obey_list(ctx, otherwise)
		}
		StatementNode::CaseStatement {
			operand,
			whens,
			otherwise,
		} => case_statement(ctx, node, operand, whens, otherwise),
		StatementNode::Loop {
			label,
			body,
		} => loops::run_loop(ctx, node, label, body),
		StatementNode::While {
			label,
			condition,
			body,
		} => loops::run_while(ctx, node, label, *condition, body),
		StatementNode::Repeat {
			label,
			body,
			until,
		} => loops::run_repeat(ctx, node, label, body, *until),
		StatementNode::ForCursor {
			label,
			cursor,
			source,
			body,
		} => loops::run_for(
			ctx,
			node,
			label,
			cursor.as_deref(),
			*source,
			body,
		),
		StatementNode::Break {
			label,
		} => Ok(Control::Break(label.clone())),
		StatementNode::Iterate {
			label,
		} => Ok(Control::Iterate(label.clone())),
		StatementNode::OpenCursor {
			cursor,
		} => cursor::run_open(ctx, node, cursor),
		StatementNode::CloseCursor {
			cursor,
		} => cursor::run_close(ctx, node, cursor),
		StatementNode::Fetch {
			cursor,
			how,
			position,
			targets,
		} => cursor::run_fetch(ctx, node, cursor, *how, *position, targets),
		StatementNode::SelectSingle {
			source,
			columns,
			targets,
		} => cursor::run_select_single(ctx, node, *source, columns, targets),
		StatementNode::CallProcedure {
			routine,
			args,
		} => call::run_call(ctx, node, *routine, args),
		StatementNode::Return {
			value,
		} => call::run_return(ctx, node, *value),
		StatementNode::Signal {
			resignal,
			code,
			items,
		} => signal::run_signal(ctx, node, *resignal, code, items),
		StatementNode::GetDiagnostics {
			items,
		} => signal::run_get_diagnostics(ctx, items),
	}
}

fn compound(
	ctx: &mut ExecutionContext<'_>,
	label: Option<String>,
	body: &[NodeId],
) -> Result<Control> {
	let id = ctx.push_activation(ActivationKind::Block, label.clone())?;
	let outcome = obey_list(ctx, body);
	ctx.pop_activation();
	Ok(match outcome? {
		Control::Break(Some(target))
			if label.as_deref() == Some(target.as_str()) =>
		{
			Control::Normal
		}
		Control::Exit(exited) if exited == id => Control::Normal,
		other => other,
	})
}

fn case_statement(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	operand: &Option<NodeId>,
	whens: &[(Vec<NodeId>, Vec<NodeId>)],
	otherwise: &Option<Vec<NodeId>>,
) -> Result<Control> {
	match operand {
		Some(operand) => {
			let subject = eval_or_transfer!(ctx, *operand);
			for (candidates, body) in whens {
				for candidate in candidates {
					let candidate =
						eval_or_transfer!(ctx, *candidate);
					let hit = emberdb_type::domain::arith::compare(
						&subject,
						&candidate,
						&node.fragment,
					)?;
					if hit == Some(std::cmp::Ordering::Equal) {
						return obey_list(ctx, body);
					}
				}
			}
		}
		None => {
			for (conditions, body) in whens {
				for condition in conditions {
					let chosen =
						eval_or_transfer!(ctx, *condition);
					if is_true(&chosen) {
						return obey_list(ctx, body);
					}
				}
			}
		}
	}
	match otherwise {
		Some(body) => obey_list(ctx, body),
		None => Err(Error(runtime::case_not_found(
			node.fragment.clone(),
		))),
	}
}

/// Three-valued truth at a statement decision point: only a definite
/// TRUE takes the branch.
pub(crate) fn is_true(value: &Value) -> bool {
	matches!(value, Value::Boolean(true))
}

/// Store a value through an assignable reference, coercing to the
/// declared domain of the variable at the root of the reference chain.
pub(crate) fn assign_to(
	ctx: &mut ExecutionContext<'_>,
	target: NodeId,
	value: Value,
) -> Result<()> {
	let node = ctx.lookup(target)?;
	match node.expression() {
		Some(ExpressionNode::ColumnRef {
			of: None,
			name,
		}) => {
			let Some(domain_id) = ctx.binding_domain(name) else {
				return Err(Error(
					routine::unknown_identifier(
						node.fragment.clone(),
						name,
					),
				));
			};
			let domain = ctx.resolve_domain(domain_id)?;
			let coerced = coerce(
				value,
				&domain,
				ctx.domains(),
				&node.fragment,
			)?;
			if !ctx.write(name, coerced) {
				return Err(Error(internal::internal(format!(
					"binding for {} vanished mid-assignment",
					name
				))));
			}
			Ok(())
		}
		Some(ExpressionNode::ColumnRef {
			of: Some(base),
			name,
		}) => {
			// read the row, replace the field, write the row
			// back through the same chain
			let current = evaluate::eval(ctx, *base)?;
			let mut row = match current {
				Value::Row(row) => *row,
				other => {
					return Err(Error(
						arithmetic::unsupported_operand(
							node.fragment
								.clone(),
							".",
							other.kind(),
						),
					));
				}
			};
			if !row.set(name, value) {
				return Err(Error(routine::unknown_field(
					node.fragment.clone(),
					name,
					"the row",
				)));
			}
			assign_to(ctx, *base, Value::Row(Box::new(row)))
		}
		_ => Err(Error(internal::internal(format!(
			"node {} is not an assignable reference",
			node.id
		)))),
	}
}
