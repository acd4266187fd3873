// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Routine invocation, shared by CALL statements and calls inside
//! expressions. Arguments are evaluated in the caller's scope before
//! the callee frame exists, and OUT and INOUT values are copied back
//! only when the callee finishes normally.

use emberdb_core::graph::{ExpressionNode, ParameterMode};
use emberdb_core::{Node, NodeId};
use emberdb_type::error::diagnostic::routine as routine_diag;
use emberdb_type::{Error, Fragment, Result, Value, coerce};

use super::{
	Control, Evaluated, assign_to, eval_for_statement, eval_or_transfer,
	obey,
};
use crate::context::{ActivationKind, ExecutionContext};

/// How a routine call came back to its caller.
#[derive(Debug)]
pub(crate) enum Invoked {
	Done(Value),
	Interrupted(Control),
}

pub(crate) fn invoke(
	ctx: &mut ExecutionContext<'_>,
	routine_id: NodeId,
	args: &[NodeId],
	fragment: &Fragment,
) -> Result<Invoked> {
	let node = ctx.lookup(routine_id)?;
	let Some(routine) = node.routine() else {
		return Err(Error(routine_diag::unknown_routine(
			fragment.clone(),
			&routine_id.to_string(),
		)));
	};
	if args.len() != routine.params.len() {
		return Err(Error(routine_diag::argument_count_mismatch(
			fragment.clone(),
			&routine.name,
			routine.params.len(),
			args.len(),
		)));
	}
	let mut initials = Vec::with_capacity(args.len());
	for (param, arg) in routine.params.iter().zip(args) {
		if !matches!(param.mode, ParameterMode::In) {
			expect_assignable(ctx, *arg, &param.name, fragment)?;
		}
		let value = match param.mode {
			ParameterMode::In | ParameterMode::InOut => {
				let value = match eval_for_statement(
					ctx, *arg,
				)? {
					Evaluated::Value(value) => value,
					Evaluated::Interrupted(control) => {
						return Ok(
							Invoked::Interrupted(
								control,
							),
						);
					}
				};
				let domain =
					ctx.resolve_domain(param.domain)?;
				coerce(value, &domain, ctx.domains(), fragment)?
			}
			ParameterMode::Out => {
				ctx.resolve_domain(param.domain)?
					.default_value()
			}
		};
		initials.push(value);
	}
	let id = ctx.push_activation(
		ActivationKind::Routine,
		Some(routine.name.clone()),
	)?;
	ctx.current().returns = routine.returns;
	for (param, value) in routine.params.iter().zip(initials) {
		ctx.declare(param.name.clone(), param.domain, value);
	}
	let control = match obey(ctx, routine.body) {
		Ok(control) => control,
		Err(error) => {
			ctx.pop_activation();
			return Err(error);
		}
	};
	let finished = matches!(&control, Control::Normal | Control::Return(_))
		|| matches!(&control, Control::Exit(exited) if *exited == id);
	if !finished {
		ctx.pop_activation();
		return Ok(Invoked::Interrupted(control));
	}
	// a routine that runs off the end of its body yields NULL
	let value = match control {
		Control::Return(value) => value,
		_ => Value::Null,
	};
	// capture OUT and INOUT values before the callee frame goes away
	let mut outs = Vec::new();
	for (param, arg) in routine.params.iter().zip(args) {
		if matches!(param.mode, ParameterMode::In) {
			continue;
		}
		let current = ctx
			.current()
			.locals
			.get(&param.name)
			.map(|binding| binding.value.clone())
			.unwrap_or(Value::Null);
		outs.push((*arg, current));
	}
	ctx.pop_activation();
	for (target, value) in outs {
		assign_to(ctx, target, value)?;
	}
	Ok(Invoked::Done(value))
}

fn expect_assignable(
	ctx: &ExecutionContext<'_>,
	arg: NodeId,
	param: &str,
	fragment: &Fragment,
) -> Result<()> {
	let node = ctx.lookup(arg)?;
	match node.expression() {
		Some(ExpressionNode::ColumnRef {
			..
		}) => Ok(()),
		_ => Err(Error(routine_diag::readonly_argument(
			fragment.clone(),
			param,
		))),
	}
}

pub(crate) fn run_call(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	routine: NodeId,
	args: &[NodeId],
) -> Result<Control> {
	match invoke(ctx, routine, args, &node.fragment)? {
		Invoked::Done(_) => Ok(Control::Normal),
		Invoked::Interrupted(control) => Ok(control),
	}
}

pub(crate) fn run_return(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	value: Option<NodeId>,
) -> Result<Control> {
	let value = match value {
		Some(value) => eval_or_transfer!(ctx, value),
		None => Value::Null,
	};
	// coerce to the declared result domain of the routine being left
	let returns = ctx
		.activations()
		.iter()
		.rev()
		.find(|activation| {
			activation.kind == ActivationKind::Routine
		})
		.and_then(|activation| activation.returns);
	let value = match returns {
		Some(domain) => {
			let domain = ctx.resolve_domain(domain)?;
			coerce(value, &domain, ctx.domains(), &node.fragment)?
		}
		None => value,
	};
	Ok(Control::Return(value))
}
