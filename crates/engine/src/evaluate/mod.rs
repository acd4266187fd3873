// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! The expression evaluator.
//!
//! [`eval`] walks an expression subgraph depth first and yields a single
//! [`Value`]. Published nodes are never touched; every effect lands on
//! the [`ExecutionContext`]. While aggregate registers are being fed the
//! evaluator yields [`Value::Pending`], and strict operators pass the
//! sentinel through unchanged.

mod function;
mod logic;
mod predicate;
mod structural;
mod window;

pub use function::accumulate;
pub use structural::matches;

use std::cmp::Ordering;

use emberdb_core::graph::{BinaryOp, ExpressionNode, UnaryOp};
use emberdb_core::{Node, NodeId};
use emberdb_type::error::diagnostic::{
	arithmetic, cast, internal, routine, runtime,
};
use emberdb_type::{
	DomainKind, Error, Fragment, Result, RowValue, Value, coerce,
	domain::arith,
};
use tracing::instrument;

use crate::context::ExecutionContext;
use crate::execute::call::{self, Invoked};
use crate::execute::is_true;

/// Evaluate one expression node to a value.
///
/// A pending control transfer (a routine called earlier in the same
/// expression left abnormally) short-circuits every remaining
/// evaluation to NULL until the statement layer picks the transfer up.
#[instrument(level = "trace", skip_all, fields(node = %id))]
pub fn eval(ctx: &mut ExecutionContext<'_>, id: NodeId) -> Result<Value> {
	if ctx.transfer_pending() {
		return Ok(Value::Null);
	}
	let node = ctx.lookup(id)?;
	if node.depth > ctx.options().max_expression_depth {
		return Err(Error(runtime::limit_exceeded(
			node.fragment.clone(),
			"expression depth",
			ctx.options().max_expression_depth as u64,
		)));
	}
	let Some(expression) = node.expression() else {
		return Err(Error(internal::internal(format!(
			"{} is not an expression",
			node.id
		))));
	};
	match expression {
		ExpressionNode::Literal(value) => Ok(value.clone()),
		ExpressionNode::ColumnRef {
			of: None,
			name,
		} => resolve_name(ctx, &node, name),
		ExpressionNode::ColumnRef {
			of: Some(of),
			name,
		} => {
			let base = eval(ctx, *of)?;
			field_of(&node, base, name)
		}
		ExpressionNode::Binary {
			op,
			left,
			right,
		} => binary(ctx, &node, *op, *left, *right),
		ExpressionNode::Unary {
			op: UnaryOp::Not,
			operand,
		} => {
			let operand = eval(ctx, *operand)?;
			logic::not(&operand, &node.fragment)
		}
		ExpressionNode::Unary {
			op: UnaryOp::Neg,
			operand,
		} => {
			let operand = eval(ctx, *operand)?;
			arith::negate(&operand, &node.fragment)
		}
		ExpressionNode::RowConstructor {
			fields,
		} => {
			let mut out = Vec::with_capacity(fields.len());
			for (name, field) in fields {
				out.push((name.clone(), eval(ctx, *field)?));
			}
			Ok(Value::row(RowValue::new(out)))
		}
		ExpressionNode::ArrayConstructor {
			elements,
		} => {
			let mut out = Vec::with_capacity(elements.len());
			for element in elements {
				out.push(eval(ctx, *element)?);
			}
			if out.iter().any(Value::is_pending) {
				return Ok(Value::Pending);
			}
			Ok(Value::array(out))
		}
		ExpressionNode::Subquery {
			source,
		} => subquery(ctx, &node, *source),
		ExpressionNode::Call {
			routine,
			args,
		} => match call::invoke(ctx, *routine, args, &node.fragment)? {
			Invoked::Done(value) => Ok(value),
			Invoked::Interrupted(control) => {
				ctx.set_transfer(control);
				Ok(Value::Null)
			}
		},
		ExpressionNode::Case {
			operand,
			whens,
			otherwise,
		} => case(ctx, &node, *operand, whens, *otherwise),
		ExpressionNode::Coalesce {
			operands,
		} => {
			for operand in operands {
				// a pending operand falls through the value arm
				// and keeps the whole expression pending
				match eval(ctx, *operand)? {
					Value::Null => continue,
					value => return Ok(value),
				}
			}
			Ok(Value::Null)
		}
		ExpressionNode::NullIf {
			left,
			right,
		} => {
			let left = eval(ctx, *left)?;
			let right = eval(ctx, *right)?;
			if left.is_pending() || right.is_pending() {
				return Ok(Value::Pending);
			}
			match arith::compare(&left, &right, &node.fragment)? {
				Some(Ordering::Equal) => Ok(Value::Null),
				_ => Ok(left),
			}
		}
		ExpressionNode::Cast {
			operand,
			domain,
		} => {
			let value = eval(ctx, *operand)?;
			if value.is_pending() {
				return Ok(Value::Pending);
			}
			let target = ctx.resolve_domain(*domain)?;
			coerce(value, &target, ctx.domains(), &node.fragment)
		}
		ExpressionNode::Function(call) => {
			function::evaluate(ctx, &node, call)
		}
		ExpressionNode::Between {
			value,
			low,
			high,
			negated,
		} => predicate::between(ctx, &node, *value, *low, *high, *negated),
		ExpressionNode::Like {
			value,
			pattern,
			escape,
			negated,
		} => predicate::like(
			ctx, &node, *value, *pattern, *escape, *negated,
		),
		ExpressionNode::InList {
			value,
			list,
			negated,
		} => predicate::in_list(ctx, &node, *value, list, *negated),
		ExpressionNode::InSubquery {
			value,
			source,
			negated,
		} => predicate::in_subquery(ctx, &node, *value, *source, *negated),
		ExpressionNode::Member {
			value,
			collection,
			negated,
		} => predicate::member(ctx, &node, *value, *collection, *negated),
		ExpressionNode::IsNull {
			operand,
			negated,
		} => {
			let value = eval(ctx, *operand)?;
			if value.is_pending() {
				return Ok(Value::Pending);
			}
			Ok(Value::Boolean(value.is_null() != *negated))
		}
		ExpressionNode::Quantified {
			op,
			value,
			all,
			source,
		} => predicate::quantified(ctx, &node, *op, *value, *all, *source),
		ExpressionNode::Exists {
			source,
		} => {
			// EXISTS is never unknown
			let batch = ctx.rows().rows(*source)?;
			Ok(Value::Boolean(!batch.rows.is_empty()))
		}
		ExpressionNode::Period {
			op,
			left,
			right,
		} => predicate::period(ctx, &node, *op, *left, *right),
	}
}

/// Resolution order for a free name: declared binding, then the row
/// binding chain, then the node's own domain default.
fn resolve_name(
	ctx: &ExecutionContext<'_>,
	node: &Node,
	name: &str,
) -> Result<Value> {
	if let Some(value) = ctx.read(name) {
		return Ok(value);
	}
	if let Some(value) = ctx.row_field(name) {
		return Ok(value);
	}
	Ok(ctx.resolve_domain(node.domain)?.default_value())
}

fn field_of(node: &Node, base: Value, name: &str) -> Result<Value> {
	match base {
		Value::Pending => Ok(Value::Pending),
		Value::Null => Ok(Value::Null),
		Value::Row(row) => match row.get(name) {
			Some(value) => Ok(value.clone()),
			None => Err(Error(routine::unknown_field(
				node.fragment.clone(),
				name,
				"the row",
			))),
		},
		other => Err(Error(arithmetic::unsupported_operand(
			node.fragment.clone(),
			".",
			other.kind(),
		))),
	}
}

fn binary(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	op: BinaryOp,
	left: NodeId,
	right: NodeId,
) -> Result<Value> {
	let left = eval(ctx, left)?;
	let right = eval(ctx, right)?;
	let fragment = &node.fragment;
	match op {
		BinaryOp::Add => arith::add(&left, &right, fragment),
		BinaryOp::Subtract => arith::subtract(&left, &right, fragment),
		BinaryOp::Multiply => arith::multiply(&left, &right, fragment),
		BinaryOp::Divide => arith::divide(&left, &right, fragment),
		BinaryOp::Concat => arith::concat(&left, &right, fragment),
		BinaryOp::And => logic::and(&left, &right, fragment),
		BinaryOp::Or => logic::or(&left, &right, fragment),
		BinaryOp::Index => index(&left, &right, fragment),
		comparison => {
			if left.is_pending() || right.is_pending() {
				return Ok(Value::Pending);
			}
			match arith::compare(&left, &right, fragment)? {
				Some(ordering) => Ok(Value::Boolean(
					comparison_holds(comparison, ordering),
				)),
				None => Ok(Value::Null),
			}
		}
	}
}

/// Whether `ordering` satisfies a comparison operator.
pub(crate) fn comparison_holds(op: BinaryOp, ordering: Ordering) -> bool {
	match op {
		BinaryOp::Equal => ordering == Ordering::Equal,
		BinaryOp::NotEqual => ordering != Ordering::Equal,
		BinaryOp::LessThan => ordering == Ordering::Less,
		BinaryOp::LessThanEqual => ordering != Ordering::Greater,
		BinaryOp::GreaterThan => ordering == Ordering::Greater,
		BinaryOp::GreaterThanEqual => ordering != Ordering::Less,
		_ => false,
	}
}

/// Array subscripts are one-based.
fn index(
	array: &Value,
	subscript: &Value,
	fragment: &Fragment,
) -> Result<Value> {
	if array.is_pending() || subscript.is_pending() {
		return Ok(Value::Pending);
	}
	if array.is_null() || subscript.is_null() {
		return Ok(Value::Null);
	}
	let Some(position) = subscript.as_int() else {
		return Err(Error(cast::cannot_coerce(
			fragment.clone(),
			DomainKind::Integer,
			subscript,
		)));
	};
	match array {
		Value::Array(items) => {
			if position < 1 || position as usize > items.len() {
				return Err(Error(
					runtime::subscript_out_of_range(
						fragment.clone(),
						position,
						items.len(),
					),
				));
			}
			Ok(items[position as usize - 1].clone())
		}
		other => Err(Error(arithmetic::unsupported_operand(
			fragment.clone(),
			"[]",
			other.kind(),
		))),
	}
}

fn subquery(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	source: NodeId,
) -> Result<Value> {
	let batch = ctx.rows().rows(source)?;
	if batch.rows.len() > 1 {
		return Err(Error(runtime::cardinality_violation(
			node.fragment.clone(),
		)));
	}
	// one row: its first column; no rows: NULL
	Ok(batch
		.row(0)
		.and_then(|row| row.first())
		.cloned()
		.unwrap_or(Value::Null))
}

fn case(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	operand: Option<NodeId>,
	whens: &[(NodeId, NodeId)],
	otherwise: Option<NodeId>,
) -> Result<Value> {
	match operand {
		Some(operand) => {
			let probe = eval(ctx, operand)?;
			if probe.is_pending() {
				return Ok(Value::Pending);
			}
			for (when, then) in whens {
				let candidate = eval(ctx, *when)?;
				if candidate.is_pending() {
					return Ok(Value::Pending);
				}
				if arith::compare(
					&probe,
					&candidate,
					&node.fragment,
				)? == Some(Ordering::Equal)
				{
					return eval(ctx, *then);
				}
			}
		}
		None => {
			for (when, then) in whens {
				let test = eval(ctx, *when)?;
				if test.is_pending() {
					return Ok(Value::Pending);
				}
				if is_true(&test) {
					return eval(ctx, *then);
				}
			}
		}
	}
	// in expression position a missed CASE is NULL, not an error
	match otherwise {
		Some(otherwise) => eval(ctx, otherwise),
		None => Ok(Value::Null),
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::AtomicBool;

	use emberdb_core::graph::GraphBuilder;
	use emberdb_core::{NodeStore, NoopUndo, StandardDomains};
	use emberdb_testing::FixtureRows;
	use emberdb_type::{DomainId, RowShape};

	use super::*;
	use crate::context::RowBinding;
	use crate::execute::Control;
	use crate::options::ExecutionOptions;

	fn context<'a>(
		store: &'a NodeStore,
		domains: &'a StandardDomains,
		rows: &'a FixtureRows,
		undo: &'a NoopUndo,
	) -> ExecutionContext<'a> {
		ExecutionContext::new(
			store,
			domains,
			rows,
			undo,
			ExecutionOptions::default(),
			Arc::new(AtomicBool::new(false)),
		)
	}

	#[test]
	fn test_arithmetic_and_division_by_zero() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let six = b.literal(Value::Int(6)).unwrap();
		let two = b.literal(Value::Int(2)).unwrap();
		let sum = b.binary(BinaryOp::Add, six, two).unwrap();
		let zero = b.literal(Value::Int(0)).unwrap();
		let quotient = b.binary(BinaryOp::Divide, six, zero).unwrap();
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		assert_eq!(eval(&mut ctx, sum).unwrap(), Value::Int(8));
		let error = eval(&mut ctx, quotient).unwrap_err();
		assert_eq!(error.code, "22012");
	}

	#[test]
	fn test_three_valued_logic() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let null = b.literal(Value::Null).unwrap();
		let yes = b.literal(Value::Boolean(true)).unwrap();
		let no = b.literal(Value::Boolean(false)).unwrap();
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		let cases = [
			(BinaryOp::And, null, no, Value::Boolean(false)),
			(BinaryOp::And, null, yes, Value::Null),
			(BinaryOp::Or, null, yes, Value::Boolean(true)),
			(BinaryOp::Or, null, no, Value::Null),
		];
		for (op, left, right, expected) in cases {
			let node = b.binary(op, left, right).unwrap();
			assert_eq!(
				eval(&mut ctx, node).unwrap(),
				expected,
				"{}",
				op
			);
		}
		let negated = b.unary(UnaryOp::Not, null).unwrap();
		assert_eq!(eval(&mut ctx, negated).unwrap(), Value::Null);
	}

	#[test]
	fn test_comparison_null_contaminates() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let one = b.literal(Value::Int(1)).unwrap();
		let two = b.literal(Value::Int(2)).unwrap();
		let null = b.literal(Value::Null).unwrap();
		let holds = b.binary(BinaryOp::LessThan, one, two).unwrap();
		let unknown = b.binary(BinaryOp::LessThan, one, null).unwrap();
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		assert_eq!(eval(&mut ctx, holds).unwrap(), Value::Boolean(true));
		assert_eq!(eval(&mut ctx, unknown).unwrap(), Value::Null);
	}

	#[test]
	fn test_name_resolution_order() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let x = b.column("x").unwrap();
		let y = b.column("y").unwrap();
		let z = b.column("z").unwrap();
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		ctx.declare("x".to_string(), DomainId::INTEGER, Value::Int(1));
		ctx.bind_row(RowBinding {
			shape: Arc::new(RowShape::new([
				("x".to_string(), DomainId::INTEGER),
				("y".to_string(), DomainId::INTEGER),
			])),
			values: vec![Value::Int(7), Value::Int(2)],
			source: 0,
		});
		// the declared binding shadows the row field of the same name
		assert_eq!(eval(&mut ctx, x).unwrap(), Value::Int(1));
		assert_eq!(eval(&mut ctx, y).unwrap(), Value::Int(2));
		// unbound names fall back to their domain default
		assert_eq!(eval(&mut ctx, z).unwrap(), Value::Null);
	}

	#[test]
	fn test_field_access_and_unknown_field() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let one = b.literal(Value::Int(1)).unwrap();
		let two = b.literal(Value::Int(2)).unwrap();
		let row = b
			.row(vec![
				("a".to_string(), one),
				("b".to_string(), two),
			])
			.unwrap();
		let a = b.field(row, "a").unwrap();
		let missing = b.field(row, "zz").unwrap();
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		assert_eq!(eval(&mut ctx, a).unwrap(), Value::Int(1));
		let error = eval(&mut ctx, missing).unwrap_err();
		assert_eq!(error.code, "42703");
	}

	#[test]
	fn test_index_is_one_based_and_checked() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let ten = b.literal(Value::Int(10)).unwrap();
		let twenty = b.literal(Value::Int(20)).unwrap();
		let array = b.array(vec![ten, twenty]).unwrap();
		let one = b.literal(Value::Int(1)).unwrap();
		let three = b.literal(Value::Int(3)).unwrap();
		let first = b.binary(BinaryOp::Index, array, one).unwrap();
		let beyond = b.binary(BinaryOp::Index, array, three).unwrap();
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		assert_eq!(eval(&mut ctx, first).unwrap(), Value::Int(10));
		let error = eval(&mut ctx, beyond).unwrap_err();
		assert_eq!(error.code, "22003");
	}

	#[test]
	fn test_subquery_cardinality() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let empty = b.literal(Value::Null).unwrap();
		rows.table(empty, &[("v", DomainId::INTEGER)], vec![]);
		let single = b.literal(Value::Null).unwrap();
		rows.table(
			single,
			&[("v", DomainId::INTEGER)],
			vec![vec![Value::Int(7)]],
		);
		let wide = b.literal(Value::Null).unwrap();
		rows.table(
			wide,
			&[("v", DomainId::INTEGER)],
			vec![vec![Value::Int(1)], vec![Value::Int(2)]],
		);
		let none = b.subquery(empty).unwrap();
		let one = b.subquery(single).unwrap();
		let many = b.subquery(wide).unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		assert_eq!(eval(&mut ctx, none).unwrap(), Value::Null);
		assert_eq!(eval(&mut ctx, one).unwrap(), Value::Int(7));
		let error = eval(&mut ctx, many).unwrap_err();
		assert_eq!(error.code, "21000");
	}

	#[test]
	fn test_case_expression_forms() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let two = b.literal(Value::Int(2)).unwrap();
		let one = b.literal(Value::Int(1)).unwrap();
		let small = b.literal(Value::utf8("small")).unwrap();
		let big = b.literal(Value::utf8("big")).unwrap();
		// CASE 2 WHEN 1 THEN 'small' WHEN 2 THEN 'big' END
		let simple = b
			.case(Some(two), vec![(one, small), (two, big)], None)
			.unwrap();
		// CASE WHEN 1 = 2 THEN 'small' END has no match
		let test = b.binary(BinaryOp::Equal, one, two).unwrap();
		let missed = b.case(None, vec![(test, small)], None).unwrap();
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		assert_eq!(eval(&mut ctx, simple).unwrap(), Value::utf8("big"));
		assert_eq!(eval(&mut ctx, missed).unwrap(), Value::Null);
	}

	#[test]
	fn test_coalesce_and_nullif() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let null = b.literal(Value::Null).unwrap();
		let five = b.literal(Value::Int(5)).unwrap();
		let first = b.coalesce(vec![null, five]).unwrap();
		let nothing = b.coalesce(vec![null, null]).unwrap();
		let erased = b.nullif(five, five).unwrap();
		let kept = b.nullif(five, null).unwrap();
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		assert_eq!(eval(&mut ctx, first).unwrap(), Value::Int(5));
		assert_eq!(eval(&mut ctx, nothing).unwrap(), Value::Null);
		assert_eq!(eval(&mut ctx, erased).unwrap(), Value::Null);
		assert_eq!(eval(&mut ctx, kept).unwrap(), Value::Int(5));
	}

	#[test]
	fn test_cast_coerces_and_rejects() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let answer = b.literal(Value::Int(42)).unwrap();
		let text = b.cast(answer, DomainId::CHARACTER).unwrap();
		let word = b.literal(Value::utf8("twelve")).unwrap();
		let number = b.cast(word, DomainId::INTEGER).unwrap();
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		assert_eq!(eval(&mut ctx, text).unwrap(), Value::utf8("42"));
		let error = eval(&mut ctx, number).unwrap_err();
		assert_eq!(error.code, "22005");
	}

	#[test]
	fn test_call_yields_return_value() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let seven = b.literal(Value::Int(7)).unwrap();
		let body = b.return_stmt(Some(seven)).unwrap();
		let routine = b
			.routine("seven", vec![], Some(DomainId::INTEGER), body)
			.unwrap();
		let invocation = b.call(routine, vec![]).unwrap();
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		assert_eq!(eval(&mut ctx, invocation).unwrap(), Value::Int(7));
	}

	#[test]
	fn test_interrupted_call_parks_the_transfer() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let raise = b.signal("45000", vec![]).unwrap();
		let routine = b
			.routine("boom", vec![], Some(DomainId::INTEGER), raise)
			.unwrap();
		let invocation = b.call(routine, vec![]).unwrap();
		let one = b.literal(Value::Int(1)).unwrap();
		let sum = b.binary(BinaryOp::Add, invocation, one).unwrap();
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		// the value is a placeholder; the transfer carries the signal
		assert_eq!(eval(&mut ctx, sum).unwrap(), Value::Null);
		match ctx.take_transfer() {
			Some(Control::Signal(condition)) => {
				assert_eq!(condition.code(), "45000")
			}
			other => panic!("expected a signal, got {:?}", other),
		}
	}

	#[test]
	fn test_deep_expression_is_rejected() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let one = b.literal(Value::Int(1)).unwrap();
		let mut chain = one;
		for _ in 0..600 {
			chain = b.binary(BinaryOp::Add, chain, one).unwrap();
		}
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		let error = eval(&mut ctx, chain).unwrap_err();
		assert_eq!(error.code, "54001");
	}
}
