// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Function calls in expression position.
//!
//! CURRENT_* reads the context clock, plain scalars go straight to
//! [`emberdb_function::scalar`], aggregates run against the register
//! set in two phases and windowed calls are handed to the window
//! module. While the accumulating phase feeds the registers every
//! aggregate yields [`Value::Pending`]; reading the same node back
//! afterwards finalizes its register for the current group.

use emberdb_core::graph::{FunctionCall, FunctionKind};
use emberdb_core::{Node, NodeId, RowBatch};
use emberdb_function::Register;
use emberdb_function::scalar::apply;
use emberdb_type::error::diagnostic::internal;
use emberdb_type::{Error, Result, Value};

use super::{eval, matches, window};
use crate::context::{ActivationKind, ExecutionContext, RowBinding};
use crate::execute::is_true;

pub(crate) fn evaluate(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	call: &FunctionCall,
) -> Result<Value> {
	match call.kind {
		// the context clock keeps these stable across one run
		FunctionKind::CurrentDate => {
			return Ok(Value::date(ctx.now().date()));
		}
		FunctionKind::CurrentTime => {
			return Ok(Value::time(ctx.now().time()));
		}
		FunctionKind::CurrentTimestamp => {
			return Ok(Value::timestamp(ctx.now()));
		}
		_ => {}
	}
	if call.kind.requires_window() || call.window.is_some() {
		return window::evaluate(ctx, node, call);
	}
	if call.kind.is_aggregate() {
		return aggregate(ctx, node, call);
	}
	scalar(ctx, node, call)
}

fn scalar(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	call: &FunctionCall,
) -> Result<Value> {
	let Some(value) = call.value else {
		return Err(Error(internal::internal(format!(
			"{} has no operand",
			call.kind
		))));
	};
	let value = eval(ctx, value)?;
	let op1 = match call.op1 {
		Some(op1) => Some(eval(ctx, op1)?),
		None => None,
	};
	let op2 = match call.op2 {
		Some(op2) => Some(eval(ctx, op2)?),
		None => None,
	};
	apply(
		call.kind,
		call.modifier,
		&value,
		op1.as_ref(),
		op2.as_ref(),
		&node.fragment,
	)
}

fn aggregate(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	call: &FunctionCall,
) -> Result<Value> {
	if ctx.accumulating() {
		// a row feeds the register only when every FILTER holds
		for filter in &call.filter {
			let keep = eval(ctx, *filter)?;
			if !is_true(&keep) {
				return Ok(Value::Pending);
			}
		}
		let key = ctx.group().to_vec();
		match call.value {
			None => {
				ctx.registers_mut()
					.acquire(
						key,
						node.id,
						call.kind,
						call.distinct,
					)
					.add_row()?;
			}
			Some(value) => {
				let value = eval(ctx, value)?;
				ctx.registers_mut()
					.acquire(
						key,
						node.id,
						call.kind,
						call.distinct,
					)
					.add_in(&value, &node.fragment)?;
			}
		}
		return Ok(Value::Pending);
	}
	let key = ctx.group().to_vec();
	match ctx.registers_mut().get_mut(&key, node.id) {
		Some(register) => register.finalize(&node.fragment),
		// a group this register never saw keeps the empty identity
		None => Register::start(call.kind, call.distinct)
			.finalize(&node.fragment),
	}
}

/// Feed every row of `source` through the aggregates under `root`.
///
/// Group keys that spell the same expression are folded into one, so a
/// select item can repeat a grouping expression node for node. Returns
/// the distinct group keys in first-seen order; the caller then sets
/// each group on the context and evaluates `root` again to read the
/// finalized registers.
pub fn accumulate(
	ctx: &mut ExecutionContext<'_>,
	root: NodeId,
	source: NodeId,
	group_by: &[NodeId],
) -> Result<Vec<Vec<Value>>> {
	let mut keys: Vec<NodeId> = Vec::new();
	'candidates: for candidate in group_by {
		for key in &keys {
			if matches(ctx, *key, *candidate)? {
				ctx.add_matching(*key, *candidate);
				continue 'candidates;
			}
		}
		keys.push(*candidate);
	}
	let batch = ctx.rows().rows(source)?;
	ctx.registers_mut().clear();
	ctx.set_accumulating(true);
	let fed = feed(ctx, root, &keys, &batch);
	ctx.set_accumulating(false);
	fed?;
	Ok(ctx.registers_mut().groups())
}

fn feed(
	ctx: &mut ExecutionContext<'_>,
	root: NodeId,
	keys: &[NodeId],
	batch: &RowBatch,
) -> Result<()> {
	for (position, row) in batch.rows.iter().enumerate() {
		ctx.push_activation(ActivationKind::Block, None)?;
		ctx.bind_row(RowBinding {
			shape: batch.shape.clone(),
			values: row.clone(),
			source: position,
		});
		let fed = feed_row(ctx, root, keys);
		ctx.pop_activation();
		fed?;
	}
	Ok(())
}

fn feed_row(
	ctx: &mut ExecutionContext<'_>,
	root: NodeId,
	keys: &[NodeId],
) -> Result<()> {
	let mut group = Vec::with_capacity(keys.len());
	for key in keys {
		group.push(eval(ctx, *key)?);
	}
	ctx.set_group(group);
	eval(ctx, root)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::AtomicBool;

	use emberdb_core::graph::{BinaryOp, GraphBuilder};
	use emberdb_core::{NodeStore, NoopUndo, StandardDomains};
	use emberdb_testing::FixtureRows;
	use emberdb_type::DomainId;

	use super::*;
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
	fn test_current_family_reads_one_clock() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let stamp = b
			.function(FunctionCall::of(
				FunctionKind::CurrentTimestamp,
			))
			.unwrap();
		let date = b
			.function(FunctionCall::of(FunctionKind::CurrentDate))
			.unwrap();
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		let first = eval(&mut ctx, stamp).unwrap();
		let second = eval(&mut ctx, stamp).unwrap();
		assert_eq!(first, second);
		assert_eq!(first, Value::timestamp(ctx.now()));
		assert_eq!(
			eval(&mut ctx, date).unwrap(),
			Value::date(ctx.now().date())
		);
	}

	#[test]
	fn test_scalar_function_with_operands() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let seven = b.literal(Value::Int(7)).unwrap();
		let four = b.literal(Value::Int(4)).unwrap();
		let mut modulo = FunctionCall::of(FunctionKind::Mod);
		modulo.value = Some(seven);
		modulo.op1 = Some(four);
		let modulo = b.function(modulo).unwrap();
		let word = b.literal(Value::utf8("ember")).unwrap();
		let mut length = FunctionCall::of(FunctionKind::CharLength);
		length.value = Some(word);
		let length = b.function(length).unwrap();
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		assert_eq!(eval(&mut ctx, modulo).unwrap(), Value::Int(3));
		assert_eq!(eval(&mut ctx, length).unwrap(), Value::Int(5));
	}

	#[test]
	fn test_grouped_sum_read_back_per_group() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = b.literal(Value::Null).unwrap();
		rows.table(
			source,
			&[
				("k", DomainId::CHARACTER),
				("v", DomainId::INTEGER),
			],
			vec![
				vec![Value::utf8("a"), Value::Int(1)],
				vec![Value::utf8("a"), Value::Int(2)],
				vec![Value::utf8("b"), Value::Int(7)],
			],
		);
		let key = b.column("k").unwrap();
		let v = b.column("v").unwrap();
		let mut sum = FunctionCall::of(FunctionKind::Sum);
		sum.value = Some(v);
		let sum = b.function(sum).unwrap();
		let ten = b.literal(Value::Int(10)).unwrap();
		// an expression over the aggregate stays pending while feeding
		let root = b.binary(BinaryOp::Add, sum, ten).unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		let groups =
			accumulate(&mut ctx, root, source, &[key]).unwrap();
		assert_eq!(
			groups,
			vec![
				vec![Value::utf8("a")],
				vec![Value::utf8("b")],
			]
		);
		ctx.set_group(groups[0].clone());
		assert_eq!(eval(&mut ctx, root).unwrap(), Value::Int(13));
		ctx.set_group(groups[1].clone());
		assert_eq!(eval(&mut ctx, root).unwrap(), Value::Int(17));
	}

	#[test]
	fn test_count_star_with_filter() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = b.literal(Value::Null).unwrap();
		rows.table(
			source,
			&[("v", DomainId::INTEGER)],
			vec![
				vec![Value::Int(1)],
				vec![Value::Int(2)],
				vec![Value::Int(3)],
			],
		);
		let v = b.column("v").unwrap();
		let one = b.literal(Value::Int(1)).unwrap();
		let over_one =
			b.binary(BinaryOp::GreaterThan, v, one).unwrap();
		let mut count = FunctionCall::of(FunctionKind::Count);
		count.filter = vec![over_one];
		let count = b.function(count).unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		let groups =
			accumulate(&mut ctx, count, source, &[]).unwrap();
		assert_eq!(groups, vec![Vec::<Value>::new()]);
		ctx.set_group(groups[0].clone());
		assert_eq!(eval(&mut ctx, count).unwrap(), Value::Int(2));
	}

	#[test]
	fn test_distinct_folds_duplicates() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = b.literal(Value::Null).unwrap();
		rows.table(
			source,
			&[("v", DomainId::INTEGER)],
			vec![
				vec![Value::Int(1)],
				vec![Value::Int(1)],
				vec![Value::Int(2)],
			],
		);
		let v = b.column("v").unwrap();
		let mut sum = FunctionCall::of(FunctionKind::Sum);
		sum.value = Some(v);
		sum.distinct = true;
		let sum = b.function(sum).unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		let groups = accumulate(&mut ctx, sum, source, &[]).unwrap();
		ctx.set_group(groups[0].clone());
		assert_eq!(eval(&mut ctx, sum).unwrap(), Value::Int(3));
	}

	#[test]
	fn test_unseen_group_keeps_the_empty_identity() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let v = b.column("v").unwrap();
		let count = b
			.function(FunctionCall::of(FunctionKind::Count))
			.unwrap();
		let mut sum = FunctionCall::of(FunctionKind::Sum);
		sum.value = Some(v);
		let sum = b.function(sum).unwrap();
		let rows = FixtureRows::new();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		// nothing was ever accumulated for the current group
		assert_eq!(eval(&mut ctx, count).unwrap(), Value::Int(0));
		assert_eq!(eval(&mut ctx, sum).unwrap(), Value::Null);
	}

	#[test]
	fn test_equivalent_group_keys_fold() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = b.literal(Value::Null).unwrap();
		rows.table(
			source,
			&[("k", DomainId::CHARACTER)],
			vec![
				vec![Value::utf8("a")],
				vec![Value::utf8("b")],
			],
		);
		// the same spelling published twice
		let first = b.column("k").unwrap();
		let second = b.column("k").unwrap();
		let count = b
			.function(FunctionCall::of(FunctionKind::Count))
			.unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		let groups =
			accumulate(&mut ctx, count, source, &[first, second])
				.unwrap();
		assert_eq!(
			groups,
			vec![
				vec![Value::utf8("a")],
				vec![Value::utf8("b")],
			]
		);
		assert!(ctx.matched(first, second));
	}
}
