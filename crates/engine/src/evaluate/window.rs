// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Windowed function calls.
//!
//! Every evaluation ranges the whole window source once: partition and
//! order keys are computed per row, the current row's partition is
//! sorted, and the frame folds the admitted rows into a fresh register.
//! A FILTER removes a row's value from the fold but never its place in
//! the frame geometry.

use emberdb_core::graph::{
	FrameBound, FunctionCall, FunctionKind, WindowSpec,
};
use emberdb_core::{Node, RowBatch};
use emberdb_function::{Frame, Partition, Register, ResolvedBound, WindowRow};
use emberdb_type::error::diagnostic::{internal, runtime};
use emberdb_type::{Error, Result, Value};

use super::eval;
use crate::context::{ActivationKind, ExecutionContext, RowBinding};
use crate::execute::is_true;

pub(crate) fn evaluate(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	call: &FunctionCall,
) -> Result<Value> {
	// a window met while another is being built stays pending
	if ctx.building_window() {
		return Ok(Value::Pending);
	}
	let Some(spec) = &call.window else {
		return Err(Error(runtime::invalid_argument(
			node.fragment.clone(),
			&call.kind.to_string(),
			"needs an OVER clause",
		)));
	};
	let Some(anchor) = ctx.current_row_source() else {
		return Err(Error(runtime::invalid_argument(
			node.fragment.clone(),
			"OVER",
			"no current row is bound",
		)));
	};
	let batch = ctx.rows().rows(spec.source)?;
	// frame distances are evaluated once, in the calling scope
	let low = resolve(ctx, spec.low)?;
	let high = resolve(ctx, spec.high)?;
	let descending: Vec<bool> =
		spec.order.iter().map(|item| item.desc).collect();
	ctx.set_building_window(true);
	let built = build(ctx, call, spec, &batch, anchor);
	ctx.set_building_window(false);
	let (rows, passes, anchor_key) = built?;
	if ctx.transfer_pending() {
		return Ok(Value::Null);
	}
	let Some(anchor_key) = anchor_key else {
		return Err(Error(internal::internal(format!(
			"row {} is outside the window source",
			anchor
		))));
	};
	let members = rows
		.into_iter()
		.filter(|(key, _)| *key == anchor_key)
		.map(|(_, row)| row)
		.collect();
	let partition = Partition::new(members, descending);
	let Some(bookmark) = partition.position_of(anchor) else {
		return Err(Error(internal::internal(format!(
			"row {} lost its partition position",
			anchor
		))));
	};
	match call.kind {
		FunctionKind::RowNumber => {
			return Ok(partition.row_number(bookmark));
		}
		FunctionKind::Rank => return Ok(partition.rank(bookmark)),
		_ => {}
	}
	let frame = Frame::new(spec.unit, low, high, spec.exclude);
	let mut register = Register::start(call.kind, call.distinct);
	for candidate in 0..partition.len() {
		if !frame.admits(
			&partition,
			bookmark,
			candidate,
			&node.fragment,
		)? {
			continue;
		}
		let Some(row) = partition.row(candidate) else {
			continue;
		};
		if !passes[row.source] {
			continue;
		}
		match call.value {
			None => register.add_row()?,
			Some(_) => {
				register.add_in(&row.value, &node.fragment)?
			}
		}
	}
	register.finalize(&node.fragment)
}

fn resolve(
	ctx: &mut ExecutionContext<'_>,
	bound: FrameBound,
) -> Result<ResolvedBound> {
	Ok(match bound {
		FrameBound::UnboundedPreceding => {
			ResolvedBound::UnboundedPreceding
		}
		FrameBound::Preceding(distance) => {
			ResolvedBound::Preceding(eval(ctx, distance)?)
		}
		FrameBound::CurrentRow => ResolvedBound::CurrentRow,
		FrameBound::Following(distance) => {
			ResolvedBound::Following(eval(ctx, distance)?)
		}
		FrameBound::UnboundedFollowing => {
			ResolvedBound::UnboundedFollowing
		}
	})
}

type BuiltRows = (Vec<(Vec<Value>, WindowRow)>, Vec<bool>, Option<Vec<Value>>);

fn build(
	ctx: &mut ExecutionContext<'_>,
	call: &FunctionCall,
	spec: &WindowSpec,
	batch: &RowBatch,
	anchor: usize,
) -> Result<BuiltRows> {
	let mut rows = Vec::with_capacity(batch.rows.len());
	let mut passes = Vec::with_capacity(batch.rows.len());
	let mut anchor_key = None;
	for (position, row) in batch.rows.iter().enumerate() {
		ctx.push_activation(ActivationKind::Block, None)?;
		ctx.bind_row(RowBinding {
			shape: batch.shape.clone(),
			values: row.clone(),
			source: position,
		});
		let built = build_row(ctx, call, spec, position);
		ctx.pop_activation();
		let (key, window_row, pass) = built?;
		if position == anchor {
			anchor_key = Some(key.clone());
		}
		rows.push((key, window_row));
		passes.push(pass);
	}
	Ok((rows, passes, anchor_key))
}

fn build_row(
	ctx: &mut ExecutionContext<'_>,
	call: &FunctionCall,
	spec: &WindowSpec,
	position: usize,
) -> Result<(Vec<Value>, WindowRow, bool)> {
	let mut partition_key = Vec::with_capacity(spec.partition.len());
	for key in &spec.partition {
		partition_key.push(eval(ctx, *key)?);
	}
	let mut order_key = Vec::with_capacity(spec.order.len());
	for item in &spec.order {
		order_key.push(eval(ctx, item.expr)?);
	}
	let value = match call.value {
		Some(value) => eval(ctx, value)?,
		None => Value::Null,
	};
	let mut pass = true;
	for filter in &call.filter {
		let keep = eval(ctx, *filter)?;
		if !is_true(&keep) {
			pass = false;
			break;
		}
	}
	Ok((
		partition_key,
		WindowRow {
			key: order_key,
			value,
			source: position,
		},
		pass,
	))
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::AtomicBool;

	use emberdb_core::graph::{
		BinaryOp, FrameExclude, FrameUnit, GraphBuilder, OrderItem,
	};
	use emberdb_core::{
		NodeId, NodeStore, NoopUndo, RowProvider, StandardDomains,
	};
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

	fn anchor_row(
		ctx: &mut ExecutionContext<'_>,
		rows: &FixtureRows,
		source: NodeId,
		position: usize,
	) {
		let batch = rows.rows(source).unwrap();
		ctx.bind_row(RowBinding {
			shape: batch.shape.clone(),
			values: batch.rows[position].clone(),
			source: position,
		});
	}

	#[test]
	fn test_row_number_and_rank_honor_peers() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = b.literal(Value::Null).unwrap();
		rows.table(
			source,
			&[("v", DomainId::INTEGER)],
			vec![
				vec![Value::Int(10)],
				vec![Value::Int(20)],
				vec![Value::Int(20)],
				vec![Value::Int(30)],
			],
		);
		let v = b.column("v").unwrap();
		let mut spec = WindowSpec::over(source);
		spec.order = vec![OrderItem {
			expr: v,
			desc: false,
		}];
		let mut numbered =
			FunctionCall::of(FunctionKind::RowNumber);
		numbered.window = Some(Box::new(spec.clone()));
		let numbered = b.function(numbered).unwrap();
		let mut ranked = FunctionCall::of(FunctionKind::Rank);
		ranked.window = Some(Box::new(spec));
		let ranked = b.function(ranked).unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		anchor_row(&mut ctx, &rows, source, 0);
		assert_eq!(eval(&mut ctx, numbered).unwrap(), Value::Int(1));
		assert_eq!(eval(&mut ctx, ranked).unwrap(), Value::Int(1));
		// the second 20 is row three but stays in the rank-two peer group
		anchor_row(&mut ctx, &rows, source, 2);
		assert_eq!(eval(&mut ctx, numbered).unwrap(), Value::Int(3));
		assert_eq!(eval(&mut ctx, ranked).unwrap(), Value::Int(2));
	}

	#[test]
	fn test_running_sum_includes_peers() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = b.literal(Value::Null).unwrap();
		rows.table(
			source,
			&[("v", DomainId::INTEGER)],
			vec![
				vec![Value::Int(10)],
				vec![Value::Int(20)],
				vec![Value::Int(20)],
				vec![Value::Int(30)],
			],
		);
		let v = b.column("v").unwrap();
		let mut spec = WindowSpec::over(source);
		spec.order = vec![OrderItem {
			expr: v,
			desc: false,
		}];
		let mut sum = FunctionCall::of(FunctionKind::Sum);
		sum.value = Some(v);
		sum.window = Some(Box::new(spec));
		let sum = b.function(sum).unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		// RANGE up to the current row takes the whole peer group
		anchor_row(&mut ctx, &rows, source, 1);
		assert_eq!(eval(&mut ctx, sum).unwrap(), Value::Int(50));
		anchor_row(&mut ctx, &rows, source, 3);
		assert_eq!(eval(&mut ctx, sum).unwrap(), Value::Int(80));
	}

	#[test]
	fn test_rows_frame_with_offsets() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = b.literal(Value::Null).unwrap();
		rows.table(
			source,
			&[("v", DomainId::INTEGER)],
			vec![
				vec![Value::Int(10)],
				vec![Value::Int(20)],
				vec![Value::Int(30)],
			],
		);
		let v = b.column("v").unwrap();
		let one = b.literal(Value::Int(1)).unwrap();
		let mut spec = WindowSpec::over(source);
		spec.order = vec![OrderItem {
			expr: v,
			desc: false,
		}];
		spec.unit = FrameUnit::Rows;
		spec.low = FrameBound::Preceding(one);
		spec.high = FrameBound::Following(one);
		let mut sum = FunctionCall::of(FunctionKind::Sum);
		sum.value = Some(v);
		sum.window = Some(Box::new(spec));
		let sum = b.function(sum).unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		anchor_row(&mut ctx, &rows, source, 1);
		assert_eq!(eval(&mut ctx, sum).unwrap(), Value::Int(60));
		anchor_row(&mut ctx, &rows, source, 0);
		assert_eq!(eval(&mut ctx, sum).unwrap(), Value::Int(30));
	}

	#[test]
	fn test_partitions_are_independent() {
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
				vec![Value::utf8("b"), Value::Int(10)],
				vec![Value::utf8("a"), Value::Int(2)],
				vec![Value::utf8("b"), Value::Int(20)],
			],
		);
		let k = b.column("k").unwrap();
		let v = b.column("v").unwrap();
		let mut spec = WindowSpec::over(source);
		spec.partition = vec![k];
		let mut sum = FunctionCall::of(FunctionKind::Sum);
		sum.value = Some(v);
		sum.window = Some(Box::new(spec));
		let sum = b.function(sum).unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		// without order keys every partition row is a peer
		anchor_row(&mut ctx, &rows, source, 0);
		assert_eq!(eval(&mut ctx, sum).unwrap(), Value::Int(3));
		anchor_row(&mut ctx, &rows, source, 1);
		assert_eq!(eval(&mut ctx, sum).unwrap(), Value::Int(30));
	}

	#[test]
	fn test_filter_keeps_frame_geometry() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = b.literal(Value::Null).unwrap();
		rows.table(
			source,
			&[("v", DomainId::INTEGER)],
			vec![
				vec![Value::Int(10)],
				vec![Value::Int(20)],
				vec![Value::Int(30)],
			],
		);
		let v = b.column("v").unwrap();
		let twenty = b.literal(Value::Int(20)).unwrap();
		let keep = b.binary(BinaryOp::NotEqual, v, twenty).unwrap();
		let one = b.literal(Value::Int(1)).unwrap();
		let mut spec = WindowSpec::over(source);
		spec.order = vec![OrderItem {
			expr: v,
			desc: false,
		}];
		spec.unit = FrameUnit::Rows;
		spec.low = FrameBound::Preceding(one);
		spec.high = FrameBound::Following(one);
		let mut sum = FunctionCall::of(FunctionKind::Sum);
		sum.value = Some(v);
		sum.filter = vec![keep];
		sum.window = Some(Box::new(spec));
		let sum = b.function(sum).unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		// the filtered row is dropped from the fold, not the frame
		anchor_row(&mut ctx, &rows, source, 1);
		assert_eq!(eval(&mut ctx, sum).unwrap(), Value::Int(40));
	}

	#[test]
	fn test_exclude_current_row() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = b.literal(Value::Null).unwrap();
		rows.table(
			source,
			&[("v", DomainId::INTEGER)],
			vec![
				vec![Value::Int(10)],
				vec![Value::Int(20)],
				vec![Value::Int(30)],
			],
		);
		let v = b.column("v").unwrap();
		let mut spec = WindowSpec::over(source);
		spec.order = vec![OrderItem {
			expr: v,
			desc: false,
		}];
		spec.exclude = FrameExclude::CurrentRow;
		let mut sum = FunctionCall::of(FunctionKind::Sum);
		sum.value = Some(v);
		sum.window = Some(Box::new(spec));
		let sum = b.function(sum).unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		anchor_row(&mut ctx, &rows, source, 1);
		assert_eq!(eval(&mut ctx, sum).unwrap(), Value::Int(10));
	}

	#[test]
	fn test_window_needs_a_current_row() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = b.literal(Value::Null).unwrap();
		rows.table(source, &[("v", DomainId::INTEGER)], vec![]);
		let spec = WindowSpec::over(source);
		let mut numbered =
			FunctionCall::of(FunctionKind::RowNumber);
		numbered.window = Some(Box::new(spec));
		let numbered = b.function(numbered).unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		let error = eval(&mut ctx, numbered).unwrap_err();
		assert_eq!(error.code, "22023");
	}
}
