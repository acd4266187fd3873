// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! OPEN, CLOSE, FETCH and single-row SELECT INTO. A fetch that moves
//! past the available rows raises the class 02 completion condition,
//! which NOT FOUND handlers catch; the cursor keeps its position.

use emberdb_core::graph::FetchHow;
use emberdb_core::{Node, NodeId};
use emberdb_type::error::diagnostic::{cast, cursor as cursor_diag};
use emberdb_type::{DomainKind, Error, Result, Value};

use super::{
	Control, Evaluated, assign_to, eval_for_statement, eval_or_transfer,
};
use crate::context::{ActivationKind, ExecutionContext, RowBinding};

pub(crate) fn run_open(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	name: &str,
) -> Result<Control> {
	let source = match ctx.find_cursor(name) {
		Some(cursor) if cursor.is_open() => {
			return Err(Error(cursor_diag::already_open(
				node.fragment.clone(),
				name,
			)));
		}
		Some(cursor) => cursor.source,
		None => {
			return Err(Error(cursor_diag::undeclared(
				node.fragment.clone(),
				name,
			)));
		}
	};
	let batch = ctx.rows().rows(source)?;
	if let Some(cursor) = ctx.find_cursor(name) {
		cursor.open(batch);
	}
	Ok(Control::Normal)
}

pub(crate) fn run_close(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	name: &str,
) -> Result<Control> {
	let Some(cursor) = ctx.find_cursor(name) else {
		return Err(Error(cursor_diag::undeclared(
			node.fragment.clone(),
			name,
		)));
	};
	if !cursor.close() {
		return Err(Error(cursor_diag::not_open(
			node.fragment.clone(),
			name,
		)));
	}
	Ok(Control::Normal)
}

pub(crate) fn run_fetch(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	name: &str,
	how: FetchHow,
	position: Option<NodeId>,
	targets: &[NodeId],
) -> Result<Control> {
	let offset = match position {
		Some(position) => {
			let value = eval_or_transfer!(ctx, position);
			match value {
				Value::Int(offset) => Some(offset),
				other => {
					return Err(Error(
						cast::cannot_coerce(
							node.fragment
								.clone(),
							DomainKind::Integer,
							&other,
						),
					));
				}
			}
		}
		None => None,
	};
	let values = {
		let Some(cursor) = ctx.find_cursor(name) else {
			return Err(Error(cursor_diag::undeclared(
				node.fragment.clone(),
				name,
			)));
		};
		let width = match cursor.shape() {
			Some(shape) => shape.len(),
			None => {
				return Err(Error(cursor_diag::not_open(
					node.fragment.clone(),
					name,
				)));
			}
		};
		if targets.len() != width {
			return Err(Error(
				cursor_diag::fetch_arity_mismatch(
					node.fragment.clone(),
					targets.len(),
					width,
				),
			));
		}
		match cursor.seek(how, offset) {
			Some(values) => values,
			None => {
				return Err(Error(cursor_diag::no_data(
					node.fragment.clone(),
				)));
			}
		}
	};
	for (target, value) in targets.iter().zip(values) {
		assign_to(ctx, *target, value)?;
	}
	ctx.diagnostics_mut().set_row_count(1);
	Ok(Control::Normal)
}

pub(crate) fn run_select_single(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	source: NodeId,
	columns: &[NodeId],
	targets: &[NodeId],
) -> Result<Control> {
	let batch = ctx.rows().rows(source)?;
	let Some(row) = batch.row(0).map(<[Value]>::to_vec) else {
		return Err(Error(cursor_diag::no_data(
			node.fragment.clone(),
		)));
	};
	let values = if columns.is_empty() {
		row
	} else {
		// run the projection with the row's fields in scope
		ctx.push_activation(ActivationKind::Block, None)?;
		ctx.bind_row(RowBinding {
			shape: batch.shape.clone(),
			values: row,
			source: 0,
		});
		let mut out = Vec::with_capacity(columns.len());
		let mut left_early = None;
		for column in columns {
			match eval_for_statement(ctx, *column) {
				Ok(Evaluated::Value(value)) => {
					out.push(value)
				}
				Ok(Evaluated::Interrupted(control)) => {
					left_early = Some(Ok(control));
					break;
				}
				Err(error) => {
					left_early = Some(Err(error));
					break;
				}
			}
		}
		ctx.pop_activation();
		if let Some(outcome) = left_early {
			return outcome;
		}
		out
	};
	if values.len() != targets.len() {
		return Err(Error(cursor_diag::fetch_arity_mismatch(
			node.fragment.clone(),
			targets.len(),
			values.len(),
		)));
	}
	for (target, value) in targets.iter().zip(values) {
		assign_to(ctx, *target, value)?;
	}
	ctx.diagnostics_mut().set_row_count(1);
	Ok(Control::Normal)
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
	use crate::execute::obey;
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

	fn expect_signal(outcome: Result<Control>, code: &str) {
		match outcome.unwrap() {
			Control::Signal(condition) => {
				assert_eq!(condition.code(), code)
			}
			other => panic!("expected signal, got {:?}", other),
		}
	}

	fn number_source(
		b: &GraphBuilder<'_>,
		rows: &FixtureRows,
		numbers: &[i64],
	) -> NodeId {
		let source = b.literal(Value::Null).unwrap();
		rows.table(
			source,
			&[("v", DomainId::INTEGER)],
			numbers.iter()
				.map(|n| vec![Value::Int(*n)])
				.collect(),
		);
		source
	}

	#[test]
	fn test_open_fetch_close_walks_rows() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = number_source(&b, &rows, &[10, 20]);
		let open = b.open_cursor("c").unwrap();
		let target = b.column("x").unwrap();
		let fetch = b
			.fetch("c", FetchHow::Next, None, vec![target])
			.unwrap();
		let close = b.close_cursor("c").unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		ctx.declare("x".to_string(), DomainId::INTEGER, Value::Null);
		ctx.declare_cursor("c".to_string(), source);
		assert_eq!(obey(&mut ctx, open).unwrap(), Control::Normal);
		assert_eq!(obey(&mut ctx, fetch).unwrap(), Control::Normal);
		assert_eq!(ctx.read("x"), Some(Value::Int(10)));
		assert_eq!(obey(&mut ctx, fetch).unwrap(), Control::Normal);
		assert_eq!(ctx.read("x"), Some(Value::Int(20)));
		assert_eq!(obey(&mut ctx, close).unwrap(), Control::Normal);
	}

	#[test]
	fn test_fetch_past_the_end_is_not_found() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = number_source(&b, &rows, &[10]);
		let open = b.open_cursor("c").unwrap();
		let target = b.column("x").unwrap();
		let fetch = b
			.fetch("c", FetchHow::Next, None, vec![target])
			.unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		ctx.declare("x".to_string(), DomainId::INTEGER, Value::Null);
		ctx.declare_cursor("c".to_string(), source);
		obey(&mut ctx, open).unwrap();
		assert_eq!(obey(&mut ctx, fetch).unwrap(), Control::Normal);
		expect_signal(obey(&mut ctx, fetch), "02000");
		// the failed move does not lose the position
		assert_eq!(
			ctx.find_cursor("c").unwrap().position(),
			Some(0)
		);
	}

	#[test]
	fn test_fetch_absolute_is_one_based() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = number_source(&b, &rows, &[10, 20, 30]);
		let open = b.open_cursor("c").unwrap();
		let position = b.literal(Value::Int(3)).unwrap();
		let target = b.column("x").unwrap();
		let fetch = b
			.fetch(
				"c",
				FetchHow::Absolute,
				Some(position),
				vec![target],
			)
			.unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		ctx.declare("x".to_string(), DomainId::INTEGER, Value::Null);
		ctx.declare_cursor("c".to_string(), source);
		obey(&mut ctx, open).unwrap();
		assert_eq!(obey(&mut ctx, fetch).unwrap(), Control::Normal);
		assert_eq!(ctx.read("x"), Some(Value::Int(30)));
	}

	#[test]
	fn test_fetch_arity_mismatch_is_22005() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = b.literal(Value::Null).unwrap();
		rows.table(
			source,
			&[
				("v", DomainId::INTEGER),
				("w", DomainId::INTEGER),
			],
			vec![vec![Value::Int(1), Value::Int(2)]],
		);
		let open = b.open_cursor("c").unwrap();
		let target = b.column("x").unwrap();
		let fetch = b
			.fetch("c", FetchHow::Next, None, vec![target])
			.unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		ctx.declare("x".to_string(), DomainId::INTEGER, Value::Null);
		ctx.declare_cursor("c".to_string(), source);
		obey(&mut ctx, open).unwrap();
		expect_signal(obey(&mut ctx, fetch), "22005");
	}

	#[test]
	fn test_cursor_state_violations_are_24000() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = number_source(&b, &rows, &[1]);
		let open = b.open_cursor("c").unwrap();
		let close = b.close_cursor("c").unwrap();
		let missing = b.open_cursor("ghost").unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		ctx.declare_cursor("c".to_string(), source);
		expect_signal(obey(&mut ctx, close), "24000");
		obey(&mut ctx, open).unwrap();
		expect_signal(obey(&mut ctx, open), "24000");
		expect_signal(obey(&mut ctx, missing), "24000");
	}

	#[test]
	fn test_select_single_projects_into_targets() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = number_source(&b, &rows, &[7]);
		let v = b.column("v").unwrap();
		let one = b.literal(Value::Int(1)).unwrap();
		let more = b.binary(BinaryOp::Add, v, one).unwrap();
		let target = b.column("x").unwrap();
		let select = b
			.select_single(source, vec![more], vec![target])
			.unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		ctx.declare("x".to_string(), DomainId::INTEGER, Value::Null);
		assert_eq!(obey(&mut ctx, select).unwrap(), Control::Normal);
		assert_eq!(ctx.read("x"), Some(Value::Int(8)));
		assert_eq!(
			ctx.diagnostics().get(
				emberdb_type::DiagnosticsItem::RowCount
			),
			Value::Int(1)
		);
	}

	#[test]
	fn test_select_single_without_columns_takes_the_row() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = b.literal(Value::Null).unwrap();
		rows.table(
			source,
			&[
				("v", DomainId::INTEGER),
				("w", DomainId::INTEGER),
			],
			vec![vec![Value::Int(1), Value::Int(2)]],
		);
		let ta = b.column("a").unwrap();
		let tb = b.column("b").unwrap();
		let select = b
			.select_single(source, vec![], vec![ta, tb])
			.unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		ctx.declare("a".to_string(), DomainId::INTEGER, Value::Null);
		ctx.declare("b".to_string(), DomainId::INTEGER, Value::Null);
		assert_eq!(obey(&mut ctx, select).unwrap(), Control::Normal);
		assert_eq!(ctx.read("a"), Some(Value::Int(1)));
		assert_eq!(ctx.read("b"), Some(Value::Int(2)));
	}

	#[test]
	fn test_select_single_from_empty_source_is_not_found() {
		let store = NodeStore::new();
		let domains = StandardDomains::new();
		let b = GraphBuilder::new(&store, &domains);
		let rows = FixtureRows::new();
		let source = number_source(&b, &rows, &[]);
		let target = b.column("x").unwrap();
		let select = b
			.select_single(source, vec![], vec![target])
			.unwrap();
		let undo = NoopUndo::new();
		let mut ctx = context(&store, &domains, &rows, &undo);
		ctx.declare("x".to_string(), DomainId::INTEGER, Value::Null);
		expect_signal(obey(&mut ctx, select), "02000");
	}
}
