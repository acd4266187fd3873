// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! The SQL predicate forms: BETWEEN, LIKE, IN, MEMBER OF, quantified
//! comparison and the period relations.
//!
//! Each predicate evaluates its operands eagerly, lets a pending
//! sentinel through first, and only then applies three-valued logic.
//! `Option<bool>` carries the truth value internally, `None` being
//! unknown.

use std::cmp::Ordering;

use emberdb_core::graph::{BinaryOp, PeriodOp};
use emberdb_core::{Node, NodeId};
use emberdb_type::error::diagnostic::{arithmetic, cast, runtime};
use emberdb_type::{
	DomainKind, Error, Fragment, Result, RowShape, RowValue, Value,
	domain::arith,
};

use super::{comparison_holds, eval};
use crate::context::ExecutionContext;

/// NULL in, NULL out; otherwise negation applies to the settled truth.
fn finish(holds: Option<bool>, negated: bool) -> Value {
	match holds {
		Some(holds) => Value::Boolean(holds != negated),
		None => Value::Null,
	}
}

fn and3(left: Option<bool>, right: Option<bool>) -> Option<bool> {
	match (left, right) {
		(Some(false), _) | (_, Some(false)) => Some(false),
		(Some(true), Some(true)) => Some(true),
		_ => None,
	}
}

fn lt(left: &Value, right: &Value, fragment: &Fragment) -> Result<Option<bool>> {
	Ok(arith::compare(left, right, fragment)?
		.map(|ordering| ordering == Ordering::Less))
}

fn le(left: &Value, right: &Value, fragment: &Fragment) -> Result<Option<bool>> {
	Ok(arith::compare(left, right, fragment)?
		.map(|ordering| ordering != Ordering::Greater))
}

fn eq(left: &Value, right: &Value, fragment: &Fragment) -> Result<Option<bool>> {
	Ok(arith::compare(left, right, fragment)?
		.map(|ordering| ordering == Ordering::Equal))
}

fn holds(
	op: BinaryOp,
	left: &Value,
	right: &Value,
	fragment: &Fragment,
) -> Result<Option<bool>> {
	Ok(arith::compare(left, right, fragment)?
		.map(|ordering| comparison_holds(op, ordering)))
}

/// A subquery row as a comparable value: its only column, or the whole
/// row when it is wider than one column.
fn row_scalar(shape: &RowShape, row: &[Value]) -> Value {
	if let [only] = row {
		return only.clone();
	}
	Value::row(RowValue::new(
		shape.iter()
			.map(|(name, _)| name.to_string())
			.zip(row.iter().cloned())
			.collect::<Vec<_>>(),
	))
}

pub(crate) fn between(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	value: NodeId,
	low: NodeId,
	high: NodeId,
	negated: bool,
) -> Result<Value> {
	let value = eval(ctx, value)?;
	let low = eval(ctx, low)?;
	let high = eval(ctx, high)?;
	if value.is_pending() || low.is_pending() || high.is_pending() {
		return Ok(Value::Pending);
	}
	let fragment = &node.fragment;
	let above = le(&low, &value, fragment)?;
	let below = le(&value, &high, fragment)?;
	Ok(finish(and3(above, below), negated))
}

pub(crate) fn in_list(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	value: NodeId,
	list: &[NodeId],
	negated: bool,
) -> Result<Value> {
	let probe = eval(ctx, value)?;
	if probe.is_pending() {
		return Ok(Value::Pending);
	}
	let mut unknown = false;
	for element in list {
		let candidate = eval(ctx, *element)?;
		if candidate.is_pending() {
			return Ok(Value::Pending);
		}
		match arith::compare(&probe, &candidate, &node.fragment)? {
			Some(Ordering::Equal) => {
				return Ok(Value::Boolean(!negated));
			}
			Some(_) => {}
			None => unknown = true,
		}
	}
	if unknown {
		return Ok(Value::Null);
	}
	Ok(Value::Boolean(negated))
}

pub(crate) fn in_subquery(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	value: NodeId,
	source: NodeId,
	negated: bool,
) -> Result<Value> {
	let probe = eval(ctx, value)?;
	if probe.is_pending() {
		return Ok(Value::Pending);
	}
	let batch = ctx.rows().rows(source)?;
	let mut unknown = false;
	for row in &batch.rows {
		let candidate = row_scalar(&batch.shape, row);
		match arith::compare(&probe, &candidate, &node.fragment)? {
			Some(Ordering::Equal) => {
				return Ok(Value::Boolean(!negated));
			}
			Some(_) => {}
			None => unknown = true,
		}
	}
	if unknown {
		return Ok(Value::Null);
	}
	Ok(Value::Boolean(negated))
}

pub(crate) fn member(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	value: NodeId,
	collection: NodeId,
	negated: bool,
) -> Result<Value> {
	let probe = eval(ctx, value)?;
	let collection = eval(ctx, collection)?;
	if probe.is_pending() || collection.is_pending() {
		return Ok(Value::Pending);
	}
	if probe.is_null() || collection.is_null() {
		return Ok(Value::Null);
	}
	let Value::Multiset(set) = &collection else {
		return Err(Error(arithmetic::unsupported_operands(
			node.fragment.clone(),
			"MEMBER OF",
			probe.kind(),
			collection.kind(),
		)));
	};
	if set.contains(&probe) {
		return Ok(Value::Boolean(!negated));
	}
	// a null element leaves membership unknown
	if set.contains(&Value::Null) {
		return Ok(Value::Null);
	}
	Ok(Value::Boolean(negated))
}

pub(crate) fn quantified(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	op: BinaryOp,
	value: NodeId,
	all: bool,
	source: NodeId,
) -> Result<Value> {
	let probe = eval(ctx, value)?;
	if probe.is_pending() {
		return Ok(Value::Pending);
	}
	let batch = ctx.rows().rows(source)?;
	let mut unknown = false;
	for row in &batch.rows {
		let candidate = row_scalar(&batch.shape, row);
		match holds(op, &probe, &candidate, &node.fragment)? {
			// one counterexample settles ALL, one witness ANY
			Some(settled) if settled != all => {
				return Ok(Value::Boolean(!all));
			}
			Some(_) => {}
			None => unknown = true,
		}
	}
	if unknown {
		return Ok(Value::Null);
	}
	// over the empty set ALL holds and ANY does not
	Ok(Value::Boolean(all))
}

// --- LIKE ---

enum Token {
	Percent,
	Underscore,
	Literal(char),
}

fn tokenize(
	pattern: &str,
	escape: Option<char>,
	fragment: &Fragment,
) -> Result<Vec<Token>> {
	let mut tokens = Vec::new();
	let mut chars = pattern.chars();
	while let Some(c) = chars.next() {
		if Some(c) == escape {
			// only a wildcard or the escape itself may follow
			match chars.next() {
				Some(next)
					if next == '%'
						|| next == '_' || Some(next)
						== escape =>
				{
					tokens.push(Token::Literal(next));
				}
				_ => {
					return Err(Error(
						runtime::invalid_escape_sequence(
							fragment.clone(),
						),
					));
				}
			}
		} else if c == '%' {
			tokens.push(Token::Percent);
		} else if c == '_' {
			tokens.push(Token::Underscore);
		} else {
			tokens.push(Token::Literal(c));
		}
	}
	Ok(tokens)
}

fn matches_pattern(tokens: &[Token], subject: &[char]) -> bool {
	let Some((token, rest)) = tokens.split_first() else {
		return subject.is_empty();
	};
	match token {
		Token::Percent => (0..=subject.len())
			.any(|skip| matches_pattern(rest, &subject[skip..])),
		Token::Underscore => match subject.split_first() {
			Some((_, tail)) => matches_pattern(rest, tail),
			None => false,
		},
		Token::Literal(expected) => match subject.split_first() {
			Some((c, tail)) => {
				c == expected && matches_pattern(rest, tail)
			}
			None => false,
		},
	}
}

fn text<'v>(value: &'v Value, fragment: &Fragment) -> Result<&'v str> {
	match value {
		Value::Utf8(text) => Ok(text),
		other => Err(Error(cast::cannot_coerce(
			fragment.clone(),
			DomainKind::Character,
			other,
		))),
	}
}

pub(crate) fn like(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	value: NodeId,
	pattern: NodeId,
	escape: Option<NodeId>,
	negated: bool,
) -> Result<Value> {
	let value = eval(ctx, value)?;
	let pattern = eval(ctx, pattern)?;
	let escape = match escape {
		Some(escape) => Some(eval(ctx, escape)?),
		None => None,
	};
	if value.is_pending()
		|| pattern.is_pending()
		|| matches!(&escape, Some(escape) if escape.is_pending())
	{
		return Ok(Value::Pending);
	}
	if value.is_null()
		|| pattern.is_null()
		|| matches!(&escape, Some(escape) if escape.is_null())
	{
		return Ok(Value::Null);
	}
	let fragment = &node.fragment;
	let escape = match &escape {
		Some(escape) => {
			let escape = text(escape, fragment)?;
			let mut chars = escape.chars();
			match (chars.next(), chars.next()) {
				(Some(c), None) => Some(c),
				_ => {
					return Err(Error(
						runtime::invalid_escape_character(
							fragment.clone(),
							escape,
						),
					));
				}
			}
		}
		None => None,
	};
	let subject: Vec<char> = text(&value, fragment)?.chars().collect();
	let tokens = tokenize(text(&pattern, fragment)?, escape, fragment)?;
	Ok(Value::Boolean(matches_pattern(&tokens, &subject) != negated))
}

// --- periods ---

/// A period is a two-field row holding its start and its end. The end
/// is exclusive.
fn as_period(value: &Value) -> Option<(&Value, &Value)> {
	match value {
		Value::Row(row) if row.len() == 2 => {
			Some((row.get_at(0)?, row.get_at(1)?))
		}
		_ => None,
	}
}

fn unsupported(
	op: PeriodOp,
	left: &Value,
	right: &Value,
	fragment: &Fragment,
) -> Error {
	Error(arithmetic::unsupported_operands(
		fragment.clone(),
		&op.to_string(),
		left.kind(),
		right.kind(),
	))
}

pub(crate) fn period(
	ctx: &mut ExecutionContext<'_>,
	node: &Node,
	op: PeriodOp,
	left: NodeId,
	right: NodeId,
) -> Result<Value> {
	let left = eval(ctx, left)?;
	let right = eval(ctx, right)?;
	if left.is_pending() || right.is_pending() {
		return Ok(Value::Pending);
	}
	if left.is_null() || right.is_null() {
		return Ok(Value::Null);
	}
	let fragment = &node.fragment;
	let Some((a_start, a_end)) = as_period(&left) else {
		return Err(unsupported(op, &left, &right, fragment));
	};
	let holds = match (op, as_period(&right)) {
		(PeriodOp::Overlaps, Some((b_start, b_end))) => and3(
			lt(a_start, b_end, fragment)?,
			lt(b_start, a_end, fragment)?,
		),
		(PeriodOp::Contains, Some((b_start, b_end))) => and3(
			le(a_start, b_start, fragment)?,
			le(b_end, a_end, fragment)?,
		),
		// CONTAINS also takes a point on the right
		(PeriodOp::Contains, None) => and3(
			le(a_start, &right, fragment)?,
			lt(&right, a_end, fragment)?,
		),
		(PeriodOp::Equals, Some((b_start, b_end))) => and3(
			eq(a_start, b_start, fragment)?,
			eq(a_end, b_end, fragment)?,
		),
		(PeriodOp::Precedes, Some((b_start, _))) => {
			le(a_end, b_start, fragment)?
		}
		(PeriodOp::Succeeds, Some((_, b_end))) => {
			le(b_end, a_start, fragment)?
		}
		(PeriodOp::ImmediatelyPrecedes, Some((b_start, _))) => {
			eq(a_end, b_start, fragment)?
		}
		(PeriodOp::ImmediatelySucceeds, Some((_, b_end))) => {
			eq(a_start, b_end, fragment)?
		}
		_ => return Err(unsupported(op, &left, &right, fragment)),
	};
	Ok(finish(holds, false))
}
