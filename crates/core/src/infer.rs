// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Static result-domain inference.
//!
//! The builder records the best domain it can prove for each node. Where
//! operand domains are dynamic, the inference stays at CONTENT and the
//! matching runtime operation settles the question, raising a data
//! exception if the operands turn out incompatible.

use emberdb_type::DomainKind;

use crate::graph::{BinaryOp, FunctionKind, UnaryOp};

/// The wider of two numeric kinds: INTEGER < NUMERIC < REAL.
fn promote(left: DomainKind, right: DomainKind) -> DomainKind {
	fn rank(kind: DomainKind) -> u8 {
		match kind {
			DomainKind::Integer => 0,
			DomainKind::Numeric => 1,
			DomainKind::Real => 2,
			_ => u8::MAX,
		}
	}
	if rank(left) >= rank(right) {
		left
	} else {
		right
	}
}

pub fn binary_kind(
	op: BinaryOp,
	left: DomainKind,
	right: DomainKind,
) -> DomainKind {
	use DomainKind::*;
	if op.is_comparison() || op.is_logical() {
		return Boolean;
	}
	if left == Content || right == Content {
		return Content;
	}
	match op {
		BinaryOp::Add | BinaryOp::Subtract => {
			if left.is_numeric() && right.is_numeric() {
				return promote(left, right);
			}
			match (op, left, right) {
				(_, Date, Interval) => Date,
				(BinaryOp::Add, Interval, Date) => Date,
				(_, Timestamp, Interval) => Timestamp,
				(BinaryOp::Add, Interval, Timestamp) => {
					Timestamp
				}
				(_, Time, Interval) => Time,
				(BinaryOp::Add, Interval, Time) => Time,
				(BinaryOp::Subtract, Date, Date)
				| (BinaryOp::Subtract, Timestamp, Timestamp)
				| (BinaryOp::Subtract, Time, Time) => Interval,
				(_, Interval, Interval) => Interval,
				_ => Content,
			}
		}
		BinaryOp::Multiply => {
			if left.is_numeric() && right.is_numeric() {
				promote(left, right)
			} else if (left == Interval && right == Integer)
				|| (left == Integer && right == Interval)
			{
				Interval
			} else {
				Content
			}
		}
		BinaryOp::Divide => {
			if left.is_numeric() && right.is_numeric() {
				promote(left, right)
			} else {
				Content
			}
		}
		BinaryOp::Concat => match (left, right) {
			(Character, Character) => Character,
			(Array, Array) => Array,
			_ => Content,
		},
		// the element domain, when known, is resolved by the builder
		BinaryOp::Index => Content,
		_ => Content,
	}
}

pub fn unary_kind(op: UnaryOp, operand: DomainKind) -> DomainKind {
	match op {
		UnaryOp::Not => DomainKind::Boolean,
		UnaryOp::Neg => {
			if operand.is_numeric()
				|| operand == DomainKind::Interval
			{
				operand
			} else {
				DomainKind::Content
			}
		}
	}
}

/// The result kind of a builtin function, given its main operand kind.
pub fn function_kind(kind: FunctionKind, operand: DomainKind) -> DomainKind {
	use FunctionKind::*;
	match kind {
		Count | RowNumber | Rank | CharLength | Position
		| Cardinality => DomainKind::Integer,
		Sum | Min | Max | Ceil | Floor | Abs | Mod => operand,
		Avg => match operand {
			DomainKind::Real => DomainKind::Real,
			DomainKind::Integer | DomainKind::Numeric => {
				DomainKind::Numeric
			}
			_ => DomainKind::Content,
		},
		// standard deviation is approximate by definition
		StdDevPop | StdDevSamp => DomainKind::Real,
		Every | Any => DomainKind::Boolean,
		Collect | Fusion | Intersection => DomainKind::Multiset,
		ArrayAgg => DomainKind::Array,
		Exp | Ln | Power | Sqrt => DomainKind::Real,
		Upper | Lower | Trim | Substring => DomainKind::Character,
		Extract => DomainKind::Integer,
		CurrentDate => DomainKind::Date,
		CurrentTime => DomainKind::Time,
		CurrentTimestamp => DomainKind::Timestamp,
	}
}
