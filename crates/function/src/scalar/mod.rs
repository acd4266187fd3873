// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Scalar builtins.
//!
//! [`apply`] evaluates one scalar function over already-evaluated
//! operands. All scalar builtins are strict: a NULL operand makes the
//! result NULL, and an operand still accumulating inside an aggregate
//! keeps the result pending.

pub mod math;
pub mod temporal;
pub mod text;

use emberdb_core::graph::{FunctionKind, FunctionModifier};
use emberdb_type::error::diagnostic::{arithmetic, internal, runtime};
use emberdb_type::{Error, Fragment, Result, Value, domain::arith};

pub fn apply(
	kind: FunctionKind,
	modifier: Option<FunctionModifier>,
	value: &Value,
	op1: Option<&Value>,
	op2: Option<&Value>,
	fragment: &Fragment,
) -> Result<Value> {
	let operands = [Some(value), op1, op2];
	if operands.iter().flatten().any(|v| matches!(v, Value::Pending))
	{
		return Ok(Value::Pending);
	}
	if operands.iter().flatten().any(|v| v.is_null()) {
		return Ok(Value::Null);
	}
	match kind {
		FunctionKind::Abs => arith::abs(value, fragment),
		FunctionKind::Mod => {
			let divisor = required(op1, "MOD", fragment)?;
			arith::modulo(value, divisor, fragment)
		}
		FunctionKind::Ceil => math::ceil(value, fragment),
		FunctionKind::Floor => math::floor(value, fragment),
		FunctionKind::Exp => math::exp(value, fragment),
		FunctionKind::Ln => math::ln(value, fragment),
		FunctionKind::Power => {
			let exponent = required(op1, "POWER", fragment)?;
			math::power(value, exponent, fragment)
		}
		FunctionKind::Sqrt => math::sqrt(value, fragment),
		FunctionKind::CharLength => {
			text::char_length(value, fragment)
		}
		FunctionKind::Upper => text::upper(value, fragment),
		FunctionKind::Lower => text::lower(value, fragment),
		FunctionKind::Trim => {
			text::trim(modifier, value, op1, fragment)
		}
		FunctionKind::Substring => {
			let start = required(op1, "SUBSTRING", fragment)?;
			text::substring(value, start, op2, fragment)
		}
		FunctionKind::Position => {
			let haystack = required(op1, "POSITION", fragment)?;
			text::position(value, haystack, fragment)
		}
		FunctionKind::Extract => {
			temporal::extract(modifier, value, fragment)
		}
		FunctionKind::Cardinality => cardinality(value, fragment),
		other => Err(Error(internal::internal(format!(
			"{} is not a plain scalar function",
			other
		)))),
	}
}

fn required<'a>(
	operand: Option<&'a Value>,
	function: &str,
	fragment: &Fragment,
) -> Result<&'a Value> {
	operand.ok_or_else(|| {
		Error(runtime::invalid_argument(
			fragment.clone(),
			function,
			"missing operand",
		))
	})
}

fn cardinality(value: &Value, fragment: &Fragment) -> Result<Value> {
	match value {
		Value::Array(items) => Ok(Value::Int(items.len() as i64)),
		Value::Multiset(m) => Ok(Value::Int(m.len() as i64)),
		other => Err(Error(arithmetic::unsupported_operand(
			fragment.clone(),
			"CARDINALITY",
			other.kind(),
		))),
	}
}

#[cfg(test)]
mod tests {
	use emberdb_type::Multiset;

	use super::*;

	const F: Fragment = Fragment::None;

	#[test]
	fn test_null_makes_null() {
		let got = apply(
			FunctionKind::Upper,
			None,
			&Value::Null,
			None,
			None,
			&F,
		)
		.unwrap();
		assert_eq!(got, Value::Null);

		// a null second operand is just as strict
		let got = apply(
			FunctionKind::Power,
			None,
			&Value::Int(2),
			Some(&Value::Null),
			None,
			&F,
		)
		.unwrap();
		assert_eq!(got, Value::Null);
	}

	#[test]
	fn test_pending_stays_pending() {
		let got = apply(
			FunctionKind::Abs,
			None,
			&Value::Pending,
			None,
			None,
			&F,
		)
		.unwrap();
		assert_eq!(got, Value::Pending);
	}

	#[test]
	fn test_cardinality() {
		let array = Value::array(vec![Value::Int(1), Value::Int(2)]);
		let got = apply(
			FunctionKind::Cardinality,
			None,
			&array,
			None,
			None,
			&F,
		)
		.unwrap();
		assert_eq!(got, Value::Int(2));

		let mut m = Multiset::new();
		m.insert_count(Value::Int(1), 3);
		let got = apply(
			FunctionKind::Cardinality,
			None,
			&Value::multiset(m),
			None,
			None,
			&F,
		)
		.unwrap();
		assert_eq!(got, Value::Int(3));

		let error = apply(
			FunctionKind::Cardinality,
			None,
			&Value::Int(1),
			None,
			None,
			&F,
		)
		.unwrap_err();
		assert_eq!(error.code, "22005");
	}

	#[test]
	fn test_aggregate_rejected() {
		let error = apply(
			FunctionKind::Sum,
			None,
			&Value::Int(1),
			None,
			None,
			&F,
		)
		.unwrap_err();
		assert_eq!(error.code, "INTERNAL_ERROR");
	}
}
