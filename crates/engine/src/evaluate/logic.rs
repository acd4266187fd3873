// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Three-valued boolean connectives.
//!
//! The dominant operand decides before NULL can contaminate: FALSE wins
//! an AND and TRUE wins an OR even when the other side is NULL or still
//! pending. Both operands are always evaluated first, so side effects
//! inside a routine call happen regardless of the other side.

use emberdb_type::error::diagnostic::arithmetic;
use emberdb_type::{Error, Fragment, Result, Value};

enum Truth {
	True,
	False,
	Unknown,
	Pending,
}

fn truth(value: &Value, op: &str, fragment: &Fragment) -> Result<Truth> {
	match value {
		Value::Boolean(true) => Ok(Truth::True),
		Value::Boolean(false) => Ok(Truth::False),
		Value::Null => Ok(Truth::Unknown),
		Value::Pending => Ok(Truth::Pending),
		other => Err(Error(arithmetic::unsupported_operand(
			fragment.clone(),
			op,
			other.kind(),
		))),
	}
}

pub(crate) fn and(
	left: &Value,
	right: &Value,
	fragment: &Fragment,
) -> Result<Value> {
	let left = truth(left, "AND", fragment)?;
	let right = truth(right, "AND", fragment)?;
	Ok(match (left, right) {
		(Truth::False, _) | (_, Truth::False) => {
			Value::Boolean(false)
		}
		(Truth::Pending, _) | (_, Truth::Pending) => Value::Pending,
		(Truth::Unknown, _) | (_, Truth::Unknown) => Value::Null,
		(Truth::True, Truth::True) => Value::Boolean(true),
	})
}

pub(crate) fn or(
	left: &Value,
	right: &Value,
	fragment: &Fragment,
) -> Result<Value> {
	let left = truth(left, "OR", fragment)?;
	let right = truth(right, "OR", fragment)?;
	Ok(match (left, right) {
		(Truth::True, _) | (_, Truth::True) => Value::Boolean(true),
		(Truth::Pending, _) | (_, Truth::Pending) => Value::Pending,
		(Truth::Unknown, _) | (_, Truth::Unknown) => Value::Null,
		(Truth::False, Truth::False) => Value::Boolean(false),
	})
}

pub(crate) fn not(operand: &Value, fragment: &Fragment) -> Result<Value> {
	match truth(operand, "NOT", fragment)? {
		Truth::True => Ok(Value::Boolean(false)),
		Truth::False => Ok(Value::Boolean(true)),
		Truth::Unknown => Ok(Value::Null),
		Truth::Pending => Ok(Value::Pending),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const F: Fragment = Fragment::None;

	#[test]
	fn test_dominant_operand_beats_null() {
		let no = Value::Boolean(false);
		let yes = Value::Boolean(true);
		assert_eq!(
			and(&no, &Value::Null, &F).unwrap(),
			Value::Boolean(false)
		);
		assert_eq!(
			or(&yes, &Value::Null, &F).unwrap(),
			Value::Boolean(true)
		);
	}

	#[test]
	fn test_dominant_operand_beats_pending() {
		assert_eq!(
			and(&Value::Boolean(false), &Value::Pending, &F).unwrap(),
			Value::Boolean(false)
		);
		assert_eq!(
			or(&Value::Boolean(true), &Value::Pending, &F).unwrap(),
			Value::Boolean(true)
		);
		// without a dominant side the sentinel survives
		assert_eq!(
			and(&Value::Boolean(true), &Value::Pending, &F).unwrap(),
			Value::Pending
		);
	}

	#[test]
	fn test_null_contaminates_the_rest() {
		assert_eq!(
			and(&Value::Boolean(true), &Value::Null, &F).unwrap(),
			Value::Null
		);
		assert_eq!(
			or(&Value::Boolean(false), &Value::Null, &F).unwrap(),
			Value::Null
		);
		assert_eq!(not(&Value::Null, &F).unwrap(), Value::Null);
	}

	#[test]
	fn test_non_boolean_operand_is_rejected() {
		let error =
			and(&Value::Int(1), &Value::Boolean(true), &F).unwrap_err();
		assert_eq!(error.code, "22005");
		let error = not(&Value::utf8("yes"), &F).unwrap_err();
		assert_eq!(error.code, "22005");
	}
}
