// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Character scalar functions.
//!
//! Positions and lengths count characters, not bytes, and follow the
//! one-based SQL convention.

use emberdb_core::graph::FunctionModifier;
use emberdb_type::error::diagnostic::{arithmetic, runtime};
use emberdb_type::{Error, Fragment, Result, Value};

pub fn char_length(value: &Value, fragment: &Fragment) -> Result<Value> {
	let s = utf8(value, "CHAR_LENGTH", fragment)?;
	Ok(Value::Int(s.chars().count() as i64))
}

pub fn upper(value: &Value, fragment: &Fragment) -> Result<Value> {
	let s = utf8(value, "UPPER", fragment)?;
	Ok(Value::utf8(s.to_uppercase()))
}

pub fn lower(value: &Value, fragment: &Fragment) -> Result<Value> {
	let s = utf8(value, "LOWER", fragment)?;
	Ok(Value::utf8(s.to_lowercase()))
}

/// TRIM. The side defaults to BOTH and the pad character to a space;
/// an explicit pad must be a single character.
pub fn trim(
	side: Option<FunctionModifier>,
	value: &Value,
	character: Option<&Value>,
	fragment: &Fragment,
) -> Result<Value> {
	let s = utf8(value, "TRIM", fragment)?;
	let pad = match character {
		None => ' ',
		Some(operand) => {
			let text = utf8(operand, "TRIM", fragment)?;
			let mut chars = text.chars();
			match (chars.next(), chars.next()) {
				(Some(c), None) => c,
				_ => {
					return Err(Error(
						runtime::trim_error(
							fragment.clone(),
						),
					));
				}
			}
		}
	};
	let trimmed = match side {
		Some(FunctionModifier::Leading) => s.trim_start_matches(pad),
		Some(FunctionModifier::Trailing) => s.trim_end_matches(pad),
		_ => s.trim_matches(pad),
	};
	Ok(Value::utf8(trimmed))
}

/// SUBSTRING, one-based. A start before the string clips to its
/// beginning; a negative length is an error.
pub fn substring(
	value: &Value,
	start: &Value,
	length: Option<&Value>,
	fragment: &Fragment,
) -> Result<Value> {
	let s = utf8(value, "SUBSTRING", fragment)?;
	let from = integer(start, "SUBSTRING", fragment)?;
	let chars: Vec<char> = s.chars().collect();
	let n = chars.len() as i64;
	let upper = match length {
		None => n + 1,
		Some(operand) => {
			let len = integer(operand, "SUBSTRING", fragment)?;
			if len < 0 {
				return Err(Error(runtime::substring_error(
					fragment.clone(),
				)));
			}
			from.saturating_add(len)
		}
	};
	let lo = from.saturating_sub(1).clamp(0, n) as usize;
	let hi = upper.saturating_sub(1).clamp(lo as i64, n) as usize;
	Ok(Value::utf8(chars[lo..hi].iter().collect::<String>()))
}

/// POSITION of `needle` in `haystack`; 0 when absent, 1 for an empty
/// needle.
pub fn position(
	needle: &Value,
	haystack: &Value,
	fragment: &Fragment,
) -> Result<Value> {
	let needle = utf8(needle, "POSITION", fragment)?;
	let haystack = utf8(haystack, "POSITION", fragment)?;
	if needle.is_empty() {
		return Ok(Value::Int(1));
	}
	match haystack.find(needle) {
		Some(byte) => Ok(Value::Int(
			haystack[..byte].chars().count() as i64 + 1,
		)),
		None => Ok(Value::Int(0)),
	}
}

fn utf8<'a>(
	value: &'a Value,
	function: &str,
	fragment: &Fragment,
) -> Result<&'a str> {
	match value {
		Value::Utf8(s) => Ok(s),
		other => Err(Error(arithmetic::unsupported_operand(
			fragment.clone(),
			function,
			other.kind(),
		))),
	}
}

fn integer(value: &Value, function: &str, fragment: &Fragment) -> Result<i64> {
	value.as_int().ok_or_else(|| {
		Error(arithmetic::unsupported_operand(
			fragment.clone(),
			function,
			value.kind(),
		))
	})
}
