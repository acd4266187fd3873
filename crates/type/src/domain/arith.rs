// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Value arithmetic with the standard numeric tower.
//!
//! Exact integers are computed in machine words and promoted to arbitrary
//! precision on overflow; mixing an exact operand with a decimal yields a
//! decimal and mixing with a real yields a real. Null and pending operands
//! short-circuit before any computation.

use std::cmp::Ordering;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::Result;
use crate::error::diagnostic::{arithmetic, cast};
use crate::fragment::Fragment;
use crate::value::{Interval, OrderedF64, Value};

/// Null and pending short-circuiting shared by every strict operator.
fn strict(left: &Value, right: &Value) -> Option<Value> {
	if left.is_pending() || right.is_pending() {
		return Some(Value::Pending);
	}
	if left.is_null() || right.is_null() {
		return Some(Value::Null);
	}
	None
}

/// Both operands widened to their common numeric representation.
enum NumericPair {
	Int(i64, i64),
	Integer(BigInt, BigInt),
	Numeric(BigDecimal, BigDecimal),
	Real(f64, f64),
}

fn numeric_pair(left: &Value, right: &Value) -> Option<NumericPair> {
	use Value::*;
	Some(match (left, right) {
		(Int(l), Int(r)) => NumericPair::Int(*l, *r),
		(Int(l), Integer(r)) => {
			NumericPair::Integer(BigInt::from(*l), r.clone())
		}
		(Integer(l), Int(r)) => {
			NumericPair::Integer(l.clone(), BigInt::from(*r))
		}
		(Integer(l), Integer(r)) => {
			NumericPair::Integer(l.clone(), r.clone())
		}
		(Numeric(l), Numeric(r)) => NumericPair::Numeric(
			l.inner().clone(),
			r.inner().clone(),
		),
		(Numeric(l), Int(r)) => NumericPair::Numeric(
			l.inner().clone(),
			BigDecimal::from(*r),
		),
		(Int(l), Numeric(r)) => NumericPair::Numeric(
			BigDecimal::from(*l),
			r.inner().clone(),
		),
		(Numeric(l), Integer(r)) => NumericPair::Numeric(
			l.inner().clone(),
			BigDecimal::from(r.clone()),
		),
		(Integer(l), Numeric(r)) => NumericPair::Numeric(
			BigDecimal::from(l.clone()),
			r.inner().clone(),
		),
		(Real(_), _) | (_, Real(_)) => NumericPair::Real(
			left.to_f64()?,
			right.to_f64()?,
		),
		_ => return None,
	})
}

/// Shrink a wide integer back to a machine word when it fits, so that equal
/// numbers always share a representation.
fn normalize_integer(value: BigInt) -> Value {
	match value.to_i64() {
		Some(small) => Value::Int(small),
		None => Value::Integer(value),
	}
}

fn finish_real(value: f64, fragment: &Fragment) -> Result<Value> {
	if !value.is_finite() {
		return Err(crate::error::Error(
			arithmetic::numeric_out_of_range(
				fragment.clone(),
				"result is not a finite number",
			),
		));
	}
	OrderedF64::try_from(value).map(Value::Real).map_err(|_| {
		crate::error::Error(arithmetic::numeric_out_of_range(
			fragment.clone(),
			"result is not a number",
		))
	})
}

fn unsupported(
	operator: &str,
	left: &Value,
	right: &Value,
	fragment: &Fragment,
) -> crate::error::Error {
	crate::error::Error(arithmetic::unsupported_operands(
		fragment.clone(),
		operator,
		left.kind(),
		right.kind(),
	))
}

pub fn add(left: &Value, right: &Value, fragment: &Fragment) -> Result<Value> {
	if let Some(short) = strict(left, right) {
		return Ok(short);
	}
	if let Some(pair) = numeric_pair(left, right) {
		return Ok(match pair {
			NumericPair::Int(l, r) => match l.checked_add(r) {
				Some(sum) => Value::Int(sum),
				None => normalize_integer(
					BigInt::from(l) + BigInt::from(r),
				),
			},
			NumericPair::Integer(l, r) => normalize_integer(l + r),
			NumericPair::Numeric(l, r) => Value::numeric(l + r),
			NumericPair::Real(l, r) => {
				return finish_real(l + r, fragment);
			}
		});
	}
	match (left, right) {
		(Value::Date(d), Value::Interval(i))
		| (Value::Interval(i), Value::Date(d)) => i
			.add_to_date(*d)
			.map(Value::Date)
			.ok_or_else(|| datetime_overflow(fragment)),
		(Value::Timestamp(ts), Value::Interval(i))
		| (Value::Interval(i), Value::Timestamp(ts)) => i
			.add_to_timestamp(*ts)
			.map(Value::Timestamp)
			.ok_or_else(|| datetime_overflow(fragment)),
		(Value::Time(t), Value::Interval(i))
		| (Value::Interval(i), Value::Time(t)) => i
			.add_to_time(*t)
			.map(Value::Time)
			.ok_or_else(|| datetime_overflow(fragment)),
		(Value::Interval(l), Value::Interval(r)) => l
			.checked_add(r)
			.map(Value::Interval)
			.ok_or_else(|| datetime_overflow(fragment)),
		_ => Err(unsupported("+", left, right, fragment)),
	}
}

pub fn subtract(
	left: &Value,
	right: &Value,
	fragment: &Fragment,
) -> Result<Value> {
	if let Some(short) = strict(left, right) {
		return Ok(short);
	}
	if let Some(pair) = numeric_pair(left, right) {
		return Ok(match pair {
			NumericPair::Int(l, r) => match l.checked_sub(r) {
				Some(diff) => Value::Int(diff),
				None => normalize_integer(
					BigInt::from(l) - BigInt::from(r),
				),
			},
			NumericPair::Integer(l, r) => normalize_integer(l - r),
			NumericPair::Numeric(l, r) => Value::numeric(l - r),
			NumericPair::Real(l, r) => {
				return finish_real(l - r, fragment);
			}
		});
	}
	match (left, right) {
		(Value::Date(d), Value::Interval(i)) => i
			.negate()
			.add_to_date(*d)
			.map(Value::Date)
			.ok_or_else(|| datetime_overflow(fragment)),
		(Value::Timestamp(ts), Value::Interval(i)) => i
			.negate()
			.add_to_timestamp(*ts)
			.map(Value::Timestamp)
			.ok_or_else(|| datetime_overflow(fragment)),
		(Value::Time(t), Value::Interval(i)) => i
			.negate()
			.add_to_time(*t)
			.map(Value::Time)
			.ok_or_else(|| datetime_overflow(fragment)),
		(Value::Date(l), Value::Date(r)) => {
			Ok(Value::Interval(Interval::from_days(
				l.to_days_since_epoch()
					- r.to_days_since_epoch(),
			)))
		}
		(Value::Timestamp(l), Value::Timestamp(r)) => {
			Ok(Value::Interval(Interval::from_micros(
				l.to_micros_since_epoch()
					- r.to_micros_since_epoch(),
			)))
		}
		(Value::Time(l), Value::Time(r)) => {
			let nanos = l.to_nanos_since_midnight() as i64
				- r.to_nanos_since_midnight() as i64;
			Ok(Value::Interval(Interval::from_micros(
				nanos / 1_000,
			)))
		}
		(Value::Interval(l), Value::Interval(r)) => l
			.checked_sub(r)
			.map(Value::Interval)
			.ok_or_else(|| datetime_overflow(fragment)),
		_ => Err(unsupported("-", left, right, fragment)),
	}
}

pub fn multiply(
	left: &Value,
	right: &Value,
	fragment: &Fragment,
) -> Result<Value> {
	if let Some(short) = strict(left, right) {
		return Ok(short);
	}
	if let Some(pair) = numeric_pair(left, right) {
		return Ok(match pair {
			NumericPair::Int(l, r) => match l.checked_mul(r) {
				Some(product) => Value::Int(product),
				None => normalize_integer(
					BigInt::from(l) * BigInt::from(r),
				),
			},
			NumericPair::Integer(l, r) => normalize_integer(l * r),
			NumericPair::Numeric(l, r) => Value::numeric(l * r),
			NumericPair::Real(l, r) => {
				return finish_real(l * r, fragment);
			}
		});
	}
	match (left, right) {
		(Value::Interval(i), Value::Int(k))
		| (Value::Int(k), Value::Interval(i)) => {
			scale_interval(i, *k, fragment)
		}
		_ => Err(unsupported("*", left, right, fragment)),
	}
}

pub fn divide(
	left: &Value,
	right: &Value,
	fragment: &Fragment,
) -> Result<Value> {
	if let Some(short) = strict(left, right) {
		return Ok(short);
	}
	let pair = numeric_pair(left, right)
		.ok_or_else(|| unsupported("/", left, right, fragment))?;
	match pair {
		NumericPair::Int(l, r) => {
			if r == 0 {
				return Err(division_by_zero(fragment));
			}
			Ok(match l.checked_div(r) {
				Some(quotient) => Value::Int(quotient),
				// only i64::MIN / -1 lands here
				None => normalize_integer(
					BigInt::from(l) / BigInt::from(r),
				),
			})
		}
		NumericPair::Integer(l, r) => {
			if r.is_zero() {
				return Err(division_by_zero(fragment));
			}
			Ok(normalize_integer(l / r))
		}
		NumericPair::Numeric(l, r) => {
			if r.is_zero() {
				return Err(division_by_zero(fragment));
			}
			Ok(Value::numeric(l / r))
		}
		NumericPair::Real(l, r) => {
			if r == 0.0 {
				return Err(division_by_zero(fragment));
			}
			finish_real(l / r, fragment)
		}
	}
}

/// Remainder of exact integer division, for the MOD function.
pub fn modulo(
	left: &Value,
	right: &Value,
	fragment: &Fragment,
) -> Result<Value> {
	if let Some(short) = strict(left, right) {
		return Ok(short);
	}
	match numeric_pair(left, right) {
		Some(NumericPair::Int(l, r)) => {
			if r == 0 {
				return Err(division_by_zero(fragment));
			}
			Ok(match l.checked_rem(r) {
				Some(rem) => Value::Int(rem),
				None => Value::Int(0),
			})
		}
		Some(NumericPair::Integer(l, r)) => {
			if r.is_zero() {
				return Err(division_by_zero(fragment));
			}
			Ok(normalize_integer(l % r))
		}
		_ => Err(unsupported("MOD", left, right, fragment)),
	}
}

pub fn negate(value: &Value, fragment: &Fragment) -> Result<Value> {
	match value {
		Value::Pending => Ok(Value::Pending),
		Value::Null => Ok(Value::Null),
		Value::Int(i) => Ok(match i.checked_neg() {
			Some(negated) => Value::Int(negated),
			None => normalize_integer(-BigInt::from(*i)),
		}),
		Value::Integer(i) => Ok(normalize_integer(-i.clone())),
		Value::Numeric(d) => Ok(Value::numeric(-d.inner().clone())),
		Value::Real(r) => finish_real(-r.value(), fragment),
		Value::Interval(i) => Ok(Value::Interval(i.negate())),
		_ => Err(crate::error::Error(
			arithmetic::unsupported_operand(
				fragment.clone(),
				"-",
				value.kind(),
			),
		)),
	}
}

pub fn concat(
	left: &Value,
	right: &Value,
	fragment: &Fragment,
) -> Result<Value> {
	if let Some(short) = strict(left, right) {
		return Ok(short);
	}
	match (left, right) {
		(Value::Utf8(l), Value::Utf8(r)) => {
			let mut joined =
				String::with_capacity(l.len() + r.len());
			joined.push_str(l);
			joined.push_str(r);
			Ok(Value::Utf8(joined))
		}
		(Value::Array(l), Value::Array(r)) => {
			let mut joined = l.clone();
			joined.extend(r.iter().cloned());
			Ok(Value::Array(joined))
		}
		_ => Err(unsupported("||", left, right, fragment)),
	}
}

/// Three-valued SQL comparison. `Ok(None)` means unknown because a null or
/// pending operand was involved; incompatible kinds are an error rather
/// than unknown.
pub fn compare(
	left: &Value,
	right: &Value,
	fragment: &Fragment,
) -> Result<Option<Ordering>> {
	if left.is_null()
		|| right.is_null()
		|| left.is_pending()
		|| right.is_pending()
	{
		return Ok(None);
	}
	if let Some(pair) = numeric_pair(left, right) {
		return Ok(Some(match pair {
			NumericPair::Int(l, r) => l.cmp(&r),
			NumericPair::Integer(l, r) => l.cmp(&r),
			NumericPair::Numeric(l, r) => l.cmp(&r),
			// NaN never reaches here, and partial_cmp keeps -0.0
			// equal to +0.0
			NumericPair::Real(l, r) => {
				l.partial_cmp(&r).unwrap_or(Ordering::Equal)
			}
		}));
	}
	match (left, right) {
		(Value::Boolean(l), Value::Boolean(r)) => Ok(Some(l.cmp(r))),
		(Value::Utf8(l), Value::Utf8(r)) => Ok(Some(l.cmp(r))),
		(Value::Date(l), Value::Date(r)) => Ok(Some(l.cmp(r))),
		(Value::Time(l), Value::Time(r)) => Ok(Some(l.cmp(r))),
		(Value::Timestamp(l), Value::Timestamp(r)) => {
			Ok(Some(l.cmp(r)))
		}
		(Value::Interval(l), Value::Interval(r)) => Ok(Some(l.cmp(r))),
		(Value::Multiset(l), Value::Multiset(r)) => Ok(Some(l.cmp(r))),
		(Value::Row(l), Value::Row(r)) => {
			if l.len() != r.len() {
				return Err(crate::error::Error(
					cast::row_arity_mismatch(
						fragment.clone(),
						l.len(),
						r.len(),
					),
				));
			}
			compare_sequence(
				l.values(),
				r.values(),
				Ordering::Equal,
				fragment,
			)
		}
		(Value::Array(l), Value::Array(r)) => compare_sequence(
			l.iter(),
			r.iter(),
			l.len().cmp(&r.len()),
			fragment,
		),
		_ => Err(crate::error::Error(arithmetic::incomparable(
			fragment.clone(),
			left.kind(),
			right.kind(),
		))),
	}
}

fn compare_sequence<'a>(
	left: impl Iterator<Item = &'a Value>,
	right: impl Iterator<Item = &'a Value>,
	tie: Ordering,
	fragment: &Fragment,
) -> Result<Option<Ordering>> {
	for (l, r) in left.zip(right) {
		match compare(l, r, fragment)? {
			Some(Ordering::Equal) => continue,
			other => return Ok(other),
		}
	}
	Ok(Some(tie))
}

fn scale_interval(
	interval: &Interval,
	factor: i64,
	fragment: &Fragment,
) -> Result<Value> {
	let months = (interval.months() as i64).checked_mul(factor);
	let days = (interval.days() as i64).checked_mul(factor);
	let micros = interval.micros().checked_mul(factor);
	match (months, days, micros) {
		(Some(months), Some(days), Some(micros)) => {
			let months = i32::try_from(months)
				.map_err(|_| datetime_overflow(fragment))?;
			let days = i32::try_from(days)
				.map_err(|_| datetime_overflow(fragment))?;
			Ok(Value::Interval(Interval::new(
				months, days, micros,
			)))
		}
		_ => Err(datetime_overflow(fragment)),
	}
}

fn division_by_zero(fragment: &Fragment) -> crate::error::Error {
	crate::error::Error(arithmetic::division_by_zero(fragment.clone()))
}

fn datetime_overflow(fragment: &Fragment) -> crate::error::Error {
	crate::error::Error(arithmetic::datetime_overflow(fragment.clone()))
}

/// Absolute value, for the ABS function.
pub fn abs(value: &Value, fragment: &Fragment) -> Result<Value> {
	match value {
		Value::Pending => Ok(Value::Pending),
		Value::Null => Ok(Value::Null),
		Value::Int(i) => Ok(match i.checked_abs() {
			Some(abs) => Value::Int(abs),
			None => normalize_integer(BigInt::from(*i).abs()),
		}),
		Value::Integer(i) => Ok(normalize_integer(i.abs())),
		Value::Numeric(d) => Ok(Value::numeric(d.inner().abs())),
		Value::Real(r) => finish_real(r.value().abs(), fragment),
		_ => Err(crate::error::Error(
			arithmetic::unsupported_operand(
				fragment.clone(),
				"ABS",
				value.kind(),
			),
		)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::value::{Date, Decimal, Timestamp};

	const F: Fragment = Fragment::None;

	#[test]
	fn test_int_add_promotes_on_overflow() {
		let sum = add(&Value::Int(i64::MAX), &Value::Int(1), &F)
			.unwrap();
		assert_eq!(
			sum,
			Value::Integer(BigInt::from(i64::MAX) + 1)
		);
	}

	#[test]
	fn test_integer_result_shrinks_when_it_fits() {
		let big = Value::Integer(BigInt::from(i64::MAX) + 1);
		let back = subtract(&big, &Value::Int(1), &F).unwrap();
		assert_eq!(back, Value::Int(i64::MAX));
	}

	#[test]
	fn test_null_short_circuits() {
		assert_eq!(
			add(&Value::Null, &Value::Int(1), &F).unwrap(),
			Value::Null
		);
		assert_eq!(
			multiply(&Value::Int(2), &Value::Null, &F).unwrap(),
			Value::Null
		);
	}

	#[test]
	fn test_pending_wins_over_null() {
		assert_eq!(
			add(&Value::Pending, &Value::Null, &F).unwrap(),
			Value::Pending
		);
	}

	#[test]
	fn test_division_by_zero() {
		let error = divide(&Value::Int(1), &Value::Int(0), &F)
			.unwrap_err();
		assert_eq!(error.code, "22012");

		let error = divide(
			&Value::real(1.0),
			&Value::real(0.0),
			&F,
		)
		.unwrap_err();
		assert_eq!(error.code, "22012");
	}

	#[test]
	fn test_integer_division_truncates() {
		assert_eq!(
			divide(&Value::Int(7), &Value::Int(2), &F).unwrap(),
			Value::Int(3)
		);
		assert_eq!(
			divide(&Value::Int(-7), &Value::Int(2), &F).unwrap(),
			Value::Int(-3)
		);
	}

	#[test]
	fn test_mixed_numeric_promotion() {
		let result = add(
			&Value::Int(1),
			&Value::numeric(Decimal::from(2)),
			&F,
		)
		.unwrap();
		assert_eq!(result, Value::numeric(Decimal::from(3)));

		let result =
			add(&Value::Int(1), &Value::real(0.5), &F).unwrap();
		assert_eq!(result, Value::real(1.5));
	}

	#[test]
	fn test_date_arithmetic() {
		let date = Value::Date(Date::new(2024, 2, 28).unwrap());
		let two_days =
			Value::Interval(Interval::from_days(2));
		let shifted = add(&date, &two_days, &F).unwrap();
		assert_eq!(
			shifted,
			Value::Date(Date::new(2024, 3, 1).unwrap())
		);

		let a = Value::Date(Date::new(2024, 3, 10).unwrap());
		let b = Value::Date(Date::new(2024, 3, 1).unwrap());
		assert_eq!(
			subtract(&a, &b, &F).unwrap(),
			Value::Interval(Interval::from_days(9))
		);
	}

	#[test]
	fn test_timestamp_difference() {
		let a = Timestamp::parse("2024-01-01 00:01:00").unwrap();
		let b = Timestamp::parse("2024-01-01 00:00:00").unwrap();
		assert_eq!(
			subtract(
				&Value::Timestamp(a),
				&Value::Timestamp(b),
				&F
			)
			.unwrap(),
			Value::Interval(Interval::from_seconds(60))
		);
	}

	#[test]
	fn test_concat() {
		assert_eq!(
			concat(&Value::utf8("ab"), &Value::utf8("cd"), &F)
				.unwrap(),
			Value::utf8("abcd")
		);
		let error = concat(&Value::Int(1), &Value::utf8("x"), &F)
			.unwrap_err();
		assert_eq!(error.code, "22005");
	}

	#[test]
	fn test_compare_cross_numeric() {
		assert_eq!(
			compare(&Value::Int(2), &Value::real(2.5), &F)
				.unwrap(),
			Some(Ordering::Less)
		);
		assert_eq!(
			compare(
				&Value::numeric(Decimal::from(2)),
				&Value::Int(2),
				&F
			)
			.unwrap(),
			Some(Ordering::Equal)
		);
	}

	#[test]
	fn test_compare_null_is_unknown() {
		assert_eq!(
			compare(&Value::Null, &Value::Int(1), &F).unwrap(),
			None
		);
	}

	#[test]
	fn test_compare_kind_mismatch_is_error() {
		let error = compare(&Value::utf8("a"), &Value::Int(1), &F)
			.unwrap_err();
		assert_eq!(error.code, "22005");
	}

	#[test]
	fn test_row_comparison_decides_before_null() {
		use crate::value::RowValue;
		let low = Value::row(RowValue::positional([
			Value::Int(0),
			Value::Null,
		]));
		let high = Value::row(RowValue::positional([
			Value::Int(1),
			Value::Int(2),
		]));
		assert_eq!(
			compare(&low, &high, &F).unwrap(),
			Some(Ordering::Less)
		);

		let partial = Value::row(RowValue::positional([
			Value::Int(1),
			Value::Null,
		]));
		assert_eq!(compare(&partial, &high, &F).unwrap(), None);
	}

	#[test]
	fn test_negate_min_promotes() {
		assert_eq!(
			negate(&Value::Int(i64::MIN), &F).unwrap(),
			Value::Integer(-BigInt::from(i64::MIN))
		);
	}

	#[test]
	fn test_interval_scaling() {
		let interval = Value::Interval(Interval::new(1, 2, 3));
		assert_eq!(
			multiply(&interval, &Value::Int(3), &F).unwrap(),
			Value::Interval(Interval::new(3, 6, 9))
		);
	}
}
