// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

mod decimal;
mod multiset;
mod ordered_f64;
mod row;
mod temporal;

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

pub use decimal::Decimal;
pub use multiset::Multiset;
pub use ordered_f64::OrderedF64;
pub use row::{RowShape, RowValue};
pub use temporal::{Date, Interval, Time, Timestamp};

use crate::domain::DomainKind;

/// A runtime value.
///
/// `Null` is the SQL null; `Pending` marks an aggregate that is still
/// accumulating and must never leak into ordinary evaluation. Integers are
/// kept as `Int` while they fit a machine word and promoted to the unbounded
/// `Integer` representation on overflow.
#[derive(
	Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
pub enum Value {
	/// Absence of a value.
	#[default]
	Null,
	/// An aggregate result that is still being accumulated.
	Pending,
	/// A boolean.
	Boolean(bool),
	/// A 64-bit signed integer.
	Int(i64),
	/// An arbitrary-precision integer.
	Integer(BigInt),
	/// An exact decimal number.
	Numeric(Decimal),
	/// A 64-bit float, NaN excluded.
	Real(OrderedF64),
	/// A UTF-8 string.
	Utf8(String),
	/// A calendar date.
	Date(Date),
	/// A time of day.
	Time(Time),
	/// A date and time.
	Timestamp(Timestamp),
	/// A duration.
	Interval(Interval),
	/// An ordered tuple of named fields.
	Row(Box<RowValue>),
	/// An ordered collection.
	Array(Vec<Value>),
	/// An unordered collection with duplicate counts.
	Multiset(Box<Multiset>),
}

impl Value {
	pub fn boolean(value: bool) -> Self {
		Value::Boolean(value)
	}

	pub fn int(value: i64) -> Self {
		Value::Int(value)
	}

	pub fn integer(value: impl Into<BigInt>) -> Self {
		Value::Integer(value.into())
	}

	pub fn numeric(value: impl Into<Decimal>) -> Self {
		Value::Numeric(value.into())
	}

	/// Build a real value. NaN has no SQL representation and collapses to
	/// `Null`.
	pub fn real(value: f64) -> Self {
		OrderedF64::try_from(value)
			.map(Value::Real)
			.unwrap_or(Value::Null)
	}

	pub fn utf8(value: impl Into<String>) -> Self {
		Value::Utf8(value.into())
	}

	pub fn date(value: Date) -> Self {
		Value::Date(value)
	}

	pub fn time(value: Time) -> Self {
		Value::Time(value)
	}

	pub fn timestamp(value: Timestamp) -> Self {
		Value::Timestamp(value)
	}

	pub fn interval(value: Interval) -> Self {
		Value::Interval(value)
	}

	pub fn row(value: RowValue) -> Self {
		Value::Row(Box::new(value))
	}

	pub fn array(values: Vec<Value>) -> Self {
		Value::Array(values)
	}

	pub fn multiset(value: Multiset) -> Self {
		Value::Multiset(Box::new(value))
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn is_pending(&self) -> bool {
		matches!(self, Value::Pending)
	}

	pub fn is_numeric(&self) -> bool {
		matches!(
			self,
			Value::Int(_)
				| Value::Integer(_)
				| Value::Numeric(_)
				| Value::Real(_)
		)
	}

	pub fn kind(&self) -> DomainKind {
		match self {
			Value::Null | Value::Pending => DomainKind::Content,
			Value::Boolean(_) => DomainKind::Boolean,
			Value::Int(_) | Value::Integer(_) => {
				DomainKind::Integer
			}
			Value::Numeric(_) => DomainKind::Numeric,
			Value::Real(_) => DomainKind::Real,
			Value::Utf8(_) => DomainKind::Character,
			Value::Date(_) => DomainKind::Date,
			Value::Time(_) => DomainKind::Time,
			Value::Timestamp(_) => DomainKind::Timestamp,
			Value::Interval(_) => DomainKind::Interval,
			Value::Row(_) => DomainKind::Row,
			Value::Array(_) => DomainKind::Array,
			Value::Multiset(_) => DomainKind::Multiset,
		}
	}

	pub fn as_boolean(&self) -> Option<bool> {
		match self {
			Value::Boolean(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Value::Int(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_utf8(&self) -> Option<&str> {
		match self {
			Value::Utf8(s) => Some(s.as_str()),
			_ => None,
		}
	}

	/// A lossy float view of any numeric variant, for approximate
	/// arithmetic.
	pub fn to_f64(&self) -> Option<f64> {
		use num_traits::ToPrimitive;
		match self {
			Value::Int(i) => Some(*i as f64),
			Value::Integer(i) => i.to_f64(),
			Value::Numeric(d) => d.inner().to_f64(),
			Value::Real(r) => Some(r.value()),
			_ => None,
		}
	}

	fn rank(&self) -> u8 {
		match self {
			Value::Null => 0,
			Value::Pending => 1,
			Value::Boolean(_) => 2,
			Value::Int(_) => 3,
			Value::Integer(_) => 4,
			Value::Numeric(_) => 5,
			Value::Real(_) => 6,
			Value::Utf8(_) => 7,
			Value::Date(_) => 8,
			Value::Time(_) => 9,
			Value::Timestamp(_) => 10,
			Value::Interval(_) => 11,
			Value::Row(_) => 12,
			Value::Array(_) => 13,
			Value::Multiset(_) => 14,
		}
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Boolean(value)
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Int(value)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::Utf8(value.to_string())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::Utf8(value)
	}
}

// Structural total order, used for sorted containers. Variants order by
// rank, then by their payload. SQL comparison with null handling and
// numeric promotion lives with the domain rules instead.
impl Ord for Value {
	fn cmp(&self, other: &Self) -> Ordering {
		match (self, other) {
			(Value::Boolean(l), Value::Boolean(r)) => l.cmp(r),
			(Value::Int(l), Value::Int(r)) => l.cmp(r),
			(Value::Integer(l), Value::Integer(r)) => l.cmp(r),
			(Value::Numeric(l), Value::Numeric(r)) => l.cmp(r),
			(Value::Real(l), Value::Real(r)) => l.cmp(r),
			(Value::Utf8(l), Value::Utf8(r)) => l.cmp(r),
			(Value::Date(l), Value::Date(r)) => l.cmp(r),
			(Value::Time(l), Value::Time(r)) => l.cmp(r),
			(Value::Timestamp(l), Value::Timestamp(r)) => l.cmp(r),
			(Value::Interval(l), Value::Interval(r)) => l.cmp(r),
			(Value::Row(l), Value::Row(r)) => l.cmp(r),
			(Value::Array(l), Value::Array(r)) => l.cmp(r),
			(Value::Multiset(l), Value::Multiset(r)) => l.cmp(r),
			(l, r) => l.rank().cmp(&r.rank()),
		}
	}
}

impl PartialOrd for Value {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Value::Null => write!(f, "NULL"),
			Value::Pending => write!(f, "PENDING"),
			Value::Boolean(b) => write!(f, "{}", b),
			Value::Int(i) => write!(f, "{}", i),
			Value::Integer(i) => write!(f, "{}", i),
			Value::Numeric(d) => write!(f, "{}", d),
			Value::Real(r) => write!(f, "{}", r),
			Value::Utf8(s) => write!(f, "{}", s),
			Value::Date(d) => write!(f, "{}", d),
			Value::Time(t) => write!(f, "{}", t),
			Value::Timestamp(ts) => write!(f, "{}", ts),
			Value::Interval(i) => write!(f, "{}", i),
			Value::Row(row) => write!(f, "{}", row),
			Value::Array(values) => {
				write!(f, "[")?;
				let mut first = true;
				for value in values {
					if !first {
						write!(f, ", ")?;
					}
					first = false;
					write!(f, "{}", value)?;
				}
				write!(f, "]")
			}
			Value::Multiset(set) => write!(f, "{}", set),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_kind() {
		assert_eq!(Value::Null.kind(), DomainKind::Content);
		assert_eq!(Value::Pending.kind(), DomainKind::Content);
		assert_eq!(Value::Int(1).kind(), DomainKind::Integer);
		assert_eq!(
			Value::integer(BigInt::from(1)).kind(),
			DomainKind::Integer
		);
		assert_eq!(Value::utf8("x").kind(), DomainKind::Character);
	}

	#[test]
	fn test_real_rejects_nan() {
		assert_eq!(Value::real(f64::NAN), Value::Null);
		assert!(matches!(Value::real(1.5), Value::Real(_)));
	}

	#[test]
	fn test_total_order_across_variants() {
		let mut values = vec![
			Value::utf8("b"),
			Value::Int(2),
			Value::Null,
			Value::Boolean(true),
			Value::Int(1),
		];
		values.sort();
		assert_eq!(
			values,
			vec![
				Value::Null,
				Value::Boolean(true),
				Value::Int(1),
				Value::Int(2),
				Value::utf8("b"),
			]
		);
	}

	#[test]
	fn test_ordering_never_panics_cross_variant() {
		let values = [
			Value::Null,
			Value::Pending,
			Value::Boolean(false),
			Value::Int(0),
			Value::integer(BigInt::from(0)),
			Value::numeric(Decimal::zero()),
			Value::real(0.0),
			Value::utf8(""),
			Value::array(vec![]),
			Value::multiset(Multiset::new()),
		];
		for a in &values {
			for b in &values {
				let _ = a.cmp(b);
			}
		}
	}

	#[test]
	fn test_display() {
		assert_eq!(format!("{}", Value::Null), "NULL");
		assert_eq!(format!("{}", Value::Boolean(true)), "true");
		assert_eq!(format!("{}", Value::Int(42)), "42");
		assert_eq!(
			format!(
				"{}",
				Value::array(vec![
					Value::Int(1),
					Value::Int(2)
				])
			),
			"[1, 2]"
		);
	}

	#[test]
	fn test_serde_roundtrip() {
		let value = Value::row(RowValue::new(vec![
			("id".to_string(), Value::Int(1)),
			("score".to_string(), Value::real(0.5)),
		]));
		let json = serde_json::to_string(&value).unwrap();
		let recovered: Value = serde_json::from_str(&json).unwrap();
		assert_eq!(value, recovered);
	}
}
