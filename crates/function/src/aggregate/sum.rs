// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use bigdecimal::BigDecimal;
use emberdb_type::error::diagnostic::arithmetic;
use emberdb_type::{Decimal, Error, Fragment, Result, Value};
use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// A typed running sum.
///
/// The accumulator adopts the representation of the first value it sees
/// and widens as the inputs demand: machine integers promote to unbounded
/// integers on overflow, exact kinds promote to NUMERIC when mixed, and
/// anything summed with a REAL collapses to REAL.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SumAcc {
	#[default]
	Unset,
	Int(i64),
	Integer(BigInt),
	Numeric(Decimal),
	Real(f64),
}

impl SumAcc {
	pub fn is_unset(&self) -> bool {
		matches!(self, SumAcc::Unset)
	}

	pub fn add(&mut self, value: &Value, fragment: &Fragment) -> Result<()> {
		let next = match (&*self, value) {
			(SumAcc::Unset, Value::Int(v)) => SumAcc::Int(*v),
			(SumAcc::Unset, Value::Integer(v)) => {
				SumAcc::Integer(v.clone())
			}
			(SumAcc::Unset, Value::Numeric(v)) => {
				SumAcc::Numeric(v.clone())
			}
			(SumAcc::Unset, Value::Real(v)) => {
				SumAcc::Real(v.value())
			}
			(SumAcc::Int(acc), Value::Int(v)) => {
				match acc.checked_add(*v) {
					Some(sum) => SumAcc::Int(sum),
					// overflow widens instead of failing
					None => SumAcc::Integer(
						BigInt::from(*acc)
							+ BigInt::from(*v),
					),
				}
			}
			(SumAcc::Int(acc), Value::Integer(v)) => {
				SumAcc::Integer(BigInt::from(*acc) + v)
			}
			(SumAcc::Integer(acc), Value::Int(v)) => {
				SumAcc::Integer(acc + BigInt::from(*v))
			}
			(SumAcc::Integer(acc), Value::Integer(v)) => {
				SumAcc::Integer(acc + v)
			}
			(SumAcc::Int(acc), Value::Numeric(v)) => {
				SumAcc::Numeric(Decimal::new(
					BigDecimal::from(*acc) + v.inner(),
				))
			}
			(SumAcc::Integer(acc), Value::Numeric(v)) => {
				SumAcc::Numeric(Decimal::new(
					BigDecimal::from(acc.clone())
						+ v.inner(),
				))
			}
			(SumAcc::Numeric(acc), Value::Int(v)) => {
				SumAcc::Numeric(Decimal::new(
					acc.inner() + BigDecimal::from(*v),
				))
			}
			(SumAcc::Numeric(acc), Value::Integer(v)) => {
				SumAcc::Numeric(Decimal::new(
					acc.inner()
						+ BigDecimal::from(v.clone()),
				))
			}
			(SumAcc::Numeric(acc), Value::Numeric(v)) => {
				SumAcc::Numeric(Decimal::new(
					acc.inner() + v.inner(),
				))
			}
			(_, Value::Real(v)) => SumAcc::Real(
				self.to_f64().unwrap_or(0.0) + v.value(),
			),
			(SumAcc::Real(acc), other) => {
				match other.to_f64() {
					Some(v) => SumAcc::Real(acc + v),
					None => {
						return Err(Error(
							arithmetic::unsupported_operand(
								fragment.clone(),
								"SUM",
								other.kind(),
							),
						));
					}
				}
			}
			(_, other) => {
				return Err(Error(
					arithmetic::unsupported_operand(
						fragment.clone(),
						"SUM",
						other.kind(),
					),
				));
			}
		};
		*self = next;
		Ok(())
	}

	fn to_f64(&self) -> Option<f64> {
		match self {
			SumAcc::Unset => Some(0.0),
			SumAcc::Int(v) => Some(*v as f64),
			SumAcc::Integer(v) => v.to_f64(),
			SumAcc::Numeric(v) => v.inner().to_f64(),
			SumAcc::Real(v) => Some(*v),
		}
	}

	/// The accumulated sum; NULL while unset. Wide integers shrink back
	/// to machine words when they fit, keeping the canonical form.
	pub fn value(&self) -> Value {
		match self {
			SumAcc::Unset => Value::Null,
			SumAcc::Int(v) => Value::Int(*v),
			SumAcc::Integer(v) => match v.to_i64() {
				Some(narrow) => Value::Int(narrow),
				None => Value::Integer(v.clone()),
			},
			SumAcc::Numeric(v) => Value::Numeric(v.clone()),
			SumAcc::Real(v) => Value::real(*v),
		}
	}

	/// The sum divided by `count`, exactly for the exact kinds.
	pub fn average(&self, count: u64) -> Value {
		if count == 0 {
			return Value::Null;
		}
		let divisor = BigDecimal::from(count);
		match self {
			SumAcc::Unset => Value::Null,
			SumAcc::Int(v) => Value::Numeric(Decimal::new(
				BigDecimal::from(*v) / &divisor,
			)),
			SumAcc::Integer(v) => Value::Numeric(Decimal::new(
				BigDecimal::from(v.clone()) / &divisor,
			)),
			SumAcc::Numeric(v) => Value::Numeric(Decimal::new(
				v.inner() / &divisor,
			)),
			SumAcc::Real(v) => Value::real(v / count as f64),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const F: Fragment = Fragment::None;

	#[test]
	fn test_adopts_first_kind() {
		let mut acc = SumAcc::default();
		assert!(acc.is_unset());
		assert_eq!(acc.value(), Value::Null);
		acc.add(&Value::Int(3), &F).unwrap();
		acc.add(&Value::Int(4), &F).unwrap();
		assert_eq!(acc.value(), Value::Int(7));
	}

	#[test]
	fn test_overflow_widens() {
		let mut acc = SumAcc::default();
		acc.add(&Value::Int(i64::MAX), &F).unwrap();
		acc.add(&Value::Int(2), &F).unwrap();
		assert_eq!(
			acc.value(),
			Value::Integer(
				BigInt::from(i64::MAX) + BigInt::from(2)
			)
		);
		// subtracting back down shrinks to a machine word again
		acc.add(&Value::Int(-10), &F).unwrap();
		assert_eq!(acc.value(), Value::Int(i64::MAX - 8));
	}

	#[test]
	fn test_real_collapses() {
		let mut acc = SumAcc::default();
		acc.add(&Value::Int(1), &F).unwrap();
		acc.add(&Value::real(0.5), &F).unwrap();
		assert_eq!(acc.value(), Value::real(1.5));
	}

	#[test]
	fn test_exact_average() {
		let mut acc = SumAcc::default();
		acc.add(&Value::Int(1), &F).unwrap();
		acc.add(&Value::Int(2), &F).unwrap();
		let avg = acc.average(2);
		assert_eq!(avg, Value::Numeric("1.5".parse().unwrap()));
	}

	#[test]
	fn test_rejects_non_numeric() {
		let mut acc = SumAcc::default();
		let error = acc.add(&Value::utf8("x"), &F).unwrap_err();
		assert_eq!(error.code, "22005");
	}
}
