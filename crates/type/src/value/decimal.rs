// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{
	cmp::Ordering,
	fmt::{Display, Formatter},
	hash::{Hash, Hasher},
	ops::Deref,
	str::FromStr,
};

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

/// An arbitrary-precision NUMERIC value.
///
/// Wraps [`BigDecimal`] so equality, ordering and hashing agree: `1.0` and
/// `1.00` are one value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Decimal(BigDecimal);

impl Decimal {
	pub fn new(inner: BigDecimal) -> Self {
		Decimal(inner)
	}

	pub fn zero() -> Self {
		Decimal(BigDecimal::from(0))
	}

	pub fn into_inner(self) -> BigDecimal {
		self.0
	}

	pub fn inner(&self) -> &BigDecimal {
		&self.0
	}
}

impl From<BigDecimal> for Decimal {
	fn from(inner: BigDecimal) -> Self {
		Decimal(inner)
	}
}

impl From<i64> for Decimal {
	fn from(v: i64) -> Self {
		Decimal(BigDecimal::from(v))
	}
}

impl From<BigInt> for Decimal {
	fn from(v: BigInt) -> Self {
		Decimal(BigDecimal::from(v))
	}
}

impl FromStr for Decimal {
	type Err = bigdecimal::ParseBigDecimalError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		BigDecimal::from_str(s).map(Decimal)
	}
}

impl PartialEq for Decimal {
	fn eq(&self, other: &Self) -> bool {
		self.0 == other.0
	}
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Decimal {
	fn cmp(&self, other: &Self) -> Ordering {
		self.0.cmp(&other.0)
	}
}

impl Hash for Decimal {
	fn hash<H: Hasher>(&self, state: &mut H) {
		// hash the normalized digits/exponent pair so trailing
		// zeros do not split equal values
		let (digits, exponent) =
			self.0.normalized().into_bigint_and_exponent();
		digits.hash(state);
		exponent.hash(state);
	}
}

impl Deref for Decimal {
	type Target = BigDecimal;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl Display for Decimal {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Display::fmt(&self.0, f)
	}
}

#[cfg(test)]
mod tests {
	use std::collections::hash_map::DefaultHasher;

	use super::*;

	fn hash_of(d: &Decimal) -> u64 {
		let mut h = DefaultHasher::new();
		d.hash(&mut h);
		h.finish()
	}

	#[test]
	fn test_trailing_zeros_equal() {
		let a: Decimal = "1.0".parse().unwrap();
		let b: Decimal = "1.00".parse().unwrap();
		assert_eq!(a, b);
		assert_eq!(hash_of(&a), hash_of(&b));
	}

	#[test]
	fn test_ordering() {
		let a: Decimal = "1.5".parse().unwrap();
		let b: Decimal = "2".parse().unwrap();
		assert!(a < b);
	}

	#[test]
	fn test_display() {
		let a: Decimal = "12.50".parse().unwrap();
		assert_eq!(a.to_string(), "12.50");
	}
}
