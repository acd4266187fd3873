// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::{
	cmp::Ordering,
	fmt::{Display, Formatter},
	hash::{Hash, Hasher},
	ops::Deref,
};

use serde::{Deserialize, Serialize};

/// An f64 that is guaranteed not to be NaN, so it can be ordered and hashed.
///
/// Construction rejects NaN; infinities are kept because they order cleanly.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedF64(f64);

impl OrderedF64 {
	pub fn value(&self) -> f64 {
		self.0
	}

	pub fn zero() -> Self {
		OrderedF64(0.0)
	}
}

impl TryFrom<f64> for OrderedF64 {
	type Error = ();

	fn try_from(v: f64) -> Result<Self, Self::Error> {
		if v.is_nan() {
			Err(())
		} else {
			Ok(OrderedF64(v))
		}
	}
}

impl Eq for OrderedF64 {}

impl PartialOrd for OrderedF64 {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for OrderedF64 {
	fn cmp(&self, other: &Self) -> Ordering {
		// NaN is excluded at construction, so the partial order is
		// total; -0.0 and +0.0 stay one value, agreeing with Eq and
		// Hash
		self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
	}
}

impl Hash for OrderedF64 {
	fn hash<H: Hasher>(&self, state: &mut H) {
		// normalize -0.0 to +0.0 so equal values hash alike
		let v = if self.0 == 0.0 {
			0.0f64
		} else {
			self.0
		};
		v.to_bits().hash(state);
	}
}

impl Deref for OrderedF64 {
	type Target = f64;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl Display for OrderedF64 {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Display::fmt(&self.0, f)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_rejects_nan() {
		assert!(OrderedF64::try_from(f64::NAN).is_err());
		assert!(OrderedF64::try_from(1.5).is_ok());
	}

	#[test]
	fn test_ordering() {
		let a = OrderedF64::try_from(1.0).unwrap();
		let b = OrderedF64::try_from(2.0).unwrap();
		let inf = OrderedF64::try_from(f64::INFINITY).unwrap();
		assert!(a < b);
		assert!(b < inf);
	}

	#[test]
	fn test_zero_hash_consistency() {
		use std::collections::hash_map::DefaultHasher;

		let pos = OrderedF64::try_from(0.0).unwrap();
		let neg = OrderedF64::try_from(-0.0).unwrap();
		assert_eq!(pos, neg);
		assert_eq!(pos.cmp(&neg), Ordering::Equal);

		let mut h1 = DefaultHasher::new();
		let mut h2 = DefaultHasher::new();
		pos.hash(&mut h1);
		neg.hash(&mut h2);
		assert_eq!(h1.finish(), h2.finish());
	}
}
