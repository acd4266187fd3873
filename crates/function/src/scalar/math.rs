// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Numeric scalar functions.
//!
//! CEIL and FLOOR stay in the operand's own representation; the
//! transcendental family works in floats throughout.

use bigdecimal::RoundingMode;
use emberdb_type::error::diagnostic::{arithmetic, runtime};
use emberdb_type::{Decimal, Error, Fragment, Result, Value};

pub fn ceil(value: &Value, fragment: &Fragment) -> Result<Value> {
	match value {
		Value::Int(_) | Value::Integer(_) => Ok(value.clone()),
		Value::Numeric(d) => Ok(Value::Numeric(Decimal::new(
			d.inner().with_scale_round(0, RoundingMode::Ceiling),
		))),
		Value::Real(r) => Ok(Value::real(r.value().ceil())),
		other => Err(unsupported("CEIL", other, fragment)),
	}
}

pub fn floor(value: &Value, fragment: &Fragment) -> Result<Value> {
	match value {
		Value::Int(_) | Value::Integer(_) => Ok(value.clone()),
		Value::Numeric(d) => Ok(Value::Numeric(Decimal::new(
			d.inner().with_scale_round(0, RoundingMode::Floor),
		))),
		Value::Real(r) => Ok(Value::real(r.value().floor())),
		other => Err(unsupported("FLOOR", other, fragment)),
	}
}

pub fn exp(value: &Value, fragment: &Fragment) -> Result<Value> {
	let x = approx(value, "EXP", fragment)?;
	finish(x.exp(), "EXP", fragment)
}

pub fn ln(value: &Value, fragment: &Fragment) -> Result<Value> {
	let x = approx(value, "LN", fragment)?;
	if x <= 0.0 {
		return Err(Error(runtime::log_of_non_positive(
			fragment.clone(),
		)));
	}
	finish(x.ln(), "LN", fragment)
}

pub fn power(
	base: &Value,
	exponent: &Value,
	fragment: &Fragment,
) -> Result<Value> {
	let b = approx(base, "POWER", fragment)?;
	let e = approx(exponent, "POWER", fragment)?;
	finish(b.powf(e), "POWER", fragment)
}

pub fn sqrt(value: &Value, fragment: &Fragment) -> Result<Value> {
	let x = approx(value, "SQRT", fragment)?;
	if x < 0.0 {
		return Err(Error(runtime::sqrt_of_negative(
			fragment.clone(),
		)));
	}
	finish(x.sqrt(), "SQRT", fragment)
}

fn approx(
	value: &Value,
	function: &str,
	fragment: &Fragment,
) -> Result<f64> {
	value.to_f64().ok_or_else(|| unsupported(function, value, fragment))
}

fn finish(result: f64, function: &str, fragment: &Fragment) -> Result<Value> {
	if result.is_nan() {
		return Err(Error(runtime::invalid_argument(
			fragment.clone(),
			function,
			"result is undefined",
		)));
	}
	if result.is_infinite() {
		return Err(Error(arithmetic::numeric_out_of_range(
			fragment.clone(),
			function,
		)));
	}
	Ok(Value::real(result))
}

fn unsupported(function: &str, value: &Value, fragment: &Fragment) -> Error {
	Error(arithmetic::unsupported_operand(
		fragment.clone(),
		function,
		value.kind(),
	))
}

#[cfg(test)]
mod tests {
	use super::*;

	const F: Fragment = Fragment::None;

	#[test]
	fn test_ceil_and_floor_keep_kind() {
		assert_eq!(ceil(&Value::Int(3), &F).unwrap(), Value::Int(3));
		assert_eq!(
			ceil(&Value::Numeric("1.2".parse().unwrap()), &F)
				.unwrap(),
			Value::Numeric("2".parse().unwrap())
		);
		assert_eq!(
			floor(&Value::Numeric("-1.2".parse().unwrap()), &F)
				.unwrap(),
			Value::Numeric("-2".parse().unwrap())
		);
		assert_eq!(
			floor(&Value::real(2.7), &F).unwrap(),
			Value::real(2.0)
		);
	}

	#[test]
	fn test_ln_domain() {
		assert_eq!(
			ln(&Value::real(1.0), &F).unwrap(),
			Value::real(0.0)
		);
		assert_eq!(
			ln(&Value::Int(0), &F).unwrap_err().code,
			"2201E"
		);
		assert_eq!(
			ln(&Value::Int(-3), &F).unwrap_err().code,
			"2201E"
		);
	}

	#[test]
	fn test_sqrt_domain() {
		assert_eq!(
			sqrt(&Value::Int(9), &F).unwrap(),
			Value::real(3.0)
		);
		assert_eq!(
			sqrt(&Value::Int(-1), &F).unwrap_err().code,
			"2201F"
		);
	}

	#[test]
	fn test_power_overflow() {
		assert_eq!(
			power(&Value::Int(2), &Value::Int(10), &F).unwrap(),
			Value::real(1024.0)
		);
		let error = power(&Value::real(1e308), &Value::Int(2), &F)
			.unwrap_err();
		assert_eq!(error.code, "22003");
	}

	#[test]
	fn test_exp() {
		assert_eq!(
			exp(&Value::Int(0), &F).unwrap(),
			Value::real(1.0)
		);
		let error = exp(&Value::utf8("x"), &F).unwrap_err();
		assert_eq!(error.code, "22005");
	}
}
