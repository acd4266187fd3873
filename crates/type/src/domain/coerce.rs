// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode};
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};

use super::{Domain, DomainKind, DomainProvider};
use crate::Result;
use crate::error::Error;
use crate::error::diagnostic::{arithmetic, cast};
use crate::fragment::Fragment;
use crate::value::{
	Date, Decimal, Interval, Multiset, RowValue, Time, Timestamp, Value,
};

/// Convert a value into the given domain, raising a data exception when the
/// value has no representation there.
///
/// Null and pending pass through every domain. Conversions follow the usual
/// cast rules: exact numerics truncate toward zero when narrowed to
/// integers, any value converts to text through its display form, and text
/// converts to other domains by parsing.
pub fn coerce(
	value: Value,
	domain: &Domain,
	provider: &dyn DomainProvider,
	fragment: &Fragment,
) -> Result<Value> {
	if value.is_null() || value.is_pending() {
		return Ok(value);
	}
	match domain.kind() {
		DomainKind::Content => Ok(value),
		DomainKind::Boolean => to_boolean(value, fragment),
		DomainKind::Integer => to_integer(value, fragment),
		DomainKind::Numeric => to_numeric(value, fragment),
		DomainKind::Real => to_real(value, fragment),
		DomainKind::Character => Ok(Value::Utf8(value.to_string())),
		DomainKind::Date => to_date(value, fragment),
		DomainKind::Time => to_time(value, fragment),
		DomainKind::Timestamp => to_timestamp(value, fragment),
		DomainKind::Interval => to_interval(value, fragment),
		DomainKind::Row => to_row(value, domain, provider, fragment),
		DomainKind::Array => {
			to_array(value, domain, provider, fragment)
		}
		DomainKind::Multiset => {
			to_multiset(value, domain, provider, fragment)
		}
	}
}

fn mismatch(kind: DomainKind, value: &Value, fragment: &Fragment) -> Error {
	Error(cast::cannot_coerce(fragment.clone(), kind, value))
}

fn bad_text(kind: DomainKind, text: &str, fragment: &Fragment) -> Error {
	Error(cast::invalid_text(fragment.clone(), kind, text))
}

fn to_boolean(value: Value, fragment: &Fragment) -> Result<Value> {
	match value {
		Value::Boolean(_) => Ok(value),
		Value::Utf8(ref text) => {
			let trimmed = text.trim();
			if trimmed.eq_ignore_ascii_case("true") {
				Ok(Value::Boolean(true))
			} else if trimmed.eq_ignore_ascii_case("false") {
				Ok(Value::Boolean(false))
			} else {
				Err(bad_text(
					DomainKind::Boolean,
					text,
					fragment,
				))
			}
		}
		_ => Err(mismatch(DomainKind::Boolean, &value, fragment)),
	}
}

fn shrink(value: BigInt) -> Value {
	match value.to_i64() {
		Some(small) => Value::Int(small),
		None => Value::Integer(value),
	}
}

fn to_integer(value: Value, fragment: &Fragment) -> Result<Value> {
	match value {
		Value::Int(_) | Value::Integer(_) => Ok(value),
		Value::Numeric(ref decimal) => {
			let truncated = decimal
				.inner()
				.with_scale_round(0, RoundingMode::Down);
			let (digits, _) = truncated.into_bigint_and_exponent();
			Ok(shrink(digits))
		}
		Value::Real(real) => {
			let truncated = real.value().trunc();
			match BigInt::from_f64(truncated) {
				Some(wide) => Ok(shrink(wide)),
				None => Err(Error(
					arithmetic::numeric_out_of_range(
						fragment.clone(),
						"real value has no integer form",
					),
				)),
			}
		}
		Value::Utf8(ref text) => {
			let trimmed = text.trim();
			if let Ok(small) = trimmed.parse::<i64>() {
				return Ok(Value::Int(small));
			}
			BigInt::from_str(trimmed).map(shrink).map_err(|_| {
				bad_text(DomainKind::Integer, text, fragment)
			})
		}
		_ => Err(mismatch(DomainKind::Integer, &value, fragment)),
	}
}

fn to_numeric(value: Value, fragment: &Fragment) -> Result<Value> {
	match value {
		Value::Numeric(_) => Ok(value),
		Value::Int(small) => {
			Ok(Value::numeric(BigDecimal::from(small)))
		}
		Value::Integer(ref wide) => {
			Ok(Value::numeric(BigDecimal::from(wide.clone())))
		}
		Value::Real(real) => BigDecimal::try_from(real.value())
			.map(Value::numeric)
			.map_err(|_| {
				Error(arithmetic::numeric_out_of_range(
					fragment.clone(),
					"real value has no exact decimal form",
				))
			}),
		Value::Utf8(ref text) => {
			Decimal::from_str(text.trim()).map(Value::Numeric).map_err(
				|_| {
					bad_text(
						DomainKind::Numeric,
						text,
						fragment,
					)
				},
			)
		}
		_ => Err(mismatch(DomainKind::Numeric, &value, fragment)),
	}
}

fn to_real(value: Value, fragment: &Fragment) -> Result<Value> {
	let out_of_range = || {
		Error(arithmetic::numeric_out_of_range(
			fragment.clone(),
			"value is outside the real range",
		))
	};
	match value {
		Value::Real(_) => Ok(value),
		Value::Int(_) | Value::Integer(_) | Value::Numeric(_) => {
			let wide = value.to_f64().ok_or_else(out_of_range)?;
			if !wide.is_finite() {
				return Err(out_of_range());
			}
			Ok(Value::real(wide))
		}
		Value::Utf8(ref text) => {
			let parsed: f64 = text.trim().parse().map_err(|_| {
				bad_text(DomainKind::Real, text, fragment)
			})?;
			if !parsed.is_finite() {
				return Err(out_of_range());
			}
			Ok(Value::real(parsed))
		}
		_ => Err(mismatch(DomainKind::Real, &value, fragment)),
	}
}

fn to_date(value: Value, fragment: &Fragment) -> Result<Value> {
	match value {
		Value::Date(_) => Ok(value),
		Value::Timestamp(ts) => Ok(Value::Date(ts.date())),
		Value::Utf8(ref text) => Date::parse(text.trim())
			.map(Value::Date)
			.ok_or_else(|| {
				bad_text(DomainKind::Date, text, fragment)
			}),
		_ => Err(mismatch(DomainKind::Date, &value, fragment)),
	}
}

fn to_time(value: Value, fragment: &Fragment) -> Result<Value> {
	match value {
		Value::Time(_) => Ok(value),
		Value::Timestamp(ts) => Ok(Value::Time(ts.time())),
		Value::Utf8(ref text) => Time::parse(text.trim())
			.map(Value::Time)
			.ok_or_else(|| {
				bad_text(DomainKind::Time, text, fragment)
			}),
		_ => Err(mismatch(DomainKind::Time, &value, fragment)),
	}
}

fn to_timestamp(value: Value, fragment: &Fragment) -> Result<Value> {
	match value {
		Value::Timestamp(_) => Ok(value),
		Value::Date(date) => Ok(Value::Timestamp(Timestamp::new(
			date,
			Time::default(),
		))),
		Value::Utf8(ref text) => Timestamp::parse(text.trim())
			.map(Value::Timestamp)
			.ok_or_else(|| {
				bad_text(
					DomainKind::Timestamp,
					text,
					fragment,
				)
			}),
		_ => Err(mismatch(DomainKind::Timestamp, &value, fragment)),
	}
}

fn to_interval(value: Value, fragment: &Fragment) -> Result<Value> {
	match value {
		Value::Interval(_) => Ok(value),
		Value::Utf8(ref text) => Interval::parse(text.trim())
			.map(Value::Interval)
			.ok_or_else(|| {
				bad_text(DomainKind::Interval, text, fragment)
			}),
		_ => Err(mismatch(DomainKind::Interval, &value, fragment)),
	}
}

fn resolve(
	provider: &dyn DomainProvider,
	id: super::DomainId,
) -> Result<Domain> {
	provider.lookup(id)
		.ok_or_else(|| crate::internal_error!("unknown {}", id))
}

fn to_row(
	value: Value,
	domain: &Domain,
	provider: &dyn DomainProvider,
	fragment: &Fragment,
) -> Result<Value> {
	let Value::Row(row) = value else {
		return Err(mismatch(DomainKind::Row, &value, fragment));
	};
	let Some(shape) = domain.shape() else {
		return Ok(Value::Row(row));
	};
	if row.len() != shape.len() {
		return Err(Error(cast::row_arity_mismatch(
			fragment.clone(),
			shape.len(),
			row.len(),
		)));
	}
	let shape = shape.clone();
	let mut fields = Vec::with_capacity(shape.len());
	for (index, value) in row.into_values().enumerate() {
		let (name, id) = match (
			shape.column_name(index),
			shape.domain_at(index),
		) {
			(Some(name), Some(id)) => (name.to_string(), id),
			_ => return Err(crate::internal_error!(
				"row shape lost column {}",
				index
			)),
		};
		let field_domain = resolve(provider, id)?;
		let coerced =
			coerce(value, &field_domain, provider, fragment)?;
		fields.push((name, coerced));
	}
	Ok(Value::row(RowValue::new(fields)))
}

fn to_array(
	value: Value,
	domain: &Domain,
	provider: &dyn DomainProvider,
	fragment: &Fragment,
) -> Result<Value> {
	let Value::Array(elements) = value else {
		return Err(mismatch(DomainKind::Array, &value, fragment));
	};
	let Some(element_id) = domain.element() else {
		return Ok(Value::Array(elements));
	};
	let element_domain = resolve(provider, element_id)?;
	let mut coerced = Vec::with_capacity(elements.len());
	for element in elements {
		coerced.push(coerce(
			element,
			&element_domain,
			provider,
			fragment,
		)?);
	}
	Ok(Value::Array(coerced))
}

fn to_multiset(
	value: Value,
	domain: &Domain,
	provider: &dyn DomainProvider,
	fragment: &Fragment,
) -> Result<Value> {
	let Value::Multiset(set) = value else {
		return Err(mismatch(DomainKind::Multiset, &value, fragment));
	};
	let Some(element_id) = domain.element() else {
		return Ok(Value::Multiset(set));
	};
	let element_domain = resolve(provider, element_id)?;
	let mut coerced = Multiset::new();
	for (element, count) in set.iter() {
		coerced.insert_count(
			coerce(
				element.clone(),
				&element_domain,
				provider,
				fragment,
			)?,
			count,
		);
	}
	Ok(Value::multiset(coerced))
}
