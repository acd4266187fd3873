// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! EXTRACT over the temporal kinds.

use emberdb_core::graph::FunctionModifier;
use emberdb_type::error::diagnostic::{arithmetic, runtime};
use emberdb_type::{Error, Fragment, Interval, Result, Value};

const MICROS_PER_SEC: i64 = 1_000_000;
const MICROS_PER_MIN: i64 = 60 * MICROS_PER_SEC;
const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MIN;

/// The named field of a date, time, timestamp or interval, as an
/// integer. Asking a DATE for its HOUR (or a TIME for its YEAR) is an
/// error rather than zero.
pub fn extract(
	field: Option<FunctionModifier>,
	value: &Value,
	fragment: &Fragment,
) -> Result<Value> {
	let field = match field {
		Some(field) => field,
		None => {
			return Err(Error(runtime::invalid_argument(
				fragment.clone(),
				"EXTRACT",
				"missing field",
			)));
		}
	};
	use FunctionModifier::*;
	let out = match value {
		Value::Date(date) => match field {
			Year => Some(date.year() as i64),
			Month => Some(date.month() as i64),
			Day => Some(date.day() as i64),
			_ => None,
		},
		Value::Time(time) => match field {
			Hour => Some(time.hour() as i64),
			Minute => Some(time.minute() as i64),
			Second => Some(time.second() as i64),
			_ => None,
		},
		Value::Timestamp(ts) => match field {
			Year => Some(ts.date().year() as i64),
			Month => Some(ts.date().month() as i64),
			Day => Some(ts.date().day() as i64),
			Hour => Some(ts.time().hour() as i64),
			Minute => Some(ts.time().minute() as i64),
			Second => Some(ts.time().second() as i64),
			_ => None,
		},
		Value::Interval(interval) => from_interval(interval, field),
		other => {
			return Err(Error(
				arithmetic::unsupported_operand(
					fragment.clone(),
					"EXTRACT",
					other.kind(),
				),
			));
		}
	};
	match out {
		Some(v) => Ok(Value::Int(v)),
		None => Err(Error(runtime::invalid_argument(
			fragment.clone(),
			"EXTRACT",
			&format!(
				"field {} does not apply to {}",
				field,
				value.kind()
			),
		))),
	}
}

fn from_interval(
	interval: &Interval,
	field: FunctionModifier,
) -> Option<i64> {
	use FunctionModifier::*;
	let micros = interval.micros();
	match field {
		Year => Some(interval.months() as i64 / 12),
		Month => Some(interval.months() as i64 % 12),
		Day => Some(interval.days() as i64),
		Hour => Some(micros / MICROS_PER_HOUR),
		Minute => Some((micros % MICROS_PER_HOUR) / MICROS_PER_MIN),
		Second => Some((micros % MICROS_PER_MIN) / MICROS_PER_SEC),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use emberdb_type::{Date, Time, Timestamp};

	use super::*;

	const F: Fragment = Fragment::None;

	fn date() -> Value {
		Value::Date(Date::new(2024, 2, 29).unwrap())
	}

	#[test]
	fn test_extract_from_date() {
		let cases = [
			(FunctionModifier::Year, 2024),
			(FunctionModifier::Month, 2),
			(FunctionModifier::Day, 29),
		];
		for (field, expected) in cases {
			assert_eq!(
				extract(Some(field), &date(), &F).unwrap(),
				Value::Int(expected)
			);
		}
		let error =
			extract(Some(FunctionModifier::Hour), &date(), &F)
				.unwrap_err();
		assert_eq!(error.code, "22023");
	}

	#[test]
	fn test_extract_from_timestamp() {
		let ts = Value::Timestamp(Timestamp::new(
			Date::new(2024, 2, 29).unwrap(),
			Time::new(13, 45, 30, 0).unwrap(),
		));
		assert_eq!(
			extract(Some(FunctionModifier::Hour), &ts, &F)
				.unwrap(),
			Value::Int(13)
		);
		assert_eq!(
			extract(Some(FunctionModifier::Year), &ts, &F)
				.unwrap(),
			Value::Int(2024)
		);
	}

	#[test]
	fn test_extract_from_interval() {
		let interval = Value::Interval(Interval::new(
			26,
			3,
			2 * MICROS_PER_HOUR + 30 * MICROS_PER_MIN
				+ 15 * MICROS_PER_SEC,
		));
		let cases = [
			(FunctionModifier::Year, 2),
			(FunctionModifier::Month, 2),
			(FunctionModifier::Day, 3),
			(FunctionModifier::Hour, 2),
			(FunctionModifier::Minute, 30),
			(FunctionModifier::Second, 15),
		];
		for (field, expected) in cases {
			assert_eq!(
				extract(Some(field), &interval, &F).unwrap(),
				Value::Int(expected),
				"{field}"
			);
		}
	}

	#[test]
	fn test_extract_needs_temporal_operand() {
		let error = extract(
			Some(FunctionModifier::Year),
			&Value::Int(1),
			&F,
		)
		.unwrap_err();
		assert_eq!(error.code, "22005");
	}
}
