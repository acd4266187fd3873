// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use super::timestamp::{MICROS_PER_DAY, MICROS_PER_SEC};
use super::{Date, Time, Timestamp};

/// A duration of time, kept as separate month, day and microsecond
/// components.
///
/// Months and days are not collapsed into each other because their lengths
/// vary: adding one month to 2024-01-31 lands on 2024-02-29, not 30 days
/// later.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Interval {
	months: i32,
	days: i32,
	micros: i64,
}

impl Interval {
	pub fn new(months: i32, days: i32, micros: i64) -> Self {
		Self {
			months,
			days,
			micros,
		}
	}

	pub fn from_months(months: i32) -> Self {
		Self::new(months, 0, 0)
	}

	pub fn from_days(days: i32) -> Self {
		Self::new(0, days, 0)
	}

	pub fn from_micros(micros: i64) -> Self {
		Self::new(0, 0, micros)
	}

	pub fn from_seconds(seconds: i64) -> Self {
		Self::new(0, 0, seconds * MICROS_PER_SEC)
	}

	pub fn months(&self) -> i32 {
		self.months
	}

	pub fn days(&self) -> i32 {
		self.days
	}

	pub fn micros(&self) -> i64 {
		self.micros
	}

	pub fn is_zero(&self) -> bool {
		self.months == 0 && self.days == 0 && self.micros == 0
	}

	pub fn negate(&self) -> Self {
		Self::new(-self.months, -self.days, -self.micros)
	}

	pub fn checked_add(&self, other: &Self) -> Option<Self> {
		Some(Self::new(
			self.months.checked_add(other.months)?,
			self.days.checked_add(other.days)?,
			self.micros.checked_add(other.micros)?,
		))
	}

	pub fn checked_sub(&self, other: &Self) -> Option<Self> {
		self.checked_add(&other.negate())
	}

	/// Parse an ISO-8601 duration such as `P1Y2M3DT4H5M6.5S`. A leading
	/// `-` negates the whole interval.
	pub fn parse(value: &str) -> Option<Self> {
		let (value, negative) = match value.strip_prefix('-') {
			Some(rest) => (rest, true),
			None => (value, false),
		};
		let rest = value.strip_prefix('P')?;
		let (date_part, time_part) = match rest.split_once('T') {
			Some((date, time)) => (date, Some(time)),
			None => (rest, None),
		};

		let mut months = 0i64;
		let mut days = 0i64;
		let mut micros = 0i64;

		let mut digits = String::new();
		for c in date_part.chars() {
			if c.is_ascii_digit()
				|| (c == '-' && digits.is_empty())
			{
				digits.push(c);
				continue;
			}
			let n: i64 = digits.parse().ok()?;
			digits.clear();
			match c {
				'Y' => months = months.checked_add(n.checked_mul(12)?)?,
				'M' => months = months.checked_add(n)?,
				'W' => days = days.checked_add(n.checked_mul(7)?)?,
				'D' => days = days.checked_add(n)?,
				_ => return None,
			}
		}
		if !digits.is_empty() {
			return None;
		}

		if let Some(time_part) = time_part {
			if time_part.is_empty() {
				return None;
			}
			for c in time_part.chars() {
				if c.is_ascii_digit()
					|| c == '.'
					|| (c == '-' && digits.is_empty())
				{
					digits.push(c);
					continue;
				}
				let scale = match c {
					'H' => 3_600 * MICROS_PER_SEC,
					'M' => 60 * MICROS_PER_SEC,
					'S' => MICROS_PER_SEC,
					_ => return None,
				};
				let n: f64 = digits.parse().ok()?;
				digits.clear();
				if c != 'S' && n.fract() != 0.0 {
					return None;
				}
				let part = (n * scale as f64).round();
				if !part.is_finite()
					|| part.abs() > i64::MAX as f64
				{
					return None;
				}
				micros = micros.checked_add(part as i64)?;
			}
			if !digits.is_empty() {
				return None;
			}
		}

		let result = Self::new(
			i32::try_from(months).ok()?,
			i32::try_from(days).ok()?,
			micros,
		);
		Some(if negative {
			result.negate()
		} else {
			result
		})
	}

	/// Add this interval to a date. The time component is ignored unless
	/// it amounts to whole days.
	pub fn add_to_date(&self, date: Date) -> Option<Date> {
		let with_months = if self.months != 0 {
			shift_months(date, self.months)?
		} else {
			date
		};
		let extra_days = self.micros.div_euclid(MICROS_PER_DAY);
		let days = with_months
			.to_days_since_epoch()
			.checked_add(self.days)?
			.checked_add(i32::try_from(extra_days).ok()?)?;
		Date::from_days_since_epoch(days)
	}

	pub fn add_to_timestamp(&self, ts: Timestamp) -> Option<Timestamp> {
		let date = if self.months != 0 {
			shift_months(ts.date(), self.months)?
		} else {
			ts.date()
		};
		let base = Timestamp::new(date, ts.time());
		let shift = (self.days as i64)
			.checked_mul(MICROS_PER_DAY)?
			.checked_add(self.micros)?;
		let micros =
			base.to_micros_since_epoch().checked_add(shift)?;
		Some(Timestamp::from_micros_since_epoch(micros))
	}

	/// Add this interval to a time of day, wrapping around midnight.
	pub fn add_to_time(&self, time: Time) -> Option<Time> {
		if self.months != 0 || self.days != 0 {
			return None;
		}
		let nanos = time.to_nanos_since_midnight() as i64
			+ self.micros.rem_euclid(MICROS_PER_DAY) * 1_000;
		let nanos = nanos.rem_euclid(MICROS_PER_DAY * 1_000);
		Time::from_nanos_since_midnight(nanos as u64)
	}
}

/// Move a date by whole months, clamping the day to the target month's
/// length.
fn shift_months(date: Date, months: i32) -> Option<Date> {
	let total = (date.year() as i64) * 12
		+ (date.month() as i64 - 1)
		+ months as i64;
	let year = i32::try_from(total.div_euclid(12)).ok()?;
	let month = total.rem_euclid(12) as u32 + 1;
	let mut day = date.day();
	loop {
		if let Some(result) = Date::new(year, month, day) {
			return Some(result);
		}
		if day <= 28 {
			return None;
		}
		day -= 1;
	}
}

impl Display for Interval {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if self.is_zero() {
			return write!(f, "PT0S");
		}
		write!(f, "P")?;
		let years = self.months / 12;
		let months = self.months % 12;
		if years != 0 {
			write!(f, "{}Y", years)?;
		}
		if months != 0 {
			write!(f, "{}M", months)?;
		}
		if self.days != 0 {
			write!(f, "{}D", self.days)?;
		}
		if self.micros != 0 {
			write!(f, "T")?;
			let hours = self.micros / (3_600 * MICROS_PER_SEC);
			let minutes = (self.micros / (60 * MICROS_PER_SEC)) % 60;
			let seconds = (self.micros / MICROS_PER_SEC) % 60;
			let frac = self.micros % MICROS_PER_SEC;
			if hours != 0 {
				write!(f, "{}H", hours)?;
			}
			if minutes != 0 {
				write!(f, "{}M", minutes)?;
			}
			if seconds != 0 || frac != 0 {
				if frac != 0 {
					// seconds and frac share the sign of
					// micros, so print it once
					let sign = if self.micros < 0 {
						"-"
					} else {
						""
					};
					let mut text =
						format!("{:06}", frac.abs());
					while text.ends_with('0') {
						text.pop();
					}
					write!(
						f,
						"{}{}.{}S",
						sign,
						seconds.abs(),
						text
					)?;
				} else {
					write!(f, "{}S", seconds)?;
				}
			}
		}
		Ok(())
	}
}

impl Serialize for Interval {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for Interval {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let text = String::deserialize(deserializer)?;
		Interval::parse(&text).ok_or_else(|| {
			de::Error::custom(format!("invalid interval: {}", text))
		})
	}
}
