// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use super::{Date, Time};

pub(crate) const MICROS_PER_SEC: i64 = 1_000_000;
pub(crate) const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SEC;

/// A date and time of day, without timezone.
///
/// Internally stored as microseconds since the Unix epoch. Negative values
/// represent instants before 1970.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
	micros_since_epoch: i64,
}

impl Timestamp {
	pub fn new(date: Date, time: Time) -> Self {
		let days = date.to_days_since_epoch() as i64;
		let micros = (time.to_nanos_since_midnight() / 1_000) as i64;
		Self {
			micros_since_epoch: days * MICROS_PER_DAY + micros,
		}
	}

	pub fn from_micros_since_epoch(micros: i64) -> Self {
		Self {
			micros_since_epoch: micros,
		}
	}

	pub fn to_micros_since_epoch(&self) -> i64 {
		self.micros_since_epoch
	}

	pub fn date(&self) -> Date {
		let days = self.micros_since_epoch.div_euclid(MICROS_PER_DAY);
		// in-range by construction
		Date::from_days_since_epoch(days as i32).unwrap_or_default()
	}

	pub fn time(&self) -> Time {
		let micros = self.micros_since_epoch.rem_euclid(MICROS_PER_DAY);
		Time::from_nanos_since_midnight(micros as u64 * 1_000)
			.unwrap_or_default()
	}

	pub fn parse(value: &str) -> Option<Self> {
		let (date_part, time_part) = value
			.split_once(' ')
			.or_else(|| value.split_once('T'))?;
		let date = Date::parse(date_part)?;
		let time = Time::parse(time_part)?;
		Some(Self::new(date, time))
	}
}

impl Display for Timestamp {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} {}", self.date(), self.time())
	}
}

impl Serialize for Timestamp {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for Timestamp {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let text = String::deserialize(deserializer)?;
		Timestamp::parse(&text).ok_or_else(|| {
			de::Error::custom(format!("invalid timestamp: {}", text))
		})
	}
}
