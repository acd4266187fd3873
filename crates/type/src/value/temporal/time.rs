// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

pub(crate) const NANOS_PER_SEC: u64 = 1_000_000_000;
pub(crate) const NANOS_PER_MIN: u64 = 60 * NANOS_PER_SEC;
pub(crate) const NANOS_PER_HOUR: u64 = 60 * NANOS_PER_MIN;
pub(crate) const NANOS_PER_DAY: u64 = 24 * NANOS_PER_HOUR;

/// A time of day without date information.
///
/// Internally stored as nanoseconds since midnight, always less than a full
/// day.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Time {
	nanos_since_midnight: u64,
}

impl Time {
	pub fn new(hour: u32, minute: u32, second: u32, nano: u32) -> Option<Self> {
		if hour > 23
			|| minute > 59 || second > 59
			|| nano >= NANOS_PER_SEC as u32
		{
			return None;
		}
		Some(Self {
			nanos_since_midnight: hour as u64 * NANOS_PER_HOUR
				+ minute as u64 * NANOS_PER_MIN
				+ second as u64 * NANOS_PER_SEC
				+ nano as u64,
		})
	}

	pub fn from_nanos_since_midnight(nanos: u64) -> Option<Self> {
		if nanos >= NANOS_PER_DAY {
			return None;
		}
		Some(Self {
			nanos_since_midnight: nanos,
		})
	}

	pub fn hour(&self) -> u32 {
		(self.nanos_since_midnight / NANOS_PER_HOUR) as u32
	}

	pub fn minute(&self) -> u32 {
		((self.nanos_since_midnight % NANOS_PER_HOUR) / NANOS_PER_MIN)
			as u32
	}

	pub fn second(&self) -> u32 {
		((self.nanos_since_midnight % NANOS_PER_MIN) / NANOS_PER_SEC)
			as u32
	}

	pub fn nanosecond(&self) -> u32 {
		(self.nanos_since_midnight % NANOS_PER_SEC) as u32
	}

	pub fn to_nanos_since_midnight(&self) -> u64 {
		self.nanos_since_midnight
	}

	pub fn parse(value: &str) -> Option<Self> {
		let (hms, frac) = match value.split_once('.') {
			Some((hms, frac)) => (hms, Some(frac)),
			None => (value, None),
		};
		let mut parts = hms.split(':');
		let hour: u32 = parts.next()?.parse().ok()?;
		let minute: u32 = parts.next()?.parse().ok()?;
		let second: u32 = match parts.next() {
			Some(s) => s.parse().ok()?,
			None => 0,
		};
		if parts.next().is_some() {
			return None;
		}
		let nano = match frac {
			Some(frac) => {
				if frac.is_empty() || frac.len() > 9 {
					return None;
				}
				let digits: u32 = frac.parse().ok()?;
				digits * 10u32.pow(9 - frac.len() as u32)
			}
			None => 0,
		};
		Self::new(hour, minute, second, nano)
	}
}

impl Display for Time {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"{:02}:{:02}:{:02}",
			self.hour(),
			self.minute(),
			self.second()
		)?;
		let nano = self.nanosecond();
		if nano != 0 {
			let mut frac = format!("{:09}", nano);
			while frac.ends_with('0') {
				frac.pop();
			}
			write!(f, ".{}", frac)?;
		}
		Ok(())
	}
}

impl Serialize for Time {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for Time {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let text = String::deserialize(deserializer)?;
		Time::parse(&text).ok_or_else(|| {
			de::Error::custom(format!("invalid time: {}", text))
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_new_and_accessors() {
		let time = Time::new(13, 45, 30, 123_000_000).unwrap();
		assert_eq!(time.hour(), 13);
		assert_eq!(time.minute(), 45);
		assert_eq!(time.second(), 30);
		assert_eq!(time.nanosecond(), 123_000_000);
	}

	#[test]
	fn test_invalid_components() {
		assert!(Time::new(24, 0, 0, 0).is_none());
		assert!(Time::new(0, 60, 0, 0).is_none());
		assert!(Time::new(0, 0, 60, 0).is_none());
		assert!(Time::new(0, 0, 0, 1_000_000_000).is_none());
	}

	#[test]
	fn test_display() {
		let time = Time::new(9, 5, 0, 0).unwrap();
		assert_eq!(format!("{}", time), "09:05:00");

		let time = Time::new(23, 59, 59, 500_000_000).unwrap();
		assert_eq!(format!("{}", time), "23:59:59.5");
	}

	#[test]
	fn test_parse() {
		assert_eq!(Time::parse("13:45:30"), Time::new(13, 45, 30, 0));
		assert_eq!(Time::parse("13:45"), Time::new(13, 45, 0, 0));
		assert_eq!(
			Time::parse("00:00:01.25"),
			Time::new(0, 0, 1, 250_000_000)
		);
		assert!(Time::parse("25:00:00").is_none());
		assert!(Time::parse("13").is_none());
	}

	#[test]
	fn test_ordering() {
		let early = Time::new(8, 0, 0, 0).unwrap();
		let late = Time::new(20, 0, 0, 0).unwrap();
		assert!(early < late);
	}
}
