// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Window frames.
//!
//! A [`Frame`] decides, per current row, which partition rows feed the
//! window aggregate. Both ends are tested independently: ROWS bounds
//! count positions, RANGE bounds measure distance in the first order
//! key using ordinary domain arithmetic, so a date key takes interval
//! offsets. The EXCLUDE clause filters rows the bounds admitted.

use std::cmp::Ordering;

use emberdb_core::graph::{FrameExclude, FrameUnit};
use emberdb_type::error::diagnostic::runtime;
use emberdb_type::{Error, Fragment, Result, Value, domain::arith};

use super::Partition;

/// A frame bound with its distance expression already evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedBound {
	UnboundedPreceding,
	Preceding(Value),
	CurrentRow,
	Following(Value),
	UnboundedFollowing,
}

/// A fully resolved window frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
	pub unit: FrameUnit,
	pub low: ResolvedBound,
	pub high: ResolvedBound,
	pub exclude: FrameExclude,
}

impl Frame {
	pub fn new(
		unit: FrameUnit,
		low: ResolvedBound,
		high: ResolvedBound,
		exclude: FrameExclude,
	) -> Self {
		Self {
			unit,
			low,
			high,
			exclude,
		}
	}

	/// The frame used when a window gives none: RANGE BETWEEN UNBOUNDED
	/// PRECEDING AND CURRENT ROW.
	pub fn default_range() -> Self {
		Self::new(
			FrameUnit::Range,
			ResolvedBound::UnboundedPreceding,
			ResolvedBound::CurrentRow,
			FrameExclude::NoOthers,
		)
	}

	/// Does the row at `candidate` belong to the frame of the row at
	/// `bookmark`? Both are partition positions.
	pub fn admits(
		&self,
		partition: &Partition,
		bookmark: usize,
		candidate: usize,
		fragment: &Fragment,
	) -> Result<bool> {
		if !self.starts_by(partition, bookmark, candidate, fragment)?
		{
			return Ok(false);
		}
		if !self.ends_by(partition, bookmark, candidate, fragment)? {
			return Ok(false);
		}
		Ok(match self.exclude {
			FrameExclude::NoOthers => true,
			FrameExclude::CurrentRow => candidate != bookmark,
			FrameExclude::Ties => {
				candidate == bookmark
					|| !partition.peers(candidate, bookmark)
			}
		})
	}

	fn starts_by(
		&self,
		partition: &Partition,
		bookmark: usize,
		candidate: usize,
		fragment: &Fragment,
	) -> Result<bool> {
		match (&self.low, self.unit) {
			(ResolvedBound::UnboundedPreceding, _) => Ok(true),
			(ResolvedBound::UnboundedFollowing, _) => Ok(false),
			(ResolvedBound::CurrentRow, FrameUnit::Rows) => {
				Ok(candidate >= bookmark)
			}
			(ResolvedBound::CurrentRow, FrameUnit::Range) => {
				// the frame starts at the first peer
				Ok(partition.compare(candidate, bookmark)
					!= Ordering::Less)
			}
			(
				ResolvedBound::Preceding(distance),
				FrameUnit::Rows,
			) => {
				let n = row_distance(distance, fragment)?;
				Ok(candidate + n >= bookmark)
			}
			(
				ResolvedBound::Following(distance),
				FrameUnit::Rows,
			) => {
				let n = row_distance(distance, fragment)?;
				Ok(candidate >= bookmark + n)
			}
			(
				ResolvedBound::Preceding(distance),
				FrameUnit::Range,
			) => self.key_within(
				partition, bookmark, candidate, distance,
				Edge::Start, Side::Preceding, fragment,
			),
			(
				ResolvedBound::Following(distance),
				FrameUnit::Range,
			) => self.key_within(
				partition, bookmark, candidate, distance,
				Edge::Start, Side::Following, fragment,
			),
		}
	}

	fn ends_by(
		&self,
		partition: &Partition,
		bookmark: usize,
		candidate: usize,
		fragment: &Fragment,
	) -> Result<bool> {
		match (&self.high, self.unit) {
			(ResolvedBound::UnboundedFollowing, _) => Ok(true),
			(ResolvedBound::UnboundedPreceding, _) => Ok(false),
			(ResolvedBound::CurrentRow, FrameUnit::Rows) => {
				Ok(candidate <= bookmark)
			}
			(ResolvedBound::CurrentRow, FrameUnit::Range) => {
				// the frame ends at the last peer
				Ok(partition.compare(candidate, bookmark)
					!= Ordering::Greater)
			}
			(
				ResolvedBound::Preceding(distance),
				FrameUnit::Rows,
			) => {
				let n = row_distance(distance, fragment)?;
				Ok(candidate + n <= bookmark)
			}
			(
				ResolvedBound::Following(distance),
				FrameUnit::Rows,
			) => {
				let n = row_distance(distance, fragment)?;
				Ok(candidate <= bookmark + n)
			}
			(
				ResolvedBound::Preceding(distance),
				FrameUnit::Range,
			) => self.key_within(
				partition, bookmark, candidate, distance,
				Edge::End, Side::Preceding, fragment,
			),
			(
				ResolvedBound::Following(distance),
				FrameUnit::Range,
			) => self.key_within(
				partition, bookmark, candidate, distance,
				Edge::End, Side::Following, fragment,
			),
		}
	}

	/// RANGE offset test against the first order key. The threshold is
	/// the bookmark's key shifted by `distance` along the sort
	/// direction; the candidate passes when its key lies on the frame
	/// side of the threshold.
	#[allow(clippy::too_many_arguments)]
	fn key_within(
		&self,
		partition: &Partition,
		bookmark: usize,
		candidate: usize,
		distance: &Value,
		edge: Edge,
		side: Side,
		fragment: &Fragment,
	) -> Result<bool> {
		let anchor = match partition
			.row(bookmark)
			.and_then(|row| row.key.first())
		{
			Some(key) => key,
			None => {
				return Err(Error(
					runtime::invalid_argument(
						fragment.clone(),
						"RANGE",
						"a frame offset needs an ORDER BY key",
					),
				));
			}
		};
		let key = match partition
			.row(candidate)
			.and_then(|row| row.key.first())
		{
			Some(key) => key,
			None => return Ok(false),
		};
		let descending =
			partition.descending().first().copied().unwrap_or(false);
		// moving "forward" in the sort means adding when ascending
		// and subtracting when descending
		let forward = matches!(side, Side::Following) != descending;
		let threshold = if forward {
			arith::add(anchor, distance, fragment)?
		} else {
			arith::subtract(anchor, distance, fragment)?
		};
		match arith::compare(key, &threshold, fragment)? {
			Some(ordering) => Ok(match (edge, descending) {
				// at or after the threshold in sort order
				(Edge::Start, false) => {
					ordering != Ordering::Less
				}
				(Edge::Start, true) => {
					ordering != Ordering::Greater
				}
				// at or before the threshold in sort order
				(Edge::End, false) => {
					ordering != Ordering::Greater
				}
				(Edge::End, true) => {
					ordering != Ordering::Less
				}
			}),
			// a null key only frames other nulls
			None => Ok(key.is_null() && threshold.is_null()),
		}
	}
}

#[derive(Clone, Copy)]
enum Edge {
	Start,
	End,
}

#[derive(Clone, Copy)]
enum Side {
	Preceding,
	Following,
}

fn row_distance(distance: &Value, fragment: &Fragment) -> Result<usize> {
	match distance.as_int() {
		Some(n) if n >= 0 => Ok(n as usize),
		_ => Err(Error(runtime::invalid_argument(
			fragment.clone(),
			"ROWS",
			"frame offset must be a non-negative integer",
		))),
	}
}
