// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use smallvec::SmallVec;

use super::NodeId;

/// One ORDER BY item of a window specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderItem {
	pub expr: NodeId,
	pub desc: bool,
}

/// Whether frame bounds count rows or measure distance in the order key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameUnit {
	Rows,
	Range,
}

impl Display for FrameUnit {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			FrameUnit::Rows => "ROWS",
			FrameUnit::Range => "RANGE",
		})
	}
}

/// One end of a window frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBound {
	UnboundedPreceding,
	/// The node is the distance expression.
	Preceding(NodeId),
	CurrentRow,
	Following(NodeId),
	UnboundedFollowing,
}

impl FrameBound {
	pub fn distance(&self) -> Option<NodeId> {
		match self {
			FrameBound::Preceding(node)
			| FrameBound::Following(node) => Some(*node),
			_ => None,
		}
	}
}

/// Rows removed from the frame after the bounds have selected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameExclude {
	#[default]
	NoOthers,
	CurrentRow,
	Ties,
}

/// A window specification attached to a function call.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
	/// The row source the window ranges over.
	pub source: NodeId,
	pub partition: Vec<NodeId>,
	pub order: Vec<OrderItem>,
	pub unit: FrameUnit,
	pub low: FrameBound,
	pub high: FrameBound,
	pub exclude: FrameExclude,
}

impl WindowSpec {
	/// The default frame: RANGE BETWEEN UNBOUNDED PRECEDING AND CURRENT
	/// ROW.
	pub fn over(source: NodeId) -> Self {
		Self {
			source,
			partition: Vec::new(),
			order: Vec::new(),
			unit: FrameUnit::Range,
			low: FrameBound::UnboundedPreceding,
			high: FrameBound::CurrentRow,
			exclude: FrameExclude::NoOthers,
		}
	}

	pub(crate) fn collect_children(&self, out: &mut SmallVec<[NodeId; 8]>) {
		out.push(self.source);
		out.extend(self.partition.iter().copied());
		out.extend(self.order.iter().map(|item| item.expr));
		if let Some(node) = self.low.distance() {
			out.push(node);
		}
		if let Some(node) = self.high.distance() {
			out.push(node);
		}
	}

	pub(crate) fn fix(&self, map: &HashMap<NodeId, NodeId>) -> Self {
		let relocate = |id: NodeId| map.get(&id).copied().unwrap_or(id);
		let fix_bound = |bound: FrameBound| match bound {
			FrameBound::Preceding(node) => {
				FrameBound::Preceding(relocate(node))
			}
			FrameBound::Following(node) => {
				FrameBound::Following(relocate(node))
			}
			other => other,
		};
		Self {
			source: relocate(self.source),
			partition: self
				.partition
				.iter()
				.map(|id| relocate(*id))
				.collect(),
			order: self
				.order
				.iter()
				.map(|item| OrderItem {
					expr: relocate(item.expr),
					desc: item.desc,
				})
				.collect(),
			unit: self.unit,
			low: fix_bound(self.low),
			high: fix_bound(self.high),
			exclude: self.exclude,
		}
	}
}
