// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! The immutable statement graph.
//!
//! Programs are graphs of [`Node`] values held in a [`NodeStore`]. Nodes
//! reference each other by [`NodeId`] and never by pointer, so a published
//! subtree can be shared, snapshotted and relocated without touching the
//! nodes themselves.

pub mod build;
pub mod expr;
pub mod stmt;
pub mod store;
pub mod window;

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use emberdb_type::{DomainId, Fragment};
use smallvec::SmallVec;

pub use build::{GraphBuilder, is_sqlstate, verify_labels};
pub use expr::{
	BinaryOp, ExpressionNode, FunctionCall, FunctionKind,
	FunctionModifier, PeriodOp, UnaryOp,
};
pub use stmt::{
	FetchHow, GENERIC_CONDITIONS, HandlerDisposition, Parameter,
	ParameterMode, RoutineNode, StatementNode,
};
pub use store::NodeStore;
pub use window::{
	FrameBound, FrameExclude, FrameUnit, OrderItem, WindowSpec,
};

/// Stable identity of a node. Ids are never reused within a store.
#[derive(
	Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct NodeId(pub u64);

impl Display for NodeId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "node#{}", self.0)
	}
}

/// The payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
	Expression(ExpressionNode),
	Statement(StatementNode),
	Routine(RoutineNode),
}

impl NodeKind {
	pub fn category(&self) -> &'static str {
		match self {
			NodeKind::Expression(_) => "expression",
			NodeKind::Statement(_) => "statement",
			NodeKind::Routine(_) => "routine",
		}
	}

	pub fn same_category(&self, other: &NodeKind) -> bool {
		matches!(
			(self, other),
			(NodeKind::Expression(_), NodeKind::Expression(_))
				| (NodeKind::Statement(_), NodeKind::Statement(_))
				| (NodeKind::Routine(_), NodeKind::Routine(_))
		)
	}

	fn collect_children(&self, out: &mut SmallVec<[NodeId; 8]>) {
		match self {
			NodeKind::Expression(node) => {
				node.collect_children(out)
			}
			NodeKind::Statement(node) => {
				node.collect_children(out)
			}
			NodeKind::Routine(node) => node.collect_children(out),
		}
	}

	fn fix(&self, map: &HashMap<NodeId, NodeId>) -> Self {
		match self {
			NodeKind::Expression(node) => {
				NodeKind::Expression(node.fix(map))
			}
			NodeKind::Statement(node) => {
				NodeKind::Statement(node.fix(map))
			}
			NodeKind::Routine(node) => {
				NodeKind::Routine(node.fix(map))
			}
		}
	}
}

impl Display for NodeKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.category())
	}
}

/// One node of the graph.
///
/// `depth` is one more than the deepest child, so evaluators can bound
/// recursion without walking first. `domain` is the statically inferred
/// result domain; [`DomainId::CONTENT`] when nothing better is known.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
	pub id: NodeId,
	pub depth: u32,
	pub domain: DomainId,
	pub fragment: Fragment,
	pub kind: NodeKind,
}

impl Node {
	pub fn children(&self) -> SmallVec<[NodeId; 8]> {
		let mut out = SmallVec::new();
		self.kind.collect_children(&mut out);
		out
	}

	/// Rewrite this node under an id translation, remapping its own id
	/// and every child reference that appears in the map.
	pub fn fix(&self, map: &HashMap<NodeId, NodeId>) -> Node {
		Node {
			id: map.get(&self.id).copied().unwrap_or(self.id),
			depth: self.depth,
			domain: self.domain,
			fragment: self.fragment.clone(),
			kind: self.kind.fix(map),
		}
	}

	pub fn expression(&self) -> Option<&ExpressionNode> {
		match &self.kind {
			NodeKind::Expression(node) => Some(node),
			_ => None,
		}
	}

	pub fn statement(&self) -> Option<&StatementNode> {
		match &self.kind {
			NodeKind::Statement(node) => Some(node),
			_ => None,
		}
	}

	pub fn routine(&self) -> Option<&RoutineNode> {
		match &self.kind {
			NodeKind::Routine(node) => Some(node),
			_ => None,
		}
	}
}
