// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use emberdb_type::Result;
use parking_lot::RwLock;

use super::{Node, NodeId, NodeKind};
use crate::error::GraphError;

/// The arena holding every published node.
///
/// Nodes are immutable; republishing an id swaps the whole node for a new
/// value of the same category, which is how copy-on-write rewrites work.
/// Lookups hand out `Arc`s, so readers are never invalidated by later
/// publishes.
pub struct NodeStore {
	nodes: RwLock<HashMap<NodeId, Arc<Node>>>,
	next: AtomicU64,
}

impl Default for NodeStore {
	fn default() -> Self {
		Self::new()
	}
}

impl NodeStore {
	pub fn new() -> Self {
		Self {
			nodes: RwLock::new(HashMap::new()),
			next: AtomicU64::new(1),
		}
	}

	/// Reserve a fresh id. Ids are monotonic and survive republishing.
	pub fn allocate(&self) -> NodeId {
		NodeId(self.next.fetch_add(1, Ordering::Relaxed))
	}

	/// Publish a node under its id. A republish must keep the node's
	/// category; an expression can never become a statement.
	pub fn publish(&self, node: Node) -> Result<()> {
		let mut nodes = self.nodes.write();
		if let Some(existing) = nodes.get(&node.id) {
			if !existing.kind.same_category(&node.kind) {
				return Err(GraphError::KindChange {
					id: node.id,
					was: existing.kind.clone(),
					now: node.kind.clone(),
				}
				.into());
			}
		}
		nodes.insert(node.id, Arc::new(node));
		Ok(())
	}

	pub fn contains(&self, id: NodeId) -> bool {
		self.nodes.read().contains_key(&id)
	}

	pub fn lookup(&self, id: NodeId) -> Result<Arc<Node>> {
		self.nodes
			.read()
			.get(&id)
			.cloned()
			.ok_or_else(|| GraphError::Dangling {
				id,
			}
			.into())
	}

	pub fn len(&self) -> usize {
		self.nodes.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.read().is_empty()
	}

	/// Deep-copy the subtree under `root` into fresh ids and return the
	/// new root together with the id translation that was applied.
	///
	/// Children are relocated before parents, so every copied node's
	/// references already point into the copy.
	pub fn relocate(
		&self,
		root: NodeId,
	) -> Result<(NodeId, HashMap<NodeId, NodeId>)> {
		let mut map = HashMap::new();
		self.relocate_into(root, &mut map)?;
		let new_root = map.get(&root).copied().unwrap_or(root);
		Ok((new_root, map))
	}

	fn relocate_into(
		&self,
		id: NodeId,
		map: &mut HashMap<NodeId, NodeId>,
	) -> Result<()> {
		if map.contains_key(&id) {
			return Ok(());
		}
		let node = self.lookup(id)?;
		// reserve before recursing so shared subtrees copy once
		map.insert(id, self.allocate());
		for child in node.children() {
			self.relocate_into(child, map)?;
		}
		self.publish(node.fix(map))?;
		Ok(())
	}

	/// Structural equivalence of two subtrees: same shapes, same literal
	/// payloads, ignoring ids, fragments and inferred domains. Shared
	/// subtrees within a single node compare conservatively.
	pub fn matches(&self, left: NodeId, right: NodeId) -> Result<bool> {
		if left == right {
			return Ok(true);
		}
		let a = self.lookup(left)?;
		let b = self.lookup(right)?;
		if !self.kinds_align(&a, &b) {
			return Ok(false);
		}
		let left_children = a.children();
		let right_children = b.children();
		if left_children.len() != right_children.len() {
			return Ok(false);
		}
		for (ca, cb) in left_children.iter().zip(right_children.iter())
		{
			if !self.matches(*ca, *cb)? {
				return Ok(false);
			}
		}
		Ok(true)
	}

	/// Compare two nodes' payloads with their child references
	/// normalized to matching placeholders.
	fn kinds_align(&self, a: &Node, b: &Node) -> bool {
		let normalize = |node: &Node| -> NodeKind {
			let mut map = HashMap::new();
			for (index, child) in
				node.children().into_iter().enumerate()
			{
				map.insert(child, NodeId(index as u64));
			}
			node.kind.fix(&map)
		};
		normalize(a) == normalize(b)
	}
}

#[cfg(test)]
mod tests {
	use emberdb_type::{DomainId, Fragment, Value};

	use super::*;
	use crate::graph::{BinaryOp, ExpressionNode};

	fn publish_literal(store: &NodeStore, value: i64) -> NodeId {
		let id = store.allocate();
		store.publish(Node {
			id,
			depth: 1,
			domain: DomainId::INTEGER,
			fragment: Fragment::None,
			kind: NodeKind::Expression(ExpressionNode::Literal(
				Value::Int(value),
			)),
		})
		.unwrap();
		id
	}

	fn publish_add(store: &NodeStore, left: NodeId, right: NodeId) -> NodeId {
		let id = store.allocate();
		store.publish(Node {
			id,
			depth: 2,
			domain: DomainId::INTEGER,
			fragment: Fragment::None,
			kind: NodeKind::Expression(ExpressionNode::Binary {
				op: BinaryOp::Add,
				left,
				right,
			}),
		})
		.unwrap();
		id
	}

	#[test]
	fn test_allocate_is_monotonic() {
		let store = NodeStore::new();
		let a = store.allocate();
		let b = store.allocate();
		assert!(b.0 > a.0);
	}

	#[test]
	fn test_lookup_dangling_is_internal_error() {
		let store = NodeStore::new();
		let error = store.lookup(NodeId(99)).unwrap_err();
		assert_eq!(error.code, "INTERNAL_ERROR");
	}

	#[test]
	fn test_republish_keeps_category() {
		let store = NodeStore::new();
		let id = publish_literal(&store, 1);
		// same category is fine
		store.publish(Node {
			id,
			depth: 1,
			domain: DomainId::INTEGER,
			fragment: Fragment::None,
			kind: NodeKind::Expression(ExpressionNode::Literal(
				Value::Int(2),
			)),
		})
		.unwrap();
		// category change is rejected
		let error = store
			.publish(Node {
				id,
				depth: 1,
				domain: DomainId::CONTENT,
				fragment: Fragment::None,
				kind: NodeKind::Statement(
					crate::graph::StatementNode::Break {
						label: None,
					},
				),
			})
			.unwrap_err();
		assert_eq!(error.code, "INTERNAL_ERROR");
		let kept = store.lookup(id).unwrap();
		assert_eq!(
			kept.expression(),
			Some(&ExpressionNode::Literal(Value::Int(2)))
		);
	}

	#[test]
	fn test_relocate_copies_subtree() {
		let store = NodeStore::new();
		let left = publish_literal(&store, 1);
		let right = publish_literal(&store, 2);
		let root = publish_add(&store, left, right);

		let (new_root, map) = store.relocate(root).unwrap();
		assert_ne!(new_root, root);
		assert_eq!(map.len(), 3);

		let copy = store.lookup(new_root).unwrap();
		let children = copy.children();
		assert_eq!(children.len(), 2);
		assert_ne!(children[0], left);
		assert_eq!(
			store.lookup(children[0]).unwrap().expression(),
			Some(&ExpressionNode::Literal(Value::Int(1)))
		);
		// original untouched
		let original = store.lookup(root).unwrap();
		assert_eq!(original.children().as_slice(), &[left, right]);
	}

	#[test]
	fn test_matches_ignores_ids() {
		let store = NodeStore::new();
		let a = publish_add(
			&store,
			publish_literal(&store, 1),
			publish_literal(&store, 2),
		);
		let b = publish_add(
			&store,
			publish_literal(&store, 1),
			publish_literal(&store, 2),
		);
		let c = publish_add(
			&store,
			publish_literal(&store, 1),
			publish_literal(&store, 3),
		);
		assert!(store.matches(a, b).unwrap());
		assert!(!store.matches(a, c).unwrap());
	}

	#[test]
	fn test_relocated_subtree_matches_original() {
		let store = NodeStore::new();
		let root = publish_add(
			&store,
			publish_literal(&store, 4),
			publish_literal(&store, 5),
		);
		let (copy, _) = store.relocate(root).unwrap();
		assert!(store.matches(root, copy).unwrap());
	}
}
