// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Structural matching of expression subgraphs.
//!
//! A grouping clause pairs its key expressions with the select items
//! that repeat them, so accumulation needs to recognise that two nodes
//! spell the same expression even when they were published separately.

use std::collections::HashMap;

use emberdb_core::NodeId;
use emberdb_type::Result;

use crate::context::ExecutionContext;

/// Whether two nodes spell the same expression.
///
/// Two nodes match when they are the same node, when the context
/// declares them equivalent, or when their kinds agree once child
/// references are erased and their children match pairwise.
pub fn matches(
	ctx: &ExecutionContext<'_>,
	left: NodeId,
	right: NodeId,
) -> Result<bool> {
	if left == right || ctx.matched(left, right) {
		return Ok(true);
	}
	let left = ctx.lookup(left)?;
	let right = ctx.lookup(right)?;
	if left.expression().is_none() || right.expression().is_none() {
		return Ok(false);
	}
	let left_children = left.children();
	let right_children = right.children();
	if left_children.len() != right_children.len() {
		return Ok(false);
	}
	// erase every child reference, then the kinds must be identical
	let erase: HashMap<NodeId, NodeId> = left_children
		.iter()
		.chain(right_children.iter())
		.map(|child| (*child, NodeId(0)))
		.collect();
	if left.fix(&erase).kind != right.fix(&erase).kind {
		return Ok(false);
	}
	for (left, right) in left_children.iter().zip(right_children.iter()) {
		if !matches(ctx, *left, *right)? {
			return Ok(false);
		}
	}
	Ok(true)
}
