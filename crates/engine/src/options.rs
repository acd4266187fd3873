// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

/// Resource limits enforced while a graph runs.
///
/// Every limit raises SQLSTATE 54001 when exceeded, which a handler can
/// catch like any other exception.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
	/// Iterations any single LOOP, WHILE, REPEAT or FOR may run.
	pub max_loop_iterations: u64,
	/// Depth of the activation stack: blocks, loop scopes, routine
	/// frames and handler frames all count.
	pub max_activation_depth: usize,
	/// Static depth of any expression handed to the evaluator.
	pub max_expression_depth: u32,
}

impl Default for ExecutionOptions {
	fn default() -> Self {
		Self {
			max_loop_iterations: 10_000,
			max_activation_depth: 128,
			max_expression_depth: 512,
		}
	}
}
