// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

#[derive(
	Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct StatementLine(pub u32);

#[derive(
	Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub struct StatementColumn(pub u32);

/// A piece of source text attached to a node or diagnostic.
///
/// The graph owns its text, so only the owned representation exists here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fragment {
	/// No fragment information available
	None,

	/// Fragment from a statement with position information
	Statement {
		text: String,
		line: StatementLine,
		column: StatementColumn,
	},

	/// Fragment from internal/runtime code
	Internal {
		text: String,
	},
}

impl Fragment {
	/// Create a new statement fragment with default position
	pub fn new(text: impl Into<String>) -> Self {
		Fragment::Statement {
			text: text.into(),
			line: StatementLine(1),
			column: StatementColumn(0),
		}
	}

	pub fn new_at(
		text: impl Into<String>,
		line: StatementLine,
		column: StatementColumn,
	) -> Self {
		Fragment::Statement {
			text: text.into(),
			line,
			column,
		}
	}

	pub fn new_internal(text: impl Into<String>) -> Self {
		Fragment::Internal {
			text: text.into(),
		}
	}

	pub fn text(&self) -> &str {
		match self {
			Fragment::None => "",
			Fragment::Statement {
				text,
				..
			}
			| Fragment::Internal {
				text,
				..
			} => text,
		}
	}

	pub fn line(&self) -> StatementLine {
		match self {
			Fragment::Statement {
				line,
				..
			} => *line,
			_ => StatementLine(1),
		}
	}

	pub fn column(&self) -> StatementColumn {
		match self {
			Fragment::Statement {
				column,
				..
			} => *column,
			_ => StatementColumn(0),
		}
	}

	pub fn is_none(&self) -> bool {
		matches!(self, Fragment::None)
	}
}

impl Default for Fragment {
	fn default() -> Self {
		Fragment::None
	}
}

impl Display for Fragment {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.text())
	}
}
