// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

pub mod arithmetic;
pub mod cast;
pub mod cursor;
pub mod internal;
pub mod render;
pub mod routine;
pub mod runtime;
pub mod signal;

use serde::{Deserialize, Serialize};

use crate::fragment::{Fragment, StatementColumn, StatementLine};

/// A structured description of an error condition.
///
/// `code` is either a five character SQLSTATE, in which case the condition
/// can be caught by handlers, or an internal identifier such as
/// `INTERNAL_ERROR`, which is always fatal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
	pub code: String,
	pub statement: Option<String>,
	pub message: String,
	pub column: Option<StatementColumn>,
	pub fragment: Fragment,
	pub label: Option<String>,
	pub help: Option<String>,
	pub notes: Vec<String>,
	pub cause: Option<Box<Diagnostic>>,
}

impl Diagnostic {
	pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			code: code.into(),
			statement: None,
			message: message.into(),
			column: None,
			fragment: Fragment::None,
			label: None,
			help: None,
			notes: Vec::new(),
			cause: None,
		}
	}

	pub fn with_fragment(mut self, fragment: Fragment) -> Self {
		if matches!(fragment, Fragment::Statement { .. }) {
			self.column = Some(fragment.column());
		}
		self.fragment = fragment;
		self
	}

	pub fn with_label(mut self, label: impl Into<String>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn with_help(mut self, help: impl Into<String>) -> Self {
		self.help = Some(help.into());
		self
	}

	pub fn with_note(mut self, note: impl Into<String>) -> Self {
		self.notes.push(note.into());
		self
	}

	pub fn with_cause(mut self, cause: Diagnostic) -> Self {
		self.cause = Some(Box::new(cause));
		self
	}

	pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
		self.statement = Some(statement.into());
		self
	}

	/// The code, when it is a five character SQLSTATE.
	pub fn sqlstate(&self) -> Option<&str> {
		let code = self.code.as_str();
		if code.len() == 5
			&& code.bytes().all(|b| {
				b.is_ascii_digit() || b.is_ascii_uppercase()
			}) {
			Some(code)
		} else {
			None
		}
	}

	pub fn line(&self) -> Option<StatementLine> {
		match &self.fragment {
			Fragment::Statement {
				line,
				..
			} => Some(*line),
			_ => None,
		}
	}
}
