// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Diagnostic;
use crate::fragment::Fragment;
use crate::value::Value;

/// Condition classes that can never be caught by a handler: transaction
/// rollback (40), invalid transaction state (25) and invalid transaction
/// termination (2D) always propagate to the caller.
pub const UNCATCHABLE_CLASSES: [&str; 3] = ["25", "2D", "40"];

/// SQLSTATE raised by SIGNAL when no explicit code is given.
pub const DEFAULT_SIGNAL_STATE: &str = "45000";

/// The named slots of a condition that SIGNAL can set and GET DIAGNOSTICS
/// can read.
#[derive(
	Copy,
	Clone,
	Debug,
	PartialEq,
	Eq,
	Hash,
	PartialOrd,
	Ord,
	Serialize,
	Deserialize,
)]
pub enum DiagnosticsItem {
	/// Rows affected by the last statement. Statement level, not part of
	/// a condition.
	RowCount,
	/// Number of conditions in the diagnostics area.
	Number,
	ReturnedSqlstate,
	MessageText,
	ClassOrigin,
	SubclassOrigin,
	ConstraintName,
	SchemaName,
	TableName,
	ColumnName,
	CursorName,
}

impl DiagnosticsItem {
	pub fn parse(name: &str) -> Option<Self> {
		Some(match name {
			"ROW_COUNT" => Self::RowCount,
			"NUMBER" => Self::Number,
			"RETURNED_SQLSTATE" => Self::ReturnedSqlstate,
			"MESSAGE_TEXT" => Self::MessageText,
			"CLASS_ORIGIN" => Self::ClassOrigin,
			"SUBCLASS_ORIGIN" => Self::SubclassOrigin,
			"CONSTRAINT_NAME" => Self::ConstraintName,
			"SCHEMA_NAME" => Self::SchemaName,
			"TABLE_NAME" => Self::TableName,
			"COLUMN_NAME" => Self::ColumnName,
			"CURSOR_NAME" => Self::CursorName,
			_ => return None,
		})
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::RowCount => "ROW_COUNT",
			Self::Number => "NUMBER",
			Self::ReturnedSqlstate => "RETURNED_SQLSTATE",
			Self::MessageText => "MESSAGE_TEXT",
			Self::ClassOrigin => "CLASS_ORIGIN",
			Self::SubclassOrigin => "SUBCLASS_ORIGIN",
			Self::ConstraintName => "CONSTRAINT_NAME",
			Self::SchemaName => "SCHEMA_NAME",
			Self::TableName => "TABLE_NAME",
			Self::ColumnName => "COLUMN_NAME",
			Self::CursorName => "CURSOR_NAME",
		}
	}
}

impl Display for DiagnosticsItem {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

/// A raised condition travelling through handler dispatch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
	code: String,
	items: IndexMap<DiagnosticsItem, Value>,
}

impl Condition {
	pub fn new(code: impl Into<String>) -> Self {
		Self {
			code: code.into(),
			items: IndexMap::new(),
		}
	}

	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.items.insert(
			DiagnosticsItem::MessageText,
			Value::Utf8(message.into()),
		);
		self
	}

	pub fn with_item(mut self, item: DiagnosticsItem, value: Value) -> Self {
		self.items.insert(item, value);
		self
	}

	pub fn code(&self) -> &str {
		&self.code
	}

	/// Replace the SQLSTATE, as RESIGNAL with an explicit code does.
	pub fn set_code(&mut self, code: impl Into<String>) {
		self.code = code.into();
	}

	/// The first two characters of the SQLSTATE.
	pub fn class(&self) -> &str {
		self.code.get(..2).unwrap_or(&self.code)
	}

	pub fn message(&self) -> Option<&str> {
		match self.items.get(&DiagnosticsItem::MessageText) {
			Some(Value::Utf8(text)) => Some(text.as_str()),
			_ => None,
		}
	}

	pub fn item(&self, item: DiagnosticsItem) -> Option<&Value> {
		self.items.get(&item)
	}

	pub fn set_item(&mut self, item: DiagnosticsItem, value: Value) {
		self.items.insert(item, value);
	}

	pub fn items(&self) -> impl Iterator<Item = (DiagnosticsItem, &Value)> {
		self.items.iter().map(|(item, value)| (*item, value))
	}

	pub fn is_uncatchable(&self) -> bool {
		UNCATCHABLE_CLASSES.contains(&self.class())
	}

	/// Completion rather than exception: the 01 (warning) and 02 (no
	/// data) classes.
	pub fn is_warning(&self) -> bool {
		self.class() == "01"
	}

	pub fn is_no_data(&self) -> bool {
		self.class() == "02"
	}

	pub fn is_exception(&self) -> bool {
		!self.is_warning() && !self.is_no_data()
	}

	/// Build a condition from a diagnostic whose code is a SQLSTATE.
	/// Diagnostics with internal codes are not raisable and return
	/// `None`.
	pub fn from_diagnostic(diagnostic: &Diagnostic) -> Option<Self> {
		let code = diagnostic.sqlstate()?;
		let mut condition = Condition::new(code)
			.with_message(diagnostic.message.clone());
		condition.set_item(
			DiagnosticsItem::ReturnedSqlstate,
			Value::Utf8(code.to_string()),
		);
		Some(condition)
	}

	/// Render the condition back into a diagnostic, for reporting an
	/// unhandled raise.
	pub fn to_diagnostic(&self, fragment: Fragment) -> Diagnostic {
		let message = self
			.message()
			.map(|text| text.to_string())
			.unwrap_or_else(|| {
				format!("condition {}", self.code)
			});
		let mut diagnostic = Diagnostic::new(self.code.clone(), message)
			.with_fragment(fragment);
		for (item, value) in self.items() {
			if item == DiagnosticsItem::MessageText {
				continue;
			}
			diagnostic = diagnostic
				.with_note(format!("{} = {}", item, value));
		}
		diagnostic
	}
}

impl Display for Condition {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self.message() {
			Some(message) => {
				write!(f, "{}: {}", self.code, message)
			}
			None => f.write_str(&self.code),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_class_and_catchability() {
		assert_eq!(Condition::new("22012").class(), "22");
		assert!(!Condition::new("22012").is_uncatchable());
		assert!(Condition::new("40001").is_uncatchable());
		assert!(Condition::new("25000").is_uncatchable());
		assert!(Condition::new("2D000").is_uncatchable());
	}

	#[test]
	fn test_generic_classes() {
		assert!(Condition::new("01004").is_warning());
		assert!(Condition::new("02000").is_no_data());
		assert!(Condition::new("22012").is_exception());
		assert!(!Condition::new("02000").is_exception());
	}

	#[test]
	fn test_from_diagnostic() {
		let diagnostic = Diagnostic::new("22012", "division by zero");
		let condition =
			Condition::from_diagnostic(&diagnostic).unwrap();
		assert_eq!(condition.code(), "22012");
		assert_eq!(condition.message(), Some("division by zero"));
		assert_eq!(
			condition.item(DiagnosticsItem::ReturnedSqlstate),
			Some(&Value::Utf8("22012".to_string()))
		);
	}

	#[test]
	fn test_internal_code_is_not_raisable() {
		let diagnostic = Diagnostic::new("INTERNAL_ERROR", "boom");
		assert!(Condition::from_diagnostic(&diagnostic).is_none());
	}

	#[test]
	fn test_items_parse_roundtrip() {
		for item in [
			DiagnosticsItem::RowCount,
			DiagnosticsItem::MessageText,
			DiagnosticsItem::ReturnedSqlstate,
			DiagnosticsItem::CursorName,
		] {
			assert_eq!(
				DiagnosticsItem::parse(item.name()),
				Some(item)
			);
		}
		assert_eq!(DiagnosticsItem::parse("NOT_AN_ITEM"), None);
	}
}
