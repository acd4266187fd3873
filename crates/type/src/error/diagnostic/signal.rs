// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use super::Diagnostic;
use crate::condition::Condition;
use crate::fragment::Fragment;

/// A condition reached the top of the activation stack without finding a
/// handler.
pub fn unhandled_condition(
	condition: &Condition,
	fragment: Fragment,
) -> Diagnostic {
	condition.to_diagnostic(fragment)
}

pub fn resignal_outside_handler(fragment: Fragment) -> Diagnostic {
	Diagnostic::new("0K000", "RESIGNAL with no active condition")
		.with_fragment(fragment)
		.with_help("RESIGNAL is only meaningful inside a handler body")
}

pub fn invalid_sqlstate(fragment: Fragment, code: &str) -> Diagnostic {
	Diagnostic::new(
		"42000",
		format!("{:?} is not a valid SQLSTATE value", code),
	)
	.with_fragment(fragment)
	.with_help("a SQLSTATE is five digits or upper-case letters")
}
