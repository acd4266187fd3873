// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use super::Diagnostic;
use crate::fragment::Fragment;

/// A scalar subquery or SELECT INTO produced more than one row.
pub fn cardinality_violation(fragment: Fragment) -> Diagnostic {
	Diagnostic::new("21000", "cardinality violation")
		.with_fragment(fragment)
		.with_label("expected at most one row")
}

/// A CASE statement without an ELSE arm matched nothing.
pub fn case_not_found(fragment: Fragment) -> Diagnostic {
	Diagnostic::new("20000", "case not found for case statement")
		.with_fragment(fragment)
		.with_help("add an ELSE arm or cover every value")
}

pub fn subscript_out_of_range(
	fragment: Fragment,
	index: i64,
	len: usize,
) -> Diagnostic {
	Diagnostic::new(
		"22003",
		format!(
			"subscript {} is outside the collection of {} elements",
			index, len
		),
	)
	.with_fragment(fragment)
}

pub fn invalid_argument(
	fragment: Fragment,
	function: &str,
	detail: &str,
) -> Diagnostic {
	Diagnostic::new(
		"22023",
		format!("invalid argument to {}: {}", function, detail),
	)
	.with_fragment(fragment)
}

pub fn log_of_non_positive(fragment: Fragment) -> Diagnostic {
	Diagnostic::new("2201E", "logarithm of a non-positive number")
		.with_fragment(fragment)
}

pub fn sqrt_of_negative(fragment: Fragment) -> Diagnostic {
	Diagnostic::new("2201F", "square root of a negative number")
		.with_fragment(fragment)
}

pub fn substring_error(fragment: Fragment) -> Diagnostic {
	Diagnostic::new("22011", "substring error")
		.with_fragment(fragment)
		.with_label("negative substring length")
}

pub fn trim_error(fragment: Fragment) -> Diagnostic {
	Diagnostic::new("22027", "trim error")
		.with_fragment(fragment)
		.with_label("the trim character must be a single character")
}

pub fn invalid_escape_character(
	fragment: Fragment,
	escape: &str,
) -> Diagnostic {
	Diagnostic::new("22019", "invalid escape character")
		.with_fragment(fragment)
		.with_label(format!(
			"the escape clause must be a single character, got {:?}",
			escape
		))
}

/// The escape character appeared at the end of a LIKE pattern with
/// nothing after it to escape.
pub fn invalid_escape_sequence(fragment: Fragment) -> Diagnostic {
	Diagnostic::new("22025", "invalid escape sequence")
		.with_fragment(fragment)
		.with_label("the escape character must be followed by a character")
}

pub fn limit_exceeded(
	fragment: Fragment,
	what: &str,
	limit: u64,
) -> Diagnostic {
	Diagnostic::new(
		"54001",
		format!("{} exceeded the configured limit of {}", what, limit),
	)
	.with_fragment(fragment)
	.with_help("raise the execution limit if the workload is legitimate")
}

/// Execution was cancelled from outside. Class 57 is never handler
/// catchable.
pub fn cancelled() -> Diagnostic {
	Diagnostic::new("57014", "statement cancelled")
}
