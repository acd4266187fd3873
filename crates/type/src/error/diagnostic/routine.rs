// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use super::Diagnostic;
use crate::fragment::Fragment;

pub fn unknown_routine(fragment: Fragment, name: &str) -> Diagnostic {
	Diagnostic::new(
		"42883",
		format!("routine {} does not exist", name),
	)
	.with_fragment(fragment)
	.with_help("routines must be defined before they are called")
}

pub fn argument_count_mismatch(
	fragment: Fragment,
	name: &str,
	expected: usize,
	actual: usize,
) -> Diagnostic {
	Diagnostic::new(
		"07001",
		format!(
			"routine {} takes {} arguments but {} were supplied",
			name, expected, actual
		),
	)
	.with_fragment(fragment)
}

pub fn unknown_identifier(fragment: Fragment, name: &str) -> Diagnostic {
	Diagnostic::new("42703", format!("{} is not defined", name))
		.with_fragment(fragment)
}

pub fn unknown_field(
	fragment: Fragment,
	field: &str,
	of: &str,
) -> Diagnostic {
	Diagnostic::new(
		"42703",
		format!("{} has no field {}", of, field),
	)
	.with_fragment(fragment)
}

pub fn readonly_argument(fragment: Fragment, name: &str) -> Diagnostic {
	Diagnostic::new(
		"22005",
		format!(
			"argument for OUT parameter {} must be an assignable variable",
			name
		),
	)
	.with_fragment(fragment)
}
