// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use super::Diagnostic;
use crate::fragment::Fragment;

pub fn already_open(fragment: Fragment, name: &str) -> Diagnostic {
	Diagnostic::new(
		"24000",
		format!("cursor {} is already open", name),
	)
	.with_fragment(fragment)
}

pub fn not_open(fragment: Fragment, name: &str) -> Diagnostic {
	Diagnostic::new("24000", format!("cursor {} is not open", name))
		.with_fragment(fragment)
		.with_help("OPEN the cursor before fetching or closing it")
}

pub fn undeclared(fragment: Fragment, name: &str) -> Diagnostic {
	Diagnostic::new(
		"24000",
		format!("cursor {} has not been declared", name),
	)
	.with_fragment(fragment)
}

/// The completion condition raised when a fetch moves past the available
/// rows. Class 02 so that NOT FOUND handlers can catch it.
pub fn no_data(fragment: Fragment) -> Diagnostic {
	Diagnostic::new("02000", "no data").with_fragment(fragment)
}

pub fn fetch_arity_mismatch(
	fragment: Fragment,
	targets: usize,
	columns: usize,
) -> Diagnostic {
	Diagnostic::new(
		"22005",
		format!(
			"fetch has {} targets for {} cursor columns",
			targets, columns
		),
	)
	.with_fragment(fragment)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_cursor_state_codes() {
		assert_eq!(already_open(Fragment::None, "c").code, "24000");
		assert_eq!(not_open(Fragment::None, "c").code, "24000");
		assert_eq!(undeclared(Fragment::None, "c").code, "24000");
	}

	#[test]
	fn test_no_data_is_completion_class() {
		let diagnostic = no_data(Fragment::None);
		assert_eq!(diagnostic.code, "02000");
		assert!(diagnostic.sqlstate().is_some());
	}
}
