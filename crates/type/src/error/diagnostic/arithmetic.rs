// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use super::Diagnostic;
use crate::domain::DomainKind;
use crate::fragment::Fragment;

pub fn division_by_zero(fragment: Fragment) -> Diagnostic {
	Diagnostic::new("22012", "division by zero")
		.with_fragment(fragment)
		.with_label("divisor evaluates to zero")
		.with_help("guard the divisor with NULLIF or a conditional")
}

pub fn numeric_out_of_range(fragment: Fragment, detail: &str) -> Diagnostic {
	Diagnostic::new("22003", "numeric value out of range")
		.with_fragment(fragment)
		.with_label(detail.to_string())
}

pub fn unsupported_operands(
	fragment: Fragment,
	operator: &str,
	left: DomainKind,
	right: DomainKind,
) -> Diagnostic {
	Diagnostic::new(
		"22005",
		format!(
			"operator {} is not defined for {} and {}",
			operator, left, right
		),
	)
	.with_fragment(fragment)
}

pub fn unsupported_operand(
	fragment: Fragment,
	operator: &str,
	operand: DomainKind,
) -> Diagnostic {
	Diagnostic::new(
		"22005",
		format!(
			"operator {} is not defined for {}",
			operator, operand
		),
	)
	.with_fragment(fragment)
}

pub fn datetime_overflow(fragment: Fragment) -> Diagnostic {
	Diagnostic::new("22008", "datetime field overflow")
		.with_fragment(fragment)
}

pub fn incomparable(
	fragment: Fragment,
	left: DomainKind,
	right: DomainKind,
) -> Diagnostic {
	Diagnostic::new(
		"22005",
		format!("cannot compare {} with {}", left, right),
	)
	.with_fragment(fragment)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_division_by_zero_code() {
		let diagnostic = division_by_zero(Fragment::None);
		assert_eq!(diagnostic.code, "22012");
		assert_eq!(diagnostic.sqlstate(), Some("22012"));
	}

	#[test]
	fn test_unsupported_operands_message() {
		let diagnostic = unsupported_operands(
			Fragment::None,
			"+",
			DomainKind::Boolean,
			DomainKind::Date,
		);
		assert_eq!(diagnostic.code, "22005");
		assert!(diagnostic.message.contains("BOOLEAN"));
		assert!(diagnostic.message.contains("DATE"));
	}
}
