// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use super::Diagnostic;
use crate::domain::DomainKind;
use crate::fragment::Fragment;
use crate::value::Value;

pub fn cannot_coerce(
	fragment: Fragment,
	target: DomainKind,
	value: &Value,
) -> Diagnostic {
	Diagnostic::new(
		"22005",
		format!("cannot coerce {} value to {}", value.kind(), target),
	)
	.with_fragment(fragment)
	.with_label(format!("value is {}", value))
}

pub fn invalid_text(
	fragment: Fragment,
	target: DomainKind,
	text: &str,
) -> Diagnostic {
	Diagnostic::new(
		"22005",
		format!("text does not parse as {}", target),
	)
	.with_fragment(fragment)
	.with_label(format!("offending text: {:?}", text))
}

pub fn row_arity_mismatch(
	fragment: Fragment,
	expected: usize,
	actual: usize,
) -> Diagnostic {
	Diagnostic::new(
		"22005",
		format!(
			"row has {} fields where {} are expected",
			actual, expected
		),
	)
	.with_fragment(fragment)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_cannot_coerce() {
		let diagnostic = cannot_coerce(
			Fragment::None,
			DomainKind::Date,
			&Value::Boolean(true),
		);
		assert_eq!(diagnostic.code, "22005");
		assert!(diagnostic.message.contains("BOOLEAN"));
		assert!(diagnostic.message.contains("DATE"));
	}

	#[test]
	fn test_invalid_text() {
		let diagnostic = invalid_text(
			Fragment::None,
			DomainKind::Integer,
			"twelve",
		);
		assert_eq!(diagnostic.code, "22005");
		assert!(diagnostic.label.as_deref().unwrap().contains("twelve"));
	}
}
