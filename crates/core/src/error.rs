// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use emberdb_type::{Diagnostic, Error, Fragment};

use crate::graph::{BinaryOp, NodeId, NodeKind};

/// Validation failures while building or rewriting the statement graph.
///
/// These surface before anything executes, so they carry the statement
/// fragment of the offending construct rather than runtime state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
	#[error("node {id} referenced before it was published")]
	Dangling {
		id: NodeId,
	},

	#[error("node {id} cannot change from {was} to {now}")]
	KindChange {
		id: NodeId,
		was: NodeKind,
		now: NodeKind,
	},

	#[error("{op} cannot be quantified, only comparisons can")]
	NotAComparison {
		op: BinaryOp,
		fragment: Fragment,
	},

	#[error("{code:?} is not a valid SQLSTATE")]
	BadSqlstate {
		code: String,
		fragment: Fragment,
	},

	#[error("a handler for class {class:?} would never fire")]
	UncatchableCondition {
		class: String,
		fragment: Fragment,
	},

	#[error("CASE requires at least one WHEN arm")]
	EmptyCase {
		fragment: Fragment,
	},

	#[error("{construct} is missing a required operand")]
	MissingOperand {
		construct: String,
		fragment: Fragment,
	},

	#[error("{function} needs an OVER clause")]
	WindowRequired {
		function: String,
		fragment: Fragment,
	},

	#[error("assignment target must be a variable or field reference")]
	NotAssignable {
		fragment: Fragment,
	},

	#[error("there is no enclosing loop to leave or iterate")]
	NoEnclosingLoop {
		fragment: Fragment,
	},

	#[error("duplicate parameter name {name:?}")]
	DuplicateParameter {
		name: String,
		fragment: Fragment,
	},

	#[error("label {label:?} is not a surrounding loop or block")]
	UnknownLabel {
		label: String,
		fragment: Fragment,
	},
}

impl GraphError {
	fn fragment(&self) -> Fragment {
		match self {
			GraphError::Dangling {
				..
			}
			| GraphError::KindChange {
				..
			} => Fragment::None,
			GraphError::NotAComparison {
				fragment,
				..
			}
			| GraphError::BadSqlstate {
				fragment,
				..
			}
			| GraphError::UncatchableCondition {
				fragment,
				..
			}
			| GraphError::EmptyCase {
				fragment,
			}
			| GraphError::MissingOperand {
				fragment,
				..
			}
			| GraphError::WindowRequired {
				fragment,
				..
			}
			| GraphError::NotAssignable {
				fragment,
			}
			| GraphError::NoEnclosingLoop {
				fragment,
			}
			| GraphError::DuplicateParameter {
				fragment,
				..
			}
			| GraphError::UnknownLabel {
				fragment,
				..
			} => fragment.clone(),
		}
	}

	pub fn to_diagnostic(&self) -> Diagnostic {
		let code = match self {
			GraphError::Dangling {
				..
			}
			| GraphError::KindChange {
				..
			} => "INTERNAL_ERROR",
			_ => "42000",
		};
		Diagnostic::new(code, self.to_string())
			.with_fragment(self.fragment())
	}
}

impl From<GraphError> for Error {
	fn from(error: GraphError) -> Self {
		Error(error.to_diagnostic())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_build_errors_are_syntax_class() {
		let error = GraphError::BadSqlstate {
			code: "22".to_string(),
			fragment: Fragment::None,
		};
		let diagnostic = error.to_diagnostic();
		assert_eq!(diagnostic.code, "42000");
		assert!(diagnostic.message.contains("22"));
	}

	#[test]
	fn test_dangling_is_internal() {
		let error = GraphError::Dangling {
			id: NodeId(9),
		};
		assert_eq!(error.to_diagnostic().code, "INTERNAL_ERROR");
	}

	#[test]
	fn test_converts_to_error() {
		let error: Error = GraphError::EmptyCase {
			fragment: Fragment::None,
		}
		.into();
		assert_eq!(error.code, "42000");
	}
}
