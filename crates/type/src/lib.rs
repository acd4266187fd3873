// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Value, domain and diagnostic primitives shared by every emberdb crate.

pub mod condition;
pub mod domain;
pub mod error;
pub mod fragment;
pub mod value;

pub use condition::{
	Condition, DEFAULT_SIGNAL_STATE, DiagnosticsItem, UNCATCHABLE_CLASSES,
};
pub use domain::{Domain, DomainId, DomainKind, DomainProvider, coerce};
pub use error::{
	DefaultRenderer, DiagnosticRenderer, Error, diagnostic::Diagnostic,
};
pub use fragment::{Fragment, StatementColumn, StatementLine};
pub use value::{
	Date, Decimal, Interval, Multiset, OrderedF64, RowShape, RowValue,
	Time, Timestamp, Value,
};

pub type Result<T> = std::result::Result<T, Error>;
