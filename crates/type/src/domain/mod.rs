// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

pub mod arith;
mod coerce;

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use coerce::coerce;

use crate::value::RowShape;

/// Identifies a domain in the domain registry.
///
/// The low range is reserved for the builtin domains; registered derived
/// domains (arrays, multisets, rows) are allocated above
/// [`DomainId::FIRST_DERIVED`].
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
pub struct DomainId(pub u64);

impl DomainId {
	/// The wildcard domain: accepts any value.
	pub const CONTENT: DomainId = DomainId(1);
	pub const BOOLEAN: DomainId = DomainId(2);
	pub const INTEGER: DomainId = DomainId(3);
	pub const NUMERIC: DomainId = DomainId(4);
	pub const REAL: DomainId = DomainId(5);
	pub const CHARACTER: DomainId = DomainId(6);
	pub const DATE: DomainId = DomainId(7);
	pub const TIME: DomainId = DomainId(8);
	pub const TIMESTAMP: DomainId = DomainId(9);
	pub const INTERVAL: DomainId = DomainId(10);

	/// First id handed out for registered derived domains.
	pub const FIRST_DERIVED: DomainId = DomainId(100);

	pub fn is_builtin(&self) -> bool {
		self.0 < Self::FIRST_DERIVED.0
	}
}

impl Display for DomainId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "domain#{}", self.0)
	}
}

/// The structural category of a domain.
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
pub enum DomainKind {
	/// No constraint: any value is acceptable.
	Content,
	Boolean,
	/// Exact integers, machine-word or arbitrary precision.
	Integer,
	/// Exact decimals.
	Numeric,
	/// Approximate 64-bit floats.
	Real,
	Character,
	Date,
	Time,
	Timestamp,
	Interval,
	Row,
	Array,
	Multiset,
}

impl DomainKind {
	pub fn is_numeric(&self) -> bool {
		matches!(
			self,
			DomainKind::Integer
				| DomainKind::Numeric
				| DomainKind::Real
		)
	}

	pub fn is_temporal(&self) -> bool {
		matches!(
			self,
			DomainKind::Date
				| DomainKind::Time
				| DomainKind::Timestamp
		)
	}
}

impl Display for DomainKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			DomainKind::Content => "CONTENT",
			DomainKind::Boolean => "BOOLEAN",
			DomainKind::Integer => "INTEGER",
			DomainKind::Numeric => "NUMERIC",
			DomainKind::Real => "REAL",
			DomainKind::Character => "CHARACTER",
			DomainKind::Date => "DATE",
			DomainKind::Time => "TIME",
			DomainKind::Timestamp => "TIMESTAMP",
			DomainKind::Interval => "INTERVAL",
			DomainKind::Row => "ROW",
			DomainKind::Array => "ARRAY",
			DomainKind::Multiset => "MULTISET",
		};
		f.write_str(name)
	}
}

/// A value domain: a kind plus, for collections and rows, the description of
/// what they contain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
	kind: DomainKind,
	element: Option<DomainId>,
	shape: Option<Arc<RowShape>>,
}

impl Domain {
	pub fn new(kind: DomainKind) -> Self {
		Self {
			kind,
			element: None,
			shape: None,
		}
	}

	pub fn array_of(element: DomainId) -> Self {
		Self {
			kind: DomainKind::Array,
			element: Some(element),
			shape: None,
		}
	}

	pub fn multiset_of(element: DomainId) -> Self {
		Self {
			kind: DomainKind::Multiset,
			element: Some(element),
			shape: None,
		}
	}

	pub fn row_of(shape: Arc<RowShape>) -> Self {
		Self {
			kind: DomainKind::Row,
			element: None,
			shape: Some(shape),
		}
	}

	pub fn kind(&self) -> DomainKind {
		self.kind
	}

	pub fn element(&self) -> Option<DomainId> {
		self.element
	}

	pub fn shape(&self) -> Option<&Arc<RowShape>> {
		self.shape.as_ref()
	}

	/// The value a freshly declared variable of this domain holds.
	pub fn default_value(&self) -> crate::value::Value {
		crate::value::Value::Null
	}

	/// The definition behind a builtin [`DomainId`].
	pub fn builtin(id: DomainId) -> Option<Domain> {
		let kind = match id {
			DomainId::CONTENT => DomainKind::Content,
			DomainId::BOOLEAN => DomainKind::Boolean,
			DomainId::INTEGER => DomainKind::Integer,
			DomainId::NUMERIC => DomainKind::Numeric,
			DomainId::REAL => DomainKind::Real,
			DomainId::CHARACTER => DomainKind::Character,
			DomainId::DATE => DomainKind::Date,
			DomainId::TIME => DomainKind::Time,
			DomainId::TIMESTAMP => DomainKind::Timestamp,
			DomainId::INTERVAL => DomainKind::Interval,
			_ => return None,
		};
		Some(Domain::new(kind))
	}

	/// The builtin id a value's kind maps to, when one exists.
	pub fn builtin_for(kind: DomainKind) -> Option<DomainId> {
		Some(match kind {
			DomainKind::Content => DomainId::CONTENT,
			DomainKind::Boolean => DomainId::BOOLEAN,
			DomainKind::Integer => DomainId::INTEGER,
			DomainKind::Numeric => DomainId::NUMERIC,
			DomainKind::Real => DomainId::REAL,
			DomainKind::Character => DomainId::CHARACTER,
			DomainKind::Date => DomainId::DATE,
			DomainKind::Time => DomainId::TIME,
			DomainKind::Timestamp => DomainId::TIMESTAMP,
			DomainKind::Interval => DomainId::INTERVAL,
			DomainKind::Row
			| DomainKind::Array
			| DomainKind::Multiset => return None,
		})
	}
}

/// Resolves domain ids to their definitions.
pub trait DomainProvider {
	fn lookup(&self, id: DomainId) -> Option<Domain>;
}
