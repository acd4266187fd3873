// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! The embeddable face of emberdb: build a statement graph once, then
//! run it as often as needed against the row sources and domains the
//! host provides.
//!
//! ```
//! use emberdb::{
//! 	BinaryOp, GraphBuilder, NodeStore, NoopUndo, Session,
//! 	StandardDomains, Value,
//! };
//! use emberdb_testing::FixtureRows;
//!
//! let store = NodeStore::new();
//! let domains = StandardDomains::new();
//! let builder = GraphBuilder::new(&store, &domains);
//! let six = builder.literal(Value::Int(6))?;
//! let seven = builder.literal(Value::Int(7))?;
//! let answer = builder.binary(BinaryOp::Multiply, six, seven)?;
//!
//! let rows = FixtureRows::new();
//! let undo = NoopUndo::new();
//! let session = Session::new(&store, &domains, &rows, &undo);
//! let outcome = session.run(answer)?;
//! assert_eq!(outcome.value, Some(Value::Int(42)));
//! # Ok::<(), emberdb::Error>(())
//! ```

pub use emberdb_core as core;
pub use emberdb_engine as engine;
pub use emberdb_function as function;

pub use emberdb_core::graph::{
	BinaryOp, FetchHow, FrameBound, FrameExclude, FrameUnit, FunctionCall,
	FunctionKind, FunctionModifier, GraphBuilder, HandlerDisposition,
	OrderItem, Parameter, ParameterMode, PeriodOp, UnaryOp, WindowSpec,
};
pub use emberdb_core::{
	Node, NodeId, NodeKind, NodeStore, NoopUndo, RowBatch, RowProvider,
	StandardDomains, UndoHook, verify_labels,
};
pub use emberdb_engine::{
	Control, DiagnosticsArea, ExecutionContext, ExecutionOptions, Outcome,
	Session,
};
pub use emberdb_type::{
	Condition, Date, Decimal, DiagnosticsItem, Domain, DomainId,
	DomainKind, DomainProvider, Error, Fragment, Interval, Multiset,
	Result, RowShape, RowValue, Time, Timestamp, Value,
};
