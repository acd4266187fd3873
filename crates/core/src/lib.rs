// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! The immutable statement graph shared by the emberdb evaluator and
//! interpreter, plus the interfaces collaborators implement around it:
//! row sources, domain registration and undo coordination.

pub mod error;
pub mod graph;
pub mod infer;
pub mod interface;

pub use emberdb_type::{Error, Result};
pub use error::GraphError;
pub use graph::{
	GraphBuilder, Node, NodeId, NodeKind, NodeStore, verify_labels,
};
pub use interface::{
	NoopUndo, RowBatch, RowProvider, StandardDomains, UndoHook,
};
