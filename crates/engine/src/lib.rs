// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Evaluates expressions and obeys statements over a published graph.
//!
//! The crate splits into the [`context`] every run carries, the
//! [`evaluate`] tree walk for expressions, the [`execute`] dispatch for
//! statements, and the [`session`] front door that ties one root node
//! to one outcome.

#![cfg_attr(not(debug_assertions), deny(warnings))]

pub mod context;
pub mod evaluate;
pub mod execute;
pub mod options;
pub mod session;

pub use context::{DiagnosticsArea, ExecutionContext};
pub use evaluate::{accumulate, eval, matches};
pub use execute::{Control, obey, obey_list};
pub use options::ExecutionOptions;
pub use session::{Outcome, Session};
