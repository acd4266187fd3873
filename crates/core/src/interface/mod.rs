// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Interfaces between the graph and its collaborators: row sources,
//! domain registration and undo coordination.

mod domains;
mod rows;
mod undo;

pub use domains::*;
pub use rows::*;
pub use undo::*;
