// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Fixtures shared by the emberdb test suites: canned row sources, an
//! undo hook that records what was rolled back, and one-shot tracing
//! setup for tests that want log output.

pub mod logging;
mod rows;
mod undo;

pub use rows::FixtureRows;
pub use undo::RecordingUndo;
