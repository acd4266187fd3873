// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Builtin functions.
//!
//! Three families live here: strict scalar functions applied value by
//! value, aggregate registers folding whole groups, and window
//! partitions with their frames. The evaluator owns control flow and
//! NULL placement; this crate owns the arithmetic of each function.

pub mod aggregate;
pub mod scalar;
pub mod window;

pub use aggregate::{GroupKey, Register, RegisterSet, RegisterState, SumAcc};
pub use window::{Frame, Partition, ResolvedBound, WindowRow};
