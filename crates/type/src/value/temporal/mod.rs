// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

mod date;
mod interval;
mod time;
mod timestamp;

pub use date::Date;
pub use interval::Interval;
pub use time::Time;
pub use timestamp::Timestamp;
