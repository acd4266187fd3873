// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::fmt::Write;

use super::Diagnostic;
use crate::fragment::Fragment;

/// Renders diagnostics for terminal output.
pub trait DiagnosticRenderer {
	fn render(&self, diagnostic: &Diagnostic) -> String;
}

/// The standard plain-text rendering:
///
/// ```text
/// error[22012]: division by zero
///   --> line 3, column 4
///    |
///  3 | 1 / 0
///    |     ^ divisor evaluates to zero
///   = help: guard the divisor with NULLIF
/// ```
#[derive(Default)]
pub struct DefaultRenderer;

impl DiagnosticRenderer for DefaultRenderer {
	fn render(&self, diagnostic: &Diagnostic) -> String {
		let mut out = String::new();
		let _ = writeln!(
			out,
			"error[{}]: {}",
			diagnostic.code, diagnostic.message
		);

		if let Fragment::Statement {
			text,
			line,
			column,
		} = &diagnostic.fragment
		{
			let _ = writeln!(
				out,
				"  --> line {}, column {}",
				line.0, column.0
			);
			let gutter = line.0.to_string().len().max(2);
			let _ = writeln!(out, "{:>width$} |", "", width = gutter);
			let _ = writeln!(
				out,
				"{:>width$} | {}",
				line.0,
				text,
				width = gutter
			);
			let caret_pad = column.0 as usize;
			match &diagnostic.label {
				Some(label) => {
					let _ = writeln!(
						out,
						"{:>width$} | {:pad$}^ {}",
						"",
						"",
						label,
						width = gutter,
						pad = caret_pad
					);
				}
				None => {
					let _ = writeln!(
						out,
						"{:>width$} | {:pad$}^",
						"",
						"",
						width = gutter,
						pad = caret_pad
					);
				}
			}
		} else if let Some(label) = &diagnostic.label {
			let _ = writeln!(out, "  = {}", label);
		}

		if let Some(help) = &diagnostic.help {
			let _ = writeln!(out, "  = help: {}", help);
		}
		for note in &diagnostic.notes {
			let _ = writeln!(out, "  = note: {}", note);
		}
		if let Some(cause) = &diagnostic.cause {
			let _ = writeln!(out, "caused by:");
			out.push_str(&self.render(cause));
		}

		out
	}
}
