// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use std::time::{SystemTime, UNIX_EPOCH};

use super::Diagnostic;

/// An invariant was violated. The code is not a SQLSTATE, so handlers can
/// never catch it and it always aborts execution.
pub fn internal(message: impl Into<String>) -> Diagnostic {
	Diagnostic::new("INTERNAL_ERROR", message)
		.with_help("this is a defect, please report it")
}

pub fn internal_with_context(
	message: impl Into<String>,
	file: &str,
	line: u32,
	column: u32,
	function: &str,
	module: &str,
) -> Diagnostic {
	let millis = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|elapsed| elapsed.as_millis())
		.unwrap_or(0);
	internal(message)
		.with_note(format!("at {}:{}:{}", file, line, column))
		.with_note(format!("in {} ({})", function, module))
		.with_note(format!("error id ERR-{}", millis))
}

/// Expands to the enclosing function's path.
#[macro_export]
macro_rules! function_name {
	() => {{
		fn f() {}
		fn type_name_of<T>(_: T) -> &'static str {
			std::any::type_name::<T>()
		}
		let name = type_name_of(f);
		name.strip_suffix("::f").unwrap_or(name)
	}};
}

/// Builds an internal [`Error`](crate::error::Error) carrying the call
/// site.
#[macro_export]
macro_rules! internal_error {
	($($arg:tt)*) => {
		$crate::error::Error(
			$crate::error::diagnostic::internal::internal_with_context(
				format!($($arg)*),
				file!(),
				line!(),
				column!(),
				$crate::function_name!(),
				module_path!(),
			),
		)
	};
}

/// Builds an `Err` holding an internal error.
#[macro_export]
macro_rules! internal_err {
	($($arg:tt)*) => {
		Err($crate::internal_error!($($arg)*))
	};
}

/// Returns early with an internal error.
#[macro_export]
macro_rules! return_internal_error {
	($($arg:tt)*) => {
		return $crate::internal_err!($($arg)*)
	};
}

#[cfg(test)]
mod tests {
	use crate::error::Error;

	#[test]
	fn test_internal_error_macro() {
		let error = internal_error!("bad node {}", 7);
		assert_eq!(error.code, "INTERNAL_ERROR");
		assert!(error.message.contains("bad node 7"));
		assert!(error
			.notes
			.iter()
			.any(|note| note.contains("internal.rs")));
	}

	#[test]
	fn test_internal_err_macro() {
		fn fails() -> crate::Result<()> {
			internal_err!("unreachable state")
		}
		let error = fails().unwrap_err();
		assert_eq!(error.code, "INTERNAL_ERROR");
		assert!(error.sqlstate().is_none());
	}

	#[test]
	fn test_return_internal_error_macro() {
		fn guarded(flag: bool) -> crate::Result<i32> {
			if flag {
				return_internal_error!("flag was set");
			}
			Ok(1)
		}
		assert_eq!(guarded(false).unwrap(), 1);
		assert!(guarded(true).is_err());
	}

	#[test]
	fn test_function_name() {
		let name = crate::function_name!();
		assert!(name.contains("test_function_name"));
	}

	#[test]
	fn test_error_display_renders() {
		let error: Error = internal_error!("boom");
		let text = format!("{}", error);
		assert!(text.contains("error[INTERNAL_ERROR]"));
		assert!(text.contains("boom"));
	}
}
