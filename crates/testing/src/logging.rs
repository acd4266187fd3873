// Copyright (c) emberdb.org 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

static INIT: Lazy<()> = Lazy::new(|| {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
});

/// Install a tracing subscriber for the current process. Safe to call
/// from every test; only the first call does anything. Filtering
/// follows RUST_LOG.
pub fn init() {
	Lazy::force(&INIT);
}
