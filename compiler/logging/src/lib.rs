#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Log-sink installation for the analyzer binary.
//!
//! The core crates emit warnings and diagnostics through the `log` facade
//! only and never choose a backend; the binary installs one here. The
//! `RUST_LOG` environment variable overrides the configured level.

use std::io::Write;

/// Install the stderr log sink with the given default level (`debug`,
/// `info`, `warn`, `error`). Safe to call more than once; later calls are
/// no-ops.
pub fn init(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    let _ = env_logger::Builder::from_env(env)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .try_init();
}
