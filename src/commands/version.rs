//! Command: print version information.

/// Version string, preferring the build-time `PROVISION_VERSION` override.
#[must_use]
pub fn version() -> &'static str {
    option_env!("PROVISION_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}

/// Print the provision version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("provision {}", version());
}
