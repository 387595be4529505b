// Build metadata reported at startup

/// Package version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name (from Cargo.toml).
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// User agent style tag, e.g. `lexicon-stats/0.1.0`.
pub fn tag() -> String {
    format!("{}/{}", NAME, VERSION)
}
