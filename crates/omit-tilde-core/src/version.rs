/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name used to prefix every advisory the plugin records.
pub const PACKAGE_NAME: &str = "omit-tilde";

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    match option_env!("OMIT_TILDE_BUILD_GIT_HASH") {
        Some(hash) => format!("{PACKAGE_NAME} {VERSION} ({hash})"),
        None => format!("{PACKAGE_NAME} {VERSION}"),
    }
}
