// Name and version baked in from Cargo.toml

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

/// "bwmon v0.1.0", shown in the plain and html headers.
pub fn banner() -> String {
    format!("{NAME} v{VERSION}")
}
