/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit SHA
pub const GIT_SHA: &str = env!("VERGEN_GIT_SHA");

/// Whether the working tree had uncommitted changes
pub const GIT_DIRTY: &str = env!("VERGEN_GIT_DIRTY");

/// Rust compiler version used to build
pub const RUSTC_VERSION: &str = env!("VERGEN_RUSTC_SEMVER");

/// Build timestamp
pub const BUILD_TIMESTAMP: &str = env!("VERGEN_BUILD_TIMESTAMP");

/// Target triple
pub const TARGET: &str = env!("VERGEN_CARGO_TARGET_TRIPLE");

/// Protocol version string for libp2p identify.
pub const PROTOCOL_VERSION: &str = concat!("/warmpeer/", env!("CARGO_PKG_VERSION"));

/// Version with git metadata.
/// Format: <version> (<git_sha>[ dirty])
pub fn full_version() -> String {
    let sha = GIT_SHA.get(..12).unwrap_or(GIT_SHA);
    let dirty = if GIT_DIRTY == "true" { " dirty" } else { "" };
    format!("{VERSION} ({sha}{dirty})")
}

/// Agent version advertised over identify.
/// Format: warmpeer/<full_version> <target>
pub fn agent_version() -> String {
    format!("warmpeer/{} {TARGET}", full_version())
}

/// Build details for the startup log.
pub fn build_info() -> String {
    format!("warmpeer {} built {BUILD_TIMESTAMP} with rustc {RUSTC_VERSION}", full_version())
}
