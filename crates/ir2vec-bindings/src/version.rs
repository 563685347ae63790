//! Package version reporting.

/// Reported when the package version is not available.
pub const UNKNOWN_VERSION: &str = "Unknown";

/// Pick the version from a metadata lookup, falling back to
/// [`UNKNOWN_VERSION`] when the lookup found nothing.
pub fn resolve_version(lookup: Option<&'static str>) -> &'static str {
    match lookup {
        Some(version) if !version.trim().is_empty() => version,
        _ => UNKNOWN_VERSION,
    }
}

/// Version of this package as recorded at build time.
pub(crate) fn package_version() -> &'static str {
    resolve_version(option_env!("CARGO_PKG_VERSION"))
}
