use std::fmt;

use serde::Serialize;

/// Build metadata baked in by the binary's build script
///
/// Fields fall back to `"unknown"` when the crate is built without the
/// build script having set them (e.g. as a library dependency).
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub build_profile: &'static str,
    pub build_features: &'static str,
    pub build_timestamp: &'static str,
    pub rust_version: &'static str,
    pub build_target: &'static str,
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} build, features: {}, target: {}, built {}, {})",
            self.version,
            self.build_profile,
            self.build_features,
            self.build_target,
            self.build_timestamp,
            self.rust_version
        )
    }
}

/// Capture [`BuildInfo`] from the calling crate's compile-time environment
///
/// This is a macro so that `option_env!` resolves against the crate that
/// invokes it, which is the one whose build script set the variables.
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BuildInfo {
            version: option_env!("REPO_VERSION").unwrap_or(env!("CARGO_PKG_VERSION")),
            build_profile: option_env!("BUILD_PROFILE").unwrap_or("unknown"),
            build_features: option_env!("BUILD_FEATURES").unwrap_or("unknown"),
            build_timestamp: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
            rust_version: option_env!("RUST_VERSION").unwrap_or("unknown"),
            build_target: option_env!("BUILD_TARGET").unwrap_or("unknown"),
        }
    };
}

/// Build metadata of this library itself
pub fn build_info() -> BuildInfo {
    build_info!()
}
