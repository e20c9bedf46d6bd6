//! API versioning for the Retrace SDK
//!
//! The SDK follows semantic versioning (SemVer 2.0.0): MAJOR for
//! incompatible API changes, MINOR for backward-compatible additions,
//! PATCH for backward-compatible fixes. Compatibility holds within one
//! MAJOR version.
//!
//! ## Example
//!
//! ```rust
//! use retrace_sdk::version::{API_VERSION, Version, is_compatible};
//!
//! let client_version = Version::new(0, 4, 0);
//! assert!(is_compatible(&client_version));
//!
//! let version = Version::parse("0.4.2").unwrap();
//! assert_eq!(version.minor(), 4);
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Current API version of the Retrace SDK
pub const API_VERSION: Version = Version {
    major: 0,
    minor: 4,
    patch: 2,
};

/// Minimum client version this SDK still talks to
pub const MIN_SUPPORTED_VERSION: Version = Version {
    major: 0,
    minor: 3,
    patch: 0,
};

/// A semantic version (MAJOR.MINOR.PATCH)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u32,
    minor: u32,
    patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub const fn major(&self) -> u32 {
        self.major
    }

    pub const fn minor(&self) -> u32 {
        self.minor
    }

    pub const fn patch(&self) -> u32 {
        self.patch
    }

    /// Parse a `MAJOR.MINOR.PATCH` string
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        s.parse()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '.');
        let mut next = |name: &'static str| -> Result<u32, VersionError> {
            parts
                .next()
                .ok_or(VersionError::MissingComponent { component: name })?
                .parse()
                .map_err(|_| VersionError::InvalidComponent { component: name })
        };
        Ok(Self {
            major: next("major")?,
            minor: next("minor")?,
            patch: next("patch")?,
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("version string is missing its {component} component")]
    MissingComponent { component: &'static str },
    #[error("version {component} component is not a number")]
    InvalidComponent { component: &'static str },
}

/// Whether a client at `version` can talk to this SDK: same MAJOR, and at
/// or above the minimum supported version
pub fn is_compatible(version: &Version) -> bool {
    version.major == API_VERSION.major && *version >= MIN_SUPPORTED_VERSION
}

/// Human-readable version line for diagnostics
pub fn version_string() -> String {
    format!("retrace-sdk {}", API_VERSION)
}
