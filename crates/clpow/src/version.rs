//! Parsing of the `CL_PLATFORM_VERSION` string.
//!
//! Platforms report `"OpenCL <major>.<minor> <platform-specific>"`.

use std::fmt;

/// The version string prefix that wins platform selection outright.
pub const PREFERRED_PREFIX: &str = "OpenCL 1.2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClVersion {
    pub major: u32,
    pub minor: u32,
}

impl ClVersion {
    pub const V1_2: ClVersion = ClVersion { major: 1, minor: 2 };

    /// `None` unless the string starts with `"OpenCL "` followed by a
    /// `major.minor` pair.
    pub fn parse(reported: &str) -> Option<Self> {
        let rest = reported.strip_prefix("OpenCL ")?;
        let number = rest.split_whitespace().next()?;
        let (major, minor) = number.split_once('.')?;
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }
}

impl fmt::Display for ClVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpenCL {}.{}", self.major, self.minor)
    }
}

pub fn is_preferred(reported: &str) -> bool {
    reported.starts_with(PREFERRED_PREFIX)
}

/// Parsed version is at least 1.2.
pub fn is_at_least_1_2(reported: &str) -> bool {
    ClVersion::parse(reported).is_some_and(|v| v >= ClVersion::V1_2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vendor_suffixed_strings() {
        assert_eq!(
            ClVersion::parse("OpenCL 1.2 CUDA 12.2.140"),
            Some(ClVersion { major: 1, minor: 2 })
        );
        assert_eq!(
            ClVersion::parse("OpenCL 3.0 "),
            Some(ClVersion { major: 3, minor: 0 })
        );
        assert_eq!(
            ClVersion::parse("OpenCL 2.1 AMD-APP (3590.0)"),
            Some(ClVersion { major: 2, minor: 1 })
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(ClVersion::parse(""), None);
        assert_eq!(ClVersion::parse("OpenCL"), None);
        assert_eq!(ClVersion::parse("OpenCL x.y"), None);
        assert_eq!(ClVersion::parse("Vulkan 1.3"), None);
        assert_eq!(ClVersion::parse("OpenCL 12"), None);
    }

    #[test]
    fn ordering_is_numeric() {
        let v1_1 = ClVersion::parse("OpenCL 1.1").unwrap();
        let v2_0 = ClVersion::parse("OpenCL 2.0").unwrap();
        assert!(v1_1 < ClVersion::V1_2);
        assert!(v2_0 > ClVersion::V1_2);
        assert_eq!(ClVersion::V1_2.to_string(), "OpenCL 1.2");
    }

    #[test]
    fn preferred_is_a_prefix_test() {
        assert!(is_preferred("OpenCL 1.2 pocl 1.8"));
        assert!(!is_preferred("OpenCL 2.0 AMD-APP"));
        assert!(!is_preferred(" OpenCL 1.2"));
    }

    #[test]
    fn at_least_1_2() {
        assert!(is_at_least_1_2("OpenCL 1.2"));
        assert!(is_at_least_1_2("OpenCL 3.0 NEO"));
        assert!(!is_at_least_1_2("OpenCL 1.1 Mesa"));
        assert!(!is_at_least_1_2("unknown"));
    }
}
