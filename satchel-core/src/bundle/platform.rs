//! ABI signature grammar and host compatibility checks.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Parsed `<compiler>-<stdlib>-<dotted-version>-<abi-tag>` signature.
///
/// The string form has exactly three `-` separators at the top level and a
/// version of `.`-separated non-negative integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbiSignature {
    compiler: String,
    stdlib: String,
    version: Vec<u32>,
    abi_tag: String,
}

impl AbiSignature {
    pub fn new(
        compiler: impl Into<String>,
        stdlib: impl Into<String>,
        version: Vec<u32>,
        abi_tag: impl Into<String>,
    ) -> Self {
        Self {
            compiler: compiler.into(),
            stdlib: stdlib.into(),
            version,
            abi_tag: abi_tag.into(),
        }
    }

    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    pub fn stdlib(&self) -> &str {
        &self.stdlib
    }

    pub fn version(&self) -> &[u32] {
        &self.version
    }

    pub fn abi_tag(&self) -> &str {
        &self.abi_tag
    }

    /// Whether a binary requiring `required` can run on a host advertising
    /// `self`.
    ///
    /// Compiler, standard library, and ABI tag must match exactly, and the
    /// host version must be lexicographically at least the required
    /// version. A longer host version with an equal shared prefix counts as
    /// newer, so host `3.4.0` satisfies required `3.4` while host `3.4`
    /// does not satisfy required `3.4.1`.
    pub fn is_compatible_with(&self, required: &AbiSignature) -> bool {
        if self.compiler != required.compiler
            || self.stdlib != required.stdlib
            || self.abi_tag != required.abi_tag
        {
            return false;
        }
        for (host, req) in self.version.iter().zip(&required.version) {
            if host > req {
                return true;
            }
            if host < req {
                return false;
            }
        }
        self.version.len() >= required.version.len()
    }
}

impl FromStr for AbiSignature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 4 {
            return Err(Error::ManifestMalformed {
                message: format!(
                    "ABI signature '{s}' must have exactly four dash-separated fields"
                ),
            });
        }

        let mut version = Vec::new();
        for piece in parts[2].split('.') {
            let value: u32 = piece.parse().map_err(|_| Error::ManifestMalformed {
                message: format!("ABI signature '{s}' has a non-numeric version part '{piece}'"),
            })?;
            version.push(value);
        }

        Ok(Self {
            compiler: parts[0].to_string(),
            stdlib: parts[1].to_string(),
            version,
            abi_tag: parts[3].to_string(),
        })
    }
}

impl fmt::Display for AbiSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version: Vec<String> = self.version.iter().map(u32::to_string).collect();
        write!(
            f,
            "{}-{}-{}-{}",
            self.compiler,
            self.stdlib,
            version.join("."),
            self.abi_tag
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(s: &str) -> AbiSignature {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_round_trips_through_display() {
        let parsed = sig("gcc-libstdcxx-2.39.1-cxx11");
        assert_eq!(parsed.compiler(), "gcc");
        assert_eq!(parsed.stdlib(), "libstdcxx");
        assert_eq!(parsed.version(), &[2, 39, 1]);
        assert_eq!(parsed.abi_tag(), "cxx11");
        assert_eq!(parsed.to_string(), "gcc-libstdcxx-2.39.1-cxx11");
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        for bad in ["gcc-libstdcxx-2.39", "gcc-libstdcxx-2.39-cxx11-extra", ""] {
            let err = bad.parse::<AbiSignature>().unwrap_err();
            assert!(matches!(err, Error::ManifestMalformed { .. }), "{bad}");
        }
    }

    #[test]
    fn test_parse_rejects_non_numeric_version() {
        for bad in ["gcc-libstdcxx-2.x-cxx11", "gcc-libstdcxx--cxx11"] {
            let err = bad.parse::<AbiSignature>().unwrap_err();
            assert!(matches!(err, Error::ManifestMalformed { .. }), "{bad}");
        }
    }

    #[test]
    fn test_compatibility_requires_matching_families() {
        let host = sig("gcc-libstdcxx-3.4-cxx11");
        assert!(!host.is_compatible_with(&sig("clang-libstdcxx-3.4-cxx11")));
        assert!(!host.is_compatible_with(&sig("gcc-libcxx-3.4-cxx11")));
        assert!(!host.is_compatible_with(&sig("gcc-libstdcxx-3.4-cxx03")));
        assert!(host.is_compatible_with(&sig("gcc-libstdcxx-3.4-cxx11")));
    }

    #[test]
    fn test_version_ordering() {
        let cases = [
            ("3.4.0", "3.4", true),
            ("3.4", "3.4", true),
            ("3.3.9", "3.4", false),
            ("3.5", "3.4.7", true),
            ("3.4", "3.4.1", false),
            ("4.0", "3.9.9", true),
        ];
        for (host, required, expected) in cases {
            let host = sig(&format!("gcc-libstdcxx-{host}-cxx11"));
            let required = sig(&format!("gcc-libstdcxx-{required}-cxx11"));
            assert_eq!(
                host.is_compatible_with(&required),
                expected,
                "host {host:?} vs required {required:?}"
            );
        }
    }
}
