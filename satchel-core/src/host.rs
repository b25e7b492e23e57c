//! Runtime description of the host platform for bundle variant selection.
//!
//! The ABI signature is assembled at runtime so it tracks the environment a
//! plugin binary actually runs against, not the one the host was built on.
//! Scheme used by this implementation (it round-trips through the ABI
//! signature parser):
//!
//! - Linux/gnu: `rustc-glibc-<runtime glibc version>-gnu`
//! - macOS: `rustc-libsystem-<OS product version>-darwin`
//! - anywhere else: `rustc-unknown-0-unknown`

use crate::bundle::platform::AbiSignature;

/// Host operating system, CPU architecture, and ABI signature.
#[derive(Debug, Clone)]
pub struct HostSpec {
    os: String,
    arch: String,
    abi: AbiSignature,
}

impl HostSpec {
    /// Describes the running host.
    pub fn detect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            abi: detect_abi_signature(),
        }
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    /// `<arch>-<os>` coarse platform tag, e.g. `x86_64-linux`.
    pub fn triplet(&self) -> String {
        format!("{}-{}", self.arch, self.os)
    }

    pub fn abi_signature(&self) -> &AbiSignature {
        &self.abi
    }
}

#[cfg(all(target_os = "linux", target_env = "gnu"))]
fn detect_abi_signature() -> AbiSignature {
    // Runtime glibc version, e.g. "2.39".
    let version = unsafe {
        let raw = libc::gnu_get_libc_version();
        std::ffi::CStr::from_ptr(raw).to_string_lossy().into_owned()
    };
    AbiSignature::new("rustc", "glibc", parse_version_parts(&version), "gnu")
}

#[cfg(target_os = "macos")]
fn detect_abi_signature() -> AbiSignature {
    // kern.osproductversion, e.g. "14.5".
    let mut buf = [0u8; 256];
    let mut len = buf.len() as libc::size_t;
    let version = unsafe {
        let rc = libc::sysctlbyname(
            b"kern.osproductversion\0".as_ptr().cast(),
            buf.as_mut_ptr().cast(),
            &mut len,
            std::ptr::null_mut(),
            0,
        );
        if rc == 0 {
            std::ffi::CStr::from_bytes_until_nul(&buf)
                .ok()
                .map(|s| s.to_string_lossy().into_owned())
        } else {
            None
        }
    };
    let parts = version
        .as_deref()
        .map(parse_version_parts)
        .unwrap_or_else(|| vec![0]);
    AbiSignature::new("rustc", "libsystem", parts, "darwin")
}

#[cfg(not(any(all(target_os = "linux", target_env = "gnu"), target_os = "macos")))]
fn detect_abi_signature() -> AbiSignature {
    AbiSignature::new("rustc", "unknown", vec![0], "unknown")
}

#[cfg(any(all(target_os = "linux", target_env = "gnu"), target_os = "macos"))]
fn parse_version_parts(raw: &str) -> Vec<u32> {
    let parts: Vec<u32> = raw
        .split('.')
        .map_while(|piece| piece.parse().ok())
        .collect();
    if parts.is_empty() {
        vec![0]
    } else {
        parts
    }
}
