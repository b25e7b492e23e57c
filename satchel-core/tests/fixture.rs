//! Shared helpers for the integration suites: builds the mock plugin
//! cdylibs on demand and assembles signed bundle archives.

#![allow(dead_code)]

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use ed25519_dalek::pkcs8::EncodePublicKey;
use ed25519_dalek::{Signer, SigningKey};
use rsa::pkcs8::LineEnding;
use satchel_core::crypt::PublicKey;
use satchel_core::HostSpec;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Builds a mock plugin package and returns the path of its cdylib.
///
/// Parallel invocations are safe: cargo serialises builds on the target
/// directory lock.
pub fn fixture_dylib(package: &str, lib_name: &str) -> PathBuf {
    let cargo = env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let workspace_root = manifest_dir.parent().expect("workspace root").to_path_buf();

    let status = Command::new(cargo)
        .current_dir(&workspace_root)
        .args(["build", "-p", package])
        .status()
        .expect("failed to run cargo build for a fixture plugin");
    assert!(status.success(), "building fixture '{package}' failed");

    let target_dir = env::var("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| workspace_root.join("target"));
    let artifact = target_dir.join("debug").join(format!(
        "{}{}{}",
        env::consts::DLL_PREFIX,
        lib_name,
        env::consts::DLL_SUFFIX
    ));
    assert!(
        artifact.exists(),
        "fixture artifact missing at {}",
        artifact.display()
    );
    artifact
}

pub fn valid_plugin_dylib() -> PathBuf {
    fixture_dylib("valid-plugin", "valid_plugin")
}

pub fn other_plugin_dylib() -> PathBuf {
    fixture_dylib("other-plugin", "other_plugin")
}

pub fn functor_plugin_dylib() -> PathBuf {
    fixture_dylib("functor-plugin", "functor_plugin")
}

pub fn bare_library_dylib() -> PathBuf {
    fixture_dylib("bare-library", "bare_library")
}

/// Deterministic Ed25519 signing key for bundle tests.
pub fn test_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

/// Writes the verifying key into `dir` as PEM and returns its fingerprint.
pub fn install_key(dir: &Path, key: &SigningKey) -> String {
    fs::create_dir_all(dir).unwrap();
    let pem = key
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .unwrap();
    fs::write(dir.join("signer.pem"), &pem).unwrap();
    PublicKey::from_bytes(pem.as_bytes()).unwrap().fingerprint()
}

/// Canonical digest form over `(relative path, content)` pairs, matching
/// what the loader reconstructs from an unpacked bundle.
pub fn canonical_form<T: AsRef<[u8]>>(files: &[(&str, T)]) -> String {
    let mut rows: Vec<(String, String)> = files
        .iter()
        .map(|(path, bytes)| {
            (
                path.to_string(),
                satchel_core::crypt::sha256_bytes(bytes.as_ref()),
            )
        })
        .collect();
    rows.sort();
    rows.iter()
        .map(|(path, digest)| format!("{path}:sha256:{digest}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Signs the canonical form of `files` and returns the hex signature.
pub fn sign_files<T: AsRef<[u8]>>(key: &SigningKey, files: &[(&str, T)]) -> String {
    let canonical = canonical_form(files);
    hex::encode(key.sign(canonical.as_bytes()).to_bytes())
}

/// Writes a bundle archive containing `manifest.yaml` plus the given files.
pub fn write_bundle<T: AsRef<[u8]>>(path: &Path, manifest: &str, files: &[(&str, T)]) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    zip.start_file("manifest.yaml", options).unwrap();
    zip.write_all(manifest.as_bytes()).unwrap();
    for (name, bytes) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(bytes.as_ref()).unwrap();
    }
    zip.finish().unwrap();
}

/// Writes an archive with no entries at all.
pub fn write_empty_archive(path: &Path) {
    let file = File::create(path).unwrap();
    let zip = ZipWriter::new(file);
    zip.finish().unwrap();
}

/// A manifest binary entry for the running host's platform and ABI.
pub fn host_binary_yaml(path: &str) -> String {
    let host = HostSpec::detect();
    binary_yaml(&host.triplet(), &host.abi_signature().to_string(), host.arch(), path)
}

/// A manifest binary entry for an arbitrary platform.
pub fn binary_yaml(triplet: &str, abi_signature: &str, arch: &str, path: &str) -> String {
    format!(
        "      - platform:\n          triplet: {triplet}\n          abi_signature: {abi_signature}\n          arch: {arch}\n        path: {path}\n"
    )
}

/// Assembles a complete manifest from plugin sections.
pub fn manifest_yaml(signature: Option<(&str, &str)>, plugin_sections: &[(&str, String)]) -> String {
    let mut text = String::from(
        "bundleName: fixture-bundle\nbundleVersion: 1.0.0\nbundleAuthor: Integration Tests\nbundleComment: built by the test suite\nbundledOn: \"2024-05-04T12:00:00Z\"\n",
    );
    if let Some((signature, fingerprint)) = signature {
        text.push_str(&format!(
            "bundleSignature:\n  signature: \"{signature}\"\n  keyFingerprint: \"{fingerprint}\"\n"
        ));
    }
    text.push_str("bundlePlugins:\n");
    for (name, binaries) in plugin_sections {
        text.push_str(&format!("  {name}:\n    binaries:\n{binaries}"));
    }
    text
}
