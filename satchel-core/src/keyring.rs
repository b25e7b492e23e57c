//! Trusted-key discovery for bundle verification.
//!
//! A keyring is a directory of PEM public keys the host trusts to sign
//! bundles. The directory is a deployment concern, so the location is
//! injectable; [`Keyring::host_default`] resolves the conventional per-user
//! path for hosts that want it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::crypt::PublicKey;
use crate::error::{Error, Result};

const PEM_BEGIN: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_END: &str = "-----END PUBLIC KEY-----";

/// Directory of PEM public keys trusted to sign bundles.
#[derive(Debug, Clone)]
pub struct Keyring {
    dir: PathBuf,
}

impl Keyring {
    /// Keyring rooted at an explicit directory.
    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Conventional per-user location: `<config dir>/satchel/keys`.
    pub fn host_default() -> Result<Self> {
        let base = dirs::config_dir().ok_or_else(|| Error::Io {
            path: PathBuf::from("~"),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no user configuration directory",
            ),
        })?;
        Ok(Self::at(base.join("satchel").join("keys")))
    }

    /// The keyring directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All parseable PEM public keys under the keyring directory,
    /// including subdirectories.
    ///
    /// A missing directory yields an empty set. Files that do not carry the
    /// PEM public-key markers are ignored; candidates that fail to parse
    /// are skipped with a warning.
    pub fn keys(&self) -> Result<Vec<PublicKey>> {
        let mut keys = Vec::new();
        if self.dir.exists() {
            collect_keys(&self.dir, &mut keys)?;
        }
        Ok(keys)
    }

    /// The trusted key whose fingerprint matches, if any.
    pub fn find(&self, fingerprint: &str) -> Result<Option<PublicKey>> {
        Ok(self
            .keys()?
            .into_iter()
            .find(|key| key.fingerprint() == fingerprint))
    }
}

fn collect_keys(dir: &Path, keys: &mut Vec<PublicKey>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| Error::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_keys(&path, keys)?;
        } else if looks_like_public_key_pem(&path) {
            match PublicKey::from_path(&path) {
                Ok(key) => keys.push(key),
                Err(err) => warn!("skipping unparseable key {}: {err}", path.display()),
            }
        }
    }
    Ok(())
}

/// First non-empty line is the BEGIN marker and the last is the END marker.
fn looks_like_public_key_pem(path: &Path) -> bool {
    let Ok(text) = fs::read_to_string(path) else {
        return false;
    };
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let Some(first) = lines.next() else {
        return false;
    };
    let last = lines.last().unwrap_or(first);
    first.trim_end() == PEM_BEGIN && last.trim_end() == PEM_END
}
