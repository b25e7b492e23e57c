//! Hashing and public-key signature verification for bundle trust checks.
//!
//! Keys are accepted as PEM or DER `SubjectPublicKeyInfo`. Ed25519 and RSA
//! keys are supported; verification picks the digest and padding appropriate
//! for the key type (Ed25519 verifies directly, RSA uses PKCS#1 v1.5 with
//! SHA-256).

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use ed25519_dalek::Verifier;
use sha2::{Digest, Sha256};
use spki::der::Decode;
use spki::{ObjectIdentifier, SubjectPublicKeyInfoRef};

use crate::error::{Error, Result};

const OID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");
const OID_RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

const HASH_BUF_SIZE: usize = 16 * 1024;

/// Lowercase hex SHA-256 of a byte buffer.
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Lowercase hex SHA-256 of a file, streamed through a fixed buffer.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_BUF_SIZE];
    loop {
        let read = file.read(&mut buf).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

enum KeyMaterial {
    Ed25519(ed25519_dalek::VerifyingKey),
    Rsa(rsa::RsaPublicKey),
}

/// A public key loaded from PEM or DER `SubjectPublicKeyInfo` bytes.
pub struct PublicKey {
    spki_der: Vec<u8>,
    material: KeyMaterial,
}

impl PublicKey {
    /// Reads and parses a key file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&data)
    }

    /// Parses key bytes.
    ///
    /// PEM is recognised by leading ASCII whitespace followed by
    /// `-----BEGIN `, DER by a leading `0x30` byte. Anything else is
    /// [`Error::BadKeyFormat`].
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let trimmed = skip_ascii_whitespace(data);
        if trimmed.starts_with(b"-----BEGIN ") {
            let (label, der) = pem_rfc7468::decode_vec(trimmed).map_err(|err| {
                Error::BadKeyFormat {
                    message: format!("invalid PEM: {err}"),
                }
            })?;
            if label != "PUBLIC KEY" {
                return Err(Error::BadKeyFormat {
                    message: format!("expected a PUBLIC KEY block, found '{label}'"),
                });
            }
            Self::from_spki_der(der)
        } else if trimmed.first() == Some(&0x30) {
            Self::from_spki_der(trimmed.to_vec())
        } else {
            Err(Error::BadKeyFormat {
                message: "expected PEM armor or a DER sequence".to_string(),
            })
        }
    }

    fn from_spki_der(spki_der: Vec<u8>) -> Result<Self> {
        let info = SubjectPublicKeyInfoRef::from_der(&spki_der).map_err(|err| {
            Error::BadKeyFormat {
                message: format!("invalid SubjectPublicKeyInfo: {err}"),
            }
        })?;

        let algorithm = info.algorithm.oid;
        let material = if algorithm == OID_ED25519 {
            use ed25519_dalek::pkcs8::DecodePublicKey;
            let key =
                ed25519_dalek::VerifyingKey::from_public_key_der(&spki_der).map_err(|err| {
                    Error::BadKeyFormat {
                        message: format!("invalid Ed25519 key: {err}"),
                    }
                })?;
            KeyMaterial::Ed25519(key)
        } else if algorithm == OID_RSA_ENCRYPTION {
            use rsa::pkcs8::DecodePublicKey;
            let key = rsa::RsaPublicKey::from_public_key_der(&spki_der).map_err(|err| {
                Error::BadKeyFormat {
                    message: format!("invalid RSA key: {err}"),
                }
            })?;
            KeyMaterial::Rsa(key)
        } else {
            return Err(Error::BadKeyFormat {
                message: format!("unsupported key algorithm {algorithm}"),
            });
        };

        Ok(Self { spki_der, material })
    }

    /// `"sha256:<hex>"` over the DER `SubjectPublicKeyInfo` encoding.
    pub fn fingerprint(&self) -> String {
        format!("sha256:{}", sha256_bytes(&self.spki_der))
    }

    /// Short name of the key algorithm.
    pub fn algorithm(&self) -> &'static str {
        match self.material {
            KeyMaterial::Ed25519(_) => "ed25519",
            KeyMaterial::Rsa(_) => "rsa",
        }
    }

    /// Verifies a detached signature over `message`.
    ///
    /// Returns `Ok(true)` / `Ok(false)` for valid / invalid; a signature of
    /// the wrong shape for the key type counts as invalid.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool> {
        match &self.material {
            KeyMaterial::Ed25519(key) => {
                let Ok(signature) = ed25519_dalek::Signature::from_slice(signature) else {
                    return Ok(false);
                };
                Ok(key.verify(message, &signature).is_ok())
            }
            KeyMaterial::Rsa(key) => {
                let Ok(signature) = rsa::pkcs1v15::Signature::try_from(signature) else {
                    return Ok(false);
                };
                let verifier =
                    rsa::pkcs1v15::VerifyingKey::<rsa::sha2::Sha256>::new(key.clone());
                Ok(verifier.verify(message, &signature).is_ok())
            }
        }
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.spki_der == other.spki_der
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("algorithm", &self.algorithm())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

fn skip_ascii_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .unwrap_or(data.len());
    &data[start..]
}
