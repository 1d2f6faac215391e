//! Vault for encrypted secrets and re-keying of vaulted YAML files
//!
//! Values are encrypted with AES-256-GCM using a key derived from the
//! password with Argon2. An encrypted value is a header line followed by
//! base64 of `salt \n nonce ciphertext`:
//!
//! ```text
//! $AWSIBLE_VAULT;1.0;AES256
//! c2FsdHNhbHQK...
//! ```
//!
//! Inside YAML a vaulted value is either a plain string carrying the header
//! or a string tagged `!vault`.

use std::path::{Path, PathBuf};

use aes_gcm::aead::generic_array::typenum;
use aes_gcm::{aead::{generic_array::GenericArray, Aead}, Aes256Gcm, KeyInit};
use argon2::password_hash::SaltString;
use argon2::Argon2;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use serde_yaml::Value;
use tracing::{debug, info};

use crate::error::{Error, ErrorContext, Result};

/// Vault header marker
pub const VAULT_HEADER: &str = "$AWSIBLE_VAULT;1.0;AES256";

const VAULT_PREFIX: &str = "$AWSIBLE_VAULT";
const NONCE_LEN: usize = 12;

/// Vault for encrypting/decrypting secrets
pub struct Vault {
    password: String,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Vault {
    /// Create a new vault with password
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }

    /// Reads the password from a file, dropping the trailing newline.
    pub fn from_password_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::VaultFileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vault password file {}", path.display()))?;
        let password = content.trim_end_matches(['\r', '\n']);
        if password.is_empty() {
            return Err(Error::Vault(format!(
                "Vault password file is empty: {}",
                path.display()
            )));
        }
        Ok(Self::new(password))
    }

    /// Encrypt content
    pub fn encrypt(&self, content: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let key = self.derive_key(&salt)?;

        let cipher = Aes256Gcm::new(&key);
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let nonce = GenericArray::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, content.as_bytes())
            .map_err(|e| Error::Vault(format!("Encryption failed: {}", e)))?;

        let mut encrypted = Vec::new();
        encrypted.extend_from_slice(salt.as_str().as_bytes());
        encrypted.push(b'\n');
        encrypted.extend_from_slice(&nonce_bytes);
        encrypted.extend_from_slice(&ciphertext);

        Ok(format!("{}\n{}", VAULT_HEADER, BASE64.encode(&encrypted)))
    }

    /// Decrypt content
    pub fn decrypt(&self, content: &str) -> Result<String> {
        let lines: Vec<&str> = content.trim().lines().map(str::trim).collect();
        if lines.is_empty() || !lines[0].starts_with(VAULT_PREFIX) {
            return Err(Error::Vault("Invalid vault format".into()));
        }

        let encrypted = BASE64
            .decode(lines[1..].join(""))
            .map_err(|e| Error::Vault(format!("Base64 decode failed: {}", e)))?;

        // Parse salt, nonce, and ciphertext
        let salt_end = encrypted
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| Error::Vault("Invalid vault format".into()))?;
        let salt_str = std::str::from_utf8(&encrypted[..salt_end])
            .map_err(|_| Error::Vault("Invalid salt".into()))?;
        let salt = SaltString::from_b64(salt_str).map_err(|_| Error::Vault("Invalid salt".into()))?;

        let nonce_start = salt_end + 1;
        if encrypted.len() < nonce_start + NONCE_LEN {
            return Err(Error::Vault("Truncated vault payload".into()));
        }
        let nonce = GenericArray::from_slice(&encrypted[nonce_start..nonce_start + NONCE_LEN]);
        let ciphertext = &encrypted[nonce_start + NONCE_LEN..];

        let key = self.derive_key(&salt)?;
        let cipher = Aes256Gcm::new(&key);

        let plaintext = cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| Error::Vault("Decryption failed - wrong password?".into()))?;

        String::from_utf8(plaintext)
            .map_err(|_| Error::Vault("Invalid UTF-8 in decrypted content".into()))
    }

    /// Check if content is vault encrypted
    pub fn is_encrypted(content: &str) -> bool {
        content.trim_start().starts_with(VAULT_PREFIX)
    }

    fn derive_key(&self, salt: &SaltString) -> Result<GenericArray<u8, typenum::U32>> {
        let argon2 = Argon2::default();
        let mut key = [0u8; 32];
        argon2
            .hash_password_into(self.password.as_bytes(), salt.as_str().as_bytes(), &mut key)
            .map_err(|e| Error::Vault(format!("Key derivation failed: {}", e)))?;
        Ok(GenericArray::clone_from_slice(&key))
    }
}

/// Re-encrypts vaulted YAML values from one password to another.
pub struct Rekeyer {
    old: Vault,
    new: Vault,
}

/// Outcome of [`Rekeyer::rekey_file`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RekeyReport {
    pub output: PathBuf,
    /// Number of values re-encrypted.
    pub rekeyed: usize,
}

impl Rekeyer {
    pub fn new(old: Vault, new: Vault) -> Self {
        Self { old, new }
    }

    /// Re-encrypts every vaulted value in place. Returns how many were found.
    pub fn rekey_value(&self, value: &mut Value) -> Result<usize> {
        match value {
            Value::String(s) if Vault::is_encrypted(s) => {
                *s = self.rekey_str(s)?;
                Ok(1)
            }
            Value::Tagged(tagged) if tagged.tag == "!vault" => match &mut tagged.value {
                Value::String(s) => {
                    *s = self.rekey_str(s)?;
                    Ok(1)
                }
                _ => Err(Error::Vault("!vault tag must wrap a string".into())),
            },
            Value::Tagged(tagged) => self.rekey_value(&mut tagged.value),
            Value::Sequence(items) => items.iter_mut().try_fold(0, |n, item| {
                Ok(n + self.rekey_value(item)?)
            }),
            Value::Mapping(map) => map.iter_mut().try_fold(0, |n, (_, item)| {
                Ok(n + self.rekey_value(item)?)
            }),
            _ => Ok(0),
        }
    }

    fn rekey_str(&self, encrypted: &str) -> Result<String> {
        let plaintext = self.old.decrypt(encrypted)?;
        self.new.encrypt(&plaintext)
    }

    /// Re-encrypts a YAML document given as text.
    pub fn rekey_document(&self, content: &str) -> Result<(String, usize)> {
        let mut doc: Value = serde_yaml::from_str(content)?;
        let count = self.rekey_value(&mut doc)?;
        Ok((serde_yaml::to_string(&doc)?, count))
    }

    /// Re-encrypts `input` into `output`, or `<input>.new` when not given.
    /// The output is written atomically.
    pub fn rekey_file(&self, input: &Path, output: Option<&Path>) -> Result<RekeyReport> {
        if !input.exists() {
            return Err(Error::FileNotFound(input.to_path_buf()));
        }
        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output(input));

        let content = std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        let (rekeyed_doc, rekeyed) = self.rekey_document(&content)?;
        debug!(input = %input.display(), rekeyed, "Re-encrypted vault values");

        write_atomic(&output, &rekeyed_doc)?;
        info!(output = %output.display(), rekeyed, "Wrote re-keyed file");

        Ok(RekeyReport { output, rekeyed })
    }
}

/// `<input>.new`
pub fn default_output(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".new");
    PathBuf::from(name)
}

fn write_atomic(path: &Path, content: &str) -> Result<()> {
    use std::io::Write;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
