//! KMS lookup plugin.
//!
//! `lookup('kms', key, action, text, [options...])` where `action` is
//! `enc`/`encrypt` or `dec`/`decrypt`. Encryption returns base64 ciphertext;
//! decryption takes base64 ciphertext and returns the plaintext.
//!
//! Options follow the three terms as `key=value` pairs:
//!
//! - `region`
//! - `profile` (env: `AWS_PROFILE`)
//! - `aws_access_key_id` (env: `AWS_ACCESS_KEY_ID`)
//! - `aws_secret_access_key` (env: `AWS_SECRET_ACCESS_KEY`)
//! - `aws_session_token` (env: `AWS_SESSION_TOKEN`)
//! - `context.<name>=<value>` encryption context entries

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use super::{Lookup, LookupContext, LookupError, LookupResult};
use crate::reconcile::ProviderResult;

/// Placeholder Ansible substitutes for omitted values.
const OMIT_PLACEHOLDER_PREFIX: &str = "__omit_place_holder__";

/// Returned for any action other than encrypt or decrypt.
pub const UNKNOWN_ACTION: &str = "Unknown action";

/// Connection settings for one lookup call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KmsSession {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

impl KmsSession {
    /// Builds settings from lookup options, falling back to `env` lookups.
    pub fn from_options<F>(options: &HashMap<String, String>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |option: &str, var: &str| options.get(option).cloned().or_else(|| env(var));

        Self {
            region: options.get("region").cloned(),
            profile: pick("profile", "AWS_PROFILE")
                .filter(|p| !p.starts_with(OMIT_PLACEHOLDER_PREFIX)),
            access_key_id: pick("aws_access_key_id", "AWS_ACCESS_KEY_ID"),
            secret_access_key: pick("aws_secret_access_key", "AWS_SECRET_ACCESS_KEY"),
            session_token: pick("aws_session_token", "AWS_SESSION_TOKEN"),
        }
    }
}

/// KMS encrypt/decrypt calls. `None` means the response carried no blob.
#[cfg_attr(test, mockall::automock)]
pub trait KmsClient: Send + Sync {
    fn encrypt(
        &self,
        key_id: &str,
        plaintext: &[u8],
        context: &HashMap<String, String>,
    ) -> ProviderResult<Option<Vec<u8>>>;

    fn decrypt(
        &self,
        ciphertext: &[u8],
        context: &HashMap<String, String>,
    ) -> ProviderResult<Option<Vec<u8>>>;
}

/// Opens a KMS client for the given session settings.
pub trait KmsConnector: Send + Sync {
    fn connect(&self, session: &KmsSession) -> ProviderResult<Box<dyn KmsClient>>;
}

/// Lookup plugin for `kms`.
pub struct KmsLookup {
    connector: Arc<dyn KmsConnector>,
}

impl KmsLookup {
    pub fn new(connector: Arc<dyn KmsConnector>) -> Self {
        Self { connector }
    }

    fn encryption_context(options: &HashMap<String, String>) -> HashMap<String, String> {
        options
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix("context.")
                    .map(|name| (name.to_string(), v.clone()))
            })
            .collect()
    }

    fn run(
        &self,
        terms: &[&str],
        options: &HashMap<String, String>,
        session: &KmsSession,
    ) -> LookupResult<Vec<String>> {
        let (key, action, text) = (terms[0], terms[1], terms[2]);
        let context = Self::encryption_context(options);

        match action {
            "enc" | "encrypt" => {
                let client = self.connector.connect(session)?;
                debug!(key, "Encrypting value with KMS");
                let blob = client
                    .encrypt(key, text.as_bytes(), &context)?
                    .ok_or_else(|| LookupError::Other("Encryption failed.".to_string()))?;
                Ok(vec![STANDARD.encode(blob)])
            }
            "dec" | "decrypt" => {
                let ciphertext = STANDARD.decode(text.trim()).map_err(|e| {
                    LookupError::ParseError(format!("ciphertext is not valid base64: {}", e))
                })?;
                let client = self.connector.connect(session)?;
                debug!("Decrypting value with KMS");
                let plaintext = client
                    .decrypt(&ciphertext, &context)?
                    .ok_or_else(|| LookupError::Other("Decryption failed.".to_string()))?;
                let plaintext = String::from_utf8(plaintext).map_err(|e| {
                    LookupError::ParseError(format!("plaintext is not UTF-8: {}", e))
                })?;
                Ok(vec![plaintext])
            }
            _ => Ok(vec![UNKNOWN_ACTION.to_string()]),
        }
    }
}

impl Lookup for KmsLookup {
    fn name(&self) -> &'static str {
        "kms"
    }

    fn description(&self) -> &'static str {
        "Encrypt or decrypt values with AWS KMS"
    }

    fn lookup(&self, args: &[&str], _context: &LookupContext) -> LookupResult<Vec<String>> {
        if args.len() < 3 {
            return Err(LookupError::InvalidArguments(
                "kms lookup expects key, action and text".to_string(),
            ));
        }
        // Base64 text may contain '=', so terms are positional and only the
        // remaining arguments are parsed as options.
        let (terms, rest) = args.split_at(3);
        let options = self.parse_options(rest);
        let session = KmsSession::from_options(&options, |var| std::env::var(var).ok());

        self.run(terms, &options, &session)
    }
}
