//! The credential used to access a user's data at the provider.

use std::fmt::{Debug, Display};

use sha2::{Digest, Sha256};

use crate::Error;

/// An access token issued by the provider for one linked login.
///
/// The token is never empty. Its [Debug] and [Display] output is redacted so it
/// does not end up in the logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredential(String);

impl ProviderCredential {
    /// Wrap an access token.
    ///
    /// # Errors
    /// Returns [Error::CredentialMissing] if `access_token` is empty or only
    /// whitespace.
    pub fn new(access_token: &str) -> Result<Self, Error> {
        let access_token = access_token.trim();

        if access_token.is_empty() {
            return Err(Error::CredentialMissing);
        }

        Ok(Self(access_token.to_owned()))
    }

    /// The raw access token, for sending to the provider.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// The key that cursor checkpoints and sync locks are stored under.
    ///
    /// This is a SHA-256 hex digest of the access token so the token itself
    /// is not written to the cursor table.
    pub fn session_key(&self) -> String {
        format!("{:x}", Sha256::digest(self.0.as_bytes()))
    }
}

impl Debug for ProviderCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ProviderCredential(********)")
    }
}

impl Display for ProviderCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("********")
    }
}
