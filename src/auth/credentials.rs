use std::fmt;
use std::path::Path;

use jsonwebtoken::EncodingKey;
use serde::Deserialize;

use crate::constants::DEFAULT_TOKEN_URI;
use crate::error::{credential_error, ProtoStoreResult};

const SERVICE_ACCOUNT_TYPE: &str = "service_account";

/// A Google service-account key as downloaded from the cloud console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub project_id: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Reads and validates a key file.
    ///
    /// # Errors
    /// `proto-store/credential` when the file cannot be read, is not valid JSON, is not a
    /// service-account key or carries an unusable private key.
    pub fn from_file(path: impl AsRef<Path>) -> ProtoStoreResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            credential_error(format!("Failed to read credential file {}: {err}", path.display()))
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> ProtoStoreResult<Self> {
        let key: Self = serde_json::from_str(contents)
            .map_err(|err| credential_error(format!("Malformed service-account key: {err}")))?;
        key.validate()?;
        Ok(key)
    }

    pub(crate) fn encoding_key(&self) -> ProtoStoreResult<EncodingKey> {
        EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|err| credential_error(format!("Unusable private key: {err}")))
    }

    fn validate(&self) -> ProtoStoreResult<()> {
        if self.key_type != SERVICE_ACCOUNT_TYPE {
            return Err(credential_error(format!(
                "Expected a '{SERVICE_ACCOUNT_TYPE}' key but found '{}'",
                self.key_type
            )));
        }
        if self.project_id.is_empty() {
            return Err(credential_error("Service-account key has an empty project_id"));
        }
        if self.client_email.is_empty() {
            return Err(credential_error("Service-account key has an empty client_email"));
        }
        self.encoding_key().map(|_| ())
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}
