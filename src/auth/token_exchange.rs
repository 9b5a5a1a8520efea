use std::time::Duration;

use jsonwebtoken::{Algorithm, Header};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::auth::credentials::ServiceAccountKey;
use crate::constants::{DATASTORE_SCOPE, JWT_BEARER_GRANT_TYPE};
use crate::error::{credential_error, operation_error, unauthenticated, unavailable, ProtoStoreError, ProtoStoreResult, RpcStatus};

const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    assertion: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl AccessTokenResponse {
    pub fn expires_in(&self) -> Option<Duration> {
        self.expires_in.map(Duration::from_secs)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// Signs the RS256 assertion presented to the token endpoint.
pub fn sign_assertion(key: &ServiceAccountKey, issued_at: i64) -> ProtoStoreResult<String> {
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: DATASTORE_SCOPE,
        aud: &key.token_uri,
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();
    jsonwebtoken::encode(&header, &claims, &key.encoding_key()?)
        .map_err(|err| credential_error(format!("Failed to sign token assertion: {err}")))
}

/// Exchanges a signed assertion for an OAuth access token.
pub async fn exchange_assertion(
    client: &Client,
    token_uri: &str,
    assertion: &str,
) -> ProtoStoreResult<AccessTokenResponse> {
    let request = TokenRequest {
        grant_type: JWT_BEARER_GRANT_TYPE,
        assertion,
    };

    let response = client
        .post(token_uri)
        .form(&request)
        .send()
        .await
        .map_err(|err| unavailable(format!("Token request failed: {err}")))?;

    if response.status().is_success() {
        response
            .json::<AccessTokenResponse>()
            .await
            .map_err(|err| unavailable(format!("Malformed token response: {err}")))
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_else(|_| "{}".to_string());
        Err(map_exchange_error(status, &body))
    }
}

fn map_exchange_error(status: StatusCode, body: &str) -> ProtoStoreError {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|parsed| match (parsed.error, parsed.error_description) {
            (Some(error), Some(description)) => Some(format!("{error}: {description}")),
            (Some(error), None) => Some(error),
            (None, description) => description,
        })
        .unwrap_or_else(|| format!("status {status}"));

    if status.is_client_error() {
        unauthenticated(format!("Token endpoint rejected the assertion ({detail})"))
    } else {
        operation_error(RpcStatus::Unavailable, format!("Token endpoint failed ({detail})"))
    }
}
