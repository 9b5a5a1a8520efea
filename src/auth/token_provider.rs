use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_lock::Mutex;
use async_trait::async_trait;
use reqwest::Client;

use crate::auth::credentials::ServiceAccountKey;
use crate::auth::token_exchange::{exchange_assertion, sign_assertion};
use crate::auth::token_manager::TokenState;
use crate::error::ProtoStoreResult;
use crate::remote::datastore::{TokenProvider, TokenProviderArc};

/// Refresh this long before the reported expiry.
const REFRESH_TOLERANCE: Duration = Duration::from_secs(60);

/// Provider that always hands out the same bearer token.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub fn into_arc(self) -> TokenProviderArc {
        Arc::new(self)
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self) -> ProtoStoreResult<Option<String>> {
        Ok(Some(self.token.clone()))
    }

    fn invalidate_token(&self) {}
}

/// Provider minting OAuth access tokens from a service-account key.
pub struct ServiceAccountTokenProvider {
    key: ServiceAccountKey,
    client: Client,
    state: Mutex<TokenState>,
    force_refresh: AtomicBool,
}

impl ServiceAccountTokenProvider {
    pub fn new(key: ServiceAccountKey, client: Client) -> Self {
        Self {
            key,
            client,
            state: Mutex::new(TokenState::default()),
            force_refresh: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    pub fn into_arc(self) -> TokenProviderArc {
        Arc::new(self)
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn get_token(&self) -> ProtoStoreResult<Option<String>> {
        // Held across the exchange so concurrent callers share one refresh.
        let mut state = self.state.lock().await;
        let forced = self.force_refresh.swap(false, Ordering::SeqCst);
        if !forced && !state.should_refresh(REFRESH_TOLERANCE) {
            return Ok(state.access_token().map(str::to_string));
        }

        let assertion = sign_assertion(&self.key, chrono::Utc::now().timestamp())?;
        let response = match exchange_assertion(&self.client, &self.key.token_uri, &assertion).await {
            Ok(response) => response,
            Err(err) => {
                log::warn!("Access token refresh for {} failed: {err}", self.key.client_email);
                state.clear();
                return Err(err);
            }
        };
        log::debug!("Refreshed access token for {}", self.key.client_email);
        let expires_in = response.expires_in();
        state.update(response.access_token, expires_in);
        Ok(state.access_token().map(str::to_string))
    }

    fn invalidate_token(&self) {
        self.force_refresh.store(true, Ordering::SeqCst);
    }
}
