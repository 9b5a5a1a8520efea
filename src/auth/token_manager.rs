use std::time::{Duration, SystemTime};

/// Cached access token and its expiry.
#[derive(Debug, Clone, Default)]
pub struct TokenState {
    access_token: Option<String>,
    expiration_time: Option<SystemTime>,
}

impl TokenState {
    pub fn update(&mut self, access_token: String, expires_in: Option<Duration>) {
        self.access_token = Some(access_token);
        self.expiration_time = expires_in.and_then(|expires_in| SystemTime::now().checked_add(expires_in));
    }

    pub fn clear(&mut self) {
        *self = TokenState::default();
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// True when there is no token or it expires within `tolerance`.
    pub fn should_refresh(&self, tolerance: Duration) -> bool {
        if self.access_token.is_none() {
            return true;
        }
        match self.expiration_time {
            None => false,
            Some(expiration) => {
                let threshold = SystemTime::now().checked_add(tolerance).unwrap_or_else(SystemTime::now);
                expiration <= threshold
            }
        }
    }
}
