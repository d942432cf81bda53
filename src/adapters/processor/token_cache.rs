//! Bearer token cache for the processor API.
//!
//! Reads take the `RwLock` shared; a refresh takes the `Mutex` so only one
//! task fetches a token while others wait, then re-checks the cache before
//! fetching (another task may have refreshed already).
//!
//! A token is renewed `buffer` before it expires. Tokens that live less than
//! twice the buffer are renewed at half their lifetime instead, so a short
//! lifetime never turns into a fetch per call.

use std::future::Future;
use std::time::{Duration, Instant};

use secrecy::SecretString;
use tokio::sync::{Mutex, RwLock};

use crate::ports::ProcessorError;

/// Default renewal buffer before expiry.
pub const DEFAULT_EXPIRY_BUFFER: Duration = Duration::from_secs(5 * 60);

/// Token as returned by the token endpoint.
#[derive(Debug, Clone)]
pub struct FetchedToken {
    pub access_token: SecretString,
    pub expires_in: Duration,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: SecretString,
    renew_at: Instant,
}

impl CachedToken {
    fn new(fetched: FetchedToken, fetched_at: Instant, buffer: Duration) -> Self {
        let lead = buffer.min(fetched.expires_in / 2);
        Self {
            access_token: fetched.access_token,
            renew_at: fetched_at + (fetched.expires_in - lead),
        }
    }

    fn is_usable(&self, now: Instant) -> bool {
        now < self.renew_at
    }
}

#[derive(Debug)]
pub struct TokenCache {
    current: RwLock<Option<CachedToken>>,
    refresh: Mutex<()>,
    buffer: Duration,
}

impl TokenCache {
    pub fn new(buffer: Duration) -> Self {
        Self {
            current: RwLock::new(None),
            refresh: Mutex::new(()),
            buffer,
        }
    }

    /// Returns the cached token, or calls `fetch` once to obtain a new one.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Result<SecretString, ProcessorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FetchedToken, ProcessorError>>,
    {
        if let Some(token) = self.usable().await {
            return Ok(token);
        }

        let _refreshing = self.refresh.lock().await;
        if let Some(token) = self.usable().await {
            return Ok(token);
        }

        let fetched = fetch().await?;
        let expires_in_secs = fetched.expires_in.as_secs();
        let cached = CachedToken::new(fetched, Instant::now(), self.buffer);
        let token = cached.access_token.clone();
        *self.current.write().await = Some(cached);

        tracing::debug!(expires_in_secs, "Processor access token refreshed");
        Ok(token)
    }

    /// Drops the cached token; the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.current.write().await = None;
    }

    async fn usable(&self) -> Option<SecretString> {
        let current = self.current.read().await;
        current
            .as_ref()
            .filter(|t| t.is_usable(Instant::now()))
            .map(|t| t.access_token.clone())
    }
}
