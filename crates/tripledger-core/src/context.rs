//! Per-request context
//!
//! Carries the HTTP client, the settings snapshot and a short-lived access
//! token for the extraction service. Handlers build one per request (or the
//! CLI one per command) and pass it down; nothing here is process-global.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::Result;
use crate::settings::Settings;

/// Tokens are refreshed this long before their stated expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// A bearer token with an absolute expiry
#[derive(Debug, Clone)]
pub struct CachedToken {
    pub value: String,
    pub expires_at: Instant,
}

impl CachedToken {
    /// Token valid for `ttl` from now, minus the refresh margin
    pub fn new(value: impl Into<String>, ttl: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: Instant::now() + ttl.saturating_sub(EXPIRY_MARGIN),
        }
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

pub struct RequestContext {
    http: Client,
    settings: Settings,
    token: Mutex<Option<CachedToken>>,
}

impl RequestContext {
    pub fn new(http: Client, settings: Settings) -> Self {
        Self {
            http,
            settings,
            token: Mutex::new(None),
        }
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Return the cached token, calling `fetch` only when it is missing or expired
    pub async fn access_token<F, Fut>(&self, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedToken>>,
    {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.value.clone());
        }

        debug!("Fetching extraction service access token");
        let token = fetch().await?;
        let value = token.value.clone();
        *slot = Some(token);
        Ok(value)
    }

    /// Drop the cached token (after the service rejects it)
    pub async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new(Client::new(), Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn token_from(ctx: &RequestContext, fetches: &AtomicU32) -> String {
        ctx.access_token(move || async move {
            let n = fetches.fetch_add(1, Ordering::SeqCst);
            Ok(CachedToken::new(format!("token-{}", n), Duration::from_secs(3600)))
        })
        .await
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_is_reused_until_expiry() {
        let ctx = RequestContext::default();
        let fetches = AtomicU32::new(0);

        assert_eq!(token_from(&ctx, &fetches).await, "token-0");
        assert_eq!(token_from(&ctx, &fetches).await, "token-0");
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        // Past ttl minus the margin
        tokio::time::advance(Duration::from_secs(3550)).await;
        assert_eq!(token_from(&ctx, &fetches).await, "token-1");
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_forces_refetch() {
        let ctx = RequestContext::default();
        let fetches = AtomicU32::new(0);

        token_from(&ctx, &fetches).await;
        ctx.invalidate_token().await;
        assert_eq!(token_from(&ctx, &fetches).await, "token-1");
    }

    #[test]
    fn test_short_ttl_is_never_fresh() {
        let token = CachedToken::new("t", Duration::from_secs(30));
        assert!(!token.is_fresh(Instant::now() + Duration::from_millis(1)));
    }
}
