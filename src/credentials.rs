// SPDX-License-Identifier: Apache-2.0

//! Credential providers
//!
//! Every HTTP call asks a [`CredentialProvider`] for the `Authorization`
//! header value right before it is sent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use keyring::Entry;
use parking_lot::RwLock;
use tracing::debug;

use tablechat_core::{ChatError, ChatResult};

use crate::observability::Sensitive;

const KEYRING_SERVICE: &str = "tablechat";

/// Source of the `Authorization` header for workspace calls
pub trait CredentialProvider: Send + Sync {
    /// Full header value, e.g. `Bearer dapi...`
    fn authorization(&self) -> ChatResult<Sensitive<String>>;

    /// The workspace rejected the last header; forget anything cached
    fn invalidate(&self) {}
}

/// Personal access token supplied by configuration
pub struct StaticTokenProvider {
    header: Option<Sensitive<String>>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<&str>) -> Self {
        let header = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(Sensitive::bearer);
        Self { header }
    }
}

impl CredentialProvider for StaticTokenProvider {
    fn authorization(&self) -> ChatResult<Sensitive<String>> {
        self.header.clone().ok_or_else(|| {
            ChatError::authentication(
                "No access token configured. Set DATABRICKS_TOKEN or store one in the keyring.",
            )
        })
    }
}

/// Token stored in the OS keyring under the workspace host
pub struct KeyringTokenProvider {
    account: String,
}

impl KeyringTokenProvider {
    pub fn new(host: &str) -> Self {
        Self {
            account: host.trim_end_matches('/').to_string(),
        }
    }

    /// Save `token` for this host; later runs read it without DATABRICKS_TOKEN
    pub fn store(&self, token: &str) -> ChatResult<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ChatError::authentication("Refusing to store an empty token"));
        }
        let entry = Entry::new(KEYRING_SERVICE, &self.account)
            .map_err(|e| ChatError::authentication(format!("Keyring error: {}", e)))?;
        entry
            .set_password(token)
            .map_err(|e| ChatError::authentication(format!("Failed to store token: {}", e)))
    }
}

impl CredentialProvider for KeyringTokenProvider {
    fn authorization(&self) -> ChatResult<Sensitive<String>> {
        let entry = Entry::new(KEYRING_SERVICE, &self.account)
            .map_err(|e| ChatError::authentication(format!("Keyring error: {}", e)))?;
        match entry.get_password() {
            Ok(token) if !token.trim().is_empty() => Ok(Sensitive::bearer(&token)),
            Ok(_) | Err(keyring::Error::NoEntry) => Err(ChatError::authentication(format!(
                "No token stored in the keyring for {}",
                self.account
            ))),
            Err(e) => Err(ChatError::authentication(format!(
                "Failed to read token: {}",
                e
            ))),
        }
    }
}

/// Caches another provider's header for `ttl`.
///
/// A refresh replaces the cached value; callers hold their own clone, so a
/// request already in flight keeps the header it started with.
pub struct CachedCredentialProvider {
    inner: Arc<dyn CredentialProvider>,
    ttl: Duration,
    cached: RwLock<Option<(Sensitive<String>, Instant)>>,
}

impl CachedCredentialProvider {
    pub fn new(inner: Arc<dyn CredentialProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cached: RwLock::new(None),
        }
    }

}

impl CredentialProvider for CachedCredentialProvider {
    fn authorization(&self) -> ChatResult<Sensitive<String>> {
        if let Some((header, fetched_at)) = self.cached.read().as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(header.clone());
            }
        }

        debug!("Refreshing cached credential");
        let header = self.inner.authorization()?;
        *self.cached.write() = Some((header.clone(), Instant::now()));
        Ok(header)
    }

    fn invalidate(&self) {
        debug!("Dropping cached credential");
        *self.cached.write() = None;
        self.inner.invalidate();
    }
}

/// In-memory provider for tests; counts lookups
#[derive(Clone, Default)]
pub struct MockProvider {
    tokens: Arc<Mutex<HashMap<&'static str, String>>>,
    lookups: Arc<Mutex<usize>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        let provider = Self::new();
        provider.set_token(token);
        provider
    }

    pub fn set_token(&self, token: &str) {
        if let Ok(mut map) = self.tokens.lock() {
            map.insert("token", token.to_string());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut map) = self.tokens.lock() {
            map.clear();
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.lock().map(|n| *n).unwrap_or(0)
    }
}

impl CredentialProvider for MockProvider {
    fn authorization(&self) -> ChatResult<Sensitive<String>> {
        if let Ok(mut n) = self.lookups.lock() {
            *n += 1;
        }
        let map = self
            .tokens
            .lock()
            .map_err(|_| ChatError::authentication("mock provider poisoned"))?;
        map.get("token")
            .map(|t| Sensitive::bearer(t))
            .ok_or_else(|| ChatError::authentication("Credentials not found"))
    }
}
