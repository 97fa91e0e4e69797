//! Store-backed credential resolver with transparent refresh
//!
//! Loads the user record, hands back the stored access token when it is
//! still comfortably valid, and otherwise refreshes through OAuth first.
//! A token within the expiry margin counts as expired so a send never
//! races the expiry.

use async_trait::async_trait;
use chrono::Duration;
use courier_core::adapters::{Credential, CredentialError, CredentialResolver};
use courier_core::clock::Clock;
use courier_core::storage::JsonStore;
use tracing::{info, warn};

use crate::oauth::{RefreshError, TokenRefresher};

fn default_margin() -> Duration {
    Duration::hours(1)
}

/// Credential resolver over the user store
#[derive(Clone)]
pub struct StoredCredentialResolver<R: TokenRefresher, C: Clock> {
    store: JsonStore,
    refresher: R,
    clock: C,
    margin: Duration,
}

impl<R: TokenRefresher, C: Clock> StoredCredentialResolver<R, C> {
    pub fn new(store: JsonStore, refresher: R, clock: C) -> Self {
        Self {
            store,
            refresher,
            clock,
            margin: default_margin(),
        }
    }

    pub fn with_margin(self, margin: Duration) -> Self {
        Self { margin, ..self }
    }
}

#[async_trait]
impl<R, C> CredentialResolver for StoredCredentialResolver<R, C>
where
    R: TokenRefresher,
    C: Clock + 'static,
{
    async fn resolve(&self, user_id: &str) -> Result<Credential, CredentialError> {
        let mut user = match self.store.load_user(user_id) {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                return Err(CredentialError::Unavailable(user_id.to_string()));
            }
            Err(e) => return Err(CredentialError::Store(e.to_string())),
        };

        let Some(access_token) = user.access_token.clone() else {
            return Err(CredentialError::Unavailable(user_id.to_string()));
        };

        let now = self.clock.now();
        let near_expiry = user
            .token_expires_at
            .map(|expires| expires <= now + self.margin)
            .unwrap_or(false);
        if !near_expiry {
            return Ok(Credential::new(access_token));
        }

        let Some(refresh_token) = user.refresh_token.clone() else {
            return Err(CredentialError::Unavailable(user_id.to_string()));
        };

        let refresher = self.refresher.clone();
        let outcome = tokio::task::spawn_blocking(move || refresher.refresh(&refresh_token))
            .await
            .map_err(|e| CredentialError::Store(format!("refresh task failed: {}", e)))?;

        match outcome {
            Ok(refreshed) => {
                user.access_token = Some(refreshed.access_token.clone());
                if let Some(rotated) = refreshed.refresh_token {
                    user.refresh_token = Some(rotated);
                }
                user.token_expires_at = refreshed
                    .expires_in
                    .map(|secs| now + Duration::seconds(secs as i64));
                self.store
                    .save_user(&user)
                    .map_err(|e| CredentialError::Store(e.to_string()))?;
                info!(user = %user.id, "refreshed access token");
                Ok(Credential::new(refreshed.access_token))
            }
            Err(RefreshError::Rejected(reason)) => {
                // The grant is dead; keeping the tokens would only produce
                // the same rejection on every future send
                user.clear_tokens();
                self.store
                    .save_user(&user)
                    .map_err(|e| CredentialError::Store(e.to_string()))?;
                warn!(user = %user.id, %reason, "token refresh rejected, cleared stored tokens");
                Err(CredentialError::Unavailable(user_id.to_string()))
            }
            Err(RefreshError::Network(e)) => Err(CredentialError::Store(e)),
        }
    }
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;
