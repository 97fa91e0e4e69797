//! courier-adapters: Real integrations for the courier delivery engine
//!
//! This crate provides:
//! - The Slack `chat.postMessage` transport
//! - OAuth token refresh against `oauth.v2.access`
//! - A store-backed credential resolver with transparent refresh

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod credentials;
pub mod oauth;
pub mod slack;

pub use credentials::StoredCredentialResolver;
pub use oauth::{OauthClient, RefreshError, RefreshedToken, TokenRefresher};
pub use slack::SlackTransport;
