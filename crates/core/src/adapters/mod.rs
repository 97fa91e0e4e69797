//! Adapter traits for external integrations and their test fakes

pub mod fake;
pub mod traits;

pub use fake::{FakeCredentialResolver, FakeTransport, SentMessage};
pub use traits::{
    ChatTransport, Credential, CredentialError, CredentialResolver, TransportError,
    TransportReceipt,
};
