//! Multi-tenant credential management: OAuth refresh, a TTL+coalescing
//! cache, and the storage seam that backs it.

pub mod cache;
pub mod oauth;
pub mod store;

pub use cache::{Credentials, CredentialCache};
pub use oauth::{OAuthClient, OAuthToken};
pub use store::{InMemoryStore, StoreAdapter, StoredCredentials};
