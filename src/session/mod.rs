//! Session state for the whole client: at most one active session,
//! restored across reloads from two storage tiers.
//! Keep the public surface thin and split implementation across sub-modules.

mod store;
pub mod vault;

pub use store::{
    EndReason, PersistenceMode, Session, SessionEvent, SessionStore,
};
pub use vault::{CredentialVault, FileVault, MemoryVault, StoredCredential};
