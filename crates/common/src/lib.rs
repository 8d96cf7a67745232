/**
 * Request and response types for the envcrypt backend API
 *  and the transport abstraction they travel over.
 */
pub mod api;
/**
 * High-level operations: identities, projects, members,
 *  versioned pushes and pulls, rollbacks and service role
 *  delegation, composed over a transport and a secret store.
 */
pub mod client;
/**
 * Cryptographic types and operations.
 *  - Password-protected X25519 identities
 *  - Project master keys and payload sealing
 *  - Per-recipient key wrapping
 */
pub mod crypto;
/**
 * Dotenv parsing, canonical encoding, compression
 *  and snapshot diffs for secret payloads.
 */
pub mod env;
/**
 * Who a project key can be wrapped for.
 */
pub mod recipient;
/**
 * Local storage for private keys between invocations.
 */
pub mod secret_store;
/**
 * Non-human identities for CI pipelines.
 */
pub mod service_role;
/**
 * Explicit authenticated-user context.
 */
pub mod session;
/**
 * In-memory backend for tests.
 */
pub mod testkit;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::api::Transport;
    pub use crate::client::{Client, ClientError, RollbackPlan, VersionedSnapshot};
    pub use crate::crypto::{Argon2Params, ProjectMasterKey, PublicKey, SecretKey, WrappedKey};
    pub use crate::env::{Snapshot, SnapshotDiff};
    pub use crate::recipient::{MemberRole, Recipient};
    pub use crate::secret_store::{MemorySecretStore, SecretStore};
    pub use crate::service_role::{ServiceRole, ServiceRoleKeyPair};
    pub use crate::session::Session;
    pub use crate::version::build_info;
}
