/// In-process harness for client integration tests
///
/// [`MemoryBackend`] stands in for the envcrypt HTTP API. It is a
/// [`Transport`](crate::api::Transport), so a real [`Client`](crate::client::Client)
/// runs against it unchanged, and it enforces the same membership and
/// delegation rules the backend does.
///
/// # Example
///
/// ```rust,ignore
/// use common::prelude::*;
/// use common::testkit::MemoryBackend;
///
/// #[tokio::test]
/// async fn test_push_pull() -> anyhow::Result<()> {
///     let backend = MemoryBackend::new();
///     let alice = Client::new(backend.clone(), MemorySecretStore::new())
///         .with_argon2_params(Argon2Params::insecure_fast());
///
///     let session = alice.register("alice@example.com", "hunter2").await?;
///     alice.create_project(&session, "api").await?;
///     alice.push(&session, "api", "production", &snapshot).await?;
///     Ok(())
/// }
/// ```
mod backend;

pub use backend::MemoryBackend;
