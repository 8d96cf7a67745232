//! Shared setup for client integration tests
#![allow(dead_code)]

use common::crypto::Argon2Params;
use common::env::Snapshot;
use common::secret_store::MemorySecretStore;
use common::session::Session;
use common::testkit::MemoryBackend;
use uuid::Uuid;

pub type TestClient = common::client::Client<MemoryBackend, MemorySecretStore>;

pub const PASSWORD: &str = "correct horse battery staple";

/// A client on `backend` with its own keychain and cheap Argon2 params
pub fn client(backend: &MemoryBackend) -> TestClient {
    common::client::Client::new(backend.clone(), MemorySecretStore::new())
        .with_argon2_params(Argon2Params::insecure_fast())
}

/// Register `email` on `backend`, returning its client and session
pub async fn register(backend: &MemoryBackend, email: &str) -> (TestClient, Session) {
    let client = client(backend);
    let session = client.register(email, PASSWORD).await.unwrap();
    (client, session)
}

/// A registered owner with a freshly created project
pub struct ProjectFixture {
    pub backend: MemoryBackend,
    pub owner: TestClient,
    pub session: Session,
    pub project_id: Uuid,
}

pub async fn setup_project(project: &str) -> ProjectFixture {
    let backend = MemoryBackend::new();
    let (owner, session) = register(&backend, "owner@example.com").await;
    let project_id = owner.create_project(&session, project).await.unwrap();
    ProjectFixture {
        backend,
        owner,
        session,
        project_id,
    }
}

pub fn snapshot(pairs: &[(&str, &str)]) -> Snapshot {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
