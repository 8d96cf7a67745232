use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Client, ClientError};
use crate::api::{
    EnvHistoryRequest, EnvVersion, GetEnvRequest, PushEnvRequest, Transport, TransportError,
    VersionMetadata,
};
use crate::crypto::ProjectMasterKey;
use crate::env::{decrypt_payload, diff, encrypt_payload, Snapshot, SnapshotDiff};
use crate::secret_store::SecretStore;
use crate::session::Session;

/// A decrypted environment version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedSnapshot {
    pub version: i32,
    /// Metadata `type` the version was created with
    pub kind: String,
    pub snapshot: Snapshot,
}

impl VersionedSnapshot {
    pub(crate) fn open(pmk: &ProjectMasterKey, record: EnvVersion) -> Result<Self, ClientError> {
        let snapshot = decrypt_payload(pmk, &record.ciphertext, &record.nonce)?;
        Ok(Self {
            version: record.version,
            kind: record.metadata.kind,
            snapshot,
        })
    }
}

/// A previewed rollback, ready to be applied
///
/// Applying it appends `target` as a brand new version; the historical
/// version number is never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackPlan {
    pub project: String,
    pub env: String,
    pub current_version: i32,
    pub target_version: i32,
    /// What changes going from the current version to the target
    pub diff: SnapshotDiff,
    pub target: Snapshot,
}

impl<T: Transport, S: SecretStore> Client<T, S> {
    /// Encrypt a snapshot and append it as the next version of `env`
    pub async fn push(
        &self,
        session: &Session,
        project: &str,
        env: &str,
        snapshot: &Snapshot,
    ) -> Result<i32, ClientError> {
        self.append_version(session, project, env, snapshot, VersionMetadata::created())
            .await
    }

    /// Decrypt one version of `env`; `None` is the latest
    pub async fn pull(
        &self,
        session: &Session,
        project: &str,
        env: &str,
        version: Option<i32>,
    ) -> Result<VersionedSnapshot, ClientError> {
        let (keys, pmk) = self.project_key(session, project).await?;
        let record = self
            .fetch_version(session, keys.project_id, env, version)
            .await?;
        VersionedSnapshot::open(&pmk, record)
    }

    /// Decrypt every version of `env`, oldest first
    pub async fn history(
        &self,
        session: &Session,
        project: &str,
        env: &str,
    ) -> Result<Vec<VersionedSnapshot>, ClientError> {
        let (keys, pmk) = self.project_key(session, project).await?;
        let mut records = self
            .transport
            .send(&EnvHistoryRequest {
                project_id: keys.project_id,
                user_id: session.user_id,
                env_name: env.to_string(),
            })
            .await?
            .versions;
        records.sort_by_key(|r| r.version);

        records
            .into_iter()
            .map(|record| VersionedSnapshot::open(&pmk, record))
            .collect()
    }

    /// Diff two versions of `env`
    pub async fn diff_versions(
        &self,
        session: &Session,
        project: &str,
        env: &str,
        old: i32,
        new: i32,
    ) -> Result<(VersionedSnapshot, VersionedSnapshot, SnapshotDiff), ClientError> {
        let (keys, pmk) = self.project_key(session, project).await?;
        let old = self.fetch_version(session, keys.project_id, env, Some(old)).await?;
        let new = self.fetch_version(session, keys.project_id, env, Some(new)).await?;
        let old = VersionedSnapshot::open(&pmk, old)?;
        let new = VersionedSnapshot::open(&pmk, new)?;
        let changes = diff(&old.snapshot, &new.snapshot);
        Ok((old, new, changes))
    }

    /// Preview a rollback of `env` to `target`
    ///
    /// # Errors
    ///
    /// `AlreadyCurrent` if `target` is the latest version and
    /// `VersionNotFound` if it does not exist.
    pub async fn plan_rollback(
        &self,
        session: &Session,
        project: &str,
        env: &str,
        target: i32,
    ) -> Result<RollbackPlan, ClientError> {
        let (keys, pmk) = self.project_key(session, project).await?;

        let current = self.fetch_version(session, keys.project_id, env, None).await?;
        if target == current.version {
            return Err(ClientError::AlreadyCurrent {
                env: env.to_string(),
                version: target,
            });
        }
        if target < 1 || target > current.version {
            return Err(ClientError::VersionNotFound {
                env: env.to_string(),
                version: target,
            });
        }

        let historical = self
            .fetch_version(session, keys.project_id, env, Some(target))
            .await?;
        let current = VersionedSnapshot::open(&pmk, current)?;
        let historical = VersionedSnapshot::open(&pmk, historical)?;

        Ok(RollbackPlan {
            project: project.to_string(),
            env: env.to_string(),
            current_version: current.version,
            target_version: historical.version,
            diff: diff(&current.snapshot, &historical.snapshot),
            target: historical.snapshot,
        })
    }

    /// Append the plan's target snapshot as a new version
    pub async fn apply_rollback(
        &self,
        session: &Session,
        plan: &RollbackPlan,
    ) -> Result<i32, ClientError> {
        let version = self
            .append_version(
                session,
                &plan.project,
                &plan.env,
                &plan.target,
                VersionMetadata::rollback(),
            )
            .await?;
        tracing::info!(
            env = %plan.env,
            from = plan.current_version,
            to = plan.target_version,
            version,
            "rolled back"
        );
        Ok(version)
    }

    async fn append_version(
        &self,
        session: &Session,
        project: &str,
        env: &str,
        snapshot: &Snapshot,
        metadata: VersionMetadata,
    ) -> Result<i32, ClientError> {
        let (keys, pmk) = self.project_key(session, project).await?;
        let sealed = encrypt_payload(&pmk, snapshot)?;
        drop(pmk);

        let response = self
            .transport
            .send(&PushEnvRequest {
                project_id: keys.project_id,
                user_id: session.user_id,
                env_name: env.to_string(),
                ciphertext: sealed.ciphertext,
                nonce: sealed.nonce.to_vec(),
                metadata,
            })
            .await?;

        tracing::info!(
            project_id = %keys.project_id,
            env,
            version = response.version,
            keys = snapshot.len(),
            "pushed new version"
        );
        Ok(response.version)
    }

    async fn fetch_version(
        &self,
        session: &Session,
        project_id: Uuid,
        env: &str,
        version: Option<i32>,
    ) -> Result<EnvVersion, ClientError> {
        self.transport
            .send(&GetEnvRequest {
                project_id,
                user_id: session.user_id,
                env_name: env.to_string(),
                version,
            })
            .await
            .map_err(|e| match (e, version) {
                (TransportError::NotFound(_), Some(version)) => ClientError::VersionNotFound {
                    env: env.to_string(),
                    version,
                },
                (TransportError::NotFound(_), None) => {
                    ClientError::NotFound(format!("environment {}", env))
                }
                (other, _) => other.into(),
            })
    }
}
