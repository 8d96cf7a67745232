mod common;

use ::common::api::{ENV_CREATED, ENV_ROLLBACK};
use ::common::client::ClientError;
use ::common::crypto::CryptoError;
use ::common::env::{parse, EnvError};

#[tokio::test]
async fn test_push_pull_roundtrip() {
    let fx = common::setup_project("api").await;
    let snapshot = parse(
        "# db\nexport DATABASE_URL=postgres://localhost/app\nGREETING=\"hello\\nworld\"\nEMPTY=\n",
    )
    .unwrap();

    let version = fx
        .owner
        .push(&fx.session, "api", "production", &snapshot)
        .await
        .unwrap();
    assert_eq!(version, 1);

    let pulled = fx
        .owner
        .pull(&fx.session, "api", "production", None)
        .await
        .unwrap();
    assert_eq!(pulled.version, 1);
    assert_eq!(pulled.kind, ENV_CREATED);
    assert_eq!(pulled.snapshot, snapshot);
    assert_eq!(pulled.snapshot["GREETING"], "hello\nworld");
    assert_eq!(pulled.snapshot["EMPTY"], "");
}

#[tokio::test]
async fn test_backend_stores_only_ciphertext() {
    let fx = common::setup_project("api").await;
    let snapshot = common::snapshot(&[("API_TOKEN", "super-secret-value")]);
    fx.owner
        .push(&fx.session, "api", "dev", &snapshot)
        .await
        .unwrap();

    let stored = fx.backend.stored_version(fx.project_id, "dev", 1).unwrap();
    assert_eq!(stored.nonce.len(), 12);
    let needle = b"super-secret-value";
    assert!(!stored
        .ciphertext
        .windows(needle.len())
        .any(|w| w == needle));
}

#[tokio::test]
async fn test_versions_are_sequential_per_env() {
    let fx = common::setup_project("api").await;
    let s = common::snapshot(&[("A", "1")]);

    assert_eq!(fx.owner.push(&fx.session, "api", "dev", &s).await.unwrap(), 1);
    assert_eq!(fx.owner.push(&fx.session, "api", "dev", &s).await.unwrap(), 2);
    assert_eq!(fx.owner.push(&fx.session, "api", "prod", &s).await.unwrap(), 1);

    let history = fx.owner.history(&fx.session, "api", "dev").await.unwrap();
    assert_eq!(
        history.iter().map(|v| v.version).collect::<Vec<_>>(),
        vec![1, 2]
    );
    assert_eq!(fx.backend.version_count(fx.project_id, "dev"), 2);
    assert_eq!(fx.backend.version_count(fx.project_id, "prod"), 1);
}

#[tokio::test]
async fn test_pull_missing_env_and_version() {
    let fx = common::setup_project("api").await;

    assert!(matches!(
        fx.owner.pull(&fx.session, "api", "staging", None).await,
        Err(ClientError::NotFound(_))
    ));

    fx.owner
        .push(&fx.session, "api", "staging", &common::snapshot(&[("A", "1")]))
        .await
        .unwrap();
    assert!(matches!(
        fx.owner.pull(&fx.session, "api", "staging", Some(7)).await,
        Err(ClientError::VersionNotFound { version: 7, .. })
    ));
}

#[tokio::test]
async fn test_unknown_project() {
    let fx = common::setup_project("api").await;
    assert!(matches!(
        fx.owner.pull(&fx.session, "web", "dev", None).await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_diff_and_rollback_appends_new_version() {
    let fx = common::setup_project("api").await;
    let v1 = common::snapshot(&[("FOO", "bar")]);
    let v2 = common::snapshot(&[("FOO", "baz"), ("NEW", "1")]);

    fx.owner.push(&fx.session, "api", "production", &v1).await.unwrap();
    fx.owner.push(&fx.session, "api", "production", &v2).await.unwrap();

    let (old, new, changes) = fx
        .owner
        .diff_versions(&fx.session, "api", "production", 1, 2)
        .await
        .unwrap();
    assert_eq!(old.snapshot, v1);
    assert_eq!(new.snapshot, v2);
    assert_eq!(changes.added, vec!["NEW".to_string()]);
    assert!(changes.removed.is_empty());
    assert_eq!(changes.modified, vec!["FOO".to_string()]);

    let plan = fx
        .owner
        .plan_rollback(&fx.session, "api", "production", 1)
        .await
        .unwrap();
    assert_eq!(plan.current_version, 2);
    assert_eq!(plan.target_version, 1);
    assert_eq!(plan.diff.removed, vec!["NEW".to_string()]);
    assert_eq!(plan.diff.modified, vec!["FOO".to_string()]);

    let version = fx.owner.apply_rollback(&fx.session, &plan).await.unwrap();
    assert_eq!(version, 3);

    let latest = fx
        .owner
        .pull(&fx.session, "api", "production", None)
        .await
        .unwrap();
    assert_eq!(latest.version, 3);
    assert_eq!(latest.kind, ENV_ROLLBACK);
    assert_eq!(latest.snapshot, v1);

    // history is never rewritten
    let v2_again = fx
        .owner
        .pull(&fx.session, "api", "production", Some(2))
        .await
        .unwrap();
    assert_eq!(v2_again.snapshot, v2);
    assert_eq!(fx.backend.version_count(fx.project_id, "production"), 3);
}

#[tokio::test]
async fn test_rollback_rejects_current_and_unknown_targets() {
    let fx = common::setup_project("api").await;
    let s = common::snapshot(&[("A", "1")]);
    fx.owner.push(&fx.session, "api", "dev", &s).await.unwrap();
    fx.owner.push(&fx.session, "api", "dev", &s).await.unwrap();

    assert!(matches!(
        fx.owner.plan_rollback(&fx.session, "api", "dev", 2).await,
        Err(ClientError::AlreadyCurrent { version: 2, .. })
    ));
    assert!(matches!(
        fx.owner.plan_rollback(&fx.session, "api", "dev", 5).await,
        Err(ClientError::VersionNotFound { version: 5, .. })
    ));
    assert!(matches!(
        fx.owner.plan_rollback(&fx.session, "api", "dev", 0).await,
        Err(ClientError::VersionNotFound { version: 0, .. })
    ));
    assert_eq!(fx.backend.version_count(fx.project_id, "dev"), 2);
}

#[tokio::test]
async fn test_tampered_version_fails_authentication() {
    let fx = common::setup_project("api").await;
    fx.owner
        .push(&fx.session, "api", "dev", &common::snapshot(&[("A", "1")]))
        .await
        .unwrap();

    assert!(fx.backend.tamper_version(fx.project_id, "dev", 1));
    assert!(matches!(
        fx.owner.pull(&fx.session, "api", "dev", None).await,
        Err(ClientError::Env(EnvError::Crypto(
            CryptoError::AuthenticationFailure
        )))
    ));
}

#[tokio::test]
async fn test_invalid_key_is_rejected_before_upload() {
    let fx = common::setup_project("api").await;
    let bad = common::snapshot(&[("1BAD", "x")]);

    assert!(matches!(
        fx.owner.push(&fx.session, "api", "dev", &bad).await,
        Err(ClientError::Env(EnvError::InvalidKey(_)))
    ));
    assert_eq!(fx.backend.version_count(fx.project_id, "dev"), 0);
}
