mod common;

use ::common::client::ClientError;
use ::common::recipient::MemberRole;

#[tokio::test]
async fn test_added_member_can_pull() {
    let fx = common::setup_project("api").await;
    let (bob, bob_session) = common::register(&fx.backend, "bob@example.com").await;
    let snapshot = common::snapshot(&[("TOKEN", "abc")]);
    fx.owner
        .push(&fx.session, "api", "prod", &snapshot)
        .await
        .unwrap();

    fx.owner
        .add_member(&fx.session, "api", "bob@example.com", MemberRole::Member)
        .await
        .unwrap();
    assert_eq!(fx.backend.wrapped_key_count(fx.project_id), 2);

    let pulled = bob.pull(&bob_session, "api", "prod", None).await.unwrap();
    assert_eq!(pulled.snapshot, snapshot);

    // members can push too
    let v2 = bob
        .push(&bob_session, "api", "prod", &common::snapshot(&[("TOKEN", "def")]))
        .await
        .unwrap();
    assert_eq!(v2, 2);
}

#[tokio::test]
async fn test_non_member_cannot_pull() {
    let fx = common::setup_project("api").await;
    let (eve, eve_session) = common::register(&fx.backend, "eve@example.com").await;
    fx.owner
        .push(&fx.session, "api", "prod", &common::snapshot(&[("A", "1")]))
        .await
        .unwrap();

    assert!(matches!(
        eve.pull(&eve_session, "api", "prod", None).await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_plain_member_cannot_add_members() {
    let fx = common::setup_project("api").await;
    let (bob, bob_session) = common::register(&fx.backend, "bob@example.com").await;
    common::register(&fx.backend, "carol@example.com").await;
    fx.owner
        .add_member(&fx.session, "api", "bob@example.com", MemberRole::Member)
        .await
        .unwrap();

    assert!(bob
        .add_member(&bob_session, "api", "carol@example.com", MemberRole::Member)
        .await
        .is_err());
    assert_eq!(fx.backend.wrapped_key_count(fx.project_id), 2);
}

#[tokio::test]
async fn test_admin_can_add_members() {
    let fx = common::setup_project("api").await;
    let (bob, bob_session) = common::register(&fx.backend, "bob@example.com").await;
    let (carol, carol_session) = common::register(&fx.backend, "carol@example.com").await;
    fx.owner
        .add_member(&fx.session, "api", "bob@example.com", MemberRole::Admin)
        .await
        .unwrap();

    bob.add_member(&bob_session, "api", "carol@example.com", MemberRole::Member)
        .await
        .unwrap();
    bob.push(&bob_session, "api", "dev", &common::snapshot(&[("K", "v")]))
        .await
        .unwrap();
    let pulled = carol
        .pull(&carol_session, "api", "dev", None)
        .await
        .unwrap();
    assert_eq!(pulled.snapshot["K"], "v");
}

#[tokio::test]
async fn test_add_unknown_user() {
    let fx = common::setup_project("api").await;
    assert!(matches!(
        fx.owner
            .add_member(&fx.session, "api", "ghost@example.com", MemberRole::Member)
            .await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_revoked_member_loses_access() {
    let fx = common::setup_project("api").await;
    let (bob, bob_session) = common::register(&fx.backend, "bob@example.com").await;
    fx.owner
        .add_member(&fx.session, "api", "bob@example.com", MemberRole::Member)
        .await
        .unwrap();
    fx.owner
        .push(&fx.session, "api", "prod", &common::snapshot(&[("A", "1")]))
        .await
        .unwrap();

    fx.owner
        .revoke_member(&fx.session, "api", "bob@example.com")
        .await
        .unwrap();
    assert_eq!(fx.backend.wrapped_key_count(fx.project_id), 1);
    assert!(bob.pull(&bob_session, "api", "prod", None).await.is_err());

    // the owner is unaffected
    let pulled = fx
        .owner
        .pull(&fx.session, "api", "prod", None)
        .await
        .unwrap();
    assert_eq!(pulled.snapshot["A"], "1");
}

#[tokio::test]
async fn test_owner_cannot_be_revoked() {
    let fx = common::setup_project("api").await;
    let (bob, bob_session) = common::register(&fx.backend, "bob@example.com").await;
    fx.owner
        .add_member(&fx.session, "api", "bob@example.com", MemberRole::Admin)
        .await
        .unwrap();

    assert!(bob
        .revoke_member(&bob_session, "api", "owner@example.com")
        .await
        .is_err());
    assert_eq!(fx.backend.wrapped_key_count(fx.project_id), 2);
}

#[tokio::test]
async fn test_delete_project() {
    let fx = common::setup_project("api").await;
    let (bob, bob_session) = common::register(&fx.backend, "bob@example.com").await;
    fx.owner
        .add_member(&fx.session, "api", "bob@example.com", MemberRole::Admin)
        .await
        .unwrap();
    fx.owner
        .push(&fx.session, "api", "prod", &common::snapshot(&[("A", "1")]))
        .await
        .unwrap();

    // only the owner may delete
    assert!(bob.delete_project(&bob_session, "api").await.is_err());

    fx.owner.delete_project(&fx.session, "api").await.unwrap();
    assert_eq!(fx.backend.wrapped_key_count(fx.project_id), 0);
    assert_eq!(fx.backend.version_count(fx.project_id, "prod"), 0);
    assert!(matches!(
        fx.owner.delete_project(&fx.session, "api").await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_project_names_are_scoped_per_user() {
    let fx = common::setup_project("api").await;
    let (bob, bob_session) = common::register(&fx.backend, "bob@example.com").await;

    // another user may own an "api" project too
    bob.create_project(&bob_session, "api").await.unwrap();
    // but the owner may not create a second one
    assert!(fx.owner.create_project(&fx.session, "api").await.is_err());
}
