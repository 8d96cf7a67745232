mod common;

use ::common::client::ClientError;
use ::common::crypto::SecretKey;
use ::common::service_role::repo_principal;

#[tokio::test]
async fn test_ci_pull_with_delegated_key() {
    let fx = common::setup_project("api").await;
    let principal = repo_principal("envcrypts/api", "main");
    let snapshot = common::snapshot(&[("DEPLOY_KEY", "k-123")]);
    fx.owner
        .push(&fx.session, "api", "production", &snapshot)
        .await
        .unwrap();

    let (role, keypair) = fx
        .owner
        .create_service_role(&fx.session, "deployer", &principal)
        .await
        .unwrap();
    assert_eq!(role.public_key, keypair.public_key);
    assert_eq!(role.repo_principal, principal);

    fx.owner
        .delegate_access(&fx.session, &principal, "api", "production")
        .await
        .unwrap();

    // CI has only the token and the injected private key
    let ci = common::client(&fx.backend);
    let token = fx.backend.mint_oidc_token(&principal);
    let injected = SecretKey::from_base64(&keypair.private_key.to_base64()).unwrap();
    let pulled = ci
        .ci_pull(&token, "api", "production", &injected)
        .await
        .unwrap();
    assert_eq!(pulled.version, 1);
    assert_eq!(pulled.snapshot, snapshot);
}

#[tokio::test]
async fn test_delegation_is_scoped_to_env() {
    let fx = common::setup_project("api").await;
    let principal = repo_principal("envcrypts/api", "main");
    let s = common::snapshot(&[("A", "1")]);
    fx.owner.push(&fx.session, "api", "production", &s).await.unwrap();
    fx.owner.push(&fx.session, "api", "staging", &s).await.unwrap();

    let (_, keypair) = fx
        .owner
        .create_service_role(&fx.session, "deployer", &principal)
        .await
        .unwrap();
    fx.owner
        .delegate_access(&fx.session, &principal, "api", "staging")
        .await
        .unwrap();

    let ci = common::client(&fx.backend);
    let token = fx.backend.mint_oidc_token(&principal);
    assert!(ci
        .ci_pull(&token, "api", "production", &keypair.private_key)
        .await
        .is_err());
    assert!(ci
        .ci_pull(&token, "api", "staging", &keypair.private_key)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_wrong_service_role_key_fails_unwrap() {
    let fx = common::setup_project("api").await;
    let principal = repo_principal("envcrypts/api", "main");
    fx.owner
        .push(&fx.session, "api", "production", &common::snapshot(&[("A", "1")]))
        .await
        .unwrap();
    fx.owner
        .create_service_role(&fx.session, "deployer", &principal)
        .await
        .unwrap();
    fx.owner
        .delegate_access(&fx.session, &principal, "api", "production")
        .await
        .unwrap();

    let ci = common::client(&fx.backend);
    let other = SecretKey::generate().unwrap();
    let result = ci
        .ci_pull(&fx.backend.mint_oidc_token(&principal), "api", "production", &other)
        .await;
    assert!(matches!(result, Err(ClientError::Crypto(_))));
}

#[tokio::test]
async fn test_revoke_delegation() {
    let fx = common::setup_project("api").await;
    let principal = repo_principal("envcrypts/api", "main");
    fx.owner
        .push(&fx.session, "api", "production", &common::snapshot(&[("A", "1")]))
        .await
        .unwrap();
    let (_, keypair) = fx
        .owner
        .create_service_role(&fx.session, "deployer", &principal)
        .await
        .unwrap();
    fx.owner
        .delegate_access(&fx.session, &principal, "api", "production")
        .await
        .unwrap();
    assert_eq!(fx.backend.wrapped_key_count(fx.project_id), 2);

    fx.owner
        .revoke_service_role_access(&fx.session, &principal, "api", "production")
        .await
        .unwrap();
    assert_eq!(fx.backend.wrapped_key_count(fx.project_id), 1);

    let ci = common::client(&fx.backend);
    assert!(ci
        .ci_pull(
            &fx.backend.mint_oidc_token(&principal),
            "api",
            "production",
            &keypair.private_key
        )
        .await
        .is_err());

    assert!(matches!(
        fx.owner
            .revoke_service_role_access(&fx.session, &principal, "api", "production")
            .await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_and_delete_service_roles() {
    let fx = common::setup_project("api").await;
    let main = repo_principal("envcrypts/api", "main");
    let release = repo_principal("envcrypts/api", "release");

    fx.owner
        .create_service_role(&fx.session, "main", &main)
        .await
        .unwrap();
    let (release_role, _) = fx
        .owner
        .create_service_role(&fx.session, "release", &release)
        .await
        .unwrap();
    fx.owner
        .delegate_access(&fx.session, &release, "api", "production")
        .await
        .unwrap();

    let roles = fx.owner.list_service_roles(&fx.session).await.unwrap();
    assert_eq!(roles.len(), 2);

    fx.owner
        .delete_service_role(&fx.session, release_role.id)
        .await
        .unwrap();
    let roles = fx.owner.list_service_roles(&fx.session).await.unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].repo_principal, main);

    // its delegations went with it
    assert_eq!(fx.backend.wrapped_key_count(fx.project_id), 1);
    assert!(matches!(
        fx.owner.get_service_role(&release).await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_duplicate_principal_conflicts() {
    let fx = common::setup_project("api").await;
    let principal = repo_principal("envcrypts/api", "main");
    fx.owner
        .create_service_role(&fx.session, "one", &principal)
        .await
        .unwrap();
    assert!(fx
        .owner
        .create_service_role(&fx.session, "two", &principal)
        .await
        .is_err());
}

#[tokio::test]
async fn test_member_cannot_delegate() {
    let fx = common::setup_project("api").await;
    let (bob, bob_session) = common::register(&fx.backend, "bob@example.com").await;
    fx.owner
        .add_member(
            &fx.session,
            "api",
            "bob@example.com",
            ::common::recipient::MemberRole::Member,
        )
        .await
        .unwrap();
    let principal = repo_principal("envcrypts/api", "main");
    bob.create_service_role(&bob_session, "bob-ci", &principal)
        .await
        .unwrap();

    assert!(bob
        .delegate_access(&bob_session, &principal, "api", "production")
        .await
        .is_err());
}

#[tokio::test]
async fn test_permissions_follow_grants_and_revokes() {
    let fx = common::setup_project("api").await;
    let principal = repo_principal("envcrypts/api", "main");
    let (role, _) = fx
        .owner
        .create_service_role(&fx.session, "deployer", &principal)
        .await
        .unwrap();
    assert!(fx
        .owner
        .service_role_permissions(&fx.session, &principal)
        .await
        .unwrap()
        .is_empty());

    for env in ["staging", "production"] {
        fx.owner
            .delegate_access(&fx.session, &principal, "api", env)
            .await
            .unwrap();
    }
    let perms = fx
        .owner
        .service_role_permissions(&fx.session, &principal)
        .await
        .unwrap();
    let pairs: Vec<_> = perms
        .iter()
        .map(|p| (p.project_name.as_str(), p.env_name.as_str()))
        .collect();
    assert_eq!(pairs, [("api", "production"), ("api", "staging")]);
    assert!(perms.iter().all(|p| p.project_id == fx.project_id));

    fx.owner
        .revoke_service_role_access(&fx.session, &principal, "api", "staging")
        .await
        .unwrap();
    let perms = fx
        .owner
        .service_role_permissions(&fx.session, &principal)
        .await
        .unwrap();
    assert_eq!(perms.len(), 1);
    assert_eq!(perms[0].env_name, "production");

    // only the creator may look
    let (bob, bob_session) = common::register(&fx.backend, "bob@example.com").await;
    assert!(matches!(
        bob.service_role_permissions(&bob_session, &principal).await,
        Err(ClientError::Transport(_))
    ));

    fx.owner
        .delete_service_role(&fx.session, role.id)
        .await
        .unwrap();
    assert!(matches!(
        fx.owner
            .service_role_permissions(&fx.session, &principal)
            .await,
        Err(ClientError::NotFound(_))
    ));
}
