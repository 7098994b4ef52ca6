use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use rego_database::{Body, DocumentStore, MemoryStore, SharedStore};
use rego_domain::config::{IdentityConfig, WriteMode};
use rego_domain::constants::Collection;
use rego_domain::roles::Role;
use rego_identity::{Claims, JwtAuthenticator, UserService};
use rego_kernel::ServiceError;
use rego_kernel::context::{Authenticator, Principal, RequestContext};
use rego_kernel::repository::Repository;
use serde_json::json;
use std::sync::Arc;

fn body(value: serde_json::Value) -> Body {
    value.as_object().cloned().unwrap_or_default()
}

async fn seeded() -> (SharedStore, Arc<JwtAuthenticator>) {
    let store: SharedStore = Arc::new(MemoryStore::new());
    store
        .put(
            Collection::Users,
            "kim",
            body(json!({ "displayName": "Kim Lee", "role": "Inspector", "active": true })),
        )
        .await
        .unwrap();
    store
        .put(
            Collection::Users,
            "gone",
            body(json!({ "displayName": "Former", "role": "Officer", "active": false })),
        )
        .await
        .unwrap();
    let authenticator =
        JwtAuthenticator::new(&IdentityConfig::default(), Arc::clone(&store)).unwrap();
    (store, Arc::new(authenticator))
}

#[tokio::test]
async fn issued_token_resolves_to_the_profile_role() {
    let (_, auth) = seeded().await;
    let token = auth.issue("kim", None).unwrap();

    let principal = auth.authenticate(&token).await.unwrap();
    assert_eq!(
        principal,
        Principal { user_id: "kim".into(), display_name: "Kim Lee".into(), role: Role::Inspector }
    );
}

#[tokio::test]
async fn inactive_and_unknown_users_are_forbidden() {
    let (_, auth) = seeded().await;
    for subject in ["gone", "nobody"] {
        let token = auth.issue(subject, None).unwrap();
        let err = auth.authenticate(&token).await.unwrap_err();
        assert_eq!(err.kind(), "forbidden", "subject {subject}");
    }
}

#[tokio::test]
async fn tampered_and_expired_tokens_are_unauthenticated() {
    let (_, auth) = seeded().await;

    let mut tampered = auth.issue("kim", None).unwrap();
    tampered.push('x');
    assert!(
        matches!(auth.authenticate(&tampered).await, Err(ServiceError::Unauthenticated { .. }))
    );

    let expired = Claims {
        sub: "kim".into(),
        exp: chrono::Utc::now().timestamp() - 3600,
        iat: None,
        iss: None,
        aud: None,
        name: None,
    };
    let secret = IdentityConfig::default().jwt.secret;
    let key = EncodingKey::from_secret(secret.as_bytes());
    let token = encode(&Header::new(Algorithm::HS256), &expired, &key).unwrap();
    assert!(matches!(auth.authenticate(&token).await, Err(ServiceError::Unauthenticated { .. })));

    let other_key = EncodingKey::from_secret(b"other");
    let foreign = encode(&Header::new(Algorithm::HS256), &expired, &other_key).unwrap();
    assert!(matches!(auth.authenticate(&foreign).await, Err(ServiceError::Unauthenticated { .. })));
}

#[tokio::test]
async fn empty_secret_is_rejected() {
    let mut config = IdentityConfig::default();
    config.jwt.secret.clear();
    let store: SharedStore = Arc::new(MemoryStore::new());
    assert!(JwtAuthenticator::new(&config, store).is_err());
}

#[tokio::test]
async fn role_change_takes_effect_on_the_next_request() {
    let (store, auth) = seeded().await;
    store
        .put(Collection::Users, "root", body(json!({ "displayName": "Root", "role": "Admin" })))
        .await
        .unwrap();
    let users = UserService::new(
        Repository::new(Arc::clone(&store), WriteMode::default()),
        Arc::clone(&auth),
    );

    let token = auth.issue("kim", None).unwrap();
    assert_eq!(auth.authenticate(&token).await.unwrap().role, Role::Inspector);

    let admin = RequestContext::new(
        auth.authenticate(&auth.issue("root", None).unwrap()).await.unwrap(),
    );
    let view = users.change_role(&admin, "kim", Role::Supervisor).await.unwrap();
    assert_eq!(view.role, Some(Role::Supervisor));

    assert_eq!(auth.authenticate(&token).await.unwrap().role, Role::Supervisor);
}

#[tokio::test]
async fn only_admins_manage_users() {
    let (store, auth) = seeded().await;
    let users = UserService::new(Repository::new(store, WriteMode::default()), Arc::clone(&auth));
    let inspector = RequestContext::new(
        auth.authenticate(&auth.issue("kim", None).unwrap()).await.unwrap(),
    );

    assert_eq!(users.list(&inspector).await.unwrap_err().kind(), "forbidden");
    assert_eq!(users.me(&inspector).await.unwrap().display_name.as_deref(), Some("Kim Lee"));
}
