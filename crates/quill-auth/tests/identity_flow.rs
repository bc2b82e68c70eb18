//! Register, log in, authenticate and authorize against a real database

use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use quill_auth::{
    AuthError, CredentialStore, ForbiddenReason, IdentityGate, TokenCodec, UnauthenticatedReason,
    VerifiedIdentity, authorize_mutation, hash_password, verify_password,
};
use quill_db::{Database, NewArticle, NewUser, UserRole};
use std::sync::Arc;

const SECRET: &str = "integration-test-secret-0123456789abcdef";

async fn setup() -> (Database, IdentityGate) {
    let db = Database::in_memory().await.unwrap();
    let codec = Arc::new(TokenCodec::new(SECRET, "quill", 3600).unwrap());
    let gate = IdentityGate::new(codec, Arc::new(db.clone()));
    (db, gate)
}

async fn register(db: &Database, username: &str, password: &str) -> i64 {
    db.insert_user(NewUser {
        username: username.to_string(),
        password_hash: hash_password(password).unwrap(),
        avatar: None,
        role: UserRole::User,
    })
    .await
    .unwrap()
    .id
}

async fn login(db: &Database, gate: &IdentityGate, username: &str, password: &str) -> Option<String> {
    let credential = db.find_by_identifier(username).await.unwrap()?;
    if !verify_password(&credential.password_hash, password) {
        return None;
    }
    let codec = gate.codec();
    Some(
        codec
            .issue(credential.subject_id, credential.role, codec.default_ttl())
            .unwrap(),
    )
}

fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    headers
}

#[tokio::test]
async fn test_register_login_authenticate() {
    let (db, gate) = setup().await;
    let alice_id = register(&db, "alice", "s3cret-pass").await;

    assert!(login(&db, &gate, "alice", "wrong-pass").await.is_none());
    assert!(login(&db, &gate, "nobody", "s3cret-pass").await.is_none());

    let token = login(&db, &gate, "alice", "s3cret-pass").await.unwrap();
    let identity = gate.authenticate(&bearer(&token)).await.unwrap();
    assert_eq!(
        identity,
        VerifiedIdentity {
            subject_id: alice_id,
            role: UserRole::User
        }
    );

    assert!(matches!(
        gate.authenticate(&bearer("garbage")).await,
        Err(AuthError::Unauthenticated(UnauthenticatedReason::TokenMalformed))
    ));
    assert!(matches!(
        gate.authenticate(&HeaderMap::new()).await,
        Err(AuthError::Unauthenticated(UnauthenticatedReason::MissingCredential))
    ));

    // A still-valid token stops working once the account is gone.
    assert!(db.delete_user(alice_id).await.unwrap());
    assert!(matches!(
        gate.authenticate(&bearer(&token)).await,
        Err(AuthError::Unauthenticated(UnauthenticatedReason::SubjectGone))
    ));
}

#[tokio::test]
async fn test_ownership_of_articles() {
    let (db, gate) = setup().await;
    let alice_id = register(&db, "alice", "alice-pass").await;
    let bob_id = register(&db, "bob", "bob-pass").await;
    let category = db.insert_category("notes").await.unwrap();

    let article = db
        .insert_article(NewArticle {
            title: "Hello".to_string(),
            content: "First post".to_string(),
            cover_img: None,
            category_id: category.id,
            user_id: alice_id,
            is_publish: true,
        })
        .await
        .unwrap();

    let alice = gate
        .authenticate(&bearer(&login(&db, &gate, "alice", "alice-pass").await.unwrap()))
        .await
        .unwrap();
    let bob = gate
        .authenticate(&bearer(&login(&db, &gate, "bob", "bob-pass").await.unwrap()))
        .await
        .unwrap();
    assert_eq!(bob.subject_id, bob_id);

    assert!(authorize_mutation(&alice, &db, article.id).await.is_ok());
    assert!(matches!(
        authorize_mutation(&bob, &db, article.id).await,
        Err(AuthError::Forbidden(ForbiddenReason::NotOwner))
    ));
    assert!(matches!(
        authorize_mutation(&alice, &db, article.id + 100).await,
        Err(AuthError::ResourceNotFound(_))
    ));

    assert!(db.delete_article(article.id).await.unwrap());
    assert!(matches!(
        authorize_mutation(&alice, &db, article.id).await,
        Err(AuthError::ResourceNotFound(_))
    ));
}
