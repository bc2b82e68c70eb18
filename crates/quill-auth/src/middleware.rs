//! Identity gate for Axum
//!
//! Every authenticated request goes through [`IdentityGate::authenticate`]:
//! the bearer token is extracted, validated, and its subject re-resolved
//! against the credential store before a [`VerifiedIdentity`] is produced.
//! Handlers receive the identity as a typed extractor argument.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use quill_db::UserRole;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AuthError, UnauthenticatedReason};
use crate::jwt::TokenCodec;
use crate::store::CredentialStore;

/// Identity of the caller of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerifiedIdentity {
    pub subject_id: i64,
    pub role: UserRole,
}

/// Extract bearer token from authorization header
///
/// The header must be exactly `Bearer <token>` with a single space and a
/// token that contains no whitespace.
pub fn extract_bearer_token(header: &str) -> Result<&str, AuthError> {
    let malformed = || AuthError::Unauthenticated(UnauthenticatedReason::MissingCredential);

    let (scheme, token) = header.split_once(' ').ok_or_else(malformed)?;
    if scheme != "Bearer" || token.is_empty() || token.contains(char::is_whitespace) {
        return Err(malformed());
    }
    Ok(token)
}

/// Authenticates requests against the token codec and credential store
#[derive(Clone)]
pub struct IdentityGate {
    codec: Arc<TokenCodec>,
    credentials: Arc<dyn CredentialStore>,
}

impl IdentityGate {
    pub fn new(codec: Arc<TokenCodec>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self { codec, credentials }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Resolve the caller of a request from its headers
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<VerifiedIdentity, AuthError> {
        self.authenticate_at(Utc::now(), headers).await
    }

    /// Resolve the caller as of the given instant
    pub async fn authenticate_at(
        &self,
        now: DateTime<Utc>,
        headers: &HeaderMap,
    ) -> Result<VerifiedIdentity, AuthError> {
        let result = self.resolve(now, headers).await;

        match &result {
            Ok(identity) => {
                debug!("Authenticated subject {} ({})", identity.subject_id, identity.role);
            }
            Err(AuthError::Unauthenticated(reason)) => {
                debug!("Rejected request: {}", reason);
                metrics::counter!("quill_auth_rejections_total", "reason" => reason.as_label())
                    .increment(1);
            }
            Err(_) => {}
        }

        result
    }

    async fn resolve(
        &self,
        now: DateTime<Utc>,
        headers: &HeaderMap,
    ) -> Result<VerifiedIdentity, AuthError> {
        let header = headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::Unauthenticated(
                UnauthenticatedReason::MissingCredential,
            ))?;

        let token = extract_bearer_token(header)?;

        let claims = self
            .codec
            .validate_at(now, token)
            .map_err(|e| AuthError::Unauthenticated(e.kind().into()))?;

        // The token may outlive the account it was issued for.
        if self.credentials.find_by_id(claims.subject_id).await?.is_none() {
            return Err(AuthError::Unauthenticated(
                UnauthenticatedReason::SubjectGone,
            ));
        }

        Ok(VerifiedIdentity {
            subject_id: claims.subject_id,
            role: claims.role,
        })
    }
}

/// Authentication middleware
///
/// Rejects the request unless the identity gate accepts it, and attaches
/// the [`VerifiedIdentity`] to the request for the handlers behind it.
pub async fn identity_layer(
    State(gate): State<Arc<IdentityGate>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = gate.authenticate(request.headers()).await?;
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for VerifiedIdentity
where
    Arc<IdentityGate>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already authenticated by `identity_layer`
        if let Some(identity) = parts.extensions.get::<VerifiedIdentity>() {
            return Ok(*identity);
        }

        let gate = Arc::<IdentityGate>::from_ref(state);
        gate.authenticate(&parts.headers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCredentials;
    use axum::{Router, body::Body, http::StatusCode, middleware, routing::get};
    use axum::http::HeaderValue;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret-key-with-at-least-32-bytes";

    fn setup() -> (Arc<IdentityGate>, Arc<MemoryCredentials>) {
        let codec = Arc::new(TokenCodec::new(SECRET, "quill", 3600).unwrap());
        let credentials = Arc::new(MemoryCredentials::default());
        credentials.insert(1, "alice", UserRole::User);
        credentials.insert(2, "root", UserRole::Admin);
        let gate = Arc::new(IdentityGate::new(codec, credentials.clone()));
        (gate, credentials)
    }

    fn bearer(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn reason(result: Result<VerifiedIdentity, AuthError>) -> UnauthenticatedReason {
        match result {
            Err(AuthError::Unauthenticated(reason)) => reason,
            other => panic!("expected an unauthenticated rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def.ghi").unwrap(), "abc.def.ghi");

        for header in ["", "Bearer", "Bearer ", "bearer abc", "Basic abc", "Bearer  abc", "Bearer a b", "Bearerabc"] {
            assert!(
                matches!(
                    extract_bearer_token(header),
                    Err(AuthError::Unauthenticated(UnauthenticatedReason::MissingCredential))
                ),
                "{:?} should be rejected",
                header
            );
        }
    }

    #[tokio::test]
    async fn test_valid_token_resolves_identity() {
        let (gate, _) = setup();
        let token = gate.codec().issue(1, UserRole::User, 60).unwrap();

        let identity = gate.authenticate(&bearer(&format!("Bearer {}", token))).await.unwrap();
        assert_eq!(identity, VerifiedIdentity { subject_id: 1, role: UserRole::User });
    }

    #[tokio::test]
    async fn test_rejections() {
        let (gate, _) = setup();

        assert_eq!(
            reason(gate.authenticate(&HeaderMap::new()).await),
            UnauthenticatedReason::MissingCredential
        );
        assert_eq!(
            reason(gate.authenticate(&bearer("Token abc")).await),
            UnauthenticatedReason::MissingCredential
        );
        assert_eq!(
            reason(gate.authenticate(&bearer("Bearer garbage")).await),
            UnauthenticatedReason::TokenMalformed
        );

        let foreign = TokenCodec::new("some-other-secret-that-is-long-enough", "quill", 60)
            .unwrap()
            .issue(1, UserRole::Admin, 60)
            .unwrap();
        assert_eq!(
            reason(gate.authenticate(&bearer(&format!("Bearer {}", foreign))).await),
            UnauthenticatedReason::TokenTampered
        );
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let (gate, _) = setup();
        let token = gate.codec().issue(1, UserRole::User, 60).unwrap();
        let later = Utc::now() + chrono::Duration::seconds(61);

        assert_eq!(
            reason(gate.authenticate_at(later, &bearer(&format!("Bearer {}", token))).await),
            UnauthenticatedReason::TokenExpired
        );
    }

    #[tokio::test]
    async fn test_deleted_subject_rejected() {
        let (gate, credentials) = setup();
        let headers = bearer(&format!("Bearer {}", gate.codec().issue(1, UserRole::User, 60).unwrap()));

        assert!(gate.authenticate(&headers).await.is_ok());
        credentials.remove(1);
        assert_eq!(reason(gate.authenticate(&headers).await), UnauthenticatedReason::SubjectGone);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_unauthenticated() {
        let (gate, credentials) = setup();
        let headers = bearer(&format!("Bearer {}", gate.codec().issue(1, UserRole::User, 60).unwrap()));

        credentials.set_unavailable(true);
        assert!(matches!(
            gate.authenticate(&headers).await,
            Err(AuthError::CollaboratorUnavailable(_))
        ));
    }

    async fn whoami(identity: VerifiedIdentity) -> String {
        format!("{}:{}", identity.subject_id, identity.role)
    }

    #[tokio::test]
    async fn test_extractor_and_layer() {
        let (gate, _) = setup();
        let token = gate.codec().issue(2, UserRole::Admin, 60).unwrap();

        let app = Router::new()
            .route("/extractor", get(whoami))
            .merge(
                Router::new()
                    .route("/layered", get(whoami))
                    .route_layer(middleware::from_fn_with_state(gate.clone(), identity_layer)),
            )
            .with_state(gate);

        for path in ["/extractor", "/layered"] {
            let response = app
                .clone()
                .oneshot(
                    axum::http::Request::builder()
                        .uri(path)
                        .header(AUTHORIZATION, format!("Bearer {}", token))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], b"2:admin");

            let response = app
                .clone()
                .oneshot(axum::http::Request::builder().uri(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }
}
