//! Account routes: registration, login and the caller's own profile

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use quill_auth::{
    AuthError, CredentialStore, UnauthenticatedReason, VerifiedIdentity, hash_password,
    verify_password,
};
use quill_db::{NewUser, UserRole};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

use super::types::{
    ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, UserResponse,
};

// ==================== Input Validation ====================

const MIN_USERNAME_LENGTH: usize = 2;
const MAX_USERNAME_LENGTH: usize = 20;
const MIN_PASSWORD_LENGTH: usize = 6;
/// Upper bound keeps hashing cost bounded
const MAX_PASSWORD_LENGTH: usize = 256;

/// Valid Argon2 hash that matches no password, verified when the login
/// identifier is unknown.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$dGltaW5nX2F0dGFja19wcmV2ZW50aW9u$K8rI5T7VdQ8xkO0GqK5K2w";

/// Validate username format and length
pub(crate) fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(ApiError::BadRequest(format!(
            "Username must be between {} and {} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ApiError::BadRequest(
            "Username can only contain letters, digits, underscores, and hyphens".to_string(),
        ));
    }
    Ok(())
}

/// Validate password length
pub(crate) fn validate_password(password: &str) -> Result<(), ApiError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

// ==================== Public Routes ====================

/// POST /api/v1/user/register
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    validate_username(&request.username)?;
    validate_password(&request.password)?;

    debug!("Registering user: {}", request.username);

    let password_hash = hash_password(&request.password)?;
    let user = state
        .db
        .insert_user(NewUser {
            username: request.username,
            password_hash,
            avatar: request.avatar,
            role: UserRole::User,
        })
        .await?;

    info!("Registered user: {}", user.username);

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /api/v1/user/login
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if request.password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }

    debug!("Login attempt for user: {}", request.username);

    let credential = state
        .db
        .find_by_identifier(&request.username)
        .await
        .map_err(AuthError::from)?;

    // Unknown users still pay for one verification.
    let hash_to_verify = credential
        .as_ref()
        .map_or(DUMMY_HASH, |c| c.password_hash.as_str());
    let password_valid = verify_password(hash_to_verify, &request.password);

    let credential = match (credential, password_valid) {
        (Some(c), true) => c,
        _ => {
            metrics::counter!("quill_logins_total", "outcome" => "failure").increment(1);
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    let ttl = state.tokens.default_ttl();
    let token = state
        .tokens
        .issue(credential.subject_id, credential.role, ttl)?;

    let user = state
        .db
        .get_user_by_id(credential.subject_id)
        .await?
        .ok_or(AuthError::Unauthenticated(UnauthenticatedReason::SubjectGone))?;

    metrics::counter!("quill_logins_total", "outcome" => "success").increment(1);
    info!("User {} logged in", user.username);

    Ok(Json(LoginResponse {
        token,
        expires_in: ttl,
        user: user.into(),
    }))
}

// ==================== Authenticated Routes ====================

/// GET /api/v1/user/info
async fn user_info(
    identity: VerifiedIdentity,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_id(identity.subject_id)
        .await?
        .ok_or(AuthError::Unauthenticated(UnauthenticatedReason::SubjectGone))?;

    Ok(Json(user.into()))
}

/// PUT /api/v1/user/password
async fn change_password(
    identity: VerifiedIdentity,
    State(state): State<AppState>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    validate_password(&request.new_password)?;

    let user = state
        .db
        .get_user_by_id(identity.subject_id)
        .await?
        .ok_or(AuthError::Unauthenticated(UnauthenticatedReason::SubjectGone))?;

    if !verify_password(&user.password_hash, &request.old_password) {
        debug!("Password change for {} rejected: wrong old password", user.username);
        return Err(AuthError::InvalidCredentials.into());
    }

    let password_hash = hash_password(&request.new_password)?;
    state
        .db
        .update_user_password(user.id, &password_hash)
        .await?;

    info!("User {} changed password", user.username);
    Ok(StatusCode::NO_CONTENT)
}

/// Create account routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/user/register", post(register))
        .route("/api/v1/user/login", post(login))
        .route("/api/v1/user/info", get(user_info))
        .route("/api/v1/user/password", put(change_password))
}
