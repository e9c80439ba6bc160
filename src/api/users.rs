//! User account and session endpoints.
//!
//! - POST `/register` - Create an account and start a session
//! - POST `/login` - Password login, sets both auth cookies
//! - POST `/logout` - Clear the stored refresh token and both cookies
//! - GET `/details` - Current user details
//! - POST `/auth/google` - Identity-provider sign-in

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::error::{ApiError, ResultExt};
use crate::auth::{
    ACCESS_COOKIE_NAME, Auth, REFRESH_COOKIE_NAME, SessionTokens, clear_cookie, issue_session,
};
use crate::db::{Database, User};
use crate::impl_has_auth_state;
use crate::jwt::JwtConfig;
use crate::oauth::{IdentityError, IdentityProvider};
use crate::password::{hash_password, verify_password};

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub identity: Arc<dyn IdentityProvider>,
    pub secure_cookies: bool,
}

impl_has_auth_state!(UsersState);

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/details", get(details))
        .route("/auth/google", post(google_auth))
        .with_state(state)
}

/// Public view of a user. Password hash and refresh token never leave the
/// server.
#[derive(Serialize)]
struct UserResponse {
    uuid: String,
    email: String,
    name: String,
    role: crate::db::UserRole,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            uuid: user.uuid.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

fn session_response(
    status: StatusCode,
    user: &User,
    tokens: &SessionTokens,
    secure: bool,
) -> impl IntoResponse + use<> {
    let (access_cookie, refresh_cookie) = tokens.cookies(secure);
    (
        status,
        AppendHeaders([(SET_COOKIE, access_cookie), (SET_COOKIE, refresh_cookie)]),
        Json(UserResponse::from(user)),
    )
}

#[derive(Deserialize)]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

async fn register(
    State(state): State<UsersState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim();
    let email = req.email.trim();
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Name, email and password are required"));
    }
    if !email.contains('@') {
        return Err(ApiError::bad_request("Invalid email address"));
    }

    if state
        .db
        .users()
        .get_by_email(email)
        .await
        .db_err("Failed to check email")?
        .is_some()
    {
        return Err(ApiError::conflict("Email is already registered"));
    }

    let password_hash = hash_password(&req.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::internal("Failed to create account")
    })?;

    let uuid = Uuid::new_v4().to_string();
    state
        .db
        .users()
        .create(&uuid, name, email, &password_hash)
        .await
        .db_err("Failed to create user")?;

    let user = state
        .db
        .users()
        .get_by_uuid(&uuid)
        .await
        .db_err("Failed to load user")?
        .ok_or_else(|| ApiError::internal("Failed to create account"))?;

    let tokens = issue_session(&state.jwt, &state.db.users(), &uuid)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to issue session");
            ApiError::internal("Failed to create session")
        })?;

    info!(user = %uuid, "User registered");
    Ok(session_response(
        StatusCode::CREATED,
        &user,
        &tokens,
        state.secure_cookies,
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login(
    State(state): State<UsersState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    // Unknown email and wrong password are indistinguishable to the caller.
    let user = state
        .db
        .users()
        .get_by_email(req.email.trim())
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !verify_password(&user.password_hash, &req.password) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let tokens = issue_session(&state.jwt, &state.db.users(), &user.uuid)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to issue session");
            ApiError::internal("Failed to create session")
        })?;

    info!(user = %user.uuid, "User logged in");
    Ok(session_response(
        StatusCode::OK,
        &user,
        &tokens,
        state.secure_cookies,
    ))
}

/// Logout: clear the stored refresh token (invalidating all circulating
/// copies) and expire both auth cookies.
async fn logout(
    State(state): State<UsersState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .users()
        .set_refresh_token(&user.uuid, None)
        .await
        .db_err("Failed to clear refresh token")?;

    let secure = state.secure_cookies;
    info!(user = %user.uuid, "User logged out");
    Ok((
        StatusCode::OK,
        AppendHeaders([
            (SET_COOKIE, clear_cookie(ACCESS_COOKIE_NAME, secure)),
            (SET_COOKIE, clear_cookie(REFRESH_COOKIE_NAME, secure)),
        ]),
        Json(serde_json::json!({ "success": true })),
    ))
}

async fn details(Auth(user): Auth) -> impl IntoResponse {
    (StatusCode::OK, Json(UserResponse::from(&user)))
}

#[derive(Deserialize)]
struct GoogleAuthRequest {
    token: String,
}

/// Sign in with an identity-provider code. Creates the user on first
/// sign-in with a random password credential.
async fn google_auth(
    State(state): State<UsersState>,
    Json(req): Json<GoogleAuthRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.token.trim().is_empty() {
        return Err(ApiError::bad_request("Token is required"));
    }

    let claims = state.identity.exchange(&req.token).await.map_err(|e| match e {
        IdentityError::InvalidCode => ApiError::unauthorized("Identity token rejected"),
        IdentityError::Unavailable => {
            ApiError::service_unavailable("Identity provider unavailable")
        }
    })?;

    let existing = state
        .db
        .users()
        .get_by_email(&claims.email)
        .await
        .db_err("Failed to look up user")?;

    let (user, created) = match existing {
        Some(user) => (user, false),
        None => {
            // First sign-in: the account gets a random password credential
            // the user can reset later.
            let password: String = rand::rng()
                .sample_iter(&Alphanumeric)
                .take(16)
                .map(char::from)
                .collect();
            let password_hash = hash_password(&password).map_err(|e| {
                error!(error = %e, "Password hashing failed");
                ApiError::internal("Failed to create account")
            })?;

            let uuid = Uuid::new_v4().to_string();
            state
                .db
                .users()
                .create(&uuid, &claims.name, &claims.email, &password_hash)
                .await
                .db_err("Failed to create user")?;

            let user = state
                .db
                .users()
                .get_by_uuid(&uuid)
                .await
                .db_err("Failed to load user")?
                .ok_or_else(|| ApiError::internal("Failed to create account"))?;
            (user, true)
        }
    };

    let tokens = issue_session(&state.jwt, &state.db.users(), &user.uuid)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to issue session");
            ApiError::internal("Failed to create session")
        })?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    info!(user = %user.uuid, created, "Identity sign-in");
    Ok(session_response(status, &user, &tokens, state.secure_cookies))
}
