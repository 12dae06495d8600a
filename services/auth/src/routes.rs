//! Account routes: registration, sign-in, sign-out and session lookup

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    AuthState,
    error::AuthError,
    jwt::SessionIdentity,
    models::{LoginCredentials, NewUser, RegisterRequest, User, UserResponse},
    password::{hash_password, verify_password},
    validation::validate_registration,
};

/// Create the router for the account endpoints
pub fn create_router() -> Router<AuthState> {
    Router::new()
        .route("/register", post(register))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/me", get(me))
}

/// User registration endpoint
pub async fn register(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    validate_registration(&payload).map_err(AuthError::BadRequest)?;

    let email = payload.email.trim().to_string();
    let username = payload.username.trim().to_string();

    let exists = state
        .users
        .exists_with_email_or_username(&email, &username)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to check for existing user");
            AuthError::Internal
        })?;

    if exists {
        return Err(AuthError::Conflict(
            "User with this email or username already exists".to_string(),
        ));
    }

    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            error!(error = %e, "Password hashing task failed");
            AuthError::Internal
        })?
        .map_err(|e| {
            error!(error = %e, "Failed to hash password");
            AuthError::Internal
        })?;

    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| username.clone());

    let new_user = NewUser {
        email,
        username,
        password_hash,
        name: Some(name),
    };

    let user = state.users.create(&new_user).await.map_err(|e| {
        if is_unique_violation(&e) {
            AuthError::Conflict("User with this email or username already exists".to_string())
        } else {
            error!(error = %e, "Failed to create user");
            AuthError::Internal
        }
    })?;

    let jar = attach_session(&state, jar, &user)?;
    info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        jar,
        Json(json!({
            "message": "User created successfully",
            "user": UserResponse::from(&user),
        })),
    ))
}

/// User sign-in endpoint
pub async fn signin(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(payload): Json<LoginCredentials>,
) -> Result<impl IntoResponse, AuthError> {
    let email = payload.email.trim().to_string();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AuthError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let user = state
        .users
        .find_by_email(&email)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to look up user");
            AuthError::Internal
        })?
        .ok_or(AuthError::InvalidCredentials)?;

    let password_hash = user.password_hash.clone();
    let password = payload.password;
    let valid = tokio::task::spawn_blocking(move || verify_password(&password_hash, &password))
        .await
        .map_err(|e| {
            error!(error = %e, "Password verification task failed");
            AuthError::Internal
        })?
        .map_err(|e| {
            error!(error = %e, user_id = %user.id, "Stored password hash is unreadable");
            AuthError::Internal
        })?;

    if !valid {
        warn!(user_id = %user.id, "Sign-in rejected: wrong password");
        return Err(AuthError::InvalidCredentials);
    }

    let jar = attach_session(&state, jar, &user)?;
    info!(user_id = %user.id, "User signed in");

    Ok((
        jar,
        Json(json!({
            "message": "Signed in successfully",
            "user": UserResponse::from(&user),
        })),
    ))
}

/// Sign-out endpoint
pub async fn signout(State(state): State<AuthState>, jar: CookieJar) -> impl IntoResponse {
    (
        state.sessions.clear(jar),
        Json(json!({"message": "Signed out successfully"})),
    )
}

/// Current session endpoint; `{"user": null}` when signed out
pub async fn me(State(state): State<AuthState>, jar: CookieJar) -> impl IntoResponse {
    let user = state.identity.current_user(&jar).await;
    Json(json!({ "user": user }))
}

fn attach_session(state: &AuthState, jar: CookieJar, user: &User) -> Result<CookieJar, AuthError> {
    state
        .sessions
        .attach(jar, &SessionIdentity::from(user))
        .map_err(|e| {
            error!(error = %e, "Failed to issue session token");
            AuthError::Internal
        })
}

fn is_unique_violation(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|e| e.is_unique_violation())
}
