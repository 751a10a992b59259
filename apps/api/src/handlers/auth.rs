//! Account endpoints.
//!
//! ```text
//! register ──► users + clients rows ──► token pair
//! login ─────► argon2 verify ─────────► token pair (jti stored)
//! refresh ───► consume jti ───────────► new pair (old refresh now dead)
//! logout ────► revoke jti ────────────► 205
//! ```

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password, AuthError, AuthUser};
use crate::dto::{
    AuthResponse, ClientSummary, LoginRequest, MeResponse, RefreshRequest, RegisterRequest,
    TokenResponse, UserDto,
};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::AppState;
use sicarga_core::validation::{
    validate_email, validate_password, validate_passwords_match, validate_required,
    validate_username, FieldErrors,
};
use sicarga_core::{NewClient, NewUser, User, ValidationError};

/// Issues a token pair and remembers the refresh jti.
async fn issue_tokens(state: &AppState, user_id: i64) -> Result<TokenResponse, ApiError> {
    let pair = state.jwt.issue_pair(user_id)?;
    state
        .db
        .users()
        .store_refresh_token(
            &pair.refresh_claims.jti,
            user_id,
            pair.refresh_claims.expires_at(),
        )
        .await?;

    Ok(TokenResponse {
        access: pair.access,
        refresh: pair.refresh,
    })
}

fn auth_response(user: &User, tokens: TokenResponse) -> AuthResponse {
    AuthResponse {
        user: UserDto::from(user),
        access: tokens.access,
        refresh: tokens.refresh,
    }
}

/// `POST /api/auth/register/`
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_lowercase();

    let mut errors = FieldErrors::new();
    errors.check(validate_username(&username));
    errors.check(validate_email(&email));
    errors.check(validate_password(&req.password, &username));
    errors.check(validate_passwords_match(&req.password, &req.password2));
    let first_name = errors.check(validate_required("first_name", &req.first_name));
    let last_name = errors.check(validate_required("last_name", &req.last_name));

    let users = state.db.users();
    if !username.is_empty() && users.username_exists(&username).await? {
        errors.push(ValidationError::Duplicate {
            field: "username".to_string(),
            value: username.clone(),
        });
    }
    if !email.is_empty() && users.email_exists(&email).await? {
        errors.push(ValidationError::Duplicate {
            field: "email".to_string(),
            value: email.clone(),
        });
    }
    errors.into_result()?;

    let password_hash = hash_password(&req.password)?;
    let user = users
        .create(&NewUser {
            username,
            email,
            first_name: first_name.unwrap_or_default(),
            last_name: last_name.unwrap_or_default(),
            password_hash,
            is_staff: false,
        })
        .await?;

    let prefix = state.db.parameters().client_code_prefix().await?;
    let client = state
        .db
        .clients()
        .create(&NewClient::for_user(&user), &prefix)
        .await?;

    info!(
        user_id = user.id,
        client_code = client.client_code.as_deref().unwrap_or(""),
        "User registered"
    );

    let tokens = issue_tokens(&state, user.id).await?;
    Ok((StatusCode::CREATED, Json(auth_response(&user, tokens))))
}

/// `POST /api/auth/login/`; `username` may also be the email.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let mut errors = FieldErrors::new();
    let login = errors.check(validate_required("username", &req.username));
    if req.password.is_empty() {
        errors.push(ValidationError::Required {
            field: "password".to_string(),
        });
    }
    errors.into_result()?;
    let login = login.unwrap_or_default();

    let users = state.db.users();
    let user = match users.find_by_login(&login).await? {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        _ => {
            warn!(login = %login, "Failed login attempt");
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    if !user.is_active {
        warn!(user_id = user.id, "Login attempt on disabled account");
        return Err(AuthError::Inactive.into());
    }

    users.touch_last_login(user.id).await?;
    let tokens = issue_tokens(&state, user.id).await?;

    info!(user_id = user.id, "User logged in");
    Ok(Json(auth_response(&user, tokens)))
}

/// `POST /api/auth/refresh/`: rotates the pair. Each refresh token works once.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    if req.refresh.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "refresh".to_string(),
        }
        .into());
    }

    let claims = state.jwt.validate_refresh_token(req.refresh.trim())?;
    let users = state.db.users();

    let Some(user_id) = users.consume_refresh_token(&claims.jti).await? else {
        warn!(jti = %claims.jti, "Refresh token reused or revoked");
        return Err(AuthError::Revoked.into());
    };

    let user = users
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AuthError::InvalidToken("user no longer exists".to_string()))?;
    if !user.is_active {
        return Err(AuthError::Inactive.into());
    }

    Ok(Json(issue_tokens(&state, user.id).await?))
}

/// `POST /api/auth/logout/`
pub async fn logout(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<StatusCode, ApiError> {
    let claims = state
        .jwt
        .validate_refresh_token(req.refresh.trim())
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    if claims.user_id()? != user.id {
        return Err(ApiError::bad_request("Refresh token belongs to another user"));
    }

    state.db.users().revoke_refresh_token(&claims.jti).await?;
    info!(user_id = user.id, "User logged out");
    Ok(StatusCode::RESET_CONTENT)
}

/// `GET /api/auth/me/`
pub async fn me(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<MeResponse>, ApiError> {
    let cliente = state
        .db
        .clients()
        .get_by_user_id(user.id)
        .await?
        .map(|client| ClientSummary {
            id: client.id,
            nombre_completo: client.full_name(),
            codigo_cliente: client.client_code,
        });

    Ok(Json(MeResponse {
        user: UserDto::from(&user),
        cliente,
    }))
}
