use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            Ack, AuthResponse, LoginRequest, PublicUser, RegisterRequest, ResendOtpRequest,
            VerifyOtpRequest,
        },
        jwt::{AuthUser, JwtKeys},
        otp,
        password::verify_password,
        repo_types::User,
    },
    error::AuthError,
    mail::otp_email,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify-otp", post(verify_otp))
        .route("/resend-otp", post(resend_otp))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

/// Issue a fresh OTP for the user and email it. Delivery is best-effort: a
/// provider outage is logged and the enclosing operation still succeeds.
async fn issue_and_send_otp(state: &AppState, user: &User) -> Result<(), AuthError> {
    let ttl_minutes = state.config.otp.ttl_minutes;
    let issued = otp::issue(Duration::minutes(ttl_minutes))?;
    User::set_otp(&state.db, user.id, &issued.hash, issued.expires_at).await?;

    if let Err(e) = state
        .mailer
        .send(
            &user.email,
            "Verify your email",
            &otp_email(&user.name, &issued.code, ttl_minutes),
        )
        .await
    {
        error!(error = %format!("{e:#}"), email = %user.email, "failed to send verification email");
    }
    Ok(())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Ack>), AuthError> {
    payload.name = payload.name.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();

    if payload.name.is_empty() {
        warn!("missing name");
        return Err(AuthError::Validation("Name is required".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(AuthError::Validation("Password too short".into()));
    }

    // Cheap precheck; the unique index on email decides concurrent races.
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AuthError::DuplicateEmail);
    }

    let user = User::create(&state.db, &payload.name, &payload.email, &payload.password).await?;
    issue_and_send_otp(&state, &user).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(Ack {
            success: true,
            message: "OTP sent to email, please verify".into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(mut payload): Json<VerifyOtpRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.otp.is_empty() {
        warn!("missing email or otp");
        return Err(AuthError::Validation("Email and OTP are required".into()));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(AuthError::NotFound)?;

    if user.is_verified {
        warn!(user_id = %user.id, "already verified");
        return Err(AuthError::AlreadyVerified);
    }

    otp::verify(
        &payload.otp,
        user.otp_hash.as_deref(),
        user.otp_expires_at,
        OffsetDateTime::now_utc(),
    )?;

    // Flips the flag and clears the OTP columns together; a replay of the
    // consumed code fails with OtpMissing.
    User::mark_verified(&state.db, user.id).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "email verified");
    Ok(Json(AuthResponse {
        success: true,
        token,
        id: user.id,
        name: user.name,
        email: user.email,
    }))
}

#[instrument(skip(state, payload))]
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(mut payload): Json<ResendOtpRequest>,
) -> Result<Json<Ack>, AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or(AuthError::NotFound)?;

    if user.is_verified {
        warn!(user_id = %user.id, "already verified");
        return Err(AuthError::AlreadyVerified);
    }

    // Overwriting the stored material is the only reset path for an expired
    // code.
    issue_and_send_otp(&state, &user).await?;

    info!(user_id = %user.id, email = %user.email, "otp reissued");
    Ok(Json(Ack {
        success: true,
        message: "OTP sent to email, please verify".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        warn!("missing email or password");
        return Err(AuthError::Validation("Email and password are required".into()));
    }

    // Unknown email and wrong password must fail identically.
    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    if !user.is_verified {
        warn!(user_id = %user.id, "login before verification");
        return Err(AuthError::NotVerified);
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        success: true,
        token,
        id: user.id,
        name: user.name,
        email: user.email,
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, AuthError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| {
            error!(user_id = %user_id, "token resolved to no user");
            AuthError::TokenInvalid("User not found".into())
        })?;

    Ok(Json(PublicUser {
        id: user.id,
        name: user.name,
        email: user.email,
    }))
}

#[cfg(test)]
mod email_tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("two@@x.com"));
        assert!(!is_valid_email("spaces in@x.com"));
        assert!(!is_valid_email("a@nodot"));
    }
}
