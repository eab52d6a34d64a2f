use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::{
    google::ExternalIdentity,
    password::{hash_password, verify_password, MIN_PASSWORD_LEN},
    repo_types::{NewUser, User},
};
use crate::{
    db::RepoError,
    error::{AppError, AppResult},
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid email/password";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: Option<String>) -> String {
    email.unwrap_or_default().trim().to_lowercase()
}

/// Field checks done before touching the store; all failures are reported.
fn registration_errors(email: &str, password: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if email.is_empty() {
        errors.push("Email is required".to_string());
    } else if !is_valid_email(email) {
        errors.push("Invalid email format".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "Password is required and must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }
    errors
}

pub async fn register(
    state: &AppState,
    email: Option<String>,
    password: Option<String>,
) -> AppResult<User> {
    let email = normalize_email(email);
    let password = password.unwrap_or_default();

    let errors = registration_errors(&email, &password);
    if !errors.is_empty() {
        warn!(email = %email, "registration rejected");
        return Err(AppError::Validation(errors));
    }

    let hash = hash_password(&password)?;
    let user = state
        .users
        .create(NewUser {
            email,
            password_hash: Some(hash),
            google_id: None,
        })
        .await
        .map_err(|e| match e {
            RepoError::Conflict => AppError::Validation(vec!["Email already registered".into()]),
            RepoError::Other(e) => AppError::Internal(e),
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Unknown email and wrong password produce the same error.
pub async fn login(
    state: &AppState,
    email: Option<String>,
    password: Option<String>,
) -> AppResult<User> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AppError::BadRequest("Email is required".into()));
    }
    let password = password.filter(|p| !p.is_empty()).ok_or_else(|| {
        AppError::BadRequest("Password is required".into())
    })?;

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    let ok = match user.password_hash.as_deref() {
        Some(hash) => verify_password(&password, hash)?,
        None => false,
    };
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

/// Finds or creates the local account for a verified external identity.
/// Returns the user and whether it was created by this call.
pub async fn external_login(state: &AppState, identity: ExternalIdentity) -> AppResult<(User, bool)> {
    if !identity.email_verified {
        warn!(subject = %identity.subject, "external identity with unverified email");
        return Err(AppError::Unauthorized("Email not verified".into()));
    }

    if let Some(user) = state.users.find_by_email(&identity.email).await? {
        if user.google_id.is_none() {
            state.users.link_google(user.id, &identity.subject).await?;
        }
        return Ok((user, false));
    }

    let created = state
        .users
        .create(NewUser {
            email: identity.email.clone(),
            password_hash: None,
            google_id: Some(identity.subject.clone()),
        })
        .await;

    match created {
        Ok(user) => {
            info!(user_id = %user.id, "user created from external identity");
            Ok((user, true))
        }
        // lost a race with a concurrent first login
        Err(RepoError::Conflict) => {
            let user = state
                .users
                .find_by_email(&identity.email)
                .await?
                .ok_or_else(|| anyhow::anyhow!("user vanished after email conflict"))?;
            Ok((user, false))
        }
        Err(RepoError::Other(e)) => Err(AppError::Internal(e)),
    }
}
