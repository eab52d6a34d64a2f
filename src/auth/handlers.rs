use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ExternalAuthResponse, ExternalUser, LoginRequest, MeResponse,
            MessageResponse, PublicUser, RegisterRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        services,
    },
    error::{AppError, AppResult},
    extract::AppJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/google-login", post(google_login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let user = services::register(&state, payload.email, payload.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("Successfully created account with email {}", user.email),
        }),
    ))
}

#[instrument(skip(state, keys, payload))]
pub async fn login(
    State(state): State<AppState>,
    State(keys): State<JwtKeys>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = services::login(&state, payload.email, payload.password).await?;
    let access_token = keys.sign(user.id, &user.role)?;
    Ok(Json(AuthResponse {
        access_token,
        user: PublicUser {
            id: user.id,
            email: user.email,
        },
    }))
}

/// POST /google-login with the provider's ID token in the `token` header.
#[instrument(skip(state, keys, headers))]
pub async fn google_login(
    State(state): State<AppState>,
    State(keys): State<JwtKeys>,
    headers: HeaderMap,
) -> AppResult<Json<ExternalAuthResponse>> {
    let id_token = headers
        .get("token")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Token is required".into()))?;

    let identity = state.identity.verify(id_token).await.map_err(|e| {
        warn!(error = %e, "identity token rejected");
        AppError::invalid_token()
    })?;

    let (user, is_new_user) = services::external_login(&state, identity).await?;
    let access_token = keys.sign(user.id, &user.role)?;
    Ok(Json(ExternalAuthResponse {
        access_token,
        user: ExternalUser {
            id: user.id,
            email: user.email,
            is_new_user,
        },
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<MeResponse>> {
    let user = state
        .users
        .find_by_id(auth.id)
        .await?
        .ok_or_else(AppError::invalid_token)?;
    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        role: user.role,
    }))
}
