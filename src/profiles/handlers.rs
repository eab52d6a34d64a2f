use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, patch, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        CreateProfileRequest, MessageResponse, PictureResponse, ProfileEnvelope,
        UpdateProfileRequest,
    },
    repo_types::Profile,
};
use crate::{
    auth::AuthUser,
    db::RepoError,
    error::{AppError, AppResult},
    extract::AppJson,
    images::services::{
        publish_picture, read_picture, remove_stored_picture, TempUpload, MAX_PICTURE_BYTES,
    },
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profiles", get(get_profile).post(create_profile))
        .route("/profiles/:id", put(update_profile).delete(delete_profile))
        .route(
            "/profiles/:id/profilePict",
            patch(update_picture).layer(DefaultBodyLimit::max(MAX_PICTURE_BYTES + 64 * 1024)),
        )
}

fn not_found() -> AppError {
    AppError::NotFound("Profile not found".into())
}

fn already_exists() -> AppError {
    AppError::BadRequest("Profile already exists".into())
}

fn profile_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| not_found())
}

fn is_host_and_port(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']'))
}

/// Host the client reached us on, for locally served picture URLs. Falls
/// back to the bind address when the header is absent or not a `host[:port]`.
fn request_host(headers: &HeaderMap, bind_host: &str, port: u16) -> String {
    if let Some(host) = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|h| is_host_and_port(h))
    {
        return host.to_string();
    }
    match bind_host {
        "0.0.0.0" | "::" | "" => format!("localhost:{port}"),
        _ => format!("{bind_host}:{port}"),
    }
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Profile>> {
    let profile = state
        .profiles
        .find_by_user(auth.id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(profile))
}

#[instrument(skip(state, payload))]
pub async fn create_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<CreateProfileRequest>,
) -> AppResult<(StatusCode, Json<ProfileEnvelope>)> {
    let fields = payload.validate()?;
    if state.profiles.find_by_user(auth.id).await?.is_some() {
        return Err(already_exists());
    }

    let profile = state
        .profiles
        .create(auth.id, fields)
        .await
        .map_err(|e| match e {
            RepoError::Conflict => already_exists(),
            RepoError::Other(e) => AppError::Internal(e),
        })?;

    info!(profile_id = %profile.id, user_id = %auth.id, "profile created");
    Ok((
        StatusCode::CREATED,
        Json(ProfileEnvelope {
            message: "Profile created successfully".into(),
            profile,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<ProfileEnvelope>> {
    let id = profile_id(&id)?;
    let current = state
        .profiles
        .find_owned(id, auth.id)
        .await?
        .ok_or_else(not_found)?;

    let fields = payload.apply(&current)?;
    let profile = state
        .profiles
        .update_owned(id, auth.id, fields)
        .await?
        .ok_or_else(not_found)?;

    info!(profile_id = %profile.id, "profile updated");
    Ok(Json(ProfileEnvelope {
        message: "Profile updated successfully".into(),
        profile,
    }))
}

#[instrument(skip(state, headers, multipart))]
pub async fn update_picture(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<PictureResponse>> {
    let no_file = || AppError::BadRequest("No file uploaded. Please select an image file.".into());

    let mut mp = multipart.map_err(|e| {
        warn!(error = %e, "picture upload without multipart body");
        no_file()
    })?;
    let image = read_picture(&mut mp).await?.ok_or_else(no_file)?;
    // dropped on every early return below, which removes the file
    let staged = TempUpload::stage(&state.config.upload_dir, image).await?;

    let id = profile_id(&id)?;
    let profile = state
        .profiles
        .find_owned(id, auth.id)
        .await?
        .ok_or_else(not_found)?;

    let host = request_host(&headers, &state.config.host, state.config.port);
    let url = publish_picture(&state, auth.id, staged, &host).await?;

    state
        .profiles
        .set_picture(id, auth.id, &url)
        .await?
        .ok_or_else(not_found)?;
    remove_stored_picture(&state, profile.profile_pict.as_deref()).await;

    info!(profile_id = %id, url = %url, "profile picture updated");
    Ok(Json(PictureResponse {
        message: "Profile picture updated successfully".into(),
        profile_pict_url: url,
    }))
}

#[instrument(skip(state))]
pub async fn delete_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let id = profile_id(&id)?;
    let profile = state
        .profiles
        .find_owned(id, auth.id)
        .await?
        .ok_or_else(not_found)?;

    if !state.profiles.delete_owned(id, auth.id).await? {
        return Err(not_found());
    }
    remove_stored_picture(&state, profile.profile_pict.as_deref()).await;

    info!(profile_id = %id, "profile deleted");
    Ok(Json(MessageResponse {
        message: "Profile deleted successfully".into(),
    }))
}
