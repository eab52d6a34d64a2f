use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::extract::Multipart;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
    storage::StorageClient,
};

pub const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024; // 5MB

/// Multipart field names accepted for a profile picture.
const PICTURE_FIELDS: [&str; 2] = ["profilePict", "profilePic"];

pub struct IncomingImage {
    pub content_type: String,
    pub body: Bytes,
}

/// Reads the picture field; `None` when the form carries no non-empty file.
pub async fn read_picture(mp: &mut Multipart) -> AppResult<Option<IncomingImage>> {
    while let Some(field) = mp.next_field().await? {
        if !field.name().is_some_and(|n| PICTURE_FIELDS.contains(&n)) {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field.bytes().await?;
        if body.is_empty() {
            return Ok(None);
        }
        if body.len() > MAX_PICTURE_BYTES {
            return Err(AppError::Upload("File too large. Maximum size is 5MB".into()));
        }
        return Ok(Some(IncomingImage { content_type, body }));
    }
    Ok(None)
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// An upload written to the upload directory. The file is removed when this
/// value is dropped, unless [`TempUpload::persist`] was called.
pub struct TempUpload {
    path: PathBuf,
    file_name: String,
    content_type: String,
    body: Bytes,
    armed: bool,
}

impl TempUpload {
    pub async fn stage(dir: impl AsRef<Path>, image: IncomingImage) -> AppResult<Self> {
        let ext = ext_from_mime(&image.content_type).ok_or_else(|| {
            AppError::Upload("Only image files (jpg, png, webp, gif, heic) are allowed".into())
        })?;
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create upload dir {}", dir.display()))?;

        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = dir.join(&file_name);
        tokio::fs::write(&path, &image.body)
            .await
            .with_context(|| format!("write upload {}", path.display()))?;

        Ok(Self {
            path,
            file_name,
            content_type: image.content_type,
            body: image.body,
            armed: true,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Keeps the file on disk and returns its name.
    pub fn persist(mut self) -> String {
        self.armed = false;
        std::mem::take(&mut self.file_name)
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, path = %self.path.display(), "failed to remove temporary upload");
            }
        }
    }
}

/// Publishes a staged picture and returns its public URL.
///
/// With a media host configured the file goes there and the local copy is
/// discarded; otherwise the staged file itself is served from `/uploads`.
pub async fn publish_picture(
    state: &AppState,
    user_id: Uuid,
    staged: TempUpload,
    host: &str,
) -> AppResult<String> {
    let url = match &state.media {
        Some(media) => {
            let key = format!("profiles/{}/{}", user_id, staged.file_name());
            media
                .put_object(&key, staged.body.clone(), &staged.content_type)
                .await
                .map_err(|e| AppError::Upload(format!("Upload failed: {e}")))?;
            info!(%user_id, key = %key, "profile picture uploaded");
            media.public_url(&key)
        }
        None => {
            let name = staged.persist();
            format!("http://{host}/uploads/{name}")
        }
    };
    Ok(url)
}

/// Best-effort removal of a stored picture, remote or locally served.
/// Failures are only logged.
pub async fn remove_stored_picture(state: &AppState, url: Option<&str>) {
    let Some(url) = url else {
        return;
    };
    if let Some(media) = &state.media {
        remove_remote(media.as_ref(), url).await;
    }
    if let Some(name) = local_upload_name(url) {
        remove_local(Path::new(&state.config.upload_dir), name).await;
    }
}

async fn remove_remote(media: &dyn StorageClient, url: &str) {
    let Some(key) = media.key_for_url(url) else {
        return;
    };
    if let Err(e) = media.delete_object(&key).await {
        warn!(error = %e, key = %key, "failed to delete remote picture");
    }
}

/// File name of a URL issued by the local fallback (`http://<host>/uploads/<name>`).
fn local_upload_name(url: &str) -> Option<&str> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))?;
    let (_host, path) = rest.split_once('/')?;
    let name = path.strip_prefix("uploads/")?;
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    valid.then_some(name)
}

async fn remove_local(dir: &Path, name: &str) {
    let path = dir.join(name);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => info!(path = %path.display(), "previous local picture removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, path = %path.display(), "failed to remove local picture"),
    }
}
