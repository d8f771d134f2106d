use anyhow::Context;
use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;
use crate::users::repo::ImageKind;

pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
}

pub struct UploadedImage {
    pub key: String,
    pub url: String,
}

/// Push an image to the blob store under a fresh key. Nothing is written to
/// the database here; callers persist the returned URL themselves and call
/// [`cleanup_uploaded`] if that persist fails.
pub async fn upload_image(
    st: &AppState,
    kind: ImageKind,
    item: &UploadItem,
) -> anyhow::Result<UploadedImage> {
    let ext = ext_from_mime(&item.content_type).unwrap_or("bin");
    let key = format!("{}/{}.{}", kind.key_prefix(), Uuid::new_v4(), ext);
    let url = st
        .storage
        .upload(&key, item.body.clone(), &item.content_type)
        .await
        .with_context(|| format!("upload {}", key))?;
    Ok(UploadedImage { key, url })
}

/// Best-effort removal of an orphaned upload. Failure is logged, not
/// surfaced: the client already has its error, the blob is just garbage.
pub async fn cleanup_uploaded(st: &AppState, key: &str) {
    if let Err(e) = st.storage.delete_object(key).await {
        warn!(error = %e, %key, "failed to delete orphaned upload");
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}
