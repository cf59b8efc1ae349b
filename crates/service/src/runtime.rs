//! Runtime environment helpers
//!
//! Thin wrapper around `common::env` so binaries can prepare the media
//! directory through `service::runtime` without depending on `common`.

/// Make sure the media directory exists before uploads are accepted.
pub async fn ensure_env(media_dir: &str) -> anyhow::Result<()> {
    common::env::ensure_media_dir(media_dir).await
}
