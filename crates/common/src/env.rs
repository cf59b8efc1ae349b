//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use tracing::info;

/// Ensure the media directory (profile photos, uploaded files) exists.
pub async fn ensure_media_dir(media_dir: &str) -> anyhow::Result<()> {
    if tokio::fs::metadata(media_dir).await.is_err() {
        info!(%media_dir, "media directory missing; creating it");
    }
    tokio::fs::create_dir_all(media_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {media_dir}: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_nested_media_dir() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!("cultucat-media-{}", std::process::id())).join("nested");
        let path = dir.to_string_lossy().to_string();
        ensure_media_dir(&path).await?;
        assert!(tokio::fs::metadata(&path).await?.is_dir());
        // idempotent
        ensure_media_dir(&path).await?;
        tokio::fs::remove_dir_all(dir.parent().unwrap_or(&dir)).await?;
        Ok(())
    }
}
