use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::forms::Upload;

/// Subdirectory of the uploads root that post images go into
pub const POST_IMAGE_DIR: &str = "posts";

/// Write an already-validated image under `uploads_root` and return its relative path
pub async fn store_post_image(uploads_root: &Path, upload: &Upload) -> AppResult<String> {
    let ext = upload
        .image_extension()
        .ok_or_else(|| AppError::BadRequest("Upload is not an image".into()))?;
    let relative = format!("{}/{}.{}", POST_IMAGE_DIR, uuid::Uuid::now_v7(), ext);

    let target = uploads_root.join(&relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, &upload.data).await?;

    tracing::info!(
        "Stored upload {:?} ({} bytes) as {}",
        upload.file_name,
        upload.data.len(),
        relative
    );
    Ok(relative)
}

/// Delete a stored image; a failure is logged and otherwise ignored
pub async fn remove_post_image(uploads_root: &Path, relative: &str) {
    let target = match resolve_media_path(uploads_root, relative) {
        Ok(target) => target,
        Err(e) => {
            tracing::warn!("Not removing upload {}: {}", relative, e);
            return;
        }
    };
    match tokio::fs::remove_file(&target).await {
        Ok(()) => tracing::info!("Removed upload {}", relative),
        Err(e) => tracing::warn!("Failed to remove upload {}: {}", relative, e),
    }
}

/// Resolve a request path inside `uploads_root`, refusing anything that climbs out of it
pub fn resolve_media_path(uploads_root: &Path, requested: &str) -> AppResult<PathBuf> {
    let relative = Path::new(requested);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes || requested.is_empty() {
        return Err(AppError::PermissionDenied(format!(
            "media path {:?} is outside the uploads directory",
            requested
        )));
    }
    Ok(uploads_root.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    #[tokio::test]
    async fn stores_image_under_posts_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let upload = Upload {
            file_name: "small.gif".into(),
            data: Bytes::from_static(b"GIF89a\x01\x00\x01\x00"),
        };

        let relative = store_post_image(tmp.path(), &upload).await.unwrap();
        assert!(relative.starts_with("posts/"));
        assert!(relative.ends_with(".gif"));

        let written = std::fs::read(tmp.path().join(&relative)).unwrap();
        assert_eq!(written, upload.data.to_vec());
    }

    #[tokio::test]
    async fn removed_image_is_gone_and_missing_one_is_tolerated() {
        let tmp = tempfile::tempdir().unwrap();
        let upload = Upload {
            file_name: "small.gif".into(),
            data: Bytes::from_static(b"GIF89a\x01\x00\x01\x00"),
        };
        let relative = store_post_image(tmp.path(), &upload).await.unwrap();

        remove_post_image(tmp.path(), &relative).await;
        assert!(!tmp.path().join(&relative).exists());

        // Second removal only logs
        remove_post_image(tmp.path(), &relative).await;
        remove_post_image(tmp.path(), "../outside.gif").await;
    }

    #[test]
    fn resolve_rejects_parent_components() {
        let root = Path::new("/srv/media");
        assert!(matches!(
            resolve_media_path(root, "../etc/passwd"),
            Err(AppError::PermissionDenied(_))
        ));
        assert!(matches!(
            resolve_media_path(root, "/etc/passwd"),
            Err(AppError::PermissionDenied(_))
        ));
        assert_eq!(
            resolve_media_path(root, "posts/a.png").unwrap(),
            PathBuf::from("/srv/media/posts/a.png")
        );
    }
}
