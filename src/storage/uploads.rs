use crate::image::ImageLoader;
use crate::Result;
use std::path::{Path, PathBuf};

/// A crop photo written to the upload directory.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub filename: String,
    pub path: PathBuf,
}

/// Writes uploaded photos under server-generated names.
///
/// Client filenames only contribute an extension, so concurrent uploads of
/// `image.jpg` never overwrite each other.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn save(&self, bytes: &[u8], client_filename: Option<&str>) -> Result<StoredUpload> {
        let filename = unique_filename(bytes, client_filename);
        let path = self.root.join(&filename);

        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(
            "Stored upload {:?} as {} ({} bytes)",
            client_filename,
            path.display(),
            bytes.len()
        );

        Ok(StoredUpload { filename, path })
    }
}

fn unique_filename(bytes: &[u8], client_filename: Option<&str>) -> String {
    let extension = ImageLoader::detect_format(bytes)
        .and_then(|format| format.extensions_str().first().copied())
        .map(str::to_string)
        .or_else(|| client_filename.and_then(sanitized_extension))
        .unwrap_or_else(|| "bin".to_string());

    format!("{}.{}", uuid::Uuid::new_v4(), extension)
}

fn sanitized_extension(filename: &str) -> Option<String> {
    let extension = Path::new(filename).extension()?.to_str()?;
    if extension.is_empty()
        || extension.len() > 5
        || !extension.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};
    use std::collections::HashSet;
    use std::io::Cursor;

    fn png() -> Vec<u8> {
        let mut buffer = Vec::new();
        DynamicImage::new_rgb8(16, 16)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[tokio::test]
    async fn same_client_name_never_collides() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("crop_images")).unwrap();

        let mut names = HashSet::new();
        for _ in 0..5 {
            let stored = store.save(&png(), Some("image.jpg")).await.unwrap();
            assert!(stored.path.exists());
            assert!(stored.filename.ends_with(".png"));
            names.insert(stored.filename);
        }
        assert_eq!(names.len(), 5);
    }

    #[tokio::test]
    async fn client_name_is_not_used_as_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path()).unwrap();

        let stored = store.save(b"raw", Some("../../etc/passwd")).await.unwrap();
        assert_eq!(stored.path.parent().unwrap(), dir.path());
        assert!(stored.filename.ends_with(".bin"));
    }

    #[test]
    fn extension_sanitizing() {
        assert_eq!(sanitized_extension("photo.JPG"), Some("jpg".to_string()));
        assert_eq!(sanitized_extension("photo"), None);
        assert_eq!(sanitized_extension("photo.j/pg"), None);
        assert_eq!(sanitized_extension("photo.verylongext"), None);
    }
}
