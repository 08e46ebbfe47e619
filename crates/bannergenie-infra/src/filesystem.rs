//! Data directory resolution and local image file I/O.

use std::path::{Path, PathBuf};

/// Largest file accepted for upload.
pub const MAX_UPLOAD_BYTES: u64 = 32 * 1024 * 1024;

/// Resolve the data directory.
///
/// Priority:
/// 1. `BANNERGENIE_DATA_DIR` environment variable
/// 2. `~/.bannergenie`
/// 3. `.bannergenie` in the working directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BANNERGENIE_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".bannergenie");
    }

    PathBuf::from(".bannergenie")
}

/// Write image bytes, creating parent directories as needed.
pub async fn save_image(path: &Path, bytes: &[u8]) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}

/// Read a local file destined for the image host.
pub async fn read_upload(path: &Path) -> Result<Vec<u8>, std::io::Error> {
    let metadata = tokio::fs::metadata(path).await?;
    if !metadata.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} is not a file", path.display()),
        ));
    }
    if metadata.len() > MAX_UPLOAD_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "{} is larger than {} MiB",
                path.display(),
                MAX_UPLOAD_BYTES / (1024 * 1024)
            ),
        ));
    }
    tokio::fs::read(path).await
}
