use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// URL path under which stored assets are served.
pub const MEDIA_ROUTE: &str = "/media";

/// Manages on-disk media storage.
///
/// Each asset is one flat file at `{dir}/{file_name}`; the name is generated
/// by the server, never taken from the client.
pub struct Storage {
    dir: PathBuf,
    public_url: String,
}

impl Storage {
    pub async fn new(dir: PathBuf, public_url: impl Into<String>) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Media storage directory: {}", dir.display());
        Ok(Self {
            dir,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Public URL an asset is reachable at.
    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}{}/{}", self.public_url, MEDIA_ROUTE, file_name)
    }

    /// Write an asset and return the hex SHA-256 of its contents.
    pub async fn save(&self, file_name: &str, data: &[u8]) -> Result<String> {
        let path = self.file_path(file_name);
        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.flush().await?;

        let mut hasher = Sha256::new();
        hasher.update(data);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Delete an asset from disk. A file that is already gone is not an error.
    pub async fn delete_file(&self, file_name: &str) -> Result<()> {
        let path = self.file_path(file_name);
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted media file {}", file_name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Media file {} already gone", file_name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Extension for an accepted upload type, or `None` if the type is refused.
/// Audio, images and video are accepted.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    let ext = match essence {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "audio/mpeg" => "mp3",
        "audio/mp4" | "audio/x-m4a" => "m4a",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        "audio/webm" => "weba",
        "audio/aac" => "aac",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        _ => return None,
    };
    Some(ext)
}
