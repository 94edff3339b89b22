//! Uploaded file storage under the media root

use rand::{distributions::Alphanumeric, Rng};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::info;

const SUFFIX_LEN: usize = 7;

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a stored file
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Store `bytes` as `<dir>/<file_name>`, returning the path relative
    /// to the media root
    ///
    /// The file name is reduced to its last path component. If the name is
    /// taken, a random suffix is inserted before the extension. Files are
    /// created exclusively, so concurrent uploads never overwrite each other.
    pub async fn save(&self, dir: &str, file_name: &str, bytes: &[u8]) -> std::io::Result<String> {
        let target_dir = self.root.join(dir);
        tokio::fs::create_dir_all(&target_dir).await?;

        let file_name = sanitize_file_name(file_name);
        let mut candidate = file_name.clone();
        let mut file = loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(target_dir.join(&candidate))
                .await
            {
                Ok(file) => break file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    candidate = with_suffix(&file_name, &random_suffix());
                }
                Err(e) => return Err(e),
            }
        };

        file.write_all(bytes).await?;
        file.flush().await?;
        let relative = format!("{}/{}", dir, candidate);
        info!("Stored upload {}", relative);
        Ok(relative)
    }

    /// Delete a stored file; a file that is already gone is not an error
    pub async fn remove(&self, relative: &str) -> std::io::Result<()> {
        match tokio::fs::remove_file(self.path(relative)).await {
            Ok(()) => {
                info!("Removed upload {}", relative);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

fn with_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", file_name, suffix),
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect()
}
