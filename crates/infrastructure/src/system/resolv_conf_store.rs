use async_trait::async_trait;
use nsresolv_application::ports::ResolvConfStore;
use nsresolv_domain::DomainError;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// `resolv.conf` on disk with the engine's last hash in `<file>.hash`.
///
/// The file is rewritten in place; containers bind-mount its inode.
pub struct FsResolvConfStore {
    path: PathBuf,
    hash_path: PathBuf,
}

impl FsResolvConfStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            hash_path: sibling(&path, ".hash"),
            path,
        }
    }

    pub fn hash_path(&self) -> &Path {
        &self.hash_path
    }

    fn write_error(&self, path: &Path, e: std::io::Error) -> DomainError {
        DomainError::Write {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, DomainError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DomainError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        }),
    }
}

#[async_trait]
impl ResolvConfStore for FsResolvConfStore {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Option<Vec<u8>>, DomainError> {
        read_optional(&self.path).await
    }

    async fn write(&self, content: &[u8]) -> Result<(), DomainError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(parent, e))?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .await
            .map_err(|e| self.write_error(&self.path, e))?;
        file.write_all(content)
            .await
            .map_err(|e| self.write_error(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| self.write_error(&self.path, e))
    }

    async fn read_recorded_hash(&self) -> Result<Option<String>, DomainError> {
        Ok(read_optional(&self.hash_path)
            .await?
            .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
            .filter(|hash| !hash.is_empty()))
    }

    async fn record_hash(&self, hash: &str) -> Result<(), DomainError> {
        fs::write(&self.hash_path, format!("{hash}\n"))
            .await
            .map_err(|e| self.write_error(&self.hash_path, e))
    }
}
