use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::{self, File},
    io::{self, AsyncWriteExt},
};
use tracing::debug;

/// Guard file placed next to the data file. Readers take it shared, writers exclusive, so the
/// CLI never observes a half-renamed state while the daemon saves.
fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn open_lock(path: &Path) -> Result<File, io::Error> {
    File::options()
        .write(true)
        .create(true)
        .truncate(false)
        .read(true)
        .open(lock_path(path))
        .await
}

/// Replaces `path` with `contents`. The data is written to a temporary file, synced, then renamed
/// over the target, so a crash leaves either the old or the new file behind.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    let lock = open_lock(path).await?;
    lock.lock_exclusive()?;
    let result = write_atomic_locked(path, contents).await;
    lock.unlock_async().await?;
    result
}

async fn write_atomic_locked(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    let temp = temp_path(path);
    let mut file = File::create(&temp).await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(&temp, path).await?;
    debug!("Saved {path:?}");
    Ok(())
}

/// Reads the whole file under a shared lock. A missing file is reported as `None`.
pub async fn read_locked(path: &Path) -> Result<Option<Vec<u8>>, io::Error> {
    let lock = open_lock(path).await?;
    lock.lock_shared()?;
    let result = match fs::read(path).await {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    };
    lock.unlock_async().await?;
    result
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{read_locked, write_atomic};

    #[tokio::test]
    async fn test_read_missing_file() -> Result<()> {
        let dir = tempdir()?;
        let value = read_locked(&dir.path().join("absent.json")).await?;
        assert!(value.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_write_replaces_contents() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("state.json");

        write_atomic(&path, b"first").await?;
        write_atomic(&path, b"second").await?;

        assert_eq!(read_locked(&path).await?, Some(b"second".to_vec()));
        assert!(!dir.path().join("state.json.tmp").exists());
        Ok(())
    }
}
