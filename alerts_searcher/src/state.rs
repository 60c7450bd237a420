//! Persisted search marker in `<homeDir>/searcherState.properties`.
//!
//! The marker is the start time of the last successful run, in epoch
//! milliseconds. It is stored in properties format under `lastSearchTime`
//! so files written by older deployments are read as-is.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::{fs, io::AsyncWriteExt};

use crate::config::normalize_home_dir;
use crate::error::{Error, Result};
use crate::properties::Properties;

pub const STATE_FILE_NAME: &str = "searcherState.properties";
pub const LAST_SEARCH_TIME: &str = "lastSearchTime";

#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_home_dir(home_dir: impl AsRef<Path>) -> Self {
        let home = normalize_home_dir(&home_dir.as_ref().to_string_lossy());
        Self::new(home.join(STATE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored marker. `Ok(None)` means no state file exists yet.
    pub async fn load(&self) -> Result<Option<i64>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let props = Properties::parse(&content);
        let raw = props.get(LAST_SEARCH_TIME).ok_or_else(|| {
            Error::state(self.display(), format!("no {LAST_SEARCH_TIME} entry"))
        })?;
        let marker = raw.trim().parse::<i64>().map_err(|e| {
            Error::state(self.display(), format!("{LAST_SEARCH_TIME}='{raw}': {e}"))
        })?;

        Ok(Some(marker))
    }

    /// Overwrites the marker. Written through a temp file and renamed into
    /// place so readers never observe a partial file.
    pub async fn store(&self, marker: i64) -> Result<()> {
        let mut props = Properties::new();
        props.set(LAST_SEARCH_TIME, marker.to_string());
        let stamp = Utc::now().format("%a %b %d %H:%M:%S UTC %Y").to_string();
        let content = props.render(&["", &stamp]);

        let temp_path = self.path.with_extension("properties.tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_has_no_marker() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::in_home_dir(dir.path());
        assert_eq!(state.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn stored_marker_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::in_home_dir(dir.path());

        state.store(1_718_000_000_123).await.unwrap();
        let fresh = StateFile::in_home_dir(dir.path());
        assert_eq!(fresh.load().await.unwrap(), Some(1_718_000_000_123));

        state.store(42).await.unwrap();
        assert_eq!(fresh.load().await.unwrap(), Some(42));
        assert!(!dir.path().join("searcherState.properties.tmp").exists());
    }

    #[tokio::test]
    async fn trailing_slash_resolves_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let with_slash = format!("{}/", dir.path().display());

        let state = StateFile::in_home_dir(&with_slash);
        assert_eq!(state.path(), dir.path().join(STATE_FILE_NAME));
    }

    #[tokio::test]
    async fn reads_java_written_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(STATE_FILE_NAME),
            "#\n#Tue Mar 03 10:15:00 UTC 2015\nlastSearchTime=1425377700000\n",
        )
        .unwrap();

        let state = StateFile::in_home_dir(dir.path());
        assert_eq!(state.load().await.unwrap(), Some(1_425_377_700_000));
    }

    #[tokio::test]
    async fn unparsable_marker_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STATE_FILE_NAME), "lastSearchTime=yesterday\n").unwrap();

        let err = StateFile::in_home_dir(dir.path()).load().await.unwrap_err();
        assert!(matches!(err, Error::State { .. }));
    }

    #[tokio::test]
    async fn missing_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STATE_FILE_NAME), "#only a comment\n").unwrap();

        let err = StateFile::in_home_dir(dir.path()).load().await.unwrap_err();
        assert!(matches!(err, Error::State { .. }));
    }
}
