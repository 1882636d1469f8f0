//! Append-only price history file.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::ports::{HistoryError, HistoryLog};

/// Writes one `"<date time> <unix secs> <price>"` line per fetched price.
#[derive(Debug)]
pub struct FileHistoryLog {
    path: PathBuf,
    /// Serializes appends from concurrent polling tasks.
    write_lock: Mutex<()>,
}

impl FileHistoryLog {
    /// Creates a log writing to `path`; the file is created on first append.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

/// Formats one history line.
fn format_line(timestamp: &DateTime<Local>, price: &str) -> String {
    format!(
        "{} {} {}\n",
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        timestamp.timestamp(),
        price.trim()
    )
}

#[async_trait]
impl HistoryLog for FileHistoryLog {
    async fn append(
        &self,
        _symbol: &str,
        timestamp: DateTime<Local>,
        price: &str,
    ) -> Result<(), HistoryError> {
        let line = format_line(&timestamp, price);
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_format_line() {
        let timestamp = Local.with_ymd_and_hms(2024, 6, 1, 12, 30, 5).unwrap();
        let line = format_line(&timestamp, "67000.12\n");
        assert_eq!(
            line,
            format!("2024-06-01 12:30:05 {} 67000.12\n", timestamp.timestamp())
        );
    }

    #[tokio::test]
    async fn test_append_creates_parent_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices_history").join("Prices_Bitcoin.txt");
        let log = FileHistoryLog::new(&path);

        log.append("bitcoin", Local::now(), "1.5").await.unwrap();
        log.append("bitcoin", Local::now(), "2.5").await.unwrap();

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with(" 1.5"));
        assert!(lines[1].ends_with(" 2.5"));
    }
}
