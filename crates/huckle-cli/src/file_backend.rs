//! A [`FeedBackend`] over a local JSON-lines file.
//!
//! Each line is a preference document in the shape the vendor listener
//! pushes. Subscribing replays the file, then polls it for appended lines;
//! writes append a new document. Another process appending to the same file
//! therefore looks like a remote caregiver logging a feeding.

use std::path::PathBuf;
use std::time::Duration;

use huckle_core::{
    parse_prefs_update, ConnectionError, Credentials, FeedBackend, FeedEntry,
    ListenerSink, WriteError,
};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct FileBackend {
    path: PathBuf,
    poll_interval: Duration,
}

impl FileBackend {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            poll_interval: POLL_INTERVAL,
        }
    }

    #[cfg(test)]
    fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl FeedBackend for FileBackend {
    /// Account email of the "logged in" user.
    type Session = String;
    type Subscription = JoinHandle<()>;

    async fn authenticate(&self, credentials: &Credentials) -> Result<String, ConnectionError> {
        if credentials.email.trim().is_empty() || credentials.password.is_empty() {
            return Err(ConnectionError::Auth("email and password are required".into()));
        }
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| ConnectionError::Transport(format!("{}: {e}", self.path.display())))?;
        Ok(credentials.email.clone())
    }

    async fn subscribe(
        &self,
        _session: &String,
        sink: ListenerSink,
    ) -> Result<JoinHandle<()>, ConnectionError> {
        let path = self.path.clone();
        let interval = self.poll_interval;
        Ok(tokio::spawn(poll(path, interval, sink)))
    }

    async fn unsubscribe(&self, subscription: JoinHandle<()>) {
        subscription.abort();
        let _ = subscription.await;
    }

    async fn write_feeding(&self, session: &String, entry: &FeedEntry) -> Result<(), WriteError> {
        let mut line = entry.to_prefs_update().to_string();
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| WriteError::Transport(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| WriteError::Transport(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| WriteError::Transport(e.to_string()))?;
        tracing::debug!(account = %session, timestamp = %entry.timestamp, "feeding appended");
        Ok(())
    }
}

async fn poll(path: PathBuf, interval: Duration, sink: ListenerSink) {
    let mut offset = 0usize;
    loop {
        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) => {
                sink.error(ConnectionError::Transport(format!("{}: {e}", path.display())));
                return;
            }
        };
        if content.len() < offset {
            tracing::info!(path = %path.display(), "feed file truncated, replaying");
            offset = 0;
        }

        let (entries, consumed) = complete_lines(&content[offset..]);
        offset += consumed;

        let delivered = if entries.is_empty() {
            sink.keepalive()
        } else {
            entries.into_iter().all(|entry| sink.entry(entry))
        };
        if !delivered {
            return;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Entries from every newline-terminated line in `buf`, and the number of
/// bytes those lines span. A trailing partial line is left for the next poll.
fn complete_lines(buf: &[u8]) -> (Vec<FeedEntry>, usize) {
    let Some(end) = buf.iter().rposition(|&b| b == b'\n') else {
        return (Vec::new(), 0);
    };
    let entries = String::from_utf8_lossy(&buf[..end])
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match parse_line(line) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring malformed feed line");
                None
            }
        })
        .collect();
    (entries, end + 1)
}

fn parse_line(line: &str) -> huckle_core::error::Result<Option<FeedEntry>> {
    let doc: serde_json::Value = serde_json::from_str(line)?;
    Ok(parse_prefs_update(&doc)?)
}
