// notifier/outbox.rs

use super::newsletter::Newsletter;
use super::NotifyError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Delivers a composed newsletter somewhere.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, newsletter: &Newsletter) -> Result<(), NotifyError>;
}

/// Writes `newsletter-YYYY-MM-DD.html` files into a directory.
pub struct FileOutbox {
    dir: PathBuf,
    recipient: Option<String>,
}

impl FileOutbox {
    pub fn new(dir: impl Into<PathBuf>, recipient: Option<String>) -> Self {
        Self {
            dir: dir.into(),
            recipient,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, newsletter: &Newsletter) -> PathBuf {
        self.dir.join(format!(
            "newsletter-{}.html",
            newsletter.generated_at.format("%Y-%m-%d")
        ))
    }
}

#[async_trait]
impl Notifier for FileOutbox {
    async fn send(&self, newsletter: &Newsletter) -> Result<(), NotifyError> {
        if newsletter.html.is_empty() {
            return Err(NotifyError::Empty(newsletter.subject.clone()));
        }

        fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(newsletter);
        fs::write(&path, newsletter.html.as_bytes()).await?;

        info!(
            "Newsletter '{}' written to {} (recipient: {})",
            newsletter.subject,
            path.display(),
            self.recipient.as_deref().unwrap_or("none")
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_outbox_writes_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = FileOutbox::new(dir.path().join("outbox"), None);
        let newsletter = Newsletter {
            subject: "Market Monitor Daily Update - 2025-01-10".into(),
            html: "<html></html>".into(),
            generated_at: Utc.with_ymd_and_hms(2025, 1, 10, 13, 0, 0).unwrap(),
        };

        outbox.send(&newsletter).await.unwrap();
        let written = std::fs::read_to_string(dir.path().join("outbox/newsletter-2025-01-10.html")).unwrap();
        assert_eq!(written, "<html></html>");

        let empty = Newsletter {
            html: String::new(),
            ..newsletter
        };
        assert!(matches!(outbox.send(&empty).await, Err(NotifyError::Empty(_))));
    }
}
