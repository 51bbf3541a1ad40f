//! Frame log display.
//!
//! Appends every distinct frame as one JSON object per line to
//! `<out_dir>/frames.jsonl`. Useful for headless runs and for replaying
//! what an LED panel would have shown.

use super::Display;
use crate::config::DisplayConfig;
use crate::error::{DashboardError, Result};
use crate::metrics::data::ScreenData;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;
use uuid::Uuid;

/// File name of the frame log inside the output directory.
pub const FRAMES_FILE: &str = "frames.jsonl";

/// One line of the frame log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// Identifies the dashboard run that wrote the frame
    pub session: Uuid,
    /// Position of the frame within the session, starting at 0
    pub sequence: u64,
    pub written_at: DateTime<Utc>,
    pub screen: ScreenData,
}

pub struct DumpDisplay {
    out_dir: PathBuf,
    session: Uuid,
    sequence: u64,
    file: Option<File>,
    last: Option<ScreenData>,
}

impl DumpDisplay {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            session: Uuid::new_v4(),
            sequence: 0,
            file: None,
            last: None,
        }
    }

    /// Path of the frame log.
    pub fn frames_path(&self) -> PathBuf {
        self.out_dir.join(FRAMES_FILE)
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.sequence
    }
}

/// Read a frame log back, skipping blank lines.
pub async fn read_frames(path: impl AsRef<Path>) -> Result<Vec<Frame>> {
    let content = fs::read_to_string(path).await?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(DashboardError::from))
        .collect()
}

#[async_trait]
impl Display for DumpDisplay {
    fn name(&self) -> &str {
        "dump"
    }

    async fn initialize(&mut self, config: &DisplayConfig) -> Result<bool> {
        if self.out_dir.as_os_str().is_empty() {
            self.out_dir = config.dump.out_dir.clone();
        }
        fs::create_dir_all(&self.out_dir).await?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.frames_path())
            .await?;
        self.file = Some(file);

        info!(
            "Writing frames to {} (session {})",
            self.frames_path().display(),
            self.session
        );
        Ok(true)
    }

    async fn render(&mut self, screen: &ScreenData) -> Result<()> {
        if self.last.as_ref() == Some(screen) {
            return Ok(());
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| DashboardError::display_error("dump display is not initialized"))?;

        let frame = Frame {
            session: self.session,
            sequence: self.sequence,
            written_at: Utc::now(),
            screen: screen.clone(),
        };
        let mut line = serde_json::to_string(&frame)?;
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        self.sequence += 1;
        self.last = Some(frame.screen);
        Ok(())
    }

    async fn clear(&mut self) -> Result<()> {
        self.last = None;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
        }
        info!("Wrote {} frames", self.sequence);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::data::{Color, Section};

    #[tokio::test]
    async fn test_only_changed_frames_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut display = DumpDisplay::new(dir.path().join("out"));
        assert!(display.initialize(&DisplayConfig::default()).await.unwrap());

        let first = ScreenData::new("Incident Summary").with_field("total", 42.0);
        let second = ScreenData::new("System Health")
            .with_section(Section::title("HEALTH", Color::White));

        display.render(&first).await.unwrap();
        display.render(&first).await.unwrap();
        display.render(&second).await.unwrap();
        display.shutdown().await.unwrap();

        let frames = read_frames(dir.path().join("out").join(FRAMES_FILE))
            .await
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].sequence, 0);
        assert_eq!(frames[1].screen.title, "System Health");
        assert_eq!(frames[0].session, frames[1].session);
    }

    #[tokio::test]
    async fn test_render_before_initialize_fails() {
        let mut display = DumpDisplay::new("unused");
        let result = display.render(&ScreenData::new("x")).await;
        assert!(matches!(result, Err(DashboardError::Display(_))));
    }
}
