//! Debate transcript recording in JSONL format.
//!
//! One file per debate, one entry per line: a `debate_start` header, a
//! `turn` for every completed reply and a closing `debate_end`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Transcript entry types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptEntry {
    DebateStart {
        debate_id: String,
        timestamp: DateTime<Utc>,
        topic: String,
        participants: Vec<String>,
    },

    /// A finished reply. Round 0 holds the opening statements.
    Turn {
        debate_id: String,
        timestamp: DateTime<Utc>,
        round: u32,
        speaker: String,
        content: String,
    },

    DebateEnd {
        debate_id: String,
        timestamp: DateTime<Utc>,
        status: String,
        rounds_completed: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Transcript writer for a single debate.
pub struct TranscriptWriter {
    debate_id: String,
    path: PathBuf,
    file: Mutex<File>,
}

impl TranscriptWriter {
    /// Create `debate-<timestamp>.jsonl` under `log_dir`.
    pub async fn new(log_dir: &Path) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(log_dir).await?;

        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
        let path = log_dir.join(format!("debate-{}.jsonl", stamp));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        debug!("Created transcript file: {:?}", path);

        Ok(Self {
            debate_id: Uuid::new_v4().to_string(),
            path,
            file: Mutex::new(file),
        })
    }

    pub fn debate_id(&self) -> &str {
        &self.debate_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an entry and flush it.
    pub async fn write(&self, entry: &TranscriptEntry) -> std::io::Result<()> {
        let json = serde_json::to_string(entry)?;
        let mut file = self.file.lock().await;
        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    pub async fn record_start(&self, topic: &str, participants: &[&str]) -> std::io::Result<()> {
        self.write(&TranscriptEntry::DebateStart {
            debate_id: self.debate_id.clone(),
            timestamp: Utc::now(),
            topic: topic.to_string(),
            participants: participants.iter().map(|p| p.to_string()).collect(),
        })
        .await
    }

    pub async fn record_turn(&self, round: u32, speaker: &str, content: &str) -> std::io::Result<()> {
        self.write(&TranscriptEntry::Turn {
            debate_id: self.debate_id.clone(),
            timestamp: Utc::now(),
            round,
            speaker: speaker.to_string(),
            content: content.to_string(),
        })
        .await
    }

    pub async fn record_end(
        &self,
        status: &str,
        rounds_completed: u32,
        error: Option<&str>,
    ) -> std::io::Result<()> {
        self.write(&TranscriptEntry::DebateEnd {
            debate_id: self.debate_id.clone(),
            timestamp: Utc::now(),
            status: status.to_string(),
            rounds_completed,
            error: error.map(String::from),
        })
        .await
    }
}

/// Read every entry of a transcript file.
pub async fn read_transcript(path: &Path) -> std::io::Result<Vec<TranscriptEntry>> {
    let content = tokio::fs::read_to_string(path).await?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(std::io::Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_transcript_file_layout() {
        let temp_dir = TempDir::new().unwrap();
        let writer = TranscriptWriter::new(&temp_dir.path().join("logs")).await.unwrap();

        let name = writer.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("debate-"));
        assert!(name.ends_with(".jsonl"));
        assert!(Uuid::parse_str(writer.debate_id()).is_ok());
    }

    #[tokio::test]
    async fn test_transcript_records_debate() {
        let temp_dir = TempDir::new().unwrap();
        let writer = TranscriptWriter::new(temp_dir.path()).await.unwrap();

        writer.record_start("Cars downtown", &["Claude", "Gemini"]).await.unwrap();
        writer.record_turn(0, "Claude", "Opening\nwith two lines").await.unwrap();
        writer.record_turn(1, "Gemini", "Rebuttal").await.unwrap();
        writer.record_end("completed", 1, None).await.unwrap();

        let content = tokio::fs::read_to_string(writer.path()).await.unwrap();
        assert_eq!(content.lines().count(), 4);

        let first: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(first["type"], "debate_start");
        assert_eq!(first["participants"], serde_json::json!(["Claude", "Gemini"]));

        let entries = read_transcript(writer.path()).await.unwrap();
        match &entries[1] {
            TranscriptEntry::Turn {
                round,
                speaker,
                content,
                debate_id,
                ..
            } => {
                assert_eq!(*round, 0);
                assert_eq!(speaker, "Claude");
                assert_eq!(content, "Opening\nwith two lines");
                assert_eq!(debate_id, writer.debate_id());
            }
            other => panic!("unexpected entry {:?}", other),
        }
        assert!(matches!(
            &entries[3],
            TranscriptEntry::DebateEnd { status, rounds_completed: 1, error: None, .. } if status == "completed"
        ));
    }

    #[tokio::test]
    async fn test_debate_end_error_is_optional() {
        let temp_dir = TempDir::new().unwrap();
        let writer = TranscriptWriter::new(temp_dir.path()).await.unwrap();
        writer.record_end("failed", 0, Some("no input")).await.unwrap();

        let content = tokio::fs::read_to_string(writer.path()).await.unwrap();
        assert!(content.contains("\"error\":\"no input\""));

        let entries = read_transcript(writer.path()).await.unwrap();
        assert!(matches!(
            &entries[0],
            TranscriptEntry::DebateEnd { error: Some(e), .. } if e == "no input"
        ));
    }
}
