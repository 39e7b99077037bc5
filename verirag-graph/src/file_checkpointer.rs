use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    Checkpoint, CheckpointMetadata, Checkpointer, GraphError, HistoryCheckpointer, StateSchema,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "S: StateSchema")]
pub struct CheckpointRecord<S: StateSchema> {
    pub seq: u64,
    pub created_at: String,
    pub checkpoint: Checkpoint<S>,
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// FNV-1a, fixed across toolchains so file names stay put between releases.
fn stable_digest(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Appends one JSON line per checkpoint to `<base_dir>/<stem>-<digest>.jsonl`.
///
/// The stem is the thread id with path-hostile characters replaced; the digest
/// of the raw id keeps ids that sanitize alike in separate files.
#[derive(Clone, Debug)]
pub struct FileCheckpointer {
    base_dir: PathBuf,
}

fn io_error(err: impl std::fmt::Display) -> GraphError {
    GraphError::Checkpoint(err.to_string())
}

impl FileCheckpointer {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    fn sanitize_thread_id(thread_id: &str) -> String {
        let mut out = String::with_capacity(thread_id.len());
        for ch in thread_id.chars() {
            match ch {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => out.push('_'),
                c if c.is_control() => {}
                c => out.push(c),
            }
        }
        let trimmed = out.trim_matches(|c: char| c == '.' || c.is_whitespace() || c == '_');
        if trimmed.is_empty() {
            "thread".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// The JSONL file holding `thread_id`'s checkpoints.
    pub fn thread_path(&self, thread_id: &str) -> PathBuf {
        let filename = format!(
            "{}-{:016x}.jsonl",
            Self::sanitize_thread_id(thread_id),
            stable_digest(thread_id.as_bytes())
        );
        self.base_dir.join(filename)
    }

    fn read_records<S: StateSchema>(
        &self,
        thread_id: &str,
    ) -> Result<Vec<CheckpointRecord<S>>, GraphError> {
        let path = self.thread_path(thread_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path).map_err(io_error)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(io_error)?;
            if line.trim().is_empty() {
                continue;
            }
            let record: CheckpointRecord<S> = serde_json::from_str(&line).map_err(io_error)?;
            if record.checkpoint.thread_id == thread_id {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[async_trait::async_trait]
impl<S: StateSchema> Checkpointer<S> for FileCheckpointer {
    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<(), GraphError> {
        fs::create_dir_all(&self.base_dir).map_err(io_error)?;

        let seq = self
            .read_records::<S>(&checkpoint.thread_id)?
            .last()
            .map(|record| record.seq + 1)
            .unwrap_or(1);
        let record = CheckpointRecord {
            seq,
            created_at: checkpoint.created_at.clone(),
            checkpoint: checkpoint.clone(),
        };
        let line = serde_json::to_string(&record).map_err(io_error)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.thread_path(&checkpoint.thread_id))
            .map_err(io_error)?;
        file.write_all(format!("{line}\n").as_bytes())
            .map_err(io_error)?;
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint<S>>, GraphError> {
        Ok(self
            .read_records::<S>(thread_id)?
            .pop()
            .map(|record| record.checkpoint))
    }
}

#[async_trait::async_trait]
impl<S: StateSchema> HistoryCheckpointer<S> for FileCheckpointer {
    async fn list_checkpoints(
        &self,
        thread_id: &str,
    ) -> Result<Vec<CheckpointMetadata>, GraphError> {
        Ok(self
            .read_records::<S>(thread_id)?
            .into_iter()
            .map(|record| CheckpointMetadata {
                seq: record.seq,
                step: record.checkpoint.step,
                node: record.checkpoint.node,
                created_at: record.created_at,
            })
            .collect())
    }
}
