use serde::Serialize;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use crate::error::CheckpointSqlError;
use crate::schema::{
    INSERT_CHECKPOINT_SQL, MIGRATION_STATEMENTS_SQL, SELECT_HISTORY_SQL, SELECT_LATEST_SQL,
};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredCheckpoint {
    pub thread_id: String,
    pub seq: i64,
    pub created_at: String,
    pub node: Option<String>,
    pub step: Option<i64>,
    pub state_json: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredCheckpointMeta {
    pub seq: i64,
    pub created_at: String,
    pub node: Option<String>,
    pub step: Option<i64>,
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), CheckpointSqlError> {
    for statement in MIGRATION_STATEMENTS_SQL {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(CheckpointSqlError::Migration)?;
    }
    Ok(())
}

pub async fn save_checkpoint<T: Serialize>(
    pool: &SqlitePool,
    thread_id: &str,
    node: &str,
    step: i64,
    created_at: &str,
    state: &T,
) -> Result<(), CheckpointSqlError> {
    let state_json = serde_json::to_string(state)?;
    sqlx::query(INSERT_CHECKPOINT_SQL)
        .bind(thread_id)
        .bind(created_at)
        .bind(node)
        .bind(step)
        .bind(state_json)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn load_latest_checkpoint(
    pool: &SqlitePool,
    thread_id: &str,
) -> Result<Option<StoredCheckpoint>, CheckpointSqlError> {
    let Some(row) = sqlx::query(SELECT_LATEST_SQL)
        .bind(thread_id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let state_json: String = row.try_get("state_json")?;
    Ok(Some(StoredCheckpoint {
        thread_id: row.try_get("thread_id")?,
        seq: row.try_get("seq")?,
        created_at: row.try_get("created_at")?,
        node: row.try_get("node")?,
        step: row.try_get("step")?,
        state_json: serde_json::from_str(&state_json)?,
    }))
}

pub async fn list_checkpoint_metadata(
    pool: &SqlitePool,
    thread_id: &str,
) -> Result<Vec<StoredCheckpointMeta>, CheckpointSqlError> {
    let rows = sqlx::query(SELECT_HISTORY_SQL)
        .bind(thread_id)
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|row| -> Result<StoredCheckpointMeta, CheckpointSqlError> {
            Ok(StoredCheckpointMeta {
                seq: row.try_get("seq")?,
                created_at: row.try_get("created_at")?,
                node: row.try_get("node")?,
                step: row.try_get("step")?,
            })
        })
        .collect()
}
