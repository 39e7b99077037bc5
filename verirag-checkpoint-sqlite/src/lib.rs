//! SQLite-backed [`Checkpointer`] for conversation threads.
//!
//! Every save appends a row; `load` returns the newest row for the thread.

pub mod error;
pub mod ops;
pub mod schema;

use std::convert::TryFrom;

use verirag_graph::{
    Checkpoint, CheckpointMetadata, Checkpointer, GraphError, GraphState, HistoryCheckpointer,
    StateSchema,
};

pub use error::CheckpointSqlError;
use ops::{list_checkpoint_metadata, load_latest_checkpoint, run_migrations, save_checkpoint};

#[derive(Debug, Clone)]
pub struct SqliteCheckpointer {
    pool: sqlx::SqlitePool,
}

#[derive(Debug, Clone)]
pub struct SqliteCheckpointerBuilder {
    database_url: String,
    max_connections: u32,
    create_if_missing: bool,
}

impl SqliteCheckpointer {
    pub fn builder(database_url: impl Into<String>) -> SqliteCheckpointerBuilder {
        SqliteCheckpointerBuilder {
            database_url: database_url.into(),
            max_connections: 1,
            create_if_missing: true,
        }
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }
}

impl SqliteCheckpointerBuilder {
    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn create_if_missing(mut self, create_if_missing: bool) -> Self {
        self.create_if_missing = create_if_missing;
        self
    }

    pub async fn build(self) -> Result<SqliteCheckpointer, CheckpointSqlError> {
        let options = self
            .database_url
            .parse::<sqlx::sqlite::SqliteConnectOptions>()
            .map_err(CheckpointSqlError::Connection)?
            .create_if_missing(self.create_if_missing);

        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .connect_with(options)
            .await
            .map_err(CheckpointSqlError::Connection)?;

        run_migrations(&pool).await?;
        tracing::debug!(url = %self.database_url, "sqlite checkpointer ready");

        Ok(SqliteCheckpointer { pool })
    }
}

fn graph_checkpoint_error(message: impl Into<String>) -> GraphError {
    GraphError::Checkpoint(message.into())
}

fn map_sql_error(error: CheckpointSqlError) -> GraphError {
    graph_checkpoint_error(error.to_string())
}

fn to_step(step: Option<i64>) -> Result<u64, GraphError> {
    u64::try_from(step.unwrap_or_default())
        .map_err(|_| graph_checkpoint_error("checkpoint step is negative"))
}

#[async_trait::async_trait]
impl<S: StateSchema> Checkpointer<S> for SqliteCheckpointer {
    async fn save(&self, checkpoint: &Checkpoint<S>) -> Result<(), GraphError> {
        let step = i64::try_from(checkpoint.step)
            .map_err(|_| graph_checkpoint_error("checkpoint step does not fit into i64"))?;

        save_checkpoint(
            &self.pool,
            &checkpoint.thread_id,
            &checkpoint.node,
            step,
            &checkpoint.created_at,
            &checkpoint.state,
        )
        .await
        .map_err(map_sql_error)
    }

    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint<S>>, GraphError> {
        let stored = load_latest_checkpoint(&self.pool, thread_id)
            .await
            .map_err(map_sql_error)?;

        let Some(stored) = stored else {
            return Ok(None);
        };

        let state: GraphState<S> = serde_json::from_value(stored.state_json).map_err(|error| {
            graph_checkpoint_error(format!("failed to deserialize checkpoint state: {error}"))
        })?;

        Ok(Some(Checkpoint {
            thread_id: stored.thread_id,
            state,
            step: to_step(stored.step)?,
            node: stored.node.unwrap_or_default(),
            created_at: stored.created_at,
        }))
    }
}

#[async_trait::async_trait]
impl<S: StateSchema> HistoryCheckpointer<S> for SqliteCheckpointer {
    async fn list_checkpoints(
        &self,
        thread_id: &str,
    ) -> Result<Vec<CheckpointMetadata>, GraphError> {
        let rows = list_checkpoint_metadata(&self.pool, thread_id)
            .await
            .map_err(map_sql_error)?;

        rows.into_iter()
            .map(|row| -> Result<CheckpointMetadata, GraphError> {
                Ok(CheckpointMetadata {
                    seq: u64::try_from(row.seq)
                        .map_err(|_| graph_checkpoint_error("checkpoint seq is negative"))?,
                    step: to_step(row.step)?,
                    node: row.node.unwrap_or_default(),
                    created_at: row.created_at,
                })
            })
            .collect()
    }
}
