pub const CHECKPOINTS_TABLE: &str = "checkpoints";

pub const CREATE_CHECKPOINTS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS checkpoints (\
    thread_id TEXT NOT NULL,\
    seq INTEGER NOT NULL,\
    created_at TEXT NOT NULL,\
    node TEXT,\
    step INTEGER,\
    state_json TEXT NOT NULL,\
    PRIMARY KEY (thread_id, seq)\
)";

pub const MIGRATION_STATEMENTS_SQL: [&str; 1] = [CREATE_CHECKPOINTS_TABLE_SQL];

// The sequence is computed inside the insert so concurrent writers never collide.
pub(crate) const INSERT_CHECKPOINT_SQL: &str = "INSERT INTO checkpoints \
    (thread_id, seq, created_at, node, step, state_json) \
    VALUES (?1, COALESCE((SELECT MAX(seq) FROM checkpoints WHERE thread_id = ?1), 0) + 1, ?2, ?3, ?4, ?5)";

pub(crate) const SELECT_LATEST_SQL: &str = "SELECT thread_id, seq, created_at, node, step, state_json \
    FROM checkpoints WHERE thread_id = ?1 ORDER BY seq DESC LIMIT 1";

pub(crate) const SELECT_HISTORY_SQL: &str = "SELECT seq, created_at, node, step \
    FROM checkpoints WHERE thread_id = ?1 ORDER BY seq ASC";
