use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("DB: running migration v1 (balances, resolution cases)");
        conn.execute_batch(
            "
            CREATE TABLE balances (
                user_id     TEXT PRIMARY KEY,
                points      INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE resolution_cases (
                case_id     TEXT PRIMARY KEY,
                channel_id  TEXT NOT NULL,
                created_at  INTEGER NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("DB: running migration v2 (case prompt + reminder tracking)");
        conn.execute_batch(
            "
            ALTER TABLE resolution_cases ADD COLUMN prompt_id TEXT;
            ALTER TABLE resolution_cases ADD COLUMN reminded INTEGER NOT NULL DEFAULT 0;

            CREATE INDEX IF NOT EXISTS idx_balances_points
                ON balances(points DESC, user_id);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    Ok(())
}
