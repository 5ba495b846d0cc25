use crate::Database;
use crate::models::{BalanceRow, CaseRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

impl Database {
    // -- Balances --

    /// Insert a zero balance for `user_id` unless one exists.
    pub fn ensure_balance(&self, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO balances (user_id, points) VALUES (?1, 0)",
                [user_id],
            )?;
            Ok(())
        })
    }

    pub fn get_balance(&self, user_id: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let points = conn
                .query_row(
                    "SELECT points FROM balances WHERE user_id = ?1",
                    [user_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(points)
        })
    }

    pub fn set_balance(&self, user_id: &str, points: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO balances (user_id, points) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET points = excluded.points",
                rusqlite::params![user_id, points],
            )?;
            Ok(())
        })
    }

    /// Every balance in storage order (no ordering guarantee).
    pub fn all_balances(&self) -> Result<Vec<BalanceRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT user_id, points FROM balances")?;
            let rows = stmt
                .query_map([], balance_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Highest balances first, ties broken by user id ascending.
    pub fn top_balances(&self, limit: u32) -> Result<Vec<BalanceRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, points FROM balances
                 ORDER BY points DESC, user_id ASC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], balance_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Resolution cases --

    /// Returns false when a case with the same id already exists.
    pub fn insert_case(&self, case: &CaseRow) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO resolution_cases
                    (case_id, channel_id, created_at, prompt_id, reminded)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    case.case_id,
                    case.channel_id,
                    case.created_at,
                    case.prompt_id,
                    case.reminded
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    pub fn get_case(&self, case_id: &str) -> Result<Option<CaseRow>> {
        self.with_conn(|conn| query_case(conn, case_id))
    }

    pub fn list_cases(&self) -> Result<Vec<CaseRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT case_id, channel_id, created_at, prompt_id, reminded
                 FROM resolution_cases
                 ORDER BY created_at ASC",
            )?;
            let rows = stmt
                .query_map([], case_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_case_prompt(&self, case_id: &str, prompt_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE resolution_cases SET prompt_id = ?2 WHERE case_id = ?1",
                [case_id, prompt_id],
            )?;
            Ok(())
        })
    }

    pub fn mark_case_reminded(&self, case_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE resolution_cases SET reminded = 1 WHERE case_id = ?1",
                [case_id],
            )?;
            Ok(())
        })
    }

    /// Returns whether a row was actually removed.
    pub fn delete_case(&self, case_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM resolution_cases WHERE case_id = ?1", [case_id])?;
            Ok(removed > 0)
        })
    }
}

fn query_case(conn: &Connection, case_id: &str) -> Result<Option<CaseRow>> {
    let mut stmt = conn.prepare(
        "SELECT case_id, channel_id, created_at, prompt_id, reminded
         FROM resolution_cases WHERE case_id = ?1",
    )?;

    let row = stmt.query_row([case_id], case_from_row).optional()?;

    Ok(row)
}

fn balance_from_row(row: &Row<'_>) -> rusqlite::Result<BalanceRow> {
    Ok(BalanceRow {
        user_id: row.get(0)?,
        points: row.get(1)?,
    })
}

fn case_from_row(row: &Row<'_>) -> rusqlite::Result<CaseRow> {
    Ok(CaseRow {
        case_id: row.get(0)?,
        channel_id: row.get(1)?,
        created_at: row.get(2)?,
        prompt_id: row.get(3)?,
        reminded: row.get(4)?,
    })
}
