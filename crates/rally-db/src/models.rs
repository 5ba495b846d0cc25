/// Database row types. These map directly to SQLite rows.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceRow {
    pub user_id: String,
    pub points: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRow {
    pub case_id: String,
    pub channel_id: String,
    /// Epoch seconds.
    pub created_at: i64,
    pub prompt_id: Option<String>,
    pub reminded: bool,
}
