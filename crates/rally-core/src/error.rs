use thiserror::Error;

/// Failures talking to the chat platform.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The message, thread or channel no longer exists.
    #[error("object not found")]
    NotFound,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger storage error: {0:#}")]
    Storage(anyhow::Error),
    #[error("ledger {op} for {user_id} still contended after {attempts} attempts")]
    RetriesExhausted {
        op: &'static str,
        user_id: String,
        attempts: u32,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("threshold table is empty")]
    EmptyThresholds,
    #[error("threshold {0} is negative")]
    NegativeThreshold(i64),
    #[error("thresholds must be strictly ascending ({previous} then {next})")]
    ThresholdsNotAscending { previous: i64, next: i64 },
    #[error("reaction reason {0} is defined twice")]
    DuplicateReason(String),
    #[error("emoji {0} is both a points reason and a workflow trigger")]
    OverlappingTrigger(String),
    #[error("invalid economy file: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("gateway: {0}")]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
    #[error("points must be non-negative, got {0}")]
    InvalidAmount(i64),
    #[error("balance update for {0} was not persisted")]
    WriteFailed(String),
}
