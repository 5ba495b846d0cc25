//! In-process fakes for the chat platform, permissions, clock and storage.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use rally_db::Database;
use rally_types::models::{ChatMessage, Reply};

use crate::clock::Clock;
use crate::error::GatewayError;
use crate::gateway::{MessageGateway, PermissionOracle};
use crate::ledger::BalanceStore;

pub const BOT_ID: &str = "rally-bot";

pub fn thread_message(id: &str, channel_id: &str, author_id: &str) -> ChatMessage {
    ChatMessage {
        id: id.into(),
        channel_id: channel_id.into(),
        author_id: author_id.into(),
        author_name: author_id.to_uppercase(),
        in_thread: true,
    }
}

pub fn channel_message(id: &str, channel_id: &str, author_id: &str) -> ChatMessage {
    ChatMessage {
        in_thread: false,
        ..thread_message(id, channel_id, author_id)
    }
}

#[derive(Debug, Clone)]
pub enum Sent {
    Reply { to: String, reply_id: String, body: Reply },
    Edit { channel_id: String, message_id: String, body: Reply },
    DeleteMessage { channel_id: String, message_id: String },
    DeleteChannel { channel_id: String },
}

/// Chat platform double: stores messages per channel and records every
/// outbound call.
#[derive(Default)]
pub struct FakeGateway {
    messages: Mutex<HashMap<(String, String), ChatMessage>>,
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicU64,
    failing_channel_deletes: AtomicU32,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, message: ChatMessage) -> ChatMessage {
        self.messages.lock().unwrap().insert(
            (message.channel_id.clone(), message.id.clone()),
            message.clone(),
        );
        message
    }

    pub fn remove(&self, channel_id: &str, message_id: &str) {
        self.messages
            .lock()
            .unwrap()
            .remove(&(channel_id.to_string(), message_id.to_string()));
    }

    pub fn remove_channel(&self, channel_id: &str) {
        self.messages
            .lock()
            .unwrap()
            .retain(|(channel, _), _| channel != channel_id);
    }

    /// Make the next `n` channel deletions fail with a transport error.
    pub fn fail_channel_deletes(&self, n: u32) {
        self.failing_channel_deletes.store(n, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn replies_to(&self, message_id: &str) -> Vec<(String, Reply)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Reply { to, reply_id, body } if to == message_id => Some((reply_id, body)),
                _ => None,
            })
            .collect()
    }

    pub fn edits_of(&self, message_id: &str) -> Vec<Reply> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Edit { message_id: id, body, .. } if id == message_id => Some(body),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl MessageGateway for FakeGateway {
    async fn fetch(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<Option<ChatMessage>, GatewayError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(&(channel_id.to_string(), message_id.to_string()))
            .cloned())
    }

    async fn reply(&self, target: &ChatMessage, body: &Reply) -> Result<ChatMessage, GatewayError> {
        let id = format!("reply-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let posted = self.add(ChatMessage {
            id: id.clone(),
            channel_id: target.channel_id.clone(),
            author_id: BOT_ID.into(),
            author_name: "Rally".into(),
            in_thread: target.in_thread,
        });
        self.sent.lock().unwrap().push(Sent::Reply {
            to: target.id.clone(),
            reply_id: id,
            body: body.clone(),
        });
        Ok(posted)
    }

    async fn edit(
        &self,
        channel_id: &str,
        message_id: &str,
        body: &Reply,
    ) -> Result<(), GatewayError> {
        if self.fetch(channel_id, message_id).await?.is_none() {
            return Err(GatewayError::NotFound);
        }
        self.sent.lock().unwrap().push(Sent::Edit {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
            body: body.clone(),
        });
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), GatewayError> {
        if self.fetch(channel_id, message_id).await?.is_none() {
            return Err(GatewayError::NotFound);
        }
        self.remove(channel_id, message_id);
        self.sent.lock().unwrap().push(Sent::DeleteMessage {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        });
        Ok(())
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), GatewayError> {
        let failing = self
            .failing_channel_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(GatewayError::Transport("connection reset".into()));
        }
        self.remove_channel(channel_id);
        self.sent.lock().unwrap().push(Sent::DeleteChannel {
            channel_id: channel_id.into(),
        });
        Ok(())
    }
}

/// Users listed here are privileged everywhere.
pub struct FixedOracle {
    privileged: HashSet<String>,
}

impl FixedOracle {
    pub fn new(users: &[&str]) -> Self {
        Self {
            privileged: users.iter().map(|u| u.to_string()).collect(),
        }
    }
}

#[async_trait]
impl PermissionOracle for FixedOracle {
    async fn is_privileged(&self, user_id: &str, _channel_id: &str) -> bool {
        self.privileged.contains(user_id)
    }
}

pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self(AtomicI64::new(now))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// In-memory balance store whose writes report lock contention for the
/// first `failures` attempts.
pub struct FlakyStore {
    db: Database,
    failures: u32,
    contended: bool,
    writes: AtomicU32,
}

impl FlakyStore {
    pub fn failing_writes(failures: u32) -> Self {
        Self {
            db: Database::open_in_memory().unwrap(),
            failures,
            contended: true,
            writes: AtomicU32::new(0),
        }
    }

    pub fn broken_writes() -> Self {
        Self {
            contended: false,
            ..Self::failing_writes(u32::MAX)
        }
    }

    pub fn write_attempts(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }
}

const CONTENDED: &str = "database is locked";

impl BalanceStore for FlakyStore {
    fn ensure(&self, user_id: &str) -> Result<()> {
        self.db.ensure_balance(user_id)
    }

    fn load(&self, user_id: &str) -> Result<Option<i64>> {
        self.db.get_balance(user_id)
    }

    fn store(&self, user_id: &str, points: i64) -> Result<()> {
        let attempt = self.writes.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(if self.contended {
                anyhow!(CONTENDED)
            } else {
                anyhow!("disk I/O error")
            });
        }
        self.db.set_balance(user_id, points)
    }

    fn all(&self) -> Result<Vec<(String, i64)>> {
        BalanceStore::all(&self.db)
    }

    fn top(&self, limit: u32) -> Result<Vec<(String, i64)>> {
        BalanceStore::top(&self.db, limit)
    }

    fn is_contention(&self, err: &anyhow::Error) -> bool {
        err.to_string() == CONTENDED
    }
}
