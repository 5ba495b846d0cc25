use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use rally_types::events::{ReactionAction, ReactionEvent};
use rally_types::models::{ChatMessage, Reply};

use crate::config::{EconomyConfig, ReactionReason};
use crate::error::{CoreError, GatewayError};
use crate::gateway::{MessageGateway, PermissionOracle};
use crate::ledger::Ledger;
use crate::registry::{MessageReplyState, ReplyRegistry};
use crate::render;
use crate::resolution::ResolutionWorkflow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// Unknown emoji, unprivileged actor, or a trigger that does not apply.
    Ignored,
    FeedbackAcknowledged,
    ResolutionOpened,
    /// The message already has an open resolution case.
    ResolutionExists,
    PointsApplied { user_id: String, delta: i64, balance: i64 },
    /// The balance write was not persisted; nothing else was changed.
    LedgerFailed { user_id: String },
}

impl ReactionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ReactionOutcome::Ignored => "ignored",
            ReactionOutcome::FeedbackAcknowledged => "feedback_acknowledged",
            ReactionOutcome::ResolutionOpened => "resolution_opened",
            ReactionOutcome::ResolutionExists => "resolution_exists",
            ReactionOutcome::PointsApplied { .. } => "points_applied",
            ReactionOutcome::LedgerFailed { .. } => "ledger_failed",
        }
    }
}

pub struct EconomySettings {
    pub bot_user_id: String,
    pub super_admin_id: Option<String>,
    pub reply_ttl: Duration,
    pub reply_capacity: usize,
}

/// Turns reaction events into ledger mutations, feedback replies and
/// resolution cases.
pub struct ReactionEconomy {
    config: Arc<EconomyConfig>,
    ledger: Arc<Ledger>,
    gateway: Arc<dyn MessageGateway>,
    permissions: Arc<dyn PermissionOracle>,
    resolutions: Arc<ResolutionWorkflow>,
    replies: ReplyRegistry,
    bot_user_id: String,
    super_admin_id: Option<String>,
}

impl ReactionEconomy {
    pub fn new(
        config: Arc<EconomyConfig>,
        ledger: Arc<Ledger>,
        gateway: Arc<dyn MessageGateway>,
        permissions: Arc<dyn PermissionOracle>,
        resolutions: Arc<ResolutionWorkflow>,
        settings: EconomySettings,
    ) -> Self {
        Self {
            config,
            ledger,
            gateway,
            permissions,
            resolutions,
            replies: ReplyRegistry::new(settings.reply_ttl, settings.reply_capacity),
            bot_user_id: settings.bot_user_id,
            super_admin_id: settings.super_admin_id,
        }
    }

    pub async fn on_reaction(&self, event: &ReactionEvent) -> Result<ReactionOutcome, CoreError> {
        let feedback = &self.config.feedback;
        if event.emoji == feedback.positive_emoji || event.emoji == feedback.negative_emoji {
            return self.on_feedback(event).await;
        }

        if event.emoji == self.config.resolution_emoji {
            return self.on_resolution_trigger(event).await;
        }

        match self.config.reason(&event.emoji) {
            Some(reason) => self.on_points(event, reason).await,
            None => {
                debug!("Ignoring reaction {} on {}", event.emoji, event.message.id);
                Ok(ReactionOutcome::Ignored)
            }
        }
    }

    async fn on_feedback(&self, event: &ReactionEvent) -> Result<ReactionOutcome, CoreError> {
        if !event.is_add() || event.message.author_id != self.bot_user_id {
            return Ok(ReactionOutcome::Ignored);
        }

        let feedback = &self.config.feedback;
        let text = if event.emoji == feedback.positive_emoji {
            &feedback.positive_reply
        } else {
            &feedback.negative_reply
        };
        self.gateway.reply(&event.message, &Reply::text(text)).await?;
        Ok(ReactionOutcome::FeedbackAcknowledged)
    }

    async fn on_resolution_trigger(&self, event: &ReactionEvent) -> Result<ReactionOutcome, CoreError> {
        if !event.is_add() || !event.message.in_thread {
            return Ok(ReactionOutcome::Ignored);
        }

        let is_super_admin = self.super_admin_id.as_deref() == Some(event.user_id.as_str());
        if !is_super_admin
            && !self
                .permissions
                .is_privileged(&event.user_id, &event.message.channel_id)
                .await
        {
            debug!("{} may not mark {} as resolved", event.user_id, event.message.id);
            return Ok(ReactionOutcome::Ignored);
        }

        if self.resolutions.open(&event.message).await? {
            Ok(ReactionOutcome::ResolutionOpened)
        } else {
            Ok(ReactionOutcome::ResolutionExists)
        }
    }

    async fn on_points(
        &self,
        event: &ReactionEvent,
        reason: &ReactionReason,
    ) -> Result<ReactionOutcome, CoreError> {
        let message = &event.message;
        let author = &message.author_id;

        if event.user_id == *author {
            debug!("{} reacted {} on their own message", event.user_id, event.emoji);
            return Ok(ReactionOutcome::Ignored);
        }
        if !self
            .permissions
            .is_privileged(&event.user_id, &message.channel_id)
            .await
        {
            debug!("{} is not privileged to award {}", event.user_id, event.emoji);
            return Ok(ReactionOutcome::Ignored);
        }

        let delta = match event.action {
            ReactionAction::Add => reason.delta,
            ReactionAction::Remove => reason.delta.saturating_neg(),
        };

        // Read-then-write: see the note on `Ledger`
        self.ledger.ensure(author).await?;
        let balance = self.ledger.get(author).await?.saturating_add(delta);
        if !self.ledger.set(author, balance).await {
            return Ok(ReactionOutcome::LedgerFailed {
                user_id: author.clone(),
            });
        }
        info!(
            "{} {} {} on {} ({}): {:+} -> {}",
            event.user_id,
            if event.is_add() { "added" } else { "removed" },
            event.emoji,
            message.id,
            author,
            delta,
            balance
        );

        let state = self.replies.entry(&message.id);
        let mut state = state.lock().await;
        let changed = match event.action {
            ReactionAction::Add => state.insert(reason),
            ReactionAction::Remove => state.remove(&reason.emoji),
        };

        if state.is_idle() {
            if let Some(reply_id) = state.reply_id.take() {
                match self.gateway.delete_message(&message.channel_id, &reply_id).await {
                    Ok(()) | Err(GatewayError::NotFound) => {}
                    Err(e) => warn!("Failed to remove points reply {}: {}", reply_id, e),
                }
            }
            self.replies.forget(&message.id);
        } else if changed || state.reply_id.is_none() {
            self.publish(message, &mut state).await?;
        }

        Ok(ReactionOutcome::PointsApplied {
            user_id: author.clone(),
            delta,
            balance,
        })
    }

    /// Edit the tracked reply, or post a fresh one if there is none or it
    /// was deleted out from under us.
    async fn publish(&self, message: &ChatMessage, state: &mut MessageReplyState) -> Result<(), CoreError> {
        let body = render::points_embed(&message.author_name, state);

        if let Some(reply_id) = &state.reply_id {
            match self.gateway.edit(&message.channel_id, reply_id, &body).await {
                Ok(()) => return Ok(()),
                Err(GatewayError::NotFound) => {
                    warn!("Points reply {} on {} vanished, reposting", reply_id, message.id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let posted = self.gateway.reply(message, &body).await?;
        state.reply_id = Some(posted.id);
        Ok(())
    }

    #[cfg(test)]
    fn tracked_total(&self, message_id: &str) -> Option<i64> {
        if !self.replies.contains(message_id) {
            return None;
        }
        let state = self.replies.entry(message_id);
        let total = state.try_lock().ok()?.total_points();
        Some(total)
    }
}
