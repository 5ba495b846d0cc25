use async_trait::async_trait;

use rally_types::models::{ChatMessage, Reply};

use crate::error::GatewayError;

/// Message primitives the chat platform exposes to the bot.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// `Ok(None)` when the message or its channel no longer exists.
    async fn fetch(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<Option<ChatMessage>, GatewayError>;

    /// Post `body` as a reply to `target`, returning the posted message.
    async fn reply(&self, target: &ChatMessage, body: &Reply) -> Result<ChatMessage, GatewayError>;

    async fn edit(
        &self,
        channel_id: &str,
        message_id: &str,
        body: &Reply,
    ) -> Result<(), GatewayError>;

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), GatewayError>;

    /// Destroy a whole container (thread or channel).
    async fn delete_channel(&self, channel_id: &str) -> Result<(), GatewayError>;
}

/// Decides whether a user holds moderator rights in a container.
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    async fn is_privileged(&self, user_id: &str, channel_id: &str) -> bool;
}
