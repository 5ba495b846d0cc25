use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use rally_core::gateway::PermissionOracle;

use crate::client::HttpGateway;

#[derive(Deserialize)]
struct PermissionResponse {
    privileged: bool,
}

/// Asks the platform whether a user moderates a channel. Any failure
/// counts as "not privileged".
#[derive(Clone)]
pub struct HttpPermissionOracle {
    gateway: HttpGateway,
}

impl HttpPermissionOracle {
    pub fn new(gateway: HttpGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl PermissionOracle for HttpPermissionOracle {
    async fn is_privileged(&self, user_id: &str, channel_id: &str) -> bool {
        let url = self
            .gateway
            .url(&format!("/channels/{}/permissions/{}", channel_id, user_id));
        let resp = match self.gateway.send(self.gateway.http().get(url)).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Permission lookup for {} in {} failed: {}", user_id, channel_id, e);
                return false;
            }
        };
        match resp.json::<PermissionResponse>().await {
            Ok(body) => body.privileged,
            Err(e) => {
                warn!("Malformed permission response for {}: {}", user_id, e);
                false
            }
        }
    }
}
