use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::debug;

use rally_core::error::GatewayError;
use rally_core::gateway::MessageGateway;
use rally_types::models::{ChatMessage, Reply};

/// Message body for `POST /channels/{id}/messages`.
#[derive(Serialize)]
struct OutgoingMessage<'a> {
    reply_to: &'a str,
    #[serde(flatten)]
    body: &'a Reply,
}

/// [`MessageGateway`] over the platform's REST API, authenticated with
/// the bot token.
#[derive(Clone)]
pub struct HttpGateway {
    http: Client,
    base_url: String,
    token: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self::with_client(Client::new(), base_url, token)
    }

    pub fn with_client(http: Client, base_url: &str, token: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn send(&self, req: RequestBuilder) -> Result<Response, GatewayError> {
        let resp = req
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound),
            status if status.is_success() => Ok(resp),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(GatewayError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

#[async_trait]
impl MessageGateway for HttpGateway {
    async fn fetch(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<Option<ChatMessage>, GatewayError> {
        let url = self.url(&format!("/channels/{}/messages/{}", channel_id, message_id));
        match self.send(self.http.get(url)).await {
            Ok(resp) => {
                let message = resp
                    .json::<ChatMessage>()
                    .await
                    .map_err(|e| GatewayError::Transport(e.to_string()))?;
                Ok(Some(message))
            }
            Err(GatewayError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn reply(&self, target: &ChatMessage, body: &Reply) -> Result<ChatMessage, GatewayError> {
        let url = self.url(&format!("/channels/{}/messages", target.channel_id));
        let payload = OutgoingMessage {
            reply_to: &target.id,
            body,
        };
        let resp = self.send(self.http.post(url).json(&payload)).await?;
        let posted = resp
            .json::<ChatMessage>()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        debug!("Posted {} in reply to {}", posted.id, target.id);
        Ok(posted)
    }

    async fn edit(
        &self,
        channel_id: &str,
        message_id: &str,
        body: &Reply,
    ) -> Result<(), GatewayError> {
        let url = self.url(&format!("/channels/{}/messages/{}", channel_id, message_id));
        self.send(self.http.patch(url).json(body)).await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), GatewayError> {
        let url = self.url(&format!("/channels/{}/messages/{}", channel_id, message_id));
        self.send(self.http.delete(url)).await?;
        Ok(())
    }

    async fn delete_channel(&self, channel_id: &str) -> Result<(), GatewayError> {
        let url = self.url(&format!("/channels/{}", channel_id));
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::Path,
        http::StatusCode,
        routing::{get, post},
    };
    use serde_json::Value;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn platform() -> Router {
        Router::new()
            .route(
                "/channels/{channel_id}/messages/{message_id}",
                get(|Path((channel_id, message_id)): Path<(String, String)>| async move {
                    if message_id == "missing" {
                        return Err(StatusCode::NOT_FOUND);
                    }
                    if message_id == "broken" {
                        return Err(StatusCode::INTERNAL_SERVER_ERROR);
                    }
                    Ok(Json(ChatMessage {
                        id: message_id,
                        channel_id,
                        author_id: "u1".into(),
                        author_name: "Una".into(),
                        in_thread: true,
                    }))
                }),
            )
            .route(
                "/channels/{channel_id}/messages",
                post(|Path(channel_id): Path<String>, Json(body): Json<Value>| async move {
                    // Echo the reply target through the posted id
                    let reply_to = body["reply_to"].as_str().unwrap_or_default().to_string();
                    Json(ChatMessage {
                        id: format!("re-{}-{}", reply_to, body["content"].as_str().unwrap_or("")),
                        channel_id,
                        author_id: "bot".into(),
                        author_name: "Rally".into(),
                        in_thread: false,
                    })
                }),
            )
    }

    #[tokio::test]
    async fn fetch_maps_not_found_to_none() {
        let gateway = HttpGateway::new(&serve(platform()).await, "token");

        let found = gateway.fetch("c1", "m1").await.unwrap().unwrap();
        assert_eq!(found.author_name, "Una");
        assert!(gateway.fetch("c1", "missing").await.unwrap().is_none());
        assert!(matches!(
            gateway.fetch("c1", "broken").await,
            Err(GatewayError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn reply_sends_target_and_flattened_body() {
        let gateway = HttpGateway::new(&serve(platform()).await, "token");
        let target = ChatMessage {
            id: "m1".into(),
            channel_id: "c1".into(),
            author_id: "u1".into(),
            author_name: "Una".into(),
            in_thread: false,
        };

        let posted = gateway.reply(&target, &Reply::text("hi")).await.unwrap();
        assert_eq!(posted.id, "re-m1-hi");
        assert_eq!(posted.channel_id, "c1");
    }

    #[tokio::test]
    async fn unreachable_platform_is_a_transport_error() {
        let gateway = HttpGateway::new("http://127.0.0.1:1", "token");
        assert!(matches!(
            gateway.delete_channel("c1").await,
            Err(GatewayError::Transport(_))
        ));
    }
}
