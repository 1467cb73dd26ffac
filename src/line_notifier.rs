use log::info;
use reqwest::Client;
use serde::Serialize;

use crate::MenuError;

pub const LINE_API_BASE: &str = "https://api.line.me";

/// Delivers a finished message to its audience.
#[allow(async_fn_in_trait)]
pub trait Notify {
    async fn notify(&self, message: &str) -> Result<(), MenuError>;
}

/// Who receives the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// One user, group or room.
    Push { to: String },
    /// Every friend of the channel.
    Broadcast,
    /// Answer to a webhook event.
    Reply { reply_token: String },
}

#[derive(Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MessageRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_token: Option<&'a str>,
    messages: Vec<TextMessage<'a>>,
}

pub struct LineNotifier {
    client: Client,
    api_base: String,
    channel_access_token: String,
    delivery: Delivery,
}

impl LineNotifier {
    pub fn new(client: Client, channel_access_token: String, delivery: Delivery) -> Self {
        Self {
            client,
            api_base: LINE_API_BASE.to_string(),
            channel_access_token,
            delivery,
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn delivery_name(&self) -> &'static str {
        match self.delivery {
            Delivery::Push { .. } => "push",
            Delivery::Broadcast => "broadcast",
            Delivery::Reply { .. } => "reply",
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v2/bot/message/{}", self.api_base, self.delivery_name())
    }

    fn request<'a>(&'a self, message: &'a str) -> MessageRequest<'a> {
        let (to, reply_token) = match &self.delivery {
            Delivery::Push { to } => (Some(to.as_str()), None),
            Delivery::Broadcast => (None, None),
            Delivery::Reply { reply_token } => (None, Some(reply_token.as_str())),
        };
        MessageRequest {
            to,
            reply_token,
            messages: vec![TextMessage {
                kind: "text",
                text: message,
            }],
        }
    }
}

impl Notify for LineNotifier {
    async fn notify(&self, message: &str) -> Result<(), MenuError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.channel_access_token)
            .json(&self.request(message))
            .send()
            .await
            .map_err(|e| MenuError::SendError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MenuError::SendError(format!("HTTP {status}: {body}")));
        }

        info!("sent {} message ({} chars)", self.delivery_name(), message.chars().count());
        Ok(())
    }
}
