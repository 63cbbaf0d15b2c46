//! Feishu (Lark) custom-bot webhook cards, plus the app-bot API.

use serde::Serialize;
use serde_json::{json, Value};

use super::{
    parse_json_body, Delivery, MessageKind, Notice, OutboundRequest, Platform, Relay,
    RelayError, SendRecord,
};
use crate::config::TwinConfig;

/// Card header colour. Only high-priority alerts are red.
pub fn header_template(notice: &Notice) -> &'static str {
    match notice.kind {
        MessageKind::TaskComplete => "green",
        MessageKind::DataUpdate => "blue",
        MessageKind::Alert if notice.is_high_priority() => "red",
        MessageKind::Alert => "orange",
        MessageKind::Query => "yellow",
        MessageKind::Heartbeat => "purple",
        MessageKind::SyncRequest => "cyan",
        MessageKind::General => "grey",
    }
}

/// Feishu replies `{"code": 0, ...}` on success, with `msg` explaining failures.
fn check_code(value: &Value) -> Result<(), RelayError> {
    match value["code"].as_i64() {
        Some(0) => Ok(()),
        code => Err(RelayError::Api {
            code: code.unwrap_or(-1),
            message: value["msg"].as_str().unwrap_or("unknown error").to_string(),
        }),
    }
}

// ── Webhook ───────────────────────────────────────────────────────────────────

pub struct FeishuWebhook {
    webhook_url: Option<String>,
    my_id: String,
}

impl FeishuWebhook {
    pub fn from_config(config: &TwinConfig) -> Self {
        Self {
            webhook_url: config.feishu.webhook_url.clone(),
            my_id: config.identity.my_id.clone(),
        }
    }

    fn card(&self, notice: &Notice) -> Value {
        let mut elements = vec![json!({
            "tag": "div",
            "text": { "tag": "lark_md", "content": notice.body },
        })];
        if notice.kind == MessageKind::SyncRequest {
            elements.push(json!({
                "tag": "action",
                "actions": [{
                    "tag": "button",
                    "text": { "tag": "plain_text", "content": "Confirm sync" },
                    "type": "primary",
                    "value": { "action": "confirm_sync" },
                }],
            }));
        }
        elements.push(json!({
            "tag": "note",
            "elements": [{
                "tag": "plain_text",
                "content": format!(
                    "From: {} | {}",
                    self.my_id,
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
                ),
            }],
        }));

        let title = if notice.title.is_empty() {
            notice.kind.as_str().to_uppercase()
        } else {
            notice.title.clone()
        };
        json!({
            "msg_type": "interactive",
            "card": {
                "header": {
                    "title": { "tag": "plain_text", "content": title },
                    "template": header_template(notice),
                },
                "elements": elements,
            },
        })
    }
}

impl Platform for FeishuWebhook {
    fn name(&self) -> &'static str {
        "feishu"
    }

    fn is_configured(&self) -> bool {
        self.webhook_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// General messages go out as plain text; every other kind as a card.
    fn request(&self, notice: &Notice) -> Result<OutboundRequest, RelayError> {
        let Some(url) = self.webhook_url.as_deref().filter(|u| !u.is_empty()) else {
            return Err(RelayError::NotConfigured(self.name()));
        };
        let body = if notice.kind == MessageKind::General {
            let text = if notice.title.is_empty() {
                format!("[{}] {}", self.my_id, notice.body)
            } else {
                format!("[{}] {}\n\n{}", self.my_id, notice.title, notice.body)
            };
            json!({ "msg_type": "text", "content": { "text": text } })
        } else {
            self.card(notice)
        };
        Ok(OutboundRequest::new(url, body))
    }

    fn interpret(&self, _status: u16, body: &str) -> Result<Delivery, RelayError> {
        check_code(&parse_json_body(body)?)?;
        Ok(Delivery::new(self.name()))
    }
}

// ── App bot ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct FeishuChat {
    pub chat_id: String,
    pub name: String,
}

/// Sends as the Feishu app rather than a webhook, which needs a tenant token.
pub struct FeishuApp {
    api_base: String,
    app_id: Option<String>,
    app_secret: Option<String>,
}

impl FeishuApp {
    pub fn from_config(config: &TwinConfig) -> Self {
        Self {
            api_base: config.feishu.api_base.trim_end_matches('/').to_string(),
            app_id: config.feishu.app_id.clone(),
            app_secret: config.feishu.app_secret.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.app_id.as_deref().is_some_and(|s| !s.is_empty())
            && self.app_secret.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub async fn tenant_token(&self, relay: &Relay) -> Result<String, RelayError> {
        let (Some(app_id), Some(app_secret)) = (&self.app_id, &self.app_secret) else {
            return Err(RelayError::NotConfigured("feishu app"));
        };
        let request = OutboundRequest::new(
            format!("{}/auth/v3/tenant_access_token/internal", self.api_base),
            json!({ "app_id": app_id, "app_secret": app_secret }),
        );
        let (_, body) = relay.post(&request).await?;
        let value = parse_json_body(&body)?;
        check_code(&value)?;
        value["tenant_access_token"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RelayError::InvalidResponse("missing tenant_access_token".into()))
    }

    /// Post a text message to a chat. Logged under the `feishu_app` platform.
    pub async fn send_text(
        &self,
        relay: &Relay,
        chat_id: &str,
        text: &str,
    ) -> Result<Delivery, RelayError> {
        let result = self.try_send_text(relay, chat_id, text).await;
        let record = SendRecord::from_attempt("feishu_app", &Notice::text(text), &result);
        if let Err(e) = relay.log().append(&record) {
            tracing::warn!(error = %e, "failed to write send log");
        }
        result
    }

    async fn try_send_text(
        &self,
        relay: &Relay,
        chat_id: &str,
        text: &str,
    ) -> Result<Delivery, RelayError> {
        let token = self.tenant_token(relay).await?;
        let content = serde_json::to_string(&json!({ "text": text }))
            .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;
        let request = OutboundRequest::new(
            format!("{}/im/v1/messages?receive_id_type=chat_id", self.api_base),
            json!({ "receive_id": chat_id, "msg_type": "text", "content": content }),
        )
        .header("Authorization", format!("Bearer {token}"));

        let (_, body) = relay.post(&request).await?;
        let value = parse_json_body(&body)?;
        check_code(&value)?;
        let mut delivery = Delivery::new("feishu_app");
        delivery.message_id = value["data"]["message_id"].as_str().map(str::to_string);
        Ok(delivery)
    }

    /// Chats the app has been added to.
    pub async fn list_chats(&self, relay: &Relay) -> Result<Vec<FeishuChat>, RelayError> {
        let token = self.tenant_token(relay).await?;
        let response = relay
            .client()
            .get(format!("{}/im/v1/chats", self.api_base))
            .bearer_auth(token)
            .send()
            .await?;
        let value = parse_json_body(&response.text().await?)?;
        check_code(&value)?;

        let chats = value["data"]["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| FeishuChat {
                        chat_id: item["chat_id"].as_str().unwrap_or_default().to_string(),
                        name: item["name"].as_str().unwrap_or_default().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(chats)
    }
}
