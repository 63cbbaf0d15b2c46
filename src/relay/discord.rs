//! Discord incoming webhook with a single embed.

use serde_json::json;

use super::{Delivery, MessageKind, Notice, OutboundRequest, Platform, RelayError};
use crate::config::TwinConfig;

/// Embed description cap imposed by Discord.
const DESCRIPTION_LIMIT: usize = 2000;

pub fn embed_color(kind: MessageKind) -> u32 {
    match kind {
        MessageKind::TaskComplete => 0x00FF00,
        MessageKind::DataUpdate => 0x0000FF,
        MessageKind::Alert => 0xFF0000,
        MessageKind::Query => 0xFFFF00,
        MessageKind::Heartbeat => 0xFF00FF,
        MessageKind::SyncRequest => 0x00FFFF,
        MessageKind::General => 0x808080,
    }
}

pub struct Discord {
    webhook_url: Option<String>,
    my_id: String,
}

impl Discord {
    pub fn from_config(config: &TwinConfig) -> Self {
        Self {
            webhook_url: config.discord.webhook_url.clone(),
            my_id: config.identity.my_id.clone(),
        }
    }
}

impl Platform for Discord {
    fn name(&self) -> &'static str {
        "discord"
    }

    fn is_configured(&self) -> bool {
        self.webhook_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    fn request(&self, notice: &Notice) -> Result<OutboundRequest, RelayError> {
        let Some(url) = self.webhook_url.as_deref().filter(|u| !u.is_empty()) else {
            return Err(RelayError::NotConfigured(self.name()));
        };

        let embed_title = if notice.title.is_empty() {
            notice.kind.as_str().to_uppercase()
        } else {
            notice.title.clone()
        };
        let description: String = notice.body.chars().take(DESCRIPTION_LIMIT).collect();
        let footer = format!(
            "From: {} | {}",
            self.my_id,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        Ok(OutboundRequest::new(
            url,
            json!({
                "content": format!("[{}] {} {}\n\n{}", self.my_id, notice.kind.tag(), notice.title, notice.body),
                "embeds": [{
                    "title": embed_title,
                    "description": description,
                    "color": embed_color(notice.kind),
                    "footer": { "text": footer },
                }],
                "username": self.my_id,
            }),
        ))
    }

    /// Webhooks answer 204 with no body; any 2xx counts.
    fn interpret(&self, status: u16, body: &str) -> Result<Delivery, RelayError> {
        if (200..300).contains(&status) {
            Ok(Delivery::new(self.name()))
        } else {
            Err(RelayError::Rejected {
                status,
                body: body.chars().take(500).collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Discord {
        let mut config = TwinConfig::default();
        config.discord.webhook_url = Some("https://discord.test/api/webhooks/1/x".into());
        config.identity.my_id = "twin_a".into();
        Discord::from_config(&config)
    }

    #[test]
    fn payload_has_embed_with_kind_color() {
        let req = configured()
            .request(&Notice::task_complete("collect", "ok", None))
            .unwrap();
        assert_eq!(req.url, "https://discord.test/api/webhooks/1/x");
        assert_eq!(req.body["username"], "twin_a");
        let embed = &req.body["embeds"][0];
        assert_eq!(embed["title"], "Task Complete: collect");
        assert_eq!(embed["color"], 0x00FF00);
        assert!(embed["footer"]["text"]
            .as_str()
            .unwrap()
            .starts_with("From: twin_a | "));
        assert!(req.body["content"]
            .as_str()
            .unwrap()
            .starts_with("[twin_a] [OK] Task Complete: collect"));
    }

    #[test]
    fn untitled_uses_kind_and_description_is_capped() {
        let long = "x".repeat(3000);
        let req = configured()
            .request(&Notice::new(MessageKind::Query, "", long))
            .unwrap();
        let embed = &req.body["embeds"][0];
        assert_eq!(embed["title"], "QUERY");
        assert_eq!(embed["description"].as_str().unwrap().len(), DESCRIPTION_LIMIT);
    }

    #[test]
    fn any_2xx_is_success() {
        let d = configured();
        assert!(d.interpret(204, "").is_ok());
        assert!(d.interpret(200, "{}").is_ok());
        assert!(matches!(
            d.interpret(404, "Unknown Webhook"),
            Err(RelayError::Rejected { status: 404, .. })
        ));
        assert!(!Discord::from_config(&TwinConfig::default()).is_configured());
    }
}
