//! Telegram Bot API `sendMessage`.

use serde_json::json;

use super::{parse_json_body, Delivery, Notice, OutboundRequest, Platform, RelayError};
use crate::config::TwinConfig;

pub struct Telegram {
    api_base: String,
    bot_token: Option<String>,
    chat_id: Option<String>,
    my_id: String,
}

impl Telegram {
    pub fn from_config(config: &TwinConfig) -> Self {
        Self {
            api_base: config.telegram.api_base.trim_end_matches('/').to_string(),
            bot_token: config.telegram.bot_token.clone(),
            chat_id: config.telegram.chat_id.clone(),
            my_id: config.identity.my_id.clone(),
        }
    }

    /// `{tag} *{my_id}* | {KIND}` header, the message, and an HH:MM:SS footer.
    pub fn render(&self, notice: &Notice) -> String {
        format!(
            "{} *{}* | {}\n{}\n\n`{}`",
            notice.kind.tag(),
            self.my_id,
            notice.kind.as_str().to_uppercase(),
            notice.full_text(),
            chrono::Local::now().format("%H:%M:%S"),
        )
    }
}

impl Platform for Telegram {
    fn name(&self) -> &'static str {
        "telegram"
    }

    fn is_configured(&self) -> bool {
        self.bot_token.as_deref().is_some_and(|t| !t.is_empty())
            && self.chat_id.as_deref().is_some_and(|c| !c.is_empty())
    }

    fn request(&self, notice: &Notice) -> Result<OutboundRequest, RelayError> {
        let (Some(token), Some(chat_id)) = (&self.bot_token, &self.chat_id) else {
            return Err(RelayError::NotConfigured(self.name()));
        };
        Ok(OutboundRequest::new(
            format!("{}/bot{}/sendMessage", self.api_base, token),
            json!({
                "chat_id": chat_id,
                "text": self.render(notice),
                "parse_mode": "Markdown",
            }),
        ))
    }

    fn interpret(&self, _status: u16, body: &str) -> Result<Delivery, RelayError> {
        let value = parse_json_body(body)?;
        if value["ok"].as_bool() == Some(true) {
            let mut delivery = Delivery::new(self.name());
            delivery.message_id = value["result"]["message_id"]
                .as_i64()
                .map(|id| id.to_string());
            Ok(delivery)
        } else {
            Err(RelayError::Api {
                code: value["error_code"].as_i64().unwrap_or(-1),
                message: value["description"]
                    .as_str()
                    .unwrap_or("unknown error")
                    .to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::MessageKind;

    fn configured() -> Telegram {
        let mut config = TwinConfig::default();
        config.telegram.bot_token = Some("123:abc".into());
        config.telegram.chat_id = Some("-100".into());
        config.identity.my_id = "twin_a".into();
        Telegram::from_config(&config)
    }

    #[test]
    fn builds_send_message_request() {
        let t = configured();
        assert!(t.is_configured());
        let req = t
            .request(&Notice::new(MessageKind::Alert, "", "disk full"))
            .unwrap();
        assert_eq!(req.url, "https://api.telegram.org/bot123:abc/sendMessage");
        assert_eq!(req.body["chat_id"], "-100");
        assert_eq!(req.body["parse_mode"], "Markdown");
        let text = req.body["text"].as_str().unwrap();
        assert!(text.starts_with("[ALERT] *twin_a* | ALERT\ndisk full\n\n`"));
        assert!(text.ends_with('`'));
    }

    #[test]
    fn missing_chat_is_not_configured() {
        let mut config = TwinConfig::default();
        config.telegram.bot_token = Some("123:abc".into());
        let t = Telegram::from_config(&config);
        assert!(!t.is_configured());
        assert!(matches!(
            t.request(&Notice::text("x")),
            Err(RelayError::NotConfigured("telegram"))
        ));
    }

    #[test]
    fn interprets_ok_flag() {
        let t = configured();
        let d = t
            .interpret(200, r#"{"ok":true,"result":{"message_id":77}}"#)
            .unwrap();
        assert_eq!(d.message_id.as_deref(), Some("77"));

        let err = t
            .interpret(400, r#"{"ok":false,"error_code":400,"description":"chat not found"}"#)
            .unwrap_err();
        assert!(matches!(err, RelayError::Api { code: 400, .. }));
        assert!(matches!(t.interpret(502, "<html>"), Err(RelayError::InvalidResponse(_))));
    }
}
