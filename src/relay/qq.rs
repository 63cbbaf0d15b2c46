//! QQ through a OneBot (go-cqhttp) HTTP endpoint.

use serde_json::json;

use super::{parse_json_body, Delivery, MessageKind, Notice, OutboundRequest, Platform, RelayError};
use crate::config::TwinConfig;

/// Where a QQ message goes. Groups win when both are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QqTarget {
    Private(i64),
    Group(i64),
}

impl QqTarget {
    pub fn from_ids(user_id: Option<i64>, group_id: Option<i64>) -> Option<Self> {
        group_id.map(Self::Group).or(user_id.map(Self::Private))
    }
}

pub struct Qq {
    api_url: String,
    target: Option<QqTarget>,
}

impl Qq {
    pub fn from_config(config: &TwinConfig) -> Self {
        Self {
            api_url: config.qq.api_url.trim_end_matches('/').to_string(),
            target: QqTarget::from_ids(config.qq.user_id, config.qq.group_id),
        }
    }

    /// Same endpoint, explicit recipient.
    pub fn with_target(mut self, target: QqTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Untitled general notices go out verbatim.
    pub fn render(notice: &Notice) -> String {
        if notice.kind == MessageKind::General && notice.title.is_empty() {
            notice.body.clone()
        } else {
            format!("{} {}", notice.kind.tag(), notice.full_text())
        }
    }
}

impl Platform for Qq {
    fn name(&self) -> &'static str {
        "qq"
    }

    fn is_configured(&self) -> bool {
        !self.api_url.is_empty() && self.target.is_some()
    }

    fn request(&self, notice: &Notice) -> Result<OutboundRequest, RelayError> {
        let Some(target) = self.target else {
            return Err(RelayError::NotConfigured(self.name()));
        };
        let message = Self::render(notice);
        let body = match target {
            QqTarget::Group(id) => json!({ "message_type": "group", "group_id": id, "message": message }),
            QqTarget::Private(id) => json!({ "message_type": "private", "user_id": id, "message": message }),
        };
        Ok(OutboundRequest::new(format!("{}/send_msg", self.api_url), body))
    }

    fn interpret(&self, _status: u16, body: &str) -> Result<Delivery, RelayError> {
        let value = parse_json_body(body)?;
        match value["retcode"].as_i64() {
            Some(0) => {
                let mut delivery = Delivery::new(self.name());
                delivery.message_id = value["data"]["message_id"].as_i64().map(|id| id.to_string());
                Ok(delivery)
            }
            code => Err(RelayError::Api {
                code: code.unwrap_or(-1),
                message: value["wording"]
                    .as_str()
                    .or(value["msg"].as_str())
                    .unwrap_or("unknown error")
                    .to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qq() -> Qq {
        Qq::from_config(&TwinConfig::default())
    }

    #[test]
    fn target_prefers_group() {
        assert_eq!(QqTarget::from_ids(Some(1), Some(2)), Some(QqTarget::Group(2)));
        assert_eq!(QqTarget::from_ids(Some(1), None), Some(QqTarget::Private(1)));
        assert_eq!(QqTarget::from_ids(None, None), None);
    }

    #[test]
    fn no_target_is_not_configured() {
        assert!(!qq().is_configured());
        assert!(matches!(
            qq().request(&Notice::text("x")),
            Err(RelayError::NotConfigured("qq"))
        ));
    }

    #[test]
    fn group_and_private_payloads() {
        let req = qq()
            .with_target(QqTarget::Group(555))
            .request(&Notice::text("hello"))
            .unwrap();
        assert_eq!(req.url, "http://127.0.0.1:5700/send_msg");
        assert_eq!(req.body["message_type"], "group");
        assert_eq!(req.body["group_id"], 555);
        assert_eq!(req.body["message"], "hello");

        let req = qq()
            .with_target(QqTarget::Private(7))
            .request(&Notice::alert("disk", "full", "low"))
            .unwrap();
        assert_eq!(req.body["message_type"], "private");
        assert_eq!(req.body["user_id"], 7);
        assert!(req.body["message"].as_str().unwrap().starts_with("[ALERT] Alert: disk [LOW]\n"));
    }

    #[test]
    fn retcode_zero_is_success() {
        let q = qq();
        let d = q.interpret(200, r#"{"retcode":0,"data":{"message_id":99}}"#).unwrap();
        assert_eq!(d.message_id.as_deref(), Some("99"));
        assert!(matches!(
            q.interpret(200, r#"{"retcode":100,"wording":"bad group"}"#),
            Err(RelayError::Api { code: 100, .. })
        ));
    }
}
