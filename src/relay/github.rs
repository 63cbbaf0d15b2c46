//! GitHub issues as a durable message channel between twins.
//!
//! Each notice becomes an issue labelled by kind; the other side reads them
//! back with [`GitHub::fetch_messages`].

use serde::Serialize;
use serde_json::{json, Value};

use super::{parse_json_body, Delivery, MessageKind, Notice, OutboundRequest, Platform, Relay, RelayError};
use crate::config::TwinConfig;

const ACCEPT: &str = "application/vnd.github.v3+json";

pub fn issue_label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::TaskComplete | MessageKind::SyncRequest => "twin-sync",
        MessageKind::DataUpdate => "twin-data",
        MessageKind::Alert => "twin-alert",
        MessageKind::Heartbeat => "twin-heartbeat",
        MessageKind::Query | MessageKind::General => "twin-message",
    }
}

/// An issue read back as a message.
#[derive(Debug, Clone, Serialize)]
pub struct IssueMessage {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub author: String,
    pub state: String,
    pub created_at: String,
    pub url: String,
}

impl IssueMessage {
    fn from_issue(issue: &Value) -> Option<Self> {
        Some(Self {
            id: issue["number"].as_u64()?,
            title: issue["title"].as_str().unwrap_or_default().to_string(),
            body: issue["body"].as_str().unwrap_or_default().to_string(),
            author: issue["user"]["login"].as_str().unwrap_or_default().to_string(),
            state: issue["state"].as_str().unwrap_or_default().to_string(),
            created_at: issue["created_at"].as_str().unwrap_or_default().to_string(),
            url: issue["html_url"].as_str().unwrap_or_default().to_string(),
        })
    }
}

pub struct GitHub {
    api_base: String,
    owner: Option<String>,
    repo: Option<String>,
    token: Option<String>,
    my_id: String,
}

impl GitHub {
    pub fn from_config(config: &TwinConfig) -> Self {
        Self {
            api_base: config.github.api_base.trim_end_matches('/').to_string(),
            owner: config.github.owner.clone(),
            repo: config.github.repo.clone(),
            token: config.github.token.clone(),
            my_id: config.identity.my_id.clone(),
        }
    }

    fn issues_url(&self) -> Result<String, RelayError> {
        match (&self.owner, &self.repo) {
            (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
                Ok(format!("{}/repos/{owner}/{repo}/issues", self.api_base))
            }
            _ => Err(RelayError::NotConfigured(self.name())),
        }
    }

    fn token(&self) -> Result<&str, RelayError> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(RelayError::NotConfigured(self.name()))
    }

    pub fn issue_body(&self, notice: &Notice) -> String {
        let now = chrono::Local::now();
        format!(
            "**From:** {}\n**Type:** {}\n**Time:** {}\n\n---\n\n{}\n\n---\n\n*Message ID: msg_{}*\n*Reply to this issue to respond*",
            self.my_id,
            notice.kind,
            now.format("%Y-%m-%d %H:%M:%S"),
            notice.body,
            now.format("%Y%m%d_%H%M%S"),
        )
    }

    /// Recent issues carrying `label`, newest first.
    pub async fn fetch_messages(
        &self,
        relay: &Relay,
        label: &str,
    ) -> Result<Vec<IssueMessage>, RelayError> {
        let url = format!(
            "{}?state=all&labels={label}&sort=created&direction=desc",
            self.issues_url()?
        );
        let response = relay
            .client()
            .get(url)
            .header("Authorization", format!("token {}", self.token()?))
            .header("Accept", ACCEPT)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        if status != 200 {
            return Err(RelayError::Rejected {
                status,
                body: body.chars().take(500).collect(),
            });
        }

        let issues = parse_json_body(&body)?;
        Ok(issues
            .as_array()
            .map(|list| list.iter().filter_map(IssueMessage::from_issue).collect())
            .unwrap_or_default())
    }
}

impl Platform for GitHub {
    fn name(&self) -> &'static str {
        "github"
    }

    fn is_configured(&self) -> bool {
        self.issues_url().is_ok() && self.token().is_ok()
    }

    fn request(&self, notice: &Notice) -> Result<OutboundRequest, RelayError> {
        let url = self.issues_url()?;
        let token = self.token()?;
        let title = if notice.title.is_empty() {
            notice.kind.as_str().to_uppercase()
        } else {
            notice.title.clone()
        };
        Ok(OutboundRequest::new(
            url,
            json!({
                "title": format!("[{}] {}", self.my_id, title),
                "body": self.issue_body(notice),
                "labels": [issue_label(notice.kind)],
            }),
        )
        .header("Authorization", format!("token {token}"))
        .header("Accept", ACCEPT))
    }

    /// Only 201 Created counts.
    fn interpret(&self, status: u16, body: &str) -> Result<Delivery, RelayError> {
        if status != 201 {
            return Err(RelayError::Rejected {
                status,
                body: body.chars().take(500).collect(),
            });
        }
        let value = parse_json_body(body)?;
        let mut delivery = Delivery::new(self.name());
        delivery.message_id = value["number"].as_u64().map(|n| n.to_string());
        delivery.url = value["html_url"].as_str().map(str::to_string);
        Ok(delivery)
    }
}
