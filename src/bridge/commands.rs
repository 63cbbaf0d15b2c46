//! Fixed keyword table for chat commands.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Analyze(String),
    Market,
    Status,
    Echo(String),
}

const HELP: &[&str] = &["help", "帮助", "菜单"];
const ANALYZE: &[&str] = &["analyze", "分析"];
const MARKET: &[&str] = &["market", "行情", "市场", "大盘"];
const STATUS: &[&str] = &["status", "状态"];

pub fn parse(message: &str) -> Command {
    let message = message.trim();
    let lower = message.to_lowercase();

    if HELP.contains(&lower.as_str()) {
        return Command::Help;
    }
    for prefix in ANALYZE {
        if lower.starts_with(prefix) {
            let rest = message.get(prefix.len()..).unwrap_or_default();
            return Command::Analyze(rest.trim().to_string());
        }
    }
    if MARKET.contains(&lower.as_str()) {
        Command::Market
    } else if STATUS.contains(&lower.as_str()) {
        Command::Status
    } else {
        Command::Echo(message.to_string())
    }
}

pub fn reply(command: &Command, my_id: &str, twin_id: &str) -> String {
    match command {
        Command::Help => [
            "Commands:",
            "- analyze <symbol>: analyze a stock",
            "- market: today's market overview",
            "- status: system status",
            "- help: show this menu",
        ]
        .join("\n"),
        Command::Analyze(target) if target.is_empty() => {
            "Analyze what? Try: analyze <symbol>".to_string()
        }
        Command::Analyze(target) => format!("Analyzing {target}..."),
        Command::Market => "Fetching today's market overview...".to_string(),
        Command::Status => format!(
            "System status:\n- {my_id} (local): online\n- {twin_id} (cloud): online\n- QQ link: ok"
        ),
        Command::Echo(message) => format!("Received: {message}"),
    }
}

/// Private messages always count; group messages need one of the aliases.
pub fn is_addressed(message_type: &str, text: &str, aliases: &[String]) -> bool {
    message_type == "private" || aliases.iter().any(|a| !a.is_empty() && text.contains(a.as_str()))
}

pub fn strip_mentions(text: &str, aliases: &[String]) -> String {
    aliases
        .iter()
        .filter(|a| !a.is_empty())
        .fold(text.to_string(), |acc, alias| acc.replace(alias.as_str(), ""))
        .trim()
        .to_string()
}
