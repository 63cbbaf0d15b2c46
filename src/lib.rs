//! Personal-assistant toolkit for a pair of cooperating "twin" agents.
//!
//! One twin runs locally, the other in the cloud. Each keeps its own
//! file-backed state under `~/.twinsync/` and talks to the other (and to its
//! owner) through chat platforms, GitHub issues, or a shared folder.
//!
//! # Modules
//!
//! - [`config`]: TOML configuration with environment overrides
//! - [`store`]: atomic JSON and JSON Lines persistence helpers
//! - [`knowledge`]: document index with keyword, tag, and category lookup
//! - [`ingest`]: text/code/PDF/image parsing and the learning pipeline
//! - [`brain`]: thoughts, memories, goals, and preferences
//! - [`tasks`]: personal task list and daily plan
//! - [`scheduler`]: hourly and daily job runner
//! - [`skills`]: one-at-a-time skill installer
//! - [`relay`]: outbound notices to Telegram, Discord, Feishu, GitHub, and QQ
//! - [`bridge`]: inbound HTTP listener for QQ
//! - [`sync`]: twin message exchange and git sync
//! - [`executor`]: keyword-driven command execution

pub mod brain;
pub mod bridge;
pub mod config;
pub mod executor;
pub mod ingest;
pub mod knowledge;
pub mod relay;
pub mod scheduler;
pub mod skills;
pub mod store;
pub mod sync;
pub mod tasks;
