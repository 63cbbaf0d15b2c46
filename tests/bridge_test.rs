mod helpers;

use helpers::{mock_endpoint, test_config};
use serde_json::{json, Value};
use std::sync::Arc;
use twinsync::bridge::{self, BridgeState};
use twinsync::config::TwinConfig;

/// Serve the bridge on an ephemeral port and return its base URL.
async fn start_bridge(config: TwinConfig) -> String {
    let state = Arc::new(BridgeState::new(config).unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, bridge::router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn post(url: &str, body: Value) -> Value {
    reqwest::Client::new()
        .post(url)
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn private_message_gets_command_reply() {
    let qq = mock_endpoint("/send_msg", 200, r#"{"retcode":0,"data":{"message_id":1}}"#).await;
    let (dir, mut config) = test_config();
    config.qq.api_url = qq.url("");
    let base = start_bridge(config.clone()).await;

    let answer = post(
        &format!("{base}/qq/callback"),
        json!({
            "post_type": "message",
            "message_type": "private",
            "user_id": 12345,
            "raw_message": "分析 600519",
            "sender": {"nickname": "owner"}
        }),
    )
    .await;
    assert_eq!(answer, json!({"status": "ok"}));

    let sent = qq.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["message_type"], "private");
    assert_eq!(sent[0]["user_id"], 12345);
    assert_eq!(sent[0]["message"], "Analyzing 600519...");

    let log = std::fs::read_to_string(dir.path().join("sync").join("qq_messages.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains("600519"));
}

#[tokio::test]
async fn group_messages_need_a_mention() {
    let qq = mock_endpoint("/send_msg", 200, r#"{"retcode":0}"#).await;
    let (_dir, mut config) = test_config();
    config.qq.api_url = qq.url("");
    config.qq.mention_aliases = vec!["@twin".into()];
    let base = start_bridge(config).await;
    let callback = format!("{base}/qq/callback");

    post(
        &callback,
        json!({"post_type": "message", "message_type": "group", "group_id": 9, "user_id": 1, "raw_message": "status"}),
    )
    .await;
    assert!(qq.requests().is_empty());

    post(
        &callback,
        json!({"post_type": "message", "message_type": "group", "group_id": 9, "user_id": 1, "raw_message": "@twin status"}),
    )
    .await;
    let sent = qq.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["message_type"], "group");
    assert_eq!(sent[0]["group_id"], 9);
    assert!(sent[0]["message"].as_str().unwrap().starts_with("System status:"));
}

#[tokio::test]
async fn non_message_events_are_ignored() {
    let qq = mock_endpoint("/send_msg", 200, r#"{"retcode":0}"#).await;
    let (dir, mut config) = test_config();
    config.qq.api_url = qq.url("");
    let base = start_bridge(config).await;

    let answer = post(
        &format!("{base}/qq/callback"),
        json!({"post_type": "meta_event", "meta_event_type": "heartbeat"}),
    )
    .await;
    assert_eq!(answer["status"], "ok");
    assert!(qq.requests().is_empty());
    assert!(!dir.path().join("sync").join("qq_messages.jsonl").exists());
}

#[tokio::test]
async fn malformed_callback_still_answers_ok() {
    let qq = mock_endpoint("/send_msg", 200, r#"{"retcode":0}"#).await;
    let (dir, mut config) = test_config();
    config.qq.api_url = qq.url("");
    let base = start_bridge(config).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/qq/callback"))
        .header("content-type", "text/plain")
        .body("post_type=message")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let answer: Value = response.json().await.unwrap();
    assert_eq!(answer, json!({"status": "ok"}));
    assert!(qq.requests().is_empty());
    assert!(!dir.path().join("sync").join("qq_messages.jsonl").exists());
}

#[tokio::test]
async fn send_route_relays_or_reports_error() {
    let qq = mock_endpoint("/send_msg", 200, r#"{"retcode":0,"data":{"message_id":77}}"#).await;
    let (_dir, mut config) = test_config();
    config.qq.api_url = qq.url("");
    let base = start_bridge(config).await;
    let send = format!("{base}/send");

    let ok = post(&send, json!({"message": "ping", "user_id": 5})).await;
    assert_eq!(ok["status"], "ok");
    assert_eq!(ok["delivery"]["message_id"], "77");

    let no_target = post(&send, json!({"message": "ping"})).await;
    assert_eq!(no_target["status"], "error");

    let empty = post(&send, json!({"user_id": 5})).await;
    assert_eq!(empty["error"], "message is required");
}

#[tokio::test]
async fn status_reports_upstream() {
    let (_dir, mut config) = test_config();
    config.qq.api_url = "http://10.0.0.2:5700".into();
    let base = start_bridge(config).await;

    let status: Value = reqwest::get(format!("{base}/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "running");
    assert_eq!(status["go-cqhttp"], "http://10.0.0.2:5700");
    assert!(status["time"].is_string());
}
