mod helpers;

use helpers::{mock_endpoint, test_config};
use twinsync::relay::discord::Discord;
use twinsync::relay::feishu::FeishuWebhook;
use twinsync::relay::github::GitHub;
use twinsync::relay::qq::{Qq, QqTarget};
use twinsync::relay::telegram::Telegram;
use twinsync::relay::{MessageKind, Notice, Relay, RelayError};

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

#[tokio::test]
async fn telegram_success_is_logged() {
    let mock = mock_endpoint(
        "/botTOKEN/sendMessage",
        200,
        r#"{"ok":true,"result":{"message_id":321}}"#,
    )
    .await;
    let (_dir, mut config) = test_config();
    config.telegram.api_base = mock.url("");
    config.telegram.bot_token = Some("TOKEN".into());
    config.telegram.chat_id = Some("42".into());

    let relay = Relay::from_config(&config).unwrap();
    let delivery = relay
        .send(&Telegram::from_config(&config), &Notice::heartbeat("online", &[]))
        .await
        .unwrap();
    assert_eq!(delivery.message_id.as_deref(), Some("321"));

    let sent = mock.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["chat_id"], "42");
    assert!(sent[0]["text"].as_str().unwrap().starts_with("[HEART] *twin_a* | HEARTBEAT"));

    let log = relay.log().read("telegram", today()).unwrap();
    assert_eq!(log.len(), 1);
    assert!(log[0].success);
    assert_eq!(log[0].kind, "heartbeat");
}

#[tokio::test]
async fn telegram_api_failure_is_an_error_value() {
    let mock = mock_endpoint(
        "/botTOKEN/sendMessage",
        400,
        r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
    )
    .await;
    let (_dir, mut config) = test_config();
    config.telegram.api_base = mock.url("");
    config.telegram.bot_token = Some("TOKEN".into());
    config.telegram.chat_id = Some("0".into());

    let relay = Relay::from_config(&config).unwrap();
    let err = relay
        .send(&Telegram::from_config(&config), &Notice::text("hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Api { code: 400, .. }));

    let log = relay.log().read("telegram", today()).unwrap();
    assert!(!log[0].success);
    assert!(log[0].error.as_deref().unwrap().contains("chat not found"));
}

#[tokio::test]
async fn discord_accepts_no_content() {
    let mock = mock_endpoint("/webhook", 204, "").await;
    let (_dir, mut config) = test_config();
    config.discord.webhook_url = Some(mock.url("/webhook"));

    let relay = Relay::from_config(&config).unwrap();
    relay
        .send(&Discord::from_config(&config), &Notice::alert("cpu", "hot", "high"))
        .await
        .unwrap();
    assert_eq!(mock.requests()[0]["embeds"][0]["color"], 0xFF0000);
}

#[tokio::test]
async fn discord_rejection_carries_status() {
    let mock = mock_endpoint("/webhook", 404, r#"{"message":"Unknown Webhook"}"#).await;
    let (_dir, mut config) = test_config();
    config.discord.webhook_url = Some(mock.url("/webhook"));

    let relay = Relay::from_config(&config).unwrap();
    let err = relay
        .send(&Discord::from_config(&config), &Notice::text("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Rejected { status: 404, .. }));
}

#[tokio::test]
async fn feishu_code_decides_success() {
    let ok = mock_endpoint("/hook", 200, r#"{"code":0,"msg":"success"}"#).await;
    let bad = mock_endpoint("/hook", 200, r#"{"code":9499,"msg":"Bad Request"}"#).await;
    let (_dir, mut config) = test_config();

    config.feishu.webhook_url = Some(ok.url("/hook"));
    let relay = Relay::from_config(&config).unwrap();
    relay
        .send(&FeishuWebhook::from_config(&config), &Notice::sync_request("daily"))
        .await
        .unwrap();
    assert_eq!(ok.requests()[0]["msg_type"], "interactive");

    config.feishu.webhook_url = Some(bad.url("/hook"));
    let err = relay
        .send(&FeishuWebhook::from_config(&config), &Notice::text("x"))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "API error 9499: Bad Request");
    assert_eq!(relay.log().read("feishu", today()).unwrap().len(), 2);
}

#[tokio::test]
async fn github_requires_created() {
    let mock = mock_endpoint(
        "/repos/acme/twins/issues",
        201,
        r#"{"number":7,"html_url":"https://github.test/acme/twins/issues/7"}"#,
    )
    .await;
    let (_dir, mut config) = test_config();
    config.github.api_base = mock.url("");
    config.github.owner = Some("acme".into());
    config.github.repo = Some("twins".into());
    config.github.token = Some("t".into());

    let relay = Relay::from_config(&config).unwrap();
    let d = relay
        .send(&GitHub::from_config(&config), &Notice::task_complete("backup", "done", None))
        .await
        .unwrap();
    assert_eq!(d.message_id.as_deref(), Some("7"));
    assert_eq!(d.url.as_deref(), Some("https://github.test/acme/twins/issues/7"));
    assert_eq!(mock.requests()[0]["labels"][0], "twin-sync");
}

#[tokio::test]
async fn qq_group_send() {
    let mock = mock_endpoint("/send_msg", 200, r#"{"retcode":0,"data":{"message_id":5}}"#).await;
    let (_dir, mut config) = test_config();
    config.qq.api_url = mock.url("");

    let relay = Relay::from_config(&config).unwrap();
    let qq = Qq::from_config(&config).with_target(QqTarget::Group(1001));
    let d = relay.send(&qq, &Notice::text("hello group")).await.unwrap();
    assert_eq!(d.message_id.as_deref(), Some("5"));

    let sent = mock.requests();
    assert_eq!(sent[0]["message_type"], "group");
    assert_eq!(sent[0]["group_id"], 1001);
    assert_eq!(sent[0]["message"], "hello group");
}

#[tokio::test]
async fn unconfigured_platform_never_hits_network() {
    let (_dir, config) = test_config();
    let relay = Relay::from_config(&config).unwrap();
    let err = relay
        .send(&Discord::from_config(&config), &Notice::new(MessageKind::Query, "q", "?"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::NotConfigured("discord")));

    let log = relay.log().read("discord", today()).unwrap();
    assert_eq!(log.len(), 1);
    assert!(!log[0].success);
}

#[tokio::test]
async fn connection_refused_is_http_error() {
    let (_dir, mut config) = test_config();
    // bind then drop to get a port nobody listens on
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    config.discord.webhook_url = Some(format!("http://127.0.0.1:{port}/webhook"));

    let relay = Relay::from_config(&config).unwrap();
    let err = relay
        .send(&Discord::from_config(&config), &Notice::text("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Http(_)));
}
