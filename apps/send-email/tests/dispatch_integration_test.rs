//! send-email の結合テスト
//!
//! S3 / SNS はインメモリモック、メール送信 API は wiremock のモックサーバーに差し替え、
//! 実際の SendGrid クライアントを通して保存キーと通知内容を検証する。

use std::{net::TcpListener, sync::Arc};

use lambda_runtime::{Context, LambdaEvent};
use mailflow_domain::{ObjectRef, clock::FixedClock};
use mailflow_infra::{
    NoopMailSender,
    SendGridMailSender,
    mail::MailSender,
    mock::{MockNotificationPublisher, MockObjectStore},
};
use mailflow_send_email::{
    handler::handle_event,
    usecase::{DispatchOutcome, DispatchUseCase},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use wiremock::{
    Mock,
    MockServer,
    ResponseTemplate,
    matchers::{method, path},
};

const BUCKET: &str = "mail-bucket";
const TOPIC: &str = "arn:aws:sns:us-east-1:123456789012:email-events";
const NOW: i64 = 1_700_000_000;

struct Harness {
    usecase:   DispatchUseCase,
    store:     MockObjectStore,
    publisher: MockNotificationPublisher,
}

impl Harness {
    fn new(sender: Arc<dyn MailSender>) -> Self {
        let store = MockObjectStore::new();
        let publisher = MockNotificationPublisher::new();
        let usecase = DispatchUseCase::new(
            Arc::new(store.clone()),
            Arc::new(publisher.clone()),
            sender,
            Arc::new(FixedClock::at_unix(NOW)),
            TOPIC,
        );
        Self {
            usecase,
            store,
            publisher,
        }
    }

    fn with_sendgrid(server: &MockServer) -> Self {
        Self::new(Arc::new(SendGridMailSender::new(
            Some("SG.test-key".to_string()),
            server.uri(),
        )))
    }

    fn put_request(&self, key: &str, body: Value) {
        self.store.insert_json(ObjectRef::new(BUCKET, key), body);
    }

    async fn invoke(&self, key: &str) -> DispatchOutcome {
        let event = LambdaEvent::new(s3_event(key), Context::default());
        handle_event(&self.usecase, event)
            .await
            .expect("呼び出しが成功すること")
    }

    fn stored(&self, key: &str) -> Option<Value> {
        self.store.get_json(&ObjectRef::new(BUCKET, key))
    }
}

/// 待ち受けのないローカルポートの URL
fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("ポートを確保できること");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

fn s3_event(key: &str) -> Value {
    json!({
        "Records": [{
            "eventSource": "aws:s3",
            "eventName": "ObjectCreated:Put",
            "s3": {"bucket": {"name": BUCKET}, "object": {"key": key}}
        }]
    })
}

fn mail_request(request_id: &str) -> Value {
    json!({
        "personalizations": [{"to": [{"email": "user@example.com"}]}],
        "from": {"email": "noreply@example.com"},
        "subject": "ご注文ありがとうございます",
        "content": [{"type": "text/plain", "value": "本文"}],
        "customArgs": {"requestId": request_id}
    })
}

async fn mount_accepting(server: &MockServer, message_id: &str) {
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", message_id))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_受理された送信は応答を保存し相関情報つきで通知する() {
    let server = MockServer::start().await;
    mount_accepting(&server, "abc123").await;
    let h = Harness::with_sendgrid(&server);
    h.put_request("requests/r1.json", mail_request("r1"));

    let outcome = h.invoke("requests/r1.json").await;

    assert_eq!(
        outcome,
        DispatchOutcome::Dispatched {
            response_key: "responses/202/r1__abc123.json".to_string(),
            status_code:  "202".to_string(),
            x_message_id: Some("abc123".to_string()),
            stored:       true,
            published:    true,
        }
    );

    let stored = h
        .stored("responses/202/r1__abc123.json")
        .expect("応答が保存されていること");
    assert_eq!(stored[0]["statusCode"], 202);
    assert_eq!(stored[0]["headers"]["x-message-id"], "abc123");

    let published = h.publisher.published();
    assert_eq!(published.len(), 1);
    let (topic, envelope) = &published[0];
    assert_eq!(topic, TOPIC);
    assert_eq!(envelope["sourceLambda"], "SendEmailFunction");
    assert_eq!(envelope["requestId"], "r1");
    assert_eq!(envelope["xMessageId"], "abc123");
    assert_eq!(envelope["message"], stored);
}

#[tokio::test]
async fn test_送信ペイロードに呼び出し時刻が数値で入る() {
    let server = MockServer::start().await;
    mount_accepting(&server, "m-1").await;
    let h = Harness::with_sendgrid(&server);
    h.put_request("requests/r2.json", json!({"subject": "customArgs なし"}));

    h.invoke("requests/r2.json").await;

    let received = server.received_requests().await.expect("記録が有効であること");
    assert_eq!(received.len(), 1);
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body["custom_args"]["apiCallTimestamp"], json!(NOW));
}

#[tokio::test]
async fn test_同じリクエストの再処理は同じキーに上書きする() {
    let server = MockServer::start().await;
    mount_accepting(&server, "abc123").await;
    let h = Harness::with_sendgrid(&server);
    h.put_request("requests/r1.json", mail_request("r1"));

    let first = h.invoke("requests/r1.json").await;
    let second = h.invoke("requests/r1.json").await;

    assert_eq!(first, second);
    let keys: Vec<String> = h
        .store
        .writes()
        .into_iter()
        .map(|(object, _)| object.key)
        .collect();
    assert_eq!(
        keys,
        vec![
            "responses/202/r1__abc123.json".to_string(),
            "responses/202/r1__abc123.json".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_apiが拒否した送信はエラーとして保存し通知する() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{"message": "Does not contain a valid address.", "field": "personalizations.0.to.0.email"}]
        })))
        .mount(&server)
        .await;
    let h = Harness::with_sendgrid(&server);
    h.put_request("requests/r3.json", mail_request("r3"));

    let outcome = h.invoke("requests/r3.json").await;

    assert_eq!(
        outcome,
        DispatchOutcome::Failed {
            error_key: "responses/error/r3.json".to_string(),
            stored:    true,
        }
    );
    let report = h.stored("responses/error/r3.json").unwrap();
    assert_eq!(report["code"], 400);
    assert_eq!(
        report["response"]["body"]["errors"][0]["field"],
        "personalizations.0.to.0.email"
    );

    let published = h.publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].1["message"], report);
    assert!(published[0].1.get("xMessageId").is_none());
}

#[tokio::test]
async fn test_apiキー未設定は送信せずエラーとして記録する() {
    let server = MockServer::start().await;
    mount_accepting(&server, "never").await;
    let h = Harness::new(Arc::new(SendGridMailSender::new(None, server.uri())));
    h.put_request("requests/r4.json", mail_request("r4"));

    let outcome = h.invoke("requests/r4.json").await;

    assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
    assert_eq!(h.stored("responses/error/r4.json").unwrap()["kind"], "missing_credential");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_api到達不能でも呼び出しは成功しエラーを通知する() {
    let h = Harness::new(Arc::new(SendGridMailSender::new(
        Some("SG.test-key".to_string()),
        closed_port_url(),
    )));
    h.put_request("requests/r5.json", mail_request("r5"));

    let outcome = h.invoke("requests/r5.json").await;

    assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
    assert_eq!(h.stored("responses/error/r5.json").unwrap()["kind"], "transport");
    assert_eq!(h.publisher.published().len(), 1);
}

#[tokio::test]
async fn test_壊れたjsonはイベントを添えて通知する() {
    let h = Harness::new(Arc::new(NoopMailSender));
    h.store
        .insert_raw(ObjectRef::new(BUCKET, "requests/bad.json"), "{\"subject\": ");

    let outcome = h.invoke("requests/bad.json").await;

    assert_eq!(outcome, DispatchOutcome::RequestUnreadable);
    assert!(h.store.writes().is_empty());
    let published = h.publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(
        published[0].1["message"]["message"],
        "In send-email Lambda and JSON Parse Failed"
    );
    assert_eq!(published[0].1["message"]["event"], s3_event("requests/bad.json"));
}

#[tokio::test]
async fn test_noopバックエンドは受理扱いでメッセージidなしのキーに保存する() {
    let h = Harness::new(Arc::new(NoopMailSender));
    h.put_request("requests/dry-run.json", mail_request("d1"));

    let outcome = h.invoke("requests/dry-run.json").await;

    assert_eq!(
        outcome,
        DispatchOutcome::Dispatched {
            response_key: "responses/202/dry-run.json".to_string(),
            status_code:  "202".to_string(),
            x_message_id: None,
            stored:       true,
            published:    true,
        }
    );
    assert_eq!(h.publisher.published()[0].1["requestId"], "d1");
}

#[tokio::test]
async fn test_urlエンコードされたキーはデコードして読む() {
    let h = Harness::new(Arc::new(NoopMailSender));
    h.put_request("requests/weekly report.json", mail_request("w1"));

    let outcome = h.invoke("requests/weekly+report.json").await;

    let DispatchOutcome::Dispatched { response_key, .. } = outcome else {
        panic!("Dispatched を期待: {outcome:?}");
    };
    assert_eq!(response_key, "responses/202/weekly report.json");
}
