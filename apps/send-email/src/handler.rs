//! # Lambda ハンドラ
//!
//! S3 の ObjectCreated イベントからオブジェクト参照を取り出し、ユースケースに渡す。
//!
//! S3 イベントのキーは URL エンコードされている（空白は `+`）ため、
//! ここでデコードしてから扱う。1 イベントにつき先頭のレコードのみ処理する。

use lambda_runtime::LambdaEvent;
use mailflow_domain::ObjectRef;
use mailflow_shared::{event_log::error, observability::invocation_span};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::Instrument;

use crate::{
    SERVICE_NAME,
    usecase::{DispatchError, DispatchOutcome, DispatchUseCase},
};

/// トリガーイベントの解釈エラー
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("イベントにレコードがありません")]
    NoRecords,

    #[error("S3 イベントの形式が不正です: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("オブジェクトキーをデコードできません: {0}")]
    InvalidKey(String),
}

/// ハンドラのエラー（呼び出し失敗としてランタイムに返す）
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Trigger(#[from] TriggerError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Debug, Deserialize)]
struct S3Event {
    #[serde(rename = "Records", default)]
    records: Vec<S3EventRecord>,
}

#[derive(Debug, Deserialize)]
struct S3EventRecord {
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3Bucket,
    object: S3Object,
}

#[derive(Debug, Deserialize)]
struct S3Bucket {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3Object {
    key: String,
}

/// S3 イベントから処理対象のオブジェクト参照を取り出す
pub fn decode_trigger(event: &Value) -> Result<ObjectRef, TriggerError> {
    let event = S3Event::deserialize(event).map_err(TriggerError::Malformed)?;
    let record_count = event.records.len();
    let Some(record) = event.records.into_iter().next() else {
        return Err(TriggerError::NoRecords);
    };
    if record_count > 1 {
        tracing::warn!(
            record_count,
            "複数レコードのイベントを受信しました。先頭のみ処理します"
        );
    }

    let raw_key = record.s3.object.key.replace('+', " ");
    let key = urlencoding::decode(&raw_key)
        .map_err(|_| TriggerError::InvalidKey(record.s3.object.key.clone()))?
        .into_owned();

    Ok(ObjectRef::new(record.s3.bucket.name, key))
}

/// 1 回の Lambda 呼び出しを処理する
pub async fn handle_event(
    usecase: &DispatchUseCase,
    event: LambdaEvent<Value>,
) -> Result<DispatchOutcome, HandlerError> {
    let (payload, context) = event.into_parts();
    let span = invocation_span(SERVICE_NAME, &context.request_id);

    async {
        let request_object = decode_trigger(&payload).inspect_err(|e| {
            tracing::error!(
                error.category = error::category::INPUT,
                error.kind = error::kind::INVALID_REQUEST,
                error = %e,
                "トリガーイベントを解釈できません"
            );
        })?;
        tracing::info!(object = %request_object, "送信リクエストを処理します");

        let outcome = usecase.dispatch(&request_object, &payload).await?;
        tracing::info!(outcome = ?outcome, "処理が完了しました");
        Ok(outcome)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lambda_runtime::Context;
    use mailflow_domain::{DispatchResponse, RecipientResult, clock::FixedClock};
    use mailflow_infra::mock::{MockMailSender, MockNotificationPublisher, MockObjectStore};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn s3_event(bucket: &str, key: &str) -> Value {
        json!({
            "Records": [{
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": {"name": bucket, "arn": format!("arn:aws:s3:::{bucket}")},
                    "object": {"key": key, "size": 128}
                }
            }]
        })
    }

    #[rstest]
    #[case("requests/r1.json", "requests/r1.json")]
    #[case("requests/my+request.json", "requests/my request.json")]
    #[case("requests/%E6%97%A5%E6%9C%AC.json", "requests/日本.json")]
    #[case("requests/a%2Bb.json", "requests/a+b.json")]
    fn test_キーをurlデコードする(#[case] raw: &str, #[case] expected: &str) {
        let object = decode_trigger(&s3_event("mail-bucket", raw)).unwrap();

        assert_eq!(object, ObjectRef::new("mail-bucket", expected));
    }

    #[test]
    fn test_レコードがなければエラー() {
        let result = decode_trigger(&json!({"Records": []}));
        assert!(matches!(result, Err(TriggerError::NoRecords)));

        let result = decode_trigger(&json!({}));
        assert!(matches!(result, Err(TriggerError::NoRecords)));
    }

    #[test]
    fn test_s3イベントでなければエラー() {
        let result = decode_trigger(&json!({"Records": [{"Sns": {}}]}));

        assert!(matches!(result, Err(TriggerError::Malformed(_))));
    }

    #[test]
    fn test_不正なエンコードはエラー() {
        let result = decode_trigger(&s3_event("b", "requests/%FF.json"));

        assert!(matches!(result, Err(TriggerError::InvalidKey(_))));
    }

    #[test]
    fn test_複数レコードは先頭を使う() {
        let event = json!({
            "Records": [
                {"s3": {"bucket": {"name": "b"}, "object": {"key": "requests/first.json"}}},
                {"s3": {"bucket": {"name": "b"}, "object": {"key": "requests/second.json"}}}
            ]
        });

        let object = decode_trigger(&event).unwrap();

        assert_eq!(object.key, "requests/first.json");
    }

    #[tokio::test]
    async fn test_イベントからユースケースまで通して処理する() {
        let store = MockObjectStore::new();
        let publisher = MockNotificationPublisher::new();
        let sender = MockMailSender::new();
        store.insert_json(
            ObjectRef::new("mail-bucket", "requests/r1.json"),
            json!({"customArgs": {"requestId": "r1"}}),
        );
        sender.respond_with(DispatchResponse::PerRecipientResults(vec![
            RecipientResult::new(202).with_header("X-Message-Id", "abc123"),
        ]));
        let usecase = DispatchUseCase::new(
            Arc::new(store.clone()),
            Arc::new(publisher.clone()),
            Arc::new(sender),
            Arc::new(FixedClock::at_unix(1_700_000_000)),
            "arn:topic",
        );
        let event = LambdaEvent::new(s3_event("mail-bucket", "requests/r1.json"), Context::default());

        let outcome = handle_event(&usecase, event).await.unwrap();

        assert!(matches!(outcome, DispatchOutcome::Dispatched { .. }));
        assert!(
            store
                .get_json(&ObjectRef::new("mail-bucket", "responses/202/r1__abc123.json"))
                .is_some()
        );
        assert_eq!(publisher.published().len(), 1);
    }

    #[tokio::test]
    async fn test_レコードのないイベントは呼び出し失敗() {
        let usecase = DispatchUseCase::new(
            Arc::new(MockObjectStore::new()),
            Arc::new(MockNotificationPublisher::new()),
            Arc::new(MockMailSender::new()),
            Arc::new(FixedClock::at_unix(0)),
            "arn:topic",
        );
        let event = LambdaEvent::new(json!({"Records": []}), Context::default());

        let result = handle_event(&usecase, event).await;

        assert!(matches!(
            result,
            Err(HandlerError::Trigger(TriggerError::NoRecords))
        ));
    }
}
