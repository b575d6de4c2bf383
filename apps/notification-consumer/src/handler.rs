//! # Lambda ハンドラ
//!
//! SNS イベントの各レコードから通知エンベロープを取り出してログに記録する。
//!
//! 不正な本文は警告ログを出して読み飛ばし、呼び出しは失敗させない。
//! プラットフォームのリトライで同じ通知が再配信されても結果は変わらないため。

use lambda_runtime::LambdaEvent;
use mailflow_domain::NotificationEnvelope;
use mailflow_shared::{
    event_log::{error, event},
    log_business_event,
    observability::invocation_span,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::SERVICE_NAME;

/// 通知の受信エラー
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// SNS イベントの形式ではない
    #[error("SNS イベントの形式が不正です: {0}")]
    InvalidEvent(#[source] serde_json::Error),

    /// メッセージ本文が通知エンベロープではない
    #[error("通知エンベロープとして読めません: {source}")]
    InvalidEnvelope {
        message_id: Option<String>,
        raw:        String,
        #[source]
        source:     serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct SnsEvent {
    #[serde(rename = "Records", default)]
    records: Vec<SnsEventRecord>,
}

#[derive(Debug, Deserialize)]
struct SnsEventRecord {
    #[serde(rename = "Sns")]
    sns: SnsMessage,
}

#[derive(Debug, Deserialize)]
struct SnsMessage {
    #[serde(rename = "MessageId", default)]
    message_id: Option<String>,
    #[serde(rename = "Message")]
    message:    String,
}

/// 1 回の呼び出しで受け取った通知の集計
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConsumeSummary {
    pub received: usize,
    pub invalid:  usize,
}

/// SNS イベントから通知エンベロープを取り出す
///
/// レコードごとに結果を返す。イベント自体が SNS の形式でなければ
/// [`ReceiveError::InvalidEvent`] を 1 件だけ返す。
pub fn decode_notifications(event: &Value) -> Vec<Result<NotificationEnvelope, ReceiveError>> {
    let event = match SnsEvent::deserialize(event) {
        Ok(event) => event,
        Err(e) => return vec![Err(ReceiveError::InvalidEvent(e))],
    };

    event
        .records
        .into_iter()
        .map(|record| {
            let SnsMessage {
                message_id,
                message,
            } = record.sns;
            serde_json::from_str(&message).map_err(|source| ReceiveError::InvalidEnvelope {
                message_id,
                raw: message,
                source,
            })
        })
        .collect()
}

/// 通知エンベロープ 1 件を処理する
///
/// 現状はログ出力のみ。
pub fn on_notification(envelope: &NotificationEnvelope) {
    log_business_event!(
        event.category = event::category::NOTIFICATION,
        event.action = event::action::NOTIFICATION_RECEIVED,
        event.result = event::result::SUCCESS,
        notification.source = %envelope.source_lambda,
        email.request_id = ?envelope.request_id,
        email.x_message_id = ?envelope.x_message_id,
        "通知を受信しました"
    );
    tracing::debug!(message = %envelope.message, "通知本文");
}

/// イベント内のすべての通知を処理する
pub fn consume(event: &Value) -> ConsumeSummary {
    let mut summary = ConsumeSummary::default();
    for result in decode_notifications(event) {
        match result {
            Ok(envelope) => {
                on_notification(&envelope);
                summary.received += 1;
            }
            Err(e) => {
                let raw = match &e {
                    ReceiveError::InvalidEnvelope { raw, .. } => raw.as_str(),
                    ReceiveError::InvalidEvent(_) => "",
                };
                tracing::warn!(
                    error.category = error::category::INPUT,
                    error.kind = error::kind::INVALID_ENVELOPE,
                    error = %e,
                    raw,
                    "通知を読み飛ばします"
                );
                summary.invalid += 1;
            }
        }
    }
    summary
}

/// 1 回の Lambda 呼び出しを処理する
///
/// 通知の内容にかかわらず失敗を返さない。
pub async fn handle_event(event: LambdaEvent<Value>) -> Result<ConsumeSummary, lambda_runtime::Error> {
    let (payload, context) = event.into_parts();
    let _guard = invocation_span(SERVICE_NAME, &context.request_id).entered();

    let summary = consume(&payload);
    tracing::info!(
        received = summary.received,
        invalid = summary.invalid,
        "通知の処理が完了しました"
    );
    Ok(summary)
}
