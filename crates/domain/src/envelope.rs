//! # 通知エンベロープ
//!
//! 送信試行ごと（成功・失敗を問わず）に SNS へ配信する統一ラッパー。
//! 下流の購読者はこの形だけを前提に処理できる。
//!
//! ```json
//! {"sourceLambda": "SendEmailFunction", "requestId": "r1", "xMessageId": "abc123", "message": [...]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// send-email 関数が通知に付与する送信元名
pub const SEND_EMAIL_SOURCE: &str = "SendEmailFunction";

/// リクエスト JSON を読めなかったときの通知メッセージ
pub const PARSE_FAILED_MESSAGE: &str = "In send-email Lambda and JSON Parse Failed";

/// 通知エンベロープ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEnvelope {
    pub source_lambda: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id:    Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_message_id:  Option<String>,
    pub message:       Value,
}

impl NotificationEnvelope {
    /// 送信結果（プロバイダ応答またはエラーレポート）の通知
    pub fn dispatched(
        request_id: Option<&str>,
        x_message_id: Option<&str>,
        message: Value,
    ) -> Self {
        Self {
            source_lambda: SEND_EMAIL_SOURCE.to_string(),
            request_id: request_id.map(str::to_string),
            x_message_id: x_message_id.map(str::to_string),
            message,
        }
    }

    /// 送信失敗の通知（エラーレポートを `message` に載せる）
    pub fn failed(report: Value) -> Self {
        Self::dispatched(None, None, report)
    }

    /// リクエスト JSON を読めなかったことの通知（トリガーイベントをそのまま添える）
    pub fn parse_failed(event: &Value) -> Self {
        Self::failed(json!({
            "message": PARSE_FAILED_MESSAGE,
            "event": event,
        }))
    }

    pub fn to_value(&self) -> Value {
        json!(self)
    }
}
