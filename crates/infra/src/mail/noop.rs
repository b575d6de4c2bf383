//! Noop 送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! ドライランやローカル実行時に使用する。

use async_trait::async_trait;
use mailflow_domain::{DispatchResponse, MailError, RecipientResult, SendRequest, dispatch::ACCEPTED};

use super::MailSender;

/// Noop 送信（ログ出力のみ）
///
/// 受理（202）の結果を 1 件返す。メッセージ ID はプロバイダが払い出すものなので付与しない。
#[derive(Debug, Clone)]
pub struct NoopMailSender;

#[async_trait]
impl MailSender for NoopMailSender {
    async fn send(&self, request: &SendRequest) -> Result<DispatchResponse, MailError> {
        tracing::info!(
            request_id = ?request.request_id(),
            "Noop: メール送信をスキップ"
        );
        Ok(DispatchResponse::PerRecipientResults(vec![RecipientResult::new(ACCEPTED)]))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn sendは受理を返すがメッセージidは付与しない() {
        let request = SendRequest::from_value(json!({"customArgs": {"requestId": "r1"}})).unwrap();

        let response = NoopMailSender.send(&request).await.unwrap();

        assert_eq!(response.status_code(), "202");
        assert_eq!(response.accepted_message_id(), None);
    }
}
