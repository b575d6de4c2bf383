//! # SNS 通知発行
//!
//! 通知エンベロープを SNS トピックへ発行し、非同期のファンアウトに委ねる。
//! 発行後の確認は SDK がエラーを返さないことのみで、独自のリトライは重ねない。

use async_trait::async_trait;
use aws_sdk_sns::Client;
use serde_json::Value;

use crate::InfraError;

/// 通知発行のインターフェース
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// メッセージを JSON にシリアライズしてトピックへ発行する
    async fn publish(&self, topic_arn: &str, message: &Value) -> Result<(), InfraError>;
}

/// AWS SNS 通知発行
#[derive(Clone)]
pub struct SnsNotificationPublisher {
    client: Client,
}

impl SnsNotificationPublisher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(config))
    }
}

#[async_trait]
impl NotificationPublisher for SnsNotificationPublisher {
    #[tracing::instrument(skip_all, fields(topic_arn = %topic_arn))]
    async fn publish(&self, topic_arn: &str, message: &Value) -> Result<(), InfraError> {
        let body = serde_json::to_string(message)?;
        tracing::debug!(message = %body, "SNS にメッセージを発行します");

        let output = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .message(body)
            .send()
            .await
            .map_err(|e| InfraError::sns(format!("Publish の実行に失敗: {e}")))?;

        tracing::debug!(message_id = ?output.message_id(), "SNS への発行が完了しました");
        Ok(())
    }
}
