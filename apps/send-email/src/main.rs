//! # send-email Lambda 関数
//!
//! S3 の `requests/*.json` 作成イベントで起動し、送信リクエストをメール送信 API に渡す。
//! 応答は同じバケットの `responses/` 配下に保存し、結果を SNS に通知する。
//!
//! ```text
//! S3 (requests/*.json) ──→ send-email ──→ SendGrid
//!                               │
//!                               ├──→ S3 (responses/<code>/…)
//!                               └──→ SNS ──→ notification-consumer
//! ```
//!
//! 環境変数は [`config`](mailflow_send_email::config) を参照。
//!
//! ## ローカル実行
//!
//! ```bash
//! # MinIO + ドライラン
//! MAIL_BACKEND=noop S3_ENDPOINT_URL=http://localhost:9000 LOG_FORMAT=pretty \
//!   cargo lambda watch -p mailflow-send-email
//! ```

use std::sync::Arc;

use anyhow::Context as _;
use lambda_runtime::{Error, LambdaEvent, service_fn};
use mailflow_domain::clock::SystemClock;
use mailflow_infra::{
    MailBackend,
    MailSender,
    NoopMailSender,
    SendGridMailSender,
    SnsNotificationPublisher,
    aws,
    s3::{self, AwsObjectStore},
};
use mailflow_send_email::{
    SERVICE_NAME,
    config::{MailConfig, SendEmailConfig},
    handler,
    usecase::DispatchUseCase,
};
use mailflow_shared::observability::{TracingConfig, init_tracing};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(&TracingConfig::for_lambda(SERVICE_NAME));

    let config = SendEmailConfig::from_env().context("設定の読み込みに失敗しました")?;
    tracing::info!(config = ?config, "send-email を起動します");

    // クライアントは起動時に 1 回だけ作成し、呼び出しをまたいで使い回す
    let sdk_config = aws::load_config(
        config.region.as_deref(),
        config.s3_endpoint_url.as_deref(),
    )
    .await;
    let store = AwsObjectStore::new(s3::create_client(
        &sdk_config,
        config.s3_endpoint_url.is_some(),
    ));
    let publisher = SnsNotificationPublisher::from_config(&sdk_config);

    let usecase = Arc::new(DispatchUseCase::new(
        Arc::new(store),
        Arc::new(publisher),
        build_mail_sender(&config.mail),
        Arc::new(SystemClock),
        config.topic_arn,
    ));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let usecase = Arc::clone(&usecase);
        async move {
            handler::handle_event(&usecase, event)
                .await
                .map_err(Error::from)
        }
    }))
    .await
}

fn build_mail_sender(config: &MailConfig) -> Arc<dyn MailSender> {
    match config.backend {
        MailBackend::SendGrid => {
            if config.sendgrid_api_key.is_none() {
                tracing::warn!("SENDGRID_API_KEY が未設定です。送信はすべて失敗として記録されます");
            }
            Arc::new(SendGridMailSender::new(
                config.sendgrid_api_key.clone(),
                config.sendgrid_base_url.clone(),
            ))
        }
        MailBackend::Noop => {
            tracing::info!("Noop バックエンドで起動します（メールは送信されません）");
            Arc::new(NoopMailSender)
        }
    }
}
