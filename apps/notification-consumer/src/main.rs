//! # notification-consumer Lambda 関数
//!
//! send-email が発行した通知を SNS サブスクリプション経由で受け取る。
//! 現状はログ出力のみで、状態を持たない。

use lambda_runtime::{Error, service_fn};
use mailflow_notification_consumer::{SERVICE_NAME, handler};
use mailflow_shared::observability::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();

    init_tracing(&TracingConfig::for_lambda(SERVICE_NAME));
    tracing::info!("notification-consumer を起動します");

    lambda_runtime::run(service_fn(handler::handle_event)).await
}
