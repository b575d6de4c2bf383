//! # notification-consumer 関数ライブラリ
//!
//! send-email が SNS に発行した通知エンベロープを受け取り、ログに記録する。
//! 永続化やアラートを追加する場合は [`handler`] を拡張する。

pub mod handler;

/// ログの `service` フィールドに出力する関数名
pub const SERVICE_NAME: &str = "notification-consumer";
