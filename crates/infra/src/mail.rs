//! # メール送信 API
//!
//! 送信リクエストを外部のメール送信 API に渡し、応答を [`DispatchResponse`] として返す。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `MailSender` trait でプロバイダ呼び出しを抽象化
//! - **2 つの実装**: SendGrid（本番用）、Noop（ドライラン用）
//! - **環境変数切替**: `MAIL_BACKEND` でランタイム選択

mod noop;
mod sendgrid;

use async_trait::async_trait;
use mailflow_domain::{DispatchResponse, MailError, SendRequest};
pub use noop::NoopMailSender;
pub use sendgrid::{
    DEFAULT_BASE_URL as SENDGRID_DEFAULT_BASE_URL,
    SendGridMailSender,
    to_api_payload,
};
use strum::{Display, EnumString};

/// メール送信トレイト
#[async_trait]
pub trait MailSender: Send + Sync {
    /// 送信リクエストをそのまま API に渡す
    async fn send(&self, request: &SendRequest) -> Result<DispatchResponse, MailError>;
}

/// 送信バックエンドの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MailBackend {
    /// SendGrid v3 Mail Send API
    #[default]
    SendGrid,
    /// 送信しない（ログ出力のみ）
    Noop,
}
