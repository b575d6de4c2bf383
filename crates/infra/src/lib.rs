//! # Mailflow インフラ層
//!
//! 外部システム（S3、SNS、メール送信 API）との通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! 外部サービスごとに trait を定義し、AWS SDK / HTTP クライアントによる具体実装を提供する。
//! ユースケース層は trait のみに依存し、テストでは [`mock`] の実装に差し替える。
//! クライアントはプロセス起動時に 1 回だけ作成し、呼び出しをまたいで使い回す。
//!
//! ## 依存関係
//!
//! ```text
//! apps → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`aws`] - AWS SDK 共通設定の読み込み
//! - [`error`] - インフラ層エラー定義
//! - [`mail`] - メール送信 API（SendGrid / Noop）
//! - [`s3`] - JSON オブジェクトの取得・保存
//! - [`sns`] - 通知エンベロープの発行

pub mod aws;
pub mod error;
pub mod mail;
pub mod s3;
pub mod sns;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use error::{InfraError, InfraErrorKind};
pub use mail::{MailBackend, MailSender, NoopMailSender, SendGridMailSender};
pub use s3::{AwsObjectStore, ObjectStore};
pub use sns::{NotificationPublisher, SnsNotificationPublisher};
