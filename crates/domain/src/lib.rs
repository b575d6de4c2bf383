//! # Mailflow ドメイン層
//!
//! S3 に置かれた送信リクエストをメール送信 API に転送し、その結果を記録・通知する
//! パイプラインのドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **値オブジェクト**: オブジェクト参照とキー規約（[`object_ref`]）
//! - **タグ付き共用体**: プロバイダ応答の配列/オブジェクトの曖昧さを境界で解決する（[`dispatch`]）
//! - **外部依存なし**: S3・SNS・HTTP の詳細はインフラ層に閉じ込める
//!
//! ## 依存関係の方向
//!
//! ```text
//! apps → infra → domain
//!    ↘     ↓
//!       shared
//! ```
//!
//! ## モジュール構成
//!
//! - [`clock`] - API 呼び出しタイムスタンプの時刻プロバイダ
//! - [`dispatch`] - プロバイダ応答とメール送信エラー
//! - [`envelope`] - 下流に配信する通知エンベロープ
//! - [`object_ref`] - バケット/キーの組とキー命名規約
//! - [`send_request`] - 送信リクエスト

pub mod clock;
pub mod dispatch;
pub mod envelope;
pub mod object_ref;
pub mod send_request;

pub use dispatch::{DispatchResponse, MailError, RecipientResult};
pub use envelope::NotificationEnvelope;
pub use object_ref::ObjectRef;
pub use send_request::{SendRequest, SendRequestError};
