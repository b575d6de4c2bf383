//! # ユースケース層
//!
//! send-email 関数のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: S3・SNS・メール送信 API・時刻を `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラはイベントの解釈のみを行い、ロジックはユースケースに集約
//!
//! ## モジュール構成
//!
//! - `dispatch`: 送信リクエストの取得 → 送信 → 応答の保存 → 通知

pub mod dispatch;

pub use dispatch::{DispatchError, DispatchOutcome, DispatchUseCase};
