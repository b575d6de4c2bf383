//! # send-email 関数ライブラリ
//!
//! S3 の `requests/*.json` 作成イベントを受けてメールを送信する Lambda 関数の本体。
//! バイナリ（`main.rs`）はクライアントの組み立てとランタイム起動のみを行い、
//! 処理はこのライブラリのハンドラとユースケースに置く。

pub mod config;
pub mod handler;
pub mod usecase;

/// ログの `service` フィールドに出力する関数名
pub const SERVICE_NAME: &str = "send-email";
