//! # ビジネスイベントログとエラーコンテキストの構造化ヘルパー
//!
//! CloudWatch Logs Insights や `jq` で送信結果を追跡できるよう、ログフィールドの
//! 命名規約とヘルパーマクロを提供する。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] マクロで出力する。`event.kind = "business_event"` マーカーが
//! 自動付与され、`jq 'select(.["event.kind"] == "business_event")'` でフィルタできる。
//!
//! ## エラーコンテキスト
//!
//! `tracing::error!` / `tracing::warn!` に `error.category` + `error.kind` フィールドを
//! 直接追加する。定数は [`error`] モジュールで提供。
//!
//! ## フィールド命名規約
//!
//! ドット記法（`event.category`、`error.kind`）を使用。tracing の
//! `$($field:ident).+` パターンでサポートされ、JSON 出力でフラットなキーになる。

/// ビジネスイベントを構造化ログとして出力する。
///
/// `event.kind = "business_event"` マーカーを自動付与し、
/// `tracing::info!` レベルで出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: イベントカテゴリ（[`event::category`] の定数を使用）
/// - `event.action`: アクション名（[`event::action`] の定数を使用）
/// - `event.result`: 結果（[`event::result`] の定数を使用）
///
/// ## 推奨フィールド
///
/// - `event.object_key`: 起点となった S3 オブジェクトキー
/// - `email.request_id`: 送信リクエストの相関 ID（`customArgs.requestId`）
/// - `email.x_message_id`: プロバイダが払い出したメッセージ ID
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const EMAIL: &str = "email";
        pub const NOTIFICATION: &str = "notification";
    }

    /// イベントアクション
    pub mod action {
        // メール送信
        pub const EMAIL_DISPATCHED: &str = "email.dispatched";
        pub const EMAIL_DISPATCH_FAILED: &str = "email.dispatch_failed";
        pub const EMAIL_REQUEST_UNREADABLE: &str = "email.request_unreadable";

        // 通知
        pub const NOTIFICATION_RECEIVED: &str = "notification.received";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// インフラストラクチャ（S3、SNS）
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// 外部サービス呼び出し（メール送信 API）
        pub const EXTERNAL_SERVICE: &str = "external_service";
        /// 入力データ（トリガーイベント、送信リクエスト、通知本文）
        pub const INPUT: &str = "input";
    }

    /// エラー種別
    pub mod kind {
        pub const OBJECT_FETCH: &str = "object_fetch";
        pub const OBJECT_WRITE: &str = "object_write";
        pub const PUBLISH: &str = "publish";
        pub const MAIL_SEND: &str = "mail_send";
        pub const INVALID_REQUEST: &str = "invalid_request";
        pub const INVALID_ENVELOPE: &str = "invalid_envelope";
    }
}
