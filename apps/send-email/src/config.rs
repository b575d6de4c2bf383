//! # send-email 関数の設定
//!
//! 環境変数から設定を読み込む。プロセス起動時に 1 回だけ読み込み、以降は読み取り専用。
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `SNS_TOPIC_ARN`（旧名 `SNStopic`） | **Yes** | 通知エンベロープの発行先トピック |
//! | `REGION`（未設定時 `AWS_REGION`） | No | S3 / SNS クライアントのリージョン |
//! | `MAIL_BACKEND` | No | `sendgrid`（デフォルト）または `noop` |
//! | `SENDGRID_API_KEY` | No | 未設定の場合は呼び出しごとに失敗として記録・通知する |
//! | `SENDGRID_API_BASE_URL` | No | デフォルト: `https://api.sendgrid.com` |
//! | `S3_ENDPOINT_URL` | No | MinIO / LocalStack 使用時のエンドポイント |

use std::{env, fmt, str::FromStr};

use mailflow_infra::mail::{MailBackend, SENDGRID_DEFAULT_BASE_URL};
use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必須の環境変数が未設定
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    /// 値が不正
    #[error("{name} の値が不正です: {value}")]
    Invalid { name: &'static str, value: String },
}

/// send-email 関数の設定
#[derive(Debug, Clone)]
pub struct SendEmailConfig {
    /// 通知エンベロープの発行先 SNS トピック ARN
    pub topic_arn:       String,
    /// S3 / SNS クライアントをバインドするリージョン
    pub region:          Option<String>,
    /// S3 エンドポイント URL（MinIO 使用時に設定、未設定で AWS S3 デフォルト）
    pub s3_endpoint_url: Option<String>,
    /// メール送信設定
    pub mail:            MailConfig,
}

/// メール送信の設定
#[derive(Clone)]
pub struct MailConfig {
    /// 送信バックエンド
    pub backend:           MailBackend,
    /// SendGrid API キー
    pub sendgrid_api_key:  Option<String>,
    /// SendGrid API のベース URL
    pub sendgrid_base_url: String,
}

// API キーをログに出さない
impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("backend", &self.backend)
            .field(
                "sendgrid_api_key",
                &self.sendgrid_api_key.as_ref().map(|_| "***"),
            )
            .field("sendgrid_base_url", &self.sendgrid_base_url)
            .finish()
    }
}

impl SendEmailConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の参照関数から設定を読み込む
    ///
    /// 空文字列は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let topic_arn = get("SNS_TOPIC_ARN")
            .or_else(|| get("SNStopic"))
            .ok_or(ConfigError::Missing("SNS_TOPIC_ARN"))?;

        let backend = match get("MAIL_BACKEND") {
            Some(value) => MailBackend::from_str(&value).map_err(|_| ConfigError::Invalid {
                name: "MAIL_BACKEND",
                value,
            })?,
            None => MailBackend::default(),
        };

        Ok(Self {
            topic_arn,
            region: get("REGION").or_else(|| get("AWS_REGION")),
            s3_endpoint_url: get("S3_ENDPOINT_URL"),
            mail: MailConfig {
                backend,
                sendgrid_api_key: get("SENDGRID_API_KEY"),
                sendgrid_base_url: get("SENDGRID_API_BASE_URL")
                    .unwrap_or_else(|| SENDGRID_DEFAULT_BASE_URL.to_string()),
            },
        })
    }
}
