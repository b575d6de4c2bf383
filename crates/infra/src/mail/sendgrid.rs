//! SendGrid 送信実装
//!
//! SendGrid v3 Mail Send API（`POST /v3/mail/send`）を呼び出す。
//! → API リファレンス: <https://docs.sendgrid.com/api-reference/mail-send/mail-send>
//!
//! 送信リクエストはヘルパーライブラリと同じ camelCase で書かれる前提のため、
//! すべての階層のキーを API の snake_case 名に変換してから送る。
//! `customArgs` や `dynamicTemplateData` などの中身は利用者データなので書き換えない。

use std::collections::BTreeMap;

use async_trait::async_trait;
use mailflow_domain::{DispatchResponse, MailError, RecipientResult, SendRequest};
use serde_json::{Map, Value};

use super::MailSender;

/// SendGrid API のデフォルトのベース URL
pub const DEFAULT_BASE_URL: &str = "https://api.sendgrid.com";

const MAIL_SEND_PATH: &str = "/v3/mail/send";
const API_KEY_PREFIX: &str = "SG.";

/// 中身を利用者データとして扱い、キーを変換しないフィールド（snake_case 名）
const OPAQUE_FIELDS: &[&str] = &[
    "custom_args",
    "dynamic_template_data",
    "headers",
    "substitutions",
    "sections",
];

/// SendGrid 送信
///
/// 認証情報はプロセス起動時に環境変数から読み込んだ単一の API キーを使う。
/// 複数キーの使い分けは行わない。
pub struct SendGridMailSender {
    http:     reqwest::Client,
    base_url: String,
    api_key:  Option<String>,
}

impl SendGridMailSender {
    /// 新しい SendGrid 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `api_key`: API キー。未設定の場合は送信のたびに [`MailError::MissingCredential`] を返す
    /// - `base_url`: API のベース URL（テスト時はモックサーバーを指定）
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        if api_key
            .as_deref()
            .is_some_and(|key| !key.starts_with(API_KEY_PREFIX))
        {
            tracing::warn!("SendGrid の API キーが \"SG.\" で始まっていません");
        }
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl MailSender for SendGridMailSender {
    #[tracing::instrument(skip_all)]
    async fn send(&self, request: &SendRequest) -> Result<DispatchResponse, MailError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(MailError::MissingCredential)?;

        let response = self
            .http
            .post(format!("{}{MAIL_SEND_PATH}", self.base_url))
            .bearer_auth(api_key)
            .json(&to_api_payload(request))
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        let headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect();
        let text = response
            .text()
            .await
            .map_err(|e| MailError::InvalidResponse(e.to_string()))?;
        let body = parse_body(&text);

        if !status.is_success() {
            return Err(MailError::Rejected {
                code: status.as_u16(),
                body,
            });
        }

        tracing::debug!(status = status.as_u16(), "SendGrid が応答しました");
        Ok(DispatchResponse::PerRecipientResults(vec![RecipientResult {
            status_code: status.as_u16(),
            headers,
            body,
        }]))
    }
}

/// 空の本文は空文字列、JSON として読めなければテキストのまま保持する
fn parse_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::String(String::new());
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// 送信リクエストを API のペイロード形式に変換する
///
/// すべての階層の camelCase キーを snake_case にする。
/// `OPAQUE_FIELDS` の値の中身はそのまま送る。
pub fn to_api_payload(request: &SendRequest) -> Value {
    Value::Object(convert_map(request.as_map()))
}

fn convert_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let key = to_snake_case(key);
            let value = if OPAQUE_FIELDS.contains(&key.as_str()) {
                value.clone()
            } else {
                convert_value(value)
            };
            (key, value)
        })
        .collect()
}

fn convert_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(convert_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(convert_value).collect()),
        other => other.clone(),
    }
}

fn to_snake_case(key: &str) -> String {
    let mut snake = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            snake.push('_');
            snake.push(c.to_ascii_lowercase());
        } else {
            snake.push(c);
        }
    }
    snake
}
