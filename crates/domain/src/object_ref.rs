//! # オブジェクト参照とキー規約
//!
//! S3 上の JSON ドキュメントを (bucket, key) の組で識別し、
//! リクエスト/レスポンスのキー命名規約を一箇所にまとめる。
//!
//! | 用途 | キー |
//! |------|------|
//! | 送信リクエスト（入力） | `requests/<name>.json` |
//! | プロバイダ応答 | `responses/<statusCode>/<name>.json` |
//! | 受理済み応答（メッセージ ID あり） | `responses/<statusCode>/<name>__<messageId>.json` |
//! | 送信失敗 | `responses/error/<name>.json` |

use derive_more::Display;
use serde::{Deserialize, Serialize};

const REQUEST_PREFIX: &str = "requests/";
const JSON_SUFFIX: &str = ".json";
const RESPONSE_PREFIX: &str = "responses";
const ERROR_SEGMENT: &str = "error";

/// S3 オブジェクトの参照
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[display("s3://{bucket}/{key}")]
pub struct ObjectRef {
    pub bucket: String,
    pub key:    String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key:    key.into(),
        }
    }

    /// 同じバケット内の別キーを指す参照を作る
    pub fn sibling(&self, key: impl Into<String>) -> Self {
        Self::new(self.bucket.clone(), key)
    }

    /// リクエストキーから論理ファイル名を取り出す
    ///
    /// `requests/` プレフィックスと `.json` サフィックスは存在する場合のみ取り除く。
    /// 規約外のキーも拒否せず、そのまま（不自然だが壊れていない）名前として扱う。
    pub fn file_name(&self) -> &str {
        let name = self.key.strip_prefix(REQUEST_PREFIX).unwrap_or(&self.key);
        name.strip_suffix(JSON_SUFFIX).unwrap_or(name)
    }
}

/// プロバイダ応答の保存先キーを組み立てる
///
/// `x_message_id` はプロバイダが払い出した値をそのまま使う。
pub fn response_key(status_code: &str, file_name: &str, x_message_id: Option<&str>) -> String {
    match x_message_id {
        Some(id) => format!("{RESPONSE_PREFIX}/{status_code}/{file_name}__{id}{JSON_SUFFIX}"),
        None => format!("{RESPONSE_PREFIX}/{status_code}/{file_name}{JSON_SUFFIX}"),
    }
}

/// 送信失敗時のエラー保存先キーを組み立てる
pub fn error_key(file_name: &str) -> String {
    format!("{RESPONSE_PREFIX}/{ERROR_SEGMENT}/{file_name}{JSON_SUFFIX}")
}
