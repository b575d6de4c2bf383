//! # メール送信 API の応答
//!
//! プロバイダの応答は「宛先ごとの結果の配列」か「単一のエラードキュメント」の
//! どちらか。フィールドの有無を都度調べるのではなく、境界で
//! [`DispatchResponse`] のバリアントに振り分けてから分類する。
//!
//! ## 分類ルール
//!
//! - ステータスコード: 先頭の結果の `statusCode` → エラードキュメントの `code` → `"none"`
//! - メッセージ ID: 先頭の結果が 202 かつ `x-message-id` ヘッダを持つ場合のみ

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};
use strum::IntoStaticStr;
use thiserror::Error;

/// 受理を表すステータスコード
pub const ACCEPTED: u16 = 202;
/// プロバイダのメッセージ ID ヘッダ（小文字で保持する）
pub const X_MESSAGE_ID: &str = "x-message-id";
/// ステータスコードが得られない場合の値
pub const STATUS_NONE: &str = "none";

/// 宛先ごとの送信結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientResult {
    pub status_code: u16,
    /// ヘッダ名は小文字に正規化済み
    #[serde(default)]
    pub headers:     BTreeMap<String, String>,
    #[serde(default)]
    pub body:        Value,
}

impl RecipientResult {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            headers: BTreeMap::new(),
            body: Value::String(String::new()),
        }
    }

    /// ヘッダを追加する（名前は小文字に正規化する）
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// メール送信 API の応答
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchResponse {
    /// 宛先ごとの結果（通常は 1 要素）
    PerRecipientResults(Vec<RecipientResult>),
    /// 例外ではなくドキュメントとして返されたエラー
    SingleError {
        /// `code` フィールド（数値・文字列のどちらも文字列化して保持）
        code: Option<String>,
        /// 応答ドキュメント全体
        body: Value,
    },
}

impl DispatchResponse {
    /// プロバイダが返した生の JSON を振り分ける
    ///
    /// 配列で、かつ全要素が結果として読める場合のみ [`PerRecipientResults`] とする。
    /// それ以外はすべて [`SingleError`] として保持する（保存内容は失わない）。
    ///
    /// [`PerRecipientResults`]: DispatchResponse::PerRecipientResults
    /// [`SingleError`]: DispatchResponse::SingleError
    pub fn from_value(value: Value) -> Self {
        let results = value
            .is_array()
            .then(|| serde_json::from_value::<Vec<RecipientResult>>(value.clone()));
        if let Some(Ok(results)) = results {
            return Self::PerRecipientResults(results);
        }
        let code = match value.get("code") {
            Some(Value::String(code)) => Some(code.clone()),
            Some(Value::Number(code)) => Some(code.to_string()),
            _ => None,
        };
        Self::SingleError { code, body: value }
    }

    fn first_result(&self) -> Option<&RecipientResult> {
        match self {
            Self::PerRecipientResults(results) => results.first(),
            Self::SingleError { .. } => None,
        }
    }

    /// 保存キーに使うステータスコード
    pub fn status_code(&self) -> String {
        match self {
            Self::PerRecipientResults(results) => results
                .first()
                .map(|result| result.status_code.to_string())
                .unwrap_or_else(|| STATUS_NONE.to_string()),
            Self::SingleError { code, .. } => {
                code.clone().unwrap_or_else(|| STATUS_NONE.to_string())
            }
        }
    }

    /// 受理された場合のプロバイダメッセージ ID
    ///
    /// 後続の Webhook イベントを元のリクエストに結び付けるための値。
    /// 受理（202）以外、またはヘッダがない場合は `None`。
    pub fn accepted_message_id(&self) -> Option<&str> {
        self.first_result()
            .filter(|result| result.status_code == ACCEPTED)
            .and_then(|result| result.header(X_MESSAGE_ID))
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::PerRecipientResults(results) => json!(results),
            Self::SingleError { body, .. } => body.clone(),
        }
    }
}

impl Serialize for DispatchResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::PerRecipientResults(results) => results.serialize(serializer),
            Self::SingleError { body, .. } => body.serialize(serializer),
        }
    }
}

/// メール送信 API 呼び出しのエラー
#[derive(Debug, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum MailError {
    /// 認証情報が設定されていない
    #[error("メール送信 API の認証情報が設定されていません")]
    MissingCredential,

    /// 通信エラー（接続失敗、タイムアウトなど）
    #[error("メール送信 API への接続に失敗: {0}")]
    Transport(String),

    /// API がリクエストを拒否した（非 2xx）
    #[error("メール送信 API がリクエストを拒否しました: status={code}")]
    Rejected {
        code: u16,
        body: Value,
    },

    /// 応答を解釈できない
    #[error("メール送信 API の応答を解釈できません: {0}")]
    InvalidResponse(String),
}

impl MailError {
    /// HTTP ステータスコード（API が応答した場合のみ）
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// 失敗時に保存・通知するエラーレポート
    pub fn to_report(&self) -> Value {
        let kind: &'static str = self.into();
        let mut report = json!({
            "name": "MailError",
            "kind": kind,
            "message": self.to_string(),
        });
        if let Self::Rejected { code, body } = self {
            report["code"] = json!(code);
            report["response"] = json!({ "body": body });
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn accepted(id: Option<&str>) -> DispatchResponse {
        let mut result = RecipientResult::new(202);
        if let Some(id) = id {
            result = result.with_header("X-Message-Id", id);
        }
        DispatchResponse::PerRecipientResults(vec![result])
    }

    #[test]
    fn test_配列は宛先ごとの結果として読む() {
        let response = DispatchResponse::from_value(json!([
            {"statusCode": 202, "headers": {"x-message-id": "abc123"}}
        ]));

        assert_eq!(response.status_code(), "202");
        assert_eq!(response.accepted_message_id(), Some("abc123"));
    }

    #[rstest]
    #[case(json!({"code": 401, "message": "unauthorized"}), "401")]
    #[case(json!({"code": "ECONNRESET"}), "ECONNRESET")]
    #[case(json!({"message": "no code"}), "none")]
    #[case(json!([{"unexpected": true}]), "none")]
    #[case(json!([]), "none")]
    fn test_ステータスコードのフォールバック(#[case] raw: Value, #[case] expected: &str) {
        assert_eq!(DispatchResponse::from_value(raw).status_code(), expected);
    }

    #[test]
    fn test_空配列は結果なしとして扱う() {
        let response = DispatchResponse::from_value(json!([]));
        assert_eq!(response, DispatchResponse::PerRecipientResults(vec![]));
        assert_eq!(response.accepted_message_id(), None);
    }

    #[test]
    fn test_202以外ではメッセージidを採用しない() {
        let response = DispatchResponse::PerRecipientResults(vec![
            RecipientResult::new(200).with_header("x-message-id", "abc123"),
        ]);

        assert_eq!(response.status_code(), "200");
        assert_eq!(response.accepted_message_id(), None);
    }

    #[test]
    fn test_202でもヘッダがなければnone() {
        assert_eq!(accepted(None).accepted_message_id(), None);
        assert_eq!(accepted(Some("m-1")).accepted_message_id(), Some("m-1"));
    }

    #[test]
    fn test_シリアライズは元の形を保つ() {
        let raw = json!({"code": 500, "errors": [{"message": "boom"}]});
        let single = DispatchResponse::from_value(raw.clone());
        assert_eq!(serde_json::to_value(&single).unwrap(), raw);

        let per_recipient = serde_json::to_value(accepted(Some("abc123"))).unwrap();
        assert_eq!(
            per_recipient,
            json!([{"statusCode": 202, "headers": {"x-message-id": "abc123"}, "body": ""}])
        );
    }

    #[test]
    fn test_rejectedのレポートはコードと本文を含む() {
        let error = MailError::Rejected {
            code: 400,
            body: json!({"errors": [{"message": "invalid from"}]}),
        };

        let report = error.to_report();

        assert_eq!(report["kind"], "rejected");
        assert_eq!(report["code"], 400);
        assert_eq!(report["response"]["body"]["errors"][0]["message"], "invalid from");
        assert_eq!(error.code(), Some(400));
    }

    #[test]
    fn test_認証情報なしのレポートにはコードがない() {
        let report = MailError::MissingCredential.to_report();

        assert_eq!(report["kind"], "missing_credential");
        assert!(report.get("code").is_none());
    }
}
