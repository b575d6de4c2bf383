//! # 送信リクエスト
//!
//! 上流が S3 に置いた送信リクエスト（宛先・本文・カスタム引数）を表す。
//! 内容はプロバイダの API 形式のまま保持し、送信直前に `customArgs` へ
//! 呼び出し時刻を書き込む以外は手を加えない。

use serde::Serialize;
use serde_json::{Map, Value, json};
use strum::IntoStaticStr;
use thiserror::Error;

/// カスタム引数のキー
pub const CUSTOM_ARGS: &str = "customArgs";
/// API 呼び出し時刻（UNIX 秒）のキー
pub const API_CALL_TIMESTAMP: &str = "apiCallTimestamp";
/// 相関 ID のキー
pub const REQUEST_ID: &str = "requestId";

/// 送信リクエストのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SendRequestError {
    /// ドキュメントが JSON オブジェクトではない
    #[error("送信リクエストが JSON オブジェクトではありません")]
    NotAnObject,

    /// `customArgs` がオブジェクト以外の値で存在する
    #[error("customArgs がオブジェクトではありません")]
    CustomArgsNotAnObject,
}

impl SendRequestError {
    /// 失敗時に保存・通知するエラーレポート
    pub fn to_report(&self) -> Value {
        let kind: &'static str = self.into();
        json!({
            "name": "SendRequestError",
            "kind": kind,
            "message": self.to_string(),
        })
    }
}

/// 送信リクエスト
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SendRequest(Map<String, Value>);

impl SendRequest {
    /// S3 から取得した JSON ドキュメントから作成する
    pub fn from_value(value: Value) -> Result<Self, SendRequestError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(SendRequestError::NotAnObject),
        }
    }

    /// `customArgs.requestId`（文字列の場合のみ）
    pub fn request_id(&self) -> Option<&str> {
        self.0
            .get(CUSTOM_ARGS)
            .and_then(|args| args.get(REQUEST_ID))
            .and_then(Value::as_str)
    }

    /// `customArgs.apiCallTimestamp` を書き込む
    ///
    /// `customArgs` がなければ空オブジェクトを作成する。既存の値は上書きする。
    pub fn stamp_api_call_timestamp(&mut self, unix_seconds: i64) -> Result<(), SendRequestError> {
        let args = self
            .0
            .entry(CUSTOM_ARGS)
            .or_insert_with(|| Value::Object(Map::new()));
        let Value::Object(args) = args else {
            return Err(SendRequestError::CustomArgsNotAnObject);
        };
        args.insert(API_CALL_TIMESTAMP.to_string(), Value::from(unix_seconds));
        Ok(())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}
