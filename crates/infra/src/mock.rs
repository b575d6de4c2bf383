//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリモック。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! mailflow-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! すべてのモックは呼び出しを記録し、`Clone` したハンドル同士で記録を共有する。

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use mailflow_domain::{DispatchResponse, MailError, ObjectRef, SendRequest};
use serde_json::Value;

use crate::{
    error::InfraError,
    mail::MailSender,
    s3::ObjectStore,
    sns::NotificationPublisher,
};

// ===== MockObjectStore =====

/// 保存済みオブジェクトの本文
#[derive(Debug, Clone)]
enum StoredBody {
    Json(Value),
    Raw(Vec<u8>),
}

#[derive(Clone, Default)]
pub struct MockObjectStore {
    objects:     Arc<Mutex<BTreeMap<ObjectRef, StoredBody>>>,
    writes:      Arc<Mutex<Vec<(ObjectRef, Value)>>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON オブジェクトを配置する
    pub fn insert_json(&self, object: ObjectRef, value: Value) {
        self.objects
            .lock()
            .unwrap()
            .insert(object, StoredBody::Json(value));
    }

    /// 任意のバイト列を配置する（壊れた JSON の再現用）
    pub fn insert_raw(&self, object: ObjectRef, body: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .unwrap()
            .insert(object, StoredBody::Raw(body.into()));
    }

    /// 以降の書き込みをすべて失敗させる
    pub fn fail_writes(&self) {
        *self.fail_writes.lock().unwrap() = true;
    }

    /// `put_json` の呼び出し履歴（失敗したものを含む）
    pub fn writes(&self) -> Vec<(ObjectRef, Value)> {
        self.writes.lock().unwrap().clone()
    }

    /// 保存されている JSON（書き込みで上書きされた値を含む）
    pub fn get_json(&self, object: &ObjectRef) -> Option<Value> {
        match self.objects.lock().unwrap().get(object) {
            Some(StoredBody::Json(value)) => Some(value.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn fetch_json(&self, object: &ObjectRef) -> Result<Value, InfraError> {
        let body = self.objects.lock().unwrap().get(object).cloned();
        match body {
            Some(StoredBody::Json(value)) => Ok(value),
            Some(StoredBody::Raw(bytes)) => {
                let text = String::from_utf8(bytes)?;
                Ok(serde_json::from_str(&text)?)
            }
            None => Err(InfraError::s3(format!("NoSuchKey: {object}"))),
        }
    }

    async fn put_json(&self, object: &ObjectRef, value: &Value) -> Result<(), InfraError> {
        self.writes
            .lock()
            .unwrap()
            .push((object.clone(), value.clone()));
        if *self.fail_writes.lock().unwrap() {
            return Err(InfraError::s3("AccessDenied"));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(object.clone(), StoredBody::Json(value.clone()));
        Ok(())
    }
}

// ===== MockNotificationPublisher =====

#[derive(Clone, Default)]
pub struct MockNotificationPublisher {
    published: Arc<Mutex<Vec<(String, Value)>>>,
    fail:      Arc<Mutex<bool>>,
}

impl MockNotificationPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以降の発行をすべて失敗させる
    pub fn fail_publishes(&self) {
        *self.fail.lock().unwrap() = true;
    }

    /// 発行に成功したメッセージ（トピック ARN, 本文）
    pub fn published(&self) -> Vec<(String, Value)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationPublisher for MockNotificationPublisher {
    async fn publish(&self, topic_arn: &str, message: &Value) -> Result<(), InfraError> {
        if *self.fail.lock().unwrap() {
            return Err(InfraError::sns("NotFound: Topic does not exist"));
        }
        self.published
            .lock()
            .unwrap()
            .push((topic_arn.to_string(), message.clone()));
        Ok(())
    }
}

// ===== MockMailSender =====

/// 事前に登録した結果を順に返すメール送信モック
///
/// 登録した結果を使い切った後は最後の結果を繰り返す。
/// 何も登録しなければ `MailError::Transport` を返す。
#[derive(Clone, Default)]
pub struct MockMailSender {
    outcomes: Arc<Mutex<VecDeque<MockOutcome>>>,
    last:     Arc<Mutex<Option<MockOutcome>>>,
    sent:     Arc<Mutex<Vec<Value>>>,
}

#[derive(Debug, Clone)]
enum MockOutcome {
    Respond(DispatchResponse),
    Reject { code: u16, body: Value },
    Transport(String),
}

impl MockOutcome {
    fn into_result(self) -> Result<DispatchResponse, MailError> {
        match self {
            Self::Respond(response) => Ok(response),
            Self::Reject { code, body } => Err(MailError::Rejected { code, body }),
            Self::Transport(msg) => Err(MailError::Transport(msg)),
        }
    }
}

impl MockMailSender {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, outcome: MockOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// 応答を返す
    pub fn respond_with(&self, response: DispatchResponse) -> &Self {
        self.push(MockOutcome::Respond(response));
        self
    }

    /// API による拒否を返す
    pub fn reject_with(&self, code: u16, body: Value) -> &Self {
        self.push(MockOutcome::Reject { code, body });
        self
    }

    /// 通信エラーを返す
    pub fn fail_with(&self, msg: impl Into<String>) -> &Self {
        self.push(MockOutcome::Transport(msg.into()));
        self
    }

    /// 実際に送信されたリクエスト
    pub fn sent(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSender for MockMailSender {
    async fn send(&self, request: &SendRequest) -> Result<DispatchResponse, MailError> {
        self.sent.lock().unwrap().push(request.clone().into_value());

        let next = self.outcomes.lock().unwrap().pop_front();
        let outcome = match next {
            Some(outcome) => {
                *self.last.lock().unwrap() = Some(outcome.clone());
                outcome
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| MockOutcome::Transport("no response configured".to_string())),
        };
        outcome.into_result()
    }
}
