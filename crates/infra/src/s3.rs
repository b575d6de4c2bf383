//! # S3 オブジェクトストア
//!
//! 送信リクエストの読み込みと、プロバイダ応答・エラーレポートの保存を行う。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `ObjectStore` trait で S3 操作を抽象化し、テスト時はモックに差し替える
//! - **失敗は Result で返す**: ログ出力と続行の判断は呼び出し側（ユースケース層）が行う
//! - **ローカル開発**: MinIO を使用（`S3_ENDPOINT_URL` で接続先を指定）
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use mailflow_infra::{aws, s3};
//!
//! async fn setup() {
//!     let config = aws::load_config(Some("us-east-1"), None).await;
//!     let store = s3::AwsObjectStore::new(s3::create_client(&config, false));
//! }
//! ```

use async_trait::async_trait;
use aws_sdk_s3::{Client, primitives::ByteStream};
use mailflow_domain::ObjectRef;
use serde_json::Value;

use crate::InfraError;

/// 保存する JSON の Content-Type
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// JSON ドキュメントを扱うオブジェクトストアのインターフェース
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// オブジェクトを取得し、UTF-8 テキストとして JSON にパースする
    ///
    /// 取得失敗・文字コード不正・JSON 不正はいずれもエラーとして返す。
    async fn fetch_json(&self, object: &ObjectRef) -> Result<Value, InfraError>;

    /// 値を JSON にシリアライズし、`application/json` として保存する
    async fn put_json(&self, object: &ObjectRef, value: &Value) -> Result<(), InfraError>;
}

/// AWS S3 オブジェクトストア
///
/// `aws-sdk-s3` を使用した [`ObjectStore`] の実装。MinIO とも互換動作する。
/// バケットはトリガーイベントごとに異なり得るため、クライアントはバケットを保持しない。
#[derive(Clone)]
pub struct AwsObjectStore {
    client: Client,
}

impl AwsObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for AwsObjectStore {
    #[tracing::instrument(skip_all, fields(object = %object))]
    async fn fetch_json(&self, object: &ObjectRef) -> Result<Value, InfraError> {
        let output = self
            .client
            .get_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|e| InfraError::s3(format!("GetObject の実行に失敗: {e}")))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| InfraError::s3(format!("オブジェクト本文の読み込みに失敗: {e}")))?
            .into_bytes();

        let text = String::from_utf8(bytes.to_vec())?;
        Ok(serde_json::from_str(&text)?)
    }

    #[tracing::instrument(skip_all, fields(object = %object))]
    async fn put_json(&self, object: &ObjectRef, value: &Value) -> Result<(), InfraError> {
        let body = serde_json::to_vec(value)?;

        self.client
            .put_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .content_type(JSON_CONTENT_TYPE)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| InfraError::s3(format!("PutObject の実行に失敗: {e}")))?;

        Ok(())
    }
}

/// S3 クライアントを作成する
///
/// MinIO はパススタイルが必要（バーチャルホスト型 URL を使わない）。
/// カスタムエンドポイント使用時のみ `force_path_style` を有効化する。
pub fn create_client(config: &aws_config::SdkConfig, force_path_style: bool) -> Client {
    let s3_config = aws_sdk_s3::config::Builder::from(config)
        .force_path_style(force_path_style)
        .build();

    Client::from_conf(s3_config)
}
