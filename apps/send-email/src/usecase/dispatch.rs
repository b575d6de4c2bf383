//! # メール送信ユースケース
//!
//! 1 回の呼び出しで 1 件の送信リクエストを処理する。
//!
//! ```text
//! Start → FetchRequest ─┬─ 取得/パース失敗 → 通知して終了
//!                       └─ 成功 → CallProvider ─┬─ 応答あり → 分類 → 保存 → 通知
//!                                               └─ 失敗 → エラー保存 → 通知
//! ```
//!
//! ## 設計方針
//!
//! - **通知は 1 回**: 読み込んだリクエスト 1 件につき通知の発行を 1 回試みる
//! - **送信失敗は呼び出し失敗にしない**: エラーを保存・通知して正常終了する
//!   （プラットフォームのリトライは発火しない）
//! - **保存はベストエフォート**: S3 への書き込み失敗はログのみで、通知の発行を妨げない
//! - **プロバイダ応答後の通知失敗はログのみ**: 再実行するとメールが二重に送信され、
//!   新しいメッセージ ID で別キーに保存されるため、呼び出しは成功として終える
//! - **送信前の通知失敗は呼び出し失敗**: 取得失敗・送信失敗の経路ではメールは
//!   受理されていないため、エラーを返してプラットフォームのリトライに委ねる

use std::sync::Arc;

use mailflow_domain::{
    DispatchResponse,
    MailError,
    NotificationEnvelope,
    ObjectRef,
    SendRequest,
    SendRequestError,
    clock::Clock,
    object_ref,
};
use mailflow_infra::{InfraError, MailSender, NotificationPublisher, ObjectStore};
use mailflow_shared::{
    event_log::{error, event},
    log_business_event,
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// 1 回の送信処理の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// 送信リクエストを取得・パースできなかった（応答オブジェクトは書かない）
    RequestUnreadable,
    /// プロバイダが応答した
    Dispatched {
        response_key: String,
        status_code:  String,
        x_message_id: Option<String>,
        /// 応答オブジェクトの保存に成功したか
        stored:       bool,
        /// 通知の発行に成功したか
        published:    bool,
    },
    /// 送信前後で失敗した
    Failed {
        error_key: String,
        /// エラーオブジェクトの保存に成功したか
        stored:    bool,
    },
}

/// 呼び出しを失敗させるエラー
#[derive(Debug, Error)]
pub enum DispatchError {
    /// 通知の発行に失敗
    #[error("通知の発行に失敗: {0}")]
    Publish(#[source] InfraError),
}

/// 送信リクエストの準備または送信の失敗
#[derive(Debug, Error)]
enum SendFailure {
    #[error(transparent)]
    InvalidRequest(#[from] SendRequestError),

    #[error(transparent)]
    Provider(#[from] MailError),
}

impl SendFailure {
    fn to_report(&self) -> Value {
        match self {
            Self::InvalidRequest(e) => e.to_report(),
            Self::Provider(e) => e.to_report(),
        }
    }

    fn error_category(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => error::category::INPUT,
            Self::Provider(_) => error::category::EXTERNAL_SERVICE,
        }
    }

    fn error_kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => error::kind::INVALID_REQUEST,
            Self::Provider(_) => error::kind::MAIL_SEND,
        }
    }
}

/// 送信に成功したリクエストとプロバイダの応答
struct Sent {
    request_id: Option<String>,
    response:   DispatchResponse,
}

/// メール送信ユースケース
///
/// 依存はプロセス起動時に 1 回だけ組み立て、呼び出しをまたいで共有する。
/// 呼び出し間で共有する可変状態は持たない。
pub struct DispatchUseCase {
    store:     Arc<dyn ObjectStore>,
    publisher: Arc<dyn NotificationPublisher>,
    sender:    Arc<dyn MailSender>,
    clock:     Arc<dyn Clock>,
    topic_arn: String,
}

impl DispatchUseCase {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        publisher: Arc<dyn NotificationPublisher>,
        sender: Arc<dyn MailSender>,
        clock: Arc<dyn Clock>,
        topic_arn: impl Into<String>,
    ) -> Self {
        Self {
            store,
            publisher,
            sender,
            clock,
            topic_arn: topic_arn.into(),
        }
    }

    /// 送信リクエスト 1 件を処理する
    ///
    /// # 引数
    ///
    /// * `request_object` - トリガーとなった `requests/*.json` の参照
    /// * `event` - トリガーイベント（取得失敗時の通知にそのまま添える）
    #[tracing::instrument(skip_all, fields(object = %request_object))]
    pub async fn dispatch(
        &self,
        request_object: &ObjectRef,
        event: &Value,
    ) -> Result<DispatchOutcome, DispatchError> {
        let document = match self.store.fetch_json(request_object).await {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(
                    error.category = error::category::INFRASTRUCTURE,
                    error.kind = error::kind::OBJECT_FETCH,
                    error = %e,
                    "送信リクエストの取得またはパースに失敗"
                );
                log_business_event!(
                    event.category = event::category::EMAIL,
                    event.action = event::action::EMAIL_REQUEST_UNREADABLE,
                    event.result = event::result::FAILURE,
                    event.object_key = %request_object.key,
                    "送信リクエストを読み込めませんでした"
                );
                self.publish(&NotificationEnvelope::parse_failed(event))
                    .await?;
                return Ok(DispatchOutcome::RequestUnreadable);
            }
        };

        let file_name = request_object.file_name();
        match self.send(document).await {
            Ok(sent) => Ok(self.record_response(request_object, file_name, sent).await),
            Err(failure) => self.record_failure(request_object, file_name, failure).await,
        }
    }

    /// タイムスタンプを書き込んで送信する
    async fn send(&self, document: Value) -> Result<Sent, SendFailure> {
        let mut request = SendRequest::from_value(document)?;
        request.stamp_api_call_timestamp(self.clock.unix_seconds())?;

        let response = self.sender.send(&request).await?;
        tracing::debug!(response = ?response, "メール送信 API の応答");

        Ok(Sent {
            request_id: request.request_id().map(str::to_string),
            response,
        })
    }

    async fn record_response(
        &self,
        request_object: &ObjectRef,
        file_name: &str,
        sent: Sent,
    ) -> DispatchOutcome {
        let Sent {
            request_id,
            response,
        } = sent;
        let status_code = response.status_code();
        let x_message_id = response.accepted_message_id().map(str::to_string);
        if let Some(id) = &x_message_id {
            tracing::info!(x_message_id = %id, "プロバイダのメッセージ ID を取得しました");
        }

        let response_object = request_object.sibling(object_ref::response_key(
            &status_code,
            file_name,
            x_message_id.as_deref(),
        ));
        let message = response.to_value();
        let stored = self.store_best_effort(&response_object, &message).await;

        log_business_event!(
            event.category = event::category::EMAIL,
            event.action = event::action::EMAIL_DISPATCHED,
            event.result = event::result::SUCCESS,
            event.object_key = %request_object.key,
            email.status_code = %status_code,
            email.request_id = ?request_id,
            email.x_message_id = ?x_message_id,
            "メール送信 API が応答しました"
        );

        let envelope = NotificationEnvelope::dispatched(
            request_id.as_deref(),
            x_message_id.as_deref(),
            message,
        );
        let published = match self.publish(&envelope).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!("送信済みのため再実行せず、通知の欠落として扱います");
                false
            }
        };

        DispatchOutcome::Dispatched {
            response_key: response_object.key,
            status_code,
            x_message_id,
            stored,
            published,
        }
    }

    async fn record_failure(
        &self,
        request_object: &ObjectRef,
        file_name: &str,
        failure: SendFailure,
    ) -> Result<DispatchOutcome, DispatchError> {
        tracing::error!(
            error.category = failure.error_category(),
            error.kind = failure.error_kind(),
            error = %failure,
            "メール送信に失敗"
        );

        let report = failure.to_report();
        let error_object = request_object.sibling(object_ref::error_key(file_name));
        let stored = self.store_best_effort(&error_object, &report).await;

        log_business_event!(
            event.category = event::category::EMAIL,
            event.action = event::action::EMAIL_DISPATCH_FAILED,
            event.result = event::result::FAILURE,
            event.object_key = %request_object.key,
            "メール送信に失敗しました"
        );

        self.publish(&NotificationEnvelope::failed(report)).await?;

        Ok(DispatchOutcome::Failed {
            error_key: error_object.key,
            stored,
        })
    }

    /// 保存に失敗してもログ出力のみで続行する
    async fn store_best_effort(&self, object: &ObjectRef, value: &Value) -> bool {
        match self.store.put_json(object, value).await {
            Ok(()) => {
                tracing::debug!(object = %object, "オブジェクトを保存しました");
                true
            }
            Err(e) => {
                tracing::error!(
                    error.category = error::category::INFRASTRUCTURE,
                    error.kind = error::kind::OBJECT_WRITE,
                    error = %e,
                    object = %object,
                    "オブジェクトの保存に失敗（通知は続行）"
                );
                false
            }
        }
    }

    async fn publish(&self, envelope: &NotificationEnvelope) -> Result<(), DispatchError> {
        self.publisher
            .publish(&self.topic_arn, &envelope.to_value())
            .await
            .map_err(|e| {
                tracing::error!(
                    error.category = error::category::INFRASTRUCTURE,
                    error.kind = error::kind::PUBLISH,
                    error = %e,
                    "通知の発行に失敗"
                );
                DispatchError::Publish(e)
            })
    }
}
