//! # Observability 基盤
//!
//! トレーシング初期化とログ出力形式の設定を提供する。
//! 2 つの Lambda 関数（send-email / notification-consumer）で共通のログ初期化ロジックを集約し、
//! 環境変数 `LOG_FORMAT` による JSON / Pretty 出力の切り替えに対応する。
//!
//! Lambda 上では CloudWatch Logs に出力されるため、未設定時のデフォルトは
//! 呼び出し元が [`LogFormat::from_env_or`] で指定する。

/// ログ出力形式
///
/// 環境変数 `LOG_FORMAT` で切り替える。
/// 値が不正な場合は [`Pretty`](LogFormat::Pretty) にフォールバックする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON 形式（CloudWatch Logs 向け）
    Json,
    /// 人間が読みやすい形式（ローカル実行向け）
    #[default]
    Pretty,
}

impl LogFormat {
    /// 文字列からログ形式をパースする
    ///
    /// 不正な値の場合は [`Pretty`](LogFormat::Pretty) にフォールバックし、
    /// stderr に警告を出力する。
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            other => {
                eprintln!("WARNING: unknown LOG_FORMAT={other:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }

    /// 環境変数 `LOG_FORMAT` から読み取る
    ///
    /// 未設定の場合は `default` を使用する。
    pub fn from_env_or(default: Self) -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(val) => Self::parse(&val),
            Err(_) => default,
        }
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// 関数名（invocation スパンの `service` フィールドに出力）
    pub service_name: String,
    /// ログ出力形式
    pub log_format:   LogFormat,
}

impl TracingConfig {
    /// 新しい設定を作成する
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
        }
    }

    /// Lambda 関数向けの設定を環境変数から読み取る
    ///
    /// `LOG_FORMAT` が未設定なら JSON 出力とする。
    pub fn for_lambda(service_name: impl Into<String>) -> Self {
        Self::new(service_name, LogFormat::from_env_or(LogFormat::Json))
    }
}

/// 1 回の Lambda 呼び出しを表すスパンを作成する
///
/// JSON モードでは `span.service` / `span.request_id` として出力される。
pub fn invocation_span(service_name: &str, request_id: &str) -> tracing::Span {
    tracing::info_span!("invocation", service = service_name, request_id = request_id)
}

/// トレーシングを初期化する
///
/// `RUST_LOG` 環境変数でログレベルを制御可能。
/// 未設定の場合は `"info,mailflow=debug"` をデフォルトとする。
///
/// CloudWatch Logs はエスケープシーケンスを解釈しないため、ANSI カラーは常に無効。
/// `ErrorLayer` を登録し、`InfraError` が生成時点の SpanTrace を保持できるようにする。
#[cfg(feature = "observability")]
pub fn init_tracing(config: &TracingConfig) {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,mailflow=debug".into());

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_ansi(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_ansi(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();

    tracing::debug!(service = %config.service_name, "トレーシングを初期化しました");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jsonでjsonを返す() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
    }

    #[test]
    fn test_parse_不正な値でprettyにフォールバックする() {
        assert_eq!(LogFormat::parse("unknown"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(""), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Pretty);
    }

    #[test]
    fn test_newでフィールドが正しく設定される() {
        let config = TracingConfig::new("send-email", LogFormat::Json);

        assert_eq!(config.service_name, "send-email");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invocation_spanがフィールド付きで作成される() {
        let subscriber = tracing_subscriber::registry();
        tracing::subscriber::with_default(subscriber, || {
            let span = invocation_span("send-email", "req-001");
            assert_eq!(span.metadata().map(|m| m.name()), Some("invocation"));
        });
    }
}
