//! # AWS 共通設定
//!
//! S3 / SNS クライアントが共有する `SdkConfig` を読み込む。
//! Lambda ではプロセス起動時に 1 回だけ呼び出し、以降の呼び出しで使い回す。
//!
//! 認証情報は SDK のデフォルト認証チェーンで解決する:
//! - Lambda: 実行ロール
//! - ローカル: 環境変数 `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`（`.env` で設定）

use aws_config::{BehaviorVersion, Region, SdkConfig};

/// AWS SDK の共通設定を読み込む
///
/// # 引数
///
/// * `region` - クライアントをバインドするリージョン。`None` の場合はデフォルトチェーン
///   （`AWS_REGION` 等）に任せる。
/// * `endpoint` - カスタムエンドポイント URL（MinIO / LocalStack 用）
pub async fn load_config(region: Option<&str>, endpoint: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    if let Some(endpoint_url) = endpoint {
        loader = loader.endpoint_url(endpoint_url);
    }

    loader.load().await
}
