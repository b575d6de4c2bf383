//! # Clock（時刻プロバイダ）
//!
//! 送信直前に `customArgs.apiCallTimestamp` へ書き込む UNIX 時刻を提供する。
//! テストで固定時刻を注入し、同じ入力から同じ送信ペイロードを得られるようにする。

use chrono::{DateTime, TimeZone, Utc};

/// 現在時刻を提供するトレイト
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// 現在の UNIX 時刻（秒）
    fn unix_seconds(&self) -> i64 {
        self.now().timestamp()
    }
}

/// 実際のシステム時刻を返す実装
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定時刻を返すテスト用実装
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// UNIX 時刻（秒）から作成する。範囲外の値はエポックに丸める。
    pub fn at_unix(seconds: i64) -> Self {
        let now = Utc
            .timestamp_opt(seconds, 0)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH);
        Self::new(now)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
