//! 再生中の設定変更による再読み上げ
//!
//! プラットフォームのキャンセル処理が同期か非同期かは規格化されていないため、
//! キャンセル直後に読み上げ直すか、一定時間待ってから読み上げ直すかを選べる。

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 再読み上げ方式（設定ファイル用）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RestartMode {
    /// キャンセル直後に読み上げ直す
    #[default]
    Immediate,
    /// 一定時間待ってから読み上げ直す
    Delayed,
}

/// 再読み上げ設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestartConfig {
    #[serde(default)]
    pub mode: RestartMode,
    /// Delayed時の待ち時間（ミリ秒）
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_delay_ms() -> u64 {
    250
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            mode: RestartMode::Immediate,
            delay_ms: default_delay_ms(),
        }
    }
}

/// 再読み上げポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    #[default]
    Immediate,
    Delayed(Duration),
}

impl From<&RestartConfig> for RestartPolicy {
    fn from(config: &RestartConfig) -> Self {
        match config.mode {
            RestartMode::Immediate => RestartPolicy::Immediate,
            RestartMode::Delayed => RestartPolicy::Delayed(Duration::from_millis(config.delay_ms)),
        }
    }
}

/// 保留中の再読み上げを識別するトークン
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RestartToken(pub(crate) u64);

/// 保留中の再読み上げ
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PendingRestart {
    pub token: RestartToken,
    /// 読み上げ直すテキスト
    pub text: String,
}

/// 設定変更の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartOutcome {
    /// 再生中ではなかった
    NotSpeaking,
    /// 読み上げ直した
    Restarted,
    /// 待ち時間の後に [`complete_restart`](super::UtteranceController::complete_restart) が必要
    Deferred { token: RestartToken, delay: Duration },
}
