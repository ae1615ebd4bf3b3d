//! 音声合成プラットフォームの抽象化
//!
//! 音声一覧の取得・読み上げ・キャンセル・状態フラグをプラットフォームに委譲する。
//! 開始/終了/エラーの通知は [`PlatformEvent`] としてチャネル経由で届く。

pub mod backends;
pub mod config;
pub mod error;
pub mod voice;

use tokio::sync::mpsc;

pub use error::SynthesisError;
pub use voice::{VoiceDescriptor, VoiceKey};

/// 話速の既定値（プラットフォーム既定）
pub const DEFAULT_RATE: f32 = 1.0;

/// 音高の既定値（プラットフォーム既定）
pub const DEFAULT_PITCH: f32 = 1.0;

/// 発話ID
///
/// コントローラーが発話ごとに払い出し、プラットフォームはイベントにそのまま載せて返す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
#[display("#{_0}")]
pub struct UtteranceId(pub u64);

impl UtteranceId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// 読み上げ要求
///
/// 読み上げのたびに新しく作られ、使い回さない。
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceRequest {
    /// 読み上げテキスト（トリム済み、空でない）
    pub text: String,
    /// 使用する音声（Noneならプラットフォーム既定）
    pub voice: Option<VoiceDescriptor>,
    /// 話速（Noneならプラットフォーム既定）
    pub rate: Option<f32>,
    /// 音高（Noneならプラットフォーム既定）
    pub pitch: Option<f32>,
}

impl UtteranceRequest {
    pub fn effective_rate(&self) -> f32 {
        self.rate.unwrap_or(DEFAULT_RATE)
    }

    pub fn effective_pitch(&self) -> f32 {
        self.pitch.unwrap_or(DEFAULT_PITCH)
    }
}

/// プラットフォームの再生状態フラグ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformStatus {
    /// 再生中
    pub speaking: bool,
    /// キュー待ち
    pub pending: bool,
}

impl PlatformStatus {
    pub fn is_busy(&self) -> bool {
        self.speaking || self.pending
    }
}

/// プラットフォームからの通知
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    /// 音声一覧が利用可能になった/変化した
    VoicesChanged,
    /// 読み上げ開始
    Started(UtteranceId),
    /// 読み上げ終了
    Ended(UtteranceId),
    /// 読み上げエラー
    Failed { id: UtteranceId, message: String },
}

/// プラットフォームイベントの送信側
pub type EventSink = mpsc::UnboundedSender<PlatformEvent>;

/// プラットフォームイベントの受信側
pub type EventStream = mpsc::UnboundedReceiver<PlatformEvent>;

/// イベントチャネルを作成
pub fn event_channel() -> (EventSink, EventStream) {
    mpsc::unbounded_channel()
}

/// 音声合成プラットフォームトレイト
///
/// どの操作も呼び出し元をブロックしない。`cancel` は確認を待たずに戻る。
pub trait SpeechPlatform: Send {
    /// プラットフォーム名を取得
    fn name(&self) -> &'static str;

    /// 現在の音声一覧（準備前は空の場合がある）
    fn voices(&self) -> Vec<VoiceDescriptor>;

    /// 読み上げを投入
    fn speak(&mut self, id: UtteranceId, request: &UtteranceRequest) -> Result<(), SynthesisError>;

    /// 再生中・キュー待ちの読み上げをすべて取り消す
    fn cancel(&mut self) -> Result<(), SynthesisError>;

    /// 再生状態フラグを取得
    fn status(&self) -> PlatformStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_parameters_fall_back_to_defaults() {
        let request = UtteranceRequest {
            text: "hello".to_string(),
            voice: None,
            rate: None,
            pitch: Some(1.4),
        };
        assert_eq!(request.effective_rate(), DEFAULT_RATE);
        assert_eq!(request.effective_pitch(), 1.4);
    }

    #[test]
    fn test_status_busy_when_speaking_or_pending() {
        assert!(!PlatformStatus::default().is_busy());
        assert!(PlatformStatus { speaking: true, pending: false }.is_busy());
        assert!(PlatformStatus { speaking: false, pending: true }.is_busy());
    }
}
