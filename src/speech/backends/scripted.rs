//! スクリプト駆動のプラットフォーム実装
//!
//! 実際の音声は出さず、呼び出しを記録してイベントを手動（または自動）で発火する。
//! テストと `silent` プラットフォームで使用する。

use parking_lot::Mutex;
use std::sync::Arc;

use crate::speech::{
    EventSink, PlatformEvent, PlatformStatus, SpeechPlatform, SynthesisError, UtteranceId,
    UtteranceRequest, VoiceDescriptor,
};

/// プラットフォームへの呼び出し記録
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    Speak {
        id: UtteranceId,
        request: UtteranceRequest,
    },
    Cancel,
}

#[derive(Debug, Default)]
struct ScriptState {
    voices: Vec<VoiceDescriptor>,
    status: PlatformStatus,
    calls: Vec<PlatformCall>,
    /// 投入済みで未終了の発話
    outstanding: Vec<UtteranceId>,
    fail_next_speak: Option<String>,
}

/// スクリプト駆動プラットフォーム
pub struct ScriptedPlatform {
    state: Arc<Mutex<ScriptState>>,
    events: EventSink,
    autoplay: bool,
}

/// テスト側からプラットフォームを操作するハンドル
#[derive(Clone)]
pub struct ScriptedHandle {
    state: Arc<Mutex<ScriptState>>,
    events: EventSink,
}

impl ScriptedPlatform {
    /// 手動でイベントを発火するプラットフォームを作成
    pub fn new(events: EventSink) -> (Self, ScriptedHandle) {
        let state = Arc::new(Mutex::new(ScriptState::default()));
        let handle = ScriptedHandle {
            state: state.clone(),
            events: events.clone(),
        };
        (
            Self {
                state,
                events,
                autoplay: false,
            },
            handle,
        )
    }

    /// 投入と同時に開始・終了を通知するプラットフォームを作成
    pub fn autoplay(events: EventSink) -> (Self, ScriptedHandle) {
        let (mut platform, handle) = Self::new(events);
        platform.autoplay = true;
        (platform, handle)
    }

    fn emit(&self, event: PlatformEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("🔇 イベント受信側が閉じています");
        }
    }
}

impl SpeechPlatform for ScriptedPlatform {
    fn name(&self) -> &'static str {
        if self.autoplay {
            "silent"
        } else {
            "scripted"
        }
    }

    fn voices(&self) -> Vec<VoiceDescriptor> {
        self.state.lock().voices.clone()
    }

    fn speak(&mut self, id: UtteranceId, request: &UtteranceRequest) -> Result<(), SynthesisError> {
        {
            let mut state = self.state.lock();
            state.calls.push(PlatformCall::Speak {
                id,
                request: request.clone(),
            });
            if let Some(message) = state.fail_next_speak.take() {
                return Err(SynthesisError::Engine(message));
            }
            if !self.autoplay {
                state.outstanding.push(id);
                state.status.pending = true;
                return Ok(());
            }
        }

        tracing::info!(
            utterance = %id,
            voice = ?request.voice.as_ref().map(|v| v.name.as_str()),
            rate = request.effective_rate(),
            pitch = request.effective_pitch(),
            "🔈 {}",
            request.text
        );
        self.emit(PlatformEvent::Started(id));
        self.emit(PlatformEvent::Ended(id));
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), SynthesisError> {
        let cancelled = {
            let mut state = self.state.lock();
            state.calls.push(PlatformCall::Cancel);
            state.status = PlatformStatus::default();
            std::mem::take(&mut state.outstanding)
        };

        // 取り消された発話にも終了が遅れて届く
        for id in cancelled {
            self.emit(PlatformEvent::Ended(id));
        }
        Ok(())
    }

    fn status(&self) -> PlatformStatus {
        self.state.lock().status
    }
}

impl ScriptedHandle {
    /// 音声一覧を差し替えて変更通知を送る
    pub fn set_voices(&self, voices: Vec<VoiceDescriptor>) {
        self.state.lock().voices = voices;
        self.emit(PlatformEvent::VoicesChanged);
    }

    /// 状態フラグを直接設定
    pub fn set_status(&self, status: PlatformStatus) {
        self.state.lock().status = status;
    }

    /// 次の読み上げ投入を失敗させる
    pub fn fail_next_speak(&self, message: impl Into<String>) {
        self.state.lock().fail_next_speak = Some(message.into());
    }

    /// 開始を通知
    pub fn start(&self, id: UtteranceId) {
        {
            let mut state = self.state.lock();
            state.status.speaking = true;
            state.status.pending = state.outstanding.iter().any(|queued| *queued != id);
        }
        self.emit(PlatformEvent::Started(id));
    }

    /// 終了を通知
    pub fn finish(&self, id: UtteranceId) {
        self.settle(id);
        self.emit(PlatformEvent::Ended(id));
    }

    /// エラーを通知
    pub fn fail(&self, id: UtteranceId, message: impl Into<String>) {
        self.settle(id);
        self.emit(PlatformEvent::Failed {
            id,
            message: message.into(),
        });
    }

    /// 記録された呼び出し
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// 記録された読み上げ要求
    pub fn spoken(&self) -> Vec<(UtteranceId, UtteranceRequest)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                PlatformCall::Speak { id, request } => Some((*id, request.clone())),
                PlatformCall::Cancel => None,
            })
            .collect()
    }

    pub fn cancel_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| matches!(call, PlatformCall::Cancel))
            .count()
    }

    fn settle(&self, id: UtteranceId) {
        let mut state = self.state.lock();
        state.outstanding.retain(|queued| *queued != id);
        state.status = PlatformStatus {
            speaking: false,
            pending: !state.outstanding.is_empty(),
        };
    }

    fn emit(&self, event: PlatformEvent) {
        let _ = self.events.send(event);
    }
}
