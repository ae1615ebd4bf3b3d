//! OS標準音声合成バックエンド実装

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::utterance_map::{target_voice_id, SpeakingWatch, UtteranceMap};
use crate::speech::{
    EventSink, PlatformEvent, PlatformStatus, SpeechPlatform, SynthesisError, UtteranceId,
    UtteranceRequest, VoiceDescriptor,
};

/// 発話コールバックのないエンジンで再生状態を確認する間隔
const SPEAKING_POLL_INTERVAL: Duration = Duration::from_millis(100);

type SharedUtterances = Arc<Mutex<UtteranceMap<tts::UtteranceId>>>;

/// OS標準音声合成バックエンド
pub struct NativePlatform {
    tts: tts::Tts,
    events: EventSink,
    utterances: SharedUtterances,
    features: tts::Features,
    /// 起動時にエンジンが使っていた音声
    default_voice_id: Option<String>,
    watcher: Option<JoinHandle<()>>,
}

impl NativePlatform {
    /// 新しいインスタンスを作成
    pub fn new(events: EventSink) -> Result<Self, SynthesisError> {
        let tts = tts::Tts::default()
            .map_err(|e| SynthesisError::Unavailable(format!("音声エンジンの初期化に失敗: {}", e)))?;
        let features = tts.supported_features();
        let utterances: SharedUtterances = Arc::new(Mutex::new(UtteranceMap::default()));

        // set_voice後のvoice()は最後に使った音声を返すので、既定音声はここで覚えておく
        let default_voice_id = if features.voice {
            tts.voice().ok().flatten().map(|voice| voice.id())
        } else {
            None
        };

        let watcher = if features.utterance_callbacks {
            Self::install_callbacks(&tts, &events, &utterances)?;
            None
        } else if features.is_speaking {
            tracing::info!("🔊 発話コールバック非対応のため再生状態をポーリングします");
            Some(Self::spawn_speaking_watch(&tts, &events, &utterances)?)
        } else {
            return Err(SynthesisError::Unavailable(
                "この音声エンジンは発話の終了を通知できません".to_string(),
            ));
        };

        let platform = Self {
            tts,
            events,
            utterances,
            features,
            default_voice_id,
            watcher,
        };

        // 音声一覧は同期的に取得できるので、すぐに変更通知を出す
        let _ = platform.events.send(PlatformEvent::VoicesChanged);
        tracing::info!("🔊 OS音声エンジン初期化完了");
        Ok(platform)
    }

    fn install_callbacks(
        tts: &tts::Tts,
        events: &EventSink,
        utterances: &SharedUtterances,
    ) -> Result<(), SynthesisError> {
        let begin_events = events.clone();
        let begin_map = utterances.clone();
        tts.on_utterance_begin(Some(Box::new(move |engine_id| {
            if let Some(id) = begin_map.lock().resolve(&engine_id) {
                let _ = begin_events.send(PlatformEvent::Started(id));
            }
        })))
        .map_err(engine_error)?;

        let end_events = events.clone();
        let end_map = utterances.clone();
        tts.on_utterance_end(Some(Box::new(move |engine_id| {
            if let Some(id) = end_map.lock().remove(&engine_id) {
                let _ = end_events.send(PlatformEvent::Ended(id));
            }
        })))
        .map_err(engine_error)?;

        let stop_events = events.clone();
        let stop_map = utterances.clone();
        tts.on_utterance_stop(Some(Box::new(move |engine_id| {
            if let Some(id) = stop_map.lock().remove(&engine_id) {
                let _ = stop_events.send(PlatformEvent::Ended(id));
            }
        })))
        .map_err(engine_error)?;

        Ok(())
    }

    /// `is_speaking` を定期的に確認して終了通知を出すタスクを起動
    fn spawn_speaking_watch(
        tts: &tts::Tts,
        events: &EventSink,
        utterances: &SharedUtterances,
    ) -> Result<JoinHandle<()>, SynthesisError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            SynthesisError::Unavailable(format!("再生状態の監視を開始できません: {}", e))
        })?;

        let tts = tts.clone();
        let events = events.clone();
        let utterances = utterances.clone();
        Ok(runtime.spawn(async move {
            let mut watch = SpeakingWatch::default();
            let mut ticker = tokio::time::interval(SPEAKING_POLL_INTERVAL);
            loop {
                ticker.tick().await;
                let speaking = tts.is_speaking().unwrap_or(false);
                let finished = {
                    let mut map = utterances.lock();
                    watch.observe(speaking, &mut *map)
                };
                for id in finished {
                    if events.send(PlatformEvent::Ended(id)).is_err() {
                        tracing::debug!("📡 イベント受信側が閉じたため再生状態の監視を終了");
                        return;
                    }
                }
            }
        }))
    }

    fn apply_parameters(&mut self, request: &UtteranceRequest) -> Result<(), SynthesisError> {
        if self.features.rate {
            let rate = scale_to_range(
                request.effective_rate(),
                self.tts.min_rate(),
                self.tts.normal_rate(),
                self.tts.max_rate(),
            );
            self.tts.set_rate(rate).map_err(engine_error)?;
        }

        if self.features.pitch {
            let pitch = scale_to_range(
                request.effective_pitch(),
                self.tts.min_pitch(),
                self.tts.normal_pitch(),
                self.tts.max_pitch(),
            );
            self.tts.set_pitch(pitch).map_err(engine_error)?;
        }

        if self.features.voice {
            // エンジンは前回の音声を保持するので、指定がなくても毎回設定し直す
            let voices = self.tts.voices().map_err(engine_error)?;
            let available: Vec<String> = voices.iter().map(|voice| voice.id()).collect();
            let requested = request.voice.as_ref().map(|voice| voice.uri.as_str());
            let target = target_voice_id(requested, &available, self.default_voice_id.as_deref());

            if let Some(voice) = request.voice.as_ref() {
                if target != Some(voice.uri.as_str()) {
                    tracing::warn!("⚠️ 音声が見つかりません、既定音声を使用: {}", voice.name);
                }
            }

            if let Some(engine_voice) = target.and_then(|id| voices.iter().find(|v| v.id() == id)) {
                self.tts.set_voice(engine_voice).map_err(engine_error)?;
            }
        }

        Ok(())
    }
}

impl Drop for NativePlatform {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

impl SpeechPlatform for NativePlatform {
    fn name(&self) -> &'static str {
        "native"
    }

    fn voices(&self) -> Vec<VoiceDescriptor> {
        match self.tts.voices() {
            Ok(voices) => voices
                .into_iter()
                .map(|voice| {
                    let is_default = self.default_voice_id.as_deref() == Some(voice.id().as_str());
                    VoiceDescriptor::new(voice.name(), voice.language().to_string())
                        .with_uri(voice.id())
                        .with_default(is_default)
                })
                .collect(),
            Err(e) => {
                tracing::warn!("⚠️ 音声一覧の取得に失敗: {}", e);
                Vec::new()
            }
        }
    }

    fn speak(&mut self, id: UtteranceId, request: &UtteranceRequest) -> Result<(), SynthesisError> {
        self.apply_parameters(request)?;

        // 対応表の登録前にコールバックが来ても解決できるようにしておく
        self.utterances.lock().begin(id);
        let engine_id = match self.tts.speak(request.text.clone(), false) {
            Ok(engine_id) => engine_id,
            Err(e) => {
                self.utterances.lock().drain();
                return Err(engine_error(e));
            }
        };

        if let Some(engine_id) = engine_id {
            self.utterances.lock().register(engine_id, id);
        }

        if !self.features.utterance_callbacks {
            let _ = self.events.send(PlatformEvent::Started(id));
        }

        tracing::debug!(utterance = %id, "🔊 OS音声エンジンに送信");
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), SynthesisError> {
        if !self.features.stop {
            return Err(SynthesisError::Engine(
                "この音声エンジンは停止に対応していません".to_string(),
            ));
        }

        self.tts.stop().map_err(engine_error)?;

        if !self.features.utterance_callbacks {
            let cancelled = self.utterances.lock().drain();
            for id in cancelled {
                let _ = self.events.send(PlatformEvent::Ended(id));
            }
        }
        Ok(())
    }

    fn status(&self) -> PlatformStatus {
        let outstanding = !self.utterances.lock().is_empty();
        let speaking = if self.features.is_speaking {
            self.tts.is_speaking().unwrap_or(false)
        } else {
            outstanding
        };

        PlatformStatus {
            speaking,
            pending: !speaking && outstanding,
        }
    }
}

fn engine_error(err: tts::Error) -> SynthesisError {
    SynthesisError::Engine(err.to_string())
}

/// 1.0を標準とする値（0.0〜2.0）をエンジン固有の範囲に写像
fn scale_to_range(value: f32, min: f32, normal: f32, max: f32) -> f32 {
    let value = value.clamp(0.0, 2.0);
    if value >= 1.0 {
        normal + (value - 1.0) * (max - normal)
    } else {
        min + value * (normal - min)
    }
}
