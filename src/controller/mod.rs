//! 読み上げコントローラー
//!
//! 音声カタログ・フォーム入力・追跡中の発話・ボタン状態を一つのオブジェクトにまとめ、
//! UIイベントとプラットフォーム通知をすべてここで処理する。

pub mod catalogue;
pub mod request;
pub mod restart;
pub mod shortcut;
pub mod state;

use crate::speech::{
    PlatformEvent, SpeechPlatform, UtteranceId, UtteranceRequest, VoiceKey,
};

pub use catalogue::{LocalePreference, SelectorView, VoiceCatalogue, VoiceOption, NO_VOICES_LABEL};
pub use request::{build_request, parse_number, FormValues, UserNotice};
pub use restart::{RestartConfig, RestartMode, RestartOutcome, RestartPolicy, RestartToken};
pub use shortcut::KeyPress;
pub use state::{ControlState, PlaybackPhase};

use restart::PendingRestart;

/// コントローラー設定
#[derive(Debug, Clone, Default)]
pub struct ControllerSettings {
    /// 既定音声の選択に使う優先ロケール
    pub locale: LocalePreference,
    /// 再生中の設定変更時の再読み上げ方式
    pub restart: RestartPolicy,
    /// フォームの初期値
    pub form: FormValues,
}

/// 追跡中の発話
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedUtterance {
    pub id: UtteranceId,
    pub request: UtteranceRequest,
}

/// UI表示用のスナップショット
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerView {
    pub available: bool,
    pub phase: PlaybackPhase,
    pub controls: ControlState,
    /// 追跡中の発話
    pub utterance: Option<UtteranceId>,
    pub selector: SelectorView,
    pub form: FormValues,
}

/// 読み上げコントローラー
pub struct UtteranceController {
    platform: Option<Box<dyn SpeechPlatform>>,
    locale: LocalePreference,
    restart_policy: RestartPolicy,
    catalogue: VoiceCatalogue,
    form: FormValues,
    phase: PlaybackPhase,
    controls: ControlState,
    current: Option<TrackedUtterance>,
    last_id: UtteranceId,
    pending_restart: Option<PendingRestart>,
    last_token: u64,
    notices: Vec<UserNotice>,
}

impl UtteranceController {
    /// プラットフォームを使うコントローラーを作成
    pub fn new(platform: Box<dyn SpeechPlatform>, settings: ControllerSettings) -> Self {
        Self::build(Some(platform), settings)
    }

    /// 音声合成機能がない環境用のコントローラーを作成
    pub fn without_platform(settings: ControllerSettings) -> Self {
        Self::build(None, settings)
    }

    fn build(platform: Option<Box<dyn SpeechPlatform>>, settings: ControllerSettings) -> Self {
        let controls = if platform.is_some() {
            ControlState::default()
        } else {
            ControlState::unavailable()
        };

        Self {
            platform,
            locale: settings.locale,
            restart_policy: settings.restart,
            catalogue: VoiceCatalogue::default(),
            form: settings.form,
            phase: PlaybackPhase::Idle,
            controls,
            current: None,
            last_id: UtteranceId(0),
            pending_restart: None,
            last_token: 0,
            notices: Vec::new(),
        }
    }

    /// 起動時の初期化
    ///
    /// 読み上げボタン有効・停止ボタン無効にして、音声一覧を取り込む。
    pub fn start(&mut self) {
        match self.platform.as_ref() {
            Some(platform) => {
                tracing::info!("🎙️ 読み上げコントローラー起動: {}", platform.name());
                self.enter_phase(PlaybackPhase::Idle);
                self.refresh_catalogue();
            }
            None => {
                tracing::warn!("⚠️ 音声合成機能が利用できません。読み上げ・停止ボタンを無効化します");
                self.controls = ControlState::unavailable();
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.platform.is_some()
    }

    /// 音声一覧を取り直してカタログを作り直す
    pub fn refresh_catalogue(&mut self) {
        let voices = self
            .platform
            .as_ref()
            .map(|platform| platform.voices())
            .unwrap_or_default();

        self.catalogue = VoiceCatalogue::new(voices);
        self.form.voice = self.catalogue.default_selection(&self.locale);

        tracing::debug!(
            voices = self.catalogue.len(),
            selected = ?self.form.voice,
            "📋 音声カタログを再構築"
        );
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.form.text = text.into();
    }

    /// 音声を選択（再生中なら新しい音声で読み上げ直す）
    pub fn select_voice(&mut self, voice: Option<VoiceKey>) -> RestartOutcome {
        self.form.voice = voice;
        self.restart_if_speaking()
    }

    /// 話速を変更（再生中なら読み上げ直す）
    pub fn set_rate(&mut self, rate: impl Into<String>) -> RestartOutcome {
        self.form.rate = rate.into();
        self.restart_if_speaking()
    }

    /// 音高を変更（再生中なら読み上げ直す）
    pub fn set_pitch(&mut self, pitch: impl Into<String>) -> RestartOutcome {
        self.form.pitch = pitch.into();
        self.restart_if_speaking()
    }

    /// 読み上げ
    ///
    /// テキストが空なら通知だけ出してプラットフォームには触れない。
    pub fn speak(&mut self) {
        if self.platform.is_none() {
            tracing::debug!("🔇 音声合成機能がないため読み上げを無視");
            return;
        }

        self.pending_restart = None;
        let text = self.form.text.clone();
        self.speak_text(&text);
    }

    /// 停止
    ///
    /// プラットフォームの状態に関わらずアイドル表示に戻す。
    pub fn stop(&mut self) {
        self.pending_restart = None;

        if let Some(platform) = self.platform.as_mut() {
            if let Err(e) = platform.cancel() {
                tracing::error!("❌ 停止に失敗: {}", e);
            }
        }

        self.current = None;
        self.enter_phase(PlaybackPhase::Idle);
    }

    /// キー入力を処理し、既定動作を抑止すべきならtrueを返す
    pub fn handle_key(&mut self, key: &KeyPress) -> bool {
        if !key.is_speak_shortcut() || self.platform.is_none() {
            return false;
        }
        self.speak();
        true
    }

    /// プラットフォームからの通知を処理
    pub fn handle_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::VoicesChanged => self.refresh_catalogue(),
            PlatformEvent::Started(id) => {
                if self.is_current(id) {
                    tracing::debug!(utterance = %id, "▶️ 読み上げ開始");
                    self.enter_phase(PlaybackPhase::Speaking);
                } else {
                    tracing::debug!(utterance = %id, "古い発話の開始通知を無視");
                }
            }
            PlatformEvent::Ended(id) => {
                if self.is_current(id) {
                    tracing::debug!(utterance = %id, "⏹️ 読み上げ終了");
                    self.finish_current();
                } else {
                    tracing::debug!(utterance = %id, "古い発話の終了通知を無視");
                }
            }
            PlatformEvent::Failed { id, message } => {
                if self.is_current(id) {
                    tracing::error!(utterance = %id, "❌ 読み上げエラー: {}", message);
                    self.finish_current();
                } else {
                    tracing::debug!(utterance = %id, "古い発話のエラー通知を無視: {}", message);
                }
            }
        }
    }

    /// 保留中の再読み上げを実行
    ///
    /// その間に停止や別の読み上げがあった場合は何もしない。
    pub fn complete_restart(&mut self, token: RestartToken) -> bool {
        match self.pending_restart.take() {
            Some(pending) if pending.token == token => {
                tracing::debug!("🔁 保留していた再読み上げを実行");
                self.speak_text(&pending.text);
                true
            }
            other => {
                self.pending_restart = other;
                false
            }
        }
    }

    /// 表示用スナップショット
    pub fn view(&self) -> ControllerView {
        ControllerView {
            available: self.platform.is_some(),
            phase: self.phase,
            controls: self.controls,
            utterance: self.current.as_ref().map(|tracked| tracked.id),
            selector: self.catalogue.selector(self.form.voice.as_ref()),
            form: self.form.clone(),
        }
    }

    /// 溜まっているユーザー向け通知を取り出す
    pub fn take_notices(&mut self) -> Vec<UserNotice> {
        std::mem::take(&mut self.notices)
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn controls(&self) -> ControlState {
        self.controls
    }

    pub fn form(&self) -> &FormValues {
        &self.form
    }

    pub fn catalogue(&self) -> &VoiceCatalogue {
        &self.catalogue
    }

    /// 追跡中の読み上げ要求（デバッグ用）
    pub fn current_request(&self) -> Option<&UtteranceRequest> {
        self.current.as_ref().map(|tracked| &tracked.request)
    }

    pub fn current_utterance(&self) -> Option<&TrackedUtterance> {
        self.current.as_ref()
    }

    fn speak_text(&mut self, text: &str) {
        let request = match build_request(text, &self.form, &self.catalogue) {
            Ok(request) => request,
            Err(notice) => {
                tracing::debug!("💬 ユーザー通知: {}", notice);
                self.notices.push(notice);
                return;
            }
        };
        self.submit(request);
    }

    fn submit(&mut self, request: UtteranceRequest) {
        let busy = self.is_busy();
        let Some(platform) = self.platform.as_mut() else {
            return;
        };

        // 同時に再生される発話は常に一つだけ
        if busy {
            if let Err(e) = platform.cancel() {
                tracing::error!("❌ 読み上げ前のキャンセルに失敗: {}", e);
            }
        }

        self.last_id = self.last_id.next();
        let id = self.last_id;

        match platform.speak(id, &request) {
            Ok(()) => {
                tracing::debug!(
                    utterance = %id,
                    voice = ?request.voice.as_ref().map(|v| v.name.as_str()),
                    rate = ?request.rate,
                    pitch = ?request.pitch,
                    "📢 読み上げを投入"
                );
                self.current = Some(TrackedUtterance { id, request });
            }
            Err(e) => {
                tracing::error!(utterance = %id, "❌ 読み上げの投入に失敗: {}", e);
                self.current = None;
                self.enter_phase(PlaybackPhase::Idle);
            }
        }
    }

    fn restart_if_speaking(&mut self) -> RestartOutcome {
        if self.platform.is_none() || !self.is_busy() {
            return RestartOutcome::NotSpeaking;
        }

        let text = self
            .current
            .as_ref()
            .map(|tracked| tracked.request.text.clone())
            .unwrap_or_else(|| self.form.text.clone());

        self.stop();

        match self.restart_policy {
            RestartPolicy::Immediate => {
                tracing::debug!("🔁 設定変更のため読み上げ直し");
                self.speak_text(&text);
                RestartOutcome::Restarted
            }
            RestartPolicy::Delayed(delay) => {
                self.last_token += 1;
                let token = RestartToken(self.last_token);
                self.pending_restart = Some(PendingRestart { token, text });
                tracing::debug!(delay_ms = delay.as_millis() as u64, "🔁 読み上げ直しを保留");
                RestartOutcome::Deferred { token, delay }
            }
        }
    }

    /// 再生中または再生待ちか
    ///
    /// プラットフォームの状態フラグに加えて、追跡中の発話があれば再生待ちとみなす。
    fn is_busy(&self) -> bool {
        self.phase == PlaybackPhase::Speaking
            || self.current.is_some()
            || self
                .platform
                .as_ref()
                .is_some_and(|platform| platform.status().is_busy())
    }

    fn is_current(&self, id: UtteranceId) -> bool {
        self.current.as_ref().is_some_and(|tracked| tracked.id == id)
    }

    fn finish_current(&mut self) {
        self.current = None;
        self.enter_phase(PlaybackPhase::Idle);
    }

    fn enter_phase(&mut self, phase: PlaybackPhase) {
        self.phase = phase;
        self.controls = if self.platform.is_some() {
            ControlState::reflect(phase)
        } else {
            ControlState::unavailable()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::backends::{PlatformCall, ScriptedHandle, ScriptedPlatform};
    use crate::speech::{event_channel, EventStream, VoiceDescriptor};
    use std::time::Duration;

    fn controller_with(settings: ControllerSettings) -> (UtteranceController, ScriptedHandle, EventStream) {
        let (sink, stream) = event_channel();
        let (platform, handle) = ScriptedPlatform::new(sink);
        handle.set_voices(vec![
            VoiceDescriptor::new("Alex", "en-US"),
            VoiceDescriptor::new("Daniel", "en-GB").with_default(true),
        ]);
        let mut controller = UtteranceController::new(Box::new(platform), settings);
        controller.start();
        (controller, handle, stream)
    }

    fn controller() -> (UtteranceController, ScriptedHandle, EventStream) {
        controller_with(ControllerSettings::default())
    }

    #[test]
    fn test_start_enables_speak_only() {
        let (controller, _handle, _stream) = controller();
        assert!(controller.controls().speak_enabled);
        assert!(!controller.controls().stop_enabled);
        assert_eq!(controller.form().voice, Some(VoiceKey::new("Alex", "en-US")));
    }

    #[test]
    fn test_empty_text_raises_notice_once_without_platform_calls() {
        let (mut controller, handle, _stream) = controller();
        controller.set_text("   ");

        controller.speak();

        assert!(handle.calls().is_empty());
        assert_eq!(controller.take_notices(), vec![UserNotice::EmptyText]);
        assert!(controller.take_notices().is_empty());
        assert_eq!(controller.phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn test_start_and_end_toggle_buttons() {
        let (mut controller, handle, _stream) = controller();
        controller.set_text("hello");
        controller.speak();
        let id = controller.current_utterance().unwrap().id;

        handle.start(id);
        controller.handle_event(PlatformEvent::Started(id));
        assert!(!controller.controls().speak_enabled);
        assert!(controller.controls().stop_enabled);

        handle.finish(id);
        controller.handle_event(PlatformEvent::Ended(id));
        assert!(controller.controls().speak_enabled);
        assert!(!controller.controls().stop_enabled);
        assert!(controller.current_request().is_none());
    }

    #[test]
    fn test_error_is_treated_like_end() {
        let (mut controller, _handle, _stream) = controller();
        controller.set_text("hello");
        controller.speak();
        let id = controller.current_utterance().unwrap().id;
        controller.handle_event(PlatformEvent::Started(id));

        controller.handle_event(PlatformEvent::Failed {
            id,
            message: "synthesis-failed".to_string(),
        });

        assert_eq!(controller.phase(), PlaybackPhase::Idle);
        assert!(controller.controls().speak_enabled);
    }

    #[test]
    fn test_speak_while_speaking_cancels_first() {
        let (mut controller, handle, _stream) = controller();
        controller.set_text("first");
        controller.speak();
        let first = controller.current_utterance().unwrap().id;
        handle.start(first);
        controller.handle_event(PlatformEvent::Started(first));
        handle.clear_calls();

        controller.set_text("second");
        controller.speak();

        let calls = handle.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], PlatformCall::Cancel);
        assert!(matches!(&calls[1], PlatformCall::Speak { request, .. } if request.text == "second"));
    }

    #[test]
    fn test_late_end_of_cancelled_utterance_is_ignored() {
        let (mut controller, handle, _stream) = controller();
        controller.set_text("first");
        controller.speak();
        let first = controller.current_utterance().unwrap().id;
        handle.start(first);
        controller.handle_event(PlatformEvent::Started(first));

        controller.set_text("second");
        controller.speak();
        let second = controller.current_utterance().unwrap().id;
        handle.start(second);
        controller.handle_event(PlatformEvent::Started(second));

        controller.handle_event(PlatformEvent::Ended(first));
        assert_eq!(controller.phase(), PlaybackPhase::Speaking);
        assert!(controller.controls().stop_enabled);
    }

    #[test]
    fn test_stop_forces_idle_regardless_of_platform() {
        let (mut controller, handle, _stream) = controller();
        controller.set_text("hello");
        controller.speak();
        let id = controller.current_utterance().unwrap().id;
        controller.handle_event(PlatformEvent::Started(id));

        // プラットフォームがまだ再生中と言っていてもアイドルに戻す
        handle.set_status(crate::speech::PlatformStatus {
            speaking: true,
            pending: false,
        });
        controller.stop();

        assert!(controller.controls().speak_enabled);
        assert!(!controller.controls().stop_enabled);
        assert!(controller.current_request().is_none());
        assert_eq!(handle.cancel_count(), 1);
    }

    #[test]
    fn test_stop_while_idle_still_cancels() {
        let (mut controller, handle, _stream) = controller();
        controller.stop();
        assert_eq!(handle.calls(), vec![PlatformCall::Cancel]);
        assert_eq!(controller.controls(), ControlState::reflect(PlaybackPhase::Idle));
    }

    #[test]
    fn test_rate_change_while_idle_does_not_restart() {
        let (mut controller, handle, _stream) = controller();
        controller.set_text("hello");

        assert_eq!(controller.set_rate("2"), RestartOutcome::NotSpeaking);
        assert!(handle.calls().is_empty());
        assert_eq!(controller.form().rate, "2");
    }

    #[test]
    fn test_voice_change_while_speaking_restarts_same_text() {
        let (mut controller, handle, _stream) = controller();
        controller.set_text("hello there");
        controller.speak();
        let first = controller.current_utterance().unwrap().id;
        handle.start(first);
        controller.handle_event(PlatformEvent::Started(first));
        controller.set_text("edited but not spoken");
        handle.clear_calls();

        let outcome = controller.select_voice(Some(VoiceKey::new("Daniel", "en-GB")));

        assert_eq!(outcome, RestartOutcome::Restarted);
        let spoken = handle.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].1.text, "hello there");
        assert_eq!(
            spoken[0].1.voice.as_ref().map(|v| v.name.as_str()),
            Some("Daniel")
        );
        assert_eq!(handle.calls()[0], PlatformCall::Cancel);
    }

    #[test]
    fn test_delayed_restart_waits_for_completion() {
        let settings = ControllerSettings {
            restart: RestartPolicy::Delayed(Duration::from_millis(100)),
            ..ControllerSettings::default()
        };
        let (mut controller, handle, _stream) = controller_with(settings);
        controller.set_text("hello");
        controller.speak();
        let first = controller.current_utterance().unwrap().id;
        handle.start(first);
        controller.handle_event(PlatformEvent::Started(first));
        handle.clear_calls();

        let outcome = controller.set_pitch("1.5");
        let RestartOutcome::Deferred { token, delay } = outcome else {
            panic!("expected deferred restart, got {:?}", outcome);
        };
        assert_eq!(delay, Duration::from_millis(100));
        assert_eq!(handle.calls(), vec![PlatformCall::Cancel]);
        assert_eq!(controller.phase(), PlaybackPhase::Idle);

        assert!(controller.complete_restart(token));
        let spoken = handle.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].1.pitch, Some(1.5));
        assert!(!controller.complete_restart(token));
    }

    #[test]
    fn test_stop_invalidates_pending_restart() {
        let settings = ControllerSettings {
            restart: RestartPolicy::Delayed(Duration::from_millis(100)),
            ..ControllerSettings::default()
        };
        let (mut controller, handle, _stream) = controller_with(settings);
        controller.set_text("hello");
        controller.speak();
        let first = controller.current_utterance().unwrap().id;
        handle.start(first);

        let RestartOutcome::Deferred { token, .. } = controller.set_rate("3") else {
            panic!("expected deferred restart");
        };
        controller.stop();

        assert!(!controller.complete_restart(token));
        assert_eq!(handle.spoken().len(), 1);
    }

    #[test]
    fn test_submit_failure_resets_to_idle() {
        let (mut controller, handle, _stream) = controller();
        handle.fail_next_speak("no audio device");
        controller.set_text("hello");

        controller.speak();

        assert!(controller.current_request().is_none());
        assert_eq!(controller.phase(), PlaybackPhase::Idle);
        assert!(controller.controls().speak_enabled);
    }

    #[test]
    fn test_voices_changed_rebuilds_and_reselects() {
        let (mut controller, handle, _stream) = controller();
        controller.select_voice(Some(VoiceKey::new("Daniel", "en-GB")));

        handle.set_voices(vec![
            VoiceDescriptor::new("Amelie", "fr-FR").with_default(true),
            VoiceDescriptor::new("Anna", "de-DE"),
        ]);
        controller.handle_event(PlatformEvent::VoicesChanged);

        let view = controller.view();
        assert_eq!(view.selector.options.len(), 2);
        assert_eq!(view.selector.selected, Some(VoiceKey::new("Amelie", "fr-FR")));
    }

    #[test]
    fn test_empty_catalogue_disables_selector_but_speak_works() {
        let (mut controller, handle, _stream) = controller();
        handle.set_voices(Vec::new());
        controller.handle_event(PlatformEvent::VoicesChanged);

        let view = controller.view();
        assert!(!view.selector.enabled);
        assert_eq!(view.selector.options.len(), 1);
        assert_eq!(view.selector.options[0].label, NO_VOICES_LABEL);

        controller.set_text("hello");
        controller.speak();
        let spoken = handle.spoken();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].1.voice, None);
    }

    #[test]
    fn test_without_platform_keeps_buttons_disabled() {
        let mut controller = UtteranceController::without_platform(ControllerSettings::default());
        controller.start();
        controller.set_text("hello");
        controller.speak();
        controller.stop();

        let view = controller.view();
        assert!(!view.available);
        assert!(!view.controls.speak_enabled);
        assert!(!view.controls.stop_enabled);
        assert!(!controller.handle_key(&KeyPress::new("Enter").with_ctrl()));
    }

    #[test]
    fn test_shortcut_speaks() {
        let (mut controller, handle, _stream) = controller();
        controller.set_text("shortcut");

        assert!(!controller.handle_key(&KeyPress::new("Enter")));
        assert!(handle.spoken().is_empty());

        assert!(controller.handle_key(&KeyPress::new("Enter").with_meta()));
        assert_eq!(handle.spoken().len(), 1);
    }
}
