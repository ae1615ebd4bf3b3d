//! 読み上げセッション用カスタムフック
//!
//! コンポーネントの初回描画時にプラットフォームとセッションを組み立て、
//! セッションからの更新をSignalへ流し込む。話速・音高の変更は設定ファイルへ保存する。

use dioxus::prelude::*;
use tokio::sync::mpsc;

use crate::controller::{ControllerView, UserNotice, UtteranceController};
use crate::gui::config_manager::{AppConfig, ConfigManager};
use crate::session::{Session, SessionHandle, SessionUpdate, UiCommand};
use crate::speech::{backends::create_platform, event_channel};

/// UI側から見た読み上げセッション
#[derive(Clone)]
pub struct SpeechSessionHandle {
    commands: mpsc::UnboundedSender<UiCommand>,
    pub view: Signal<ControllerView>,
    pub notice: Signal<Option<UserNotice>>,
}

impl SpeechSessionHandle {
    /// コマンドをセッションへ送る
    pub fn send(&self, command: UiCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!("⚠️ 読み上げセッションは終了しています");
        }
    }

    /// 表示中の通知を閉じる
    pub fn dismiss_notice(&mut self) {
        self.notice.set(None);
    }
}

/// 読み上げセッションを起動して、そのハンドルを返す
pub fn use_speech_session(config: AppConfig) -> SpeechSessionHandle {
    let mut view = use_signal(ControllerView::default);
    let mut notice = use_signal(|| None::<UserNotice>);

    let commands = use_hook(move || {
        let (sink, stream) = event_channel();
        let settings = config.controller_settings();

        let mut controller = match create_platform(config.platform, &config.voicevox, sink) {
            Ok(platform) => UtteranceController::new(platform, settings),
            Err(e) => {
                // 利用不可の警告はコントローラー起動時に一度だけ出す
                tracing::debug!("音声合成プラットフォーム({})を初期化できません: {}", config.platform, e);
                UtteranceController::without_platform(settings)
            }
        };

        controller.start();

        let (session, handle) = Session::new(controller, stream);
        let SessionHandle {
            commands,
            mut updates,
        } = handle;

        spawn(async move {
            session.run().await;
        });

        let mut saved = config;
        spawn(async move {
            let config_manager = ConfigManager::new()
                .map_err(|e| tracing::warn!("⚠️ 設定を保存できません: {:#}", e))
                .ok();

            while let Some(update) = updates.recv().await {
                match update {
                    SessionUpdate::View(next) => {
                        if saved.remember_form(&next.form) {
                            if let Some(manager) = config_manager.as_ref() {
                                if let Err(e) = manager.save_config(&saved) {
                                    tracing::warn!("⚠️ 話速・音高の保存に失敗: {:#}", e);
                                }
                            }
                        }
                        view.set(next);
                    }
                    SessionUpdate::Notice(next) => notice.set(Some(next)),
                }
            }
            tracing::debug!("📡 セッション更新の購読を終了");
        });

        commands
    });

    SpeechSessionHandle {
        commands,
        view,
        notice,
    }
}
