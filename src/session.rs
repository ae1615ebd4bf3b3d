//! 読み上げセッション
//!
//! UIからのコマンドとプラットフォーム通知を一本のループで順番に処理する。
//! コントローラーに触れるのはこのループだけ。

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::controller::{
    ControllerView, KeyPress, RestartOutcome, RestartToken, UserNotice, UtteranceController,
};
use crate::error::{SpeakpadError, SpeakpadResult};
use crate::speech::{EventStream, VoiceKey};

/// UIからのコマンド
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    SetText(String),
    SelectVoice(Option<VoiceKey>),
    SetRate(String),
    SetPitch(String),
    Speak,
    Stop,
    Key(KeyPress),
    RefreshVoices,
    Shutdown,
}

/// UIへの更新通知
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    View(ControllerView),
    Notice(UserNotice),
}

/// UI側が持つハンドル
pub struct SessionHandle {
    pub commands: mpsc::UnboundedSender<UiCommand>,
    pub updates: mpsc::UnboundedReceiver<SessionUpdate>,
}

impl SessionHandle {
    /// コマンドを送信
    pub fn send(&self, command: UiCommand) -> SpeakpadResult<()> {
        self.commands
            .send(command)
            .map_err(|_| SpeakpadError::SessionClosed)
    }

    /// 次の更新を待つ
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        self.updates.recv().await
    }
}

/// 読み上げセッション
pub struct Session {
    controller: UtteranceController,
    events: EventStream,
    commands: mpsc::UnboundedReceiver<UiCommand>,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    restart_at: Option<(RestartToken, Instant)>,
}

impl Session {
    pub fn new(controller: UtteranceController, events: EventStream) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        let session = Self {
            controller,
            events,
            commands: command_rx,
            updates: update_tx,
            restart_at: None,
        };
        let handle = SessionHandle {
            commands: command_tx,
            updates: update_rx,
        };
        (session, handle)
    }

    /// セッションループを実行
    ///
    /// コントローラーは [`UtteranceController::start`] 済みであること。
    /// 開始直後に初期状態の `View` を一度送る。
    /// `Shutdown` を受けるか、コマンド送信側がすべて閉じると再生を止めて終了する。
    /// 終了後のコントローラーを返す。
    pub async fn run(mut self) -> UtteranceController {
        tracing::info!("🚀 読み上げセッション開始");
        self.publish();

        let mut events_open = true;

        loop {
            let deadline = self
                .restart_at
                .map(|(_, at)| at)
                .unwrap_or_else(Instant::now);

            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(UiCommand::Shutdown) | None => break,
                        Some(command) => self.apply(command),
                    }
                }
                event = self.events.recv(), if events_open => {
                    match event {
                        Some(event) => self.controller.handle_event(event),
                        None => {
                            tracing::debug!("プラットフォーム通知チャネルが閉じました");
                            events_open = false;
                            continue;
                        }
                    }
                }
                _ = sleep_until(deadline), if self.restart_at.is_some() => {
                    if let Some((token, _)) = self.restart_at.take() {
                        self.controller.complete_restart(token);
                    }
                }
            }

            self.publish();
        }

        self.controller.stop();
        self.publish();
        tracing::info!("🛑 読み上げセッション終了");
        self.controller
    }

    fn apply(&mut self, command: UiCommand) {
        tracing::trace!(?command, "UIコマンド");
        match command {
            UiCommand::SetText(text) => self.controller.set_text(text),
            UiCommand::SelectVoice(voice) => {
                let outcome = self.controller.select_voice(voice);
                self.schedule(outcome);
            }
            UiCommand::SetRate(rate) => {
                let outcome = self.controller.set_rate(rate);
                self.schedule(outcome);
            }
            UiCommand::SetPitch(pitch) => {
                let outcome = self.controller.set_pitch(pitch);
                self.schedule(outcome);
            }
            UiCommand::Speak => {
                self.restart_at = None;
                self.controller.speak();
            }
            UiCommand::Stop => {
                self.restart_at = None;
                self.controller.stop();
            }
            UiCommand::Key(key) => {
                if self.controller.handle_key(&key) {
                    self.restart_at = None;
                }
            }
            UiCommand::RefreshVoices => self.controller.refresh_catalogue(),
            // ループ側で処理
            UiCommand::Shutdown => {}
        }
    }

    fn schedule(&mut self, outcome: RestartOutcome) {
        self.restart_at = match outcome {
            RestartOutcome::Deferred { token, delay } => Some((token, Instant::now() + delay)),
            RestartOutcome::Restarted => None,
            RestartOutcome::NotSpeaking => self.restart_at,
        };
    }

    fn publish(&mut self) {
        // 通知を先に送り、最後に最新の表示状態を送る
        let mut updates: Vec<SessionUpdate> = self
            .controller
            .take_notices()
            .into_iter()
            .map(SessionUpdate::Notice)
            .collect();
        updates.push(SessionUpdate::View(self.controller.view()));

        for update in updates {
            if self.updates.send(update).is_err() {
                tracing::debug!("UI側の受信が閉じています");
                break;
            }
        }
    }
}
