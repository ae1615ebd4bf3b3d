use clap::{Parser, Subcommand};
use speakpad::{
    controller::{ControllerSettings, UtteranceController},
    gui::{config_manager, utils},
    speech::{backends::create_platform, config::PlatformKind, event_channel, EventStream},
    Session, SessionUpdate, SpeakpadError, SpeakpadResult, UiCommand,
};
use std::path::PathBuf;
use std::time::Duration;

/// ヘッドレスで音声一覧の確認と読み上げを行うCLI
#[derive(Parser)]
#[command(name = "speakpad-cli")]
#[command(about = "Speak text through the configured speech platform")]
struct Cli {
    /// 設定ファイルのパス（省略時はXDG設定ディレクトリ）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 設定ファイルのプラットフォーム指定を上書き
    #[arg(long, global = true, value_enum)]
    platform: Option<PlatformKind>,

    /// 音声一覧の到着を待つ時間（ミリ秒）
    #[arg(long, global = true, default_value_t = 1500)]
    wait_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 利用可能な音声を表示
    Voices,
    /// テキストを読み上げて終了
    Say {
        text: String,
        /// 音声名
        #[arg(long)]
        voice: Option<String>,
        /// 言語タグ（同名の音声が複数ある場合に指定）
        #[arg(long)]
        lang: Option<String>,
        #[arg(long)]
        rate: Option<String>,
        #[arg(long)]
        pitch: Option<String>,
    },
    /// 設定ファイルのパスを表示
    ConfigPath,
}

#[tokio::main]
async fn main() -> SpeakpadResult<()> {
    let cli = Cli::parse();

    let config_manager = match &cli.config {
        Some(path) => config_manager::ConfigManager::with_path(path)?,
        None => config_manager::ConfigManager::new()?,
    };

    if let Command::ConfigPath = cli.command {
        println!("{}", config_manager.config_file_path().display());
        return Ok(());
    }

    let mut config = config_manager.load_or_default();
    if let Some(platform) = cli.platform {
        config.platform = platform;
    }
    let _log_guard = utils::init_logging(&config.log)?;

    let wait = Duration::from_millis(cli.wait_ms);
    let (mut controller, mut events) = build_controller(&config);
    if !controller.is_available() {
        let hint = if config.platform.is_built_in() {
            String::new()
        } else {
            format!(" (rebuild with --features {})", config.platform)
        };
        return Err(SpeakpadError::configuration(format!(
            "speech platform '{}' is not available{}",
            config.platform, hint
        )));
    }
    controller.start();
    wait_for_voices(&mut controller, &mut events, wait).await;

    match cli.command {
        Command::Voices => {
            print_voices(&controller);
            Ok(())
        }
        Command::Say {
            text,
            voice,
            lang,
            rate,
            pitch,
        } => {
            if let Some(name) = voice {
                let key = controller
                    .catalogue()
                    .voices()
                    .iter()
                    .find(|v| v.name == name && lang.as_ref().is_none_or(|l| &v.lang == l))
                    .map(|v| v.key())
                    .ok_or_else(|| SpeakpadError::configuration(format!("unknown voice: {}", name)))?;
                controller.select_voice(Some(key));
            }
            if let Some(rate) = rate {
                controller.set_rate(rate);
            }
            if let Some(pitch) = pitch {
                controller.set_pitch(pitch);
            }
            controller.set_text(text);
            say(controller, events).await
        }
        Command::ConfigPath => Ok(()),
    }
}

fn build_controller(config: &config_manager::AppConfig) -> (UtteranceController, EventStream) {
    let (sink, stream) = event_channel();
    let settings: ControllerSettings = config.controller_settings();

    let controller = match create_platform(config.platform, &config.voicevox, sink) {
        Ok(platform) => UtteranceController::new(platform, settings),
        Err(e) => {
            tracing::debug!("音声合成プラットフォームを初期化できません: {}", e);
            UtteranceController::without_platform(settings)
        }
    };
    (controller, stream)
}

/// 最初の音声一覧変更通知を待つ
///
/// 待ち終えた時点で溜まっている通知も処理し、セッション開始後に
/// 音声一覧が作り直されて選択が戻らないようにする。
async fn wait_for_voices(
    controller: &mut UtteranceController,
    events: &mut EventStream,
    wait: Duration,
) {
    let deadline = tokio::time::Instant::now() + wait;
    while controller.catalogue().is_empty() {
        match tokio::time::timeout_at(deadline, events.recv()).await {
            Ok(Some(event)) => controller.handle_event(event),
            Ok(None) => break,
            Err(_) => {
                tracing::debug!("⏱️ 音声一覧の待ち時間が経過しました");
                break;
            }
        }
    }

    while let Ok(event) = events.try_recv() {
        controller.handle_event(event);
    }
}

fn print_voices(controller: &UtteranceController) {
    let view = controller.view();
    for option in &view.selector.options {
        let marker = match (&option.key, &view.selector.selected) {
            (Some(key), Some(selected)) if key == selected => "*",
            _ => " ",
        };
        println!("{} {}", marker, option.label);
    }
}

/// 読み上げを投入し、セッション経由で終了またはエラーまで待つ
async fn say(mut controller: UtteranceController, events: EventStream) -> SpeakpadResult<()> {
    controller.speak();
    if let Some(notice) = controller.take_notices().into_iter().next() {
        return Err(SpeakpadError::General(anyhow::anyhow!("{}", notice)));
    }
    if controller.current_utterance().is_none() {
        return Err(SpeakpadError::General(anyhow::anyhow!(
            "failed to submit utterance"
        )));
    }

    let (session, mut handle) = Session::new(controller, events);
    let running = tokio::spawn(session.run());

    let commands = handle.commands.clone();
    ctrlc::set_handler(move || {
        tracing::info!("🛑 終了シグナルを受信しました");
        let _ = commands.send(UiCommand::Stop);
    })
    .map_err(|e| SpeakpadError::configuration(format!("Failed to set signal handler: {}", e)))?;

    while let Some(update) = handle.next_update().await {
        match update {
            SessionUpdate::View(view) if view.utterance.is_none() => break,
            SessionUpdate::View(view) => {
                tracing::debug!(phase = %view.phase, "📊 再生状態");
            }
            SessionUpdate::Notice(notice) => eprintln!("{}", notice),
        }
    }

    handle.send(UiCommand::Shutdown)?;
    running
        .await
        .map_err(|e| SpeakpadError::General(anyhow::anyhow!("session task failed: {}", e)))?;
    Ok(())
}
