use dioxus::prelude::*;
use speakpad::{
    gui::{components::SpeechPanel, config_manager, hooks::use_speech_session, utils},
    SpeakpadError, SpeakpadResult,
};

/// Dioxusベースのspeakpad GUI アプリケーション
fn app() -> Element {
    let config = use_context::<config_manager::AppConfig>();
    let session = use_speech_session(config);
    use_context_provider(|| session.clone());

    rsx! {
        div {
            class: "app",
            style: "
                min-height: 100vh;
                margin: 0;
                padding: 16px;
                box-sizing: border-box;
                background: #f0f2f5;
                font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            ",

            SpeechPanel {}
        }
    }
}

fn main() -> SpeakpadResult<()> {
    let config_manager = config_manager::ConfigManager::new()?;
    let config = config_manager.load_or_default();

    // tokio-consoleの初期化（プロファイリング用）
    #[cfg(feature = "debug-tokio")]
    console_subscriber::init();

    #[cfg(not(feature = "debug-tokio"))]
    let _log_guard = utils::init_logging(&config.log)?;

    tracing::info!("🎬 Starting speakpad GUI");
    tracing::info!(
        "🪟 ウィンドウ設定: {}x{} at ({}, {}), 最大化: {}",
        config.window.width,
        config.window.height,
        config.window.x,
        config.window.y,
        config.window.maximized
    );

    let launch_builder = dioxus::LaunchBuilder::desktop()
        .with_cfg(
            dioxus::desktop::Config::new().with_window(
                dioxus::desktop::tao::window::WindowBuilder::new()
                    .with_title(config.window.title.clone())
                    .with_inner_size(dioxus::desktop::tao::dpi::LogicalSize::new(
                        config.window.width as f64,
                        config.window.height as f64,
                    ))
                    .with_position(dioxus::desktop::tao::dpi::LogicalPosition::new(
                        config.window.x as f64,
                        config.window.y as f64,
                    ))
                    .with_maximized(config.window.maximized)
                    .with_resizable(true),
            ),
        )
        .with_context(config);

    // Ctrl+Cシグナルハンドラー
    ctrlc::set_handler(move || {
        tracing::info!("🛑 終了シグナルを受信しました");
        std::process::exit(0);
    })
    .map_err(|e| SpeakpadError::configuration(format!("Failed to set signal handler: {}", e)))?;

    launch_builder.launch(app);

    tracing::info!("👋 speakpad GUI shutting down");
    Ok(())
}
