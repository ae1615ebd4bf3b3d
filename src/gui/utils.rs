// GUI・CLI共通のユーティリティ関数

use anyhow::Context;
use directories::ProjectDirs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::gui::config_manager::LogConfig;

/// ログファイル名の接頭辞
const LOG_FILE_PREFIX: &str = "speakpad.log";

/// ログ出力先ディレクトリ
pub fn log_directory(config: &LogConfig) -> Option<PathBuf> {
    config.log_dir.clone().or_else(|| {
        ProjectDirs::from("dev", "speakpad", "speakpad")
            .map(|dirs| dirs.data_local_dir().join("logs"))
    })
}

/// ログ初期化
///
/// `RUST_LOG` があればそれを優先し、なければ設定のログレベルを使う。
/// ファイル出力が有効な場合は日次ローテーションのファイルにも書き出し、
/// 書き込みスレッドのガードを返す（呼び出し側で保持すること）。
pub fn init_logging(config: &LogConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("Invalid log level: {}", config.log_level))?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let (file_layer, guard) = match log_directory(config).filter(|_| config.enable_file_logging) {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    if let Some(dir) = log_directory(config).filter(|_| guard.is_some()) {
        tracing::info!("📝 ログファイル出力先: {}", dir.display());
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_log_directory_wins() {
        let config = LogConfig {
            log_dir: Some(PathBuf::from("/tmp/speakpad-logs")),
            ..LogConfig::default()
        };
        assert_eq!(log_directory(&config), Some(PathBuf::from("/tmp/speakpad-logs")));
    }
}
