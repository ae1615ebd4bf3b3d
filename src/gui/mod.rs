// Core modules
pub mod config_manager; // 設定管理モジュール
pub mod utils; // ログ初期化などのユーティリティ

// Dioxus UI components
#[cfg(feature = "desktop")]
pub mod components;
#[cfg(feature = "desktop")]
pub mod hooks;

pub use config_manager::{AppConfig, ConfigManager, LogConfig, WindowConfig};
