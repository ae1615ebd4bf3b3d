//! アプリケーション設定管理モジュール
//!
//! XDGディレクトリを使用した設定ファイルの永続化と管理を提供します。

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::controller::{
    catalogue::DEFAULT_LOCALE_PATTERN, ControllerSettings, FormValues, LocalePreference,
    RestartConfig, RestartPolicy,
};
use crate::speech::config::{PlatformKind, VoicevoxConfig};

/// ウィンドウ設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
    pub maximized: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Speakpad".to_string(),
            width: 560,
            height: 520,
            x: 100,
            y: 100,
            maximized: false,
        }
    }
}

/// ログ設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// カスタムログディレクトリ（Noneの場合はXDGデフォルト使用）
    pub log_dir: Option<PathBuf>,
    /// ログレベル (trace/debug/info/warn/error)
    pub log_level: String,
    /// ファイル出力有効化
    pub enable_file_logging: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            log_level: "info".to_string(),
            enable_file_logging: false,
        }
    }
}

/// フォームの初期値
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormConfig {
    #[serde(default)]
    pub text: String,
    pub rate: String,
    pub pitch: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        let form = FormValues::default();
        Self {
            text: form.text,
            rate: form.rate,
            pitch: form.pitch,
        }
    }
}

impl From<&FormConfig> for FormValues {
    fn from(config: &FormConfig) -> Self {
        Self {
            text: config.text.clone(),
            voice: None,
            rate: config.rate.clone(),
            pitch: config.pitch.clone(),
        }
    }
}

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 使用する音声合成プラットフォーム
    #[serde(default)]
    pub platform: PlatformKind,

    /// 既定音声を選ぶロケールパターン（正規表現）
    #[serde(default = "default_locale_pattern")]
    pub locale_pattern: String,

    /// 再生中の設定変更時の再読み上げ
    #[serde(default)]
    pub restart: RestartConfig,

    /// フォーム初期値
    #[serde(default)]
    pub form: FormConfig,

    /// VOICEVOX設定
    #[serde(default)]
    pub voicevox: VoicevoxConfig,

    /// ウィンドウ設定
    #[serde(default)]
    pub window: WindowConfig,

    /// ログ設定
    #[serde(default)]
    pub log: LogConfig,
}

fn default_locale_pattern() -> String {
    DEFAULT_LOCALE_PATTERN.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            platform: PlatformKind::default(),
            locale_pattern: default_locale_pattern(),
            restart: RestartConfig::default(),
            form: FormConfig::default(),
            voicevox: VoicevoxConfig::default(),
            window: WindowConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// コントローラー設定に変換
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            locale: LocalePreference::new(&self.locale_pattern),
            restart: RestartPolicy::from(&self.restart),
            form: FormValues::from(&self.form),
        }
    }

    /// 話速・音高の現在値を次回起動時の初期値として覚える
    ///
    /// 値が変わった場合は `true` を返す。テキストと音声選択は保存しない。
    pub fn remember_form(&mut self, form: &FormValues) -> bool {
        if self.form.rate == form.rate && self.form.pitch == form.pitch {
            return false;
        }
        self.form.rate = form.rate.clone();
        self.form.pitch = form.pitch.clone();
        true
    }
}

/// 設定管理マネージャー
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// 新しい設定マネージャーを作成
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_config_path()?)
    }

    /// 指定したパスを使う設定マネージャーを作成
    pub fn with_path(config_path: impl Into<PathBuf>) -> Result<Self> {
        let config_path = config_path.into();

        // 設定ディレクトリを作成（存在しない場合）
        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        Ok(Self { config_path })
    }

    /// XDGディレクトリに基づく設定ファイルパスを取得
    pub fn default_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("dev", "speakpad", "speakpad")
            .context("Failed to get project directories")?;

        let config_file = project_dirs.config_dir().join("config.toml");

        debug!("Config file path: {}", config_file.display());

        Ok(config_file)
    }

    /// 設定を読み込み
    pub fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(
                "Config file not found, using default settings: {}",
                self.config_path.display()
            );
            return Ok(AppConfig::default());
        }

        let config_content = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        let config: AppConfig = toml::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse config file: {}",
                self.config_path.display()
            )
        })?;

        info!(
            "✅ Configuration loaded from: {}",
            self.config_path.display()
        );

        Ok(config)
    }

    /// 設定を保存
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        let config_content =
            toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(&self.config_path, config_content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;

        info!("💾 Configuration saved to: {}", self.config_path.display());

        Ok(())
    }

    /// 設定ファイルパスを取得（デバッグ用）
    pub fn config_file_path(&self) -> &Path {
        &self.config_path
    }

    /// 設定を読み込み、失敗した場合はデフォルト値を使う
    pub fn load_or_default(&self) -> AppConfig {
        self.load_config().unwrap_or_else(|e| {
            tracing::warn!("⚠️ 設定の読み込みに失敗したためデフォルト値を使用: {:#}", e);
            AppConfig::default()
        })
    }
}
