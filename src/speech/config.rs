//! 音声合成プラットフォーム設定構造体

use serde::{Deserialize, Serialize};

/// プラットフォームの種類
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// OS標準の音声合成
    Native,
    /// VOICEVOX
    Voicevox,
    /// 音を出さずにログへ出力
    Silent,
}

impl PlatformKind {
    /// このビルドに含まれているか
    pub fn is_built_in(self) -> bool {
        match self {
            PlatformKind::Native => cfg!(feature = "native"),
            PlatformKind::Voicevox => cfg!(feature = "voicevox"),
            PlatformKind::Silent => true,
        }
    }
}

impl Default for PlatformKind {
    /// OS音声がビルドに含まれていればそれを、なければ無音を使う
    fn default() -> Self {
        if PlatformKind::Native.is_built_in() {
            PlatformKind::Native
        } else {
            PlatformKind::Silent
        }
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformKind::Native => write!(f, "native"),
            PlatformKind::Voicevox => write!(f, "voicevox"),
            PlatformKind::Silent => write!(f, "silent"),
        }
    }
}

/// VOICEVOX固有設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoicevoxConfig {
    /// ホスト名
    pub host: String,
    /// ポート番号
    pub port: u16,
    /// 既定の話者（スタイル）ID
    pub speaker_id: i32,
    /// 音量スケール (0.0〜2.0、デフォルト1.0)
    #[serde(default = "default_volume_scale")]
    pub volume_scale: f32,
    /// 抑揚スケール (0.0〜2.0、デフォルト1.0)
    #[serde(default = "default_intonation_scale")]
    pub intonation_scale: f32,
    /// HTTPタイムアウト（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_volume_scale() -> f32 {
    1.0
}

fn default_intonation_scale() -> f32 {
    1.0
}

fn default_timeout_secs() -> u64 {
    30
}

impl VoicevoxConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Default for VoicevoxConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 50021,
            speaker_id: 1, // 四国めたん（ノーマル）
            volume_scale: 1.0,
            intonation_scale: 1.0,
            timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_voicevox_config() {
        let config = VoicevoxConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 50021);
        assert_eq!(config.speaker_id, 1);
        assert_eq!(config.base_url(), "http://localhost:50021");
    }

    #[test]
    fn test_platform_kind_serializes_lowercase() {
        let json = serde_json::to_string(&PlatformKind::Voicevox).unwrap();
        assert_eq!(json, "\"voicevox\"");
        assert_eq!(PlatformKind::Silent.to_string(), "silent");
    }

    #[test]
    fn test_default_platform_is_built_in() {
        let kind = PlatformKind::default();
        assert!(kind.is_built_in());

        #[cfg(feature = "native")]
        assert_eq!(kind, PlatformKind::Native);
        #[cfg(not(feature = "native"))]
        assert_eq!(kind, PlatformKind::Silent);
    }
}
