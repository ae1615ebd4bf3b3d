//! 音声（ボイス）の記述子

use serde::{Deserialize, Serialize};

/// プラットフォームが提供する音声の記述子
///
/// プラットフォームから丸ごと受け取るだけで、コントローラー側では変更しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    /// 音声名
    pub name: String,
    /// 言語タグ（例: `en-US`）
    pub lang: String,
    /// プラットフォームの既定音声か
    pub is_default: bool,
    /// バックエンド固有の識別子（OSの音声ID、VOICEVOXのスタイルIDなど）
    pub uri: String,
}

impl VoiceDescriptor {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            uri: name.clone(),
            name,
            lang: lang.into(),
            is_default: false,
        }
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    /// 安定キーを取得
    pub fn key(&self) -> VoiceKey {
        VoiceKey {
            name: self.name.clone(),
            lang: self.lang.clone(),
        }
    }

    /// セレクタに表示するラベル
    pub fn label(&self) -> String {
        if self.is_default {
            format!("{} ({}) — default", self.name, self.lang)
        } else {
            format!("{} ({})", self.name, self.lang)
        }
    }
}

/// 音声の安定キー（名前 + 言語タグ）
///
/// カタログ再構築をまたいでも位置に依存せず同じ音声を指す。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("{name} ({lang})")]
pub struct VoiceKey {
    pub name: String,
    pub lang: String,
}

impl VoiceKey {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }

    pub fn matches(&self, voice: &VoiceDescriptor) -> bool {
        self.name == voice.name && self.lang == voice.lang
    }
}
