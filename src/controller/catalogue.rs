//! 音声カタログとセレクタ表示
//!
//! カタログは通知のたびに丸ごと作り直す（差分更新はしない）。

use regex::{Regex, RegexBuilder};

use crate::speech::{VoiceDescriptor, VoiceKey};

/// 音声が一つもないときのプレースホルダー
pub const NO_VOICES_LABEL: &str = "No voices available";

/// 既定のロケールパターン
pub const DEFAULT_LOCALE_PATTERN: &str = "en-US";

/// 優先ロケールの判定
#[derive(Debug, Clone)]
pub struct LocalePreference {
    source: String,
    matcher: LocaleMatcher,
}

#[derive(Debug, Clone)]
enum LocaleMatcher {
    Pattern(Regex),
    /// 小文字化済みのリテラル
    Literal(String),
}

impl LocalePreference {
    /// 大文字小文字を区別しない正規表現として解釈する
    ///
    /// 不正なパターンはリテラルとして扱う。
    pub fn new(pattern: &str) -> Self {
        let matcher = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(regex) => LocaleMatcher::Pattern(regex),
            Err(e) => {
                tracing::warn!("⚠️ ロケールパターンが不正なためリテラルとして扱います: {}", e);
                LocaleMatcher::Literal(pattern.to_lowercase())
            }
        };

        Self {
            source: pattern.to_string(),
            matcher,
        }
    }

    pub fn matches(&self, lang: &str) -> bool {
        match &self.matcher {
            LocaleMatcher::Pattern(regex) => regex.is_match(lang),
            LocaleMatcher::Literal(literal) => lang.to_lowercase().contains(literal.as_str()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Default for LocalePreference {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE_PATTERN)
    }
}

/// セレクタの選択肢
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceOption {
    pub label: String,
    /// プレースホルダーはNone
    pub key: Option<VoiceKey>,
    pub enabled: bool,
}

/// セレクタの表示状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorView {
    pub options: Vec<VoiceOption>,
    pub selected: Option<VoiceKey>,
    pub enabled: bool,
}

impl Default for SelectorView {
    fn default() -> Self {
        VoiceCatalogue::default().selector(None)
    }
}

/// 音声カタログ
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceCatalogue {
    voices: Vec<VoiceDescriptor>,
}

impl VoiceCatalogue {
    pub fn new(voices: Vec<VoiceDescriptor>) -> Self {
        Self { voices }
    }

    pub fn voices(&self) -> &[VoiceDescriptor] {
        &self.voices
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// キーを現在のカタログで解決
    pub fn resolve(&self, key: &VoiceKey) -> Option<&VoiceDescriptor> {
        self.voices.iter().find(|voice| key.matches(voice))
    }

    /// 既定の選択を決める
    ///
    /// 優先ロケールに一致する最初の音声、なければ既定フラグ付きの音声、なければ先頭。
    pub fn default_selection(&self, locale: &LocalePreference) -> Option<VoiceKey> {
        self.voices
            .iter()
            .find(|voice| locale.matches(&voice.lang))
            .or_else(|| self.voices.iter().find(|voice| voice.is_default))
            .or_else(|| self.voices.first())
            .map(VoiceDescriptor::key)
    }

    /// セレクタの表示状態を組み立てる
    pub fn selector(&self, selected: Option<&VoiceKey>) -> SelectorView {
        if self.voices.is_empty() {
            return SelectorView {
                options: vec![VoiceOption {
                    label: NO_VOICES_LABEL.to_string(),
                    key: None,
                    enabled: false,
                }],
                selected: None,
                enabled: false,
            };
        }

        SelectorView {
            options: self
                .voices
                .iter()
                .map(|voice| VoiceOption {
                    label: voice.label(),
                    key: Some(voice.key()),
                    enabled: true,
                })
                .collect(),
            selected: selected.filter(|key| self.resolve(key).is_some()).cloned(),
            enabled: true,
        }
    }
}
