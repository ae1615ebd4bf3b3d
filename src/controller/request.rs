//! 読み上げ要求の組み立て
//!
//! テキストが空なら中断してユーザーに通知する。話速・音高の数値が読めないときは
//! エラーにせず未設定（プラットフォーム既定）のまま進める。

use regex::Regex;
use std::sync::LazyLock;

use super::catalogue::VoiceCatalogue;
use crate::speech::{UtteranceRequest, VoiceKey};

/// 先頭の数値部分
static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?").expect("数値パターンは固定")
});

/// ユーザー向け通知
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum UserNotice {
    /// テキスト未入力
    #[display("Please enter text to speak.")]
    EmptyText,
}

/// フォームの入力値
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormValues {
    pub text: String,
    pub voice: Option<VoiceKey>,
    /// 入力欄の文字列のまま保持する
    pub rate: String,
    pub pitch: String,
}

impl Default for FormValues {
    fn default() -> Self {
        Self {
            text: String::new(),
            voice: None,
            rate: "1".to_string(),
            pitch: "1".to_string(),
        }
    }
}

/// 読み上げ要求を組み立てる
///
/// 音声キーはこの時点のカタログで解決し、解決できなければ未設定にする。
pub fn build_request(
    text: &str,
    form: &FormValues,
    catalogue: &VoiceCatalogue,
) -> Result<UtteranceRequest, UserNotice> {
    let text = text.trim();
    if text.is_empty() {
        return Err(UserNotice::EmptyText);
    }

    let voice = form
        .voice
        .as_ref()
        .and_then(|key| catalogue.resolve(key))
        .cloned();

    Ok(UtteranceRequest {
        text: text.to_string(),
        voice,
        rate: parse_number(&form.rate),
        pitch: parse_number(&form.pitch),
    })
}

/// 先頭から読める数値を取り出す
///
/// `"1.5x"` は1.5として読む。数値がない、または有限でない場合はNone。
pub fn parse_number(input: &str) -> Option<f32> {
    LEADING_NUMBER
        .find(input.trim_start())
        .and_then(|m| m.as_str().parse::<f32>().ok())
        .filter(|value| value.is_finite())
}
