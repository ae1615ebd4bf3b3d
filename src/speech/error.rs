//! 音声合成プラットフォーム用エラー型

use thiserror::Error;

/// 音声合成エラー型
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("音声合成機能が利用できません: {0}")]
    Unavailable(String),

    #[error("接続に失敗しました: {0}")]
    Connection(String),

    #[cfg(feature = "voicevox")]
    #[error("HTTPリクエストに失敗しました: {0}")]
    Http(#[from] reqwest::Error),

    #[error("音声出力エラー: {0}")]
    AudioOutput(String),

    #[error("音声デコードエラー: {0}")]
    AudioDecode(String),

    #[error("音声エンジンエラー: {0}")]
    Engine(String),

    #[error("JSONパースエラー: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl From<SynthesisError> for crate::SpeakpadError {
    fn from(err: SynthesisError) -> Self {
        crate::SpeakpadError::Synthesis(err)
    }
}
