//! 再生フェーズとボタン状態

/// 再生フェーズ
///
/// プラットフォームが報告した開始/終了をそのまま映す。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, derive_more::Display)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Speaking,
}

/// ボタンの有効/無効
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub speak_enabled: bool,
    pub stop_enabled: bool,
}

impl ControlState {
    /// 再生フェーズから決まるボタン状態
    pub fn reflect(phase: PlaybackPhase) -> Self {
        match phase {
            PlaybackPhase::Idle => Self {
                speak_enabled: true,
                stop_enabled: false,
            },
            PlaybackPhase::Speaking => Self {
                speak_enabled: false,
                stop_enabled: true,
            },
        }
    }

    /// 音声合成機能がない場合（両方とも無効のまま）
    pub fn unavailable() -> Self {
        Self {
            speak_enabled: false,
            stop_enabled: false,
        }
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::reflect(PlaybackPhase::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_is_exclusive() {
        let idle = ControlState::reflect(PlaybackPhase::Idle);
        assert!(idle.speak_enabled);
        assert!(!idle.stop_enabled);

        let speaking = ControlState::reflect(PlaybackPhase::Speaking);
        assert!(!speaking.speak_enabled);
        assert!(speaking.stop_enabled);
    }
}
