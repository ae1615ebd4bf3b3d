//! 音声合成プラットフォーム実装

#[cfg(feature = "native")]
pub mod native;
pub mod scripted;
mod utterance_map;
#[cfg(feature = "voicevox")]
pub mod voicevox;

use super::config::{PlatformKind, VoicevoxConfig};
use super::{EventSink, SpeechPlatform, SynthesisError};

#[cfg(feature = "native")]
pub use native::NativePlatform;
pub use scripted::{PlatformCall, ScriptedHandle, ScriptedPlatform};
#[cfg(feature = "voicevox")]
pub use voicevox::VoicevoxPlatform;

/// 設定に応じたプラットフォームを作成
///
/// ビルド時に無効化されたプラットフォームは `Unavailable` を返す。
pub fn create_platform(
    kind: PlatformKind,
    voicevox: &VoicevoxConfig,
    events: EventSink,
) -> Result<Box<dyn SpeechPlatform>, SynthesisError> {
    let platform: Box<dyn SpeechPlatform> = match kind {
        PlatformKind::Silent => Box::new(ScriptedPlatform::autoplay(events).0),
        #[cfg(feature = "native")]
        PlatformKind::Native => Box::new(NativePlatform::new(events)?),
        #[cfg(not(feature = "native"))]
        PlatformKind::Native => {
            return Err(SynthesisError::Unavailable(
                "nativeフィーチャーなしでビルドされています".to_string(),
            ))
        }
        #[cfg(feature = "voicevox")]
        PlatformKind::Voicevox => Box::new(VoicevoxPlatform::new(voicevox.clone(), events)?),
        #[cfg(not(feature = "voicevox"))]
        PlatformKind::Voicevox => {
            let _ = voicevox;
            return Err(SynthesisError::Unavailable(
                "voicevoxフィーチャーなしでビルドされています".to_string(),
            ));
        }
    };

    tracing::info!("🔊 音声合成プラットフォーム初期化: {}", platform.name());
    Ok(platform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::event_channel;

    #[test]
    fn test_create_silent_platform() {
        let (sink, _stream) = event_channel();
        let platform =
            create_platform(PlatformKind::Silent, &VoicevoxConfig::default(), sink).unwrap();
        assert_eq!(platform.name(), "silent");
        assert!(platform.voices().is_empty());
    }

    #[cfg(not(feature = "native"))]
    #[test]
    fn test_default_platform_builds_without_optional_features() {
        let (sink, _stream) = event_channel();
        let platform =
            create_platform(PlatformKind::default(), &VoicevoxConfig::default(), sink).unwrap();
        assert_eq!(platform.name(), "silent");
    }

    #[cfg(not(feature = "native"))]
    #[test]
    fn test_native_without_feature_is_unavailable() {
        let (sink, _stream) = event_channel();
        let result = create_platform(PlatformKind::Native, &VoicevoxConfig::default(), sink);
        assert!(matches!(result, Err(SynthesisError::Unavailable(_))));
    }
}
