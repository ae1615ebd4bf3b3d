//! VOICEVOXバックエンド実装

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::speech::config::VoicevoxConfig;
use crate::speech::{
    EventSink, PlatformEvent, PlatformStatus, SpeechPlatform, SynthesisError, UtteranceId,
    UtteranceRequest, VoiceDescriptor,
};

/// VOICEVOXの音声はすべて日本語
const VOICEVOX_LANG: &str = "ja-JP";

/// `/speakers` の話者
#[derive(Debug, Deserialize)]
struct Speaker {
    name: String,
    styles: Vec<SpeakerStyle>,
}

/// 話者のスタイル
#[derive(Debug, Deserialize)]
struct SpeakerStyle {
    name: String,
    id: i32,
}

/// 再生スロット
#[derive(Default)]
struct Playback {
    /// 合成中のリクエスト数
    in_flight: usize,
    /// 再生中のシンク
    sink: Option<Arc<rodio::Sink>>,
}

/// VOICEVOXバックエンド
pub struct VoicevoxPlatform {
    config: VoicevoxConfig,
    client: reqwest::Client,
    runtime: tokio::runtime::Handle,
    events: EventSink,
    voices: Arc<RwLock<Vec<VoiceDescriptor>>>,
    playback: Arc<Mutex<Playback>>,
    /// キャンセルのたびに進む世代番号
    generation: Arc<AtomicU64>,
}

impl VoicevoxPlatform {
    /// 新しいインスタンスを作成し、音声一覧の取得を開始
    pub fn new(config: VoicevoxConfig, events: EventSink) -> Result<Self, SynthesisError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            SynthesisError::Unavailable(format!("tokioランタイムがありません: {}", e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let platform = Self {
            config,
            client,
            runtime,
            events,
            voices: Arc::new(RwLock::new(Vec::new())),
            playback: Arc::new(Mutex::new(Playback::default())),
            generation: Arc::new(AtomicU64::new(0)),
        };
        platform.refresh_voices();
        Ok(platform)
    }

    /// 音声一覧をバックグラウンドで再取得し、完了したら変更通知を送る
    pub fn refresh_voices(&self) {
        let client = self.client.clone();
        let config = self.config.clone();
        let voices = self.voices.clone();
        let events = self.events.clone();

        self.runtime.spawn(async move {
            match fetch_speakers(&client, &config).await {
                Ok(speakers) => {
                    let descriptors = speakers_to_voices(&speakers, config.speaker_id);
                    tracing::info!("✅ VOICEVOX音声一覧を取得: {}件", descriptors.len());
                    *voices.write() = descriptors;
                    let _ = events.send(PlatformEvent::VoicesChanged);
                }
                Err(e) => {
                    tracing::error!("❌ VOICEVOX音声一覧の取得に失敗: {}", e);
                }
            }
        });
    }

    /// 合成済みWAVを再生（ブロッキング）
    fn play_blocking(
        wav_bytes: Vec<u8>,
        id: UtteranceId,
        generation: u64,
        current_generation: Arc<AtomicU64>,
        playback: Arc<Mutex<Playback>>,
        events: EventSink,
    ) -> Result<(), SynthesisError> {
        use rodio::{Decoder, OutputStream, Sink};
        use std::io::Cursor;

        // 音声出力ストリームを作成
        let (_stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| SynthesisError::AudioOutput(format!("音声出力の初期化に失敗: {}", e)))?;

        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| SynthesisError::AudioOutput(format!("音声シンクの作成に失敗: {}", e)))?;

        // WAVをデコード
        let source = Decoder::new(Cursor::new(wav_bytes))
            .map_err(|e| SynthesisError::AudioDecode(format!("WAVデコードに失敗: {}", e)))?;

        let sink = Arc::new(sink);
        {
            let mut slot = playback.lock();
            // 合成中にキャンセルされていたら再生しない
            if current_generation.load(Ordering::SeqCst) != generation {
                let _ = events.send(PlatformEvent::Ended(id));
                return Ok(());
            }
            if let Some(previous) = slot.sink.replace(sink.clone()) {
                previous.stop();
            }
        }

        sink.append(source);
        let _ = events.send(PlatformEvent::Started(id));
        sink.sleep_until_end();

        {
            let mut slot = playback.lock();
            if slot
                .sink
                .as_ref()
                .is_some_and(|active| Arc::ptr_eq(active, &sink))
            {
                slot.sink = None;
            }
        }

        let _ = events.send(PlatformEvent::Ended(id));
        Ok(())
    }
}

impl SpeechPlatform for VoicevoxPlatform {
    fn name(&self) -> &'static str {
        "VOICEVOX"
    }

    fn voices(&self) -> Vec<VoiceDescriptor> {
        self.voices.read().clone()
    }

    fn speak(&mut self, id: UtteranceId, request: &UtteranceRequest) -> Result<(), SynthesisError> {
        let speaker_id = request
            .voice
            .as_ref()
            .and_then(|voice| voice.uri.parse::<i32>().ok())
            .unwrap_or(self.config.speaker_id);
        let parameters = QueryParameters {
            speed_scale: speed_scale(request.effective_rate()),
            pitch_scale: pitch_scale(request.effective_pitch()),
            volume_scale: self.config.volume_scale,
            intonation_scale: self.config.intonation_scale,
        };

        let generation = self.generation.load(Ordering::SeqCst);
        let client = self.client.clone();
        let config = self.config.clone();
        let text = request.text.clone();
        let events = self.events.clone();
        let playback = self.playback.clone();
        let current_generation = self.generation.clone();

        self.playback.lock().in_flight += 1;
        tracing::debug!(utterance = %id, speaker_id, "🔊 VOICEVOXに送信: {}", text);

        self.runtime.spawn(async move {
            let synthesized = synthesize_text(&client, &config, speaker_id, &text, &parameters).await;
            playback.lock().in_flight -= 1;

            let wav_bytes = match synthesized {
                Ok(wav_bytes) => wav_bytes,
                Err(e) => {
                    let _ = events.send(PlatformEvent::Failed {
                        id,
                        message: e.to_string(),
                    });
                    return;
                }
            };

            let failure_events = events.clone();
            let played = tokio::task::spawn_blocking(move || {
                Self::play_blocking(
                    wav_bytes,
                    id,
                    generation,
                    current_generation,
                    playback,
                    events,
                )
            })
            .await;

            let failure = match played {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(e) => Some(format!("再生タスクエラー: {}", e)),
            };
            if let Some(message) = failure {
                let _ = failure_events.send(PlatformEvent::Failed { id, message });
            }
        });

        Ok(())
    }

    fn cancel(&mut self) -> Result<(), SynthesisError> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(sink) = self.playback.lock().sink.take() {
            sink.stop();
        }
        Ok(())
    }

    fn status(&self) -> PlatformStatus {
        let slot = self.playback.lock();
        PlatformStatus {
            speaking: slot.sink.is_some(),
            pending: slot.in_flight > 0,
        }
    }
}

/// audio_queryに上書きする音声パラメータ
#[derive(Debug, Clone, Copy)]
struct QueryParameters {
    speed_scale: f32,
    pitch_scale: f32,
    volume_scale: f32,
    intonation_scale: f32,
}

async fn fetch_speakers(
    client: &reqwest::Client,
    config: &VoicevoxConfig,
) -> Result<Vec<Speaker>, SynthesisError> {
    let url = format!("{}/speakers", config.base_url());
    let response = client.get(&url).send().await?;

    if !response.status().is_success() {
        return Err(SynthesisError::Connection(format!(
            "speakersに失敗: ステータス {}",
            response.status()
        )));
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

async fn synthesize_text(
    client: &reqwest::Client,
    config: &VoicevoxConfig,
    speaker_id: i32,
    text: &str,
    parameters: &QueryParameters,
) -> Result<Vec<u8>, SynthesisError> {
    // 1. audio_queryを取得
    let url = format!(
        "{}/audio_query?speaker={}&text={}",
        config.base_url(),
        speaker_id,
        urlencoding::encode(text),
    );
    let response = client.post(&url).send().await?;
    if !response.status().is_success() {
        return Err(SynthesisError::Connection(format!(
            "audio_queryに失敗: ステータス {}",
            response.status()
        )));
    }
    let mut audio_query: serde_json::Value = response.json().await?;

    // 2. 音声パラメータを適用
    apply_parameters(&mut audio_query, parameters);

    // 3. 音声合成
    let url = format!("{}/synthesis?speaker={}", config.base_url(), speaker_id);
    let response = client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&audio_query)
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(SynthesisError::Connection(format!(
            "synthesisに失敗: ステータス {}",
            response.status()
        )));
    }

    Ok(response.bytes().await?.to_vec())
}

fn apply_parameters(audio_query: &mut serde_json::Value, parameters: &QueryParameters) {
    if let Some(obj) = audio_query.as_object_mut() {
        obj.insert("speedScale".to_string(), serde_json::json!(parameters.speed_scale));
        obj.insert("pitchScale".to_string(), serde_json::json!(parameters.pitch_scale));
        obj.insert("volumeScale".to_string(), serde_json::json!(parameters.volume_scale));
        obj.insert(
            "intonationScale".to_string(),
            serde_json::json!(parameters.intonation_scale),
        );
    }
}

fn speakers_to_voices(speakers: &[Speaker], default_speaker_id: i32) -> Vec<VoiceDescriptor> {
    speakers
        .iter()
        .flat_map(|speaker| {
            speaker.styles.iter().map(move |style| {
                VoiceDescriptor::new(format!("{} / {}", speaker.name, style.name), VOICEVOX_LANG)
                    .with_uri(style.id.to_string())
                    .with_default(style.id == default_speaker_id)
            })
        })
        .collect()
}

/// 話速（1.0標準）をspeedScale (0.5〜2.0) に変換
fn speed_scale(rate: f32) -> f32 {
    rate.clamp(0.5, 2.0)
}

/// 音高（1.0標準）をpitchScale (-0.15〜0.15) に変換
fn pitch_scale(pitch: f32) -> f32 {
    ((pitch - 1.0) * 0.15).clamp(-0.15, 0.15)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speakers_become_voices_per_style() {
        let json = r#"[
            {"name": "四国めたん", "speaker_uuid": "x", "styles": [
                {"name": "ノーマル", "id": 2},
                {"name": "あまあま", "id": 0}
            ]},
            {"name": "ずんだもん", "speaker_uuid": "y", "styles": [
                {"name": "ノーマル", "id": 3}
            ]}
        ]"#;
        let speakers: Vec<Speaker> = serde_json::from_str(json).unwrap();
        let voices = speakers_to_voices(&speakers, 3);

        assert_eq!(voices.len(), 3);
        assert_eq!(voices[0].name, "四国めたん / ノーマル");
        assert_eq!(voices[0].lang, "ja-JP");
        assert_eq!(voices[0].uri, "2");
        assert!(!voices[0].is_default);
        assert!(voices[2].is_default);
    }

    #[test]
    fn test_parameter_mapping() {
        assert_eq!(speed_scale(1.0), 1.0);
        assert_eq!(speed_scale(10.0), 2.0);
        assert_eq!(speed_scale(0.1), 0.5);

        assert_eq!(pitch_scale(1.0), 0.0);
        assert!((pitch_scale(2.0) - 0.15).abs() < f32::EPSILON);
        assert!((pitch_scale(0.0) + 0.15).abs() < f32::EPSILON);
    }

    #[test]
    fn test_apply_parameters_overwrites_query() {
        let mut query = serde_json::json!({"speedScale": 1.0, "accent_phrases": []});
        apply_parameters(
            &mut query,
            &QueryParameters {
                speed_scale: 1.5,
                pitch_scale: 0.0,
                volume_scale: 1.0,
                intonation_scale: 1.0,
            },
        );

        assert_eq!(query["speedScale"], serde_json::json!(1.5));
        assert_eq!(query["pitchScale"], serde_json::json!(0.0));
        assert!(query["accent_phrases"].is_array());
    }
}
