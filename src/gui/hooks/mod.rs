// Dioxus用カスタムフック

pub mod use_speech_session;

pub use use_speech_session::{use_speech_session, SpeechSessionHandle};
