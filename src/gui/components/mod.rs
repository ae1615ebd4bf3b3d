// Dioxus GUI Components Module

pub mod speech_panel; // 読み上げパネル

pub use speech_panel::SpeechPanel;
