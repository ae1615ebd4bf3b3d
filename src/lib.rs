pub mod controller;
pub mod error;
pub mod gui;
pub mod session;
pub mod speech;

// Re-export the main error types for convenience
pub use error::{SpeakpadError, SpeakpadResult};
pub use speech::SynthesisError;

// Re-export the controller surface
pub use controller::{
    ControllerSettings, ControllerView, FormValues, KeyPress, PlaybackPhase, UserNotice,
    UtteranceController,
};
pub use session::{Session, SessionHandle, SessionUpdate, UiCommand};
pub use speech::{
    PlatformEvent, SpeechPlatform, UtteranceId, UtteranceRequest, VoiceDescriptor, VoiceKey,
};
