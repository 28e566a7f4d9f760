//! Collaborators the dispatcher drives: speech capture, speech output and
//! page navigation.
//!
//! Capture engines push events into a bounded queue through a `CaptureSink`.
//! Each sink is stamped with the dispatcher generation that opened it, so
//! events from a closed session can be recognised and dropped.

use crate::intent::Section;

/// A piece of recognized speech, possibly still being revised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSegment {
    pub text: String,
    pub is_final: bool,
}

impl RecognitionSegment {
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// New or revised segments since the last result
    Result(Vec<RecognitionSegment>),
    Error(CaptureError),
    /// The engine stopped on its own (silence timeout etc.)
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("no speech detected")]
    NoSpeech,
    #[error("audio capture failed")]
    AudioCapture,
    #[error("microphone permission denied")]
    NotAllowed,
    #[error("network error")]
    Network,
    #[error("capture aborted")]
    Aborted,
    #[error("capture already running")]
    InvalidState,
    #[error("{0}")]
    Other(String),
}

impl CaptureError {
    /// Short machine-readable code, as recognition engines report them
    pub fn code(&self) -> &str {
        match self {
            CaptureError::NoSpeech => "no-speech",
            CaptureError::AudioCapture => "audio-capture",
            CaptureError::NotAllowed => "not-allowed",
            CaptureError::Network => "network",
            CaptureError::Aborted => "aborted",
            CaptureError::InvalidState => "invalid-state",
            CaptureError::Other(code) => code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureMessage {
    pub generation: u64,
    pub event: CaptureEvent,
}

/// Where a capture engine delivers its events
#[derive(Clone)]
pub struct CaptureSink {
    generation: u64,
    tx: flume::Sender<CaptureMessage>,
}

impl CaptureSink {
    pub fn new(generation: u64, tx: flume::Sender<CaptureMessage>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue an event, blocking while the queue is full.
    /// Returns `false` once the dispatcher is gone.
    pub fn send(&self, event: CaptureEvent) -> bool {
        self.tx
            .send(CaptureMessage {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    /// Shorthand for a single finalized utterance
    pub fn send_final(&self, text: impl Into<String>) -> bool {
        self.send(CaptureEvent::Result(vec![RecognitionSegment::final_text(text)]))
    }
}

/// Speech-to-text engine, configured for continuous capture with interim results
pub trait SpeechCapture: Send {
    fn start(&mut self, sink: CaptureSink) -> Result<(), CaptureError>;

    fn stop(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub name: String,
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceSettings {
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    /// Name of the chosen voice, engine default when `None`
    pub voice: Option<String>,
}

impl Default for UtteranceSettings {
    fn default() -> Self {
        Self {
            lang: "en-US".to_string(),
            rate: 0.9,
            pitch: 1.0,
            volume: 1.0,
            voice: None,
        }
    }
}

/// Text-to-speech engine
pub trait SpeechOutput: Send {
    fn voices(&self) -> Vec<VoiceInfo> {
        Vec::new()
    }

    fn speak(&mut self, text: &str, settings: &UtteranceSettings);

    /// Drop anything queued or playing
    fn cancel(&mut self);
}

/// Prefer an English voice whose name contains `hint`, then any English voice
pub fn select_voice<'a>(voices: &'a [VoiceInfo], hint: &str) -> Option<&'a VoiceInfo> {
    let english = |v: &&VoiceInfo| v.lang.contains("en");
    voices
        .iter()
        .filter(english)
        .find(|v| !hint.is_empty() && v.name.contains(hint))
        .or_else(|| voices.iter().find(english))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("section '{0}' not found")]
    SectionNotFound(String),
}

/// Scrolls the page; a missing section is reported, never fatal
pub trait Navigator: Send {
    fn scroll_to_section(&self, section: Section) -> Result<(), NavigationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(name: &str, lang: &str) -> VoiceInfo {
        VoiceInfo {
            name: name.to_string(),
            lang: lang.to_string(),
        }
    }

    #[test]
    fn test_select_voice_prefers_hint() {
        let voices = vec![
            voice("Thomas", "fr-FR"),
            voice("Daniel", "en-GB"),
            voice("Samantha Female", "en-US"),
        ];
        assert_eq!(select_voice(&voices, "Female").unwrap().name, "Samantha Female");
    }

    #[test]
    fn test_select_voice_falls_back_to_english() {
        let voices = vec![voice("Thomas", "fr-FR"), voice("Daniel", "en-GB")];
        assert_eq!(select_voice(&voices, "Female").unwrap().name, "Daniel");
    }

    #[test]
    fn test_select_voice_hint_must_be_english() {
        let voices = vec![voice("Amelie Female", "fr-CA"), voice("Daniel", "en-GB")];
        assert_eq!(select_voice(&voices, "Female").unwrap().name, "Daniel");
    }

    #[test]
    fn test_select_voice_none() {
        assert!(select_voice(&[voice("Thomas", "fr-FR")], "Female").is_none());
        assert!(select_voice(&[], "Female").is_none());
    }

    #[test]
    fn test_sink_stamps_generation() {
        let (tx, rx) = flume::bounded(4);
        let sink = CaptureSink::new(7, tx);
        assert!(sink.send_final("hello"));
        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.generation, 7);
        assert_eq!(
            msg.event,
            CaptureEvent::Result(vec![RecognitionSegment::final_text("hello")])
        );

        drop(rx);
        assert!(!sink.send(CaptureEvent::Ended));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CaptureError::NoSpeech.code(), "no-speech");
        assert_eq!(CaptureError::Other("service-not-allowed".into()).code(), "service-not-allowed");
    }
}
