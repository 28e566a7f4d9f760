//! Voice command dispatcher
//!
//! Two states, `Idle` and `Listening`. While listening, finalized
//! transcripts from the capture engine are classified one at a time, in
//! arrival order, and answered with text + speech. Scroll and theme intents
//! also drive their collaborators.
//!
//! Everything runs on one task (`run`), which selects over:
//! - control messages from `DispatcherHandle` (start/stop/shutdown)
//! - the bounded capture-event queue
//! - the pending delayed stop after a spoken "stop" command
//!
//! Each session gets a new generation number; events stamped with an older
//! generation are dropped before classification, so nothing fires after
//! `stop()` even if the engine delivers late.

use crate::intent::{Intent, Transcript};
use crate::render::Ui;
use crate::responder::{self, FAREWELL, GREETING, Responder};
use crate::router::IntentRouter;
use crate::speech::{
    CaptureEvent, CaptureMessage, CaptureSink, Navigator, RecognitionSegment, SpeechCapture,
    SpeechOutput, UtteranceSettings, select_voice,
};
use crate::theme_store::ThemeStore;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenState {
    #[default]
    Idle,
    Listening,
}

impl fmt::Display for ListenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenState::Idle => write!(f, "Idle"),
            ListenState::Listening => write!(f, "Listening"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Start,
    Stop,
    Shutdown,
}

/// Cloneable remote for a running dispatcher
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: flume::Sender<Control>,
}

impl DispatcherHandle {
    /// Handle over an existing control channel
    pub fn from_sender(tx: flume::Sender<Control>) -> Self {
        Self { tx }
    }

    pub fn start(&self) {
        let _ = self.tx.send(Control::Start);
    }

    pub fn stop(&self) {
        let _ = self.tx.send(Control::Stop);
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Control::Shutdown);
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub utterance: UtteranceSettings,
    /// Preferred voice name fragment
    pub voice_hint: String,
    /// Delay between the spoken farewell and closing
    pub stop_delay: Duration,
    pub queue_capacity: usize,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            utterance: UtteranceSettings::default(),
            voice_hint: "Female".to_string(),
            stop_delay: Duration::from_millis(2000),
            queue_capacity: 32,
        }
    }
}

/// Everything the dispatcher acts on besides the capture engine
pub struct Collaborators {
    pub output: Box<dyn SpeechOutput>,
    pub navigator: Box<dyn Navigator>,
    pub themes: Arc<ThemeStore>,
    pub ui: Ui,
}

pub struct VoiceDispatcher {
    state: ListenState,
    generation: u64,
    router: IntentRouter,
    responder: Responder,
    capture: Box<dyn SpeechCapture>,
    output: Box<dyn SpeechOutput>,
    navigator: Box<dyn Navigator>,
    themes: Arc<ThemeStore>,
    ui: Ui,
    settings: DispatcherSettings,
    /// Deadline and generation of a requested delayed stop
    pending_stop: Option<(Instant, u64)>,
    capture_tx: flume::Sender<CaptureMessage>,
    capture_rx: flume::Receiver<CaptureMessage>,
    control_tx: flume::Sender<Control>,
    control_rx: flume::Receiver<Control>,
}

impl VoiceDispatcher {
    /// Build the dispatcher, or hide the voice control when the host has no
    /// capture engine
    pub fn init(
        capture: Option<Box<dyn SpeechCapture>>,
        collaborators: Collaborators,
        responder: Responder,
        settings: DispatcherSettings,
    ) -> Option<Self> {
        let Some(capture) = capture else {
            tracing::warn!("Speech capture is not supported on this host, voice assistant disabled");
            collaborators.ui.hide_control();
            return None;
        };

        let (capture_tx, capture_rx) = flume::bounded(settings.queue_capacity.max(1));
        let (control_tx, control_rx) = flume::unbounded();

        Some(Self {
            state: ListenState::Idle,
            generation: 0,
            router: IntentRouter::new(),
            responder,
            capture,
            output: collaborators.output,
            navigator: collaborators.navigator,
            themes: collaborators.themes,
            ui: collaborators.ui,
            settings,
            pending_stop: None,
            capture_tx,
            capture_rx,
            control_tx,
            control_rx,
        })
    }

    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle::from_sender(self.control_tx.clone())
    }

    pub fn state(&self) -> ListenState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Sink for the current session, for engines fed from outside `start`
    pub fn capture_sink(&self) -> CaptureSink {
        CaptureSink::new(self.generation, self.capture_tx.clone())
    }

    pub fn start(&mut self) {
        if self.state == ListenState::Listening {
            return;
        }

        self.generation += 1;
        self.state = ListenState::Listening;
        self.pending_stop = None;
        self.ui.set_listening();

        if let Err(e) = self.capture.start(self.capture_sink()) {
            tracing::warn!("Speech capture failed to start: {}", e);
            self.ui.show_diagnostic(&responder::capture_diagnostic(&e));
            self.state = ListenState::Idle;
            self.ui.set_idle();
            return;
        }

        tracing::info!("Voice assistant listening (session {})", self.generation);
        self.speak(GREETING);
    }

    pub fn stop(&mut self) {
        if self.state == ListenState::Idle {
            return;
        }

        self.state = ListenState::Idle;
        // Anything still queued from this session is now stale
        self.generation += 1;
        self.pending_stop = None;
        self.capture.stop();
        self.output.cancel();
        self.ui.speech_canceled();
        self.ui.set_idle();
        tracing::info!("Voice assistant stopped");
    }

    pub fn handle_capture(&mut self, msg: CaptureMessage) {
        if msg.generation != self.generation || self.state != ListenState::Listening {
            tracing::debug!(
                "Dropping capture event from session {} (current {}, {})",
                msg.generation,
                self.generation,
                self.state
            );
            return;
        }

        match msg.event {
            CaptureEvent::Result(segments) => self.handle_segments(&segments),
            CaptureEvent::Error(e) => {
                tracing::warn!("Speech recognition error: {}", e.code());
                self.ui.show_diagnostic(&responder::capture_diagnostic(&e));
            }
            CaptureEvent::Ended => {
                // Engines give up after a silence timeout; keep listening
                tracing::debug!("Capture ended, restarting");
                if let Err(e) = self.capture.start(self.capture_sink()) {
                    tracing::warn!("Recognition restart failed: {}", e);
                }
            }
        }
    }

    fn handle_segments(&mut self, segments: &[RecognitionSegment]) {
        let final_text = segments
            .iter()
            .filter(|s| s.is_final)
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let interim: String = segments
            .iter()
            .filter(|s| !s.is_final)
            .map(|s| s.text.as_str())
            .collect();

        self.ui.show_transcript(final_text.trim(), &interim);

        let transcript = Transcript::new(&final_text);
        if !transcript.is_empty() {
            self.handle_transcript(&transcript);
        }
    }

    /// Classify one finalized transcript and act on it
    pub fn handle_transcript(&mut self, transcript: &Transcript) -> Intent {
        let intent = self.router.classify(transcript);
        tracing::debug!("Processing command: {:?} -> {}", transcript.as_str(), intent);
        self.ui.classified(intent);

        match intent {
            Intent::Stop => {
                self.speak(FAREWELL);
                self.pending_stop = Some((Instant::now() + self.settings.stop_delay, self.generation));
                return intent;
            }
            Intent::ScrollTo(section) => {
                if let Err(e) = self.navigator.scroll_to_section(section) {
                    tracing::debug!("Scroll skipped: {}", e);
                }
            }
            Intent::SetTheme(theme) => {
                self.themes.set(theme);
            }
            _ => {}
        }

        let response = self.responder.respond(&intent);
        self.ui.show_response(&response);
        self.speak(&response);
        intent
    }

    /// Deadline of the delayed stop, if one is pending
    pub fn stop_deadline(&self) -> Option<Instant> {
        self.pending_stop.map(|(at, _)| at)
    }

    pub fn on_stop_deadline(&mut self) {
        if let Some((_, generation)) = self.pending_stop.take() {
            if generation == self.generation && self.state == ListenState::Listening {
                self.stop();
            }
        }
    }

    fn speak(&mut self, text: &str) {
        self.output.cancel();

        let voices = self.output.voices();
        let mut settings = self.settings.utterance.clone();
        if let Some(voice) = select_voice(&voices, &self.settings.voice_hint) {
            settings.voice = Some(voice.name.clone());
        }

        self.output.speak(text, &settings);
        self.ui.spoken(text);
    }

    /// Drive the dispatcher until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        let control_rx = self.control_rx.clone();
        let capture_rx = self.capture_rx.clone();

        loop {
            let deadline = self.stop_deadline();
            let stop_timer = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;

                control = control_rx.recv_async() => match control {
                    Ok(Control::Start) => self.start(),
                    Ok(Control::Stop) => self.stop(),
                    Ok(Control::Shutdown) | Err(_) => break,
                },

                _ = stop_timer, if deadline.is_some() => {
                    self.on_stop_deadline();
                }

                Ok(msg) = capture_rx.recv_async() => {
                    self.handle_capture(msg);
                }
            }
        }

        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::PortfolioFacts;
    use crate::intent::Section;
    use crate::render::UiEvent;
    use crate::responder::UNKNOWN_TEXT;
    use crate::speech::{CaptureError, NavigationError, VoiceInfo};
    use crate::storage::MemoryStore;
    use crate::theme::Theme;
    use crate::theme_store::DEFAULT_STORAGE_KEY;
    use crate::theme_store::tests::RecordingApplier;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Log {
        capture_starts: Vec<u64>,
        capture_stops: usize,
        fail_start: bool,
        spoken: Vec<(String, UtteranceSettings)>,
        cancels: usize,
        scrolled: Vec<Section>,
    }

    type SharedLog = Arc<Mutex<Log>>;

    struct MockCapture(SharedLog);

    impl SpeechCapture for MockCapture {
        fn start(&mut self, sink: CaptureSink) -> Result<(), CaptureError> {
            let mut log = self.0.lock().unwrap();
            if log.fail_start {
                return Err(CaptureError::NotAllowed);
            }
            log.capture_starts.push(sink.generation());
            Ok(())
        }

        fn stop(&mut self) {
            self.0.lock().unwrap().capture_stops += 1;
        }
    }

    struct MockOutput(SharedLog);

    impl SpeechOutput for MockOutput {
        fn voices(&self) -> Vec<VoiceInfo> {
            vec![VoiceInfo {
                name: "Zira Female".to_string(),
                lang: "en-US".to_string(),
            }]
        }

        fn speak(&mut self, text: &str, settings: &UtteranceSettings) {
            self.0
                .lock()
                .unwrap()
                .spoken
                .push((text.to_string(), settings.clone()));
        }

        fn cancel(&mut self) {
            self.0.lock().unwrap().cancels += 1;
        }
    }

    /// Page without a skills section
    struct MockNavigator(SharedLog);

    impl Navigator for MockNavigator {
        fn scroll_to_section(&self, section: Section) -> Result<(), NavigationError> {
            if section == Section::Skills {
                return Err(NavigationError::SectionNotFound(section.as_id().to_string()));
            }
            self.0.lock().unwrap().scrolled.push(section);
            Ok(())
        }
    }

    struct Fixture {
        dispatcher: VoiceDispatcher,
        log: SharedLog,
        themes: Arc<ThemeStore>,
        ui_rx: flume::Receiver<UiEvent>,
    }

    impl Fixture {
        fn new() -> Self {
            let log = SharedLog::default();
            let (ui, ui_rx) = Ui::new();
            let themes = ThemeStore::open(
                Arc::new(MemoryStore::new()),
                DEFAULT_STORAGE_KEY,
                Arc::new(RecordingApplier::default()),
            );
            let dispatcher = VoiceDispatcher::init(
                Some(Box::new(MockCapture(Arc::clone(&log)))),
                Collaborators {
                    output: Box::new(MockOutput(Arc::clone(&log))),
                    navigator: Box::new(MockNavigator(Arc::clone(&log))),
                    themes: Arc::clone(&themes),
                    ui,
                },
                Responder::new(PortfolioFacts::default()),
                DispatcherSettings::default(),
            )
            .unwrap();

            Self {
                dispatcher,
                log,
                themes,
                ui_rx,
            }
        }

        fn listening() -> Self {
            let mut fixture = Self::new();
            fixture.dispatcher.start();
            fixture.drain_ui();
            fixture
        }

        fn say(&mut self, text: &str) {
            let sink = self.dispatcher.capture_sink();
            sink.send_final(text);
            self.pump();
        }

        /// Deliver everything queued so far
        fn pump(&mut self) {
            while let Ok(msg) = self.dispatcher.capture_rx.try_recv() {
                self.dispatcher.handle_capture(msg);
            }
        }

        fn drain_ui(&self) -> Vec<UiEvent> {
            self.ui_rx.try_iter().collect()
        }

        fn last_spoken(&self) -> Option<String> {
            self.log.lock().unwrap().spoken.last().map(|(t, _)| t.clone())
        }
    }

    #[test]
    fn test_start_greets_and_captures() {
        let mut f = Fixture::new();
        assert_eq!(f.dispatcher.state(), ListenState::Idle);

        f.dispatcher.start();

        assert_eq!(f.dispatcher.state(), ListenState::Listening);
        assert_eq!(f.log.lock().unwrap().capture_starts, vec![1]);
        assert_eq!(f.last_spoken().as_deref(), Some(GREETING));
        assert_eq!(f.drain_ui().first(), Some(&UiEvent::Listening));
    }

    #[test]
    fn test_speech_uses_configured_voice() {
        let f = Fixture::listening();
        let log = f.log.lock().unwrap();
        let (_, settings) = log.spoken.last().unwrap();
        assert_eq!(settings.lang, "en-US");
        assert_eq!(settings.rate, 0.9);
        assert_eq!(settings.voice.as_deref(), Some("Zira Female"));
    }

    #[test]
    fn test_double_start_and_stop_are_noops() {
        let mut f = Fixture::new();
        f.dispatcher.start();
        f.dispatcher.start();
        assert_eq!(f.log.lock().unwrap().capture_starts.len(), 1);
        assert_eq!(f.dispatcher.generation(), 1);

        f.dispatcher.stop();
        f.dispatcher.stop();
        assert_eq!(f.log.lock().unwrap().capture_stops, 1);
        assert_eq!(f.dispatcher.state(), ListenState::Idle);
    }

    #[test]
    fn test_stop_cancels_speech() {
        let mut f = Fixture::listening();
        let cancels_before = f.log.lock().unwrap().cancels;

        f.dispatcher.stop();

        assert_eq!(f.dispatcher.state(), ListenState::Idle);
        assert_eq!(f.log.lock().unwrap().cancels, cancels_before + 1);
        let events = f.drain_ui();
        assert!(events.contains(&UiEvent::SpeechCanceled));
        assert!(events.contains(&UiEvent::Idle));
    }

    #[test]
    fn test_skills_question() {
        let mut f = Fixture::listening();
        f.say("What are your skills");

        let expected =
            "My technical skills include Python, Flask, JavaScript, HTML/CSS, OpenCV, and more.";
        assert_eq!(f.last_spoken().as_deref(), Some(expected));
        let events = f.drain_ui();
        assert!(events.contains(&UiEvent::Classified(Intent::Skills)));
        assert!(events.contains(&UiEvent::Response(expected.to_string())));
    }

    #[test]
    fn test_scroll_invokes_navigator() {
        let mut f = Fixture::listening();
        f.say("scroll to the projects section");

        assert_eq!(f.log.lock().unwrap().scrolled, vec![Section::Projects]);
        assert_eq!(f.last_spoken().as_deref(), Some("Scrolling to projects section."));
    }

    #[test]
    fn test_missing_section_still_responds() {
        let mut f = Fixture::listening();
        f.say("scroll to skills");

        assert!(f.log.lock().unwrap().scrolled.is_empty());
        assert_eq!(f.last_spoken().as_deref(), Some("Scrolling to skills section."));
        assert_eq!(f.dispatcher.state(), ListenState::Listening);
    }

    #[test]
    fn test_theme_command_sets_theme() {
        let mut f = Fixture::listening();
        f.say("change theme to yellow");

        assert_eq!(f.themes.get(), Theme::Yellow);
        assert_eq!(f.last_spoken().as_deref(), Some("Changed theme to yellow."));
    }

    #[test]
    fn test_repeated_theme_command_notifies_once() {
        let mut f = Fixture::listening();
        f.themes.set(Theme::Yellow);
        let mut changes = f.themes.subscribe();

        f.say("change theme to purple please");
        f.say("change theme to purple please");

        assert_eq!(changes.try_recv().unwrap(), Theme::Purple);
        assert!(changes.try_recv().is_err());
        assert_eq!(f.last_spoken().as_deref(), Some("Changed theme to purple."));
    }

    #[test]
    fn test_unknown_command() {
        let mut f = Fixture::listening();
        f.say("banana");

        assert_eq!(f.last_spoken().as_deref(), Some(UNKNOWN_TEXT));
        assert!(f.drain_ui().contains(&UiEvent::Classified(Intent::Unknown)));
    }

    #[test]
    fn test_late_result_after_stop_is_discarded() {
        let mut f = Fixture::listening();
        let stale_sink = f.dispatcher.capture_sink();
        let spoken_before = f.log.lock().unwrap().spoken.len();

        f.dispatcher.stop();
        f.drain_ui();
        stale_sink.send_final("what are your skills");
        f.pump();

        assert_eq!(f.log.lock().unwrap().spoken.len(), spoken_before);
        assert!(
            !f.drain_ui()
                .iter()
                .any(|e| matches!(e, UiEvent::Classified(_) | UiEvent::Transcript { .. }))
        );
    }

    #[test]
    fn test_result_from_previous_session_is_discarded() {
        let mut f = Fixture::listening();
        let old_sink = f.dispatcher.capture_sink();
        f.dispatcher.stop();
        f.dispatcher.start();
        f.drain_ui();

        old_sink.send_final("who are you");
        f.pump();

        assert!(!f.drain_ui().iter().any(|e| matches!(e, UiEvent::Classified(_))));
    }

    #[test]
    fn test_interim_results_are_display_only() {
        let mut f = Fixture::listening();
        let sink = f.dispatcher.capture_sink();
        sink.send(CaptureEvent::Result(vec![RecognitionSegment::interim("what are")]));
        f.pump();

        let events = f.drain_ui();
        assert_eq!(
            events,
            vec![UiEvent::Transcript {
                final_text: String::new(),
                interim: "what are".to_string()
            }]
        );
    }

    #[test]
    fn test_final_segments_are_joined() {
        let mut f = Fixture::listening();
        let sink = f.dispatcher.capture_sink();
        sink.send(CaptureEvent::Result(vec![
            RecognitionSegment::final_text("change theme"),
            RecognitionSegment::final_text("to yellow"),
            RecognitionSegment::interim("and"),
        ]));
        f.pump();

        assert_eq!(f.themes.get(), Theme::Yellow);
    }

    #[test]
    fn test_capture_error_keeps_listening() {
        let mut f = Fixture::listening();
        let sink = f.dispatcher.capture_sink();
        sink.send(CaptureEvent::Error(CaptureError::NoSpeech));
        f.pump();

        assert_eq!(f.dispatcher.state(), ListenState::Listening);
        assert!(f.drain_ui().contains(&UiEvent::Diagnostic(
            "No speech detected. Please try speaking again.".to_string()
        )));
    }

    #[test]
    fn test_capture_end_restarts_same_session() {
        let mut f = Fixture::listening();
        let sink = f.dispatcher.capture_sink();
        sink.send(CaptureEvent::Ended);
        f.pump();

        assert_eq!(f.log.lock().unwrap().capture_starts, vec![1, 1]);
        assert_eq!(f.dispatcher.state(), ListenState::Listening);
    }

    #[test]
    fn test_capture_end_after_stop_does_not_restart() {
        let mut f = Fixture::listening();
        let sink = f.dispatcher.capture_sink();
        f.dispatcher.stop();
        sink.send(CaptureEvent::Ended);
        f.pump();

        assert_eq!(f.log.lock().unwrap().capture_starts, vec![1]);
    }

    #[test]
    fn test_capture_start_failure_returns_to_idle() {
        let mut f = Fixture::new();
        f.log.lock().unwrap().fail_start = true;

        f.dispatcher.start();

        assert_eq!(f.dispatcher.state(), ListenState::Idle);
        let events = f.drain_ui();
        assert!(events.contains(&UiEvent::Diagnostic(
            "Error: not-allowed. Please try again.".to_string()
        )));
        assert_eq!(events.last(), Some(&UiEvent::Idle));
    }

    #[test]
    fn test_stop_command_closes_after_delay() {
        let mut f = Fixture::listening();
        f.say("stop listening");

        assert_eq!(f.last_spoken().as_deref(), Some(FAREWELL));
        assert_eq!(f.dispatcher.state(), ListenState::Listening);
        assert!(f.dispatcher.stop_deadline().is_some());
        // farewell is spoken, not displayed
        assert!(!f.drain_ui().iter().any(|e| matches!(e, UiEvent::Response(_))));

        f.dispatcher.on_stop_deadline();
        assert_eq!(f.dispatcher.state(), ListenState::Idle);
    }

    #[test]
    fn test_stale_stop_deadline_is_ignored() {
        let mut f = Fixture::listening();
        f.say("exit");
        f.dispatcher.stop();
        f.dispatcher.start();

        // start clears the pending stop of the old session
        assert!(f.dispatcher.stop_deadline().is_none());
        f.dispatcher.on_stop_deadline();
        assert_eq!(f.dispatcher.state(), ListenState::Listening);
    }

    #[test]
    fn test_unsupported_capture_hides_control() {
        let (ui, ui_rx) = Ui::new();
        let log = SharedLog::default();
        let themes = ThemeStore::open(
            Arc::new(MemoryStore::new()),
            DEFAULT_STORAGE_KEY,
            Arc::new(RecordingApplier::default()),
        );

        let dispatcher = VoiceDispatcher::init(
            None,
            Collaborators {
                output: Box::new(MockOutput(Arc::clone(&log))),
                navigator: Box::new(MockNavigator(log)),
                themes,
                ui,
            },
            Responder::new(PortfolioFacts::default()),
            DispatcherSettings::default(),
        );

        assert!(dispatcher.is_none());
        assert_eq!(ui_rx.try_recv().unwrap(), UiEvent::ControlHidden);
    }

    #[test]
    fn test_listen_state_display() {
        assert_eq!(ListenState::Idle.to_string(), "Idle");
        assert_eq!(ListenState::Listening.to_string(), "Listening");
    }
}
