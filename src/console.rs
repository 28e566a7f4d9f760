//! Terminal host: collaborators backed by stdin/stdout
//!
//! Typed lines stand in for finalized speech, spoken output is shown on the
//! terminal, and "scrolling" checks the configured page sections.
//!
//! Slash commands:
//!   /start      open the assistant
//!   /stop       close it
//!   /silence    simulate a silence timeout (no-speech error, engine ends)
//!   /quit       exit

use crate::dispatcher::DispatcherHandle;
use crate::intent::Section;
use crate::render::Ui;
use crate::speech::{
    CaptureError, CaptureEvent, CaptureSink, NavigationError, Navigator, SpeechCapture,
    SpeechOutput, UtteranceSettings, VoiceInfo,
};
use crate::theme::Theme;
use crate::theme_store::ThemeApplier;
use std::collections::HashSet;
use std::io::BufRead;
use std::sync::{Arc, Mutex};
use std::thread;

type ActiveSink = Arc<Mutex<Option<CaptureSink>>>;

/// Capture engine fed by stdin lines
pub struct ConsoleCapture {
    active: ActiveSink,
}

/// Reader side of `ConsoleCapture`
pub struct ConsoleInput {
    active: ActiveSink,
}

impl ConsoleCapture {
    pub fn new() -> (Self, ConsoleInput) {
        let active = ActiveSink::default();
        (
            Self {
                active: Arc::clone(&active),
            },
            ConsoleInput { active },
        )
    }
}

impl SpeechCapture for ConsoleCapture {
    fn start(&mut self, sink: CaptureSink) -> Result<(), CaptureError> {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        *active = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        *active = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineAction {
    Continue,
    Quit,
}

impl ConsoleInput {
    /// Read stdin on a background thread until EOF or `/quit`
    pub fn spawn(self, control: DispatcherHandle) -> thread::JoinHandle<()> {
        thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if self.route_line(&line, &control) == LineAction::Quit {
                    break;
                }
            }
            control.shutdown();
        })
    }

    fn route_line(&self, line: &str, control: &DispatcherHandle) -> LineAction {
        let line = line.trim();
        match line {
            "" => {}
            "/start" => control.start(),
            "/stop" => control.stop(),
            "/quit" | "/exit" => return LineAction::Quit,
            "/silence" => {
                if let Some(sink) = self.sink() {
                    sink.send(CaptureEvent::Error(CaptureError::NoSpeech));
                    sink.send(CaptureEvent::Ended);
                }
            }
            text => match self.sink() {
                Some(sink) => {
                    sink.send_final(text);
                }
                None => tracing::debug!("Not listening, ignoring input"),
            },
        }
        LineAction::Continue
    }

    fn sink(&self) -> Option<CaptureSink> {
        self.active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Speech output for a terminal: the text is the speech
pub struct ConsoleSpeech {
    voices: Vec<VoiceInfo>,
    speaking: Option<String>,
}

impl ConsoleSpeech {
    pub fn new() -> Self {
        Self {
            voices: vec![
                VoiceInfo {
                    name: "Terminal".to_string(),
                    lang: "en-US".to_string(),
                },
                VoiceInfo {
                    name: "Terminal Female".to_string(),
                    lang: "en-US".to_string(),
                },
            ],
            speaking: None,
        }
    }
}

impl Default for ConsoleSpeech {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechOutput for ConsoleSpeech {
    fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.clone()
    }

    fn speak(&mut self, text: &str, settings: &UtteranceSettings) {
        tracing::debug!(
            "Speaking ({}, voice {:?}, rate {}): {}",
            settings.lang,
            settings.voice,
            settings.rate,
            text
        );
        self.speaking = Some(text.to_string());
    }

    fn cancel(&mut self) {
        if self.speaking.take().is_some() {
            tracing::debug!("Speech canceled");
        }
    }
}

/// Navigator over the section ids configured for the page
pub struct PageNavigator {
    sections: HashSet<String>,
    ui: Ui,
}

impl PageNavigator {
    pub fn new<I, S>(sections: I, ui: Ui) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sections: sections.into_iter().map(Into::into).collect(),
            ui,
        }
    }
}

impl Navigator for PageNavigator {
    fn scroll_to_section(&self, section: Section) -> Result<(), NavigationError> {
        if !self.sections.contains(section.as_id()) {
            return Err(NavigationError::SectionNotFound(section.as_id().to_string()));
        }
        self.ui.scrolled(section);
        Ok(())
    }
}

/// Shows the applied palette on the terminal
pub struct TerminalThemeApplier {
    ui: Ui,
}

impl TerminalThemeApplier {
    pub fn new(ui: Ui) -> Self {
        Self { ui }
    }
}

impl ThemeApplier for TerminalThemeApplier {
    fn apply_theme(&self, theme: Theme) {
        self.ui.theme_applied(theme);
    }
}
