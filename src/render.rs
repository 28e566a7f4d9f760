use crate::intent::{Intent, Section};
use crate::theme::{Theme, hex_to_rgb};
use crossterm::style::{Color, Stylize};
use std::io::Write;

/// Everything the assistant shows to the user
#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
    Listening,
    Idle,
    Transcript { final_text: String, interim: String },
    Classified(Intent),
    Response(String),
    Spoken(String),
    SpeechCanceled,
    Diagnostic(String),
    Scrolled(Section),
    ThemeApplied(Theme),
    /// Voice capture unsupported, the voice control is hidden
    ControlHidden,
}

#[derive(Clone)]
pub struct Ui {
    tx: flume::Sender<UiEvent>,
}

impl Ui {
    pub fn new() -> (Self, flume::Receiver<UiEvent>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }

    pub fn set_listening(&self) {
        let _ = self.tx.send(UiEvent::Listening);
    }

    pub fn set_idle(&self) {
        let _ = self.tx.send(UiEvent::Idle);
    }

    pub fn show_transcript(&self, final_text: &str, interim: &str) {
        let _ = self.tx.send(UiEvent::Transcript {
            final_text: final_text.to_string(),
            interim: interim.to_string(),
        });
    }

    pub fn classified(&self, intent: Intent) {
        let _ = self.tx.send(UiEvent::Classified(intent));
    }

    pub fn show_response(&self, text: &str) {
        let _ = self.tx.send(UiEvent::Response(text.to_string()));
    }

    pub fn spoken(&self, text: &str) {
        let _ = self.tx.send(UiEvent::Spoken(text.to_string()));
    }

    pub fn speech_canceled(&self) {
        let _ = self.tx.send(UiEvent::SpeechCanceled);
    }

    pub fn show_diagnostic(&self, text: &str) {
        let _ = self.tx.send(UiEvent::Diagnostic(text.to_string()));
    }

    pub fn scrolled(&self, section: Section) {
        let _ = self.tx.send(UiEvent::Scrolled(section));
    }

    pub fn theme_applied(&self, theme: Theme) {
        let _ = self.tx.send(UiEvent::ThemeApplied(theme));
    }

    pub fn hide_control(&self) {
        let _ = self.tx.send(UiEvent::ControlHidden);
    }
}

pub struct Renderer {
    accent: Color,
    /// Spoken text already on screen as a response
    last_response: Option<String>,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            accent: theme_color(Theme::default()),
            last_response: None,
        }
    }

    pub fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::Listening => {
                print!("\r\x1b[K{}\n", "Listening... (type to speak, /stop to close)".with(self.accent));
            }
            UiEvent::Idle => {
                print!("\r\x1b[K\x1b[90mVoice assistant closed. /start to reopen.\x1b[0m\n");
            }
            UiEvent::Transcript { final_text, interim } => {
                if interim.is_empty() {
                    print!("\r\x1b[K> {}\n", final_text);
                } else {
                    print!("\r\x1b[K> {}\x1b[90m{}\x1b[0m", final_text, interim);
                }
            }
            UiEvent::Classified(_) | UiEvent::SpeechCanceled => return,
            UiEvent::Response(text) => {
                print!("\r\x1b[K{} {}\n", "Assistant:".with(self.accent).bold(), text);
                self.last_response = Some(text);
            }
            UiEvent::Spoken(text) => {
                if self.last_response.take().as_ref() == Some(&text) {
                    return;
                }
                print!("\r\x1b[K\x1b[35m♪ {}\x1b[0m\n", text);
            }
            UiEvent::Diagnostic(text) => {
                print!("\r\x1b[K\x1b[33m{}\x1b[0m\n", text);
            }
            UiEvent::Scrolled(section) => {
                print!("\r\x1b[K\x1b[90m↳ #{}\x1b[0m\n", section);
            }
            UiEvent::ThemeApplied(theme) => {
                self.accent = theme_color(theme);
                print!("\r\x1b[K{}\n", swatch(theme));
            }
            UiEvent::ControlHidden => {
                print!("\r\x1b[K\x1b[90mVoice assistant is not supported here.\x1b[0m\n");
            }
        }
        std::io::stdout().flush().ok();
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn theme_color(theme: Theme) -> Color {
    rgb(theme.palette().primary)
}

fn rgb(hex: &str) -> Color {
    match hex_to_rgb(hex) {
        Some((r, g, b)) => Color::Rgb { r, g, b },
        None => Color::Reset,
    }
}

/// One coloured block per palette token
pub fn swatch(theme: Theme) -> String {
    let blocks: String = theme
        .palette()
        .tokens()
        .iter()
        .map(|(_, hex)| "██".with(rgb(hex)).to_string())
        .collect();
    format!("Theme: {} {}", theme, blocks)
}
