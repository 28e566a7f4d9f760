//! Classified meaning of a spoken command

use crate::theme::Theme;
use std::fmt;

/// Page sections a voice command can scroll to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Home,
    Projects,
    Contact,
    Skills,
}

impl Section {
    /// Element id of the section on the page
    pub fn as_id(&self) -> &'static str {
        match self {
            Section::Home => "home",
            Section::Projects => "projects",
            Section::Contact => "contact",
            Section::Skills => "skills",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Help,
    Identity,
    Skills,
    Achievements,
    Projects,
    HackathonInfo,
    SpaceInfo,
    Contact,
    Education,
    About,
    ScrollTo(Section),
    SetTheme(Theme),
    /// Theme mentioned without a colour we know
    ThemeOptions,
    Stop,
    Unknown,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::ScrollTo(section) => write!(f, "ScrollTo({})", section),
            Intent::SetTheme(theme) => write!(f, "SetTheme({})", theme),
            other => write!(f, "{:?}", other),
        }
    }
}

/// One finalized utterance, normalized to trimmed lowercase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript(String);

impl Transcript {
    pub fn new(text: &str) -> Self {
        Self(text.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
