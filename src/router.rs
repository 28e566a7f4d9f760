//! Intent router - maps a finalized transcript to exactly one `Intent`
//!
//! Rules are checked top to bottom and the first match wins. A rule is a
//! list of clauses; it fires when every clause has at least one keyword
//! contained in the transcript. Order, in short:
//! 1. Scroll commands - need "scroll" plus a section name
//! 2. Topic questions - help, identity, skills, ... about
//! 3. Theme commands - need "theme"/"color", then a colour if one was said
//! 4. Stop - farewell and close
//!
//! Anything else is `Unknown`.

use crate::intent::{Intent, Section, Transcript};
use crate::theme::Theme;

/// One entry of the rule table
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    /// Conjunction of keyword alternatives
    pub clauses: &'static [&'static [&'static str]],
    pub intent: Intent,
}

impl Rule {
    pub fn matches(&self, text: &str) -> bool {
        self.clauses
            .iter()
            .all(|any_of| any_of.iter().any(|keyword| text.contains(keyword)))
    }
}

const SCROLL: &[&str] = &["scroll"];
const THEME: &[&str] = &["theme", "color"];

pub const RULES: &[Rule] = &[
    Rule {
        name: "scroll-home",
        clauses: &[SCROLL, &["home"]],
        intent: Intent::ScrollTo(Section::Home),
    },
    Rule {
        name: "scroll-projects",
        clauses: &[SCROLL, &["projects"]],
        intent: Intent::ScrollTo(Section::Projects),
    },
    Rule {
        name: "scroll-contact",
        clauses: &[SCROLL, &["contact"]],
        intent: Intent::ScrollTo(Section::Contact),
    },
    Rule {
        name: "scroll-skills",
        clauses: &[SCROLL, &["skills"]],
        intent: Intent::ScrollTo(Section::Skills),
    },
    Rule {
        name: "help",
        clauses: &[&["help", "what can you do"]],
        intent: Intent::Help,
    },
    Rule {
        name: "identity",
        clauses: &[&["name", "who are you"]],
        intent: Intent::Identity,
    },
    Rule {
        name: "skills",
        clauses: &[&["skills", "technologies"]],
        intent: Intent::Skills,
    },
    Rule {
        name: "achievements",
        clauses: &[&["achievements", "awards"]],
        intent: Intent::Achievements,
    },
    Rule {
        name: "projects",
        clauses: &[&["projects", "work"]],
        intent: Intent::Projects,
    },
    Rule {
        name: "hackathon",
        clauses: &[&["hackathon", "aura"]],
        intent: Intent::HackathonInfo,
    },
    Rule {
        name: "space",
        clauses: &[&["nasa", "space"]],
        intent: Intent::SpaceInfo,
    },
    Rule {
        name: "contact",
        clauses: &[&["contact", "email"]],
        intent: Intent::Contact,
    },
    Rule {
        name: "education",
        clauses: &[&["education", "degree"]],
        intent: Intent::Education,
    },
    Rule {
        name: "about",
        clauses: &[&["about", "tell me about"]],
        intent: Intent::About,
    },
    Rule {
        name: "theme-purple",
        clauses: &[THEME, &["purple"]],
        intent: Intent::SetTheme(Theme::Purple),
    },
    Rule {
        name: "theme-yellow",
        clauses: &[THEME, &["yellow"]],
        intent: Intent::SetTheme(Theme::Yellow),
    },
    Rule {
        name: "theme-options",
        clauses: &[THEME],
        intent: Intent::ThemeOptions,
    },
    Rule {
        name: "stop",
        clauses: &[&["stop", "close", "exit"]],
        intent: Intent::Stop,
    },
];

/// Classifies transcripts against an ordered rule table
#[derive(Debug, Clone)]
pub struct IntentRouter {
    rules: &'static [Rule],
}

impl IntentRouter {
    pub fn new() -> Self {
        Self { rules: RULES }
    }

    pub fn rules(&self) -> &'static [Rule] {
        self.rules
    }

    pub fn classify(&self, transcript: &Transcript) -> Intent {
        self.matching_rule(transcript)
            .map(|rule| rule.intent)
            .unwrap_or(Intent::Unknown)
    }

    /// The rule that decides `transcript`, if any
    pub fn matching_rule(&self, transcript: &Transcript) -> Option<&'static Rule> {
        let text = transcript.as_str();
        self.rules.iter().find(|rule| rule.matches(text))
    }
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::new()
    }
}
