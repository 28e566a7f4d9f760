//! Response text for each intent
//!
//! Responses are a pure function of the intent and the facts snapshot.

use crate::facts::PortfolioFacts;
use crate::intent::Intent;
use crate::speech::CaptureError;

pub const GREETING: &str = "Voice assistant activated. How can I help you?";
pub const FAREWELL: &str = "Goodbye! Voice assistant closing.";

pub const HELP_TEXT: &str = "I can help you with the following commands: \
Ask about my name, skills, projects, achievements, education, or contact information. \
You can also say \"scroll to projects\", \"scroll to contact\", or \"change theme to purple or yellow\". \
Say \"stop\" to close the assistant.";

pub const UNKNOWN_TEXT: &str =
    "I didn't understand that command. Say \"help\" to see what I can do.";

pub const THEME_OPTIONS_TEXT: &str = "Available themes are purple and yellow. \
Say \"change theme to purple\" or \"change theme to yellow\".";

pub struct Responder {
    facts: PortfolioFacts,
}

impl Responder {
    pub fn new(facts: PortfolioFacts) -> Self {
        Self { facts }
    }

    pub fn respond(&self, intent: &Intent) -> String {
        let facts = &self.facts;
        match intent {
            Intent::Help => HELP_TEXT.to_string(),
            Intent::Identity => format!("My name is {}, a {}.", facts.name, facts.profession),
            Intent::Skills => format!(
                "My technical skills include {}, and more.",
                first(&facts.skills, 5)
            ),
            Intent::Achievements => format!(
                "Here are my key achievements: {}.",
                first(&facts.achievements, 2)
            ),
            Intent::Projects => format!(
                "I have worked on several projects including {}, and more.",
                first(&facts.projects, 2)
            ),
            Intent::HackathonInfo => "I won the Aura Hackathon in March 2025 with an OpenCV \
augmentation and machine learning project."
                .to_string(),
            Intent::SpaceInfo => "I participated in the NASA Space Apps Challenge 2025, where I \
developed an Earth Data Analysis Platform using NASA's GIBS service."
                .to_string(),
            Intent::Contact => format!(
                "You can contact me at {}. I'm located in {}.",
                facts.contact.email, facts.contact.location
            ),
            Intent::Education => "I'm currently pursuing Computer Science and Engineering, \
specializing in AI, Machine Learning, and Full-Stack Development."
                .to_string(),
            Intent::About => format!(
                "I'm {}, a passionate developer with expertise in full-stack development, \
machine learning, and computer vision. I've won multiple hackathons and completed over 15 projects.",
                facts.name
            ),
            Intent::ScrollTo(section) => format!("Scrolling to {} section.", section),
            Intent::SetTheme(theme) => format!("Changed theme to {}.", theme),
            Intent::ThemeOptions => THEME_OPTIONS_TEXT.to_string(),
            Intent::Stop => FAREWELL.to_string(),
            Intent::Unknown => UNKNOWN_TEXT.to_string(),
        }
    }
}

/// Shown when the capture engine reports an error
pub fn capture_diagnostic(error: &CaptureError) -> String {
    match error {
        CaptureError::NoSpeech => "No speech detected. Please try speaking again.".to_string(),
        other => format!("Error: {}. Please try again.", other.code()),
    }
}

fn first(items: &[String], n: usize) -> String {
    items
        .iter()
        .take(n)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
