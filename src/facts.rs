//! Static portfolio knowledge used to fill response templates

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PortfolioFacts {
    pub name: String,
    pub profession: String,
    pub skills: Vec<String>,
    pub achievements: Vec<String>,
    pub projects: Vec<String>,
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContactInfo {
    pub email: String,
    pub location: String,
}

impl Default for ContactInfo {
    fn default() -> Self {
        Self {
            email: "vimalesh@example.com".into(),
            location: "India".into(),
        }
    }
}

impl Default for PortfolioFacts {
    fn default() -> Self {
        Self {
            name: "VIMALESH S".into(),
            profession: "Full Stack Developer and AI Enthusiast".into(),
            skills: strings(&[
                "Python",
                "Flask",
                "JavaScript",
                "HTML/CSS",
                "OpenCV",
                "Machine Learning",
                "IoT",
                "Computer Vision",
            ]),
            achievements: strings(&[
                "Won Aura Hackathon in March 2025",
                "Won 12-hour internal hackathon in August 2025",
                "Participated in NASA Space Apps Challenge 2025",
                "Completed 15+ projects across various domains",
            ]),
            projects: strings(&[
                "OpenCV Augmentation System - Award-winning hackathon project",
                "NASA Earth Data Analysis Platform - Space Apps Challenge",
                "SecureStep Fall Detection System - IoT healthcare solution",
                "Multi-Purpose Object Detection - Computer vision application",
                "Plant Identification & Disease Detection - Agriculture AI",
                "Weather & Air Quality Forecasting - Predictive analytics",
            ]),
            contact: ContactInfo::default(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
