//! Scripted consultation module
//!
//! The scenario catalog supplies the client persona and its canned lines;
//! the engine advances the conversation turn by turn, calling the Gemini
//! line generator where the stage allows and falling back to scripted lines
//! on any remote failure.

pub mod engine;
pub mod gemini;
pub mod scenarios;

use serde::{Deserialize, Serialize};

/// Who said a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The synthesized persona visiting the reader.
    Client,
    /// The live person practicing their readings.
    Teacher,
}

impl Speaker {
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::Client => "Client",
            Speaker::Teacher => "Teacher",
        }
    }
}

/// One transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utterance {
    pub speaker: Speaker,
    pub text: String,
}

pub use engine::{ConversationEngine, ConversationError, LineGenerator};
pub use gemini::{GeminiClient, GenerationError};
pub use scenarios::{ScenarioDefinition, Stage};
