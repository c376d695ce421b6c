//! Conversation engine.
//!
//! Owns the transcript and the client-turn counter. The opening line is
//! always scripted; later turns go to the line generator unless the
//! consultation has reached its closing floor, and any generator failure
//! degrades to a stage-appropriate scripted line. Every turn produces a
//! usable client line, connected or not.

use std::sync::Arc;

use async_trait::async_trait;

use super::gemini::{GeminiClient, GenerationError};
use super::scenarios::{
    self, build_conversation_context, stage_for_turns, ScenarioDefinition, Stage,
    CLOSING_TURN_FLOOR,
};
use super::{Speaker, Utterance};

/// Produces one client line for a prompt. The Gemini client is the real
/// implementation; tests substitute canned or failing generators.
#[async_trait]
pub trait LineGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[async_trait]
impl LineGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.generate_line(prompt).await
    }
}

/// State-misuse errors from the engine.
#[derive(Debug, Clone)]
pub enum ConversationError {
    UnknownScenario(String),
    NotStarted,
}

impl std::fmt::Display for ConversationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversationError::UnknownScenario(id) => {
                write!(f, "Unknown scenario: {}", id)
            }
            ConversationError::NotStarted => {
                write!(f, "No conversation has been started. Select a scenario first.")
            }
        }
    }
}

impl std::error::Error for ConversationError {}

pub struct ConversationEngine {
    generator: Arc<dyn LineGenerator>,
    scenario: Option<&'static ScenarioDefinition>,
    transcript: Vec<Utterance>,
    turns: usize,
}

impl ConversationEngine {
    pub fn new(generator: Arc<dyn LineGenerator>) -> Self {
        Self {
            generator,
            scenario: None,
            transcript: Vec::new(),
            turns: 0,
        }
    }

    /// Bind a scenario and reset the transcript and counter.
    pub fn start(&mut self, scenario_id: &str) -> Result<(), ConversationError> {
        let scenario = scenarios::scenario(scenario_id)
            .ok_or_else(|| ConversationError::UnknownScenario(scenario_id.to_string()))?;

        self.scenario = Some(scenario);
        self.transcript.clear();
        self.turns = 0;

        log::info!("Conversation started: scenario={}", scenario.id);
        Ok(())
    }

    pub fn scenario(&self) -> Option<&'static ScenarioDefinition> {
        self.scenario
    }

    /// Client turns taken so far.
    pub fn turns(&self) -> usize {
        self.turns
    }

    pub fn transcript(&self) -> &[Utterance] {
        &self.transcript
    }

    /// Current stage, derived from the turn counter.
    pub fn stage(&self) -> Stage {
        stage_for_turns(self.turns)
    }

    /// The scripted consultation opener. Never calls the generator.
    pub fn opening(&mut self) -> Result<String, ConversationError> {
        let scenario = self.scenario.ok_or(ConversationError::NotStarted)?;

        let line = scenario.opening_line().to_string();
        self.push_client_line(line.clone());
        Ok(line)
    }

    /// Record the teacher's line and produce the client's next one.
    ///
    /// Past the closing floor the client wraps up with a scripted line and
    /// the generator is never consulted. Otherwise one generation attempt is
    /// made; any failure falls back to a scripted line for the current
    /// stage. The turn counter advances exactly once on every path.
    pub async fn respond(&mut self, teacher_line: &str) -> Result<String, ConversationError> {
        let scenario = self.scenario.ok_or(ConversationError::NotStarted)?;

        self.transcript.push(Utterance {
            speaker: Speaker::Teacher,
            text: teacher_line.to_string(),
        });

        let stage = stage_for_turns(self.turns);
        if stage == Stage::Closing && self.turns >= CLOSING_TURN_FLOOR {
            let line = scenarios::random_closing_line().to_string();
            self.push_client_line(line.clone());
            return Ok(line);
        }

        let prompt = build_conversation_context(scenario, &self.transcript);

        let line = match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("Line generation failed, using a scripted line: {}", e);
                self.fallback_line(scenario)
            }
        };

        self.push_client_line(line.clone());
        Ok(line)
    }

    fn push_client_line(&mut self, text: String) {
        self.transcript.push(Utterance {
            speaker: Speaker::Client,
            text,
        });
        self.turns += 1;
    }

    /// Scripted substitute for a failed generation, chosen by stage:
    /// a reaction while opening, a follow-up question mid-consultation,
    /// a closing line otherwise.
    fn fallback_line(&self, scenario: &ScenarioDefinition) -> String {
        match stage_for_turns(self.turns) {
            Stage::Opening => scenario.random_reaction().to_string(),
            Stage::Middle => scenario.random_follow_up().to_string(),
            Stage::Closing => scenarios::random_closing_line().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CannedGenerator(&'static str);

    #[async_trait]
    impl LineGenerator for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_start_rejects_unknown_scenario() {
        let mut engine = ConversationEngine::new(Arc::new(CannedGenerator("hi")));
        assert!(matches!(
            engine.start("palmistry"),
            Err(ConversationError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_opening_before_start_is_state_misuse() {
        let mut engine = ConversationEngine::new(Arc::new(CannedGenerator("hi")));
        assert!(matches!(
            engine.opening(),
            Err(ConversationError::NotStarted)
        ));
    }

    #[test]
    fn test_opening_is_scripted_and_counts_one_turn() {
        let mut engine = ConversationEngine::new(Arc::new(CannedGenerator("hi")));
        engine.start("love").unwrap();

        let line = engine.opening().unwrap();
        assert_eq!(line, scenarios::scenario("love").unwrap().opening_line());
        assert_eq!(engine.turns(), 1);
        assert_eq!(engine.transcript().len(), 1);
        assert_eq!(engine.transcript()[0].speaker, Speaker::Client);
    }

    #[test]
    fn test_start_resets_state() {
        let mut engine = ConversationEngine::new(Arc::new(CannedGenerator("hi")));
        engine.start("love").unwrap();
        engine.opening().unwrap();
        assert_eq!(engine.turns(), 1);

        engine.start("career").unwrap();
        assert_eq!(engine.turns(), 0);
        assert!(engine.transcript().is_empty());
        assert_eq!(engine.scenario().unwrap().id, "career");
    }
}
