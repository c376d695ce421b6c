//! Consultation scenario catalog.
//!
//! Five client personas, each with scripted opening lines, a follow-up
//! question pool and a reaction pool, plus one shared closing pool. The
//! catalog is static; the engine owns all conversation state.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::Utterance;

/// A client persona for one consultation topic.
#[derive(Debug)]
pub struct ScenarioDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    /// Framing text sent ahead of the transcript on every remote call.
    pub system_prompt: &'static str,
    /// Scripted consultation openers, in order.
    pub opening_lines: &'static [&'static str],
    pub follow_up_questions: &'static [&'static str],
    pub reactions: &'static [&'static str],
}

impl ScenarioDefinition {
    /// The scripted line the consultation always opens with.
    pub fn opening_line(&self) -> &'static str {
        self.opening_lines[0]
    }

    pub fn random_follow_up(&self) -> &'static str {
        self.follow_up_questions
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("")
    }

    pub fn random_reaction(&self) -> &'static str {
        self.reactions
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("")
    }
}

/// Coarse phase of the consultation, derived from the client-turn counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Opening,
    Middle,
    Closing,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Opening => "opening",
            Stage::Middle => "middle",
            Stage::Closing => "closing",
        }
    }
}

/// Classify the consultation stage from the number of client turns so far.
pub fn stage_for_turns(turns: usize) -> Stage {
    if turns <= 2 {
        Stage::Opening
    } else if turns <= 8 {
        Stage::Middle
    } else {
        Stage::Closing
    }
}

/// Turn count at which the client wraps up with a scripted closing line
/// instead of calling the generator.
pub const CLOSING_TURN_FLOOR: usize = 10;

/// Shared pool the client closes the consultation with.
pub const CLOSING_LINES: &[&str] = &[
    "Thank you so much, this really helped.",
    "I feel much lighter after today's reading. Thank you.",
    "I'm really grateful for the advice.",
    "Now I know what I should do next. Thank you.",
    "This gave me real strength. Thank you so much.",
];

pub fn random_closing_line() -> &'static str {
    CLOSING_LINES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("")
}

/// Look up a scenario by identifier.
pub fn scenario(id: &str) -> Option<&'static ScenarioDefinition> {
    SCENARIOS.iter().find(|s| s.id == id)
}

pub fn all_scenarios() -> &'static [ScenarioDefinition] {
    SCENARIOS
}

/// Build the generation prompt: framing text plus the transcript rendered as
/// alternating client/teacher lines, ending with a brief-reply instruction.
pub fn build_conversation_context(
    scenario: &ScenarioDefinition,
    transcript: &[Utterance],
) -> String {
    let mut context = String::from(scenario.system_prompt);
    context.push_str("\n\n");

    if transcript.is_empty() {
        context.push_str(
            "Open the consultation with a natural greeting. Keep it short, one or two sentences.",
        );
    } else {
        context.push_str("Previous conversation:\n");
        for entry in transcript {
            context.push_str(entry.speaker.label());
            context.push_str(": ");
            context.push_str(&entry.text);
            context.push('\n');
        }
        context.push_str(
            "\nAs the client, react naturally or ask your next question. Keep it to one or two sentences.",
        );
    }

    context
}

static SCENARIOS: &[ScenarioDefinition] = &[
    ScenarioDefinition {
        id: "love",
        name: "Love Reading",
        icon: "💕",
        description: "A new crush and where it might lead",
        system_prompt: "You are a client in your twenties or thirties visiting a tarot reader. \
You recently developed feelings for someone and want to know where things could go. \
Share your worries naturally and sincerely, agree or wonder aloud at the reader's \
interpretations, and ask follow-up questions. Keep every reply to one or two sentences.",
        opening_lines: &[
            "Hello, could you do a love reading for me?",
            "There's someone I've started to like recently, and I keep wondering whether it could work out.",
            "Should I make the first move, or wait for them to come to me?",
        ],
        follow_up_questions: &[
            "What should I actually do next, then?",
            "Do you think this relationship has room to grow?",
            "When would be a good time to tell them how I feel?",
            "Do you think they're interested in me too?",
            "Is there anything I should be careful about?",
        ],
        reactions: &[
            "Ah, I see. That feels right, actually.",
            "Really? I hadn't thought of it that way.",
            "Okay, I understand. Thank you.",
            "That part really resonates with me.",
            "That's close to what I've been feeling, honestly.",
        ],
    },
    ScenarioDefinition {
        id: "wealth",
        name: "Money Reading",
        icon: "💰",
        description: "Business plans, investments, finances",
        system_prompt: "You are a client in your thirties or forties who runs a business. \
You are about to start a new venture or commit to an investment and want to know whether \
it will pay off. Stay realistic and serious, weigh the reader's interpretations against \
your plans, and keep every reply to one or two sentences.",
        opening_lines: &[
            "Hello, I'd like a reading about my finances.",
            "I've been preparing a new business, and I'm wondering whether it will go well.",
            "I just received an investment offer and I can't decide what to do.",
        ],
        follow_up_questions: &[
            "How likely is this venture to succeed?",
            "Will my finances ever feel stable?",
            "Is now the right time to invest, or should I wait?",
            "Are there risks I should watch out for?",
            "When could I expect to see results?",
        ],
        reactions: &[
            "That was exactly the part I was worried about.",
            "Ah, so it can be read that way too.",
            "I should approach this more carefully, then.",
            "I didn't expect that at all.",
            "Thank you, that's concrete advice I can use.",
        ],
    },
    ScenarioDefinition {
        id: "career",
        name: "Career Reading",
        icon: "💼",
        description: "Work, job changes, direction",
        system_prompt: "You are a client in your twenties or thirties with a steady job. \
You are torn between staying where you are and taking a new opportunity. Ask for guidance \
about your path, react honestly to the reader's interpretations, and keep every reply to \
one or two sentences.",
        opening_lines: &[
            "Hi, I came because I've been struggling with a career decision.",
            "I'm thinking about leaving my current job for a new one.",
            "I got an offer from another company, and I can't make up my mind.",
        ],
        follow_up_questions: &[
            "Would I be better off staying at my current company?",
            "Is a new challenge really the right fit for me?",
            "When would be a good time to make the move?",
            "Will this help my career in the long run?",
            "Which field do you think I should head toward?",
        ],
        reactions: &[
            "I'd never looked at it from that angle.",
            "Yes, that's the part that matters most.",
            "Thank you, that's practical advice.",
            "Approaching it that way makes sense.",
            "I feel braver about it already.",
        ],
    },
    ScenarioDefinition {
        id: "health",
        name: "Health Reading",
        icon: "🏥",
        description: "Wellbeing and things to watch",
        system_prompt: "You are a middle-aged client who has been worried about your health \
lately. You want to know what to watch out for. Stay earnest and a little cautious, take \
the reader's interpretations to heart, and keep every reply to one or two sentences.",
        opening_lines: &[
            "Hello, could you look at my health for me?",
            "I haven't been feeling great lately. Is there anything I should be careful about?",
            "I have a few health questions on my mind.",
        ],
        follow_up_questions: &[
            "Is there anything in particular I should watch out for?",
            "Should I go in for a checkup?",
            "How should I change my daily habits?",
            "What should I do about stress?",
            "How long do you think recovery will take?",
        ],
        reactions: &[
            "I really will have to be careful about that.",
            "Thank you for telling me.",
            "I'll try to do exactly that.",
            "That's a relief to hear.",
            "Specific advice like that helps a lot.",
        ],
    },
    ScenarioDefinition {
        id: "general",
        name: "General Reading",
        icon: "🌟",
        description: "Overall fortune and guidance",
        system_prompt: "You are a client visiting a tarot reader with no single pressing \
question. Life feels complicated lately and you are curious what lies ahead. Stay \
open-minded, react warmly to the reader's interpretations, ask about whatever stands out, \
and keep every reply to one or two sentences.",
        opening_lines: &[
            "Hello, could you give me a general reading?",
            "My mind has been all over the place lately.",
            "I came because I'm curious how things will unfold for me.",
        ],
        follow_up_questions: &[
            "What should I be most careful about?",
            "Is a good opportunity coming my way?",
            "What kind of mindset should I keep?",
            "Is there an area of my life that needs attention?",
            "Do you see a positive change ahead?",
        ],
        reactions: &[
            "I see. That makes sense.",
            "That gives me a lot to think about.",
            "Thank you, those are kind words.",
            "I'll keep that close to heart.",
            "That sounds hopeful.",
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Speaker;

    #[test]
    fn test_catalog_has_five_scenarios() {
        assert_eq!(all_scenarios().len(), 5);
    }

    #[test]
    fn test_lookup_by_id() {
        let love = scenario("love").unwrap();
        assert_eq!(love.name, "Love Reading");
        assert!(scenario("unknown").is_none());
    }

    #[test]
    fn test_every_scenario_has_full_pools() {
        for scenario in all_scenarios() {
            assert_eq!(scenario.opening_lines.len(), 3, "{}", scenario.id);
            assert_eq!(scenario.follow_up_questions.len(), 5, "{}", scenario.id);
            assert_eq!(scenario.reactions.len(), 5, "{}", scenario.id);
        }
    }

    #[test]
    fn test_closing_pool_has_five_entries() {
        assert_eq!(CLOSING_LINES.len(), 5);
        assert!(CLOSING_LINES.contains(&random_closing_line()));
    }

    #[test]
    fn test_stage_thresholds() {
        assert_eq!(stage_for_turns(0), Stage::Opening);
        assert_eq!(stage_for_turns(2), Stage::Opening);
        assert_eq!(stage_for_turns(3), Stage::Middle);
        assert_eq!(stage_for_turns(8), Stage::Middle);
        assert_eq!(stage_for_turns(9), Stage::Closing);
        assert_eq!(stage_for_turns(42), Stage::Closing);
    }

    #[test]
    fn test_random_pool_choices_stay_in_pool() {
        let love = scenario("love").unwrap();
        for _ in 0..20 {
            assert!(love.follow_up_questions.contains(&love.random_follow_up()));
            assert!(love.reactions.contains(&love.random_reaction()));
        }
    }

    #[test]
    fn test_context_for_empty_transcript_asks_for_greeting() {
        let love = scenario("love").unwrap();
        let context = build_conversation_context(love, &[]);
        assert!(context.starts_with(love.system_prompt));
        assert!(context.contains("Open the consultation"));
        assert!(!context.contains("Previous conversation"));
    }

    #[test]
    fn test_context_renders_transcript_with_speaker_labels() {
        let love = scenario("love").unwrap();
        let transcript = vec![
            Utterance {
                speaker: Speaker::Client,
                text: "Hello there.".to_string(),
            },
            Utterance {
                speaker: Speaker::Teacher,
                text: "The cards look bright today.".to_string(),
            },
        ];
        let context = build_conversation_context(love, &transcript);
        assert!(context.contains("Previous conversation:"));
        assert!(context.contains("Client: Hello there."));
        assert!(context.contains("Teacher: The cards look bright today."));
        assert!(context.contains("react naturally"));
    }
}
