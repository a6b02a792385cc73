//! Scripted two-persona debate orchestration
//!
//! Each round is one pro argument followed by one con rebuttal against the
//! same topic. Every call's context is reconstructed from the full
//! transcript so far, so the sequence is strictly ordered by construction:
//! con's rebuttal must see the pro argument produced moments earlier in the
//! same round. Nothing here can run in parallel without changing meaning.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::oracle::{CompletionOracle, OracleRequest};

/// Inclusive bounds on the number of debate rounds
pub const MIN_ROUNDS: u32 = 1;
pub const MAX_ROUNDS: u32 = 10;

// Debates want more creative, punchier output than regular chat.
const DEBATE_TEMPERATURE: f32 = 0.8;
const DEBATE_MAX_TOKENS: u32 = 200;

/// Which persona produced an argument
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DebateSide {
    Pro,
    Con,
}

/// One argument in the transcript; ephemeral, never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateTurn {
    pub side: DebateSide,
    pub argument: String,
    /// 1-based round number
    pub round: u32,
}

/// Per-round pairing of the two arguments, for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRound {
    pub round: u32,
    pub pro: String,
    pub con: String,
}

/// Full debate result: the flat transcript plus a grouped-by-round view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateOutcome {
    pub transcript: Vec<DebateTurn>,
    pub rounds: Vec<DebateRound>,
}

/// Runs alternating pro/con completions over an accumulating transcript
#[derive(Clone)]
pub struct DebateOrchestrator {
    oracle: Arc<dyn CompletionOracle>,
}

impl DebateOrchestrator {
    pub fn new(oracle: Arc<dyn CompletionOracle>) -> Self {
        Self { oracle }
    }

    /// Run a full debate. All-or-nothing: any oracle failure aborts the
    /// debate and no partial transcript is returned.
    pub async fn run(&self, topic: &str, rounds: u32) -> Result<DebateOutcome> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(Error::InvalidRequest("Debate topic is required".to_string()));
        }
        if !(MIN_ROUNDS..=MAX_ROUNDS).contains(&rounds) {
            return Err(Error::InvalidRequest(
                "Rounds must be between 1 and 10".to_string(),
            ));
        }

        let pro_prompt = advocacy_prompt(DebateSide::Pro, topic);
        let con_prompt = advocacy_prompt(DebateSide::Con, topic);

        tracing::info!(topic, rounds, "starting debate");

        let mut transcript: Vec<DebateTurn> = Vec::with_capacity((rounds * 2) as usize);

        for round in 1..=rounds {
            let pro_context = build_context(&transcript, DebateSide::Pro, topic);
            let argument = self.call(&pro_prompt, pro_context).await?;
            transcript.push(DebateTurn {
                side: DebateSide::Pro,
                argument,
                round,
            });

            // Con sees the transcript including this round's pro argument.
            let con_context = build_context(&transcript, DebateSide::Con, topic);
            let argument = self.call(&con_prompt, con_context).await?;
            transcript.push(DebateTurn {
                side: DebateSide::Con,
                argument,
                round,
            });
        }

        let rounds = group_by_round(&transcript);
        Ok(DebateOutcome { transcript, rounds })
    }

    async fn call(&self, system_prompt: &str, context: String) -> Result<String> {
        self.oracle
            .complete(OracleRequest {
                system_prompt: system_prompt.to_string(),
                user_content: context,
                image: None,
                temperature: Some(DEBATE_TEMPERATURE),
                max_tokens: Some(DEBATE_MAX_TOKENS),
            })
            .await
    }
}

fn advocacy_prompt(side: DebateSide, topic: &str) -> String {
    let stance = match side {
        DebateSide::Pro => "FOR",
        DebateSide::Con => "AGAINST",
    };
    format!(
        "You are participating in a debate. You MUST argue {stance} the position: \"{topic}\".\n\
         Be persuasive, use evidence and logic. Keep responses under 100 words. \
         Be respectful but firm in your stance."
    )
}

/// Reconstruct a side's view of the debate so far.
///
/// An empty transcript yields the opening-argument instruction; otherwise
/// prior turns are labelled "You said" vs "Opponent said" from the calling
/// side's perspective.
fn build_context(transcript: &[DebateTurn], side: DebateSide, topic: &str) -> String {
    if transcript.is_empty() {
        let stance = match side {
            DebateSide::Pro => "for",
            DebateSide::Con => "against",
        };
        return format!("Make your opening argument {stance}: \"{topic}\"");
    }

    let lines: Vec<String> = transcript
        .iter()
        .map(|turn| {
            if turn.side == side {
                format!("You said: {}", turn.argument)
            } else {
                format!("Opponent said: {}", turn.argument)
            }
        })
        .collect();

    let closing = match side {
        DebateSide::Pro => "Provide your next argument:",
        DebateSide::Con => "Provide your counter-argument:",
    };

    format!("Previous arguments:\n{}\n\n{closing}", lines.join("\n"))
}

fn group_by_round(transcript: &[DebateTurn]) -> Vec<DebateRound> {
    let mut rounds: Vec<DebateRound> = Vec::new();
    for turn in transcript {
        if rounds.last().map(|r| r.round) != Some(turn.round) {
            rounds.push(DebateRound {
                round: turn.round,
                pro: String::new(),
                con: String::new(),
            });
        }
        let entry = rounds.last_mut().expect("round entry just pushed");
        match turn.side {
            DebateSide::Pro => entry.pro = turn.argument.clone(),
            DebateSide::Con => entry.con = turn.argument.clone(),
        }
    }
    rounds
}
