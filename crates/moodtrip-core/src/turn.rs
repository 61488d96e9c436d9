//! Dialogue turns shared by the dialogue engine and session stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    Assistant,
    User,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::Assistant => "assistant",
            TurnRole::User => "user",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "assistant" => Some(TurnRole::Assistant),
            "user" => Some(TurnRole::User),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    Question,
    Answer,
    Recommendation,
}

impl TurnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnKind::Question => "question",
            TurnKind::Answer => "answer",
            TurnKind::Recommendation => "recommendation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "question" => Some(TurnKind::Question),
            "answer" => Some(TurnKind::Answer),
            "recommendation" => Some(TurnKind::Recommendation),
            _ => None,
        }
    }
}

/// One message in a dialogue session. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    pub kind: TurnKind,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: TurnRole, content: impl Into<String>, kind: TurnKind) -> Self {
        Self {
            role,
            content: content.into(),
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn question(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content, TurnKind::Question)
    }

    pub fn answer(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content, TurnKind::Answer)
    }

    pub fn is_assistant_question(&self) -> bool {
        self.role == TurnRole::Assistant && self.kind == TurnKind::Question
    }
}

/// A user answer with the assistant question it replied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
}

/// Pair each user answer with the turn immediately before it, whatever that
/// turn is. An answer opening the log has nothing to pair with and is left out.
pub fn pair_answers(turns: &[ConversationTurn]) -> Vec<QuestionAnswer> {
    turns
        .windows(2)
        .filter(|w| w[1].role == TurnRole::User && w[1].kind == TurnKind::Answer)
        .map(|w| QuestionAnswer {
            question: w[0].content.clone(),
            answer: w[1].content.clone(),
        })
        .collect()
}
