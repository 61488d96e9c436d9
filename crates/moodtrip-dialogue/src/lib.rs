//! MoodTrip Dialogue: the follow-up question loop between keyword
//! extraction and recommendation.

pub mod engine;
pub mod prompts;

pub use engine::{AnswerOutcome, DialogueContext, DialogueEngine, DialogueState};
pub use prompts::{NextStep, COMPLETION_MESSAGE, FALLBACK_FIRST_QUESTION};
