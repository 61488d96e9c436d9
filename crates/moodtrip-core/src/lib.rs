//! MoodTrip Core: shared data model, configuration, error taxonomy.

pub mod config;
pub mod error;
pub mod keywords;
pub mod place;
pub mod questionnaire;
pub mod turn;

pub use config::{DataPaths, ModelConfig, MoodTripConfig, PipelineConfig, ScoringWeights, SessionBackend};
pub use error::{Error, Result};
pub use keywords::KeywordSet;
pub use place::*;
pub use questionnaire::{TimeOfDay, TravelQuestionnaire};
pub use turn::{pair_answers, ConversationTurn, QuestionAnswer, TurnKind, TurnRole};
