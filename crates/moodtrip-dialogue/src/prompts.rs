//! Question prompts and reply interpretation.

use moodtrip_core::{ConversationTurn, KeywordSet, TravelQuestionnaire, TurnRole};
use moodtrip_infer::json::parse_json_object;
use serde::Deserialize;

/// Asked when the model cannot produce a first question.
pub const FALLBACK_FIRST_QUESTION: &str = "您希望这次旅行是放松还是探索？";

/// Assistant turn appended when the dialogue completes.
pub const COMPLETION_MESSAGE: &str = "信息已收集完整，正在为您生成推荐...";

/// Free-text end markers accepted from models that ignore the JSON contract.
const LEGACY_DONE_PHRASES: &[&str] = &["信息已收集完整", "可以开始推荐"];

pub fn first_question_prompt(
    keywords: &KeywordSet,
    questionnaire: Option<&TravelQuestionnaire>,
) -> String {
    let mut context = format!("用户想要旅行的情绪关键词：{}", keywords.joined());
    if let Some(q) = questionnaire {
        context.push_str("\n已收集的基础信息：\n");
        context.push_str(&q.describe());
    }

    format!(
        "作为旅行规划助手，请根据用户的情绪和已收集的信息，生成一个个性化问题来了解更多需求。问题应该：\n\
         1. 与用户的情绪关键词相关\n\
         2. 帮助更好地推荐景点\n\
         3. 自然、友好\n\n\
         只返回问题内容，不要其他解释。\n\n{}\n\n问题：",
        context
    )
}

/// `助手: ...` / `用户: ...`, one line per turn.
pub fn serialize_history(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|t| {
            let speaker = match t.role {
                TurnRole::Assistant => "助手",
                TurnRole::User => "用户",
            };
            format!("{}: {}", speaker, t.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn next_question_prompt(turns: &[ConversationTurn]) -> String {
    format!(
        "根据以下对话历史，生成下一个个性化问题。如果已经收集足够信息，可以结束对话。\n\n\
         对话历史：\n{}\n\n\
         只返回JSON，不要其他解释：{{\"done\": 信息是否已足够(true/false), \"question\": \"下一个问题，done为true时留空\"}}",
        serialize_history(turns)
    )
}

/// What the model wants to do after an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    Ask(String),
    Done,
}

#[derive(Deserialize)]
struct NextStepReply {
    #[serde(default)]
    done: bool,
    #[serde(default)]
    question: String,
}

/// Read the structured reply, falling back to the legacy end phrases.
pub fn parse_next_step(reply: &str) -> NextStep {
    if let Ok(parsed) = parse_json_object::<NextStepReply>(reply) {
        let question = parsed.question.trim();
        return if parsed.done || question.is_empty() {
            NextStep::Done
        } else {
            NextStep::Ask(question.to_string())
        };
    }

    let text = reply.trim();
    if text.is_empty() || LEGACY_DONE_PHRASES.iter().any(|p| text.contains(p)) {
        NextStep::Done
    } else {
        NextStep::Ask(text.to_string())
    }
}
