use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The closed set of tutoring subjects.
///
/// Each subject carries immutable configuration: a system instruction, a
/// reasoning tier for model selection, and whether web grounding is enabled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    General,
    Math,
    Science,
    History,
    Literature,
}

/// Which class of model a subject should be served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningTier {
    /// Low-latency model for everyday tutoring.
    Fast,
    /// High-reasoning model for stepwise problem solving and writing feedback.
    Deep,
}

impl Subject {
    pub fn all() -> [Subject; 5] {
        [
            Subject::General,
            Subject::Math,
            Subject::Science,
            Subject::History,
            Subject::Literature,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::General => "general",
            Subject::Math => "math",
            Subject::Science => "science",
            Subject::History => "history",
            Subject::Literature => "literature",
        }
    }

    pub fn parse(s: &str) -> Result<Subject, CoreError> {
        match s.trim().to_lowercase().as_str() {
            "general" => Ok(Subject::General),
            "math" => Ok(Subject::Math),
            "science" => Ok(Subject::Science),
            "history" => Ok(Subject::History),
            "literature" => Ok(Subject::Literature),
            other => Err(CoreError::UnknownSubject(other.to_string())),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Subject::General => "General Helper",
            Subject::Math => "Mathematics",
            Subject::Science => "Science & Nature",
            Subject::History => "History & Social Studies",
            Subject::Literature => "Literature & Writing",
        }
    }

    /// The system instruction sent with every chat turn for this subject.
    pub fn system_instruction(&self) -> &'static str {
        match self {
            Subject::General => {
                "You are Lumina, a helpful and encouraging AI learning assistant. \
                 Help the student with their questions clearly and concisely."
            }
            Subject::Math => {
                "You are an expert Mathematics tutor. Guide the student step-by-step \
                 through problems. Do not just give the final answer; explain the \
                 logic. Use standard text formatting for equations where possible. \
                 If the problem is complex, use deep reasoning."
            }
            Subject::Science => {
                "You are a Science tutor. Explain concepts using real-world \
                 analogies. If asked about diagrams, describe them vividly."
            }
            Subject::History => {
                "You are a History expert. Provide context, dates, and connections \
                 between events. Use Google Search grounding to ensure facts about \
                 recent history are accurate."
            }
            Subject::Literature => {
                "You are a Literature and Writing coach. Help with essay structure, \
                 grammar, and literary analysis. Do not write the essay for the \
                 student, but guide them to improve their own writing."
            }
        }
    }

    /// Whether the web-grounding tool is enabled for this subject.
    pub fn grounding_enabled(&self) -> bool {
        matches!(self, Subject::General | Subject::Science | Subject::History)
    }

    /// Model-selection policy: deep reasoning for Math and Literature,
    /// fast everywhere else.
    pub fn reasoning_tier(&self) -> ReasoningTier {
        match self {
            Subject::Math | Subject::Literature => ReasoningTier::Deep,
            _ => ReasoningTier::Fast,
        }
    }
}
