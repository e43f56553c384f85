//! Per-question answer state and progress.

use super::Questionnaire;
use crate::error::{DiligentError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Review status of an answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerStatus {
    #[default]
    Open,
    AnsweredByAI,
    Checked,
}

impl fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerStatus::Open => write!(f, "Open"),
            AnswerStatus::AnsweredByAI => write!(f, "Answered by AI"),
            AnswerStatus::Checked => write!(f, "Checked"),
        }
    }
}

impl FromStr for AnswerStatus {
    type Err = DiligentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "open" => Ok(AnswerStatus::Open),
            "answered by ai" | "ai" => Ok(AnswerStatus::AnsweredByAI),
            "checked" => Ok(AnswerStatus::Checked),
            other => Err(DiligentError::InvalidInput(format!("Unknown status: {}", other))),
        }
    }
}

/// What the user (or the AI) has recorded for one question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnswerState {
    pub selected_option_value: Option<String>,
    pub status: AnswerStatus,
    pub evidence_reference: String,
    pub reasoning_note: String,
}

/// Identifies one AI invocation for a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationToken {
    question: String,
    serial: u64,
}

impl InvocationToken {
    pub fn question(&self) -> &str {
        &self.question
    }
}

/// Answered count and score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
    pub score: u32,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} answered, score {}", self.answered, self.total, self.score)
    }
}

/// Answers keyed by question number.
///
/// Also hands out invocation tokens: a newer invocation for a question
/// supersedes older ones, whose results must then be discarded.
#[derive(Debug, Default)]
pub struct AnswerBook {
    answers: HashMap<String, AnswerState>,
    current: HashMap<String, u64>,
    next_serial: u64,
}

impl AnswerBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for a question; unanswered questions read as default.
    pub fn get(&self, number: &str) -> AnswerState {
        self.answers.get(number).cloned().unwrap_or_default()
    }

    /// Mutable state for a question, created on first use.
    pub fn entry(&mut self, number: &str) -> &mut AnswerState {
        self.answers.entry(number.to_string()).or_default()
    }

    /// Start a new invocation for a question, superseding any in flight.
    pub fn begin_invocation(&mut self, number: &str) -> InvocationToken {
        self.next_serial += 1;
        self.current.insert(number.to_string(), self.next_serial);
        InvocationToken {
            question: number.to_string(),
            serial: self.next_serial,
        }
    }

    /// Whether the token belongs to the latest invocation for its question.
    pub fn is_current(&self, token: &InvocationToken) -> bool {
        self.current.get(&token.question) == Some(&token.serial)
    }

    /// Whether an invocation for the question has started and not finished.
    pub fn is_in_flight(&self, number: &str) -> bool {
        self.current.contains_key(number)
    }

    /// Finish an invocation. Returns `false` if a newer one superseded it.
    pub fn finish_invocation(&mut self, token: &InvocationToken) -> bool {
        if self.is_current(token) {
            self.current.remove(&token.question);
            true
        } else {
            false
        }
    }

    /// Answered count and summed option scores over the questionnaire.
    pub fn progress(&self, questionnaire: &Questionnaire) -> Progress {
        let mut progress = Progress::default();

        for question in questionnaire.questions() {
            progress.total += 1;
            let selected = self
                .answers
                .get(&question.number)
                .and_then(|a| a.selected_option_value.as_deref())
                .and_then(|value| question.option(value));
            if let Some(option) = selected {
                progress.answered += 1;
                progress.score += option.score;
            }
        }

        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(AnswerStatus::AnsweredByAI.to_string(), "Answered by AI");
        assert_eq!("answered-by-ai".parse::<AnswerStatus>().unwrap(), AnswerStatus::AnsweredByAI);
        assert_eq!("Checked".parse::<AnswerStatus>().unwrap(), AnswerStatus::Checked);
        assert!("done".parse::<AnswerStatus>().is_err());
    }

    #[test]
    fn test_newer_invocation_supersedes() {
        let mut book = AnswerBook::new();
        let first = book.begin_invocation("3.1");
        let second = book.begin_invocation("3.1");
        let other = book.begin_invocation("3.3");

        assert!(!book.is_current(&first));
        assert!(book.is_current(&second));
        assert!(book.is_current(&other));

        assert!(!book.finish_invocation(&first));
        assert!(book.is_in_flight("3.1"));
        assert!(book.finish_invocation(&second));
        assert!(!book.is_in_flight("3.1"));
    }

    #[test]
    fn test_progress_counts_valid_selections() {
        let questionnaire = Questionnaire::builtin().unwrap();
        let mut book = AnswerBook::new();
        book.entry("3.1").selected_option_value = Some("A".to_string());
        book.entry("3.3").selected_option_value = Some("Z".to_string());
        book.entry("1.1").status = AnswerStatus::Checked;

        let progress = book.progress(&questionnaire);
        assert_eq!(progress.total, 59);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.score, 2);
    }
}
