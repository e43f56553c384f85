//! The due-diligence questionnaire and the answers given to it.
//!
//! The catalog is static reference data embedded in the binary; answers are
//! tracked per question number in an [`AnswerBook`].

mod answers;

pub use answers::{AnswerBook, AnswerState, AnswerStatus, InvocationToken, Progress};

use crate::error::{DiligentError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const BUILTIN_CATALOG: &str = include_str!("catalog.toml");

/// One selectable answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub value: String,
    pub label: String,
    pub score: u32,
}

/// A single question with its fixed option set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub number: String,
    pub text: String,
    pub options: Vec<AnswerOption>,
}

impl Question {
    /// Find an option by its value.
    pub fn option(&self, value: &str) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.value == value)
    }

    /// Option values in display order.
    pub fn option_values(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.value.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsection {
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub subsections: Vec<Subsection>,
}

impl Section {
    /// Questions of the section followed by those of its subsections.
    pub fn all_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions
            .iter()
            .chain(self.subsections.iter().flat_map(|s| s.questions.iter()))
    }

    /// Number of questions including subsections.
    pub fn count_questions(&self) -> usize {
        self.all_questions().count()
    }
}

/// The full questionnaire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub sections: Vec<Section>,
}

impl Questionnaire {
    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_CATALOG)
    }

    /// Parse a catalog, rejecting duplicate question numbers and empty option sets.
    pub fn from_toml(content: &str) -> Result<Self> {
        let questionnaire: Questionnaire = toml::from_str(content)?;

        let mut seen = HashSet::new();
        for question in questionnaire.questions() {
            if !seen.insert(question.number.as_str()) {
                return Err(DiligentError::Config(format!(
                    "Duplicate question number {}",
                    question.number
                )));
            }
            if question.options.is_empty() {
                return Err(DiligentError::Config(format!(
                    "Question {} has no options",
                    question.number
                )));
            }
        }

        Ok(questionnaire)
    }

    /// All questions in display order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections.iter().flat_map(|s| s.all_questions())
    }

    /// Look up a question by number.
    pub fn find(&self, number: &str) -> Result<&Question> {
        let number = number.trim();
        self.questions()
            .find(|q| q.number == number)
            .ok_or_else(|| DiligentError::UnknownQuestion(number.to_string()))
    }

    pub fn len(&self) -> usize {
        self.questions().count()
    }

    pub fn is_empty(&self) -> bool {
        self.questions().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_shape() {
        let questionnaire = Questionnaire::builtin().unwrap();
        assert_eq!(questionnaire.sections.len(), 4);
        assert_eq!(questionnaire.len(), 59);

        let subsections: usize = questionnaire.sections.iter().map(|s| s.subsections.len()).sum();
        assert_eq!(subsections, 3);

        let counted: usize = questionnaire.sections.iter().map(Section::count_questions).sum();
        assert_eq!(counted, 59);
    }

    #[test]
    fn test_find_question() {
        let questionnaire = Questionnaire::builtin().unwrap();
        let question = questionnaire.find("3.1").unwrap();
        assert_eq!(question.option_values(), vec!["A", "B", "C"]);
        assert_eq!(question.option("C").unwrap().label, "C: No");

        assert!(questionnaire.find("4.2.1 (Env)").is_ok());
        assert!(matches!(
            questionnaire.find("9.9"),
            Err(DiligentError::UnknownQuestion(n)) if n == "9.9"
        ));
    }

    #[test]
    fn test_display_order_starts_with_scope() {
        let questionnaire = Questionnaire::builtin().unwrap();
        let first: Vec<&str> = questionnaire.questions().take(3).map(|q| q.number.as_str()).collect();
        assert_eq!(first, vec!["1.1", "2.1", "2.2"]);
    }

    #[test]
    fn test_duplicate_numbers_rejected() {
        let catalog = r#"
[[sections]]
title = "S"

[[sections.questions]]
number = "1"
text = "a"
options = [{ value = "A", label = "A: Yes", score = 1 }]

[[sections.questions]]
number = "1"
text = "b"
options = [{ value = "A", label = "A: Yes", score = 1 }]
"#;
        assert!(matches!(Questionnaire::from_toml(catalog), Err(DiligentError::Config(_))));
    }
}
