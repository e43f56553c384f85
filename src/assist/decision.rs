//! Extraction and validation of the model's decision.

use crate::error::{DiligentError, Result};
use crate::questionnaire::{AnswerOption, Question};
use serde::Serialize;
use serde_json::Value;

/// The structured answer a model gives for one question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub can_answer: bool,
    pub answer_value: Option<String>,
    pub answer_label: String,
    pub reason: String,
}

impl Decision {
    /// The option to apply, or `None` when the model could not answer.
    ///
    /// A decision claiming an answer without a value counts as no answer.
    /// Fails with [`DiligentError::InvalidOption`] when the value is not one of
    /// the question's options.
    pub fn resolve<'q>(&self, question: &'q Question) -> Result<Option<&'q AnswerOption>> {
        let Some(value) = self.answer_value.as_deref().filter(|_| self.can_answer) else {
            return Ok(None);
        };

        question
            .option(value)
            .map(Some)
            .ok_or_else(|| DiligentError::InvalidOption {
                question: question.number.clone(),
                value: value.to_string(),
            })
    }
}

/// Parse a decision out of free-form model output.
///
/// The text between the first `{` and the last `}` (inclusive) must be a JSON
/// object; anything around it is ignored.
pub fn parse_decision(raw: &str) -> Result<Decision> {
    let (Some(first), Some(last)) = (raw.find('{'), raw.rfind('}')) else {
        return Err(DiligentError::MalformedResponse(
            "no JSON object found in model output".to_string(),
        ));
    };
    if last <= first {
        return Err(DiligentError::MalformedResponse(
            "no JSON object found in model output".to_string(),
        ));
    }

    let value: Value = serde_json::from_str(&raw[first..=last])
        .map_err(|e| DiligentError::MalformedResponse(format!("invalid JSON object: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| DiligentError::MalformedResponse("expected a JSON object".to_string()))?;

    let can_answer = match object.get("canAnswer") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    };

    let answer_value = match object.get("answerValue") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    Ok(Decision {
        can_answer,
        answer_value,
        answer_label: string_field(object.get("answerLabel")),
        reason: string_field(object.get("reason")),
    })
}

fn string_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}
