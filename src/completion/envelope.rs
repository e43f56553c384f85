//! Response envelope shapes.
//!
//! Completion endpoints wrap the generated text differently. Each shape is a
//! matcher that returns the text when the body has that shape; shapes are tried
//! in order and the first match wins.

use serde_json::Value;

/// A named envelope matcher.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeShape {
    pub name: &'static str,
    pub extract: fn(&Value) -> Option<String>,
}

/// Known shapes, in priority order.
pub const ENVELOPE_SHAPES: &[EnvelopeShape] = &[
    EnvelopeShape {
        name: "responses.output",
        extract: responses_output,
    },
    EnvelopeShape {
        name: "responses.output_text",
        extract: output_text,
    },
    EnvelopeShape {
        name: "chat.choices",
        extract: chat_choices,
    },
];

/// Extract the generated text, returning the matching shape's name with it.
pub fn extract_text(body: &Value) -> Option<(&'static str, String)> {
    ENVELOPE_SHAPES
        .iter()
        .find_map(|shape| (shape.extract)(body).map(|text| (shape.name, text)))
}

/// `{"output": [{"content": [{"type": "output_text", "text": "..."}]}]}`
fn responses_output(body: &Value) -> Option<String> {
    let output = body.get("output")?.as_array()?;
    let text = output
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flat_map(|parts| parts.iter().map(part_text))
        .collect();
    Some(text)
}

/// `{"output_text": "..."}`
fn output_text(body: &Value) -> Option<String> {
    body.get("output_text")?.as_str().map(str::to_string)
}

/// `{"choices": [{"message": {"content": "..."}}]}` or `{"choices": [{"text": "..."}]}`
fn chat_choices(body: &Value) -> Option<String> {
    let choices = body.get("choices")?.as_array()?;
    let text = choices
        .iter()
        .map(|choice| {
            if let Some(text) = choice.get("text").and_then(Value::as_str) {
                return text.to_string();
            }
            match choice.get("message").and_then(|m| m.get("content")) {
                Some(Value::String(content)) => content.clone(),
                Some(Value::Array(parts)) => parts.iter().map(part_text).collect(),
                _ => String::new(),
            }
        })
        .collect();
    Some(text)
}

/// A content part is either a bare string or an object carrying `text` or `value`.
fn part_text(part: &Value) -> String {
    if let Some(text) = part.as_str() {
        return text.to_string();
    }
    part.get("text")
        .and_then(Value::as_str)
        .or_else(|| part.get("value").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}
