//! Prompt templates for Diligent.
//!
//! Prompts can be customized by placing a `decision.toml` file in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub decision: DecisionPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompts for the per-question answer decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionPrompts {
    /// Main template. Receives `option_values`, `options`, `document_name`,
    /// `truncation_note`, `question_number`, `question_text` and `evidence`.
    pub template: String,
    /// Inserted as `truncation_note` when the document was cut to the character cap.
    pub truncated_note: String,
    /// Used as `evidence` when retrieval found nothing above the threshold.
    pub no_evidence: String,
    /// Format of one excerpt. Receives `rank`, `score` and `text`.
    pub excerpt: String,
}

impl Default for DecisionPrompts {
    fn default() -> Self {
        Self {
            template: r#"You are assisting with a corporate sustainability due diligence assessment. Based strictly on the provided document excerpts, decide whether the document contains enough information to answer the question.
Return ONLY a compact JSON object with the following keys: "canAnswer" (boolean), "answerValue" (string or null), "answerLabel" (string), and "reason" (string).
- If "canAnswer" is true, "answerValue" must be one of [{{option_values}}] and "answerLabel" must match the chosen option's label.
- If "canAnswer" is false, set "answerValue" to null and "answerLabel" to an empty string. Explain briefly in "reason" why the document is insufficient.
Document name: {{document_name}}
{{truncation_note}}Question {{question_number}}: {{question_text}}
Answer options:
{{options}}

{{evidence}}"#
                .to_string(),

            truncated_note: "Note: The document was truncated to fit the analysis limit. Base your decision only on the provided excerpts.\n"
                .to_string(),

            no_evidence: "No excerpt of the document was relevant enough to this question. Without supporting evidence you must set \"canAnswer\" to false."
                .to_string(),

            excerpt: "<excerpt rank=\"{{rank}}\" similarity=\"{{score}}\">\n{{text}}\n</excerpt>"
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let decision_path = custom_path.join("decision.toml");
            if decision_path.exists() {
                let content = std::fs::read_to_string(&decision_path)?;
                prompts.decision = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is a single left-to-right pass, so `{{name}}` sequences inside
    /// substituted values are never expanded. Unknown placeholders are kept verbatim.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            result.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];
            match after_open.find("}}") {
                Some(close) => {
                    let key = &after_open[..close];
                    match vars.get(key) {
                        Some(value) => result.push_str(value),
                        None => {
                            result.push_str("{{");
                            result.push_str(key);
                            result.push_str("}}");
                        }
                    }
                    rest = &after_open[close + 2..];
                }
                None => {
                    result.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }

        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
