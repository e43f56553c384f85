//! Prompt assembly for one question.

use crate::config::Prompts;
use crate::document::Document;
use crate::questionnaire::Question;
use crate::retrieval::EvidenceItem;
use std::collections::HashMap;

/// Build the decision prompt from the question, its evidence and the document metadata.
///
/// Pure: the same inputs always give the same prompt.
pub fn build_prompt(question: &Question, evidence: &[EvidenceItem], document: &Document, prompts: &Prompts) -> String {
    let templates = &prompts.decision;

    let options = question
        .options
        .iter()
        .map(|o| format!("- {}", o.label))
        .collect::<Vec<_>>()
        .join("\n");

    let evidence_text = if evidence.is_empty() {
        templates.no_evidence.clone()
    } else {
        evidence
            .iter()
            .map(|item| {
                let mut vars = HashMap::new();
                vars.insert("rank".to_string(), item.rank.to_string());
                vars.insert("score".to_string(), format!("{:.2}", item.similarity_score));
                vars.insert("text".to_string(), item.text.clone());
                Prompts::render(&templates.excerpt, &vars)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    let mut vars = HashMap::new();
    vars.insert("option_values".to_string(), question.option_values().join(", "));
    vars.insert("options".to_string(), options);
    vars.insert("document_name".to_string(), document.display_name().to_string());
    vars.insert(
        "truncation_note".to_string(),
        if document.truncated {
            templates.truncated_note.clone()
        } else {
            String::new()
        },
    );
    vars.insert("question_number".to_string(), question.number.clone());
    vars.insert("question_text".to_string(), question.text.clone());
    vars.insert("evidence".to_string(), evidence_text);

    prompts.render_with_custom(&templates.template, &vars)
}
