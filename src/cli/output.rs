//! CLI output formatting utilities.

use crate::assist::AskOutcome;
use crate::chunking::Chunk;
use crate::questionnaire::{AnswerState, Question};
use crate::telemetry::{CallStatus, TelemetryRecord, TelemetrySummary};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a question with its options.
    pub fn question(question: &Question) {
        println!("\n{} {}", style(&question.number).cyan().bold(), question.text);
        for option in &question.options {
            println!("     {} {}", style(format!("[{}]", option.score)).dim(), option.label);
        }
    }

    /// Print the recorded answer of a question.
    pub fn answer(question: &Question, answer: &AnswerState) {
        let selected = answer
            .selected_option_value
            .as_deref()
            .and_then(|value| question.option(value))
            .map(|option| option.label.clone())
            .unwrap_or_else(|| "-".to_string());

        println!("\n{} {}", style(&question.number).cyan().bold(), question.text);
        Output::kv("Answer", &selected);
        Output::kv("Status", &answer.status.to_string());
        if !answer.evidence_reference.is_empty() {
            Output::kv("Evidence", &answer.evidence_reference);
        }
        if !answer.reasoning_note.is_empty() {
            Output::kv("Reasoning", &answer.reasoning_note);
        }
    }

    /// Print the result of one AI invocation.
    pub fn outcome(outcome: &AskOutcome) {
        let number = style(&outcome.question_number).cyan().bold();
        if outcome.superseded {
            println!("{} {} {}", style(">>").dim(), number, style("superseded by a newer request").dim());
        } else if outcome.is_applied() && outcome.answer.is_some() {
            println!("{} {} {}", style(">>").green().bold(), number, outcome.status_message);
        } else if outcome.is_applied() {
            println!("{} {} {}", style(">>").yellow().bold(), number, outcome.status_message);
        } else {
            println!("{} {} {}", style(">>").red().bold(), number, outcome.status_message);
        }

        if let Some(option) = &outcome.answer {
            Output::kv("Answer", &option.label);
        }
        if let Some(decision) = &outcome.decision {
            if !decision.reason.is_empty() {
                Output::kv("Reason", &decision.reason);
            }
        }
        if !outcome.evidence.is_empty() {
            let scores: Vec<String> = outcome
                .evidence
                .iter()
                .map(|e| format!("#{} {:.2}", e.chunk_id, e.similarity_score))
                .collect();
            Output::kv("Evidence", &scores.join(", "));
        }
    }

    /// Print one chunk with its offsets.
    pub fn chunk(chunk: &Chunk) {
        println!(
            "\n{} {} ({}..{}, {} chars)",
            style(">>").green(),
            style(format!("Chunk {}", chunk.id)).bold(),
            chunk.start_offset,
            chunk.end_offset,
            chunk.char_len()
        );
        println!("   {}", content_preview(&chunk.text, 200));
    }

    /// Print one telemetry record as a single line.
    pub fn telemetry_record(record: &TelemetryRecord) {
        let status = match record.status {
            CallStatus::Success => style(record.status.to_string()).green(),
            CallStatus::Error => style(record.status.to_string()).red(),
            CallStatus::Pending => style(record.status.to_string()).yellow(),
        };
        let tokens = record
            .token_usage
            .total
            .map(|t| format!("{} tokens", t))
            .unwrap_or_else(|| "usage n/a".to_string());
        let duration = record
            .duration_ms
            .map(|ms| format!("{} ms", ms))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "  {} {} {} {} ({} bytes, {}, {})",
            style(record.timestamp.format("%H:%M:%S")).dim(),
            style(format!("{}/{}", record.call_type, record.subtype)).bold(),
            status,
            record.description,
            record.payload_size,
            tokens,
            duration
        );
        if let Some(message) = &record.error_message {
            println!("      {}", style(message).red());
        }
    }

    /// Print the aggregate telemetry figures.
    pub fn telemetry_summary(summary: &TelemetrySummary) {
        Output::kv(
            "API calls",
            &format!(
                "{} ({} embedding, {} completion)",
                summary.calls, summary.embedding_calls, summary.completion_calls
            ),
        );
        Output::kv(
            "Outcomes",
            &format!(
                "{} succeeded, {} failed, {} pending",
                summary.succeeded, summary.failed, summary.pending
            ),
        );
        Output::kv(
            "Tokens",
            &format!(
                "{} in / {} out / {} total",
                token_count(summary.input_tokens),
                token_count(summary.output_tokens),
                token_count(summary.total_tokens)
            ),
        );
        if summary.calls_without_usage > 0 {
            Output::kv("Without usage", &summary.calls_without_usage.to_string());
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

fn token_count(count: Option<u64>) -> String {
    count.map(|c| c.to_string()).unwrap_or_else(|| "n/a".to_string())
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        format!("{}...", content.chars().take(max_chars).collect::<String>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_preview_counts_characters() {
        assert_eq!(content_preview("a\nb", 10), "a b");
        assert_eq!(content_preview("ääääää", 3), "äää...");
    }

    #[test]
    fn test_token_count_distinguishes_missing() {
        assert_eq!(token_count(None), "n/a");
        assert_eq!(token_count(Some(0)), "0");
    }
}
