//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::session::Session;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Run the ask command.
pub async fn run_ask(
    file: &Path,
    numbers: &[String],
    all: bool,
    api_key: Option<&str>,
    model: Option<String>,
    telemetry_json: Option<&PathBuf>,
    mut settings: Settings,
) -> Result<()> {
    // Pre-flight checks
    let credential = match preflight::check(Operation::Ask, file, api_key, &settings) {
        Ok(credential) => credential,
        Err(e) => {
            Output::error(&e.to_string());
            return Err(e.into());
        }
    };

    if let Some(model) = model {
        settings.completion.model = model;
    }
    let session = Session::from_settings(&settings)?;

    let numbers: Vec<String> = if all {
        session.questionnaire().questions().map(|q| q.number.clone()).collect()
    } else if numbers.is_empty() {
        anyhow::bail!("No questions given. Pass question numbers or --all.");
    } else {
        for number in numbers {
            session.questionnaire().find(number)?;
        }
        numbers.to_vec()
    };

    let spinner = Output::spinner("Reading document...");
    let document = match session.load_file(file).await {
        Ok(document) => {
            spinner.finish_and_clear();
            document
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&e.user_message());
            return Err(e.into());
        }
    };
    Output::info(&document.summary());
    Output::info(&format!(
        "Answering {} question(s) with {}",
        numbers.len(),
        session.completion_model()
    ));

    for number in &numbers {
        let spinner = Output::spinner(&format!("{}: Consulting the AI assistant...", number));
        let outcome = session.on_ask_ai(number, credential.as_ref()).await;
        spinner.finish_and_clear();
        Output::outcome(&outcome?);
    }

    Output::header("Progress");
    Output::kv("Answered", &session.progress().to_string());

    Output::header("Telemetry");
    Output::telemetry_summary(&session.telemetry().summary());

    if let Some(path) = telemetry_json {
        tokio::fs::write(path, session.telemetry().to_json()?).await?;
        Output::success(&format!("Telemetry written to {}", path.display()));
    }

    Ok(())
}
