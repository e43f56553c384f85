//! Interactive session command.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::error::DiligentError;
use crate::openai::ApiKey;
use crate::questionnaire::AnswerStatus;
use crate::session::Session;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

const HELP: &str = "Commands:
  load <FILE>                 load an evidence document (.txt, .md, .pdf)
  clear                       remove the loaded document
  key <API_KEY>               set the OpenAI API key for this session
  ask <NUMBER>                let the AI answer a question
  answer <NUMBER> [VALUE]     select an option, or clear the answer
  status <NUMBER> <STATUS>    set status: open, ai, checked
  evidence <NUMBER> <TEXT>    set the evidence reference
  reason <NUMBER> <TEXT>      set the reasoning note
  show <NUMBER>               show a question and its answer
  progress                    answered questions and score
  telemetry [FILE]            list API calls, or write them as JSON
  help                        show this help
  exit                        leave the session";

/// One line of user input.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Load(PathBuf),
    Clear,
    Key(String),
    Ask(String),
    Answer(String, Option<String>),
    Status(String, String),
    Evidence(String, String),
    Reason(String, String),
    Show(String),
    Progress,
    Telemetry(Option<PathBuf>),
    Help,
    Exit,
}

fn parse_command(line: &str) -> std::result::Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();

    let required = |what: &str| -> std::result::Result<String, String> {
        if rest.is_empty() {
            Err(format!("Usage: {} {}", verb, what))
        } else {
            Ok(rest.to_string())
        }
    };
    let number_and_text = |what: &str| -> std::result::Result<(String, String), String> {
        match split_number(rest) {
            (number, text) if !number.is_empty() && !text.is_empty() => {
                Ok((number.to_string(), text.to_string()))
            }
            _ => Err(format!("Usage: {} <NUMBER> {}", verb, what)),
        }
    };

    match verb.to_lowercase().as_str() {
        "load" => required("<FILE>").map(|f| Command::Load(Settings::expand_path(&f))),
        "clear" => Ok(Command::Clear),
        "key" => required("<API_KEY>").map(Command::Key),
        "ask" => required("<NUMBER>").map(Command::Ask),
        "answer" => {
            let (number, value) = split_number(rest);
            if number.is_empty() {
                return Err("Usage: answer <NUMBER> [VALUE]".to_string());
            }
            let value = Some(value.to_string()).filter(|v| !v.is_empty());
            Ok(Command::Answer(number.to_string(), value))
        }
        "status" => number_and_text("<STATUS>").map(|(n, s)| Command::Status(n, s)),
        "evidence" => number_and_text("<TEXT>").map(|(n, t)| Command::Evidence(n, t)),
        "reason" => number_and_text("<TEXT>").map(|(n, t)| Command::Reason(n, t)),
        "show" => required("<NUMBER>").map(Command::Show),
        "progress" => Ok(Command::Progress),
        "telemetry" => Ok(Command::Telemetry(
            Some(rest).filter(|r| !r.is_empty()).map(Settings::expand_path),
        )),
        "help" | "?" => Ok(Command::Help),
        "exit" | "quit" => Ok(Command::Exit),
        other => Err(format!("Unknown command '{}'. Type 'help' for a list.", other)),
    }
}

/// Split a leading question number off the input.
///
/// Environmental risk questions carry an `(Env)` suffix that belongs to the number.
fn split_number(input: &str) -> (&str, &str) {
    let input = input.trim();
    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    let after = input[end..].trim_start();

    let suffix = "(env)";
    if after.get(..suffix.len()).is_some_and(|p| p.eq_ignore_ascii_case(suffix)) {
        let number_end = input.len() - after.len() + suffix.len();
        (&input[..number_end], input[number_end..].trim())
    } else {
        (&input[..end], after)
    }
}

/// Run the interactive session command.
pub async fn run_session(file: Option<&Path>, api_key: Option<&str>, settings: Settings) -> Result<()> {
    let session = Session::from_settings(&settings)?;
    let mut credential = preflight::resolve_api_key(api_key, &settings).ok();

    println!("\n{}", style("Diligent Session").bold().cyan());
    println!(
        "{}\n",
        style(format!(
            "{} questions loaded. Type 'help' for commands, or 'exit' to quit.",
            session.questionnaire().len()
        ))
        .dim()
    );

    if credential.is_none() {
        Output::warning("No API key yet. Use 'key <API_KEY>' before asking the AI.");
    }
    if let Some(path) = file {
        load(&session, path).await;
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("diligent>").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let command = match parse_command(input) {
            Ok(command) => command,
            Err(message) => {
                Output::warning(&message);
                continue;
            }
        };

        match dispatch(&session, &mut credential, command).await {
            Ok(()) => {}
            Err(Stop::Exit) => {
                Output::info("Goodbye!");
                break;
            }
            Err(Stop::Failed(e)) => Output::error(&e.user_message()),
        }
    }

    Ok(())
}

/// Why a command ended the normal flow.
enum Stop {
    Exit,
    Failed(DiligentError),
}

impl From<DiligentError> for Stop {
    fn from(e: DiligentError) -> Self {
        Stop::Failed(e)
    }
}

async fn dispatch(
    session: &Session,
    credential: &mut Option<ApiKey>,
    command: Command,
) -> std::result::Result<(), Stop> {
    match command {
        Command::Load(path) => load(session, &path).await,
        Command::Clear => {
            session.clear_document();
            Output::info("Document cleared.");
        }
        Command::Key(key) => match ApiKey::new(key) {
            Some(key) => {
                *credential = Some(key);
                Output::success("API key set for this session.");
            }
            None => Output::warning("The API key is empty."),
        },
        Command::Ask(number) => {
            let spinner = Output::spinner("Consulting the AI assistant...");
            let outcome = session.on_ask_ai(&number, credential.as_ref()).await;
            spinner.finish_and_clear();
            Output::outcome(&outcome?);
        }
        Command::Answer(number, value) => {
            session.on_answer_changed(&number, value.as_deref())?;
            show(session, &number)?;
        }
        Command::Status(number, status) => {
            let status: AnswerStatus = status.parse()?;
            session.on_status_changed(&number, status)?;
            show(session, &number)?;
        }
        Command::Evidence(number, text) => {
            session.on_evidence_reference_changed(&number, &text)?;
            show(session, &number)?;
        }
        Command::Reason(number, text) => {
            session.on_reasoning_changed(&number, &text)?;
            show(session, &number)?;
        }
        Command::Show(number) => show(session, &number)?,
        Command::Progress => Output::info(&session.progress().to_string()),
        Command::Telemetry(None) => {
            let records = session.telemetry().snapshot();
            if records.is_empty() {
                Output::info("No API calls yet.");
            }
            for record in &records {
                Output::telemetry_record(record);
            }
            Output::telemetry_summary(&session.telemetry().summary());
        }
        Command::Telemetry(Some(path)) => {
            let json = session.telemetry().to_json()?;
            tokio::fs::write(&path, json).await.map_err(DiligentError::from)?;
            Output::success(&format!("Telemetry written to {}", path.display()));
        }
        Command::Help => println!("{}", HELP),
        Command::Exit => return Err(Stop::Exit),
    }
    Ok(())
}

async fn load(session: &Session, path: &Path) {
    let spinner = Output::spinner("Reading document...");
    let result = session.load_file(path).await;
    spinner.finish_and_clear();

    match result {
        Ok(document) if document.is_empty() => {
            Output::warning(&format!("{} contains no text to analyse.", document.display_name()))
        }
        Ok(document) => Output::success(&document.summary()),
        Err(e) => Output::error(&e.user_message()),
    }
}

fn show(session: &Session, number: &str) -> std::result::Result<(), Stop> {
    let question = session.questionnaire().find(number)?;
    let answer = session.answer(number)?;
    Output::answer(question, &answer);
    Ok(())
}
