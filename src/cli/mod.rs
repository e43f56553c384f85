//! CLI module for Diligent.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Diligent - AI-assisted due diligence questionnaires
///
/// Loads an evidence document, retrieves the passages relevant to each
/// questionnaire item and asks a language model to pick an answer.
#[derive(Parser, Debug)]
#[command(name = "diligent")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the questionnaire sections and questions
    Questions,

    /// Show how a document is normalized and chunked
    Chunks {
        /// Evidence document (.txt, .md, .pdf)
        file: PathBuf,
    },

    /// Answer questions from a document with AI assistance
    Ask {
        /// Evidence document (.txt, .md, .pdf)
        file: PathBuf,

        /// Question numbers to answer (e.g. 3.1 4.2.7)
        numbers: Vec<String>,

        /// Answer every question in the questionnaire
        #[arg(long, conflicts_with = "numbers")]
        all: bool,

        /// OpenAI API key (defaults to the environment variable named in the config)
        #[arg(long)]
        api_key: Option<String>,

        /// Completion model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Write the telemetry log as JSON to this file
        #[arg(long)]
        telemetry_json: Option<PathBuf>,
    },

    /// Start an interactive questionnaire session
    Session {
        /// Evidence document to load at start
        file: Option<PathBuf>,

        /// OpenAI API key (defaults to the environment variable named in the config)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::parse_from(["diligent", "-vv", "ask", "policy.pdf", "3.1", "4.2.7", "--model", "gpt-4o"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask {
                file, numbers, all, model, ..
            } => {
                assert_eq!(file, PathBuf::from("policy.pdf"));
                assert_eq!(numbers, vec!["3.1", "4.2.7"]);
                assert!(!all);
                assert_eq!(model.as_deref(), Some("gpt-4o"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_all_conflicts_with_numbers() {
        assert!(Cli::try_parse_from(["diligent", "ask", "policy.pdf", "3.1", "--all"]).is_err());
    }
}
