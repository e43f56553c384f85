//! Questions command implementation.

use crate::cli::Output;
use crate::questionnaire::Questionnaire;
use anyhow::Result;

/// Print every section, subsection and question.
pub fn run_questions() -> Result<()> {
    let questionnaire = Questionnaire::builtin()?;

    for section in &questionnaire.sections {
        Output::header(&format!("{} ({} questions)", section.title, section.count_questions()));
        for question in &section.questions {
            Output::question(question);
        }
        for subsection in &section.subsections {
            println!("\n  {}", console::style(&subsection.title).bold());
            for question in &subsection.questions {
                Output::question(question);
            }
        }
    }

    println!();
    Output::info(&format!("{} questions in total", questionnaire.len()));
    Ok(())
}
