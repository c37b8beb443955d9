//! Interactive prompt for one analysis request at a time
//!
//! Reads the repository URL, analysis type and optional prompts with
//! rustyline. Answers are parsed by plain functions so the rules can be
//! tested without a terminal.

use crate::request::RepositoryRef;
use crate::types::AnalysisType;
use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Words that end the session at the URL prompt
const QUIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

/// Answer to the repository prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlInput {
    Quit,
    Empty,
    Invalid(String),
    Repository(RepositoryRef),
}

/// Classify a line typed at the repository prompt
pub fn parse_url_input(line: &str) -> UrlInput {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return UrlInput::Empty;
    }
    if QUIT_WORDS.contains(&trimmed.to_lowercase().as_str()) {
        return UrlInput::Quit;
    }

    match RepositoryRef::parse(trimmed) {
        Ok(repository) => UrlInput::Repository(repository),
        Err(e) => UrlInput::Invalid(e.to_string()),
    }
}

/// Analysis type for a typed answer
///
/// Blank keeps `default`; an unknown name also keeps it and returns a
/// warning to show.
pub fn parse_type_input(line: &str, default: AnalysisType) -> (AnalysisType, Option<String>) {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return (default, None);
    }

    match trimmed.parse::<AnalysisType>() {
        Ok(kind) => (kind, None),
        Err(_) => (
            default,
            Some(format!("Unknown analysis type '{}', using '{}'", trimmed, default)),
        ),
    }
}

fn optional(line: String) -> Option<String> {
    let trimmed = line.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// One request gathered from the prompts
#[derive(Debug, Clone, PartialEq)]
pub struct InteractiveRequest {
    pub url: String,
    pub analysis_type: AnalysisType,
    pub system_prompt: Option<String>,
    pub user_prompt: Option<String>,
}

/// Readline front end for the interactive session
pub struct InteractivePrompt {
    editor: DefaultEditor,
    default_type: AnalysisType,
}

impl InteractivePrompt {
    pub fn new(default_type: AnalysisType) -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            default_type,
        })
    }

    /// Next request; `None` on quit, Ctrl-D or Ctrl-C
    pub fn next_request(&mut self) -> Result<Option<InteractiveRequest>> {
        loop {
            let Some(line) = self.read("Repository URL (or 'quit' to exit): ")? else {
                return Ok(None);
            };

            match parse_url_input(&line) {
                UrlInput::Quit => return Ok(None),
                UrlInput::Empty => continue,
                UrlInput::Invalid(reason) => {
                    println!("{} {}\n", "Invalid GitHub repository URL:".red(), reason);
                    continue;
                }
                UrlInput::Repository(_) => {}
            }
            let url = line.trim().to_string();
            let _ = self.editor.add_history_entry(url.as_str());

            let names: Vec<&str> = AnalysisType::all().iter().map(|t| t.as_str()).collect();
            let type_prompt = format!("Analysis type ({}) [{}]: ", names.join("/"), self.default_type);
            let Some(type_line) = self.read(&type_prompt)? else {
                return Ok(None);
            };
            let (analysis_type, warning) = parse_type_input(&type_line, self.default_type);
            if let Some(warning) = warning {
                println!("{}", warning.yellow());
            }

            let Some(system_prompt) = self.read("System prompt (optional): ")? else {
                return Ok(None);
            };
            let Some(user_prompt) = self.read("User prompt (optional): ")? else {
                return Ok(None);
            };

            return Ok(Some(InteractiveRequest {
                url,
                analysis_type,
                system_prompt: optional(system_prompt),
                user_prompt: optional(user_prompt),
            }));
        }
    }

    fn read(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Readline error: {}", e)),
        }
    }
}
