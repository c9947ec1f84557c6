//! Line-oriented prompt/answer loop.
//!
//! Reads one query per line until an exit word or end of input. Query errors
//! are printed and the loop carries on.

use std::io::{self, BufRead, Write};

use crate::engine::RagEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Processing,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Blank,
    Exit,
    Query(String),
}

/// Classify one raw input line.
///
/// Only the line terminator is stripped. Exit words match the whole
/// lower-cased line, so `"  stop"` is a query.
pub fn classify_input<S: AsRef<str>>(line: &str, exit_words: &[S]) -> Input {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return Input::Blank;
    }
    let lowered = line.to_lowercase();
    if exit_words.iter().any(|w| w.as_ref().to_lowercase() == lowered) {
        return Input::Exit;
    }
    Input::Query(line.to_string())
}

pub struct QueryLoop<'a> {
    engine: &'a RagEngine,
    exit_words: Vec<String>,
    prompt: String,
    state: LoopState,
}

impl<'a> QueryLoop<'a> {
    pub fn new(engine: &'a RagEngine) -> Self {
        let chat = docrag_core::config::ChatSettings::default();
        Self { engine, exit_words: chat.exit_commands, prompt: chat.prompt, state: LoopState::Idle }
    }

    pub fn with_exit_words(mut self, words: Vec<String>) -> Self {
        self.exit_words = words;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until an exit word or end of input. Returns the number of queries answered.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> io::Result<usize> {
        let mut answered = 0;
        self.state = LoopState::Idle;
        while self.state != LoopState::Stopped {
            write!(output, "{}", self.prompt)?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                tracing::debug!("end of input");
                self.state = LoopState::Stopped;
                break;
            }
            match classify_input(&line, &self.exit_words) {
                Input::Blank => continue,
                Input::Exit => {
                    tracing::debug!("exit requested");
                    self.state = LoopState::Stopped;
                }
                Input::Query(query) => {
                    self.state = LoopState::Processing;
                    match self.engine.answer(&query) {
                        Ok(answer) => {
                            writeln!(output, "{}", answer.text)?;
                            answered += 1;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "query failed");
                            writeln!(output, "error: {e}")?;
                        }
                    }
                    self.state = LoopState::Idle;
                }
            }
        }
        Ok(answered)
    }
}
