use super::definition::Phase;
use crate::error::Result;
use std::io::{self, BufRead, Write};

/// Asks the operator whether a phase should run.
pub trait Prompter {
    fn confirm_phase(&mut self, phase: &Phase, index: usize, total: usize) -> Result<bool>;
}

/// Reads answers from a line-oriented input, stdin by default.
///
/// Only `y` or `yes` runs the phase; anything else, including end of input,
/// skips it.
pub struct StdinPrompter<R = io::StdinLock<'static>> {
    input: R,
}

impl StdinPrompter {
    pub fn new() -> Self {
        Self {
            input: io::stdin().lock(),
        }
    }
}

impl Default for StdinPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: BufRead> StdinPrompter<R> {
    pub fn from_reader(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> Prompter for StdinPrompter<R> {
    fn confirm_phase(&mut self, phase: &Phase, index: usize, total: usize) -> Result<bool> {
        print!(
            "Execute phase {}/{} '{}'? [y/N]: ",
            index + 1,
            total,
            phase.name
        );
        io::stdout().flush()?;

        let mut input = String::new();
        self.input.read_line(&mut input)?;
        let input = input.trim().to_lowercase();

        Ok(input == "y" || input == "yes")
    }
}

/// Answers every prompt from a fixed script; runs out as "no".
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: std::collections::VecDeque<bool>,
    /// Names of the phases that were asked about, in order.
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm_phase(&mut self, phase: &Phase, _index: usize, _total: usize) -> Result<bool> {
        self.asked.push(phase.name.clone());
        Ok(self.answers.pop_front().unwrap_or(false))
    }
}
