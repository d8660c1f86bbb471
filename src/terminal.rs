//! Line-oriented terminal front end
//!
//! Renders [`ViewUpdate`]s to a writer with crossterm styling and turns input
//! lines into [`Action`]s.

use crate::runtime::ViewUpdate;
use crate::state_machine::Author;
use chrono::{DateTime, Local, TimeZone, Utc};
use crossterm::cursor::MoveToColumn;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use crossterm::QueueableCommand;
use std::io::{self, Write};

pub const CLEAR_PROMPT: &str = "Clear chat history? [y/N] ";
const TYPING_LINE: &str = "Bot is typing...";

/// A parsed line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Message(String),
    Clear,
    Export,
    Quit,
}

impl Input {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "/clear" => Input::Clear,
            "/export" => Input::Export,
            "/quit" | "/exit" => Input::Quit,
            // Untrimmed: validation and trimming belong to the session
            _ => Input::Message(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// What the front end should do with one line of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Submit(String),
    /// Ask before clearing; the next line is the answer
    ConfirmClear,
    Clear,
    Export,
    Quit,
    /// Clear was declined
    Cancelled,
}

/// Turns input lines into actions, tracking a pending clear confirmation so
/// the caller never blocks waiting for the answer.
#[derive(Debug, Default)]
pub struct LineInterpreter {
    confirming_clear: bool,
}

impl LineInterpreter {
    pub fn interpret(&mut self, line: &str) -> Action {
        if std::mem::take(&mut self.confirming_clear) {
            return if is_confirmation(line) {
                Action::Clear
            } else {
                Action::Cancelled
            };
        }

        match Input::parse(line) {
            Input::Message(text) => Action::Submit(text),
            Input::Clear => {
                self.confirming_clear = true;
                Action::ConfirmClear
            }
            Input::Export => Action::Export,
            Input::Quit => Action::Quit,
        }
    }
}

/// Only an explicit yes confirms
pub fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// `HH:MM` in the given zone
pub fn format_time<Tz: TimeZone>(at: DateTime<Utc>, zone: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.with_timezone(zone).format("%H:%M").to_string()
}

/// Writes session output to a terminal (or any writer)
pub struct Renderer<W: Write> {
    out: W,
    /// A typing status line is on screen
    typing: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, typing: false }
    }

    pub fn welcome(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", "Welcome to chatline!".bold())?;
        writeln!(
            self.out,
            "{}",
            "Ask anything, or try \"Hello\". Commands: /clear, /export, /quit".dim()
        )?;
        self.out.flush()
    }

    pub fn render(&mut self, update: &ViewUpdate) -> io::Result<()> {
        match update {
            ViewUpdate::Message { text, author, at } => {
                self.clear_status()?;
                let time = format_time(*at, &Local).dim();
                match author {
                    Author::User => writeln!(self.out, "{time} {} {text}", "you:".cyan().bold())?,
                    Author::Bot => writeln!(self.out, "{time} {} {text}", "bot:".green().bold())?,
                }
            }
            ViewUpdate::Notice { text, .. } => {
                self.clear_status()?;
                writeln!(self.out, "{}", format!("! {text}").yellow())?;
            }
            ViewUpdate::Typing(true) => {
                self.clear_status()?;
                write!(self.out, "{}", TYPING_LINE.dim().italic())?;
                self.typing = true;
            }
            ViewUpdate::Typing(false) => self.clear_status()?,
            ViewUpdate::Connection { online } => {
                self.clear_status()?;
                if *online {
                    writeln!(self.out, "{} {}", "●".green(), "online".dim())?;
                } else {
                    writeln!(self.out, "{} {}", "●".red(), "offline".dim())?;
                }
            }
            ViewUpdate::TranscriptCleared => {
                self.clear_status()?;
                writeln!(self.out, "{}", "Chat history cleared.".dim())?;
                self.welcome()?;
            }
            // No visible effect in a scrolling terminal
            ViewUpdate::Processing(_)
            | ViewUpdate::InputCleared
            | ViewUpdate::StateChange { .. } => {}
        }
        self.out.flush()
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        self.clear_status()?;
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    pub fn prompt(&mut self, text: &str) -> io::Result<()> {
        self.clear_status()?;
        write!(self.out, "{}", text.bold())?;
        self.out.flush()
    }

    /// Erase the typing line if one is showing
    fn clear_status(&mut self) -> io::Result<()> {
        if self.typing {
            self.out.queue(MoveToColumn(0))?;
            self.out.queue(Clear(ClearType::CurrentLine))?;
            self.typing = false;
        }
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}
