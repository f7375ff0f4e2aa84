//! Rendering of errors that escape every script level.

pub mod ansi;
pub mod json;

use crate::interp::{Code, Exception, Interp};

/// A `file:line` position in a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub location: Option<Location>,
    /// Text of the line named by `location`, when the file could be read.
    pub source_line: Option<String>,
    pub notes: Vec<String>,
    pub error_code: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            location: None,
            source_line: None,
            notes: Vec::new(),
            error_code: None,
        }
    }

    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.location = Some(Location { file: file.into(), line });
        self
    }

    pub fn with_source_line(mut self, text: impl Into<String>) -> Self {
        self.source_line = Some(text.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Builds the report for a completion that reached the top level,
    /// using the interpreter's record of where the error started.
    pub fn from_exception(interp: &Interp, e: &Exception) -> Self {
        let message = match e.code {
            Code::Break => "invoked \"break\" outside of a loop".to_string(),
            Code::Continue => "invoked \"continue\" outside of a loop".to_string(),
            Code::Error => e.value.to_string(),
            code => format!("command returned bad code: {code}"),
        };
        let mut d = Diagnostic::error(message);
        if !e.is_error() {
            return d;
        }

        let (file, line) = interp.error_location();
        if !file.is_empty() {
            d = d.with_location(file.as_str(), line);
            if let Some(text) = read_line(file.as_str(), line) {
                d = d.with_source_line(text);
            }
        }
        for (proc, file, line) in interp.stack_trace() {
            if proc.is_empty() {
                continue;
            }
            if file.is_empty() {
                d = d.with_note(format!("in procedure '{proc}'"));
            } else {
                d = d.with_note(format!("in procedure '{proc}' called at {file}:{line}"));
            }
        }
        if let Some(code) = &e.error_code {
            d = d.with_error_code(code.as_str());
        }
        d
    }
}

fn read_line(path: &str, line: u32) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let idx = (line as usize).checked_sub(1)?;
    text.lines().nth(idx).map(str::to_string)
}
