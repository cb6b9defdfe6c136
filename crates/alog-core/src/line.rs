//! Parsing of `logcat -v time` lines.
//!
//! Expected shape:
//!
//! ```text
//! 08-15 10:22:33.123 D/ActivityManager( 1234): started service
//! └──── timestamp ─┘ │ └──── tag ────┘ └owner┘  └─ message ──┘
//!                 severity
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DomainError, DomainResult};

/// Pattern for one log line. Captures: timestamp, severity, tag, owner, message.
pub const LOG_LINE_PATTERN: &str = r"^([0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}\.[0-9]{3}) ([A-Z])/([^(]+)\(([^)]+)\): (.*)$";

/// Longest tag kept, in characters.
pub const MAX_TAG_CHARS: usize = 128;

/// Longest owner (process id field) kept, in characters.
pub const MAX_OWNER_CHARS: usize = 64;

/// Longest message kept, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

// ============================================================================
// Severity
// ============================================================================

/// Log priority letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    /// Any other uppercase letter (e.g. `S` for silent, `A` for assert).
    Other(char),
}

impl Severity {
    /// Maps a priority letter to a severity.
    pub fn from_char(c: char) -> Self {
        match c {
            'V' => Self::Verbose,
            'D' => Self::Debug,
            'I' => Self::Info,
            'W' => Self::Warn,
            'E' => Self::Error,
            'F' => Self::Fatal,
            other => Self::Other(other),
        }
    }

    /// The single-letter form used in the badge.
    pub fn letter(self) -> char {
        match self {
            Self::Verbose => 'V',
            Self::Debug => 'D',
            Self::Info => 'I',
            Self::Warn => 'W',
            Self::Error => 'E',
            Self::Fatal => 'F',
            Self::Other(c) => c,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

// ============================================================================
// Log Line
// ============================================================================

/// One parsed log line.
///
/// Fields longer than their maximum are cut at a character boundary and
/// `truncated` is set; a long field never causes rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// `MM-DD HH:MM:SS.mmm`
    pub timestamp: String,
    pub severity: Severity,
    pub tag: String,
    /// Process id field, whitespace-trimmed.
    pub owner: String,
    pub message: String,
    pub truncated: bool,
}

/// Compiled [`LOG_LINE_PATTERN`].
///
/// Stateless after construction; share one instance across workers.
#[derive(Debug, Clone)]
pub struct LogLineParser {
    regex: Regex,
}

impl LogLineParser {
    /// Compiles the log line pattern.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPattern` if the pattern does not compile.
    pub fn new() -> DomainResult<Self> {
        let regex = Regex::new(LOG_LINE_PATTERN)
            .map_err(|e| DomainError::invalid_pattern(LOG_LINE_PATTERN, &e))?;
        Ok(Self { regex })
    }

    /// Parses one raw line.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MalformedLine` if the line does not have the
    /// `<timestamp> <S>/<tag>(<owner>): <message>` shape.
    pub fn parse(&self, raw: &str) -> DomainResult<LogLine> {
        let line = raw.trim_end_matches(['\r', '\n']);

        let malformed = || DomainError::MalformedLine {
            line: line.to_string(),
        };

        let caps = self.regex.captures(line).ok_or_else(malformed)?;
        let field = |i: usize| caps.get(i).map(|m| m.as_str()).ok_or_else(malformed);

        let timestamp = field(1)?.to_string();
        let severity = field(2)?
            .chars()
            .next()
            .map(Severity::from_char)
            .ok_or_else(malformed)?;
        let (tag, tag_cut) = truncate_chars(field(3)?.trim(), MAX_TAG_CHARS);
        let (owner, owner_cut) = truncate_chars(field(4)?.trim(), MAX_OWNER_CHARS);
        let (message, message_cut) = truncate_chars(field(5)?, MAX_MESSAGE_CHARS);

        Ok(LogLine {
            timestamp,
            severity,
            tag,
            owner,
            message,
            truncated: tag_cut || owner_cut || message_cut,
        })
    }
}

/// Copies at most `max` characters of `s`, reporting whether anything was cut.
fn truncate_chars(s: &str, max: usize) -> (String, bool) {
    match s.char_indices().nth(max) {
        Some((end, _)) => (s.get(..end).unwrap_or(s).to_string(), true),
        None => (s.to_string(), false),
    }
}
