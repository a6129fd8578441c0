//! The error taxonomy shared by every validation and assembly pass (§7).

use std::fmt;

use camino::Utf8PathBuf;

/// A source location attached to a diagnostic, when the originating
/// [`isccfg_cfg::Entry`](isccfg_cfg::token::Entry) carried one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub file: Utf8PathBuf,
    pub line: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

impl From<isccfg_cfg::token::Location> for Location {
    fn from(loc: isccfg_cfg::token::Location) -> Self {
        Self {
            file: loc.file,
            line: loc.line,
        }
    }
}

/// The severity of a reported problem. Warnings never block startup;
/// errors always do (§7 "User-visible behavior").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// The kind of problem a diagnostic reports. Distinguishable by callers
/// even though none of these become distinct Rust types: callers match on
/// this enum rather than on message text (§7).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed name, bad number, unknown keyword.
    Syntax,
    /// Numeric value out of its permitted interval.
    Range,
    /// Mutually exclusive options set, reserved name redefined, a
    /// built-in ACL redefined, both `primaries` and `masters` set.
    SemanticConflict,
    /// Same (zone, class, view); same file path in writable conflict;
    /// duplicate listener socket; duplicate TLS/HTTP/key/view name.
    Duplicate,
    /// A named TLS profile, HTTP profile, KASP, key, or remote-servers
    /// list is not defined.
    MissingReference,
    /// A feature disabled at build time is referenced in the config.
    NotSupported,
    /// Static-stub without any NS, empty primaries list, database
    /// creation failure.
    FatalAssembly,
}

/// One reported problem, with enough context to locate and categorize it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub location: Option<Location>,
    pub message: Box<str>,
}

impl Diagnostic {
    pub fn error(kind: ErrorKind, message: impl Into<Box<str>>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            location: None,
            message: message.into(),
        }
    }

    pub fn warning(kind: ErrorKind, message: impl Into<Box<str>>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            location: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, location: impl Into<Location>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = &self.location {
            write!(f, "{loc}: ")?;
        }
        write!(f, "{}", self.message)
    }
}

/// An accumulator of diagnostics with first-error tracking (§7
/// "Propagation"): a pass keeps going after an error so sibling
/// statements are still checked, but the top-level runner only needs the
/// first error to decide whether configuration may be applied.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    first_error: Option<usize>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() && self.first_error.is_none() {
            self.first_error = Some(self.entries.len());
        }
        self.entries.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        for d in other.entries {
            self.push(d);
        }
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn has_errors(&self) -> bool {
        self.first_error.is_some()
    }

    /// The first error encountered, per the propagation model in §7: "each
    /// validator returns a summary status (the first error encountered)".
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.first_error.map(|i| &self.entries[i])
    }

    /// The overall pass/fail status this accumulator represents.
    pub fn status(&self) -> CheckStatus {
        match self.first_error() {
            Some(d) => CheckStatus::Failure(d.clone()),
            None => CheckStatus::Ok,
        }
    }
}

/// The summary result of a validation or assembly pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Failure(Diagnostic),
}

impl CheckStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// The checker's process exit code (§6 "Exit codes"): 0 on success,
/// non-zero on any reported error.
pub struct ExitError;

impl ExitError {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;

    pub fn code(status: &CheckStatus) -> i32 {
        if status.is_ok() {
            Self::SUCCESS
        } else {
            Self::FAILURE
        }
    }
}
