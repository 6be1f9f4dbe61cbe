//! All errors that can be _generated_ by the machine and its front end.
//!
//! Two independent families, matching the two error bands of the design:
//! [`SyntaxError`] is raised while lexing/parsing source text, before any
//! machine state exists. [`MachineError`] is raised by the stepper and
//! evaluator once a state is being reduced; it always means the machine
//! cannot proceed (it is not how the language's own `throw`/exceptions are
//! reported -- those surface as [`crate::state::StepResult::UncaughtException`]).
use std::fmt;

use crate::pointer::Addr;

/// A location in source text, used only for load-time [`SyntaxError`]s.
#[derive(Debug, Clone)]
pub struct Location {
    filename: String,
    line_no: u32,
}

impl Location {
    pub fn new(filename: impl Into<String>, line_no: u32) -> Self {
        Location {
            filename: filename.into(),
            line_no,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.line_no)
    }
}

/// Any error raised while lexing or parsing the bundled concrete syntax.
#[derive(Debug)]
pub struct SyntaxError {
    reason: String,
    location: Location,
}

impl SyntaxError {
    pub fn new(reason: impl Into<String>, location: Location) -> Self {
        SyntaxError {
            reason: reason.into(),
            location,
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }
}

impl std::error::Error for SyntaxError {}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: syntax error: {}", self.location, self.reason)
    }
}

/// The member kind a failed [`crate::class::ClassDatabase`] lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Method,
    Field,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MemberKind::Method => write!(f, "method"),
            MemberKind::Field => write!(f, "field"),
        }
    }
}

/// A fatal, non-recoverable condition reached while reducing a machine state.
///
/// None of these correspond to the target language's own exceptions -- a
/// program-level `throw` that finds no matching handler is reported as
/// [`crate::state::StepResult::UncaughtException`], not as a `MachineError`.
#[derive(Debug)]
pub enum MachineError {
    /// A `goto`/`if` named a label with no registered statement.
    UnresolvedLabel(String),
    /// A read found no binding for the given address.
    UnboundAddr(Addr),
    /// An operation required a different shape of value than it got.
    TypeMismatch { expected: &'static str, found: String },
    /// Method or field lookup walked the parent chain without a hit.
    NoSuchMember {
        class_name: String,
        member: String,
        kind: MemberKind,
    },
    /// `popHandler` was applied to a continuation whose top frame isn't a handler.
    KontMisuse(&'static str),
    /// Writing a `print`ed value to the output channel failed.
    IOError(std::io::Error),
}

impl From<std::io::Error> for MachineError {
    fn from(err: std::io::Error) -> Self {
        MachineError::IOError(err)
    }
}

impl MachineError {
    pub fn message_identifier(&self) -> u32 {
        use MachineError::*;
        match self {
            UnresolvedLabel(_) => 0x101,
            UnboundAddr(_) => 0x102,
            TypeMismatch { .. } => 0x103,
            NoSuchMember { .. } => 0x104,
            KontMisuse(_) => 0x105,
            IOError(_) => 0x107,
        }
    }
}

impl std::error::Error for MachineError {}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use MachineError::*;
        write!(f, "error[{:04x}]: ", self.message_identifier())?;
        match self {
            UnresolvedLabel(name) => write!(f, "unresolved label '{name}'"),
            UnboundAddr(addr) => write!(f, "read of unbound address {addr:?}"),
            TypeMismatch { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            NoSuchMember {
                class_name,
                member,
                kind,
            } => write!(f, "no {kind} '{member}' on class '{class_name}' or any ancestor"),
            KontMisuse(detail) => write!(f, "continuation misuse: {detail}"),
            IOError(err) => write!(f, "write to output channel failed: {err}"),
        }
    }
}
