//! Parser diagnostics
//!
//! The parser records warnings and errors as it goes; each diagnostic is
//! an error code plus the source location of the token that triggered it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::span::SourceLocation;

/// Everything the parser can complain about.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[error("invalid token")]
    InvalidToken,
    #[error("expected a primary expression")]
    ExpectedPrimary,
    #[error("expected 'endif'")]
    ExpectedEndif,
    #[error("expected a statement separator")]
    ExpectedStatementSeparator,
    #[error("expected ','")]
    ExpectedComma,
    #[error("expected '('")]
    ExpectedOpenParen,
    #[error("expected ')'")]
    ExpectedCloseParen,
    #[error("expected closing '|'")]
    ExpectedCloseModulus,
    #[error("expected an identifier")]
    ExpectedIdentifier,
    #[error("expected '='")]
    ExpectedAssignment,
    #[error("expected an integer literal")]
    ExpectedInteger,
    #[error("expected a floating-point literal")]
    ExpectedFloatingPoint,
    #[error("expected a complex literal")]
    ExpectedComplex,
    #[error("expected a string literal")]
    ExpectedString,
    #[error("expected end of line")]
    ExpectedTerminator,
    #[error("assignment to built-in variable")]
    BuiltinVariableAssignment,
    #[error("assignment to built-in function name")]
    BuiltinFunctionAssignment,
    #[error("invalid section name")]
    InvalidSection,
    #[error("sections out of order")]
    InvalidSectionOrder,
    #[error("duplicate section")]
    DuplicateSection,
    #[error("builtin section disallows formula sections")]
    BuiltinSectionDisallowsOtherSections,
    #[error("invalid key in builtin section")]
    BuiltinSectionInvalidKey,
    #[error("invalid type in builtin section")]
    BuiltinSectionInvalidType,
    #[error("invalid key in default section")]
    DefaultSectionInvalidKey,
    #[error("invalid method in default section")]
    DefaultSectionInvalidMethod,
    #[error("invalid key in switch section")]
    SwitchSectionInvalidKey,
}

/// A recorded warning or error with its source location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub location: SourceLocation,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.code)
    }
}
