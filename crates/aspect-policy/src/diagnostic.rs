// diagnostic.rs — Compiler diagnostics and source positions.

use std::fmt;

use serde::{Serialize, Serializer};

/// A region of a compilation unit's source text.
///
/// `start`/`end` are byte offsets; `line`/`column` are 1-based and describe
/// the start of the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    /// A span covering both `self` and `other` (positioned at `self`).
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end.max(self.end),
            line: self.line,
            column: self.column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Stable identifiers for each kind of diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    UnexpectedCharacter,
    UnterminatedString,
    InvalidNumber,
    InvalidEscape,
    UnsupportedOperator,
    UnexpectedToken,
    EmptyValidateBlock,
    TrailingInput,
    NestingTooDeep,
    UnknownResource,
    ResourceMismatch,
    UnknownProperty,
    NestedProperty,
    TypeMismatch,
    InvalidOperator,
    ImplicitConversion,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnexpectedCharacter => "ASP0001",
            DiagnosticCode::UnterminatedString => "ASP0002",
            DiagnosticCode::InvalidNumber => "ASP0003",
            DiagnosticCode::InvalidEscape => "ASP0004",
            DiagnosticCode::UnsupportedOperator => "ASP0005",
            DiagnosticCode::UnexpectedToken => "ASP0010",
            DiagnosticCode::EmptyValidateBlock => "ASP0011",
            DiagnosticCode::TrailingInput => "ASP0012",
            DiagnosticCode::NestingTooDeep => "ASP0013",
            DiagnosticCode::UnknownResource => "ASP0020",
            DiagnosticCode::ResourceMismatch => "ASP0021",
            DiagnosticCode::UnknownProperty => "ASP0022",
            DiagnosticCode::NestedProperty => "ASP0023",
            DiagnosticCode::TypeMismatch => "ASP0030",
            DiagnosticCode::InvalidOperator => "ASP0031",
            DiagnosticCode::ImplicitConversion => "ASP0032",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DiagnosticCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A message produced while compiling one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// `name:line:column: severity[code]: message`
    pub fn render(&self, unit_name: &str) -> String {
        format!("{}:{}", unit_name, self)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}[{}]: {}",
            self.span.line, self.span.column, self.severity, self.code, self.message
        )
    }
}
