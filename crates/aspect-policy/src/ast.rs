// ast.rs — Syntax tree produced by the parser, before binding.

use std::fmt;

use crate::diagnostic::Span;

/// A parsed `resource "<kind>" validate { ... }` document.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyAst {
    pub resource: String,
    pub resource_span: Span,
    /// Top-level statements; implicitly ANDed.
    pub statements: Vec<Statement>,
}

/// One line (or parenthesized group spanning lines) of a validate block.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `a && b && ...`, flattened.
    And(Vec<Expr>),
    Compare(Comparison),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: PropertyPath,
    pub op: CompareOp,
    pub op_span: Span,
    pub right: Operand,
}

/// `input.<Segment>(.<Segment>)*`
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPath {
    pub segments: Vec<PathSegment>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub name: String,
    pub span: Span,
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input")?;
        for segment in &self.segments {
            write!(f, ".{}", segment.name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Literal),
    Path(PropertyPath),
    List { items: Vec<Literal>, span: Span },
}

impl Operand {
    pub fn span(&self) -> Span {
        match self {
            Operand::Literal(literal) => literal.span,
            Operand::Path(path) => path.span,
            Operand::List { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: LiteralValue,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::String(s) => write!(f, "\"{}\"", s),
            LiteralValue::Number(n) => write!(f, "{}", crate::resource::format_number(*n)),
            LiteralValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    Contains,
    EqIgnoreCase,
    NotEqIgnoreCase,
}

impl CompareOp {
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            CompareOp::Lt | CompareOp::LtEq | CompareOp::Gt | CompareOp::GtEq
        )
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::In => "in",
            CompareOp::Contains => "contains",
            CompareOp::EqIgnoreCase => "~=",
            CompareOp::NotEqIgnoreCase => "!~=",
        };
        f.write_str(text)
    }
}
