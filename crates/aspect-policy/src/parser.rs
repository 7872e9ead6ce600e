// parser.rs — Recursive-descent parser for policy documents.
//
//   policy     := "resource" STRING "validate" "{" statement+ "}"
//   statement  := conjunct ( "&&" conjunct )*
//   conjunct   := "(" statement ")" | comparison
//   comparison := path OP operand
//   path       := "input" "." IDENT ( "." IDENT )*
//   operand    := literal | path | "[" literal ( "," literal )* "]"
//
// Statements end at a newline or the closing brace. Inside parentheses and
// list literals newlines are insignificant, so a group may span lines.
//
// On a malformed statement the parser reports a diagnostic and skips to the
// next line, so one compile reports every broken statement.

use crate::ast::{
    CompareOp, Comparison, Expr, Literal, LiteralValue, Operand, PathSegment, PolicyAst,
    PropertyPath, Statement,
};
use crate::diagnostic::{Diagnostic, DiagnosticCode, Span};
use crate::lexer::{Token, TokenKind};

/// Parse a token stream (as produced by `lexer::tokenize`).
///
/// Returns `None` only when the `resource "..." validate {` header itself is
/// unusable. Statement-level problems are reported in `diagnostics` and the
/// offending statements are left out of the returned tree.
pub fn parse(tokens: &[Token], diagnostics: &mut Vec<Diagnostic>) -> Option<PolicyAst> {
    if tokens.is_empty() {
        return None;
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        diagnostics,
    };
    parser.policy()
}

/// Deepest parenthesized group accepted; deeper input is a diagnostic.
const MAX_NESTING: usize = 64;

struct Parser<'t, 'd> {
    tokens: &'t [Token],
    pos: usize,
    /// Nesting depth of parentheses/brackets; newlines are skipped while > 0.
    depth: usize,
    diagnostics: &'d mut Vec<Diagnostic>,
}

fn is_word(token: &Token, word: &str) -> bool {
    matches!(&token.kind, TokenKind::Ident(w) if w == word)
}

impl<'t, 'd> Parser<'t, 'd> {
    fn policy(&mut self) -> Option<PolicyAst> {
        self.skip_newlines();
        self.expect_word("resource")?;

        let name = self.advance();
        let TokenKind::Str(resource) = &name.kind else {
            self.unexpected("a quoted resource type name", name);
            return None;
        };

        self.skip_newlines();
        self.expect_word("validate")?;
        self.skip_newlines();
        let open = self.expect(&TokenKind::LBrace)?;

        let reported_before = self.diagnostics.len();
        let mut statements = Vec::new();
        let mut closed = false;
        loop {
            self.skip_newlines();
            let token = self.peek();
            match token.kind {
                TokenKind::RBrace => {
                    self.advance();
                    closed = true;
                    break;
                }
                TokenKind::Eof => {
                    self.unexpected("'}' to close the validate block", token);
                    break;
                }
                _ => {}
            }

            match self.statement() {
                Some(statement) => {
                    let next = self.peek();
                    match next.kind {
                        TokenKind::Newline | TokenKind::RBrace | TokenKind::Eof => {
                            statements.push(statement)
                        }
                        _ => {
                            self.unexpected("'&&' or the end of the statement", next);
                            self.recover();
                        }
                    }
                }
                None => self.recover(),
            }
        }

        if closed {
            self.skip_newlines();
            let trailing = self.peek();
            if trailing.kind != TokenKind::Eof {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::TrailingInput,
                    format!(
                        "unexpected {} after the end of the validate block",
                        trailing.kind
                    ),
                    trailing.span,
                ));
            }
        }

        if statements.is_empty() && self.diagnostics.len() == reported_before {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::EmptyValidateBlock,
                "validate block must contain at least one statement",
                open.span,
            ));
        }

        Some(PolicyAst {
            resource: resource.clone(),
            resource_span: name.span,
            statements,
        })
    }

    fn statement(&mut self) -> Option<Statement> {
        let start = self.peek().span;
        let expr = self.and_expr()?;
        Some(Statement {
            expr,
            span: start.to(self.previous_span()),
        })
    }

    fn and_expr(&mut self) -> Option<Expr> {
        let mut terms = Vec::new();
        push_flattened(&mut terms, self.conjunct()?);
        while self.peek().kind == TokenKind::AndAnd {
            self.advance();
            self.skip_newlines();
            push_flattened(&mut terms, self.conjunct()?);
        }
        if terms.len() == 1 {
            terms.pop()
        } else {
            Some(Expr::And(terms))
        }
    }

    fn conjunct(&mut self) -> Option<Expr> {
        if self.peek().kind != TokenKind::LParen {
            return self.comparison().map(Expr::Compare);
        }
        let open = self.advance();
        if self.depth >= MAX_NESTING {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::NestingTooDeep,
                format!("parentheses nested more than {} levels deep", MAX_NESTING),
                open.span,
            ));
            return None;
        }
        self.depth += 1;
        let inner = self.and_expr()?;
        let close = self.peek();
        if close.kind != TokenKind::RParen {
            self.unexpected("'&&' or ')'", close);
            return None;
        }
        self.depth -= 1;
        self.advance();
        Some(inner)
    }

    fn comparison(&mut self) -> Option<Comparison> {
        let left = self.path()?;
        let op_token = self.peek();
        let op = match &op_token.kind {
            TokenKind::EqEq => CompareOp::Eq,
            TokenKind::NotEq => CompareOp::NotEq,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::LtEq => CompareOp::LtEq,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::GtEq => CompareOp::GtEq,
            TokenKind::TildeEq => CompareOp::EqIgnoreCase,
            TokenKind::NotTildeEq => CompareOp::NotEqIgnoreCase,
            TokenKind::Ident(w) if w == "in" => CompareOp::In,
            TokenKind::Ident(w) if w == "contains" => CompareOp::Contains,
            _ => {
                self.unexpected("a comparison operator", op_token);
                return None;
            }
        };
        self.advance();
        let right = self.operand()?;
        Some(Comparison {
            left,
            op,
            op_span: op_token.span,
            right,
        })
    }

    fn path(&mut self) -> Option<PropertyPath> {
        let input = self.peek();
        if !is_word(input, "input") {
            self.unexpected("a property reference such as 'input.Name'", input);
            return None;
        }
        self.advance();
        self.expect(&TokenKind::Dot)?;

        let mut segments = vec![self.segment()?];
        while self.peek().kind == TokenKind::Dot {
            self.advance();
            segments.push(self.segment()?);
        }
        let end = segments.last().map(|s| s.span).unwrap_or(input.span);
        Some(PropertyPath {
            segments,
            span: input.span.to(end),
        })
    }

    fn segment(&mut self) -> Option<PathSegment> {
        let token = self.peek();
        match &token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Some(PathSegment {
                    name: name.clone(),
                    span: token.span,
                })
            }
            _ => {
                self.unexpected("a property name", token);
                None
            }
        }
    }

    fn operand(&mut self) -> Option<Operand> {
        let token = self.peek();
        if is_word(token, "input") {
            return self.path().map(Operand::Path);
        }
        if token.kind == TokenKind::LBracket {
            return self.list();
        }
        self.literal().map(Operand::Literal)
    }

    fn list(&mut self) -> Option<Operand> {
        let open = self.advance();
        self.depth += 1;
        let mut items = Vec::new();
        if self.peek().kind != TokenKind::RBracket {
            loop {
                items.push(self.literal()?);
                if self.peek().kind == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        let close = self.peek();
        if close.kind != TokenKind::RBracket {
            self.unexpected("',' or ']'", close);
            return None;
        }
        self.depth -= 1;
        self.advance();
        Some(Operand::List {
            items,
            span: open.span.to(close.span),
        })
    }

    fn literal(&mut self) -> Option<Literal> {
        // Peek first: a missing operand must not swallow the end of line.
        let token = self.peek();
        let value = match &token.kind {
            TokenKind::Str(s) => LiteralValue::String(s.clone()),
            TokenKind::Number(n) => LiteralValue::Number(*n),
            TokenKind::Ident(w) if w == "true" => LiteralValue::Boolean(true),
            TokenKind::Ident(w) if w == "false" => LiteralValue::Boolean(false),
            _ => {
                self.unexpected("a string, number or boolean literal", token);
                return None;
            }
        };
        self.advance();
        Some(Literal {
            value,
            span: token.span,
        })
    }

    // ── token plumbing ──

    fn peek(&mut self) -> &'t Token {
        if self.depth > 0 {
            self.skip_newlines();
        }
        let tokens: &'t [Token] = self.tokens;
        &tokens[self.pos]
    }

    fn advance(&mut self) -> &'t Token {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn skip_newlines(&mut self) {
        while self.tokens[self.pos].kind == TokenKind::Newline {
            self.pos += 1;
        }
    }

    fn previous_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn expect(&mut self, kind: &TokenKind) -> Option<&'t Token> {
        let token = self.peek();
        if &token.kind == kind {
            self.advance();
            Some(token)
        } else {
            self.unexpected(&kind.to_string(), token);
            None
        }
    }

    fn expect_word(&mut self, word: &str) -> Option<&'t Token> {
        let token = self.peek();
        if is_word(token, word) {
            self.advance();
            Some(token)
        } else {
            self.unexpected(&format!("'{}'", word), token);
            None
        }
    }

    fn unexpected(&mut self, expected: &str, found: &Token) {
        self.diagnostics.push(Diagnostic::error(
            DiagnosticCode::UnexpectedToken,
            format!("expected {}, found {}", expected, found.kind),
            found.span,
        ));
    }

    /// Skip the rest of a broken statement.
    fn recover(&mut self) {
        self.depth = 0;
        loop {
            match self.tokens[self.pos].kind {
                TokenKind::Newline | TokenKind::RBrace | TokenKind::Eof => break,
                _ => self.pos += 1,
            }
        }
    }
}

fn push_flattened(terms: &mut Vec<Expr>, expr: Expr) {
    match expr {
        Expr::And(inner) => terms.extend(inner),
        other => terms.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_ok(src: &str) -> PolicyAst {
        let (tokens, mut diagnostics) = tokenize(src);
        let ast = parse(&tokens, &mut diagnostics);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        ast.unwrap()
    }

    fn parse_err(src: &str) -> Vec<Diagnostic> {
        let (tokens, mut diagnostics) = tokenize(src);
        let _ = parse(&tokens, &mut diagnostics);
        assert!(!diagnostics.is_empty(), "expected diagnostics for {:?}", src);
        diagnostics
    }

    fn comparison(expr: &Expr) -> &Comparison {
        match expr {
            Expr::Compare(c) => c,
            other => panic!("expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn parses_statements_on_separate_lines() {
        let ast = parse_ok(
            "resource \"Bucket\"\nvalidate {\n    input.A == 1\n    input.B != \"x\"\n}\n",
        );
        assert_eq!(ast.resource, "Bucket");
        assert_eq!(ast.statements.len(), 2);
        let first = comparison(&ast.statements[0].expr);
        assert_eq!(first.left.to_string(), "input.A");
        assert_eq!(first.op, CompareOp::Eq);
        assert_eq!(
            first.right,
            Operand::Literal(Literal {
                value: LiteralValue::Number(1.0),
                span: first.right.span(),
            })
        );
    }

    #[test]
    fn single_line_policy() {
        let ast = parse_ok("resource \"Bucket\" validate { input.A == true }");
        assert_eq!(ast.statements.len(), 1);
    }

    #[test]
    fn and_chains_are_flattened_through_parentheses() {
        let ast = parse_ok(
            "resource \"R\" validate {\n  input.A == 1 && (input.B == 2 &&\n    input.C == 3)\n}",
        );
        assert_eq!(ast.statements.len(), 1);
        match &ast.statements[0].expr {
            Expr::And(terms) => assert_eq!(terms.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn statement_span_covers_the_line() {
        let src = "resource \"R\" validate {\n  input.A == 1\n}";
        let ast = parse_ok(src);
        let span = ast.statements[0].span;
        assert_eq!(&src[span.start..span.end], "input.A == 1");
        assert_eq!(span.line, 2);
    }

    #[test]
    fn parses_membership_and_property_operands() {
        let ast = parse_ok(
            "resource \"R\" validate {\n  input.State in [\"a\", \"b\"]\n  input.Tags contains input.Name\n}",
        );
        match &comparison(&ast.statements[0].expr).right {
            Operand::List { items, .. } => assert_eq!(items.len(), 2),
            other => panic!("expected list, got {:?}", other),
        }
        let second = comparison(&ast.statements[1].expr);
        assert_eq!(second.op, CompareOp::Contains);
        assert!(matches!(second.right, Operand::Path(_)));
    }

    #[test]
    fn keywords_are_valid_property_names() {
        let ast = parse_ok("resource \"R\" validate { input.in contains \"x\" }");
        assert_eq!(
            comparison(&ast.statements[0].expr).left.segments[0].name,
            "in"
        );
    }

    #[test]
    fn missing_resource_keyword() {
        let diagnostics = parse_err("validate { input.A == 1 }");
        assert_eq!(diagnostics[0].code, DiagnosticCode::UnexpectedToken);
        assert!(diagnostics[0].message.contains("'resource'"));
    }

    #[test]
    fn unclosed_block() {
        let diagnostics = parse_err("resource \"R\" validate {\n input.A == 1\n");
        assert!(diagnostics[0].message.contains("'}'"));
    }

    #[test]
    fn empty_block() {
        let diagnostics = parse_err("resource \"R\" validate {\n # nothing yet\n}");
        assert_eq!(diagnostics[0].code, DiagnosticCode::EmptyValidateBlock);
    }

    #[test]
    fn trailing_input_after_block() {
        let diagnostics = parse_err("resource \"R\" validate { input.A == 1 } extra");
        assert_eq!(diagnostics[0].code, DiagnosticCode::TrailingInput);
    }

    #[test]
    fn recovers_to_report_every_broken_statement() {
        let diagnostics = parse_err(
            "resource \"R\" validate {\n  input.A 1\n  input.B == 2\n  A == 3\n}",
        );
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].span.line, 2);
        assert_eq!(diagnostics[1].span.line, 4);
    }

    #[test]
    fn missing_operand_does_not_swallow_the_next_line() {
        let diagnostics = parse_err(
            "resource \"R\" validate {\n  input.A ==\n  input.B == 2\n  input.C\n}",
        );
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].span.line, 2);
        assert_eq!(diagnostics[1].span.line, 4);
    }

    #[test]
    fn nesting_is_capped() {
        let group = |n: usize| format!("{}input.A == 1{}", "(".repeat(n), ")".repeat(n));

        let ast = parse_ok(&format!(
            "resource \"R\" validate {{\n  {}\n}}",
            group(MAX_NESTING)
        ));
        assert_eq!(ast.statements.len(), 1);

        let diagnostics = parse_err(&format!(
            "resource \"R\" validate {{\n  {}\n  input.B == 2\n}}",
            group(20_000)
        ));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::NestingTooDeep);
        assert_eq!(diagnostics[0].span.line, 2);
    }

    #[test]
    fn two_comparisons_without_and_on_one_line() {
        let diagnostics = parse_err("resource \"R\" validate { input.A == 1 input.B == 2 }");
        assert!(diagnostics[0].message.contains("'&&'"));
    }
}
