// lexer.rs — Tokenizer for policy source text.
//
// Words are emitted as `Ident` tokens; the parser decides which words are
// keywords so that `input.contains` or `input.in` still name properties.
// Newlines are significant (they end statements) and consecutive blank
// lines collapse into a single `Newline` token. `#` starts a comment that
// runs to the end of the line.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use crate::diagnostic::{Diagnostic, DiagnosticCode, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Number(f64),
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    AndAnd,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    TildeEq,
    NotTildeEq,
    Newline,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(word) => write!(f, "'{}'", word),
            TokenKind::Str(s) => write!(f, "string \"{}\"", s),
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::AndAnd => write!(f, "'&&'"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::LtEq => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::GtEq => write!(f, "'>='"),
            TokenKind::TildeEq => write!(f, "'~='"),
            TokenKind::NotTildeEq => write!(f, "'!~='"),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

/// Split `src` into tokens. Always ends with an `Eof` token.
///
/// Lexical problems are reported as diagnostics and the lexer keeps going, so
/// one compile can surface every malformed token.
pub fn tokenize(src: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer {
        src,
        chars: src.char_indices().peekable(),
        line: 1,
        column: 1,
        tokens: Vec::new(),
        diagnostics: Vec::new(),
    };
    lexer.run();
    (lexer.tokens, lexer.diagnostics)
}

impl<'a> Lexer<'a> {
    fn run(&mut self) {
        while let Some(&(offset, c)) = self.chars.peek() {
            let start = self.position(offset);
            match c {
                '\n' => {
                    self.bump();
                    if !matches!(
                        self.tokens.last().map(|t| &t.kind),
                        Some(TokenKind::Newline) | None
                    ) {
                        self.push(TokenKind::Newline, start, offset + 1);
                    }
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '#' => {
                    while let Some(&(_, c)) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '"' => self.string(start),
                c if c.is_ascii_digit() => self.number(start),
                '-' if self.next_is_digit(offset) => self.number(start),
                c if c.is_alphabetic() || c == '_' => self.word(start),
                _ => self.operator(start, c),
            }
        }
        let end = self.src.len();
        let eof = self.position(end);
        self.push(TokenKind::Eof, eof, end);
    }

    fn position(&self, offset: usize) -> Span {
        Span {
            start: offset,
            end: offset,
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map(|&(o, _)| o).unwrap_or(self.src.len())
    }

    fn next_is_digit(&self, offset: usize) -> bool {
        self.src[offset + 1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_digit())
    }

    fn push(&mut self, kind: TokenKind, start: Span, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span { end, ..start },
        });
    }

    fn error(&mut self, code: DiagnosticCode, message: String, start: Span, end: usize) {
        self.diagnostics
            .push(Diagnostic::error(code, message, Span { end, ..start }));
    }

    fn string(&mut self, start: Span) {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.chars.peek().map(|&(o, c)| (o, c)) {
                None | Some((_, '\n')) => {
                    let end = self.offset();
                    self.error(
                        DiagnosticCode::UnterminatedString,
                        "unterminated string literal".to_string(),
                        start,
                        end,
                    );
                    break;
                }
                Some((_, '"')) => {
                    self.bump();
                    break;
                }
                Some((escape_offset, '\\')) => {
                    let escape_start = self.position(escape_offset);
                    self.bump();
                    match self.bump() {
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some(other) => {
                            let end = self.offset();
                            self.error(
                                DiagnosticCode::InvalidEscape,
                                format!("unknown escape sequence '\\{}'", other),
                                escape_start,
                                end,
                            );
                            value.push(other);
                        }
                        None => {}
                    }
                }
                Some((_, c)) => {
                    self.bump();
                    value.push(c);
                }
            }
        }
        let end = self.offset();
        self.push(TokenKind::Str(value), start, end);
    }

    fn number(&mut self, start: Span) {
        let begin = start.start;
        if self.chars.peek().is_some_and(|&(_, c)| c == '-') {
            self.bump();
        }
        while self
            .chars
            .peek()
            .is_some_and(|&(_, c)| c.is_ascii_digit() || c == '.' || c == '_')
        {
            self.bump();
        }
        let end = self.offset();
        let src = self.src;
        let text: String = src[begin..end].chars().filter(|&c| c != '_').collect();
        match text.parse::<f64>() {
            Ok(n) => self.push(TokenKind::Number(n), start, end),
            Err(_) => {
                self.error(
                    DiagnosticCode::InvalidNumber,
                    format!("invalid number literal '{}'", &src[begin..end]),
                    start,
                    end,
                );
                self.push(TokenKind::Number(0.0), start, end);
            }
        }
    }

    fn word(&mut self, start: Span) {
        let begin = start.start;
        while self
            .chars
            .peek()
            .is_some_and(|&(_, c)| c.is_alphanumeric() || c == '_')
        {
            self.bump();
        }
        let end = self.offset();
        let src = self.src;
        self.push(TokenKind::Ident(src[begin..end].to_string()), start, end);
    }

    fn operator(&mut self, start: Span, c: char) {
        self.bump();
        let next = self.chars.peek().map(|&(_, c)| c);
        let kind = match (c, next) {
            ('{', _) => Some(TokenKind::LBrace),
            ('}', _) => Some(TokenKind::RBrace),
            ('(', _) => Some(TokenKind::LParen),
            (')', _) => Some(TokenKind::RParen),
            ('[', _) => Some(TokenKind::LBracket),
            (']', _) => Some(TokenKind::RBracket),
            (',', _) => Some(TokenKind::Comma),
            ('.', _) => Some(TokenKind::Dot),
            ('&', Some('&')) => {
                self.bump();
                Some(TokenKind::AndAnd)
            }
            ('=', Some('=')) => {
                self.bump();
                Some(TokenKind::EqEq)
            }
            ('!', Some('=')) => {
                self.bump();
                Some(TokenKind::NotEq)
            }
            ('!', Some('~')) => {
                self.bump();
                if self.chars.peek().is_some_and(|&(_, c)| c == '=') {
                    self.bump();
                    Some(TokenKind::NotTildeEq)
                } else {
                    None
                }
            }
            ('~', Some('=')) => {
                self.bump();
                Some(TokenKind::TildeEq)
            }
            ('<', Some('=')) => {
                self.bump();
                Some(TokenKind::LtEq)
            }
            ('<', _) => Some(TokenKind::Lt),
            ('>', Some('=')) => {
                self.bump();
                Some(TokenKind::GtEq)
            }
            ('>', _) => Some(TokenKind::Gt),
            ('|', Some('|')) => {
                self.bump();
                let end = self.offset();
                self.error(
                    DiagnosticCode::UnsupportedOperator,
                    "'||' is not supported; write separate policies for alternative checks"
                        .to_string(),
                    start,
                    end,
                );
                return;
            }
            _ => None,
        };

        let end = self.offset();
        let src = self.src;
        match kind {
            Some(kind) => self.push(kind, start, end),
            None => {
                let text = &src[start.start..end];
                let hint = match text {
                    "=" => " (did you mean '=='?)",
                    "&" => " (did you mean '&&'?)",
                    _ => "",
                };
                self.error(
                    DiagnosticCode::UnexpectedCharacter,
                    format!("unexpected character '{}'{}", text, hint),
                    start,
                    end,
                );
            }
        }
    }
}
