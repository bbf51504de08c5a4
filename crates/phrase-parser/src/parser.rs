use phrase_ast::*;
use phrase_lexer::{Lexer, Token, TokenKind};

use crate::diagnostics::ParseError;
use crate::expr;
use crate::stmt;

pub struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token,
    source: &'src str,
    errors: Vec<ParseError>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self::with_lexer(source, Lexer::new(source))
    }

    /// A parser over a bare expression fragment (no `<?php` tag), used for
    /// the sub-parse of `{$expr}` string interpolations.
    pub(crate) fn fragment(source: &'src str) -> Self {
        Self::with_lexer(source, Lexer::new_scripting(source))
    }

    fn with_lexer(source: &'src str, mut lexer: Lexer<'src>) -> Self {
        let current = lexer.next_token();
        let errors = lexer
            .errors
            .drain(..)
            .map(|e| ParseError::Lex {
                message: e.message,
                span: e.span,
            })
            .collect();
        Self {
            lexer,
            current,
            source,
            errors,
        }
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    // =========================================================================
    // Token navigation
    // =========================================================================

    /// Get the current token kind without consuming it.
    pub fn current_kind(&self) -> TokenKind {
        self.current.kind
    }

    /// Get the current token's span.
    pub fn current_span(&self) -> Span {
        self.current.span
    }

    /// Get the text of the current token.
    pub fn current_text(&self) -> &'src str {
        &self.source[self.current.span.start as usize..self.current.span.end as usize]
    }

    /// Advance to the next token, returning the consumed token. Lexer
    /// errors produced while reading are folded into the error list.
    pub fn advance(&mut self) -> Token {
        let prev = std::mem::replace(&mut self.current, self.lexer.next_token());
        for e in self.lexer.errors.drain(..) {
            self.errors.push(ParseError::Lex {
                message: e.message,
                span: e.span,
            });
        }
        prev
    }

    /// Check if the current token matches the given kind.
    pub fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    /// If the current token matches `kind`, consume and return it.
    pub fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Expect the current token to be `kind`. Consume and return it if so,
    /// otherwise push an error and return None without advancing.
    pub fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            self.error(ParseError::Expected {
                expected: format!("{}", kind),
                found: self.current_kind(),
                span: self.current_span(),
            });
            None
        }
    }

    /// Expect a semicolon or `?>` close tag (which acts as an implicit
    /// statement terminator). Does NOT consume `?>` — it stays in the
    /// stream for the main loop to handle.
    pub fn expect_semicolon(&mut self, after: &str) -> Option<Token> {
        if self.check(TokenKind::Semicolon) {
            Some(self.advance())
        } else if self.check(TokenKind::CloseTag) {
            None
        } else {
            self.error(ParseError::ExpectedAfter {
                expected: "';'".to_string(),
                after: after.to_string(),
                span: self.current_span(),
            });
            None
        }
    }

    /// Expect a closing delimiter, reporting where the opening was.
    pub fn expect_closing(&mut self, kind: TokenKind, opened_at: Span) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            self.error(ParseError::UnclosedDelimiter {
                delimiter: format!("'{}'", kind),
                opened_at,
                span: self.current_span(),
            });
            None
        }
    }

    /// Start a span at the current token position.
    pub fn start_span(&self) -> u32 {
        self.current.span.start
    }

    /// Peek at the next token's kind (one ahead of current).
    pub fn peek_kind(&mut self) -> TokenKind {
        self.lexer.peek().kind
    }

    /// Peek two tokens ahead of current.
    pub fn peek2_kind(&mut self) -> TokenKind {
        self.lexer.peek2().kind
    }

    /// Text of the peeked token (one ahead of current).
    pub fn peek_text(&mut self) -> &'src str {
        let span = self.lexer.peek().span;
        &self.source[span.start as usize..span.end as usize]
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    pub fn error(&mut self, err: ParseError) {
        self.errors.push(err);
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    /// Panic-mode recovery: advance until a likely statement boundary.
    pub fn synchronize(&mut self) {
        loop {
            match self.current_kind() {
                TokenKind::Eof => break,
                TokenKind::Semicolon => {
                    self.advance();
                    break;
                }
                TokenKind::If
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::For
                | TokenKind::Foreach
                | TokenKind::Function
                | TokenKind::Return
                | TokenKind::Echo
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Switch
                | TokenKind::Try
                | TokenKind::Throw
                | TokenKind::Declare
                | TokenKind::Global
                | TokenKind::Class
                | TokenKind::Abstract
                | TokenKind::Final
                | TokenKind::Interface
                | TokenKind::Trait
                | TokenKind::Namespace
                | TokenKind::Use
                | TokenKind::Const
                | TokenKind::RightBrace
                | TokenKind::CloseTag => break,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // =========================================================================
    // Identifiers and names
    // =========================================================================

    /// Keywords that remain usable as member, method, and constant names.
    pub fn is_semi_reserved_keyword(&self) -> bool {
        matches!(
            self.current_kind(),
            TokenKind::Class
                | TokenKind::Abstract
                | TokenKind::Final
                | TokenKind::Interface
                | TokenKind::Trait
                | TokenKind::Extends
                | TokenKind::Implements
                | TokenKind::Public
                | TokenKind::Protected
                | TokenKind::Private
                | TokenKind::Static
                | TokenKind::Const
                | TokenKind::Namespace
                | TokenKind::Use
                | TokenKind::Self_
                | TokenKind::Parent_
                | TokenKind::New
                | TokenKind::Throw
                | TokenKind::Try
                | TokenKind::Catch
                | TokenKind::Finally
                | TokenKind::Instanceof
                | TokenKind::Array
                | TokenKind::List
                | TokenKind::Switch
                | TokenKind::Case
                | TokenKind::Default
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::ElseIf
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::For
                | TokenKind::Foreach
                | TokenKind::As
                | TokenKind::Function
                | TokenKind::Return
                | TokenKind::Echo
                | TokenKind::Print
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Declare
                | TokenKind::Global
                | TokenKind::Clone
                | TokenKind::Include
                | TokenKind::IncludeOnce
                | TokenKind::Require
                | TokenKind::RequireOnce
                | TokenKind::Exit
                | TokenKind::Die
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Xor
        )
    }

    /// Consume the current token as an identifier string, accepting both
    /// Identifier tokens and semi-reserved keywords.
    pub fn eat_identifier_or_keyword(&mut self) -> Option<(String, Span)> {
        if self.check(TokenKind::Identifier) || self.is_semi_reserved_keyword() {
            let token = self.advance();
            let text = self.source[token.span.start as usize..token.span.end as usize].to_string();
            Some((text, token.span))
        } else {
            None
        }
    }

    /// Parse a possibly qualified name: `Foo`, `Foo\Bar`, `\Foo\Bar`.
    /// Returns the raw text (with backslashes) and its span.
    pub fn parse_qualified_name(&mut self) -> (String, Span) {
        let start = self.start_span();
        let mut name = String::new();

        if self.eat(TokenKind::Backslash).is_some() {
            name.push('\\');
        }

        if let Some((text, _)) = self.eat_identifier_or_keyword() {
            name.push_str(&text);
        } else {
            self.error(ParseError::Expected {
                expected: "identifier".to_string(),
                found: self.current_kind(),
                span: self.current_span(),
            });
            name.push_str("<error>");
        }

        while self.eat(TokenKind::Backslash).is_some() {
            name.push('\\');
            if let Some((text, _)) = self.eat_identifier_or_keyword() {
                name.push_str(&text);
            }
        }

        let span = Span::new(start, self.current_span().start);
        (name, span)
    }

    // =========================================================================
    // Top-level parsing
    // =========================================================================

    /// Parse `<?= expr ?>` — the short echo tag produces an implicit echo.
    pub(crate) fn parse_short_echo(&mut self) -> Option<Stmt> {
        if self.check(TokenKind::Eof) || self.check(TokenKind::CloseTag) {
            return None;
        }
        let start = self.start_span();
        let value = expr::parse_expr(self);
        self.expect_semicolon("short echo tag");
        let span = Span::new(start, self.current_span().start);
        Some(Stmt {
            kind: StmtKind::Echo(vec![value]),
            span,
        })
    }

    pub fn parse_program(&mut self) -> Program {
        let start = self.start_span();
        let mut stmts = Vec::new();

        while !self.check(TokenKind::Eof) {
            match self.current_kind() {
                // Verbatim text becomes a degenerate echo of one literal,
                // bytes preserved exactly.
                TokenKind::InlineHtml => {
                    let token = self.advance();
                    let text =
                        self.source[token.span.start as usize..token.span.end as usize].to_string();
                    stmts.push(Stmt {
                        kind: StmtKind::Echo(vec![Expr {
                            kind: ExprKind::String(text),
                            span: token.span,
                        }]),
                        span: token.span,
                    });
                }
                TokenKind::OpenTag => {
                    let tag = self.advance();
                    let text = &self.source[tag.span.start as usize..tag.span.end as usize];
                    if text == "<?=" {
                        if let Some(echo_stmt) = self.parse_short_echo() {
                            stmts.push(echo_stmt);
                        }
                    }
                }
                TokenKind::CloseTag => {
                    self.advance();
                }
                _ => {
                    let span_before = self.current_span();
                    stmts.push(stmt::parse_stmt(self));
                    // If parsing made no progress, skip the token to avoid
                    // spinning on it.
                    if self.current_span() == span_before {
                        self.advance();
                    }
                }
            }
        }

        let span = if stmts.is_empty() {
            Span::new(start, self.current.span.end)
        } else {
            Span::new(start, stmts.last().unwrap().span.end)
        };

        Program { stmts, span }
    }
}
