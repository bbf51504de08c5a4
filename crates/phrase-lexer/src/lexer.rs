use logos::Logos;
use phrase_ast::Span;

use crate::token::{resolve_keyword, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub struct LexerError {
    pub message: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// 1-based line of the token's first byte.
    pub line: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexerMode {
    Html,
    Code,
}

/// Pull-based tokenizer. Starts in HTML mode, where everything up to the
/// next `<?` open tag is verbatim text; `?>` switches back. Token
/// recognition inside code mode is delegated to the Logos-derived
/// `TokenKind`; open tags, heredocs and line tracking are handled here.
///
/// The `peeked`/`peeked2` slots form the two-token push-back buffer the
/// parser relies on for its lookahead.
pub struct Lexer<'src> {
    source: &'src str,
    mode: LexerMode,
    pos: usize,
    line: u32,
    line_scanned: usize,
    peeked: Option<Token>,
    peeked2: Option<Token>,
    pub errors: Vec<LexerError>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            mode: LexerMode::Html,
            pos: 0,
            line: 1,
            line_scanned: 0,
            peeked: None,
            peeked2: None,
            errors: Vec::new(),
        }
    }

    /// A lexer that starts directly in code mode, for parsing expression
    /// fragments that carry no `<?php` tag (e.g. string interpolations).
    pub fn new_scripting(source: &'src str) -> Self {
        let mut lexer = Self::new(source);
        lexer.mode = LexerMode::Code;
        lexer
    }

    pub fn source(&self) -> &'src str {
        self.source
    }

    pub fn peek(&mut self) -> &Token {
        if self.peeked.is_none() {
            self.peeked = Some(self.read_next_token());
        }
        self.peeked.as_ref().unwrap()
    }

    /// Peek two tokens ahead (past the next token).
    pub fn peek2(&mut self) -> &Token {
        if self.peeked.is_none() {
            self.peeked = Some(self.read_next_token());
        }
        if self.peeked2.is_none() {
            self.peeked2 = Some(self.read_next_token());
        }
        self.peeked2.as_ref().unwrap()
    }

    pub fn next_token(&mut self) -> Token {
        if let Some(token) = self.peeked.take() {
            self.peeked = self.peeked2.take();
            return token;
        }
        self.read_next_token()
    }

    /// The text slice corresponding to a token.
    pub fn token_text(&self, token: &Token) -> &'src str {
        &self.source[token.span.start as usize..token.span.end as usize]
    }

    /// Update the line counter up to `offset` and return the 1-based line
    /// there. Offsets must be fed in increasing order.
    fn line_at(&mut self, offset: usize) -> u32 {
        debug_assert!(offset >= self.line_scanned);
        let newlines = self.source[self.line_scanned..offset]
            .bytes()
            .filter(|b| *b == b'\n')
            .count();
        self.line += newlines as u32;
        self.line_scanned = offset;
        self.line
    }

    fn make_token(&mut self, kind: TokenKind, start: usize, end: usize) -> Token {
        let line = self.line_at(start);
        Token {
            kind,
            span: Span::new(start as u32, end as u32),
            line,
        }
    }

    fn make_eof(&mut self) -> Token {
        let end = self.source.len();
        self.make_token(TokenKind::Eof, end, end)
    }

    fn read_next_token(&mut self) -> Token {
        if self.pos >= self.source.len() {
            return self.make_eof();
        }
        match self.mode {
            LexerMode::Html => self.lex_inline_html(),
            LexerMode::Code => self.lex_code(),
        }
    }

    fn lex_inline_html(&mut self) -> Token {
        let start = self.pos;
        match self.source[self.pos..].find("<?") {
            Some(0) => self.lex_open_tag(),
            Some(offset) => {
                let end = start + offset;
                self.pos = end;
                self.make_token(TokenKind::InlineHtml, start, end)
            }
            None => {
                let end = self.source.len();
                self.pos = end;
                self.make_token(TokenKind::InlineHtml, start, end)
            }
        }
    }

    /// Consume `<?php`, `<?=`, or the bare `<?` short tag and enter code
    /// mode. The lexeme tells the parser which form it was.
    fn lex_open_tag(&mut self) -> Token {
        let start = self.pos;
        let rest = &self.source[start..];
        let len = if rest.len() >= 5
            && rest[..5].eq_ignore_ascii_case("<?php")
            && rest
                .as_bytes()
                .get(5)
                .is_none_or(|b| !b.is_ascii_alphanumeric() && *b != b'_')
        {
            5
        } else if rest.starts_with("<?=") {
            3
        } else {
            2
        };
        self.pos = start + len;
        self.mode = LexerMode::Code;
        self.make_token(TokenKind::OpenTag, start, start + len)
    }

    fn lex_code(&mut self) -> Token {
        // Heredoc/nowdoc before Logos, so `<<<` isn't read as shifts.
        if let Some(token) = self.try_lex_heredoc() {
            return token;
        }

        let source = self.source;
        let remaining = &source[self.pos..];

        // Logos only skips closed block comments; catch the unterminated case.
        let stripped = remaining.trim_start_matches(|c: char| c.is_ascii_whitespace());
        if stripped.starts_with("/*") && !stripped[2..].contains("*/") {
            let at = source.len() - stripped.len();
            self.errors.push(LexerError {
                message: "unterminated comment".to_string(),
                span: Span::new(at as u32, source.len() as u32),
            });
            self.pos = source.len();
            return self.make_eof();
        }

        let mut inner = TokenKind::lexer(remaining);
        match inner.next() {
            Some(Ok(kind)) => {
                let logos_span = inner.span();
                let start = self.pos + logos_span.start;
                let end = self.pos + logos_span.end;

                // `<<` directly before `<` is a heredoc the pre-scan missed
                // because Logos skipped a comment in between.
                if kind == TokenKind::ShiftLeft && source.as_bytes().get(end) == Some(&b'<') {
                    self.pos = start;
                    if let Some(token) = self.try_lex_heredoc() {
                        return token;
                    }
                }

                self.pos = end;

                match kind {
                    TokenKind::CloseTag => {
                        self.mode = LexerMode::Html;
                        // `?>` swallows a single trailing newline
                        let rest = &source[self.pos..];
                        if rest.starts_with("\r\n") {
                            self.pos += 2;
                        } else if rest.starts_with('\n') {
                            self.pos += 1;
                        }
                        self.make_token(TokenKind::CloseTag, start, end)
                    }
                    TokenKind::Identifier => {
                        let text = &source[start..end];
                        let resolved = resolve_keyword(text).unwrap_or(TokenKind::Identifier);
                        self.make_token(resolved, start, end)
                    }
                    _ => self.make_token(kind, start, end),
                }
            }
            Some(Err(())) => {
                let logos_span = inner.span();
                let start = self.pos + logos_span.start;
                let c = source[start..].chars().next().unwrap_or('\0');
                if matches!(c, '\'' | '"' | '`') {
                    // Unterminated string: skip to end of line and continue.
                    let line_end = source[start..]
                        .find('\n')
                        .map(|p| start + p + 1)
                        .unwrap_or(source.len());
                    self.errors.push(LexerError {
                        message: "unterminated string literal".to_string(),
                        span: Span::new(start as u32, line_end as u32),
                    });
                    self.pos = line_end;
                } else {
                    self.errors.push(LexerError {
                        message: format!("unexpected character '{}'", c.escape_default()),
                        span: Span::new(start as u32, (start + c.len_utf8()) as u32),
                    });
                    self.pos = start + c.len_utf8();
                }
                self.read_next_token()
            }
            None => {
                self.pos = source.len();
                self.make_eof()
            }
        }
    }

    /// Try to lex a heredoc/nowdoc at the current position (leading
    /// whitespace allowed). Returns None when the input does not open one.
    fn try_lex_heredoc(&mut self) -> Option<Token> {
        let source = self.source;
        let remaining = &source[self.pos..];
        let trimmed = remaining
            .trim_start_matches(|c: char| matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0c'));
        if !trimmed.starts_with("<<<") {
            return None;
        }
        let ws = remaining.len() - trimmed.len();
        let after_arrows = trimmed[3..].trim_start_matches([' ', '\t']);
        let pad = trimmed[3..].len() - after_arrows.len();

        let (label, is_nowdoc, label_len) = if let Some(rest) = after_arrows.strip_prefix('\'') {
            let end = rest.find('\'')?;
            (&rest[..end], true, end + 2)
        } else {
            let end = after_arrows
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(after_arrows.len());
            if end == 0 {
                return None;
            }
            (&after_arrows[..end], false, end)
        };
        if label.is_empty() {
            return None;
        }

        // The opener line must end in a newline, with nothing but
        // whitespace after the label.
        let after_label = &after_arrows[label_len..];
        let nl = after_label.find('\n')?;
        if !after_label[..nl]
            .trim_matches(|c: char| matches!(c, ' ' | '\t' | '\r'))
            .is_empty()
        {
            return None;
        }

        let kind = if is_nowdoc {
            TokenKind::Nowdoc
        } else {
            TokenKind::Heredoc
        };
        let start = self.pos + ws;
        let body_rel = ws + 3 + pad + label_len + nl + 1;

        // Terminator: the label at the start of a line, optionally indented,
        // followed by a non-identifier character.
        let mut line_start = body_rel;
        loop {
            if line_start >= remaining.len() {
                self.errors.push(LexerError {
                    message: format!("unterminated heredoc '{label}'"),
                    span: Span::new(start as u32, source.len() as u32),
                });
                self.pos = source.len();
                return Some(self.make_token(kind, start, source.len()));
            }
            let line_end = remaining[line_start..]
                .find('\n')
                .map(|p| line_start + p)
                .unwrap_or(remaining.len());
            let line = &remaining[line_start..line_end];
            let lt = line.trim_start_matches([' ', '\t']);
            let indent = line.len() - lt.len();
            if lt.starts_with(label) {
                let terminated = lt[label.len()..]
                    .chars()
                    .next()
                    .is_none_or(|c| !c.is_ascii_alphanumeric() && c != '_');
                if terminated {
                    let token_start = start;
                    let token_end = self.pos + line_start + indent + label.len();
                    self.pos = token_end;
                    return Some(self.make_token(kind, token_start, token_end));
                }
            }
            line_start = line_end + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_tokens(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn collect_kinds(source: &str) -> Vec<TokenKind> {
        collect_tokens(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_php_only() {
        let tokens = collect_kinds("<?php $x = 42;");
        assert_eq!(
            tokens,
            vec![
                TokenKind::OpenTag,
                TokenKind::Variable,
                TokenKind::Equals,
                TokenKind::IntLiteral,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_inline_html_before_php() {
        let tokens = collect_kinds("<html><?php echo 1;");
        assert_eq!(
            tokens,
            vec![
                TokenKind::InlineHtml,
                TokenKind::OpenTag,
                TokenKind::Echo,
                TokenKind::IntLiteral,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_inline_html_after_close_tag() {
        let tokens = collect_kinds("<?php echo 1; ?><html>");
        assert_eq!(
            tokens,
            vec![
                TokenKind::OpenTag,
                TokenKind::Echo,
                TokenKind::IntLiteral,
                TokenKind::Semicolon,
                TokenKind::CloseTag,
                TokenKind::InlineHtml,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_short_open_tag() {
        let mut lexer = Lexer::new("<? echo 1;");
        let tag = lexer.next_token();
        assert_eq!(tag.kind, TokenKind::OpenTag);
        assert_eq!(lexer.token_text(&tag), "<?");
        assert_eq!(lexer.next_token().kind, TokenKind::Echo);
    }

    #[test]
    fn test_short_echo_tag() {
        let mut lexer = Lexer::new("<?= $x ?>");
        let tag = lexer.next_token();
        assert_eq!(tag.kind, TokenKind::OpenTag);
        assert_eq!(lexer.token_text(&tag), "<?=");
        assert_eq!(lexer.next_token().kind, TokenKind::Variable);
        assert_eq!(lexer.next_token().kind, TokenKind::CloseTag);
    }

    #[test]
    fn test_close_tag_swallows_newline() {
        // The newline directly after ?> is consumed, the rest is verbatim.
        let mut lexer = Lexer::new("<?php echo 1; ?>\nrest");
        let mut kinds = Vec::new();
        loop {
            let token = lexer.next_token();
            if token.kind == TokenKind::InlineHtml {
                assert_eq!(lexer.token_text(&token), "rest");
            }
            let done = token.kind == TokenKind::Eof;
            kinds.push(token.kind);
            if done {
                break;
            }
        }
        assert!(kinds.contains(&TokenKind::InlineHtml));
    }

    #[test]
    fn test_keyword_resolution() {
        let tokens = collect_kinds("<?php if else while for foreach function return endif");
        assert_eq!(
            tokens,
            vec![
                TokenKind::OpenTag,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::For,
                TokenKind::Foreach,
                TokenKind::Function,
                TokenKind::Return,
                TokenKind::EndIf,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keyword_case_insensitive() {
        let tokens = collect_kinds("<?php IF ELSE TRUE FALSE NULL");
        assert_eq!(
            tokens,
            vec![
                TokenKind::OpenTag,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::True,
                TokenKind::False,
                TokenKind::Null,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_peek_doesnt_consume() {
        let mut lexer = Lexer::new("<?php 42");
        let peeked = lexer.peek().clone();
        assert_eq!(peeked.kind, TokenKind::OpenTag);
        assert_eq!(lexer.next_token().kind, TokenKind::OpenTag);
        assert_eq!(lexer.next_token().kind, TokenKind::IntLiteral);
    }

    #[test]
    fn test_peek2() {
        let mut lexer = Lexer::new("<?php $a = 1;");
        lexer.next_token(); // <?php
        assert_eq!(lexer.peek().kind, TokenKind::Variable);
        assert_eq!(lexer.peek2().kind, TokenKind::Equals);
        assert_eq!(lexer.next_token().kind, TokenKind::Variable);
        assert_eq!(lexer.next_token().kind, TokenKind::Equals);
    }

    #[test]
    fn test_token_text() {
        let source = "<?php $myVar = 'hello';";
        let mut lexer = Lexer::new(source);
        lexer.next_token(); // <?php
        let var_tok = lexer.next_token();
        assert_eq!(lexer.token_text(&var_tok), "$myVar");
        lexer.next_token(); // =
        let str_tok = lexer.next_token();
        assert_eq!(lexer.token_text(&str_tok), "'hello'");
    }

    #[test]
    fn test_line_numbers() {
        let tokens = collect_tokens("<?php\n$x;\n\n$y;");
        assert_eq!(tokens[0].kind, TokenKind::OpenTag);
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].kind, TokenKind::Variable);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[3].kind, TokenKind::Variable);
        assert_eq!(tokens[3].line, 4);
    }

    #[test]
    fn test_spans_are_correct() {
        let tokens = collect_tokens("<?php $x");
        assert_eq!(tokens[0].span, Span::new(0, 5)); // <?php
        assert_eq!(tokens[1].span, Span::new(6, 8)); // $x
    }

    #[test]
    fn test_operators() {
        let tokens = collect_kinds("<?php === !== <=> ?? ++ -- ** <>");
        assert_eq!(
            tokens,
            vec![
                TokenKind::OpenTag,
                TokenKind::EqualsEqualsEquals,
                TokenKind::BangEqualsEquals,
                TokenKind::Spaceship,
                TokenKind::QuestionQuestion,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::StarStar,
                TokenKind::BangEquals,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_heredoc() {
        let source = "<?php $x = <<<EOT\nhello\nworld\nEOT;\n";
        let mut lexer = Lexer::new(source);
        lexer.next_token(); // <?php
        lexer.next_token(); // $x
        lexer.next_token(); // =
        let doc = lexer.next_token();
        assert_eq!(doc.kind, TokenKind::Heredoc);
        assert_eq!(lexer.token_text(&doc), "<<<EOT\nhello\nworld\nEOT");
        assert_eq!(lexer.next_token().kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_nowdoc() {
        let source = "<?php $x = <<<'EOT'\nraw $stuff\nEOT;";
        let mut lexer = Lexer::new(source);
        lexer.next_token();
        lexer.next_token();
        lexer.next_token();
        let doc = lexer.next_token();
        assert_eq!(doc.kind, TokenKind::Nowdoc);
        assert!(lexer.errors.is_empty());
    }

    #[test]
    fn test_heredoc_indented_terminator() {
        let source = "<?php $x = <<<EOT\n  body\n  EOT;";
        let mut lexer = Lexer::new(source);
        lexer.next_token();
        lexer.next_token();
        lexer.next_token();
        let doc = lexer.next_token();
        assert_eq!(doc.kind, TokenKind::Heredoc);
        assert_eq!(lexer.next_token().kind, TokenKind::Semicolon);
    }

    #[test]
    fn test_unterminated_heredoc_is_error() {
        let source = "<?php $x = <<<EOT\nno end";
        let mut lexer = Lexer::new(source);
        loop {
            if lexer.next_token().kind == TokenKind::Eof {
                break;
            }
        }
        assert!(!lexer.errors.is_empty());
    }

    #[test]
    fn test_unknown_character_is_error() {
        let mut lexer = Lexer::new("<?php 1 \u{1} 2;");
        let mut kinds = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token.kind == TokenKind::Eof;
            kinds.push(token.kind);
            if done {
                break;
            }
        }
        // the bad byte is skipped, both numbers still come through
        assert_eq!(
            kinds,
            vec![
                TokenKind::OpenTag,
                TokenKind::IntLiteral,
                TokenKind::IntLiteral,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
        assert_eq!(lexer.errors.len(), 1);
    }

    #[test]
    fn test_shell_command() {
        let tokens = collect_kinds("<?php `ls -la`;");
        assert_eq!(
            tokens,
            vec![
                TokenKind::OpenTag,
                TokenKind::BacktickString,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(collect_kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_only_inline_html() {
        let tokens = collect_kinds("<html><body>Hello</body></html>");
        assert_eq!(tokens, vec![TokenKind::InlineHtml, TokenKind::Eof]);
    }
}
