use phrase_ast::*;
use phrase_lexer::TokenKind;

use crate::diagnostics::ParseError;
use crate::expr;
use crate::parser::Parser;

/// Parse a single statement.
pub fn parse_stmt(parser: &mut Parser) -> Stmt {
    match parser.current_kind() {
        TokenKind::Semicolon => {
            let span = parser.current_span();
            parser.advance();
            Stmt {
                kind: StmtKind::Nop,
                span,
            }
        }
        TokenKind::Echo => parse_echo(parser),
        TokenKind::Return => parse_return(parser),
        TokenKind::LeftBrace => parse_block(parser),
        TokenKind::If => parse_if(parser),
        TokenKind::While => parse_while(parser),
        TokenKind::Do => parse_do_while(parser),
        TokenKind::For => parse_for(parser),
        TokenKind::Foreach => parse_foreach(parser),
        TokenKind::Function => {
            // `function (` and `function &(` open a closure expression;
            // a following name means a declaration.
            let next = parser.peek_kind();
            if next == TokenKind::LeftParen
                || (next == TokenKind::Ampersand && parser.peek2_kind() == TokenKind::LeftParen)
            {
                parse_expression_stmt(parser)
            } else {
                parse_function(parser)
            }
        }
        TokenKind::Break => parse_break(parser),
        TokenKind::Continue => parse_continue(parser),
        TokenKind::Switch => parse_switch(parser),
        TokenKind::Throw => parse_throw(parser),
        TokenKind::Try => parse_try_catch(parser),
        TokenKind::Declare => parse_declare(parser),
        TokenKind::Global => parse_global(parser),
        TokenKind::Class => parse_class(parser, false, false),
        TokenKind::Abstract => {
            let start = parser.start_span();
            parser.advance();
            if parser.check(TokenKind::Class) {
                parse_class(parser, true, false)
            } else {
                missing_class_keyword(parser, start)
            }
        }
        TokenKind::Final => {
            let start = parser.start_span();
            parser.advance();
            if parser.check(TokenKind::Class) {
                parse_class(parser, false, true)
            } else if parser.check(TokenKind::Abstract) {
                parser.advance();
                if parser.check(TokenKind::Class) {
                    parse_class(parser, true, true)
                } else {
                    missing_class_keyword(parser, start)
                }
            } else {
                missing_class_keyword(parser, start)
            }
        }
        TokenKind::Interface => parse_interface(parser),
        TokenKind::Trait => parse_trait(parser),
        TokenKind::Namespace => {
            // `namespace\Foo` is a relative name in expression position
            if parser.peek_kind() == TokenKind::Backslash {
                parse_expression_stmt(parser)
            } else {
                parse_namespace(parser)
            }
        }
        TokenKind::Use => parse_use(parser),
        TokenKind::Const => parse_const(parser),
        TokenKind::Static => {
            // `static $var` declares function-static variables; anything
            // else is `static::` in expression position.
            if parser.peek_kind() == TokenKind::Variable {
                parse_static_var(parser)
            } else {
                parse_expression_stmt(parser)
            }
        }
        // Mixed-mode text inside a block: `{ ?>text<?php }`
        TokenKind::CloseTag => {
            let span = parser.current_span();
            parser.advance();
            if parser.check(TokenKind::InlineHtml) {
                let token = parser.advance();
                let text =
                    parser.source()[token.span.start as usize..token.span.end as usize].to_string();
                Stmt {
                    kind: StmtKind::Echo(vec![Expr {
                        kind: ExprKind::String(text),
                        span: token.span,
                    }]),
                    span: token.span,
                }
            } else if parser.check(TokenKind::Eof) {
                Stmt {
                    kind: StmtKind::Nop,
                    span,
                }
            } else {
                parse_stmt(parser)
            }
        }
        TokenKind::OpenTag => {
            let tag = parser.advance();
            let text = &parser.source()[tag.span.start as usize..tag.span.end as usize];
            if text == "<?=" {
                parser.parse_short_echo().unwrap_or(Stmt {
                    kind: StmtKind::Nop,
                    span: tag.span,
                })
            } else if parser.check(TokenKind::Eof) {
                Stmt {
                    kind: StmtKind::Nop,
                    span: tag.span,
                }
            } else {
                parse_stmt(parser)
            }
        }
        TokenKind::Eof => {
            let span = parser.current_span();
            parser.error(ParseError::ExpectedStatement { span });
            Stmt {
                kind: StmtKind::Error,
                span,
            }
        }
        _ => parse_expression_stmt(parser),
    }
}

fn missing_class_keyword(parser: &mut Parser, start: u32) -> Stmt {
    let span = Span::new(start, parser.current_span().start);
    parser.error(ParseError::Expected {
        expected: "'class'".to_string(),
        found: parser.current_kind(),
        span,
    });
    parser.synchronize();
    Stmt {
        kind: StmtKind::Error,
        span,
    }
}

/// Parse a block statement: `{ stmts }`
pub fn parse_block(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    let open = parser.expect(TokenKind::LeftBrace);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());

    let mut stmts = Vec::new();
    while !parser.check(TokenKind::RightBrace) && !parser.check(TokenKind::Eof) {
        let span_before = parser.current_span();
        stmts.push(parse_stmt(parser));
        if parser.current_span() == span_before {
            parser.advance();
        }
    }

    let close = parser.expect_closing(TokenKind::RightBrace, open_span);
    let end = close.map(|t| t.span.end).unwrap_or(parser.current_span().start);

    Stmt {
        kind: StmtKind::Block(stmts),
        span: Span::new(start, end),
    }
}

/// Parse a statement or brace block (used as the body of control flow).
fn parse_stmt_or_block(parser: &mut Parser) -> Stmt {
    if parser.check(TokenKind::LeftBrace) {
        parse_block(parser)
    } else {
        parse_stmt(parser)
    }
}

/// Parse statements until one of the end keywords (alternative syntax).
fn parse_stmts_until_end(parser: &mut Parser, ends: &[TokenKind]) -> Vec<Stmt> {
    let mut stmts = Vec::new();
    while !ends.contains(&parser.current_kind()) && !parser.check(TokenKind::Eof) {
        let span_before = parser.current_span();
        stmts.push(parse_stmt(parser));
        if parser.current_span() == span_before {
            parser.advance();
        }
    }
    stmts
}

/// The shared dispatcher for control-flow bodies. With a `:` after the
/// header and a terminator list, statements accumulate into a block until
/// one of `ends`; otherwise a single statement (or brace block) is parsed.
/// The `:` form needs an explicit terminator list — callers that pass none
/// (do-while) never accept it. Returns the body and whether the
/// alternative form was taken, so the caller can expect its `end*;`.
fn parse_control_body(parser: &mut Parser, ends: &[TokenKind]) -> (Stmt, bool) {
    if !ends.is_empty() && parser.check(TokenKind::Colon) {
        let start = parser.start_span();
        parser.advance();
        let stmts = parse_stmts_until_end(parser, ends);
        let span = Span::new(start, parser.current_span().start);
        (
            Stmt {
                kind: StmtKind::Block(stmts),
                span,
            },
            true,
        )
    } else {
        (parse_stmt_or_block(parser), false)
    }
}

// =============================================================================
// Simple statements
// =============================================================================

fn parse_echo(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance(); // consume 'echo'

    let mut exprs = vec![expr::parse_expr(parser)];
    while parser.eat(TokenKind::Comma).is_some() {
        if parser.check(TokenKind::Semicolon) {
            break; // trailing comma
        }
        exprs.push(expr::parse_expr(parser));
    }

    parser.expect_semicolon("echo statement");
    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::Echo(exprs),
        span,
    }
}

fn parse_return(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance();

    let value = if parser.check(TokenKind::Semicolon) || parser.check(TokenKind::CloseTag) {
        None
    } else {
        Some(expr::parse_expr(parser))
    };

    parser.expect_semicolon("return statement");
    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::Return(value),
        span,
    }
}

fn parse_break(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance();
    let level = if parser.check(TokenKind::Semicolon) || parser.check(TokenKind::CloseTag) {
        None
    } else {
        Some(expr::parse_expr(parser))
    };
    parser.expect_semicolon("break statement");
    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::Break(level),
        span,
    }
}

fn parse_continue(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance();
    let level = if parser.check(TokenKind::Semicolon) || parser.check(TokenKind::CloseTag) {
        None
    } else {
        Some(expr::parse_expr(parser))
    };
    parser.expect_semicolon("continue statement");
    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::Continue(level),
        span,
    }
}

fn parse_throw(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance();
    let value = expr::parse_expr(parser);
    parser.expect_semicolon("throw statement");
    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::Throw(value),
        span,
    }
}

// =============================================================================
// If
// =============================================================================

fn parse_if(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance(); // consume 'if'

    let open = parser.expect(TokenKind::LeftParen);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
    let condition = expr::parse_expr(parser);
    parser.expect_closing(TokenKind::RightParen, open_span);

    let (then_stmt, alternative) = parse_control_body(
        parser,
        &[TokenKind::ElseIf, TokenKind::Else, TokenKind::EndIf],
    );
    let then_branch = Box::new(then_stmt);

    let mut elseif_branches = Vec::new();
    let mut else_branch = None;

    if alternative {
        while parser.eat(TokenKind::ElseIf).is_some() {
            let elseif_start = parser.start_span();
            parser.expect(TokenKind::LeftParen);
            let elseif_cond = expr::parse_expr(parser);
            parser.expect(TokenKind::RightParen);
            parser.expect(TokenKind::Colon);
            let stmts = parse_stmts_until_end(
                parser,
                &[TokenKind::ElseIf, TokenKind::Else, TokenKind::EndIf],
            );
            let body = Stmt {
                kind: StmtKind::Block(stmts),
                span: Span::new(elseif_start, parser.current_span().start),
            };
            let span = Span::new(elseif_start, body.span.end);
            elseif_branches.push(ElseIfBranch {
                condition: elseif_cond,
                body,
                span,
            });
        }

        if parser.eat(TokenKind::Else).is_some() {
            parser.expect(TokenKind::Colon);
            let stmts = parse_stmts_until_end(parser, &[TokenKind::EndIf]);
            else_branch = Some(Box::new(Stmt {
                kind: StmtKind::Block(stmts),
                span: Span::new(start, parser.current_span().start),
            }));
        }

        parser.expect(TokenKind::EndIf);
        parser.expect_semicolon("endif");
    } else {
        // `elseif` is one keyword; `else if` parses as a nested if inside
        // the else branch via parse_stmt.
        while parser.eat(TokenKind::ElseIf).is_some() {
            let elseif_start = parser.start_span();
            parser.expect(TokenKind::LeftParen);
            let elseif_cond = expr::parse_expr(parser);
            parser.expect(TokenKind::RightParen);
            let body = parse_stmt_or_block(parser);
            let span = Span::new(elseif_start, body.span.end);
            elseif_branches.push(ElseIfBranch {
                condition: elseif_cond,
                body,
                span,
            });
        }

        if parser.eat(TokenKind::Else).is_some() {
            else_branch = Some(Box::new(parse_stmt_or_block(parser)));
        }
    }

    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::If(IfStmt {
            condition,
            then_branch,
            elseif_branches,
            else_branch,
        }),
        span,
    }
}

// =============================================================================
// Loops
// =============================================================================

fn parse_while(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance();
    let open = parser.expect(TokenKind::LeftParen);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
    let condition = expr::parse_expr(parser);
    parser.expect_closing(TokenKind::RightParen, open_span);

    let (body, alternative) = parse_control_body(parser, &[TokenKind::EndWhile]);
    if alternative {
        parser.expect(TokenKind::EndWhile);
        parser.expect_semicolon("endwhile");
    }

    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::While(WhileStmt {
            condition,
            body: Box::new(body),
        }),
        span,
    }
}

fn parse_do_while(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance();
    // do-while has no alternative form; the body is a single statement
    // or brace block.
    let body = Box::new(parse_stmt_or_block(parser));
    parser.expect(TokenKind::While);
    let open = parser.expect(TokenKind::LeftParen);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
    let condition = expr::parse_expr(parser);
    parser.expect_closing(TokenKind::RightParen, open_span);
    parser.expect_semicolon("do-while statement");
    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::DoWhile(DoWhileStmt { body, condition }),
        span,
    }
}

fn parse_for(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance();
    let open = parser.expect(TokenKind::LeftParen);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
    let init = parse_expr_list_until(parser, TokenKind::Semicolon);
    parser.expect(TokenKind::Semicolon);
    let condition = parse_expr_list_until(parser, TokenKind::Semicolon);
    parser.expect(TokenKind::Semicolon);
    let update = parse_expr_list_until(parser, TokenKind::RightParen);
    parser.expect_closing(TokenKind::RightParen, open_span);

    let (body, alternative) = parse_control_body(parser, &[TokenKind::EndFor]);
    if alternative {
        parser.expect(TokenKind::EndFor);
        parser.expect_semicolon("endfor");
    }

    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::For(ForStmt {
            init,
            condition,
            update,
            body: Box::new(body),
        }),
        span,
    }
}

/// Comma-separated expression list, any of which may be empty.
fn parse_expr_list_until(parser: &mut Parser, stop: TokenKind) -> Vec<Expr> {
    let mut exprs = Vec::new();
    if parser.check(stop) {
        return exprs;
    }
    exprs.push(expr::parse_expr(parser));
    while parser.eat(TokenKind::Comma).is_some() {
        if parser.check(stop) {
            break; // trailing comma
        }
        exprs.push(expr::parse_expr(parser));
    }
    exprs
}

fn parse_foreach(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance();
    let open = parser.expect(TokenKind::LeftParen);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
    let collection = expr::parse_expr(parser);
    parser.expect(TokenKind::As);

    let first_by_ref = parser.eat(TokenKind::Ampersand).is_some();
    let first = expr::parse_expr(parser);

    let (key, value, by_ref) = if parser.eat(TokenKind::FatArrow).is_some() {
        let value_by_ref = parser.eat(TokenKind::Ampersand).is_some();
        let value = expr::parse_expr(parser);
        (Some(first), value, value_by_ref)
    } else {
        (None, first, first_by_ref)
    };

    parser.expect_closing(TokenKind::RightParen, open_span);

    let (body, alternative) = parse_control_body(parser, &[TokenKind::EndForeach]);
    if alternative {
        parser.expect(TokenKind::EndForeach);
        parser.expect_semicolon("endforeach");
    }

    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::Foreach(ForeachStmt {
            expr: collection,
            key,
            value,
            by_ref,
            body: Box::new(body),
        }),
        span,
    }
}

// =============================================================================
// Switch
// =============================================================================

fn parse_switch(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance();
    let open = parser.expect(TokenKind::LeftParen);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
    let subject = expr::parse_expr(parser);
    parser.expect_closing(TokenKind::RightParen, open_span);

    let alternative = parser.eat(TokenKind::Colon).is_some();
    if !alternative {
        parser.expect(TokenKind::LeftBrace);
    }
    while parser.check(TokenKind::Semicolon) {
        parser.advance();
    }

    let end_token = if alternative {
        TokenKind::EndSwitch
    } else {
        TokenKind::RightBrace
    };

    let mut cases = Vec::new();
    while !parser.check(end_token) && !parser.check(TokenKind::Eof) {
        let case_start = parser.start_span();
        let value = if parser.eat(TokenKind::Case).is_some() {
            let v = expr::parse_expr(parser);
            // `case 1:` or the lenient `case 1;`
            if parser.eat(TokenKind::Colon).is_none() {
                parser.expect(TokenKind::Semicolon);
            }
            Some(v)
        } else if parser.eat(TokenKind::Default).is_some() {
            if parser.eat(TokenKind::Colon).is_none() {
                parser.expect(TokenKind::Semicolon);
            }
            None
        } else {
            parser.error(ParseError::Expected {
                expected: "'case' or 'default'".to_string(),
                found: parser.current_kind(),
                span: parser.current_span(),
            });
            break;
        };

        let mut body = Vec::new();
        while !parser.check(TokenKind::Case)
            && !parser.check(TokenKind::Default)
            && !parser.check(end_token)
            && !parser.check(TokenKind::Eof)
        {
            let span_before = parser.current_span();
            body.push(parse_stmt(parser));
            if parser.current_span() == span_before {
                parser.advance();
            }
        }

        cases.push(SwitchCase {
            value,
            body,
            span: Span::new(case_start, parser.current_span().start),
        });
    }

    if alternative {
        parser.expect(TokenKind::EndSwitch);
        parser.expect_semicolon("endswitch");
    } else {
        parser.expect(TokenKind::RightBrace);
    }

    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::Switch(SwitchStmt {
            expr: subject,
            cases,
        }),
        span,
    }
}

// =============================================================================
// Try / catch / finally
// =============================================================================

fn parse_try_catch(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance();
    let body = parse_brace_body(parser);

    let mut catches = Vec::new();
    while parser.eat(TokenKind::Catch).is_some() {
        let catch_start = parser.start_span();
        parser.expect(TokenKind::LeftParen);

        // The caught type list is kept as raw text, `|` separators included.
        let type_start = parser.start_span();
        let _ = parser.parse_qualified_name();
        while parser.eat(TokenKind::Pipe).is_some() {
            let _ = parser.parse_qualified_name();
        }
        let type_end = parser.current_span().start;
        let catch_type = parser.source()[type_start as usize..type_end as usize]
            .trim_end()
            .to_string();

        let var = parser.eat(TokenKind::Variable).map(|t| {
            let text = &parser.source()[t.span.start as usize..t.span.end as usize];
            text[1..].to_string()
        });

        parser.expect(TokenKind::RightParen);
        let catch_body = parse_brace_body(parser);

        catches.push(CatchClause {
            catch_type,
            var,
            body: catch_body,
            span: Span::new(catch_start, parser.current_span().start),
        });
    }

    let finally = if parser.eat(TokenKind::Finally).is_some() {
        Some(parse_brace_body(parser))
    } else {
        None
    };

    if catches.is_empty() && finally.is_none() {
        parser.error(ParseError::Expected {
            expected: "catch or finally clause".to_string(),
            found: parser.current_kind(),
            span: Span::new(start, parser.current_span().start),
        });
    }

    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::TryCatch(TryCatchStmt {
            body,
            catches,
            finally,
        }),
        span,
    }
}

/// `{ stmts }` returning the inner statements.
fn parse_brace_body(parser: &mut Parser) -> Vec<Stmt> {
    let open = parser.expect(TokenKind::LeftBrace);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
    let mut stmts = Vec::new();
    while !parser.check(TokenKind::RightBrace) && !parser.check(TokenKind::Eof) {
        let span_before = parser.current_span();
        stmts.push(parse_stmt(parser));
        if parser.current_span() == span_before {
            parser.advance();
        }
    }
    parser.expect_closing(TokenKind::RightBrace, open_span);
    stmts
}

// =============================================================================
// Declare / Global / Static
// =============================================================================

fn parse_declare(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance();
    parser.expect(TokenKind::LeftParen);

    let mut directives = Vec::new();
    loop {
        if parser.check(TokenKind::RightParen) {
            break;
        }
        if let Some(t) = parser.eat(TokenKind::Identifier) {
            let name = &parser.source()[t.span.start as usize..t.span.end as usize];
            let name = name.to_string();
            parser.expect(TokenKind::Equals);
            let value = expr::parse_expr(parser);
            let raw =
                &parser.source()[value.span.start as usize..value.span.end as usize];
            directives.push(format!("{name}={raw}"));
        } else {
            parser.error(ParseError::Expected {
                expected: "directive name".to_string(),
                found: parser.current_kind(),
                span: parser.current_span(),
            });
            break;
        }
        if parser.eat(TokenKind::Comma).is_none() {
            break;
        }
    }
    parser.expect(TokenKind::RightParen);

    // Either a block body or the statement-terminated form.
    let body = if parser.check(TokenKind::LeftBrace) {
        Some(Box::new(parse_block(parser)))
    } else {
        parser.expect_semicolon("declare statement");
        None
    };

    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::Declare(directives, body),
        span,
    }
}

fn parse_global(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance();

    let mut vars = Vec::new();
    loop {
        let e = expr::parse_expr(parser);
        if !is_simple_variable(&e) {
            parser.error(ParseError::Expected {
                expected: "variable".to_string(),
                found: parser.current_kind(),
                span: e.span,
            });
        }
        vars.push(e);
        if parser.eat(TokenKind::Comma).is_none() {
            break;
        }
        if parser.check(TokenKind::Semicolon) {
            break; // trailing comma
        }
    }

    parser.expect_semicolon("global declaration");
    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::Global(vars),
        span,
    }
}

fn is_simple_variable(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Variable(_) | ExprKind::VariableVariable(_)
    )
}

fn parse_static_var(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance(); // consume 'static'

    let mut vars = Vec::new();
    loop {
        let var_start = parser.start_span();
        let token = parser.expect(TokenKind::Variable);
        let name = token
            .map(|t| {
                let text = &parser.source()[t.span.start as usize..t.span.end as usize];
                text[1..].to_string()
            })
            .unwrap_or_else(|| "<error>".to_string());

        let default = if parser.eat(TokenKind::Equals).is_some() {
            Some(expr::parse_expr(parser))
        } else {
            None
        };

        let span = Span::new(
            var_start,
            default
                .as_ref()
                .map(|e| e.span.end)
                .unwrap_or(parser.current_span().start),
        );
        vars.push(StaticVar {
            name,
            default,
            span,
        });

        if parser.eat(TokenKind::Comma).is_none() {
            break;
        }
        if parser.check(TokenKind::Semicolon) {
            break; // trailing comma
        }
    }

    parser.expect_semicolon("static declaration");
    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::StaticVar(vars),
        span,
    }
}

// =============================================================================
// Function declarations
// =============================================================================

fn parse_function(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance(); // consume 'function'

    let by_ref = parser.eat(TokenKind::Ampersand).is_some();

    let name = if let Some((text, _)) = parser.eat_identifier_or_keyword() {
        text
    } else {
        parser.error(ParseError::Expected {
            expected: "function name".to_string(),
            found: parser.current_kind(),
            span: parser.current_span(),
        });
        "<error>".to_string()
    };

    let open = parser.expect(TokenKind::LeftParen);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
    let params = parse_param_list(parser);
    parser.expect_closing(TokenKind::RightParen, open_span);

    let body = parse_brace_body(parser);

    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::Function(FunctionDecl {
            name,
            by_ref,
            params,
            body,
        }),
        span,
    }
}

/// Parse a parameter list: each entry is `(TypeHint)? (&)? $name (= default)?`
pub fn parse_param_list(parser: &mut Parser) -> Vec<Param> {
    let mut params = Vec::new();
    if parser.check(TokenKind::RightParen) {
        return params;
    }

    loop {
        if parser.check(TokenKind::RightParen) {
            break;
        }
        let param_start = parser.start_span();

        let type_hint = parse_param_type(parser);
        let by_ref = parser.eat(TokenKind::Ampersand).is_some();

        let name_token = parser.expect(TokenKind::Variable);
        let name_end = name_token.as_ref().map(|t| t.span.end);
        let name = name_token
            .map(|t| {
                let text = &parser.source()[t.span.start as usize..t.span.end as usize];
                text[1..].to_string()
            })
            .unwrap_or_else(|| "<error>".to_string());

        let default = if parser.eat(TokenKind::Equals).is_some() {
            Some(expr::parse_expr(parser))
        } else {
            None
        };

        let end = default
            .as_ref()
            .map(|e| e.span.end)
            .or(name_end)
            .unwrap_or(parser.current_span().start);

        params.push(Param {
            name,
            type_hint,
            by_ref,
            default,
            span: Span::new(param_start, end),
        });

        if parser.eat(TokenKind::Comma).is_none() {
            break;
        }
    }

    params
}

/// A raw parameter type hint: `array`, `callable`, or a class name.
fn parse_param_type(parser: &mut Parser) -> Option<String> {
    match parser.current_kind() {
        TokenKind::Array => {
            parser.advance();
            Some("array".to_string())
        }
        TokenKind::Self_ => {
            parser.advance();
            Some("self".to_string())
        }
        TokenKind::Parent_ => {
            parser.advance();
            Some("parent".to_string())
        }
        TokenKind::Identifier | TokenKind::Backslash => Some(parser.parse_qualified_name().0),
        _ => None,
    }
}

// =============================================================================
// Class / interface / trait
// =============================================================================

fn is_reserved_class_name(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "self" | "parent" | "static"
    )
}

fn parse_class(parser: &mut Parser, is_abstract: bool, is_final: bool) -> Stmt {
    let start = parser.start_span();
    parser.advance(); // consume 'class'

    let (name, name_span) = if let Some((text, span)) = parser.eat_identifier_or_keyword() {
        (text, span)
    } else {
        parser.error(ParseError::Expected {
            expected: "class name".to_string(),
            found: parser.current_kind(),
            span: parser.current_span(),
        });
        ("<error>".to_string(), parser.current_span())
    };

    if is_reserved_class_name(&name) {
        parser.error(ParseError::Forbidden {
            message: format!("cannot use '{}' as class name", name),
            span: name_span,
        });
    }

    let extends = parser
        .eat(TokenKind::Extends)
        .map(|_| parser.parse_qualified_name().0);

    let implements = if parser.eat(TokenKind::Implements).is_some() {
        parse_name_list(parser)
    } else {
        Vec::new()
    };

    let open = parser.expect(TokenKind::LeftBrace);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
    let members = parse_class_members(parser);
    let close = parser.expect_closing(TokenKind::RightBrace, open_span);
    let end = close.map(|t| t.span.end).unwrap_or(parser.current_span().start);

    Stmt {
        kind: StmtKind::Class(ClassDecl {
            name: Some(name),
            is_abstract,
            is_final,
            extends,
            implements,
            members,
        }),
        span: Span::new(start, end),
    }
}

/// Comma-separated qualified names (implements / interface extends lists).
pub fn parse_name_list(parser: &mut Parser) -> Vec<String> {
    let mut names = vec![parser.parse_qualified_name().0];
    while parser.eat(TokenKind::Comma).is_some() {
        if parser.check(TokenKind::LeftBrace) || parser.check(TokenKind::Semicolon) {
            break; // trailing comma
        }
        names.push(parser.parse_qualified_name().0);
    }
    names
}

pub fn parse_class_members(parser: &mut Parser) -> Vec<ClassMember> {
    let mut members = Vec::new();
    while !parser.check(TokenKind::RightBrace) && !parser.check(TokenKind::Eof) {
        if parser.check(TokenKind::Semicolon) {
            parser.advance();
            continue;
        }

        let member_start = parser.start_span();

        // Trait use: `use T1, T2;` or `use T { adaptations }`
        if parser.check(TokenKind::Use) {
            parser.advance();
            let mut traits = vec![parser.parse_qualified_name().0];
            while parser.eat(TokenKind::Comma).is_some() {
                if parser.check(TokenKind::Semicolon) || parser.check(TokenKind::LeftBrace) {
                    break;
                }
                traits.push(parser.parse_qualified_name().0);
            }
            let adaptations = if parser.eat(TokenKind::LeftBrace).is_some() {
                parse_trait_adaptations(parser)
            } else {
                parser.expect(TokenKind::Semicolon);
                Vec::new()
            };
            members.push(ClassMember {
                kind: ClassMemberKind::TraitUse(TraitUseDecl {
                    traits,
                    adaptations,
                }),
                span: Span::new(member_start, parser.current_span().start),
            });
            continue;
        }

        // Modifiers; `var` is the PHP4 spelling of public.
        let mut visibility = None;
        let mut is_static = false;
        let mut is_abstract = false;
        let mut is_final = false;

        if parser.check(TokenKind::Identifier) && parser.current_text().eq_ignore_ascii_case("var")
        {
            parser.advance();
            visibility = Some(Visibility::Public);
        }

        loop {
            match parser.current_kind() {
                TokenKind::Public | TokenKind::Protected | TokenKind::Private => {
                    let vis = match parser.current_kind() {
                        TokenKind::Public => Visibility::Public,
                        TokenKind::Protected => Visibility::Protected,
                        _ => Visibility::Private,
                    };
                    if visibility.is_some() {
                        parser.error(ParseError::Forbidden {
                            message: "cannot use multiple visibility modifiers".to_string(),
                            span: parser.current_span(),
                        });
                    }
                    parser.advance();
                    visibility = Some(vis);
                }
                TokenKind::Static => {
                    parser.advance();
                    is_static = true;
                }
                TokenKind::Abstract => {
                    parser.advance();
                    is_abstract = true;
                }
                TokenKind::Final => {
                    parser.advance();
                    is_final = true;
                }
                _ => break,
            }
        }

        if is_abstract && is_final {
            parser.error(ParseError::Forbidden {
                message: "cannot use 'abstract' and 'final' together".to_string(),
                span: Span::new(member_start, parser.current_span().start),
            });
        }

        // Constants: `const A = 1, B = 2;`
        if parser.check(TokenKind::Const) {
            parser.advance();
            loop {
                let const_name = if let Some((text, _)) = parser.eat_identifier_or_keyword() {
                    text
                } else {
                    parser.error(ParseError::Expected {
                        expected: "constant name".to_string(),
                        found: parser.current_kind(),
                        span: parser.current_span(),
                    });
                    "<error>".to_string()
                };
                parser.expect(TokenKind::Equals);
                let value = expr::parse_expr(parser);
                members.push(ClassMember {
                    kind: ClassMemberKind::Const(ClassConstDecl {
                        name: const_name,
                        value,
                    }),
                    span: Span::new(member_start, parser.current_span().start),
                });
                if parser.eat(TokenKind::Comma).is_none() {
                    break;
                }
                if parser.check(TokenKind::Semicolon) {
                    break; // trailing comma
                }
            }
            parser.expect(TokenKind::Semicolon);
            continue;
        }

        // Methods
        if parser.check(TokenKind::Function) {
            parser.advance();
            let by_ref = parser.eat(TokenKind::Ampersand).is_some();
            let method_name = if let Some((text, _)) = parser.eat_identifier_or_keyword() {
                text
            } else {
                parser.error(ParseError::Expected {
                    expected: "method name".to_string(),
                    found: parser.current_kind(),
                    span: parser.current_span(),
                });
                "<error>".to_string()
            };

            let open = parser.expect(TokenKind::LeftParen);
            let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
            let params = parse_param_list(parser);
            parser.expect_closing(TokenKind::RightParen, open_span);

            // Abstract methods and interface signatures end in `;`
            let body = if parser.check(TokenKind::LeftBrace) {
                Some(parse_brace_body(parser))
            } else {
                parser.expect(TokenKind::Semicolon);
                None
            };

            members.push(ClassMember {
                kind: ClassMemberKind::Method(MethodDecl {
                    name: method_name,
                    visibility: visibility.unwrap_or_default(),
                    is_static,
                    is_abstract,
                    is_final,
                    by_ref,
                    params,
                    body,
                }),
                span: Span::new(member_start, parser.current_span().start),
            });
            continue;
        }

        // Properties: `$name (= default)?` with comma-separated siblings
        if parser.check(TokenKind::Variable) {
            loop {
                let token = parser.expect(TokenKind::Variable);
                let prop_name = token
                    .map(|t| {
                        let text = &parser.source()[t.span.start as usize..t.span.end as usize];
                        text[1..].to_string()
                    })
                    .unwrap_or_else(|| "<error>".to_string());

                let default = if parser.eat(TokenKind::Equals).is_some() {
                    Some(expr::parse_expr(parser))
                } else {
                    None
                };

                members.push(ClassMember {
                    kind: ClassMemberKind::Property(PropertyDecl {
                        name: prop_name,
                        visibility: visibility.unwrap_or_default(),
                        is_static,
                        default,
                    }),
                    span: Span::new(member_start, parser.current_span().start),
                });

                if parser.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            parser.expect(TokenKind::Semicolon);
            continue;
        }

        // Unknown token in class body — report and skip.
        parser.error(ParseError::Expected {
            expected: "class member".to_string(),
            found: parser.current_kind(),
            span: parser.current_span(),
        });
        parser.advance();
    }
    members
}

/// Trait adaptation block after `use T {`: precedence and alias rules.
fn parse_trait_adaptations(parser: &mut Parser) -> Vec<TraitAdaptation> {
    let mut adaptations = Vec::new();
    while !parser.check(TokenKind::RightBrace) && !parser.check(TokenKind::Eof) {
        let start = parser.start_span();

        // `method` or `TraitName::method`
        let (first, _) = parser.parse_qualified_name();

        if parser.eat(TokenKind::DoubleColon).is_some() {
            let method = if let Some((text, _)) = parser.eat_identifier_or_keyword() {
                text
            } else {
                parser.error(ParseError::Expected {
                    expected: "method name".to_string(),
                    found: parser.current_kind(),
                    span: parser.current_span(),
                });
                "<error>".to_string()
            };

            if parser.check(TokenKind::Identifier)
                && parser.current_text().eq_ignore_ascii_case("insteadof")
            {
                parser.advance();
                let mut insteadof = vec![parser.parse_qualified_name().0];
                while parser.eat(TokenKind::Comma).is_some() {
                    if parser.check(TokenKind::Semicolon) {
                        break;
                    }
                    insteadof.push(parser.parse_qualified_name().0);
                }
                parser.expect(TokenKind::Semicolon);
                adaptations.push(TraitAdaptation {
                    kind: TraitAdaptationKind::Precedence {
                        trait_name: first,
                        method,
                        insteadof,
                    },
                    span: Span::new(start, parser.current_span().start),
                });
            } else if parser.eat(TokenKind::As).is_some() {
                let (visibility, new_name) = parse_alias_rhs(parser);
                parser.expect(TokenKind::Semicolon);
                adaptations.push(TraitAdaptation {
                    kind: TraitAdaptationKind::Alias {
                        trait_name: Some(first),
                        method,
                        visibility,
                        new_name,
                    },
                    span: Span::new(start, parser.current_span().start),
                });
            } else {
                parser.error(ParseError::Expected {
                    expected: "'insteadof' or 'as'".to_string(),
                    found: parser.current_kind(),
                    span: parser.current_span(),
                });
                parser.advance();
            }
        } else if parser.eat(TokenKind::As).is_some() {
            let (visibility, new_name) = parse_alias_rhs(parser);
            parser.expect(TokenKind::Semicolon);
            adaptations.push(TraitAdaptation {
                kind: TraitAdaptationKind::Alias {
                    trait_name: None,
                    method: first,
                    visibility,
                    new_name,
                },
                span: Span::new(start, parser.current_span().start),
            });
        } else {
            parser.error(ParseError::Expected {
                expected: "'::' or 'as'".to_string(),
                found: parser.current_kind(),
                span: parser.current_span(),
            });
            parser.advance();
        }
    }
    parser.expect(TokenKind::RightBrace);
    adaptations
}

/// Right-hand side of an `as` alias: `[visibility] [newName]`
fn parse_alias_rhs(parser: &mut Parser) -> (Option<Visibility>, Option<String>) {
    let visibility = match parser.current_kind() {
        TokenKind::Public => {
            parser.advance();
            Some(Visibility::Public)
        }
        TokenKind::Protected => {
            parser.advance();
            Some(Visibility::Protected)
        }
        TokenKind::Private => {
            parser.advance();
            Some(Visibility::Private)
        }
        _ => None,
    };

    let new_name = if parser.check(TokenKind::Identifier) || parser.is_semi_reserved_keyword() {
        parser.eat_identifier_or_keyword().map(|(text, _)| text)
    } else {
        None
    };

    (visibility, new_name)
}

fn parse_interface(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance();

    let (name, name_span) = if let Some((text, span)) = parser.eat_identifier_or_keyword() {
        (text, span)
    } else {
        parser.error(ParseError::Expected {
            expected: "interface name".to_string(),
            found: parser.current_kind(),
            span: parser.current_span(),
        });
        ("<error>".to_string(), parser.current_span())
    };

    if is_reserved_class_name(&name) {
        parser.error(ParseError::Forbidden {
            message: format!("cannot use '{}' as interface name", name),
            span: name_span,
        });
    }

    let extends = if parser.eat(TokenKind::Extends).is_some() {
        parse_name_list(parser)
    } else {
        Vec::new()
    };

    let open = parser.expect(TokenKind::LeftBrace);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
    let members = parse_class_members(parser);
    let close = parser.expect_closing(TokenKind::RightBrace, open_span);
    let end = close.map(|t| t.span.end).unwrap_or(parser.current_span().start);

    Stmt {
        kind: StmtKind::Interface(InterfaceDecl {
            name,
            extends,
            members,
        }),
        span: Span::new(start, end),
    }
}

fn parse_trait(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance();

    let name = if let Some((text, _)) = parser.eat_identifier_or_keyword() {
        text
    } else {
        parser.error(ParseError::Expected {
            expected: "trait name".to_string(),
            found: parser.current_kind(),
            span: parser.current_span(),
        });
        "<error>".to_string()
    };

    let open = parser.expect(TokenKind::LeftBrace);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
    let members = parse_class_members(parser);
    let close = parser.expect_closing(TokenKind::RightBrace, open_span);
    let end = close.map(|t| t.span.end).unwrap_or(parser.current_span().start);

    Stmt {
        kind: StmtKind::Trait(TraitDecl { name, members }),
        span: Span::new(start, end),
    }
}

// =============================================================================
// Namespace / use / const
// =============================================================================

fn parse_namespace(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance(); // consume 'namespace'

    // Global form: namespace { … }
    if parser.check(TokenKind::LeftBrace) {
        let stmts = parse_brace_body(parser);
        let span = Span::new(start, parser.current_span().start);
        return Stmt {
            kind: StmtKind::Namespace(NamespaceDecl {
                name: None,
                body: Some(stmts),
            }),
            span,
        };
    }

    let (name, _) = parser.parse_qualified_name();

    let body = if parser.check(TokenKind::LeftBrace) {
        Some(parse_brace_body(parser))
    } else {
        parser.expect_semicolon("namespace declaration");
        None
    };

    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::Namespace(NamespaceDecl {
            name: Some(name),
            body,
        }),
        span,
    }
}

fn parse_use(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance(); // consume 'use'

    let kind = if parser.eat(TokenKind::Function).is_some() {
        UseKind::Function
    } else if parser.eat(TokenKind::Const).is_some() {
        UseKind::Const
    } else {
        UseKind::Normal
    };

    let mut items = Vec::new();
    loop {
        let item_start = parser.start_span();
        let (name, _) = parser.parse_qualified_name();

        let alias = if parser.eat(TokenKind::As).is_some() {
            parser.expect(TokenKind::Identifier).map(|t| {
                parser.source()[t.span.start as usize..t.span.end as usize].to_string()
            })
        } else {
            None
        };

        items.push(UseItem {
            name,
            alias,
            span: Span::new(item_start, parser.current_span().start),
        });

        if parser.eat(TokenKind::Comma).is_none() {
            break;
        }
        if parser.check(TokenKind::Semicolon) {
            break; // trailing comma
        }
    }

    parser.expect_semicolon("use declaration");
    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::Use(UseDecl { kind, items }),
        span,
    }
}

fn parse_const(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    parser.advance(); // consume 'const'

    let mut items = Vec::new();
    loop {
        let item_start = parser.start_span();
        let name = if let Some((text, _)) = parser.eat_identifier_or_keyword() {
            text
        } else {
            parser.error(ParseError::Expected {
                expected: "constant name".to_string(),
                found: parser.current_kind(),
                span: parser.current_span(),
            });
            "<error>".to_string()
        };
        parser.expect(TokenKind::Equals);
        let value = expr::parse_expr(parser);
        let item_span = Span::new(item_start, value.span.end);
        items.push(ConstItem {
            name,
            value,
            span: item_span,
        });

        if parser.eat(TokenKind::Comma).is_none() {
            break;
        }
        if parser.check(TokenKind::Semicolon) {
            break; // trailing comma
        }
    }

    parser.expect_semicolon("const declaration");
    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::Const(items),
        span,
    }
}

// =============================================================================
// Expression statements
// =============================================================================

fn parse_expression_stmt(parser: &mut Parser) -> Stmt {
    let start = parser.start_span();
    let value = expr::parse_expr(parser);

    if matches!(value.kind, ExprKind::Error) {
        parser.synchronize();
        return Stmt {
            kind: StmtKind::Error,
            span: Span::new(start, parser.current_span().start),
        };
    }

    parser.expect_semicolon("expression");
    let span = Span::new(start, parser.current_span().start);
    Stmt {
        kind: StmtKind::Expression(value),
        span,
    }
}
