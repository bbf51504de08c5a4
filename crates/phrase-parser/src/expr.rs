use phrase_ast::*;
use phrase_lexer::TokenKind;

use crate::diagnostics::ParseError;
use crate::interpolation;
use crate::parser::Parser;
use crate::precedence::{self, ASSIGNMENT_BP, MEMBER_BP, PREFIX_BP, TERNARY_BP};
use crate::stmt;

/// Cast keyword spellings and their CastKind values.
const CAST_KEYWORDS: &[(&str, CastKind)] = &[
    ("int", CastKind::Int),
    ("integer", CastKind::Int),
    ("float", CastKind::Float),
    ("double", CastKind::Float),
    ("real", CastKind::Float),
    ("string", CastKind::String),
    ("binary", CastKind::String),
    ("bool", CastKind::Bool),
    ("boolean", CastKind::Bool),
    ("object", CastKind::Object),
];

/// Parse an expression.
pub fn parse_expr(parser: &mut Parser) -> Expr {
    parse_expr_bp(parser, 0)
}

/// Pratt expression parser. Parses expressions whose operators have binding
/// power >= min_bp.
pub fn parse_expr_bp(parser: &mut Parser, min_bp: u8) -> Expr {
    let mut lhs = parse_atom(parser);

    loop {
        let kind = parser.current_kind();

        // Postfix ++ and --
        if let Some(left_bp) = precedence::postfix_binding_power(&kind) {
            if left_bp < min_bp {
                break;
            }
            let op_token = parser.advance();
            let op = match op_token.kind {
                TokenKind::PlusPlus => UnaryPostfixOp::PostIncrement,
                TokenKind::MinusMinus => UnaryPostfixOp::PostDecrement,
                _ => unreachable!(),
            };
            let span = lhs.span.merge(op_token.span);
            lhs = Expr {
                kind: ExprKind::UnaryPostfix(UnaryPostfixExpr {
                    operand: Box::new(lhs),
                    op,
                }),
                span,
            };
            continue;
        }

        // Assignment operators (right-associative)
        if kind.is_assignment_op() {
            if ASSIGNMENT_BP < min_bp {
                break;
            }
            if !lhs.kind.is_assignable() {
                parser.error(ParseError::InvalidAssignmentTarget { span: lhs.span });
            }
            let op_token = parser.advance();

            // Reference assignment: $a =& $b
            let by_ref = op_token.kind == TokenKind::Equals
                && parser.eat(TokenKind::Ampersand).is_some();

            let op = match op_token.kind {
                TokenKind::Equals => AssignOp::Assign,
                TokenKind::PlusEquals => AssignOp::Add,
                TokenKind::MinusEquals => AssignOp::Sub,
                TokenKind::StarEquals => AssignOp::Mul,
                TokenKind::SlashEquals => AssignOp::Div,
                TokenKind::PercentEquals => AssignOp::Mod,
                TokenKind::StarStarEquals => AssignOp::Pow,
                TokenKind::DotEquals => AssignOp::Concat,
                TokenKind::AmpersandEquals => AssignOp::BitAnd,
                TokenKind::PipeEquals => AssignOp::BitOr,
                TokenKind::CaretEquals => AssignOp::BitXor,
                TokenKind::ShiftLeftEquals => AssignOp::ShiftLeft,
                TokenKind::ShiftRightEquals => AssignOp::ShiftRight,
                TokenKind::CoalesceEquals => AssignOp::Coalesce,
                _ => unreachable!(),
            };
            // Right-associative: parse the RHS at the same binding power.
            let rhs = parse_expr_bp(parser, ASSIGNMENT_BP);
            let span = lhs.span.merge(rhs.span);
            lhs = Expr {
                kind: ExprKind::Assign(AssignExpr {
                    target: Box::new(lhs),
                    op,
                    by_ref,
                    value: Box::new(rhs),
                }),
                span,
            };
            continue;
        }

        // Ternary operator (right-associative)
        if kind == TokenKind::Question {
            if TERNARY_BP < min_bp {
                break;
            }
            parser.advance(); // consume ?

            // Short ternary: `$x ?: $y`
            let then_expr = if parser.check(TokenKind::Colon) {
                None
            } else {
                Some(Box::new(parse_expr_bp(parser, 0)))
            };

            parser.expect(TokenKind::Colon);
            let else_expr = parse_expr_bp(parser, TERNARY_BP);
            let span = lhs.span.merge(else_expr.span);
            lhs = Expr {
                kind: ExprKind::Ternary(TernaryExpr {
                    condition: Box::new(lhs),
                    then_expr,
                    else_expr: Box::new(else_expr),
                }),
                span,
            };
            continue;
        }

        // Member access: $obj->prop, $obj->method(), $obj->{expr}
        if kind == TokenKind::Arrow {
            if MEMBER_BP < min_bp {
                break;
            }
            parser.advance();
            let member = parse_member_name(parser);

            if parser.check(TokenKind::LeftParen) {
                let args = parse_arg_list(parser);
                let span = Span::new(lhs.span.start, parser.current_span().start);
                lhs = Expr {
                    kind: ExprKind::MethodCall(MethodCallExpr {
                        object: Box::new(lhs),
                        method: Box::new(member),
                        args,
                    }),
                    span,
                };
            } else {
                let span = Span::new(lhs.span.start, member.span.end);
                lhs = Expr {
                    kind: ExprKind::PropertyAccess(PropertyAccessExpr {
                        object: Box::new(lhs),
                        property: Box::new(member),
                    }),
                    span,
                };
            }
            continue;
        }

        // Scope resolution: Class::$prop, Class::method(), Class::CONST
        if kind == TokenKind::DoubleColon {
            if MEMBER_BP < min_bp {
                break;
            }
            parser.advance();

            if parser.check(TokenKind::Variable) {
                let token = parser.advance();
                let text = &parser.source()[token.span.start as usize..token.span.end as usize];
                let member = text[1..].to_string();
                let span = Span::new(lhs.span.start, token.span.end);
                lhs = Expr {
                    kind: ExprKind::StaticPropertyAccess(StaticAccessExpr {
                        class: Box::new(lhs),
                        member,
                    }),
                    span,
                };
            } else if parser.check(TokenKind::Class) {
                // Class name resolution: Foo::class
                let token = parser.advance();
                let span = Span::new(lhs.span.start, token.span.end);
                lhs = Expr {
                    kind: ExprKind::ClassConstAccess(StaticAccessExpr {
                        class: Box::new(lhs),
                        member: "class".to_string(),
                    }),
                    span,
                };
            } else if let Some((member, _)) = parser.eat_identifier_or_keyword() {
                if parser.check(TokenKind::LeftParen) {
                    let args = parse_arg_list(parser);
                    let span = Span::new(lhs.span.start, parser.current_span().start);
                    lhs = Expr {
                        kind: ExprKind::StaticMethodCall(StaticMethodCallExpr {
                            class: Box::new(lhs),
                            method: member,
                            args,
                        }),
                        span,
                    };
                } else {
                    let span = Span::new(lhs.span.start, parser.current_span().start);
                    lhs = Expr {
                        kind: ExprKind::ClassConstAccess(StaticAccessExpr {
                            class: Box::new(lhs),
                            member,
                        }),
                        span,
                    };
                }
            } else {
                let span = parser.current_span();
                parser.error(ParseError::Expected {
                    expected: "member name".to_string(),
                    found: parser.current_kind(),
                    span,
                });
                lhs = Expr {
                    kind: ExprKind::Error,
                    span: lhs.span.merge(span),
                };
            }
            continue;
        }

        // Array lookup `$a[i]` and append `$a[]`
        if kind == TokenKind::LeftBracket {
            if MEMBER_BP < min_bp {
                break;
            }
            let open = parser.advance();
            if parser.check(TokenKind::RightBracket) {
                let close = parser.advance();
                let span = Span::new(lhs.span.start, close.span.end);
                lhs = Expr {
                    kind: ExprKind::ArrayAppend(Box::new(lhs)),
                    span,
                };
            } else {
                let index = parse_expr(parser);
                parser.expect_closing(TokenKind::RightBracket, open.span);
                let span = Span::new(lhs.span.start, parser.current_span().start);
                lhs = Expr {
                    kind: ExprKind::ArrayAccess(ArrayAccessExpr {
                        array: Box::new(lhs),
                        index: Box::new(index),
                    }),
                    span,
                };
            }
            continue;
        }

        // Call: callee(args)
        if kind == TokenKind::LeftParen {
            if MEMBER_BP < min_bp {
                break;
            }
            let args = parse_arg_list(parser);
            let span = Span::new(lhs.span.start, parser.current_span().start);
            lhs = Expr {
                kind: ExprKind::FunctionCall(FunctionCallExpr {
                    callee: Box::new(lhs),
                    args,
                }),
                span,
            };
            continue;
        }

        // Null coalescing (produces its own node, not Binary)
        if kind == TokenKind::QuestionQuestion {
            let (left_bp, right_bp) = precedence::infix_binding_power(&kind).unwrap();
            if left_bp < min_bp {
                break;
            }
            parser.advance();
            let rhs = parse_expr_bp(parser, right_bp);
            let span = lhs.span.merge(rhs.span);
            lhs = Expr {
                kind: ExprKind::NullCoalesce(NullCoalesceExpr {
                    left: Box::new(lhs),
                    right: Box::new(rhs),
                }),
                span,
            };
            continue;
        }

        // Infix binary operators
        if let Some((left_bp, right_bp)) = precedence::infix_binding_power(&kind) {
            if left_bp < min_bp {
                break;
            }
            let op_token = parser.advance();
            let op = token_to_binary_op(op_token.kind);
            let rhs = parse_expr_bp(parser, right_bp);
            let span = lhs.span.merge(rhs.span);
            lhs = Expr {
                kind: ExprKind::Binary(BinaryExpr {
                    left: Box::new(lhs),
                    op,
                    right: Box::new(rhs),
                }),
                span,
            };
            continue;
        }

        break;
    }

    lhs
}

/// Parse a member name after `->`. Accepts identifiers, semi-reserved
/// keywords, `$var` (dynamic), and `{expr}` (dynamic).
fn parse_member_name(parser: &mut Parser) -> Expr {
    if parser.check(TokenKind::Variable) {
        let token = parser.advance();
        let text = &parser.source()[token.span.start as usize..token.span.end as usize];
        return Expr {
            kind: ExprKind::Variable(text[1..].to_string()),
            span: token.span,
        };
    }
    if parser.check(TokenKind::LeftBrace) {
        parser.advance();
        let inner = parse_expr(parser);
        parser.expect(TokenKind::RightBrace);
        return inner;
    }
    if let Some((text, span)) = parser.eat_identifier_or_keyword() {
        return Expr {
            kind: ExprKind::Identifier(text),
            span,
        };
    }
    let span = parser.current_span();
    parser.error(ParseError::Expected {
        expected: "member name".to_string(),
        found: parser.current_kind(),
        span,
    });
    Expr {
        kind: ExprKind::Error,
        span,
    }
}

/// Parse an atomic expression (prefix unaries, literals, variables, …).
fn parse_atom(parser: &mut Parser) -> Expr {
    let kind = parser.current_kind();

    // @ error suppression
    if kind == TokenKind::At {
        let token = parser.advance();
        let operand = parse_expr_bp(parser, PREFIX_BP);
        let span = token.span.merge(operand.span);
        return Expr {
            kind: ExprKind::ErrorSuppress(Box::new(operand)),
            span,
        };
    }

    // Prefix unary operators
    if let Some(right_bp) = precedence::prefix_binding_power(&kind) {
        let op_token = parser.advance();
        let operand = parse_expr_bp(parser, right_bp);
        let op = match op_token.kind {
            TokenKind::Minus => UnaryPrefixOp::Negate,
            TokenKind::Plus => UnaryPrefixOp::Plus,
            TokenKind::Bang => UnaryPrefixOp::BooleanNot,
            TokenKind::Tilde => UnaryPrefixOp::BitwiseNot,
            TokenKind::PlusPlus => UnaryPrefixOp::PreIncrement,
            TokenKind::MinusMinus => UnaryPrefixOp::PreDecrement,
            _ => unreachable!(),
        };
        let span = op_token.span.merge(operand.span);
        return Expr {
            kind: ExprKind::UnaryPrefix(UnaryPrefixExpr {
                op,
                operand: Box::new(operand),
            }),
            span,
        };
    }

    match kind {
        // Integer literals; decimal overflow falls back to float
        TokenKind::IntLiteral => {
            let token = parser.advance();
            let text = &parser.source()[token.span.start as usize..token.span.end as usize];
            match text.parse::<i64>() {
                Ok(value) => Expr {
                    kind: ExprKind::Int(value),
                    span: token.span,
                },
                Err(_) => Expr {
                    kind: ExprKind::Float(text.parse::<f64>().unwrap_or(0.0)),
                    span: token.span,
                },
            }
        }
        TokenKind::HexIntLiteral => {
            let token = parser.advance();
            let text = &parser.source()[token.span.start as usize..token.span.end as usize];
            radix_int_expr(&text[2..], 16, token.span)
        }
        TokenKind::BinIntLiteral => {
            let token = parser.advance();
            let text = &parser.source()[token.span.start as usize..token.span.end as usize];
            radix_int_expr(&text[2..], 2, token.span)
        }
        TokenKind::OctIntLiteral => {
            let token = parser.advance();
            let text = &parser.source()[token.span.start as usize..token.span.end as usize];
            radix_int_expr(&text[1..], 8, token.span)
        }

        // Float literals
        TokenKind::FloatLiteral
        | TokenKind::FloatLiteralSimple
        | TokenKind::FloatLiteralLeadingDot => {
            let token = parser.advance();
            let text = &parser.source()[token.span.start as usize..token.span.end as usize];
            Expr {
                kind: ExprKind::Float(text.parse::<f64>().unwrap_or(0.0)),
                span: token.span,
            }
        }

        // Single-quoted string: no interpolation, only \\ and \' escapes
        TokenKind::SingleQuotedString => {
            let token = parser.advance();
            let text = &parser.source()[token.span.start as usize..token.span.end as usize];
            let inner = &text[1..text.len() - 1];
            Expr {
                kind: ExprKind::String(unescape_single_quoted(inner)),
                span: token.span,
            }
        }

        // Double-quoted string: escapes plus interpolation, folded into a
        // concatenation chain at parse time
        TokenKind::DoubleQuotedString => {
            let token = parser.advance();
            let text = &parser.source()[token.span.start as usize..token.span.end as usize];
            let inner = &text[1..text.len() - 1];
            let inner_offset = token.span.start + 1;
            interpolation::parse_interpolated(inner, inner_offset, token.span)
        }

        // Backtick shell command, raw text
        TokenKind::BacktickString => {
            let token = parser.advance();
            let text = &parser.source()[token.span.start as usize..token.span.end as usize];
            let inner = &text[1..text.len() - 1];
            Expr {
                kind: ExprKind::ShellCommand(inner.to_string()),
                span: token.span,
            }
        }

        // Heredoc interpolates like a double-quoted string; nowdoc is raw
        TokenKind::Heredoc => {
            let token = parser.advance();
            let text = &parser.source()[token.span.start as usize..token.span.end as usize];
            let (body, body_offset) = heredoc_body(text);
            interpolation::parse_interpolated(&body, token.span.start + body_offset, token.span)
        }
        TokenKind::Nowdoc => {
            let token = parser.advance();
            let text = &parser.source()[token.span.start as usize..token.span.end as usize];
            let (body, _) = heredoc_body(text);
            Expr {
                kind: ExprKind::String(body),
                span: token.span,
            }
        }

        // Boolean and null literals
        TokenKind::True => {
            let token = parser.advance();
            Expr {
                kind: ExprKind::Bool(true),
                span: token.span,
            }
        }
        TokenKind::False => {
            let token = parser.advance();
            Expr {
                kind: ExprKind::Bool(false),
                span: token.span,
            }
        }
        TokenKind::Null => {
            let token = parser.advance();
            Expr {
                kind: ExprKind::Null,
                span: token.span,
            }
        }

        // Variables
        TokenKind::Variable => {
            let token = parser.advance();
            let text = &parser.source()[token.span.start as usize..token.span.end as usize];
            Expr {
                kind: ExprKind::Variable(text[1..].to_string()),
                span: token.span,
            }
        }

        // Dynamic variables: $$var, $$$var, ${expr}
        TokenKind::Dollar => {
            let token = parser.advance();
            let inner = if parser.check(TokenKind::LeftBrace) {
                parser.advance();
                let inner = parse_expr(parser);
                parser.expect(TokenKind::RightBrace);
                inner
            } else {
                parse_atom(parser)
            };
            let span = Span::new(token.span.start, inner.span.end);
            Expr {
                kind: ExprKind::VariableVariable(Box::new(inner)),
                span,
            }
        }

        // Bare identifiers: constant references and callee names, possibly
        // qualified (Foo\Bar\baz)
        TokenKind::Identifier => {
            let token = parser.advance();
            let text = &parser.source()[token.span.start as usize..token.span.end as usize];
            if parser.check(TokenKind::Backslash) {
                let mut name = text.to_string();
                while parser.eat(TokenKind::Backslash).is_some() {
                    name.push('\\');
                    if let Some((part, _)) = parser.eat_identifier_or_keyword() {
                        name.push_str(&part);
                    }
                }
                let span = Span::new(token.span.start, parser.current_span().start);
                Expr {
                    kind: ExprKind::Identifier(name),
                    span,
                }
            } else {
                Expr {
                    kind: ExprKind::Identifier(text.to_string()),
                    span: token.span,
                }
            }
        }

        // Fully qualified name: \Foo\Bar
        TokenKind::Backslash => {
            let (name, span) = parser.parse_qualified_name();
            Expr {
                kind: ExprKind::Identifier(name),
                span,
            }
        }

        // Relative name: namespace\Foo
        TokenKind::Namespace => {
            let token = parser.advance();
            let mut name = String::from("namespace");
            while parser.eat(TokenKind::Backslash).is_some() {
                name.push('\\');
                if let Some((part, _)) = parser.eat_identifier_or_keyword() {
                    name.push_str(&part);
                }
            }
            let span = Span::new(token.span.start, parser.current_span().start);
            Expr {
                kind: ExprKind::Identifier(name),
                span,
            }
        }

        // self, parent, static as class references (self::method(), …)
        TokenKind::Self_ => {
            let token = parser.advance();
            Expr {
                kind: ExprKind::Identifier("self".to_string()),
                span: token.span,
            }
        }
        TokenKind::Parent_ => {
            let token = parser.advance();
            Expr {
                kind: ExprKind::Identifier("parent".to_string()),
                span: token.span,
            }
        }
        TokenKind::Static => {
            let token = parser.advance();
            Expr {
                kind: ExprKind::Identifier("static".to_string()),
                span: token.span,
            }
        }

        // print expr
        TokenKind::Print => {
            let token = parser.advance();
            let value = parse_expr_bp(parser, ASSIGNMENT_BP);
            let span = token.span.merge(value.span);
            Expr {
                kind: ExprKind::Print(Box::new(value)),
                span,
            }
        }

        TokenKind::New => parse_new_expr(parser),

        // Anonymous function in expression position
        TokenKind::Function => parse_closure(parser),

        // clone expr
        TokenKind::Clone => {
            let token = parser.advance();
            let operand = parse_expr_bp(parser, PREFIX_BP);
            let span = token.span.merge(operand.span);
            Expr {
                kind: ExprKind::Clone(Box::new(operand)),
                span,
            }
        }

        // Parenthesized expression or cast
        TokenKind::LeftParen => {
            if let Some(cast) = try_parse_cast(parser) {
                return cast;
            }
            let start = parser.start_span();
            let open = parser.advance();
            let inner = parse_expr(parser);
            parser.expect_closing(TokenKind::RightParen, open.span);
            let span = Span::new(start, parser.current_span().start);
            Expr {
                kind: ExprKind::Parenthesized(Box::new(inner)),
                span,
            }
        }

        // Array literals
        TokenKind::LeftBracket => parse_array_literal(parser),
        TokenKind::Array => parse_array_call(parser),

        // list() destructuring target
        TokenKind::List => parse_list_expr(parser),

        // include / include_once / require / require_once
        TokenKind::Include
        | TokenKind::IncludeOnce
        | TokenKind::Require
        | TokenKind::RequireOnce => {
            let token = parser.advance();
            let include_kind = match token.kind {
                TokenKind::Include => IncludeKind::Include,
                TokenKind::IncludeOnce => IncludeKind::IncludeOnce,
                TokenKind::Require => IncludeKind::Require,
                _ => IncludeKind::RequireOnce,
            };
            let inner = parse_expr_bp(parser, ASSIGNMENT_BP);
            let span = token.span.merge(inner.span);
            Expr {
                kind: ExprKind::Include(include_kind, Box::new(inner)),
                span,
            }
        }

        // exit / die, with optional status expression
        TokenKind::Exit | TokenKind::Die => {
            let token = parser.advance();
            if parser.check(TokenKind::LeftParen) {
                let open = parser.advance();
                let value = if parser.check(TokenKind::RightParen) {
                    None
                } else {
                    Some(Box::new(parse_expr(parser)))
                };
                parser.expect_closing(TokenKind::RightParen, open.span);
                let span = Span::new(token.span.start, parser.current_span().start);
                Expr {
                    kind: ExprKind::Exit(value),
                    span,
                }
            } else {
                Expr {
                    kind: ExprKind::Exit(None),
                    span: token.span,
                }
            }
        }

        _ => {
            let span = parser.current_span();
            parser.error(ParseError::ExpectedExpression { span });
            Expr {
                kind: ExprKind::Error,
                span,
            }
        }
    }
}

// =============================================================================
// New expression
// =============================================================================

fn parse_new_expr(parser: &mut Parser) -> Expr {
    let start = parser.start_span();
    parser.advance(); // consume 'new'

    // Anonymous class: new class(args) extends B implements I { … }
    if parser.check(TokenKind::Class) {
        parser.advance();

        let args = if parser.check(TokenKind::LeftParen) {
            parse_arg_list(parser)
        } else {
            Vec::new()
        };

        let extends = parser
            .eat(TokenKind::Extends)
            .map(|_| parser.parse_qualified_name().0);

        let implements = if parser.eat(TokenKind::Implements).is_some() {
            stmt::parse_name_list(parser)
        } else {
            Vec::new()
        };

        let open = parser.expect(TokenKind::LeftBrace);
        let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
        let members = stmt::parse_class_members(parser);
        let close = parser.expect_closing(TokenKind::RightBrace, open_span);
        let end = close.map(|t| t.span.end).unwrap_or(parser.current_span().start);
        let span = Span::new(start, end);

        let class = Expr {
            kind: ExprKind::AnonymousClass(ClassDecl {
                name: None,
                is_abstract: false,
                is_final: false,
                extends,
                implements,
                members,
            }),
            span,
        };
        return Expr {
            kind: ExprKind::New(NewExpr {
                class: Box::new(class),
                args,
            }),
            span,
        };
    }

    // The class may be a name, self/parent/static, or a variable.
    let class = match parser.current_kind() {
        TokenKind::Self_ => {
            let t = parser.advance();
            Expr {
                kind: ExprKind::Identifier("self".to_string()),
                span: t.span,
            }
        }
        TokenKind::Parent_ => {
            let t = parser.advance();
            Expr {
                kind: ExprKind::Identifier("parent".to_string()),
                span: t.span,
            }
        }
        TokenKind::Static => {
            let t = parser.advance();
            Expr {
                kind: ExprKind::Identifier("static".to_string()),
                span: t.span,
            }
        }
        TokenKind::Variable => {
            let t = parser.advance();
            let text = &parser.source()[t.span.start as usize..t.span.end as usize];
            Expr {
                kind: ExprKind::Variable(text[1..].to_string()),
                span: t.span,
            }
        }
        _ => {
            let (name, span) = parser.parse_qualified_name();
            Expr {
                kind: ExprKind::Identifier(name),
                span,
            }
        }
    };

    let args = if parser.check(TokenKind::LeftParen) {
        parse_arg_list(parser)
    } else {
        Vec::new()
    };

    let span = Span::new(start, parser.current_span().start);
    Expr {
        kind: ExprKind::New(NewExpr {
            class: Box::new(class),
            args,
        }),
        span,
    }
}

// =============================================================================
// Closure expression: function($x) use (&$y) { … }
// =============================================================================

fn parse_closure(parser: &mut Parser) -> Expr {
    let start = parser.start_span();
    parser.advance(); // consume 'function'

    let by_ref = parser.eat(TokenKind::Ampersand).is_some();

    let open = parser.expect(TokenKind::LeftParen);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
    let params = stmt::parse_param_list(parser);
    parser.expect_closing(TokenKind::RightParen, open_span);

    let uses = if parser.eat(TokenKind::Use).is_some() {
        parser.expect(TokenKind::LeftParen);
        let vars = parse_closure_use_list(parser);
        parser.expect(TokenKind::RightParen);
        vars
    } else {
        Vec::new()
    };

    let open_brace = parser.expect(TokenKind::LeftBrace);
    let brace_span = open_brace.map(|t| t.span).unwrap_or(parser.current_span());
    let mut body = Vec::new();
    while !parser.check(TokenKind::RightBrace) && !parser.check(TokenKind::Eof) {
        let span_before = parser.current_span();
        body.push(stmt::parse_stmt(parser));
        if parser.current_span() == span_before {
            parser.advance();
        }
    }
    let close = parser.expect_closing(TokenKind::RightBrace, brace_span);
    let end = close.map(|t| t.span.end).unwrap_or(parser.current_span().start);

    Expr {
        kind: ExprKind::Closure(ClosureExpr {
            by_ref,
            params,
            uses,
            body,
        }),
        span: Span::new(start, end),
    }
}

fn parse_closure_use_list(parser: &mut Parser) -> Vec<ClosureUse> {
    let mut vars = Vec::new();
    loop {
        if parser.check(TokenKind::RightParen) {
            break;
        }
        let var_start = parser.start_span();
        let by_ref = parser.eat(TokenKind::Ampersand).is_some();
        if let Some(token) = parser.eat(TokenKind::Variable) {
            let text = &parser.source()[token.span.start as usize..token.span.end as usize];
            vars.push(ClosureUse {
                name: text[1..].to_string(),
                by_ref,
                span: Span::new(var_start, token.span.end),
            });
        } else {
            parser.error(ParseError::Expected {
                expected: "variable".to_string(),
                found: parser.current_kind(),
                span: parser.current_span(),
            });
            break;
        }
        if parser.eat(TokenKind::Comma).is_none() {
            break;
        }
    }
    vars
}

// =============================================================================
// Argument lists
// =============================================================================

/// Parse an argument list `(expr, expr, …)`. The opening paren must be the
/// current token.
pub fn parse_arg_list(parser: &mut Parser) -> Vec<Expr> {
    let open = parser.advance(); // consume (
    let mut args = Vec::new();
    if !parser.check(TokenKind::RightParen) {
        loop {
            if parser.check(TokenKind::RightParen) {
                break; // trailing comma
            }
            // Call-time pass-by-reference is accepted and dropped.
            parser.eat(TokenKind::Ampersand);
            args.push(parse_expr(parser));
            if parser.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
    }
    parser.expect_closing(TokenKind::RightParen, open.span);
    args
}

// =============================================================================
// Array and list constructors
// =============================================================================

fn parse_array_literal(parser: &mut Parser) -> Expr {
    let start = parser.start_span();
    let open = parser.advance(); // consume [
    let elements = parse_array_elements(parser, TokenKind::RightBracket);
    let close = parser.expect_closing(TokenKind::RightBracket, open.span);
    let end = close.map(|t| t.span.end).unwrap_or(parser.current_span().start);
    Expr {
        kind: ExprKind::Array(elements),
        span: Span::new(start, end),
    }
}

fn parse_array_call(parser: &mut Parser) -> Expr {
    let start = parser.start_span();
    parser.advance(); // consume 'array'
    let open = parser.expect(TokenKind::LeftParen);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
    let elements = parse_array_elements(parser, TokenKind::RightParen);
    let close = parser.expect_closing(TokenKind::RightParen, open_span);
    let end = close.map(|t| t.span.end).unwrap_or(parser.current_span().start);
    Expr {
        kind: ExprKind::Array(elements),
        span: Span::new(start, end),
    }
}

fn parse_list_expr(parser: &mut Parser) -> Expr {
    let start = parser.start_span();
    parser.advance(); // consume 'list'
    let open = parser.expect(TokenKind::LeftParen);
    let open_span = open.map(|t| t.span).unwrap_or(parser.current_span());
    let elements = parse_array_elements(parser, TokenKind::RightParen);
    let close = parser.expect_closing(TokenKind::RightParen, open_span);
    let end = close.map(|t| t.span.end).unwrap_or(parser.current_span().start);
    Expr {
        kind: ExprKind::List(elements),
        span: Span::new(start, end),
    }
}

fn parse_array_elements(parser: &mut Parser, stop: TokenKind) -> Vec<ArrayElement> {
    let mut elements = Vec::new();
    if parser.check(stop) {
        return elements;
    }
    loop {
        if parser.check(stop) {
            break; // trailing comma
        }
        // Skipped position in list destructuring: list(, $b)
        if parser.check(TokenKind::Comma) {
            let span = parser.current_span();
            elements.push(ArrayElement {
                key: None,
                value: Expr {
                    kind: ExprKind::Null,
                    span,
                },
                by_ref: false,
                span,
            });
        } else {
            elements.push(parse_array_element(parser));
        }
        if parser.eat(TokenKind::Comma).is_none() {
            break;
        }
    }
    elements
}

fn parse_array_element(parser: &mut Parser) -> ArrayElement {
    let start = parser.start_span();

    let mut by_ref = parser.eat(TokenKind::Ampersand).is_some();
    let first = parse_expr(parser);

    if !by_ref && parser.eat(TokenKind::FatArrow).is_some() {
        by_ref = parser.eat(TokenKind::Ampersand).is_some();
        let value = parse_expr(parser);
        let span = Span::new(start, value.span.end);
        ArrayElement {
            key: Some(first),
            value,
            by_ref,
            span,
        }
    } else {
        let span = Span::new(start, first.span.end);
        ArrayElement {
            key: None,
            value: first,
            by_ref,
            span,
        }
    }
}

// =============================================================================
// Casts
// =============================================================================

/// Parse `(int)$x` and friends. Only commits once `( word )` is confirmed
/// by lookahead, so plain parenthesized expressions are unaffected.
fn try_parse_cast(parser: &mut Parser) -> Option<Expr> {
    let cast_kind = match parser.peek_kind() {
        TokenKind::Identifier => {
            let lower = parser.peek_text().to_ascii_lowercase();
            CAST_KEYWORDS
                .iter()
                .find(|(kw, _)| *kw == lower)
                .map(|(_, ck)| *ck)
        }
        TokenKind::Array => Some(CastKind::Array),
        _ => None,
    }?;

    if parser.peek2_kind() != TokenKind::RightParen {
        return None;
    }

    let start = parser.start_span();
    parser.advance(); // (
    parser.advance(); // cast keyword
    parser.advance(); // )
    let operand = parse_expr_bp(parser, PREFIX_BP);
    let span = Span::new(start, operand.span.end);
    Some(Expr {
        kind: ExprKind::Cast(cast_kind, Box::new(operand)),
        span,
    })
}

// =============================================================================
// Helpers
// =============================================================================

fn token_to_binary_op(kind: TokenKind) -> BinaryOp {
    match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        TokenKind::StarStar => BinaryOp::Pow,
        TokenKind::Dot => BinaryOp::Concat,
        TokenKind::EqualsEquals => BinaryOp::Equal,
        TokenKind::BangEquals => BinaryOp::NotEqual,
        TokenKind::EqualsEqualsEquals => BinaryOp::Identical,
        TokenKind::BangEqualsEquals => BinaryOp::NotIdentical,
        TokenKind::LessThan => BinaryOp::Less,
        TokenKind::GreaterThan => BinaryOp::Greater,
        TokenKind::LessThanEquals => BinaryOp::LessOrEqual,
        TokenKind::GreaterThanEquals => BinaryOp::GreaterOrEqual,
        TokenKind::Spaceship => BinaryOp::Spaceship,
        TokenKind::AmpersandAmpersand => BinaryOp::BooleanAnd,
        TokenKind::PipePipe => BinaryOp::BooleanOr,
        TokenKind::Ampersand => BinaryOp::BitwiseAnd,
        TokenKind::Pipe => BinaryOp::BitwiseOr,
        TokenKind::Caret => BinaryOp::BitwiseXor,
        TokenKind::ShiftLeft => BinaryOp::ShiftLeft,
        TokenKind::ShiftRight => BinaryOp::ShiftRight,
        TokenKind::And => BinaryOp::LogicalAnd,
        TokenKind::Or => BinaryOp::LogicalOr,
        TokenKind::Xor => BinaryOp::LogicalXor,
        TokenKind::Instanceof => BinaryOp::Instanceof,
        _ => unreachable!("not a binary operator: {:?}", kind),
    }
}

/// Parse an integer literal in the given radix; values that do not fit an
/// i64 fall back to a float.
fn radix_int_expr(digits: &str, radix: u32, span: Span) -> Expr {
    match i64::from_str_radix(digits, radix) {
        Ok(value) => Expr {
            kind: ExprKind::Int(value),
            span,
        },
        Err(_) => {
            let mut value = 0.0f64;
            for c in digits.chars() {
                value = value * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64;
            }
            Expr {
                kind: ExprKind::Float(value),
                span,
            }
        }
    }
}

fn unescape_single_quoted(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('\'') => out.push('\''),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Extract the body of a heredoc/nowdoc token and its byte offset within
/// the token text. The terminator's indentation is stripped from every
/// body line.
fn heredoc_body(text: &str) -> (String, u32) {
    let nl = match text.find('\n') {
        Some(p) => p,
        None => return (String::new(), 0),
    };
    let body_start = nl + 1;

    // The token ends right after the label on the terminator line.
    let term_line_start = text.rfind('\n').map(|p| p + 1).unwrap_or(body_start);
    if term_line_start <= body_start {
        return (String::new(), body_start as u32);
    }

    let mut body = &text[body_start..term_line_start - 1];
    if let Some(stripped) = body.strip_suffix('\r') {
        body = stripped;
    }

    let term_line = &text[term_line_start..];
    let indent_len = term_line.len() - term_line.trim_start_matches([' ', '\t']).len();
    let indent = &term_line[..indent_len];

    let body = if indent.is_empty() {
        body.to_string()
    } else {
        body.lines()
            .map(|line| line.strip_prefix(indent).unwrap_or(line))
            .collect::<Vec<_>>()
            .join("\n")
    };

    (body, body_start as u32)
}
