//! Parse-time resolution of string interpolation.
//!
//! Double-quoted strings and heredoc bodies are scanned for `$var`,
//! `$var->prop`, `$var[idx]`, `{$expr}`, and `${expr}` embeddings and folded
//! into a left-associated `.` concatenation chain of literal and expression
//! nodes, so downstream consumers never re-lex string contents.

use phrase_ast::*;

use crate::parser::Parser;

enum Segment {
    Literal(String),
    Expr(Expr),
}

/// Resolve the body of a double-quoted string or heredoc into a single
/// expression: a plain literal when nothing interpolates, otherwise a
/// concatenation chain.
pub(crate) fn parse_interpolated(inner: &str, base_offset: u32, span: Span) -> Expr {
    fold(scan(inner, base_offset), span)
}

fn fold(segments: Vec<Segment>, span: Span) -> Expr {
    let mut exprs = segments.into_iter().map(|segment| match segment {
        Segment::Literal(s) => Expr {
            kind: ExprKind::String(s),
            span,
        },
        Segment::Expr(e) => e,
    });
    let first = match exprs.next() {
        Some(e) => e,
        None => {
            return Expr {
                kind: ExprKind::String(String::new()),
                span,
            }
        }
    };
    exprs.fold(first, |acc, e| Expr {
        kind: ExprKind::Binary(BinaryExpr {
            left: Box::new(acc),
            op: BinaryOp::Concat,
            right: Box::new(e),
        }),
        span,
    })
}

fn scan(inner: &str, base_offset: u32) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let bytes = inner.as_bytes();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            b'\\' => {
                if i + 1 < len {
                    i += decode_escape(inner, i, &mut literal);
                } else {
                    literal.push('\\');
                    i += 1;
                }
            }
            b'$' if i + 1 < len && bytes[i + 1] == b'{' => {
                // ${name} or ${expr}: the braces hold an expression naming
                // the variable.
                flush(&mut literal, &mut segments);
                let open = i + 1;
                let end = find_closing_brace(bytes, open);
                let content = &inner[open + 1..end];
                let var_span = Span::new(
                    base_offset + i as u32,
                    base_offset + (end + 1).min(len) as u32,
                );
                let name = parse_embedded(content, base_offset + (open + 1) as u32);
                let expr = match name.kind {
                    ExprKind::Identifier(text) => Expr {
                        kind: ExprKind::Variable(text),
                        span: var_span,
                    },
                    _ => Expr {
                        kind: ExprKind::VariableVariable(Box::new(name)),
                        span: var_span,
                    },
                };
                segments.push(Segment::Expr(expr));
                i = (end + 1).min(len);
            }
            b'$' if i + 1 < len && is_var_start(bytes[i + 1]) => {
                flush(&mut literal, &mut segments);

                let var_start = i;
                i += 1;
                let name_start = i;
                while i < len && is_var_char(bytes[i]) {
                    i += 1;
                }
                let var_offset = base_offset + var_start as u32;
                let mut expr = Expr {
                    kind: ExprKind::Variable(inner[name_start..i].to_string()),
                    span: Span::new(var_offset, base_offset + i as u32),
                };

                // Simple property access: $var->prop
                if i + 2 < len && bytes[i] == b'-' && bytes[i + 1] == b'>' && is_var_start(bytes[i + 2]) {
                    i += 2;
                    let prop_start = i;
                    while i < len && is_var_char(bytes[i]) {
                        i += 1;
                    }
                    let prop_span = Span::new(
                        base_offset + prop_start as u32,
                        base_offset + i as u32,
                    );
                    expr = Expr {
                        span: Span::new(var_offset, base_offset + i as u32),
                        kind: ExprKind::PropertyAccess(PropertyAccessExpr {
                            object: Box::new(expr),
                            property: Box::new(Expr {
                                kind: ExprKind::Identifier(inner[prop_start..i].to_string()),
                                span: prop_span,
                            }),
                        }),
                    };
                }
                // Simple array lookup: $var[idx]
                else if i < len && bytes[i] == b'[' {
                    i += 1;
                    let idx_start = i;
                    while i < len && bytes[i] != b']' {
                        i += 1;
                    }
                    if i < len {
                        let idx_str = &inner[idx_start..i];
                        i += 1; // skip ]
                        let idx_span = Span::new(
                            base_offset + idx_start as u32,
                            base_offset + (i - 1) as u32,
                        );
                        let index = if let Ok(num) = idx_str.parse::<i64>() {
                            Expr {
                                kind: ExprKind::Int(num),
                                span: idx_span,
                            }
                        } else if let Some(name) = idx_str.strip_prefix('$') {
                            Expr {
                                kind: ExprKind::Variable(name.to_string()),
                                span: idx_span,
                            }
                        } else {
                            // Bare keys are string literals inside strings
                            Expr {
                                kind: ExprKind::String(idx_str.to_string()),
                                span: idx_span,
                            }
                        };
                        expr = Expr {
                            span: Span::new(var_offset, base_offset + i as u32),
                            kind: ExprKind::ArrayAccess(ArrayAccessExpr {
                                array: Box::new(expr),
                                index: Box::new(index),
                            }),
                        };
                    }
                }

                segments.push(Segment::Expr(expr));
            }
            b'{' if i + 1 < len && bytes[i + 1] == b'$' => {
                // Complex syntax: {$expr} — the braces hold a full expression.
                flush(&mut literal, &mut segments);
                let end = find_closing_brace(bytes, i);
                let content = &inner[i + 1..end];
                let expr = parse_embedded(content, base_offset + (i + 1) as u32);
                segments.push(Segment::Expr(expr));
                i = (end + 1).min(len);
            }
            _ => {
                let c = inner[i..].chars().next().unwrap_or('\u{fffd}');
                literal.push(c);
                i += c.len_utf8();
            }
        }
    }

    flush(&mut literal, &mut segments);
    segments
}

fn flush(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(std::mem::take(literal)));
    }
}

/// Decode one escape sequence starting at the backslash; appends to `out`
/// and returns how many bytes were consumed.
fn decode_escape(inner: &str, at: usize, out: &mut String) -> usize {
    let bytes = inner.as_bytes();
    let next = bytes[at + 1];
    match next {
        b'$' => {
            out.push('$');
            2
        }
        b'\\' => {
            out.push('\\');
            2
        }
        b'n' => {
            out.push('\n');
            2
        }
        b'r' => {
            out.push('\r');
            2
        }
        b't' => {
            out.push('\t');
            2
        }
        b'v' => {
            out.push('\x0b');
            2
        }
        b'e' => {
            out.push('\x1b');
            2
        }
        b'f' => {
            out.push('\x0c');
            2
        }
        b'"' => {
            out.push('"');
            2
        }
        b'x' | b'X' => {
            let start = at + 2;
            let mut end = start;
            while end < bytes.len() && end - start < 2 && bytes[end].is_ascii_hexdigit() {
                end += 1;
            }
            if end > start {
                if let Ok(val) = u8::from_str_radix(&inner[start..end], 16) {
                    out.push(val as char);
                }
                end - at
            } else {
                out.push('\\');
                out.push(next as char);
                2
            }
        }
        b'0'..=b'7' => {
            let start = at + 1;
            let mut end = start;
            while end < bytes.len() && end - start < 3 && (b'0'..=b'7').contains(&bytes[end]) {
                end += 1;
            }
            if let Ok(val) = u8::from_str_radix(&inner[start..end], 8) {
                out.push(val as char);
            }
            end - at
        }
        _ => {
            // Unknown escapes keep the backslash
            out.push('\\');
            out.push(next as char);
            2
        }
    }
}

/// Find the `}` matching the `{` at `open`, skipping nested braces and
/// quoted strings. Returns the input length when unbalanced.
fn find_closing_brace(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
            quote @ (b'\'' | b'"') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Sub-parse an embedded expression with a scripting-mode parser. Inner
/// spans stay fragment-relative; the top-level span is rebased onto the
/// enclosing string.
fn parse_embedded(content: &str, offset: u32) -> Expr {
    let mut parser = Parser::fragment(content);
    let mut expr = crate::expr::parse_expr(&mut parser);
    expr.span = Span::new(offset, offset + content.len() as u32);
    expr
}

fn is_var_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_var_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpolate(inner: &str) -> Expr {
        parse_interpolated(inner, 0, Span::DUMMY)
    }

    #[test]
    fn test_plain_literal() {
        let expr = interpolate("hello world");
        assert!(matches!(expr.kind, ExprKind::String(s) if s == "hello world"));
    }

    #[test]
    fn test_escapes_decoded() {
        let expr = interpolate(r"a\tb\n\$x\\");
        assert!(matches!(expr.kind, ExprKind::String(s) if s == "a\tb\n$x\\"));
    }

    #[test]
    fn test_hex_and_octal_escapes() {
        let expr = interpolate(r"\x41\102");
        assert!(matches!(expr.kind, ExprKind::String(s) if s == "AB"));
    }

    #[test]
    fn test_lone_variable() {
        let expr = interpolate("$name");
        assert!(matches!(expr.kind, ExprKind::Variable(n) if n == "name"));
    }

    #[test]
    fn test_concat_chain_shape() {
        // "a $b c" → Concat(Concat("a ", $b), " c")
        let expr = interpolate("a $b c");
        let ExprKind::Binary(outer) = expr.kind else {
            panic!("expected binary concat");
        };
        assert_eq!(outer.op, BinaryOp::Concat);
        assert!(matches!(outer.right.kind, ExprKind::String(ref s) if s == " c"));
        let ExprKind::Binary(inner) = outer.left.kind else {
            panic!("expected nested concat");
        };
        assert_eq!(inner.op, BinaryOp::Concat);
        assert!(matches!(inner.left.kind, ExprKind::String(ref s) if s == "a "));
        assert!(matches!(inner.right.kind, ExprKind::Variable(ref n) if n == "b"));
    }

    #[test]
    fn test_simple_property_access() {
        let expr = interpolate("$user->name");
        assert!(matches!(expr.kind, ExprKind::PropertyAccess(_)));
    }

    #[test]
    fn test_simple_array_lookup() {
        let expr = interpolate("$arr[0]");
        let ExprKind::ArrayAccess(access) = expr.kind else {
            panic!("expected array access");
        };
        assert!(matches!(access.index.kind, ExprKind::Int(0)));
    }

    #[test]
    fn test_bare_string_key() {
        let expr = interpolate("$arr[key]");
        let ExprKind::ArrayAccess(access) = expr.kind else {
            panic!("expected array access");
        };
        assert!(matches!(access.index.kind, ExprKind::String(ref s) if s == "key"));
    }

    #[test]
    fn test_complex_interpolation() {
        let expr = interpolate("{$obj->method()}");
        assert!(matches!(expr.kind, ExprKind::MethodCall(_)));
    }

    #[test]
    fn test_dollar_brace_named() {
        let expr = interpolate("${name}");
        assert!(matches!(expr.kind, ExprKind::Variable(n) if n == "name"));
    }

    #[test]
    fn test_escaped_dollar_stays_literal() {
        let expr = interpolate(r"\$name");
        assert!(matches!(expr.kind, ExprKind::String(s) if s == "$name"));
    }
}
