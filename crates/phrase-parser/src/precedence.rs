use phrase_lexer::TokenKind;

/// Binding powers for Pratt parsing. Higher binds tighter.
///
/// Operator precedence, lowest to highest:
///
///  1. `or`                               (left)
///  2. `xor`                              (left)
///  3. `and`                              (left)
///  4. `= += -= ...` (assignment)         (right) — handled separately
///  5. `? :` (ternary)                    (right) — handled separately
///  6. `??`                               (right)
///  7. `||`                               (left)
///  8. `&&`                               (left)
///  9. `|`                                (left)
/// 10. `^`                                (left)
/// 11. `&`                                (left)
/// 12. `== != === !== <> <=>`             (nonassoc)
/// 13. `< <= > >=`                        (nonassoc)
/// 14. `<< >>`                            (left)
/// 15. `+ - .`                            (left)
/// 16. `* / %`                            (left)
/// 17. `! ~ + - ++ -- (cast) @`           (prefix)
/// 18. `**`                               (right)
/// 19. `instanceof`                       (left)
/// 20. `-> :: [ (` postfix chain          (left)
///
/// Returns `(left_bp, right_bp)`. Left-associative operators have
/// `right_bp = left_bp + 1`; right-associative ones `right_bp = left_bp - 1`.
pub fn infix_binding_power(kind: &TokenKind) -> Option<(u8, u8)> {
    match kind {
        // Logical keyword operators (lowest precedence)
        TokenKind::Or => Some((1, 2)),
        TokenKind::Xor => Some((3, 4)),
        TokenKind::And => Some((5, 6)),

        // Null coalescing (right-associative)
        TokenKind::QuestionQuestion => Some((14, 13)),

        TokenKind::PipePipe => Some((15, 16)),
        TokenKind::AmpersandAmpersand => Some((17, 18)),

        TokenKind::Pipe => Some((19, 20)),
        TokenKind::Caret => Some((21, 22)),
        TokenKind::Ampersand => Some((23, 24)),

        // Equality (nonassoc — treated as left with same bp)
        TokenKind::EqualsEquals
        | TokenKind::BangEquals
        | TokenKind::EqualsEqualsEquals
        | TokenKind::BangEqualsEquals
        | TokenKind::Spaceship => Some((25, 26)),

        // Comparison (nonassoc)
        TokenKind::LessThan
        | TokenKind::GreaterThan
        | TokenKind::LessThanEquals
        | TokenKind::GreaterThanEquals => Some((27, 28)),

        // Shift
        TokenKind::ShiftLeft | TokenKind::ShiftRight => Some((29, 30)),

        // Additive: string concatenation sits with + and -
        TokenKind::Plus | TokenKind::Minus | TokenKind::Dot => Some((31, 32)),

        // Multiplicative
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some((33, 34)),

        // Exponentiation (right-associative, binds tighter than unary minus)
        TokenKind::StarStar => Some((38, 37)),

        TokenKind::Instanceof => Some((39, 40)),

        _ => None,
    }
}

/// The right binding power of a prefix operator, or None.
pub fn prefix_binding_power(kind: &TokenKind) -> Option<u8> {
    match kind {
        TokenKind::Minus
        | TokenKind::Plus
        | TokenKind::Bang
        | TokenKind::Tilde
        | TokenKind::PlusPlus
        | TokenKind::MinusMinus => Some(PREFIX_BP),
        _ => None,
    }
}

/// The left binding power of a postfix operator, or None.
pub fn postfix_binding_power(kind: &TokenKind) -> Option<u8> {
    match kind {
        TokenKind::PlusPlus | TokenKind::MinusMinus => Some(41),
        _ => None,
    }
}

/// Assignment is handled specially: right-associative, and the LHS must be
/// a valid assignment target.
pub const ASSIGNMENT_BP: u8 = 8;

/// Ternary binding power — handled specially in the parser.
pub const TERNARY_BP: u8 = 10;

/// Shared by all prefix operators, casts, `@`, and `clone`.
pub const PREFIX_BP: u8 = 35;

/// The `->`, `::`, `[...]`, and call postfix chain.
pub const MEMBER_BP: u8 = 43;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_additive_lower_than_multiplicative() {
        let (_, add_right) = infix_binding_power(&TokenKind::Plus).unwrap();
        let (mul_left, _) = infix_binding_power(&TokenKind::Star).unwrap();
        assert!(mul_left > add_right);
    }

    #[test]
    fn test_concat_sits_with_additive() {
        assert_eq!(
            infix_binding_power(&TokenKind::Dot),
            infix_binding_power(&TokenKind::Plus)
        );
    }

    #[test]
    fn test_shift_lower_than_additive() {
        let (_, shift_right) = infix_binding_power(&TokenKind::ShiftLeft).unwrap();
        let (add_left, _) = infix_binding_power(&TokenKind::Plus).unwrap();
        assert!(add_left > shift_right);
    }

    #[test]
    fn test_pow_is_right_associative() {
        let (left, right) = infix_binding_power(&TokenKind::StarStar).unwrap();
        assert!(left > right);
    }

    #[test]
    fn test_pow_binds_tighter_than_prefix() {
        let (pow_left, _) = infix_binding_power(&TokenKind::StarStar).unwrap();
        assert!(pow_left > prefix_binding_power(&TokenKind::Minus).unwrap());
    }

    #[test]
    fn test_instanceof_above_pow() {
        let (inst_left, _) = infix_binding_power(&TokenKind::Instanceof).unwrap();
        let (pow_left, _) = infix_binding_power(&TokenKind::StarStar).unwrap();
        assert!(inst_left > pow_left);
    }

    #[test]
    fn test_add_is_left_associative() {
        let (left, right) = infix_binding_power(&TokenKind::Plus).unwrap();
        assert!(left < right);
    }

    #[test]
    fn test_boolean_and_lower_than_bitwise_or() {
        let (_, and_right) = infix_binding_power(&TokenKind::AmpersandAmpersand).unwrap();
        let (bitor_left, _) = infix_binding_power(&TokenKind::Pipe).unwrap();
        assert!(bitor_left > and_right);
    }

    #[test]
    fn test_null_coalesce_right_associative() {
        let (left, right) = infix_binding_power(&TokenKind::QuestionQuestion).unwrap();
        assert!(left > right);
    }

    #[test]
    fn test_keyword_logicals_below_assignment() {
        let (or_left, _) = infix_binding_power(&TokenKind::Or).unwrap();
        let (and_left, _) = infix_binding_power(&TokenKind::And).unwrap();
        assert!(or_left < ASSIGNMENT_BP);
        assert!(and_left < ASSIGNMENT_BP);
    }
}
