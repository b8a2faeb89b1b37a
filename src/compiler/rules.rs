//! Pratt parse table: one rule per token kind.

use super::Compiler;
use crate::scanner::TokenKind;

/// Binding power, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    /// One level tighter; binary operands parse at this so operators associate left.
    pub fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

/// A prefix or infix handler; the flag says whether an `=` may follow.
pub(super) type ParseFn<'src, 'a> = fn(&mut Compiler<'src, 'a>, bool);

pub(super) struct ParseRule<'src, 'a> {
    pub prefix: Option<ParseFn<'src, 'a>>,
    pub infix: Option<ParseFn<'src, 'a>>,
    pub precedence: Precedence,
}

pub(super) fn rule<'src, 'a>(kind: TokenKind) -> ParseRule<'src, 'a> {
    use TokenKind as T;

    let (prefix, infix, precedence): (Option<ParseFn<'src, 'a>>, Option<ParseFn<'src, 'a>>, _) =
        match kind {
            T::LeftParen => (Some(Compiler::grouping), None, Precedence::None),
            T::Minus => (Some(Compiler::unary), Some(Compiler::binary), Precedence::Term),
            T::Plus => (None, Some(Compiler::binary), Precedence::Term),
            T::Slash | T::Star => (None, Some(Compiler::binary), Precedence::Factor),
            T::Bang => (Some(Compiler::unary), None, Precedence::None),
            T::BangEqual | T::EqualEqual => (None, Some(Compiler::binary), Precedence::Equality),
            T::Greater | T::GreaterEqual | T::Less | T::LessEqual => {
                (None, Some(Compiler::binary), Precedence::Comparison)
            }
            T::Identifier => (Some(Compiler::variable), None, Precedence::None),
            T::String => (Some(Compiler::string), None, Precedence::None),
            T::Number => (Some(Compiler::number), None, Precedence::None),
            T::False | T::Nil | T::True => (Some(Compiler::literal), None, Precedence::None),
            _ => (None, None, Precedence::None),
        };

    ParseRule { prefix, infix, precedence }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_is_ordered() {
        assert!(Precedence::Assignment < Precedence::Term);
        assert!(Precedence::Term < Precedence::Factor);
        assert!(Precedence::Factor < Precedence::Unary);
        assert_eq!(Precedence::Term.next(), Precedence::Factor);
        assert_eq!(Precedence::Primary.next(), Precedence::Primary);
    }

    #[test]
    fn every_operator_with_precedence_has_an_infix() {
        use TokenKind as T;
        for kind in [
            T::Minus,
            T::Plus,
            T::Slash,
            T::Star,
            T::BangEqual,
            T::EqualEqual,
            T::Greater,
            T::GreaterEqual,
            T::Less,
            T::LessEqual,
        ] {
            let r = rule(kind);
            assert!(r.precedence > Precedence::None, "{kind:?}");
            assert!(r.infix.is_some(), "{kind:?}");
        }
    }

    #[test]
    fn statement_tokens_have_no_handlers() {
        for kind in [TokenKind::Semicolon, TokenKind::Var, TokenKind::Print, TokenKind::Eof] {
            let r = rule(kind);
            assert!(r.prefix.is_none() && r.infix.is_none());
            assert_eq!(r.precedence, Precedence::None);
        }
    }
}
