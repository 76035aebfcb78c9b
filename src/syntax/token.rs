//! Token vocabulary for C-family source.
//!
//! Tokens carry their own text so that macro substitution can splice
//! synthesized tokens into a stream without keeping the defining buffer
//! alive. Trivia (whitespace, comments, preprocessor directive lines) never
//! reaches the token stream.

use crate::base::TextRange;
use smol_str::SmolStr;

/// Kind of a single token.
///
/// The set is deliberately coarse: the extractor only distinguishes what it
/// steers on. Every operator it never inspects lexes as [`TokenKind::Op`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum TokenKind {
    /// Identifier (including keywords the extractor treats as plain names,
    /// e.g. `operator`).
    Ident,

    // Structure keywords
    Namespace,
    Class,
    Struct,
    Union,
    Enum,
    Using,
    Typedef,
    Template,
    Virtual,
    Public,
    Protected,
    Private,
    This,

    /// Built-in type names and declaration modifiers (`int`, `void`,
    /// `const`, `static`, ...). They all play the same role in a
    /// declaration head.
    PrimType,

    /// Statement keywords (`return`, `if`, `while`, ...). A declaration
    /// never starts with one, which is how expression statements are told
    /// apart from declarations.
    StmtKw,

    // Punctuation the extractor steers on
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Colon,
    ColonColon,
    Dot,
    Arrow,
    Star,
    Amp,
    Tilde,
    Lt,
    Gt,
    Eq,

    /// Any other operator or punctuation.
    Op,

    // Literals
    IntLit,
    FloatLit,
    StrLit,
    CharLit,

    /// A byte sequence the lexer could not tokenize. Skipped by recovery.
    Error,

    /// End of input. Always the last token of a stream.
    Eof,
}

/// A single token: kind, owned text, and the byte range it came from.
///
/// Tokens synthesized by macro substitution reuse the range of the
/// invocation site, so diagnostics and cursor math keep pointing at real
/// buffer positions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: SmolStr,
    pub range: TextRange,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<SmolStr>, range: TextRange) -> Self {
        Self {
            kind,
            text: text.into(),
            range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::TextSize;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::from(start), TextSize::from(end))
    }

    #[test]
    fn test_token_text_is_owned() {
        let tok = Token::new(TokenKind::Ident, "pMumble", range(0, 7));
        assert_eq!(tok.text.as_str(), "pMumble");
        assert_eq!(tok.range, range(0, 7));
    }
}
