//! Lexer for C-family source built on logos.
//!
//! The lexer is tolerant by construction: it never fails. Unknown bytes
//! become [`TokenKind::Error`] tokens, truncated input simply ends early,
//! and a buffer cut off in the middle of an expression (the normal state of
//! affairs while someone is typing) lexes the same as a finished one up to
//! the cut.
//!
//! Preprocessor directive lines are trivia here: macro definitions reach
//! the engine through an externally supplied table, never by interpreting
//! `#define`.

use logos::Logos;

use crate::base::{TextRange, TextSize};
use crate::syntax::token::{Token, TokenKind};

/// Raw token from logos, before conversion to [`Token`].
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")]
#[logos(skip r"#[^\n]*")]
enum RawToken {
    // === Structure keywords ===
    #[token("namespace")]
    Namespace,
    #[token("class")]
    Class,
    #[token("struct")]
    Struct,
    #[token("union")]
    Union,
    #[token("enum")]
    Enum,
    #[token("using")]
    Using,
    #[token("typedef")]
    Typedef,
    #[token("template")]
    Template,
    #[token("virtual")]
    Virtual,
    #[token("public")]
    Public,
    #[token("protected")]
    Protected,
    #[token("private")]
    Private,
    #[token("this")]
    This,

    // === Built-in types and declaration modifiers ===
    #[token("void")]
    #[token("bool")]
    #[token("char")]
    #[token("int")]
    #[token("float")]
    #[token("double")]
    #[token("long")]
    #[token("short")]
    #[token("signed")]
    #[token("unsigned")]
    #[token("auto")]
    #[token("const")]
    #[token("constexpr")]
    #[token("static")]
    #[token("inline")]
    #[token("extern")]
    #[token("volatile")]
    #[token("mutable")]
    #[token("register")]
    #[token("explicit")]
    #[token("friend")]
    #[token("typename")]
    PrimType,

    // === Statement keywords ===
    #[token("return")]
    #[token("if")]
    #[token("else")]
    #[token("while")]
    #[token("for")]
    #[token("do")]
    #[token("switch")]
    #[token("case")]
    #[token("default")]
    #[token("break")]
    #[token("continue")]
    #[token("goto")]
    #[token("new")]
    #[token("delete")]
    #[token("sizeof")]
    #[token("throw")]
    #[token("try")]
    #[token("catch")]
    #[token("true")]
    #[token("false")]
    #[token("nullptr")]
    StmtKw,

    // === Punctuation ===
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("->")]
    Arrow,
    #[token("*")]
    Star,
    #[token("&")]
    Amp,
    #[token("~")]
    Tilde,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,

    // Multi-character operators listed explicitly so they never split into
    // tokens the extractor would misread (`>=` is not `>` `=`).
    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    #[token("<<")]
    #[token(">>")]
    #[token("&&")]
    #[token("||")]
    #[token("++")]
    #[token("--")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("->*")]
    #[token("...")]
    #[token("+")]
    #[token("-")]
    #[token("/")]
    #[token("%")]
    #[token("!")]
    #[token("^")]
    #[token("|")]
    #[token("?")]
    Op,

    // === Literals ===
    #[regex(r"[0-9][0-9a-fA-FxXbuUlL']*")]
    IntLit,

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?[fFlL]?")]
    FloatLit,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    StrLit,

    #[regex(r"'([^'\\\n]|\\.)*'")]
    CharLit,

    // === Identifier ===
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

impl RawToken {
    fn kind(self) -> TokenKind {
        match self {
            RawToken::Namespace => TokenKind::Namespace,
            RawToken::Class => TokenKind::Class,
            RawToken::Struct => TokenKind::Struct,
            RawToken::Union => TokenKind::Union,
            RawToken::Enum => TokenKind::Enum,
            RawToken::Using => TokenKind::Using,
            RawToken::Typedef => TokenKind::Typedef,
            RawToken::Template => TokenKind::Template,
            RawToken::Virtual => TokenKind::Virtual,
            RawToken::Public => TokenKind::Public,
            RawToken::Protected => TokenKind::Protected,
            RawToken::Private => TokenKind::Private,
            RawToken::This => TokenKind::This,
            RawToken::PrimType => TokenKind::PrimType,
            RawToken::StmtKw => TokenKind::StmtKw,
            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBracket => TokenKind::LBracket,
            RawToken::RBracket => TokenKind::RBracket,
            RawToken::Semi => TokenKind::Semi,
            RawToken::Comma => TokenKind::Comma,
            RawToken::ColonColon => TokenKind::ColonColon,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Arrow => TokenKind::Arrow,
            RawToken::Star => TokenKind::Star,
            RawToken::Amp => TokenKind::Amp,
            RawToken::Tilde => TokenKind::Tilde,
            RawToken::Lt => TokenKind::Lt,
            RawToken::Gt => TokenKind::Gt,
            RawToken::Eq => TokenKind::Eq,
            RawToken::Op => TokenKind::Op,
            RawToken::IntLit => TokenKind::IntLit,
            RawToken::FloatLit => TokenKind::FloatLit,
            RawToken::StrLit => TokenKind::StrLit,
            RawToken::CharLit => TokenKind::CharLit,
            RawToken::Ident => TokenKind::Ident,
        }
    }
}

/// Lex a buffer into tokens. Never fails; the last token is always
/// [`TokenKind::Eof`] with an empty range at the end of the buffer.
pub fn lex(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let range = TextRange::new(
            TextSize::from(span.start as u32),
            TextSize::from(span.end as u32),
        );
        let kind = match result {
            Ok(raw) => raw.kind(),
            Err(()) => TokenKind::Error,
        };
        tokens.push(Token::new(kind, lexer.slice(), range));
    }

    let end = TextSize::of(source);
    tokens.push(Token::new(TokenKind::Eof, "", TextRange::new(end, end)));
    tokens
}
