//! Syntax layer: lexing and macro substitution.
//!
//! This layer turns buffer text into the token stream the extractor
//! consumes. It is the only part of the crate that looks at raw bytes, and
//! it never fails: broken, truncated, or mid-edit input produces a token
//! stream like any other.
//!
//! - [`token`] - token vocabulary
//! - [`lexer`] - logos-based lexer
//! - [`preprocess`] - externally-driven macro substitution

pub mod lexer;
pub mod preprocess;
pub mod token;

pub use lexer::lex;
pub use preprocess::{ArityMismatch, Expansion, MacroDef, MacroTable, expand};
pub use token::{Token, TokenKind};
