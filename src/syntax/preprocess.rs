//! Macro substitution over token streams.
//!
//! The engine never interprets `#define` itself: the surrounding tool hands
//! it a [`MacroTable`] (typically harvested by its own preprocessor
//! emulation), and [`expand`] rewrites a lexed token stream with every
//! known invocation replaced. Substitution is purely stream to stream, so
//! anything the lexer classified as a keyword or an unrelated identifier
//! can never be corrupted by a replacement.
//!
//! Replacement rules:
//! - An object-like macro name is replaced by its body tokens.
//! - A function-like macro name followed by `(` consumes the balanced
//!   argument list; body identifiers naming a parameter are replaced by
//!   the corresponding argument tokens (complex parenthesized arguments
//!   stay intact). Without a following `(` the name is left untouched.
//! - A function-like macro with an empty body expands to nothing.
//! - Expansion is recursive; a macro already being expanded is not
//!   expanded again.
//!
//! Tokens synthesized from a body carry the invocation's range; argument
//! tokens keep their own buffer ranges.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::warn;

use crate::base::TextRange;
use crate::syntax::lexer::lex;
use crate::syntax::token::{Token, TokenKind};

/// One macro definition: optional parameter list plus replacement tokens.
#[derive(Clone, Debug)]
pub struct MacroDef {
    /// `None` for object-like macros, `Some` (possibly empty) for
    /// function-like ones.
    pub params: Option<Vec<SmolStr>>,
    /// Replacement body as lexed tokens. May be empty.
    pub body: Vec<Token>,
}

/// Table of macro definitions keyed by name.
#[derive(Clone, Debug, Default)]
pub struct MacroTable {
    defs: FxHashMap<SmolStr, MacroDef>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define an object-like macro. The replacement text is lexed with the
    /// ordinary lexer; an empty string means the name expands to nothing.
    pub fn define_object(&mut self, name: &str, replacement: &str) {
        self.defs.insert(
            SmolStr::new(name),
            MacroDef {
                params: None,
                body: body_tokens(replacement),
            },
        );
    }

    /// Define a function-like macro with named parameters.
    pub fn define_function(&mut self, name: &str, params: &[&str], replacement: &str) {
        self.defs.insert(
            SmolStr::new(name),
            MacroDef {
                params: Some(params.iter().map(|p| SmolStr::new(p)).collect()),
                body: body_tokens(replacement),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.defs.get(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

fn body_tokens(replacement: &str) -> Vec<Token> {
    let mut tokens = lex(replacement);
    tokens.pop(); // drop Eof
    tokens
}

/// A macro invoked with the wrong number of arguments. Substitution still
/// proceeds positionally; missing parameters expand to nothing and extra
/// arguments are dropped.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArityMismatch {
    pub name: SmolStr,
    pub range: TextRange,
    pub expected: usize,
    pub found: usize,
}

/// Result of running [`expand`] over a token stream.
#[derive(Clone, Debug, Default)]
pub struct Expansion {
    pub tokens: Vec<Token>,
    pub mismatches: Vec<ArityMismatch>,
}

/// Replace every macro invocation in `tokens` according to `table`.
///
/// The input is expected to end with an `Eof` token (as produced by
/// [`lex`]); the output does too.
pub fn expand(tokens: &[Token], table: &MacroTable) -> Expansion {
    let mut out = Expansion::default();
    if table.is_empty() {
        out.tokens = tokens.to_vec();
        return out;
    }

    let mut active: Vec<SmolStr> = Vec::new();
    expand_stream(tokens, table, &mut active, &mut out);
    fuse_spliced_colons(&mut out.tokens);
    out
}

fn expand_stream(
    tokens: &[Token],
    table: &MacroTable,
    active: &mut Vec<SmolStr>,
    out: &mut Expansion,
) {
    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];

        if tok.kind == TokenKind::Ident && !active.contains(&tok.text) {
            if let Some(def) = table.get(&tok.text) {
                match &def.params {
                    None => {
                        splice_body(def, &[], tok, table, active, out);
                        i += 1;
                        continue;
                    }
                    Some(params) => {
                        if tokens.get(i + 1).map(|t| t.kind) == Some(TokenKind::LParen) {
                            if let Some((args, after)) = collect_arguments(tokens, i + 2) {
                                if args.len() != params.len() {
                                    warn!(
                                        macro_name = tok.text.as_str(),
                                        expected = params.len(),
                                        found = args.len(),
                                        "macro invoked with mismatched argument count"
                                    );
                                    out.mismatches.push(ArityMismatch {
                                        name: tok.text.clone(),
                                        range: tok.range,
                                        expected: params.len(),
                                        found: args.len(),
                                    });
                                }
                                splice_body(def, &args, tok, table, active, out);
                                i = after;
                                continue;
                            }
                            // Unterminated argument list: someone is still
                            // typing it. Leave the stream alone.
                        }
                        // Function-like name without `(`: not an invocation.
                    }
                }
            }
        }

        out.tokens.push(tok.clone());
        i += 1;
    }
}

/// Substitute arguments into a body, stamp synthesized tokens with the
/// invocation range, and recursively expand the spliced stream.
fn splice_body(
    def: &MacroDef,
    args: &[Vec<Token>],
    invocation: &Token,
    table: &MacroTable,
    active: &mut Vec<SmolStr>,
    out: &mut Expansion,
) {
    let params: &[SmolStr] = def.params.as_deref().unwrap_or(&[]);

    let mut substituted: Vec<Token> = Vec::with_capacity(def.body.len());
    for tok in &def.body {
        if tok.kind == TokenKind::Ident {
            if let Some(idx) = params.iter().position(|p| *p == tok.text) {
                if let Some(arg) = args.get(idx) {
                    // Argument tokens were cut from the real buffer and
                    // keep their real ranges
                    substituted.extend(arg.iter().cloned());
                }
                continue;
            }
        }
        substituted.push(Token {
            kind: tok.kind,
            text: tok.text.clone(),
            range: invocation.range,
        });
    }

    active.push(invocation.text.clone());
    expand_stream(&substituted, table, active, out);
    active.pop();
}

/// Collect the arguments of an invocation whose `(` sits at `start - 1`.
/// Returns the argument token lists and the index just past the closing
/// `)`, or `None` if the list never closes.
fn collect_arguments(tokens: &[Token], start: usize) -> Option<(Vec<Vec<Token>>, usize)> {
    let mut args: Vec<Vec<Token>> = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut depth = 0usize;
    let mut i = start;

    loop {
        let tok = tokens.get(i)?;
        match tok.kind {
            TokenKind::Eof => return None,
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                depth += 1;
                current.push(tok.clone());
            }
            TokenKind::RParen if depth == 0 => {
                if !current.is_empty() || !args.is_empty() {
                    args.push(current);
                }
                return Some((args, i + 1));
            }
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                depth = depth.saturating_sub(1);
                current.push(tok.clone());
            }
            TokenKind::Comma if depth == 0 => {
                args.push(std::mem::take(&mut current));
            }
            _ => current.push(tok.clone()),
        }
        i += 1;
    }
}

/// Consecutive `:` `:` tokens read as one `::`, matching what re-lexing
/// the replaced text would produce. Adjacent single colons never occur in
/// well-formed input, so the rewrite only fires on macro splices (and on
/// code that was already broken).
fn fuse_spliced_colons(tokens: &mut Vec<Token>) {
    let mut i = 0;
    while i + 1 < tokens.len() {
        if tokens[i].kind == TokenKind::Colon && tokens[i + 1].kind == TokenKind::Colon {
            let range = TextRange::new(tokens[i].range.start(), tokens[i + 1].range.end());
            tokens[i] = Token::new(TokenKind::ColonColon, "::", range);
            tokens.remove(i + 1);
        } else {
            i += 1;
        }
    }
}
