//! Tolerant single-pass scope and declaration extraction.
//!
//! The extractor walks the token stream once, maintaining a stack of open
//! scopes, and records declarations as it recognizes declaration-shaped
//! sentences. It is not a parser in the grammar sense: anything it cannot
//! read as a declaration is skipped to the next `;`, `{` or `}`, because
//! buffers under edit are broken most of the time and a completion query
//! must still work on whatever did parse.
//!
//! Recognition is shape-based. A sentence is the token run up to the next
//! structural stop, and what it declares follows from which identifier
//! paths appeared and whether one of them carries a parameter list:
//! `Foo x;` declares a variable, `int get();` a function, `p;` on its own
//! declares nothing at all. Expression markers (`.`, `->`, operators,
//! literals in head position) mark the sentence as a statement and mute
//! it entirely.
//!
//! Out-of-line definitions (`void Foo::get() { ... }`) resolve their
//! receiver eagerly against everything declared so far, mirroring the
//! declaration-before-definition order source files follow anyway. The
//! body scope remembers the receiver so unqualified lookup inside the
//! body sees the class members.

use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::base::{FileId, LineIndex, Name, TextRange, TextSize};
use crate::hir::diagnostics::DiagnosticCollector;
use crate::hir::ids::ScopeId;
use crate::hir::scope::{GLOBAL_SCOPE, ScopeGraph, UsingKind};
use crate::hir::symbols::{DeclKind, Declaration, ScopeKind, Visibility};
use crate::syntax::{Token, TokenKind};

/// Extract the scope graph of one buffer from its token stream.
///
/// The returned graph is finished: base and using edges are resolved,
/// inheritance cycles are broken, and every recovery the extractor made
/// is reflected in `collector` rather than in a failure.
pub fn extract(
    file: FileId,
    tokens: &[Token],
    index: &LineIndex,
    collector: &mut DiagnosticCollector,
) -> ScopeGraph {
    let mut graph = ScopeGraph::new(file);
    let eof = tokens
        .last()
        .map(|t| t.range.end())
        .unwrap_or_else(|| TextSize::from(0));
    graph.push_extent(GLOBAL_SCOPE, TextRange::new(TextSize::from(0), eof));

    if !tokens.is_empty() {
        let mut extractor = Extractor {
            graph,
            tokens,
            pos: 0,
            current_frame: Frame {
                scope: GLOBAL_SCOPE,
                access: Visibility::Public,
            },
            stack: Vec::new(),
            eof,
            file,
            index,
            collector,
        };
        extractor.run();
        graph = extractor.graph;
    }

    graph.finish(index, collector);
    debug!(
        file = %file,
        scopes = graph.scope_count(),
        decls = graph.decl_count(),
        "extraction complete"
    );
    graph
}

// ============================================================================
// EXTRACTOR STATE
// ============================================================================

/// One open scope on the stack.
#[derive(Copy, Clone)]
struct Frame {
    scope: ScopeId,
    /// Current access label; meaningful only in class-like scopes.
    access: Visibility,
}

/// An identifier path occurrence in a sentence, possibly a declarator.
struct PathOcc {
    segs: Vec<Name>,
    absolute: bool,
    name_range: TextRange,
    full_range: TextRange,
    params: Option<ParamGroup>,
}

/// A parenthesized parameter list attached to a path occurrence.
struct ParamGroup {
    params: Vec<Param>,
    signature: SmolStr,
}

struct Param {
    name: Option<(Name, TextRange)>,
    type_path: Vec<Name>,
}

/// One recognized element of a sentence, in source order.
enum Occ {
    Path(PathOcc),
    /// A built-in type or modifier keyword. Carries no path to complete
    /// through, but counts as a type for declaration shaping.
    Prim,
}

/// How a sentence ended.
enum Stop {
    /// `;` was consumed.
    Semi,
    /// A `{` is current and belongs to this sentence.
    Body,
    /// `}`, end of input, or a structural keyword; nothing is declared.
    Abandoned,
}

struct Extractor<'a> {
    graph: ScopeGraph,
    tokens: &'a [Token],
    pos: usize,
    current_frame: Frame,
    stack: Vec<Frame>,
    eof: TextSize,
    file: FileId,
    index: &'a LineIndex,
    collector: &'a mut DiagnosticCollector,
}

impl<'a> Extractor<'a> {
    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    fn current(&self) -> &'a Token {
        &self.tokens[self.pos]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn peek_kind(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    /// Advance past the current token and return it. The trailing `Eof`
    /// token is never consumed, so the cursor cannot run off the stream.
    fn bump(&mut self) -> &'a Token {
        let token = &self.tokens[self.pos];
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn scope(&self) -> ScopeId {
        self.current_frame.scope
    }

    fn scope_kind(&self) -> ScopeKind {
        self.graph.scope(self.current_frame.scope).kind
    }

    fn in_class(&self) -> bool {
        self.scope_kind() == ScopeKind::Class
    }

    /// Visibility a declaration made right here receives.
    fn access(&self) -> Visibility {
        if self.in_class() {
            self.current_frame.access
        } else {
            Visibility::Public
        }
    }

    fn push_frame(&mut self, scope: ScopeId, access: Visibility) {
        let previous = std::mem::replace(&mut self.current_frame, Frame { scope, access });
        self.stack.push(previous);
    }

    /// Open `scope` at the `{` currently under the cursor.
    fn open_braced(&mut self, scope: ScopeId, access: Visibility) {
        let lbrace = self.bump();
        self.graph
            .push_extent(scope, TextRange::new(lbrace.range.end(), self.eof));
        self.push_frame(scope, access);
    }

    fn open_block(&mut self) {
        let scope = self
            .graph
            .alloc_scope(None, ScopeKind::Block, self.scope());
        self.open_braced(scope, Visibility::Public);
    }

    fn close_frame(&mut self) {
        let rbrace = self.bump();
        if let Some(previous) = self.stack.pop() {
            self.graph
                .close_extent(self.current_frame.scope, rbrace.range.start());
            self.current_frame = previous;
        }
        // A stray `}` at the top level is ignored
    }

    fn expect_semi(&mut self) {
        if self.at(TokenKind::Semi) {
            self.bump();
        }
    }

    // ------------------------------------------------------------------
    // Main loop
    // ------------------------------------------------------------------

    fn run(&mut self) {
        loop {
            match self.current().kind {
                TokenKind::Eof => break,
                TokenKind::Namespace => self.parse_namespace(),
                TokenKind::Class | TokenKind::Struct | TokenKind::Union => self.parse_class(),
                TokenKind::Enum => self.parse_enum(),
                TokenKind::Typedef => self.parse_typedef(),
                TokenKind::Using => self.parse_using(),
                TokenKind::Template => self.skip_template_header(),
                TokenKind::Public | TokenKind::Protected | TokenKind::Private => {
                    self.parse_access_label()
                }
                TokenKind::StmtKw => self.skip_statement(),
                TokenKind::RBrace => self.close_frame(),
                TokenKind::LBrace => self.open_block(),
                TokenKind::Semi => {
                    self.bump();
                }
                _ => self.parse_sentence(Vec::new()),
            }
        }
    }

    // ------------------------------------------------------------------
    // Structural constructs
    // ------------------------------------------------------------------

    fn parse_namespace(&mut self) {
        self.bump();

        if self.at(TokenKind::LBrace) {
            // Anonymous namespace
            let scope = self
                .graph
                .alloc_scope(None, ScopeKind::Namespace, self.scope());
            self.open_braced(scope, Visibility::Public);
            return;
        }

        let Some(path) = self.parse_path() else {
            return;
        };

        if self.at(TokenKind::LBrace) {
            // `namespace A::B {` opens the whole chain; declarations land
            // in the innermost level
            let mut scope = self.scope();
            for &seg in &path.segs {
                scope = self.graph.reopen(seg, ScopeKind::Namespace, scope);
            }
            self.open_braced(scope, Visibility::Public);
        } else {
            // Alias or stray form; nothing to extract
            self.skip_to_semi();
        }
    }

    fn parse_class(&mut self) {
        let keyword = self.bump();
        let default_access = if keyword.kind == TokenKind::Class {
            Visibility::Private
        } else {
            Visibility::Public
        };

        if self.at(TokenKind::LBrace) {
            // Anonymous aggregate
            let scope = self.graph.alloc_scope(None, ScopeKind::Class, self.scope());
            self.open_braced(scope, default_access);
            return;
        }

        let Some(path) = self.parse_path() else {
            return;
        };
        let Some(&name) = path.segs.last() else {
            return;
        };

        // `class Outer::Inner { ... }` defines a nested class out of line
        let parent = if path.segs.len() > 1 {
            match self.resolve_receiver(&path) {
                Some(parent) => parent,
                None => {
                    self.report_unresolved_receiver(&path);
                    self.scope()
                }
            }
        } else {
            self.scope()
        };

        match self.current().kind {
            TokenKind::Semi => {
                // Forward declaration: the logical scope exists from here on
                self.graph.reopen(name, ScopeKind::Class, parent);
                self.declare_type(parent, name, path.name_range, Vec::new());
                self.bump();
            }
            TokenKind::Colon | TokenKind::LBrace => {
                let scope = self.graph.reopen(name, ScopeKind::Class, parent);
                self.declare_type(parent, name, path.name_range, Vec::new());
                if self.at(TokenKind::Colon) {
                    self.parse_base_clause(scope, name);
                }
                if self.at(TokenKind::LBrace) {
                    self.open_braced(scope, default_access);
                } else {
                    self.expect_semi();
                }
            }
            _ => {
                // Elaborated type specifier: `struct Foo x;`
                self.graph.reopen(name, ScopeKind::Class, parent);
                self.declare_type(parent, name, path.name_range, Vec::new());
                self.parse_sentence(vec![Occ::Path(path)]);
            }
        }
    }

    fn parse_base_clause(&mut self, derived: ScopeId, derived_name: Name) {
        self.bump();
        loop {
            while matches!(
                self.current().kind,
                TokenKind::Public | TokenKind::Protected | TokenKind::Private | TokenKind::Virtual
            ) {
                self.bump();
            }
            match self.current().kind {
                TokenKind::Ident | TokenKind::ColonColon => {
                    if let Some(base) = self.parse_path() {
                        let range = base.full_range;
                        if !self.graph.attach_base(derived, base.segs, range) {
                            let name = self.graph.name_text(derived_name);
                            self.collector
                                .self_inheritance(self.file, self.index, range, &name);
                        }
                    }
                }
                _ => break,
            }
            if self.at(TokenKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn parse_enum(&mut self) {
        self.bump();
        let scoped = matches!(self.current().kind, TokenKind::Class | TokenKind::Struct);
        if scoped {
            self.bump();
        }

        let mut name_tok = None;
        if self.at(TokenKind::Ident) {
            name_tok = Some(self.bump());
        }
        if self.at(TokenKind::Colon) {
            // Underlying type
            while !matches!(
                self.current().kind,
                TokenKind::LBrace | TokenKind::Semi | TokenKind::RBrace | TokenKind::Eof
            ) {
                self.bump();
            }
        }

        if let Some(tok) = name_tok {
            let name = self.graph.intern(&tok.text);
            self.declare_type(self.scope(), name, tok.range, Vec::new());
        }

        if self.at(TokenKind::LBrace) {
            self.bump();
            if scoped {
                // Scoped enumerators are not visible in the parent
                self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace, 1);
            } else {
                self.parse_enumerators();
            }
        }
        self.expect_semi();
    }

    fn parse_enumerators(&mut self) {
        let kind = if self.in_class() {
            DeclKind::Field
        } else {
            DeclKind::Variable
        };
        loop {
            match self.current().kind {
                TokenKind::Ident => {
                    let tok = self.bump();
                    let name = self.graph.intern(&tok.text);
                    let scope = self.scope();
                    let visibility = self.access();
                    self.graph.declare(
                        scope,
                        Declaration {
                            name,
                            kind,
                            visibility,
                            scope,
                            type_path: Vec::new(),
                            signature: None,
                            range: tok.range,
                        },
                    );
                    // Skip an optional initializer expression
                    while !matches!(
                        self.current().kind,
                        TokenKind::Comma | TokenKind::RBrace | TokenKind::Eof
                    ) {
                        self.bump();
                    }
                }
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::RBrace => {
                    self.bump();
                    return;
                }
                TokenKind::Eof => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// `typedef TYPE NAME;` records an alias; the tag form
    /// (`typedef struct { ... } X;`) degrades to extracting the struct.
    fn parse_typedef(&mut self) {
        self.bump();

        if matches!(
            self.current().kind,
            TokenKind::Class | TokenKind::Struct | TokenKind::Union | TokenKind::Enum
        ) {
            // Let the main loop extract the aggregate itself
            return;
        }

        let mut collected: Vec<&'a Token> = Vec::new();
        loop {
            match self.current().kind {
                TokenKind::Semi => {
                    self.bump();
                    break;
                }
                TokenKind::LBrace | TokenKind::RBrace | TokenKind::Eof => return,
                TokenKind::LParen => {
                    collected.push(self.bump());
                    let mut depth = 1usize;
                    while depth > 0 {
                        match self.current().kind {
                            TokenKind::LParen => depth += 1,
                            TokenKind::RParen => depth -= 1,
                            TokenKind::Eof | TokenKind::LBrace | TokenKind::RBrace => return,
                            _ => {}
                        }
                        collected.push(self.bump());
                    }
                }
                _ => collected.push(self.bump()),
            }
        }

        // Function-pointer form puts the new name inside the first group
        let name_tok = if let Some(open) = collected.iter().position(|t| t.kind == TokenKind::LParen)
        {
            collected[open..].iter().find(|t| t.kind == TokenKind::Ident)
        } else {
            collected.iter().rev().find(|t| t.kind == TokenKind::Ident)
        };
        let Some(name_tok) = name_tok else { return };

        let type_path = leading_path(&self.graph, &collected, Some(name_tok.range));
        let name = self.graph.intern(&name_tok.text);
        self.declare_type(self.scope(), name, name_tok.range, type_path);
    }

    fn parse_using(&mut self) {
        self.bump();

        if self.at(TokenKind::Namespace) {
            self.bump();
            if let Some(path) = self.parse_path() {
                self.graph.add_using(
                    self.scope(),
                    path.segs,
                    UsingKind::Directive,
                    path.full_range,
                );
            }
            self.skip_to_semi();
            return;
        }

        let Some(path) = self.parse_path() else {
            self.skip_to_semi();
            return;
        };

        if self.at(TokenKind::Eq) {
            // Alias: `using X = a::b::Y;`
            self.bump();
            if let Some(target) = self.parse_path() {
                if let Some(&name) = path.segs.first() {
                    self.declare_type(self.scope(), name, path.name_range, target.segs);
                }
            }
        } else {
            self.graph.add_using(
                self.scope(),
                path.segs,
                UsingKind::Declaration,
                path.full_range,
            );
        }
        self.skip_to_semi();
    }

    fn parse_access_label(&mut self) {
        let keyword = self.bump();
        if self.at(TokenKind::Colon) {
            self.bump();
        }
        if self.in_class() {
            self.current_frame.access = match keyword.kind {
                TokenKind::Public => Visibility::Public,
                TokenKind::Protected => Visibility::Protected,
                _ => Visibility::Private,
            };
        }
    }

    fn skip_template_header(&mut self) {
        self.bump();
        if self.at(TokenKind::Lt) {
            self.try_skip_template_args();
        }
    }

    /// Statements declare nothing. Everything up to `;` is consumed;
    /// a dependent `{` opens an anonymous block so its locals still parse.
    fn skip_statement(&mut self) {
        self.bump();
        loop {
            match self.current().kind {
                TokenKind::Semi => {
                    self.bump();
                    return;
                }
                TokenKind::LBrace => {
                    self.open_block();
                    return;
                }
                TokenKind::RBrace | TokenKind::Eof => return,
                TokenKind::LParen => {
                    self.bump();
                    self.skip_balanced(TokenKind::LParen, TokenKind::RParen, 1);
                }
                TokenKind::Namespace
                | TokenKind::Class
                | TokenKind::Struct
                | TokenKind::Union
                | TokenKind::Enum
                | TokenKind::Typedef
                | TokenKind::Using
                | TokenKind::Template => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Sentences
    // ------------------------------------------------------------------

    /// Parse one declaration-shaped sentence. `seed` carries occurrences a
    /// caller already consumed (the elaborated-type case).
    fn parse_sentence(&mut self, seed: Vec<Occ>) {
        let mut occs = seed;
        let mut expression = false;

        loop {
            match self.current().kind {
                TokenKind::Eof | TokenKind::RBrace => {
                    self.finish_sentence(occs, Stop::Abandoned, expression);
                    return;
                }
                TokenKind::Semi => {
                    self.bump();
                    self.finish_sentence(occs, Stop::Semi, expression);
                    return;
                }
                TokenKind::LBrace => {
                    self.finish_sentence(occs, Stop::Body, expression);
                    return;
                }
                // Structural keywords recover to the main loop
                TokenKind::Namespace
                | TokenKind::Class
                | TokenKind::Struct
                | TokenKind::Union
                | TokenKind::Enum
                | TokenKind::Typedef
                | TokenKind::Using
                | TokenKind::Template
                | TokenKind::Public
                | TokenKind::Protected
                | TokenKind::Private
                | TokenKind::StmtKw => {
                    self.finish_sentence(occs, Stop::Abandoned, expression);
                    return;
                }
                TokenKind::Ident | TokenKind::Tilde => {
                    if let Some(path) = self.parse_path() {
                        occs.push(Occ::Path(path));
                    }
                }
                TokenKind::ColonColon => {
                    // Either a leading absolute path or a continuation after
                    // template arguments: `A<T>::B`
                    if matches!(self.peek_kind(1), TokenKind::Ident | TokenKind::Tilde) {
                        if let Some(continuation) = self.parse_path() {
                            match occs.last_mut() {
                                Some(Occ::Path(prev)) if prev.params.is_none() => {
                                    prev.segs.extend(continuation.segs);
                                    prev.name_range = continuation.name_range;
                                    prev.full_range = TextRange::new(
                                        prev.full_range.start(),
                                        continuation.full_range.end(),
                                    );
                                }
                                _ => occs.push(Occ::Path(continuation)),
                            }
                        }
                    } else {
                        self.bump();
                    }
                }
                TokenKind::PrimType => {
                    occs.push(Occ::Prim);
                    self.bump();
                }
                TokenKind::Virtual | TokenKind::Star | TokenKind::Amp | TokenKind::Error => {
                    self.bump();
                }
                TokenKind::LParen => {
                    let attach = !expression
                        && matches!(occs.last(), Some(Occ::Path(p)) if p.params.is_none());
                    if attach {
                        let group = self.collect_param_group();
                        if let Some(Occ::Path(p)) = occs.last_mut() {
                            p.params = Some(group);
                        }
                    } else {
                        self.bump();
                        self.skip_balanced(TokenKind::LParen, TokenKind::RParen, 1);
                    }
                }
                TokenKind::LBracket => {
                    self.bump();
                    self.skip_balanced(TokenKind::LBracket, TokenKind::RBracket, 1);
                }
                TokenKind::Eq => {
                    if expression || occs.is_empty() {
                        expression = true;
                        self.bump();
                    } else {
                        self.bump();
                        self.skip_initializer();
                    }
                }
                TokenKind::Comma => {
                    self.bump();
                    if !expression {
                        self.flush_declarator(&mut occs);
                    }
                }
                TokenKind::Colon => {
                    let after_params =
                        matches!(occs.last(), Some(Occ::Path(p)) if p.params.is_some());
                    self.bump();
                    if after_params && !expression {
                        // Constructor initializer list; the body `{` follows
                        self.skip_to_body();
                    } else {
                        // Bitfield width or a label's statement
                        self.skip_colon_tail();
                    }
                }
                // Anything else marks an expression statement
                _ => {
                    expression = true;
                    self.bump();
                }
            }
        }
    }

    fn finish_sentence(&mut self, occs: Vec<Occ>, stop: Stop, expression: bool) {
        if expression {
            if matches!(stop, Stop::Body) {
                self.open_block();
            } else if matches!(stop, Stop::Semi) {
                // already consumed
            }
            return;
        }
        match stop {
            Stop::Abandoned => {}
            Stop::Semi => self.emit_declarator(occs, false),
            Stop::Body => self.emit_declarator(occs, true),
        }
    }

    /// Finish the declarator before a `,` and keep the shared type part
    /// for the next one: `int a, b;`.
    fn flush_declarator(&mut self, occs: &mut Vec<Occ>) {
        if occs.len() < 2 {
            return;
        }
        let keep = match &occs[0] {
            Occ::Prim => Occ::Prim,
            Occ::Path(p) => Occ::Path(PathOcc {
                segs: p.segs.clone(),
                absolute: p.absolute,
                name_range: p.name_range,
                full_range: p.full_range,
                params: None,
            }),
        };
        let taken = std::mem::take(occs);
        self.emit_declarator(taken, false);
        occs.push(keep);
    }

    /// Classify a completed sentence and record what it declares.
    fn emit_declarator(&mut self, occs: Vec<Occ>, body: bool) {
        let declarator = occs.iter().rposition(|o| match o {
            Occ::Path(p) => p.params.is_some(),
            Occ::Prim => false,
        });

        match declarator {
            Some(di) => self.emit_callable(occs, di, body),
            None => {
                self.emit_value(occs);
                if body {
                    // `{` after a non-callable sentence: aggregate
                    // initializer or broken input; keep the locals
                    self.open_block();
                }
            }
        }
    }

    fn emit_callable(&mut self, occs: Vec<Occ>, di: usize, body: bool) {
        let has_type = di > 0;
        let ret_path = occs[..di]
            .iter()
            .rev()
            .find_map(|o| match o {
                Occ::Path(p) => Some(p.segs.clone()),
                Occ::Prim => None,
            })
            .unwrap_or_default();

        let Occ::Path(path) = &occs[di] else { return };
        let Some(&name) = path.segs.last() else {
            if body {
                self.open_block();
            }
            return;
        };
        let frame_kind = self.scope_kind();
        let in_body_frame = matches!(frame_kind, ScopeKind::Function | ScopeKind::Block);

        if path.segs.len() > 1 {
            // Qualified declarator. At namespace level this is an
            // out-of-line definition; inside a body it is just a call.
            if in_body_frame {
                if body {
                    self.open_block();
                }
                return;
            }
            match self.resolve_receiver(path) {
                Some(receiver) => {
                    let kind = if self.graph.scope(receiver).kind == ScopeKind::Class {
                        DeclKind::Method
                    } else {
                        DeclKind::Function
                    };
                    self.declare_callable(receiver, name, path, ret_path, kind, Visibility::Public);
                    if body {
                        self.open_function_body(name, path, Some(receiver));
                    }
                }
                None => {
                    self.report_unresolved_receiver(path);
                    let scope = self.scope();
                    self.declare_callable(
                        scope,
                        name,
                        path,
                        ret_path,
                        DeclKind::Function,
                        Visibility::Public,
                    );
                    if body {
                        self.open_function_body(name, path, None);
                    }
                }
            }
            return;
        }

        // Single-segment declarator
        if in_body_frame {
            if has_type && !body {
                // Vexing but common: `Foo x(arg);` in a body is a variable
                let scope = self.scope();
                self.graph.declare(
                    scope,
                    Declaration {
                        name,
                        kind: DeclKind::Variable,
                        visibility: Visibility::Public,
                        scope,
                        type_path: ret_path,
                        signature: None,
                        range: path.name_range,
                    },
                );
            } else if body {
                self.open_block();
            }
            return;
        }

        let kind = if frame_kind == ScopeKind::Class {
            DeclKind::Method
        } else {
            DeclKind::Function
        };
        let visibility = self.access();
        let scope = self.scope();
        self.declare_callable(scope, name, path, ret_path, kind, visibility);
        if body {
            self.open_function_body(name, path, None);
        }
    }

    fn declare_callable(
        &mut self,
        scope: ScopeId,
        name: Name,
        path: &PathOcc,
        ret_path: Vec<Name>,
        kind: DeclKind,
        visibility: Visibility,
    ) {
        let signature = path.params.as_ref().map(|g| g.signature.clone());
        self.graph.declare(
            scope,
            Declaration {
                name,
                kind,
                visibility,
                scope,
                type_path: ret_path,
                signature,
                range: path.name_range,
            },
        );
    }

    /// Open the body scope of a function definition and declare its
    /// parameters as locals.
    fn open_function_body(&mut self, name: Name, path: &PathOcc, receiver: Option<ScopeId>) {
        let scope = self
            .graph
            .alloc_scope(Some(name), ScopeKind::Function, self.scope());
        if let Some(receiver) = receiver {
            self.graph.set_receiver(scope, receiver);
        }
        if let Some(group) = &path.params {
            for param in &group.params {
                if let Some((param_name, range)) = param.name {
                    self.graph.declare(
                        scope,
                        Declaration {
                            name: param_name,
                            kind: DeclKind::Variable,
                            visibility: Visibility::Public,
                            scope,
                            type_path: param.type_path.clone(),
                            signature: None,
                            range,
                        },
                    );
                }
            }
        }
        self.open_braced(scope, Visibility::Public);
    }

    fn emit_value(&mut self, occs: Vec<Occ>) {
        let prim_count = occs.iter().filter(|o| matches!(o, Occ::Prim)).count();
        let paths: Vec<&PathOcc> = occs
            .iter()
            .filter_map(|o| match o {
                Occ::Path(p) => Some(p),
                Occ::Prim => None,
            })
            .collect();

        let Some(&last) = paths.last() else { return };
        let has_type = paths.len() >= 2 || prim_count > 0;

        if last.segs.len() > 1 {
            // `int Foo::counter;` defines a static member out of line
            if !has_type || matches!(self.scope_kind(), ScopeKind::Function | ScopeKind::Block) {
                return;
            }
            let Some(&name) = last.segs.last() else { return };
            let type_path = type_path_before(&paths);
            match self.resolve_receiver(last) {
                Some(receiver) => {
                    let kind = if self.graph.scope(receiver).kind == ScopeKind::Class {
                        DeclKind::Field
                    } else {
                        DeclKind::Variable
                    };
                    self.graph.declare(
                        receiver,
                        Declaration {
                            name,
                            kind,
                            visibility: Visibility::Public,
                            scope: receiver,
                            type_path,
                            signature: None,
                            range: last.name_range,
                        },
                    );
                }
                None => self.report_unresolved_receiver(last),
            }
            return;
        }

        if !has_type {
            // A lone name declares nothing; this is exactly the state a
            // buffer is in while an identifier is being typed
            return;
        }

        let Some(&name) = last.segs.last() else { return };
        let type_path = type_path_before(&paths);
        let kind = if self.in_class() {
            DeclKind::Field
        } else {
            DeclKind::Variable
        };
        let visibility = self.access();
        let scope = self.scope();
        self.graph.declare(
            scope,
            Declaration {
                name,
                kind,
                visibility,
                scope,
                type_path,
                signature: None,
                range: last.name_range,
            },
        );
    }

    // ------------------------------------------------------------------
    // Path and parameter parsing
    // ------------------------------------------------------------------

    /// Parse `[::] seg (:: seg)*` where a segment is an identifier or
    /// `~identifier`, skipping template argument lists between segments.
    /// Returns `None` when only noise was consumed.
    fn parse_path(&mut self) -> Option<PathOcc> {
        let mut absolute = false;
        if self.at(TokenKind::ColonColon) {
            if !matches!(self.peek_kind(1), TokenKind::Ident | TokenKind::Tilde) {
                self.bump();
                return None;
            }
            absolute = true;
            self.bump();
        }

        let start = self.current().range.start();
        let mut segs = Vec::new();
        let mut name_range = self.current().range;
        let mut end = self.current().range.end();

        loop {
            match self.current().kind {
                TokenKind::Ident => {
                    let tok = self.bump();
                    segs.push(self.graph.intern(&tok.text));
                    name_range = tok.range;
                    end = tok.range.end();
                }
                TokenKind::Tilde => {
                    let tilde = self.bump();
                    if self.at(TokenKind::Ident) {
                        let tok = self.bump();
                        let fused = format!("~{}", tok.text);
                        segs.push(self.graph.intern(&fused));
                        name_range = TextRange::new(tilde.range.start(), tok.range.end());
                        end = tok.range.end();
                    } else if segs.is_empty() {
                        return None;
                    }
                    break;
                }
                _ => break,
            }

            if self.at(TokenKind::Lt) {
                self.try_skip_template_args();
            }
            if self.at(TokenKind::ColonColon)
                && matches!(self.peek_kind(1), TokenKind::Ident | TokenKind::Tilde)
            {
                self.bump();
            } else {
                break;
            }
        }

        if segs.is_empty() {
            return None;
        }
        Some(PathOcc {
            segs,
            absolute,
            name_range,
            full_range: TextRange::new(start, end),
            params: None,
        })
    }

    /// Collect a parameter list. The cursor is on `(`. On malformed input
    /// the group keeps whatever parsed before the damage.
    fn collect_param_group(&mut self) -> ParamGroup {
        self.bump();
        let mut depth = 1usize;
        let mut current: Vec<&'a Token> = Vec::new();
        let mut params = Vec::new();
        let mut rendered = Vec::new();

        loop {
            match self.current().kind {
                TokenKind::Eof | TokenKind::LBrace | TokenKind::RBrace | TokenKind::Semi => break,
                TokenKind::LParen | TokenKind::LBracket => {
                    depth += 1;
                    current.push(self.bump());
                }
                TokenKind::RParen | TokenKind::RBracket => {
                    depth -= 1;
                    if depth == 0 {
                        self.bump();
                        break;
                    }
                    current.push(self.bump());
                }
                TokenKind::Comma if depth == 1 => {
                    self.bump();
                    self.finish_param(&current, &mut params, &mut rendered);
                    current.clear();
                }
                _ => current.push(self.bump()),
            }
        }
        self.finish_param(&current, &mut params, &mut rendered);

        ParamGroup {
            params,
            signature: SmolStr::new(format!("({})", rendered.join(", "))),
        }
    }

    fn finish_param(
        &mut self,
        tokens: &[&'a Token],
        params: &mut Vec<Param>,
        rendered: &mut Vec<String>,
    ) {
        // Drop a default argument before reading the shape
        let tokens = match tokens.iter().position(|t| t.kind == TokenKind::Eq) {
            Some(eq) => &tokens[..eq],
            None => tokens,
        };
        if tokens.is_empty() {
            return;
        }
        if tokens.len() == 1 && tokens[0].text == "void" {
            // `f(void)` and `f()` must render the same
            return;
        }

        let name_tok = match tokens.last() {
            Some(tok) if tok.kind == TokenKind::Ident && tokens.len() >= 2 => Some(*tok),
            _ => None,
        };
        let type_tokens = if name_tok.is_some() {
            &tokens[..tokens.len() - 1]
        } else {
            tokens
        };

        rendered.push(
            type_tokens
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        );
        params.push(Param {
            name: name_tok.map(|t| (self.graph.intern(&t.text), t.range)),
            type_path: leading_path(&self.graph, type_tokens, None),
        });
    }

    // ------------------------------------------------------------------
    // Receivers
    // ------------------------------------------------------------------

    /// Resolve the scope a qualified declarator names, using everything
    /// declared so far. `a::b::Bar::baz` resolves `a::b::Bar`.
    fn resolve_receiver(&self, path: &PathOcc) -> Option<ScopeId> {
        let prefix = &path.segs[..path.segs.len() - 1];
        let start = if path.absolute {
            GLOBAL_SCOPE
        } else {
            self.scope()
        };
        self.graph.resolve_type_from(start, prefix)
    }

    fn report_unresolved_receiver(&mut self, path: &PathOcc) {
        let prefix = &path.segs[..path.segs.len() - 1];
        let text = prefix
            .iter()
            .map(|&n| self.graph.name_text(n).to_string())
            .collect::<Vec<_>>()
            .join("::");
        warn!(file = %self.file, path = %text, "receiver scope not found");
        self.collector
            .unresolved_receiver(self.file, self.index, path.full_range, &text);
    }

    // ------------------------------------------------------------------
    // Skipping
    // ------------------------------------------------------------------

    fn skip_to_semi(&mut self) {
        loop {
            match self.current().kind {
                TokenKind::Semi => {
                    self.bump();
                    return;
                }
                TokenKind::LBrace | TokenKind::RBrace | TokenKind::Eof => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Consume a constructor initializer list up to the body `{`. Brace
    /// initializers inside the list (`: x{0}`) are told apart from the
    /// body by the token before them.
    fn skip_to_body(&mut self) {
        let mut depth = 0usize;
        let mut prev = TokenKind::Colon;
        loop {
            match self.current().kind {
                TokenKind::Eof | TokenKind::RBrace | TokenKind::Semi => return,
                TokenKind::LParen | TokenKind::LBracket => {
                    depth += 1;
                    prev = self.bump().kind;
                }
                TokenKind::RParen | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1);
                    prev = self.bump().kind;
                }
                TokenKind::LBrace if depth == 0 => {
                    if matches!(prev, TokenKind::Ident | TokenKind::Gt) {
                        self.bump();
                        self.skip_balanced(TokenKind::LBrace, TokenKind::RBrace, 1);
                        prev = TokenKind::RBrace;
                    } else {
                        return;
                    }
                }
                _ => prev = self.bump().kind,
            }
        }
    }

    /// Consume an initializer expression after `=`, balancing every
    /// bracket kind, stopping before a top-level `,` or `;`.
    fn skip_initializer(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.current().kind {
                TokenKind::Eof => return,
                TokenKind::Semi | TokenKind::Comma if depth == 0 => return,
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                    depth += 1;
                    self.bump();
                }
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.saturating_sub(1);
                    self.bump();
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    /// Consume a bitfield width or labeled-statement tail up to `;`.
    fn skip_colon_tail(&mut self) {
        loop {
            match self.current().kind {
                TokenKind::Semi | TokenKind::LBrace | TokenKind::RBrace | TokenKind::Eof => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind, mut depth: usize) {
        while depth > 0 {
            let kind = self.current().kind;
            if kind == TokenKind::Eof {
                return;
            }
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth -= 1;
            }
            self.bump();
        }
    }

    /// Skip `<...>` if it balances before a structural stop; restores the
    /// cursor and reports failure when it reads like a comparison instead.
    fn try_skip_template_args(&mut self) -> bool {
        let saved = self.pos;
        self.bump();
        let mut depth = 1i32;
        loop {
            match self.current().kind {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => {
                    depth -= 1;
                    if depth <= 0 {
                        self.bump();
                        return true;
                    }
                }
                TokenKind::Op if self.current().text == ">>" => {
                    depth -= 2;
                    if depth <= 0 {
                        self.bump();
                        return true;
                    }
                }
                TokenKind::Semi
                | TokenKind::LBrace
                | TokenKind::RBrace
                | TokenKind::Eof => {
                    self.pos = saved;
                    return false;
                }
                _ => {}
            }
            self.bump();
        }
    }

    // ------------------------------------------------------------------
    // Declaration helpers
    // ------------------------------------------------------------------

    fn declare_type(&mut self, scope: ScopeId, name: Name, range: TextRange, type_path: Vec<Name>) {
        let visibility = self.access();
        self.graph.declare(
            scope,
            Declaration {
                name,
                kind: DeclKind::Type,
                visibility,
                scope,
                type_path,
                signature: None,
                range,
            },
        );
    }
}

/// The type path of the occurrence before the declarator, if any.
fn type_path_before(paths: &[&PathOcc]) -> Vec<Name> {
    if paths.len() >= 2 {
        paths[paths.len() - 2].segs.clone()
    } else {
        Vec::new()
    }
}

/// First identifier path in a token run: `const a::b::Foo *` gives
/// `[a, b, Foo]`. A token at `skip` (the declared name) is ignored.
fn leading_path(graph: &ScopeGraph, tokens: &[&Token], skip: Option<TextRange>) -> Vec<Name> {
    let mut path = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let tok = tokens[i];
        if tok.kind == TokenKind::Ident && Some(tok.range) != skip {
            path.push(graph.intern(&tok.text));
            while i + 2 < tokens.len()
                && tokens[i + 1].kind == TokenKind::ColonColon
                && tokens[i + 2].kind == TokenKind::Ident
            {
                path.push(graph.intern(&tokens[i + 2].text));
                i += 2;
            }
            break;
        }
        i += 1;
    }
    path
}

// ============================================================================
// TESTS
// ============================================================================
