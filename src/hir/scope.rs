//! The scope graph: scopes, declarations, and the edges between them.
//!
//! One graph describes one parsed buffer. The extractor builds it in a
//! single pass, [`ScopeGraph::finish`] resolves the lazily recorded base
//! and using edges, and from then on the graph is immutable: every query
//! the resolver or the IDE layer runs is a pure read.
//!
//! Two structural rules hold throughout:
//! - Reopening is identity-keyed: every physical `namespace A { ... }`
//!   block under the same parent maps to one logical scope node, so
//!   declarations from all reopenings pool together.
//! - Base edges never form cycles. Self-inheritance is rejected when the
//!   edge is attached; cycles among resolved edges are broken in `finish`
//!   by dropping the closing edge, with a diagnostic, while everything
//!   else stays queryable.

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::base::{FileId, Interner, LineIndex, Name, TextRange, TextSize};
use crate::hir::diagnostics::DiagnosticCollector;
use crate::hir::ids::{DeclId, ScopeId};
use crate::hir::symbols::{DeclKind, Declaration, ScopeKind};

/// The root scope of every graph.
pub const GLOBAL_SCOPE: ScopeId = ScopeId::new(0);

// ============================================================================
// EDGES
// ============================================================================

/// An inheritance edge recorded at parse time and resolved in `finish`.
#[derive(Clone, Debug)]
pub struct BaseRef {
    /// The written path, e.g. `Foo` or `a::b::Foo`.
    pub path: Vec<Name>,
    /// Range of the written base name.
    pub range: TextRange,
    /// Resolved target class scope, if any.
    pub resolved: Option<ScopeId>,
    /// True when the edge closed an inheritance cycle and was dropped.
    pub dropped: bool,
}

impl BaseRef {
    /// The edge as member collection sees it: resolved and not dropped.
    pub fn target(&self) -> Option<ScopeId> {
        if self.dropped { None } else { self.resolved }
    }
}

/// `using namespace P;` vs `using P::name;`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UsingKind {
    Directive,
    Declaration,
}

/// Resolved target of a using edge.
#[derive(Clone, Debug)]
pub enum UsingTarget {
    /// A whole namespace made visible by a directive.
    Namespace(ScopeId),
    /// The declarations a using-declaration names.
    Symbols(Vec<DeclId>),
}

/// A using edge recorded at parse time and resolved in `finish`.
#[derive(Clone, Debug)]
pub struct UsingRef {
    pub path: Vec<Name>,
    pub kind: UsingKind,
    pub range: TextRange,
    pub target: Option<UsingTarget>,
}

// ============================================================================
// SCOPE NODES
// ============================================================================

/// One scope node.
#[derive(Debug)]
pub struct Scope {
    /// `None` for the global scope and anonymous blocks.
    pub name: Option<Name>,
    pub kind: ScopeKind,
    /// Owning parent; `None` only for the global scope.
    pub parent: Option<ScopeId>,
    /// For function bodies defined out of line (`void Foo::get() { ... }`):
    /// the class scope the qualified name named.
    pub receiver: Option<ScopeId>,
    pub bases: Vec<BaseRef>,
    pub usings: Vec<UsingRef>,
    /// Physical body extents. Reopened scopes accumulate one per block;
    /// an unclosed scope extends to the end of the buffer.
    pub extents: Vec<TextRange>,
    decls: Vec<DeclId>,
    by_name: FxHashMap<Name, Vec<DeclId>>,
}

impl Scope {
    fn new(name: Option<Name>, kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self {
            name,
            kind,
            parent,
            receiver: None,
            bases: Vec::new(),
            usings: Vec::new(),
            extents: Vec::new(),
            decls: Vec::new(),
            by_name: FxHashMap::default(),
        }
    }

    /// Declarations in insertion order.
    pub fn decls(&self) -> &[DeclId] {
        &self.decls
    }

    /// Declarations sharing one name, in insertion order.
    pub fn decls_named(&self, name: Name) -> &[DeclId] {
        self.by_name.get(&name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

// ============================================================================
// THE GRAPH
// ============================================================================

/// Scope graph for one buffer.
pub struct ScopeGraph {
    file: FileId,
    interner: Interner,
    scopes: Vec<Scope>,
    decls: Vec<Declaration>,
    /// Identity key for reopening: all blocks of `namespace A` under one
    /// parent, and all definitions of `class C` under one parent, share
    /// the scope this map points to.
    reopened: FxHashMap<(Name, ScopeKind, ScopeId), ScopeId>,
    finished: bool,
}

impl ScopeGraph {
    /// Create a graph containing only the global scope.
    pub fn new(file: FileId) -> Self {
        Self {
            file,
            interner: Interner::new(),
            scopes: vec![Scope::new(None, ScopeKind::Global, None)],
            decls: Vec::new(),
            reopened: FxHashMap::default(),
            finished: false,
        }
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// Intern an identifier in this graph's interner.
    pub fn intern(&self, text: &str) -> Name {
        self.interner.intern(text)
    }

    /// The text of an interned name.
    pub fn name_text(&self, name: Name) -> SmolStr {
        self.interner.get(name)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.index()]
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    /// Iterate all declarations in discovery order.
    pub fn all_decls(&self) -> impl Iterator<Item = (DeclId, &Declaration)> {
        self.decls
            .iter()
            .enumerate()
            .map(|(i, d)| (DeclId::new(i as u32), d))
    }

    // ------------------------------------------------------------------
    // Construction (extractor-facing)
    // ------------------------------------------------------------------

    /// Allocate a fresh scope. Used for function bodies and blocks, which
    /// never merge.
    pub fn alloc_scope(&mut self, name: Option<Name>, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        debug_assert!(!self.finished);
        let id = ScopeId::new(self.scopes.len() as u32);
        self.scopes.push(Scope::new(name, kind, Some(parent)));
        id
    }

    /// Look up or create the logical scope for `(name, kind)` under
    /// `parent`. Reopening `namespace A` or redeclaring `class C` lands on
    /// the node created the first time around.
    pub fn reopen(&mut self, name: Name, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        debug_assert!(!self.finished);
        debug_assert!(kind.is_reopenable());
        if let Some(&existing) = self.reopened.get(&(name, kind, parent)) {
            return existing;
        }
        let id = self.alloc_scope(Some(name), kind, parent);
        self.reopened.insert((name, kind, parent), id);
        id
    }

    /// Record one physical body extent of a scope.
    pub fn push_extent(&mut self, scope: ScopeId, range: TextRange) {
        debug_assert!(!self.finished);
        self.scopes[scope.index()].extents.push(range);
    }

    /// Widen the last recorded extent of `scope` to end at `end`.
    pub fn close_extent(&mut self, scope: ScopeId, end: TextSize) {
        debug_assert!(!self.finished);
        if let Some(last) = self.scopes[scope.index()].extents.last_mut() {
            *last = TextRange::new(last.start(), end);
        }
    }

    pub fn set_receiver(&mut self, scope: ScopeId, receiver: ScopeId) {
        debug_assert!(!self.finished);
        self.scopes[scope.index()].receiver = Some(receiver);
    }

    /// Add a declaration to `scope`.
    ///
    /// Idempotent: if the scope already holds a declaration with the same
    /// name, kind, and signature, the existing id is returned and nothing
    /// changes. Re-declaring `int get();` from an out-of-line definition
    /// therefore never duplicates the member.
    pub fn declare(&mut self, scope: ScopeId, mut decl: Declaration) -> DeclId {
        debug_assert!(!self.finished);
        decl.scope = scope;

        for &existing_id in self.scopes[scope.index()].decls_named(decl.name) {
            let existing = &self.decls[existing_id.index()];
            if existing.kind == decl.kind && existing.signature == decl.signature {
                return existing_id;
            }
        }

        let id = DeclId::new(self.decls.len() as u32);
        let name = decl.name;
        self.decls.push(decl);
        let s = &mut self.scopes[scope.index()];
        s.decls.push(id);
        s.by_name.entry(name).or_default().push(id);
        id
    }

    /// Record an inheritance edge from `derived` to the class named by
    /// `path`. Resolution happens in [`finish`](Self::finish).
    ///
    /// Returns `false` when the edge names the derived class itself; the
    /// edge is not recorded and the caller reports it.
    pub fn attach_base(&mut self, derived: ScopeId, path: Vec<Name>, range: TextRange) -> bool {
        debug_assert!(!self.finished);
        if path.len() == 1 && self.scopes[derived.index()].name == Some(path[0]) {
            return false;
        }
        self.scopes[derived.index()].bases.push(BaseRef {
            path,
            range,
            resolved: None,
            dropped: false,
        });
        true
    }

    /// Record a using edge in `scope`. Resolution happens in `finish`.
    pub fn add_using(&mut self, scope: ScopeId, path: Vec<Name>, kind: UsingKind, range: TextRange) {
        debug_assert!(!self.finished);
        self.scopes[scope.index()].usings.push(UsingRef {
            path,
            kind,
            range,
            target: None,
        });
    }

    // ------------------------------------------------------------------
    // Finishing
    // ------------------------------------------------------------------

    /// Resolve base and using edges, break inheritance cycles, and freeze
    /// the graph. Unresolved edges and dropped cycles become diagnostics;
    /// none of them fail the parse.
    pub fn finish(&mut self, index: &LineIndex, collector: &mut DiagnosticCollector) {
        debug_assert!(!self.finished);
        self.resolve_usings(index, collector);
        self.resolve_bases(index, collector);
        self.drop_cycles(index, collector);
        self.finished = true;
        debug!(
            file = %self.file,
            scopes = self.scopes.len(),
            decls = self.decls.len(),
            "scope graph finished"
        );
    }

    fn resolve_usings(&mut self, index: &LineIndex, collector: &mut DiagnosticCollector) {
        // Two-phase: resolve against the graph, then write the targets back
        let mut resolved: Vec<(ScopeId, usize, Option<UsingTarget>)> = Vec::new();

        for (i, scope) in self.scopes.iter().enumerate() {
            let id = ScopeId::new(i as u32);
            for (u, using) in scope.usings.iter().enumerate() {
                let target = match using.kind {
                    UsingKind::Directive => self
                        .resolve_namespace_from(id, &using.path)
                        .map(UsingTarget::Namespace),
                    UsingKind::Declaration => self.resolve_using_symbols(id, &using.path),
                };
                resolved.push((id, u, target));
            }
        }

        for (scope, u, target) in resolved {
            if target.is_none() {
                let using = &self.scopes[scope.index()].usings[u];
                let path = self.path_text(&using.path);
                warn!(file = %self.file, path = %path, "using target not found");
                collector.unresolved_using(self.file, index, using.range, &path);
            }
            self.scopes[scope.index()].usings[u].target = target;
        }
    }

    fn resolve_bases(&mut self, index: &LineIndex, collector: &mut DiagnosticCollector) {
        let mut resolved: Vec<(ScopeId, usize, Option<ScopeId>)> = Vec::new();

        for (i, scope) in self.scopes.iter().enumerate() {
            let id = ScopeId::new(i as u32);
            // Nearest-enclosing-wins starts in the scope the derived class
            // sits in, so a base declared beside it shadows one further out
            let start = scope.parent.unwrap_or(GLOBAL_SCOPE);
            for (b, base) in scope.bases.iter().enumerate() {
                let target = self.resolve_type_from(start, &base.path);
                resolved.push((id, b, target));
            }
        }

        for (scope, b, target) in resolved {
            if target.is_none() {
                let base = &self.scopes[scope.index()].bases[b];
                let path = self.path_text(&base.path);
                warn!(file = %self.file, base = %path, "base class not found");
                collector.unresolved_base(self.file, index, base.range, &path);
            }
            self.scopes[scope.index()].bases[b].resolved = target;
        }
    }

    /// Depth-first search over resolved base edges; an edge reaching a
    /// scope currently on the stack closes a cycle and is dropped.
    fn drop_cycles(&mut self, index: &LineIndex, collector: &mut DiagnosticCollector) {
        #[derive(Copy, Clone, PartialEq)]
        enum Mark {
            White,
            Gray,
            Black,
        }

        fn visit(
            graph: &ScopeGraph,
            id: ScopeId,
            marks: &mut [Mark],
            drops: &mut Vec<(ScopeId, usize)>,
        ) {
            marks[id.index()] = Mark::Gray;
            for (b, base) in graph.scopes[id.index()].bases.iter().enumerate() {
                let Some(target) = base.resolved else { continue };
                match marks[target.index()] {
                    Mark::Gray => drops.push((id, b)),
                    Mark::White => visit(graph, target, marks, drops),
                    Mark::Black => {}
                }
            }
            marks[id.index()] = Mark::Black;
        }

        let mut marks = vec![Mark::White; self.scopes.len()];
        let mut drops: Vec<(ScopeId, usize)> = Vec::new();
        for i in 0..self.scopes.len() {
            if marks[i] == Mark::White {
                visit(self, ScopeId::new(i as u32), &mut marks, &mut drops);
            }
        }

        for (scope, b) in drops {
            let derived = self.scope_display_name(scope);
            let (range, base_name, target) = {
                let base = &self.scopes[scope.index()].bases[b];
                (base.range, self.path_text(&base.path), base.resolved)
            };
            let base_decl = target.and_then(|t| self.type_decl_range(t));
            warn!(
                file = %self.file,
                derived = %derived,
                base = %base_name,
                "dropping cycle-closing base edge"
            );
            collector.cyclic_inheritance(self.file, index, range, &derived, &base_name, base_decl);
            self.scopes[scope.index()].bases[b].dropped = true;
        }
    }

    /// Range of the type declaration that introduced `scope`, if any.
    fn type_decl_range(&self, scope: ScopeId) -> Option<TextRange> {
        let s = &self.scopes[scope.index()];
        let name = s.name?;
        let parent = s.parent?;
        self.scopes[parent.index()]
            .decls_named(name)
            .iter()
            .map(|&id| &self.decls[id.index()])
            .find(|d| d.kind == DeclKind::Type)
            .map(|d| d.range)
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// The innermost scope whose extent contains `offset`. Positions
    /// outside every recorded extent fall back to the global scope, so
    /// this never fails.
    pub fn scope_at(&self, offset: TextSize) -> ScopeId {
        let mut best = GLOBAL_SCOPE;
        let mut best_len: Option<TextSize> = None;

        for (i, scope) in self.scopes.iter().enumerate() {
            for extent in &scope.extents {
                if extent.start() <= offset && offset <= extent.end() {
                    let len = extent.len();
                    let better = match best_len {
                        None => true,
                        Some(b) => len < b || (len == b && i > best.index()),
                    };
                    if better {
                        best = ScopeId::new(i as u32);
                        best_len = Some(len);
                    }
                }
            }
        }
        best
    }

    /// Direct child scope of `parent` with the given name and kind.
    pub fn find_child_scope(&self, parent: ScopeId, name: Name, kind: ScopeKind) -> Option<ScopeId> {
        self.reopened.get(&(name, kind, parent)).copied()
    }

    /// Resolve a (possibly qualified) type path starting at `start` and
    /// walking enclosing scopes outward; the first scope level that knows
    /// the leading segment wins. Typedef chains are followed; using edges
    /// at each level are consulted after direct children.
    pub fn resolve_type_from(&self, start: ScopeId, path: &[Name]) -> Option<ScopeId> {
        let mut visited = FxHashSet::default();
        self.resolve_type_walk(start, path, &mut visited)
    }

    /// Resolve a type path confined to `scope`, with no outward walk.
    /// This is the lookup a `::` chain uses once its head is anchored.
    pub fn resolve_type_in(&self, scope: ScopeId, path: &[Name]) -> Option<ScopeId> {
        let mut visited = FxHashSet::default();
        self.descend(scope, path, &mut visited)
    }

    fn resolve_type_walk(
        &self,
        start: ScopeId,
        path: &[Name],
        visited: &mut FxHashSet<DeclId>,
    ) -> Option<ScopeId> {
        let (&first, rest) = path.split_first()?;

        let mut cur = Some(start);
        while let Some(s) = cur {
            if let Some(found) = self.lookup_type_here(s, first, visited) {
                return self.descend(found, rest, visited);
            }
            cur = self.scope(s).parent;
        }
        None
    }

    /// One level of type lookup: child scopes first, then typedef/alias
    /// declarations, then using edges.
    fn lookup_type_here(
        &self,
        s: ScopeId,
        name: Name,
        visited: &mut FxHashSet<DeclId>,
    ) -> Option<ScopeId> {
        if let Some(id) = self.find_child_scope(s, name, ScopeKind::Class) {
            return Some(id);
        }
        if let Some(id) = self.find_child_scope(s, name, ScopeKind::Namespace) {
            return Some(id);
        }

        for &decl_id in self.scope(s).decls_named(name) {
            if let Some(target) = self.follow_type_decl(decl_id, visited) {
                return Some(target);
            }
        }

        for using in &self.scope(s).usings {
            match &using.target {
                Some(UsingTarget::Namespace(ns)) => {
                    if let Some(id) = self.find_child_scope(*ns, name, ScopeKind::Class) {
                        return Some(id);
                    }
                    if let Some(id) = self.find_child_scope(*ns, name, ScopeKind::Namespace) {
                        return Some(id);
                    }
                    for &decl_id in self.scope(*ns).decls_named(name) {
                        if let Some(target) = self.follow_type_decl(decl_id, visited) {
                            return Some(target);
                        }
                    }
                }
                Some(UsingTarget::Symbols(decls)) => {
                    for &decl_id in decls {
                        if self.decl(decl_id).name == name {
                            if let Some(target) = self.follow_type_decl(decl_id, visited) {
                                return Some(target);
                            }
                        }
                    }
                }
                None => {}
            }
        }

        None
    }

    /// Resolve a `Type` declaration to the scope it names: a class's own
    /// body, or, for a typedef/alias, whatever its target chain ends at.
    pub(crate) fn follow_type_decl(
        &self,
        decl_id: DeclId,
        visited: &mut FxHashSet<DeclId>,
    ) -> Option<ScopeId> {
        let decl = self.decl(decl_id);
        if decl.kind != DeclKind::Type {
            return None;
        }
        if !visited.insert(decl_id) {
            // typedef cycle; give up on this chain
            return None;
        }

        if decl.type_path.is_empty() {
            // A class/struct declaration: its body is the child scope of
            // the scope the declaration lives in
            self.find_child_scope(decl.scope, decl.name, ScopeKind::Class)
        } else {
            // typedef/alias: resolve the target from where it was written
            self.resolve_type_walk(decl.scope, &decl.type_path, visited)
        }
    }

    fn descend(
        &self,
        mut scope: ScopeId,
        rest: &[Name],
        visited: &mut FxHashSet<DeclId>,
    ) -> Option<ScopeId> {
        for &seg in rest {
            scope = self.lookup_type_in(scope, seg, visited)?;
        }
        Some(scope)
    }

    /// Type lookup confined to one scope (no outward walk). Used while
    /// descending an already-anchored qualified path.
    fn lookup_type_in(
        &self,
        s: ScopeId,
        name: Name,
        visited: &mut FxHashSet<DeclId>,
    ) -> Option<ScopeId> {
        if let Some(id) = self.find_child_scope(s, name, ScopeKind::Class) {
            return Some(id);
        }
        if let Some(id) = self.find_child_scope(s, name, ScopeKind::Namespace) {
            return Some(id);
        }
        for &decl_id in self.scope(s).decls_named(name) {
            if let Some(target) = self.follow_type_decl(decl_id, visited) {
                return Some(target);
            }
        }
        None
    }

    /// Namespace lookup for using-directives: nearest enclosing scope with
    /// a visible namespace of that name, then descend.
    fn resolve_namespace_from(&self, start: ScopeId, path: &[Name]) -> Option<ScopeId> {
        let (&first, rest) = path.split_first()?;

        let mut cur = Some(start);
        let mut anchor = None;
        while let Some(s) = cur {
            if let Some(found) = self.find_child_scope(s, first, ScopeKind::Namespace) {
                anchor = Some(found);
                break;
            }
            cur = self.scope(s).parent;
        }

        let mut scope = anchor?;
        for &seg in rest {
            scope = self.find_child_scope(scope, seg, ScopeKind::Namespace)?;
        }
        Some(scope)
    }

    /// Resolve a using-declaration path to the declarations it names.
    fn resolve_using_symbols(&self, start: ScopeId, path: &[Name]) -> Option<UsingTarget> {
        let (&last, prefix) = path.split_last()?;

        let holder = if prefix.is_empty() {
            self.scope(start).parent.unwrap_or(GLOBAL_SCOPE)
        } else {
            self.resolve_type_from(start, prefix)?
        };

        let decls = self.scope(holder).decls_named(last).to_vec();
        if decls.is_empty() {
            return None;
        }
        Some(UsingTarget::Symbols(decls))
    }

    // ------------------------------------------------------------------
    // Display helpers
    // ------------------------------------------------------------------

    /// `Name1::Name2::Foo` style path of a scope, built from named
    /// ancestors. The global scope renders as an empty string.
    pub fn qualified_name(&self, scope: ScopeId) -> SmolStr {
        let mut parts: Vec<SmolStr> = Vec::new();
        let mut cur = Some(scope);
        while let Some(s) = cur {
            let node = self.scope(s);
            if let Some(name) = node.name {
                parts.push(self.name_text(name));
            }
            cur = node.parent;
        }
        parts.reverse();
        SmolStr::new(parts.join("::"))
    }

    fn scope_display_name(&self, scope: ScopeId) -> SmolStr {
        match self.scope(scope).name {
            Some(name) => self.name_text(name),
            None => SmolStr::new_static("<anonymous>"),
        }
    }

    fn path_text(&self, path: &[Name]) -> String {
        path.iter()
            .map(|&n| self.name_text(n).to_string())
            .collect::<Vec<_>>()
            .join("::")
    }
}

impl std::fmt::Debug for ScopeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeGraph")
            .field("file", &self.file)
            .field("scopes", &self.scopes.len())
            .field("decls", &self.decls.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::symbols::Visibility;

    fn empty_range() -> TextRange {
        TextRange::empty(TextSize::from(0))
    }

    fn make_decl(graph: &ScopeGraph, name: &str, kind: DeclKind) -> Declaration {
        Declaration {
            name: graph.intern(name),
            kind,
            visibility: Visibility::Public,
            scope: GLOBAL_SCOPE,
            type_path: Vec::new(),
            signature: None,
            range: empty_range(),
        }
    }

    fn finish(graph: &mut ScopeGraph) -> DiagnosticCollector {
        let index = LineIndex::new("");
        let mut collector = DiagnosticCollector::new();
        graph.finish(&index, &mut collector);
        collector
    }

    #[test]
    fn test_reopen_merges_physical_blocks() {
        let mut graph = ScopeGraph::new(FileId::new(0));
        let a = graph.intern("A");

        let first = graph.reopen(a, ScopeKind::Namespace, GLOBAL_SCOPE);
        let second = graph.reopen(a, ScopeKind::Namespace, GLOBAL_SCOPE);
        assert_eq!(first, second);

        graph.push_extent(first, TextRange::new(0.into(), 10.into()));
        graph.push_extent(second, TextRange::new(20.into(), 30.into()));
        assert_eq!(graph.scope(first).extents.len(), 2);
    }

    #[test]
    fn test_same_name_different_parent_not_merged() {
        let mut graph = ScopeGraph::new(FileId::new(0));
        let a = graph.intern("A");
        let inner = graph.intern("inner");

        let outer1 = graph.reopen(a, ScopeKind::Namespace, GLOBAL_SCOPE);
        let nested = graph.reopen(inner, ScopeKind::Namespace, outer1);
        let stray = graph.reopen(inner, ScopeKind::Namespace, GLOBAL_SCOPE);
        assert_ne!(nested, stray);
    }

    #[test]
    fn test_declare_is_idempotent() {
        let mut graph = ScopeGraph::new(FileId::new(0));
        let foo = graph.intern("foo");
        let class = graph.reopen(foo, ScopeKind::Class, GLOBAL_SCOPE);

        let decl = make_decl(&graph, "get", DeclKind::Method);
        let first = graph.declare(class, decl.clone());
        let second = graph.declare(class, decl);

        assert_eq!(first, second);
        assert_eq!(graph.scope(class).len(), 1);
    }

    #[test]
    fn test_declare_distinct_signatures_coexist() {
        let mut graph = ScopeGraph::new(FileId::new(0));
        let foo = graph.intern("foo");
        let class = graph.reopen(foo, ScopeKind::Class, GLOBAL_SCOPE);

        let mut a = make_decl(&graph, "publish", DeclKind::Method);
        a.signature = Some("(int)".into());
        let mut b = make_decl(&graph, "publish", DeclKind::Method);
        b.signature = Some("(int, int)".into());

        let first = graph.declare(class, a);
        let second = graph.declare(class, b);
        assert_ne!(first, second);
        assert_eq!(graph.scope(class).len(), 2);
    }

    #[test]
    fn test_self_inheritance_rejected_at_attach() {
        let mut graph = ScopeGraph::new(FileId::new(0));
        let foo = graph.intern("Foo");
        let class = graph.reopen(foo, ScopeKind::Class, GLOBAL_SCOPE);

        let attached = graph.attach_base(class, vec![foo], empty_range());
        assert!(!attached);
        assert!(graph.scope(class).bases.is_empty());
    }

    #[test]
    fn test_base_resolves_nearest_enclosing() {
        let mut graph = ScopeGraph::new(FileId::new(0));
        let base_name = graph.intern("Base");

        // Base at global AND inside namespace N; the derived class in N
        // must see N's
        let outer_base = graph.reopen(base_name, ScopeKind::Class, GLOBAL_SCOPE);
        let n = graph.reopen(graph.intern("N"), ScopeKind::Namespace, GLOBAL_SCOPE);
        let inner_base = graph.reopen(base_name, ScopeKind::Class, n);
        let derived = graph.reopen(graph.intern("D"), ScopeKind::Class, n);
        graph.attach_base(derived, vec![base_name], empty_range());

        let collector = finish(&mut graph);
        assert_eq!(collector.error_count(), 0);
        assert_eq!(graph.scope(derived).bases[0].target(), Some(inner_base));
        assert_ne!(graph.scope(derived).bases[0].target(), Some(outer_base));
    }

    #[test]
    fn test_unresolved_base_warns_but_parses() {
        let mut graph = ScopeGraph::new(FileId::new(0));
        let derived = graph.reopen(graph.intern("D"), ScopeKind::Class, GLOBAL_SCOPE);
        graph.attach_base(derived, vec![graph.intern("Ghost")], empty_range());

        let collector = finish(&mut graph);
        assert_eq!(collector.warning_count(), 1);
        assert_eq!(graph.scope(derived).bases[0].target(), None);
    }

    #[test]
    fn test_cycle_closing_edge_dropped() {
        let mut graph = ScopeGraph::new(FileId::new(0));
        let a_name = graph.intern("A");
        let b_name = graph.intern("B");
        let a = graph.reopen(a_name, ScopeKind::Class, GLOBAL_SCOPE);
        let b = graph.reopen(b_name, ScopeKind::Class, GLOBAL_SCOPE);
        graph.attach_base(a, vec![b_name], empty_range());
        graph.attach_base(b, vec![a_name], empty_range());

        let collector = finish(&mut graph);

        // Exactly one edge dropped, one kept, one diagnostic
        let kept: Vec<bool> = [a, b]
            .iter()
            .map(|&s| graph.scope(s).bases[0].target().is_some())
            .collect();
        assert_eq!(kept.iter().filter(|&&k| k).count(), 1);
        assert_eq!(collector.error_count(), 1);
        assert!(
            collector.diagnostics()[0]
                .code
                .as_deref()
                .unwrap()
                .contains("E0001")
        );
    }

    #[test]
    fn test_typedef_chain_resolves_to_class() {
        let mut graph = ScopeGraph::new(FileId::new(0));
        let foo = graph.intern("Foo");
        let class = graph.reopen(foo, ScopeKind::Class, GLOBAL_SCOPE);
        let class_decl = make_decl(&graph, "Foo", DeclKind::Type);
        graph.declare(GLOBAL_SCOPE, class_decl);

        let mut stage1 = make_decl(&graph, "stage1_Foo", DeclKind::Type);
        stage1.type_path = vec![foo];
        graph.declare(GLOBAL_SCOPE, stage1);

        let mut stage2 = make_decl(&graph, "stage2_Foo", DeclKind::Type);
        stage2.type_path = vec![graph.intern("stage1_Foo")];
        graph.declare(GLOBAL_SCOPE, stage2);

        finish(&mut graph);

        let resolved = graph.resolve_type_from(GLOBAL_SCOPE, &[graph.intern("stage2_Foo")]);
        assert_eq!(resolved, Some(class));
    }

    #[test]
    fn test_typedef_cycle_gives_up_quietly() {
        let mut graph = ScopeGraph::new(FileId::new(0));
        let mut a = make_decl(&graph, "a", DeclKind::Type);
        a.type_path = vec![graph.intern("b")];
        graph.declare(GLOBAL_SCOPE, a);
        let mut b = make_decl(&graph, "b", DeclKind::Type);
        b.type_path = vec![graph.intern("a")];
        graph.declare(GLOBAL_SCOPE, b);

        finish(&mut graph);

        let resolved = graph.resolve_type_from(GLOBAL_SCOPE, &[graph.intern("a")]);
        assert_eq!(resolved, None);
    }

    #[test]
    fn test_scope_at_picks_innermost_extent() {
        let mut graph = ScopeGraph::new(FileId::new(0));
        graph.push_extent(GLOBAL_SCOPE, TextRange::new(0.into(), 100.into()));
        let n = graph.reopen(graph.intern("N"), ScopeKind::Namespace, GLOBAL_SCOPE);
        graph.push_extent(n, TextRange::new(10.into(), 90.into()));
        let f = graph.alloc_scope(None, ScopeKind::Function, n);
        graph.push_extent(f, TextRange::new(20.into(), 40.into()));

        assert_eq!(graph.scope_at(TextSize::from(5)), GLOBAL_SCOPE);
        assert_eq!(graph.scope_at(TextSize::from(15)), n);
        assert_eq!(graph.scope_at(TextSize::from(30)), f);
        // At the very end of an unclosed extent the scope still holds
        assert_eq!(graph.scope_at(TextSize::from(40)), f);
    }

    #[test]
    fn test_scope_at_reopened_namespace_both_blocks() {
        let mut graph = ScopeGraph::new(FileId::new(0));
        graph.push_extent(GLOBAL_SCOPE, TextRange::new(0.into(), 100.into()));
        let a = graph.reopen(graph.intern("A"), ScopeKind::Namespace, GLOBAL_SCOPE);
        graph.push_extent(a, TextRange::new(10.into(), 30.into()));
        graph.push_extent(a, TextRange::new(50.into(), 70.into()));

        assert_eq!(graph.scope_at(TextSize::from(20)), a);
        assert_eq!(graph.scope_at(TextSize::from(60)), a);
        assert_eq!(graph.scope_at(TextSize::from(40)), GLOBAL_SCOPE);
    }

    #[test]
    fn test_qualified_name() {
        let mut graph = ScopeGraph::new(FileId::new(0));
        let n1 = graph.reopen(graph.intern("Name1"), ScopeKind::Namespace, GLOBAL_SCOPE);
        let n2 = graph.reopen(graph.intern("Name2"), ScopeKind::Namespace, n1);
        let foo = graph.reopen(graph.intern("Foo"), ScopeKind::Class, n2);

        assert_eq!(graph.qualified_name(foo).as_str(), "Name1::Name2::Foo");
        assert_eq!(graph.qualified_name(GLOBAL_SCOPE).as_str(), "");
    }
}
