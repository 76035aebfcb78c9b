//! Name resolution over a finished scope graph.
//!
//! Two lookup modes cover every completion and navigation query:
//!
//! 1. **Unqualified**: a bare fragment typed somewhere in a body. The
//!    resolver walks scope levels outward from the cursor's scope and
//!    stops at the first level holding at least one match, so an inner
//!    declaration shadows every outer one wholesale. Bodies of out-of-line
//!    definitions splice their receiver class into the walk: inside
//!    `void Foo::get() { ... }` the members of `Foo` sit between the
//!    locals and the enclosing namespace.
//!
//! 2. **Member access**: a fragment typed after a receiver chain such as
//!    `myFoo.` or `a::b::Foo::`. The chain resolves left to right through
//!    variable types, typedef chains, and nested scopes; candidates then
//!    come from the final scope, walking its inheritance graph depth
//!    first with the most-derived declaration of each name shadowing the
//!    ones above it.
//!
//! Member candidates are always filtered by visibility from the query's
//! point of view, and constructors and destructors never complete after
//! member access.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::trace;

use crate::hir::ids::{DeclId, ScopeId};
use crate::hir::scope::{ScopeGraph, UsingTarget};
use crate::hir::symbols::{DeclKind, ScopeKind, Visibility};

// ============================================================================
// RECEIVER PATHS
// ============================================================================

/// Separator following a receiver segment.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Separator {
    /// `.` or `->`: the segment names a value, candidates are members of
    /// its type.
    Member,
    /// `::`: the segment names a scope.
    Scope,
}

/// One segment of a receiver chain.
#[derive(Clone, Debug)]
pub struct ReceiverSeg {
    pub name: SmolStr,
    pub sep: Separator,
}

/// A receiver chain read back from the buffer, outermost first:
/// `a::b::Foo::` becomes three segments, `myFoo.` one.
#[derive(Clone, Debug, Default)]
pub struct ReceiverPath {
    pub segments: Vec<ReceiverSeg>,
}

impl ReceiverPath {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The separator between the chain and the fragment under the cursor.
    pub fn last_separator(&self) -> Option<Separator> {
        self.segments.last().map(|s| s.sep)
    }
}

// ============================================================================
// POINT OF VIEW
// ============================================================================

/// Where a query stands relative to the class it reads members from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum PointOfView {
    /// Lexically inside the class (or one of its nested classes or member
    /// bodies): everything is visible.
    Inside,
    /// Inside a class derived from it: private stays hidden.
    Derived,
    /// Anywhere else: public only.
    Outside,
}

impl PointOfView {
    /// Whether a member with `vis` shows, given that `own` says the member
    /// belongs to the class the query is anchored on rather than one of
    /// its bases.
    fn admits(self, vis: Visibility, own: bool) -> bool {
        match self {
            PointOfView::Inside => own || vis != Visibility::Private,
            PointOfView::Derived => vis != Visibility::Private,
            PointOfView::Outside => vis == Visibility::Public,
        }
    }
}

/// Name filter of one lookup.
#[derive(Copy, Clone)]
struct Filter<'f> {
    fragment: &'f str,
    /// Exact name match (navigation) vs prefix match (completion).
    exact: bool,
    /// Keep only declarations a `.`/`->` chain can continue through.
    value_only: bool,
}

/// Per-walk constants of one member collection.
#[derive(Copy, Clone)]
struct MemberView<'f> {
    /// The class the query anchored on; only its own private members show
    /// from inside.
    start: ScopeId,
    pov: PointOfView,
    filter: Filter<'f>,
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Read-only resolution queries over one buffer's scope graph.
pub struct Resolver<'a> {
    graph: &'a ScopeGraph,
}

impl<'a> Resolver<'a> {
    pub fn new(graph: &'a ScopeGraph) -> Self {
        Self { graph }
    }

    // ------------------------------------------------------------------
    // Public queries
    // ------------------------------------------------------------------

    /// Candidates for a bare fragment at `origin`. Levels are searched
    /// outward and the first level with a match wins. An empty fragment
    /// matches everything, so it returns the innermost non-empty level.
    pub fn complete_unqualified(&self, origin: ScopeId, fragment: &str) -> Vec<DeclId> {
        let filter = Filter { fragment, exact: false, value_only: false };
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        for level in self.spliced_chain(origin) {
            self.level_candidates(origin, level, filter, &mut seen, &mut out);
            if !out.is_empty() {
                break;
            }
        }
        out
    }

    /// Candidates for `fragment` typed after `receiver` at `origin`.
    /// An unresolvable receiver yields no candidates, not an error.
    pub fn complete_members(
        &self,
        origin: ScopeId,
        receiver: &ReceiverPath,
        fragment: &str,
    ) -> Vec<DeclId> {
        let Some(scope) = self.resolve_receiver(origin, receiver) else {
            return Vec::new();
        };
        let filter = Filter {
            fragment,
            exact: false,
            value_only: receiver.last_separator() == Some(Separator::Member),
        };

        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        if self.graph.scope(scope).kind == ScopeKind::Class {
            self.collect_members(origin, scope, filter, &mut seen, &mut out);
        } else {
            self.collect_direct(scope, filter, &mut seen, &mut out);
        }
        out
    }

    /// Resolve a receiver chain to the scope candidates come from.
    pub fn resolve_receiver(&self, origin: ScopeId, receiver: &ReceiverPath) -> Option<ScopeId> {
        let mut current: Option<ScopeId> = None;
        for seg in &receiver.segments {
            let next = match current {
                None => self.resolve_first_segment(origin, seg),
                Some(scope) => self.resolve_next_segment(origin, scope, seg),
            };
            trace!(segment = %seg.name, resolved = next.is_some(), "receiver segment");
            current = Some(next?);
        }
        current
    }

    /// Declarations a bare name resolves to at `origin`, exact match.
    /// Used for navigation; ordering follows the candidate rules.
    pub fn lookup_unqualified(&self, origin: ScopeId, name: &str) -> Vec<DeclId> {
        let filter = Filter { fragment: name, exact: true, value_only: false };
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        for level in self.spliced_chain(origin) {
            self.level_candidates(origin, level, filter, &mut seen, &mut out);
            if !out.is_empty() {
                break;
            }
        }
        out
    }

    /// Declarations `name` resolves to as a member of `receiver`'s scope.
    pub fn lookup_member(
        &self,
        origin: ScopeId,
        receiver: &ReceiverPath,
        name: &str,
    ) -> Vec<DeclId> {
        let Some(scope) = self.resolve_receiver(origin, receiver) else {
            return Vec::new();
        };
        let filter = Filter { fragment: name, exact: true, value_only: false };
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        if self.graph.scope(scope).kind == ScopeKind::Class {
            self.collect_members(origin, scope, filter, &mut seen, &mut out);
        } else {
            self.collect_direct(scope, filter, &mut seen, &mut out);
        }
        out
    }

    /// The type scope a declaration leads to when the chain continues
    /// through it: a variable's declared type, a method's return type, a
    /// typedef's target.
    pub fn type_of_decl(&self, decl_id: DeclId) -> Option<ScopeId> {
        let decl = self.graph.decl(decl_id);
        match decl.kind {
            DeclKind::Type => {
                let mut visited = FxHashSet::default();
                self.graph.follow_type_decl(decl_id, &mut visited)
            }
            _ => {
                if decl.type_path.is_empty() {
                    None
                } else {
                    self.graph.resolve_type_from(decl.scope, &decl.type_path)
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Receiver chain steps
    // ------------------------------------------------------------------

    fn resolve_first_segment(&self, origin: ScopeId, seg: &ReceiverSeg) -> Option<ScopeId> {
        if seg.name == "this" && seg.sep == Separator::Member {
            return self.enclosing_class(origin);
        }
        match seg.sep {
            Separator::Scope => {
                let name = self.graph.intern(&seg.name);
                self.graph.resolve_type_from(origin, &[name])
            }
            Separator::Member => {
                let decl = self
                    .lookup_unqualified(origin, &seg.name)
                    .into_iter()
                    .find(|&d| self.graph.decl(d).kind.has_value_type())?;
                self.type_of_decl(decl)
            }
        }
    }

    fn resolve_next_segment(
        &self,
        origin: ScopeId,
        scope: ScopeId,
        seg: &ReceiverSeg,
    ) -> Option<ScopeId> {
        match seg.sep {
            Separator::Scope => {
                let name = self.graph.intern(&seg.name);
                self.graph.resolve_type_in(scope, &[name])
            }
            Separator::Member => {
                let filter = Filter { fragment: &seg.name, exact: true, value_only: true };
                let mut matches = Vec::new();
                let mut seen = FxHashSet::default();
                if self.graph.scope(scope).kind == ScopeKind::Class {
                    self.collect_members(origin, scope, filter, &mut seen, &mut matches);
                } else {
                    self.collect_direct(scope, filter, &mut seen, &mut matches);
                }
                let decl = matches.first().copied()?;
                self.type_of_decl(decl)
            }
        }
    }

    // ------------------------------------------------------------------
    // Scope chain
    // ------------------------------------------------------------------

    /// The lookup chain from `origin` outward. A function body defined
    /// out of line continues through its receiver instead of the scope
    /// it was written in.
    fn spliced_chain(&self, origin: ScopeId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut cur = Some(origin);
        while let Some(s) = cur {
            chain.push(s);
            let scope = self.graph.scope(s);
            cur = scope.receiver.or(scope.parent);
        }
        chain
    }

    /// The innermost class on the spliced chain, if any.
    fn enclosing_class(&self, origin: ScopeId) -> Option<ScopeId> {
        self.spliced_chain(origin)
            .into_iter()
            .find(|&s| self.graph.scope(s).kind == ScopeKind::Class)
    }

    /// Point of view of a query at `origin` on members of `target`.
    fn point_of_view(&self, origin: ScopeId, target: ScopeId) -> PointOfView {
        let classes: Vec<ScopeId> = self
            .spliced_chain(origin)
            .into_iter()
            .filter(|&s| self.graph.scope(s).kind == ScopeKind::Class)
            .collect();
        if classes.contains(&target) {
            return PointOfView::Inside;
        }
        for class in classes {
            if self.derives_from(class, target) {
                return PointOfView::Derived;
            }
        }
        PointOfView::Outside
    }

    fn derives_from(&self, class: ScopeId, ancestor: ScopeId) -> bool {
        let mut visited = FxHashSet::default();
        let mut stack = vec![class];
        while let Some(s) = stack.pop() {
            if !visited.insert(s) {
                continue;
            }
            for base in &self.graph.scope(s).bases {
                if let Some(target) = base.target() {
                    if target == ancestor {
                        return true;
                    }
                    stack.push(target);
                }
            }
        }
        false
    }

    // ------------------------------------------------------------------
    // Candidate collection
    // ------------------------------------------------------------------

    /// All matches at one scope level of the unqualified walk. Class
    /// levels include inherited members; every level consults its using
    /// edges after its direct declarations.
    fn level_candidates(
        &self,
        origin: ScopeId,
        level: ScopeId,
        filter: Filter<'_>,
        seen: &mut FxHashSet<DeclId>,
        out: &mut Vec<DeclId>,
    ) {
        if self.graph.scope(level).kind == ScopeKind::Class {
            self.collect_members(origin, level, filter, seen, out);
        } else {
            self.collect_direct(level, filter, seen, out);
        }
        trace!(
            level = level.index(),
            fragment = filter.fragment,
            hits = out.len(),
            "level searched"
        );
    }

    /// Direct declarations of a non-class scope, then its using imports.
    fn collect_direct(
        &self,
        scope: ScopeId,
        filter: Filter<'_>,
        seen: &mut FxHashSet<DeclId>,
        out: &mut Vec<DeclId>,
    ) {
        for &decl_id in self.graph.scope(scope).decls() {
            if self.matches(decl_id, filter) && seen.insert(decl_id) {
                out.push(decl_id);
            }
        }
        for using in &self.graph.scope(scope).usings {
            match &using.target {
                Some(UsingTarget::Namespace(ns)) => {
                    for &decl_id in self.graph.scope(*ns).decls() {
                        if self.matches(decl_id, filter) && seen.insert(decl_id) {
                            out.push(decl_id);
                        }
                    }
                }
                Some(UsingTarget::Symbols(decls)) => {
                    for &decl_id in decls {
                        if self.matches(decl_id, filter) && seen.insert(decl_id) {
                            out.push(decl_id);
                        }
                    }
                }
                None => {}
            }
        }
    }

    /// Members of a class and its bases, depth first along each base
    /// chain. The first class to contribute a name owns it: a base's
    /// member never shows past a derived override, while overloads
    /// declared side by side all survive.
    fn collect_members(
        &self,
        origin: ScopeId,
        start: ScopeId,
        filter: Filter<'_>,
        seen: &mut FxHashSet<DeclId>,
        out: &mut Vec<DeclId>,
    ) {
        let view = MemberView {
            start,
            pov: self.point_of_view(origin, start),
            filter,
        };
        let mut shadowed: FxHashSet<SmolStr> = FxHashSet::default();
        let mut visited: FxHashSet<ScopeId> = FxHashSet::default();
        self.collect_class(&view, start, &mut shadowed, &mut visited, seen, out);
    }

    fn collect_class(
        &self,
        view: &MemberView<'_>,
        class: ScopeId,
        shadowed: &mut FxHashSet<SmolStr>,
        visited: &mut FxHashSet<ScopeId>,
        seen: &mut FxHashSet<DeclId>,
        out: &mut Vec<DeclId>,
    ) {
        if !visited.insert(class) {
            return;
        }
        let own = class == view.start;
        let class_name = self.graph.scope(class).name;

        let mut contributed: Vec<SmolStr> = Vec::new();
        for &decl_id in self.graph.scope(class).decls() {
            let decl = self.graph.decl(decl_id);
            let text = self.graph.name_text(decl.name);

            if !view.pov.admits(decl.visibility, own) {
                continue;
            }
            // Constructors and destructors are not completable members
            if text.starts_with('~') {
                continue;
            }
            if decl.kind.is_callable() && Some(decl.name) == class_name {
                continue;
            }
            if shadowed.contains(&text) {
                continue;
            }
            if !self.matches(decl_id, view.filter) {
                continue;
            }
            if seen.insert(decl_id) {
                out.push(decl_id);
                contributed.push(text);
            }
        }
        for name in contributed {
            shadowed.insert(name);
        }

        for base in &self.graph.scope(class).bases {
            if let Some(target) = base.target() {
                self.collect_class(view, target, shadowed, visited, seen, out);
            }
        }
    }

    fn matches(&self, decl_id: DeclId, filter: Filter<'_>) -> bool {
        let decl = self.graph.decl(decl_id);
        if filter.value_only && !decl.kind.has_value_type() {
            return false;
        }
        let text = self.graph.name_text(decl.name);
        if filter.exact {
            text == filter.fragment
        } else {
            text.starts_with(filter.fragment)
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
