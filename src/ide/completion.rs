//! Completion: candidates for the fragment under the cursor.
//!
//! The query is reconstructed from raw text, not tokens: scanning
//! backwards from the offset yields the identifier fragment being typed
//! and the receiver chain before it (`myFoo.`, `a::b::Foo::`, `ptr->`).
//! This works mid-sentence in code the extractor skipped over, which is
//! exactly where completion gets asked.
//!
//! Candidates are declaration names, deduplicated, in the order the
//! resolver discovered them: innermost scope first, then base classes,
//! then enclosing scopes.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use tracing::debug;

use crate::base::TextSize;
use crate::hir::resolve::{ReceiverPath, ReceiverSeg, Resolver, Separator};
use crate::hir::scope::ScopeGraph;
use crate::hir::symbols::{DeclKind, Declaration};

use super::analysis::{ParsedUnit, QueryError};

// ============================================================================
// RESULT TYPES
// ============================================================================

/// Presentation category of a candidate.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CompletionKind {
    Type,
    Method,
    Function,
    Field,
    Variable,
}

impl CompletionKind {
    fn from_decl(kind: DeclKind) -> Self {
        match kind {
            DeclKind::Type => CompletionKind::Type,
            DeclKind::Method => CompletionKind::Method,
            DeclKind::Function => CompletionKind::Function,
            DeclKind::Field => CompletionKind::Field,
            DeclKind::Variable => CompletionKind::Variable,
        }
    }

    pub fn display(self) -> &'static str {
        match self {
            CompletionKind::Type => "type",
            CompletionKind::Method => "method",
            CompletionKind::Function => "function",
            CompletionKind::Field => "field",
            CompletionKind::Variable => "variable",
        }
    }
}

/// One completion candidate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompletionItem {
    pub label: SmolStr,
    pub kind: CompletionKind,
    /// Parameter list for callables, written type for values and aliases.
    pub detail: Option<SmolStr>,
}

/// Ordered, name-deduplicated completion candidates.
#[derive(Clone, Debug, Default)]
pub struct CandidateList {
    pub items: Vec<CompletionItem>,
}

impl CandidateList {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Candidate names in order, the shape fixture expectations use.
    pub fn labels(&self) -> Vec<SmolStr> {
        self.items.iter().map(|i| i.label.clone()).collect()
    }
}

// ============================================================================
// QUERY ENTRY POINT
// ============================================================================

/// Completion candidates at `offset` in a parsed buffer.
///
/// Pure over the unit: calling it twice at the same offset yields the
/// same list. An unresolvable receiver gives an empty list; only a
/// malformed offset is an error.
pub fn complete(unit: &ParsedUnit, offset: TextSize) -> Result<CandidateList, QueryError> {
    unit.check_offset(offset)?;

    let query = read_query(&unit.text, offset.into());
    let origin = unit.graph.scope_at(offset);
    let resolver = Resolver::new(&unit.graph);

    let decls = if query.receiver.is_empty() {
        resolver.complete_unqualified(origin, query.fragment)
    } else {
        resolver.complete_members(origin, &query.receiver, query.fragment)
    };

    let mut items = Vec::new();
    let mut taken: FxHashSet<SmolStr> = FxHashSet::default();
    for decl_id in decls {
        let decl = unit.graph.decl(decl_id);
        let label = unit.graph.name_text(decl.name);
        // Overloads collapse to the first discovery
        if !taken.insert(label.clone()) {
            continue;
        }
        items.push(CompletionItem {
            label,
            kind: CompletionKind::from_decl(decl.kind),
            detail: detail_of(&unit.graph, decl),
        });
    }

    debug!(
        offset = u32::from(offset),
        segments = query.receiver.segments.len(),
        fragment = query.fragment,
        candidates = items.len(),
        "completion query"
    );

    Ok(CandidateList { items })
}

fn detail_of(graph: &ScopeGraph, decl: &Declaration) -> Option<SmolStr> {
    if let Some(sig) = &decl.signature {
        return Some(sig.clone());
    }
    if decl.type_path.is_empty() {
        return None;
    }
    let parts: Vec<SmolStr> = decl.type_path.iter().map(|&n| graph.name_text(n)).collect();
    Some(SmolStr::new(parts.join("::")))
}

// ============================================================================
// BACKWARD TEXT SCAN
// ============================================================================

pub(super) struct Query<'t> {
    pub(super) receiver: ReceiverPath,
    pub(super) fragment: &'t str,
}

fn is_ident_byte(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

fn skip_ws_back(bytes: &[u8], mut pos: usize) -> usize {
    while pos > 0 && bytes[pos - 1].is_ascii_whitespace() {
        pos -= 1;
    }
    pos
}

/// Walk back over a balanced `(...)` group; `from` points just past the
/// closing paren. Returns the position of the opening paren.
fn skip_parens_back(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = from;
    while i > 0 {
        i -= 1;
        match bytes[i] {
            b')' => depth += 1,
            b'(' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Reconstruct the fragment and receiver chain ending at `offset`.
pub(super) fn read_query(text: &str, offset: usize) -> Query<'_> {
    let bytes = text.as_bytes();

    let mut start = offset;
    while start > 0 && is_ident_byte(bytes[start - 1]) {
        start -= 1;
    }
    let fragment = &text[start..offset];

    let mut segments = Vec::new();
    let mut pos = start;
    loop {
        let sep_end = skip_ws_back(bytes, pos);
        let (sep, sep_start) = if sep_end >= 1 && bytes[sep_end - 1] == b'.' {
            (Separator::Member, sep_end - 1)
        } else if sep_end >= 2 && &bytes[sep_end - 2..sep_end] == b"->" {
            (Separator::Member, sep_end - 2)
        } else if sep_end >= 2 && &bytes[sep_end - 2..sep_end] == b"::" {
            (Separator::Scope, sep_end - 2)
        } else {
            break;
        };

        let mut name_end = skip_ws_back(bytes, sep_start);
        // A call's argument list: `get().` completes on the return type
        if name_end >= 1 && bytes[name_end - 1] == b')' {
            match skip_parens_back(bytes, name_end) {
                Some(open) => name_end = skip_ws_back(bytes, open),
                None => break,
            }
        }

        let mut name_start = name_end;
        while name_start > 0 && is_ident_byte(bytes[name_start - 1]) {
            name_start -= 1;
        }
        if name_start == name_end {
            break;
        }

        segments.push(ReceiverSeg {
            name: SmolStr::new(&text[name_start..name_end]),
            sep,
        });
        pos = name_start;
    }
    segments.reverse();

    Query {
        receiver: ReceiverPath { segments },
        fragment,
    }
}
