//! Symbol outlines: per-buffer and across the workspace.
//!
//! The outline lists durable declarations, meaning everything except
//! locals and parameters inside function bodies. Out-of-line definitions
//! merged with their in-class declaration appear once.

use smol_str::SmolStr;

use crate::base::{FileId, TextRange};
use crate::hir::symbols::{DeclKind, ScopeKind, Visibility};

use super::analysis::{Analysis, ParsedUnit};

/// One row of an outline.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SymbolInfo {
    pub file: FileId,
    pub name: SmolStr,
    pub kind: DeclKind,
    pub visibility: Visibility,
    /// Qualified path of the containing scope, empty at the global scope.
    pub container: SmolStr,
    /// Range of the declared name token.
    pub range: TextRange,
    /// Parameter list for callables.
    pub detail: Option<SmolStr>,
}

/// Every durable declaration of a buffer, in source order.
pub fn document_symbols(unit: &ParsedUnit) -> Vec<SymbolInfo> {
    let graph = &unit.graph;
    let mut out = Vec::new();
    for (_, decl) in graph.all_decls() {
        let holder = graph.scope(decl.scope);
        if matches!(holder.kind, ScopeKind::Function | ScopeKind::Block) {
            continue;
        }
        out.push(SymbolInfo {
            file: graph.file(),
            name: graph.name_text(decl.name),
            kind: decl.kind,
            visibility: decl.visibility,
            container: graph.qualified_name(decl.scope),
            range: decl.range,
            detail: decl.signature.clone(),
        });
    }
    out.sort_by_key(|s| s.range.start());
    out
}

/// Declarations matching `query` across every registered buffer.
/// Matching is a case-insensitive substring test; an empty query matches
/// everything.
pub fn workspace_symbols(analysis: &Analysis<'_>, query: &str) -> Vec<SymbolInfo> {
    let needle = query.to_lowercase();
    let mut out = Vec::new();
    for file in analysis.files() {
        let Ok(unit) = analysis.unit(file) else {
            continue;
        };
        out.extend(
            document_symbols(&unit)
                .into_iter()
                .filter(|s| needle.is_empty() || s.name.to_lowercase().contains(&needle)),
        );
    }
    out
}
