//! # scopal
//!
//! Scope-aware symbol resolution and completion for C family sources,
//! tolerant of the incomplete code an editor buffer actually contains.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide     → editor queries (completion, goto-definition, outlines)
//!   ↓
//! hir     → scope graph extraction + name resolution
//!   ↓
//! syntax  → lexer + macro substitution
//!   ↓
//! base    → primitives (FileId, spans, name interning)
//! ```
//!
//! A buffer flows through the layers once per edit: the lexer never
//! rejects input, the extractor recovers at every structural keyword, and
//! queries run against whatever graph came out. Broken code yields
//! diagnostics and a smaller graph, not a failure.

/// Foundation types: FileId, spans, name interning
pub mod base;

/// Semantic model: scope graph extraction and name resolution
pub mod hir;

/// Editor queries: completion, goto-definition, symbol outlines
pub mod ide;

/// Lexer and macro substitution
pub mod syntax;

// Re-export the foundation types and main entry points
pub use base::{FileId, Interner, LineCol, LineIndex, Name, TextRange, TextSize};
pub use ide::{Analysis, AnalysisHost, CandidateList, QueryError};
pub use syntax::MacroTable;
