//! Diagnostics for structural problems found while building a scope graph.
//!
//! Nothing here ever aborts a parse: a diagnostic records that something
//! was dropped or ignored (a cyclic base edge, an unresolvable using
//! target, a macro invoked with the wrong arity) while the rest of the
//! graph stays fully queryable.

use std::sync::Arc;

use crate::base::{FileId, LineCol, LineIndex, TextRange};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }
}

/// A diagnostic message with location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// The buffer this diagnostic belongs to.
    pub file: FileId,
    /// Start position (0-indexed).
    pub start: LineCol,
    /// End position (0-indexed).
    pub end: LineCol,
    /// Severity level.
    pub severity: Severity,
    /// Stable code (e.g. "E0001").
    pub code: Option<Arc<str>>,
    /// The diagnostic message.
    pub message: Arc<str>,
    /// Optional related locations.
    pub related: Vec<RelatedInfo>,
}

/// Related information for a diagnostic.
#[derive(Clone, Debug)]
pub struct RelatedInfo {
    pub file: FileId,
    pub pos: LineCol,
    pub message: Arc<str>,
}

impl Diagnostic {
    /// Create an error spanning `range` in `file`.
    pub fn error(
        file: FileId,
        index: &LineIndex,
        range: TextRange,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self::new(file, index, range, Severity::Error, message)
    }

    /// Create a warning spanning `range` in `file`.
    pub fn warning(
        file: FileId,
        index: &LineIndex,
        range: TextRange,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self::new(file, index, range, Severity::Warning, message)
    }

    fn new(
        file: FileId,
        index: &LineIndex,
        range: TextRange,
        severity: Severity,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            file,
            start: index.line_col(range.start()),
            end: index.line_col(range.end()),
            severity,
            code: None,
            message: message.into(),
            related: Vec::new(),
        }
    }

    /// Set the stable code.
    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Add a related location.
    pub fn with_related(mut self, info: RelatedInfo) -> Self {
        self.related.push(info);
        self
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Stable diagnostic codes.
pub mod codes {
    /// A base-class edge closes an inheritance cycle; the edge is dropped.
    pub const CYCLIC_INHERITANCE: &str = "E0001";
    /// A class names itself as its own base; the edge is dropped.
    pub const SELF_INHERITANCE: &str = "E0002";

    /// A base-class name never resolved to a class in any enclosing scope.
    pub const UNRESOLVED_BASE: &str = "W0001";
    /// A using-directive or using-declaration target never resolved.
    pub const UNRESOLVED_USING: &str = "W0002";
    /// A qualified out-of-line definition whose declaring class was not
    /// found; the body is kept as a plain function.
    pub const UNRESOLVED_RECEIVER: &str = "W0003";
    /// A macro invoked with the wrong number of arguments.
    pub const MACRO_ARITY: &str = "W0004";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Accumulates diagnostics during extraction and graph finishing.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Record a dropped cycle-closing base edge. `base_decl` is the base
    /// class's own declaration site, attached as related info when known.
    pub fn cyclic_inheritance(
        &mut self,
        file: FileId,
        index: &LineIndex,
        range: TextRange,
        derived: &str,
        base: &str,
        base_decl: Option<TextRange>,
    ) {
        let mut diag = Diagnostic::error(
            file,
            index,
            range,
            format!("inheritance cycle: '{derived}' cannot derive from '{base}'"),
        )
        .with_code(codes::CYCLIC_INHERITANCE);

        if let Some(decl) = base_decl {
            diag = diag.with_related(RelatedInfo {
                file,
                pos: index.line_col(decl.start()),
                message: Arc::from(format!("'{base}' declared here")),
            });
        }

        self.add(diag);
    }

    /// Record a dropped self-inheritance edge.
    pub fn self_inheritance(
        &mut self,
        file: FileId,
        index: &LineIndex,
        range: TextRange,
        name: &str,
    ) {
        self.add(
            Diagnostic::error(
                file,
                index,
                range,
                format!("'{name}' cannot derive from itself"),
            )
            .with_code(codes::SELF_INHERITANCE),
        );
    }

    /// Record a base-class name that never resolved.
    pub fn unresolved_base(
        &mut self,
        file: FileId,
        index: &LineIndex,
        range: TextRange,
        base: &str,
    ) {
        self.add(
            Diagnostic::warning(file, index, range, format!("base class '{base}' not found"))
                .with_code(codes::UNRESOLVED_BASE),
        );
    }

    /// Record a using target that never resolved.
    pub fn unresolved_using(
        &mut self,
        file: FileId,
        index: &LineIndex,
        range: TextRange,
        path: &str,
    ) {
        self.add(
            Diagnostic::warning(file, index, range, format!("using target '{path}' not found"))
                .with_code(codes::UNRESOLVED_USING),
        );
    }

    /// Record an out-of-line definition whose declaring scope was not found.
    pub fn unresolved_receiver(
        &mut self,
        file: FileId,
        index: &LineIndex,
        range: TextRange,
        path: &str,
    ) {
        self.add(
            Diagnostic::warning(
                file,
                index,
                range,
                format!("declaring scope '{path}' not found for qualified definition"),
            )
            .with_code(codes::UNRESOLVED_RECEIVER),
        );
    }

    /// Record a macro invocation with a mismatched argument count.
    pub fn macro_arity(
        &mut self,
        file: FileId,
        index: &LineIndex,
        range: TextRange,
        name: &str,
        expected: usize,
        found: usize,
    ) {
        self.add(
            Diagnostic::warning(
                file,
                index,
                range,
                format!("macro '{name}' expects {expected} argument(s), found {found}"),
            )
            .with_code(codes::MACRO_ARITY),
        );
    }

    /// Get all diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get the number of errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Get the number of warnings.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
