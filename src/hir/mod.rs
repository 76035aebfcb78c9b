//! Semantic model: scope extraction and name resolution.
//!
//! The pipeline runs token streams from [`crate::syntax`] through a
//! tolerant single-pass extractor into a [`ScopeGraph`], then answers
//! lookup queries against the finished graph:
//!
//! - [`extract`] - single-pass scope and declaration extraction
//! - [`scope`] - the scope graph and its resolution primitives
//! - [`resolve`] - completion and navigation queries
//! - [`symbols`] - declaration records and their kinds
//! - [`diagnostics`] - tolerant-parse diagnostics with stable codes
//! - [`source`] - buffer registry with edit versions
//! - [`ids`] - arena index types

pub mod diagnostics;
pub mod extract;
pub mod ids;
pub mod resolve;
pub mod scope;
pub mod source;
pub mod symbols;

pub use diagnostics::{Diagnostic, DiagnosticCollector, Severity, codes};
pub use extract::extract;
pub use ids::{DeclId, ScopeId};
pub use resolve::{ReceiverPath, ReceiverSeg, Resolver, Separator};
pub use scope::{BaseRef, GLOBAL_SCOPE, Scope, ScopeGraph, UsingKind, UsingRef, UsingTarget};
pub use source::FileSet;
pub use symbols::{DeclKind, Declaration, ScopeKind, Visibility};
