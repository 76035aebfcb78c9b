//! Declaration records stored in the scope graph.

use smol_str::SmolStr;

use crate::base::{Name, TextRange};
use crate::hir::ids::ScopeId;

/// What kind of region a scope node represents.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ScopeKind {
    /// The buffer-wide root scope. Exactly one per graph.
    Global,
    /// `namespace N { ... }`; all physical reopenings share one node.
    Namespace,
    /// `class` / `struct` / `union` body.
    Class,
    /// A function or method body.
    Function,
    /// Any other braced region (compound statements, unrecognized forms).
    Block,
}

impl ScopeKind {
    pub fn display(self) -> &'static str {
        match self {
            ScopeKind::Global => "global",
            ScopeKind::Namespace => "namespace",
            ScopeKind::Class => "class",
            ScopeKind::Function => "function",
            ScopeKind::Block => "block",
        }
    }

    /// Reopenable scopes merge by (name, kind, parent); the rest get a
    /// fresh node per occurrence.
    pub fn is_reopenable(self) -> bool {
        matches!(self, ScopeKind::Namespace | ScopeKind::Class)
    }
}

/// What a declaration declares.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DeclKind {
    /// Class, struct, union, enum, or typedef/alias name.
    Type,
    /// Callable member of a class.
    Method,
    /// Free function.
    Function,
    /// Data member of a class.
    Field,
    /// Local, parameter, or namespace-level variable.
    Variable,
}

impl DeclKind {
    pub fn display(self) -> &'static str {
        match self {
            DeclKind::Type => "type",
            DeclKind::Method => "method",
            DeclKind::Function => "function",
            DeclKind::Field => "field",
            DeclKind::Variable => "variable",
        }
    }

    pub fn is_callable(self) -> bool {
        matches!(self, DeclKind::Method | DeclKind::Function)
    }

    /// Kinds whose declared type can be followed to another scope when
    /// resolving a receiver chain (`myFoo.` follows the field's type,
    /// `get().` follows the return type).
    pub fn has_value_type(self) -> bool {
        matches!(
            self,
            DeclKind::Field | DeclKind::Variable | DeclKind::Method | DeclKind::Function
        )
    }
}

/// Access control recorded from the labels in force at declaration time.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn display(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

/// One declared name inside a scope.
///
/// `type_path` holds the written path of the declared type for fields and
/// variables, the alias target for typedefs, and the return type for
/// callables. It is resolved on demand, never eagerly: the graph stays
/// usable even when a type never resolves.
#[derive(Clone, Debug)]
pub struct Declaration {
    pub name: Name,
    pub kind: DeclKind,
    pub visibility: Visibility,
    /// The scope this declaration belongs to.
    pub scope: ScopeId,
    /// Written type path (`Name1::Name2::Foo` becomes three segments).
    /// Empty when the form had no usable type.
    pub type_path: Vec<Name>,
    /// Rendered parameter types for callables, names stripped, e.g.
    /// `(int, int)`. The merge key between an in-class declaration and
    /// its out-of-line definition; resolution never reads it.
    pub signature: Option<SmolStr>,
    /// Range of the declared name token in the buffer.
    pub range: TextRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(DeclKind::Field.display(), "field");
        assert_eq!(DeclKind::Type.display(), "type");
        assert_eq!(ScopeKind::Namespace.display(), "namespace");
        assert_eq!(Visibility::Protected.display(), "protected");
    }

    #[test]
    fn test_reopenable_kinds() {
        assert!(ScopeKind::Namespace.is_reopenable());
        assert!(ScopeKind::Class.is_reopenable());
        assert!(!ScopeKind::Function.is_reopenable());
        assert!(!ScopeKind::Block.is_reopenable());
        assert!(!ScopeKind::Global.is_reopenable());
    }

    #[test]
    fn test_value_type_kinds() {
        assert!(DeclKind::Field.has_value_type());
        assert!(DeclKind::Method.has_value_type());
        assert!(!DeclKind::Type.has_value_type());
    }
}
