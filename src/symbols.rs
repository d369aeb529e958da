use std::collections::HashMap;

use crate::vm::Segment;

/// Storage class of a Jack variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageClass {
    Static,
    Field,
    Argument,
    Local,
}

impl StorageClass {
    /// The VM segment backing this storage class at runtime.
    pub fn segment(self) -> Segment {
        match self {
            StorageClass::Static => Segment::Static,
            StorageClass::Field => Segment::This,
            StorageClass::Argument => Segment::Argument,
            StorageClass::Local => Segment::Local,
        }
    }

    fn is_class_scope(self) -> bool {
        matches!(self, StorageClass::Static | StorageClass::Field)
    }
}

/// A resolved variable: declared type, storage class, and slot index.
#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub ty: String,
    pub kind: StorageClass,
    pub index: u16,
}

/// Two-scope symbol table: class scope (static/field) and subroutine scope
/// (argument/local). Lookup prefers the subroutine scope. Indices are
/// allocated densely per (scope, kind) in definition order.
#[derive(Default)]
pub struct SymbolTable {
    class_scope: HashMap<String, Symbol>,
    subroutine_scope: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all subroutine-scope entries.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
    }

    /// Insert a definition. The first definition of a name wins within its
    /// scope; a redefinition is a no-op and returns false.
    pub fn define(&mut self, name: &str, ty: &str, kind: StorageClass) -> bool {
        let scope = if kind.is_class_scope() {
            &mut self.class_scope
        } else {
            &mut self.subroutine_scope
        };
        if scope.contains_key(name) {
            return false;
        }
        let index = scope.values().filter(|s| s.kind == kind).count() as u16;
        scope.insert(
            name.to_string(),
            Symbol {
                ty: ty.to_string(),
                kind,
                index,
            },
        );
        true
    }

    /// Resolve a name, subroutine scope first.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    pub fn kind_of(&self, name: &str) -> Option<StorageClass> {
        self.resolve(name).map(|s| s.kind)
    }

    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.resolve(name).map(|s| s.ty.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.resolve(name).map(|s| s.index)
    }

    /// Number of symbols of the given kind in the scope it belongs to.
    pub fn var_count(&self, kind: StorageClass) -> u16 {
        let scope = if kind.is_class_scope() {
            &self.class_scope
        } else {
            &self.subroutine_scope
        };
        scope.values().filter(|s| s.kind == kind).count() as u16
    }
}
