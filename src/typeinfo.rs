//! Canonical type identity: a `(module, kind)` pair plus the derived
//! qualified-name views consumers actually want to print.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The runtime's base module, whose name is suppressed from qualified
/// names the same way Python suppresses `builtins.` for `int`, `list`, etc.
pub const BASE_RUNTIME_MODULE: &str = "builtins";

/// A type's module and qualified name, e.g. `("collections", "OrderedDict")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeInfo {
    pub module: String,
    pub kind: String,
}

impl TypeInfo {
    pub fn new(module: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            kind: kind.into(),
        }
    }

    /// `("", kind)` — a type with no enclosing module.
    pub fn bare(kind: impl Into<String>) -> Self {
        Self::new("", kind)
    }

    /// `module.kind`, or just `kind` when there is no module.
    pub fn fullname(&self) -> String {
        if self.module.is_empty() {
            self.kind.clone()
        } else {
            format!("{}.{}", self.module, self.kind)
        }
    }

    /// Like `fullname`, but also suppresses [`BASE_RUNTIME_MODULE`].
    pub fn qualname(&self) -> String {
        if self.module.is_empty() || self.module == BASE_RUNTIME_MODULE {
            self.kind.clone()
        } else {
            format!("{}.{}", self.module, self.kind)
        }
    }

    /// Parse a dotted string, splitting on the last dot. A dotless string
    /// has no module.
    pub fn from_str(s: &str) -> Self {
        match s.rsplit_once('.') {
            Some((module, kind)) => Self::new(module, kind),
            None => Self::bare(s),
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualname())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fullname_joins_module_and_kind() {
        let t = TypeInfo::new("collections", "OrderedDict");
        assert_eq!(t.fullname(), "collections.OrderedDict");
    }

    #[test]
    fn qualname_drops_base_runtime_module() {
        let t = TypeInfo::new(BASE_RUNTIME_MODULE, "int");
        assert_eq!(t.qualname(), "int");
        assert_eq!(t.fullname(), "builtins.int");
    }

    #[test]
    fn qualname_drops_empty_module() {
        let t = TypeInfo::bare("MyStruct");
        assert_eq!(t.qualname(), "MyStruct");
        assert_eq!(t.fullname(), "MyStruct");
    }

    #[test]
    fn from_str_splits_on_last_dot() {
        let t = TypeInfo::from_str("a.b.Thing");
        assert_eq!(t.module, "a.b");
        assert_eq!(t.kind, "Thing");

        let t = TypeInfo::from_str("Thing");
        assert_eq!(t.module, "");
        assert_eq!(t.kind, "Thing");
    }
}
