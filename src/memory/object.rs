//! The four strategy-specific reifications of a value (§3/§4), stored
//! homogeneously as [`MemoryObject`] so a dump can hold all of them in one
//! table.

use indexmap::IndexMap;

use crate::typeinfo::TypeInfo;
use crate::value::PyValue;

use super::dump::PythonId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Repr,
    List,
    Dict,
    Reduce,
}

/// Distinguishes the four list-like shapes without re-parsing `typeinfo`,
/// so reconstruction can dispatch on the original structured kind instead
/// of sniffing a type name string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Sequence,
    Tuple,
    Set,
    FrozenSet,
}

#[derive(Debug, Clone)]
pub enum MemoryDetail {
    Repr {
        value: String,
    },
    List {
        items: Vec<PythonId>,
        kind: ContainerKind,
    },
    Dict {
        items: IndexMap<PythonId, PythonId>,
    },
    Reduce {
        constructor: TypeInfo,
        args: PythonId,
        state: Option<PythonId>,
        listitems: Option<PythonId>,
        dictitems: Option<PythonId>,
        comment: Option<String>,
        shape: Option<Vec<usize>>,
        dtype: Option<String>,
    },
}

/// One entry in a [`super::MemoryDump`]. `obj` and `deserialized_obj` are
/// excluded from the wire form (see [`crate::wire`]) — they exist only for
/// the duration of the serializing/comparing session.
#[derive(Debug, Clone)]
pub struct MemoryObject {
    pub strategy: Strategy,
    pub typeinfo: TypeInfo,
    pub obj: PyValue,
    pub deserialized_obj: PyValue,
    pub comparable: bool,
    pub is_draft: bool,
    pub detail: MemoryDetail,
}
