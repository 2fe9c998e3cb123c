//! The memory dump: a content-addressed, insertion-ordered table from
//! identity to memory object.

use indexmap::IndexMap;

use super::object::MemoryObject;

/// Opaque stable identity for a live value, for the duration of a session.
/// In this facade, the hex address of the [`crate::value::PyValue`]'s
/// backing allocation — the direct analogue of Python's `id()`.
pub type PythonId = String;

/// Insertion-ordered so iterating a dump for diffing or wire output is
/// deterministic with respect to the order values were first encountered.
/// Holds live [`crate::value::PyValue`] handles, so this type itself is not
/// `Serialize` — see [`crate::wire`] for the wire-format projection.
#[derive(Debug, Default)]
pub struct MemoryDump {
    pub objects: IndexMap<PythonId, MemoryObject>,
}

impl MemoryDump {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&MemoryObject> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut MemoryObject> {
        self.objects.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    pub fn insert(&mut self, id: PythonId, object: MemoryObject) {
        self.objects.insert(id, object);
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
