//! The diff utility (§4.7): which of a set of ids changed between two
//! dumps, judged by the *original* values each dump captured — not by
//! comparing reconstructions.

use crate::memory::{MemoryDump, PythonId};
use crate::value::PyValue;

/// Domain equality used for diffing, matching §4.3's numeric-array
/// exception. Separate from [`PyValue`]'s `PartialEq` only in spirit — the
/// array special case already lives there, so this is a thin, explicit
/// name for "the comparator the diff utility uses".
fn comparator(left: &PyValue, right: &PyValue) -> bool {
    left == right
}

/// Return the subset of `ids` whose original value differs between
/// `before` and `after`. An id missing from either dump is silently
/// dropped rather than treated as a difference.
pub fn compress_memory(ids: &[PythonId], before: &MemoryDump, after: &MemoryDump) -> Vec<PythonId> {
    ids.iter()
        .filter(|id| {
            match (before.get(id.as_str()), after.get(id.as_str())) {
                (Some(b), Some(a)) => !comparator(&b.obj, &a.obj),
                _ => false,
            }
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SerializerContext;

    #[test]
    fn unchanged_values_are_not_reported() {
        let mut before_ctx = SerializerContext::new();
        let mut after_ctx = SerializerContext::new();
        let v = PyValue::int(1);
        let id = before_ctx.write_object_to_memory(&v).unwrap();
        after_ctx.write_object_to_memory(&v).unwrap();

        let diff = compress_memory(&[id], before_ctx.dump(), after_ctx.dump());
        assert!(diff.is_empty());
    }

    #[test]
    fn mutated_list_is_reported() {
        let mut before_ctx = SerializerContext::new();
        let v = PyValue::list(vec![PyValue::int(1)]);
        let id = before_ctx.write_object_to_memory(&v).unwrap();

        let mut after_ctx = SerializerContext::new();
        let mutated = PyValue::list(vec![PyValue::int(1), PyValue::int(2)]);
        after_ctx.write_object_to_memory(&mutated).unwrap();
        // same id namespace assumption for the test: copy the entry under the same key
        after_ctx.dump_mut().insert(
            id.clone(),
            after_ctx.dump().get(&mutated.identity()).unwrap().clone(),
        );

        let diff = compress_memory(&[id], before_ctx.dump(), after_ctx.dump());
        assert_eq!(diff.len(), 1);
    }

    #[test]
    fn missing_id_is_silently_dropped() {
        let before = crate::memory::MemoryDump::new();
        let after = crate::memory::MemoryDump::new();
        let diff = compress_memory(&["nonexistent".to_string()], &before, &after);
        assert!(diff.is_empty());
    }
}
