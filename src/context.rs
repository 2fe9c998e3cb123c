//! The serializer context (§4.6): scoped owner of one dump and one visit
//! set, plus a convenience process-wide singleton for callers — like the
//! TCP listener — that don't want to thread a context handle through their
//! own call chains.

use std::collections::HashSet;
use std::sync::Mutex;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use tracing::instrument;

use crate::error::{DeepDumpError, Result};
use crate::memory::object::{ContainerKind, MemoryDetail, MemoryObject, Strategy};
use crate::memory::providers::{container_kind, select_strategy};
use crate::memory::{MemoryDump, PythonId};
use crate::repr;
use crate::typeinfo::TypeInfo;
use crate::value::{Instance, PyValue, ReduceKind};

/// Owns one dump and one visit set. Not `Sync`; a caller embedding this in
/// a concurrent environment serializes calls externally or uses one
/// context per session, matching the single-threaded concurrency model.
pub struct SerializerContext {
    dump: MemoryDump,
    visited: HashSet<PythonId>,
}

impl Default for SerializerContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SerializerContext {
    pub fn new() -> Self {
        Self {
            dump: MemoryDump::new(),
            visited: HashSet::new(),
        }
    }

    pub fn dump(&self) -> &MemoryDump {
        &self.dump
    }

    pub fn dump_mut(&mut self) -> &mut MemoryDump {
        &mut self.dump
    }

    /// Reset the dump itself (both objects and, implicitly, any dedup from
    /// a prior session).
    pub fn clear(&mut self) {
        self.dump.clear();
        self.visited.clear();
    }

    /// Reset only the visit set. A typical multi-root session clears this
    /// between independent roots while keeping the dump, so subobjects
    /// shared across roots stay deduplicated.
    pub fn clear_visited(&mut self) {
        self.visited.clear();
    }

    /// Projection onto an entry's `deserialized_obj`.
    pub fn get(&self, id: &str) -> Option<PyValue> {
        self.dump.get(id).map(|o| o.deserialized_obj.clone())
    }

    pub fn get_by_id(&self, id: &str) -> Option<&MemoryObject> {
        self.dump.get(id)
    }

    /// Serialize `value` and everything it transitively references,
    /// returning its identity. Re-encountering an already-visited id short
    /// circuits immediately, which is what makes state-based cycles
    /// terminate.
    #[instrument(skip(self, value))]
    pub fn write_object_to_memory(&mut self, value: &PyValue) -> Result<PythonId> {
        let id = value.identity();
        if self.visited.contains(&id) {
            return Ok(id);
        }
        let strategy = select_strategy(value).ok_or_else(|| DeepDumpError::NoProvider {
            kind: value.kind().fullname(),
        })?;
        self.visited.insert(id.clone());

        match strategy {
            Strategy::Repr => self.write_repr(&id, value)?,
            Strategy::List => self.write_list(&id, value)?,
            Strategy::Dict => self.write_dict(&id, value)?,
            Strategy::Reduce => self.write_reduce(&id, value)?,
        }
        Ok(id)
    }

    fn write_repr(&mut self, id: &str, value: &PyValue) -> Result<()> {
        let text = repr::get_repr(value);
        let deserialized = repr::reconstruct(&value.kind(), &text, value).unwrap_or_else(|| value.clone());
        let comparable = *value == deserialized;
        self.dump.insert(
            id.to_string(),
            MemoryObject {
                strategy: Strategy::Repr,
                typeinfo: value.kind(),
                obj: value.clone(),
                deserialized_obj: deserialized,
                comparable,
                is_draft: false,
                detail: MemoryDetail::Repr { value: text },
            },
        );
        Ok(())
    }

    fn write_list(&mut self, id: &str, value: &PyValue) -> Result<()> {
        let items = value.list_items().unwrap_or_default();
        let kind = container_kind(value).unwrap_or(ContainerKind::Sequence);

        // Draft-first, same as the reduce path: the entry is allocated and
        // inserted before any recursive call, so the dump never momentarily
        // lacks an entry for an id already handed out by `write_object_to_memory`.
        self.dump.insert(
            id.to_string(),
            MemoryObject {
                strategy: Strategy::List,
                typeinfo: value.kind(),
                obj: value.clone(),
                deserialized_obj: value.clone(),
                comparable: true,
                is_draft: true,
                detail: MemoryDetail::List { items: Vec::new(), kind },
            },
        );

        let mut item_ids = Vec::with_capacity(items.len());
        let mut deserialized_items = Vec::with_capacity(items.len());
        let mut comparable = true;
        for item in &items {
            let item_id = self.write_object_to_memory(item)?;
            let reconstructed = self.get(&item_id).unwrap_or_else(|| item.clone());
            let item_comparable = self.get_by_id(&item_id).map(|o| o.comparable).unwrap_or(false);
            comparable = comparable && item_comparable;
            deserialized_items.push(reconstructed);
            item_ids.push(item_id);
        }
        let deserialized_obj = match kind {
            ContainerKind::Sequence => PyValue::list(deserialized_items),
            ContainerKind::Tuple => PyValue::tuple(deserialized_items),
            ContainerKind::Set => PyValue::set(deserialized_items),
            ContainerKind::FrozenSet => PyValue::frozenset(deserialized_items),
        };

        if let Some(entry) = self.dump.get_mut(id) {
            entry.comparable = comparable;
            entry.is_draft = false;
            entry.deserialized_obj = deserialized_obj;
            if let MemoryDetail::List { items, .. } = &mut entry.detail {
                *items = item_ids;
            }
        }
        Ok(())
    }

    fn write_dict(&mut self, id: &str, value: &PyValue) -> Result<()> {
        let pairs = value.dict_items().unwrap_or_default();

        // Draft-first, same as `write_list`/the reduce path.
        self.dump.insert(
            id.to_string(),
            MemoryObject {
                strategy: Strategy::Dict,
                typeinfo: value.kind(),
                obj: value.clone(),
                deserialized_obj: value.clone(),
                comparable: true,
                is_draft: true,
                detail: MemoryDetail::Dict { items: IndexMap::new() },
            },
        );

        let mut item_ids: IndexMap<PythonId, PythonId> = IndexMap::new();
        let mut deserialized_pairs = Vec::with_capacity(pairs.len());
        let mut comparable = true;
        for (k, v) in &pairs {
            let key_id = self.write_object_to_memory(k)?;
            let value_id = self.write_object_to_memory(v)?;
            let key_reconstructed = self.get(&key_id).unwrap_or_else(|| k.clone());
            let value_reconstructed = self.get(&value_id).unwrap_or_else(|| v.clone());
            // §4.3: dict comparability is every child *value*'s comparability.
            let value_comparable = self.get_by_id(&value_id).map(|o| o.comparable).unwrap_or(false);
            comparable = comparable && value_comparable;
            deserialized_pairs.push((key_reconstructed, value_reconstructed));
            item_ids.insert(key_id, value_id);
        }
        let unique_keys = deserialized_pairs.iter().fold(Vec::<&PyValue>::new(), |mut seen, (k, _)| {
            if !seen.iter().any(|existing| *existing == k) {
                seen.push(k);
            }
            seen
        });
        let length_preserved = unique_keys.len() == pairs.len();

        if let Some(entry) = self.dump.get_mut(id) {
            entry.comparable = comparable && length_preserved;
            entry.is_draft = false;
            entry.deserialized_obj = PyValue::dict(deserialized_pairs);
            if let MemoryDetail::Dict { items } = &mut entry.detail {
                *items = item_ids;
            }
        }
        Ok(())
    }

    fn write_reduce(&mut self, id: &str, value: &PyValue) -> Result<()> {
        if let Some(arr) = value.as_ndarray() {
            return self.write_reduce_ndarray(id, value, &arr);
        }
        let instance = value.as_instance().expect("reduce-capable value must be Instance or NdArray");
        self.write_reduce_instance(id, value, &instance)
    }

    fn write_reduce_ndarray(&mut self, id: &str, value: &PyValue, arr: &crate::value::NdArray) -> Result<()> {
        let nested = arr.to_nested_list();
        let args_tuple = PyValue::tuple(vec![nested]);
        let args_id = self.write_object_to_memory(&args_tuple)?;
        let deserialized_obj = PyValue::ndarray(arr.clone());
        let comparable = *value == deserialized_obj;
        let comment = arr.is_scalar().then(|| {
            format!(
                "scalar ndarray compared element-wise rather than by identity: {}",
                comparable
            )
        });
        self.dump.insert(
            id.to_string(),
            MemoryObject {
                strategy: Strategy::Reduce,
                typeinfo: TypeInfo::new("numpy", "ndarray"),
                obj: value.clone(),
                deserialized_obj,
                comparable,
                is_draft: false,
                detail: MemoryDetail::Reduce {
                    constructor: TypeInfo::new("numpy", "array"),
                    args: args_id,
                    state: None,
                    listitems: None,
                    dictitems: None,
                    comment,
                    shape: Some(arr.shape.clone()),
                    dtype: Some(arr.dtype.clone()),
                },
            },
        );
        Ok(())
    }

    fn write_reduce_instance(&mut self, id: &str, value: &PyValue, instance: &Instance) -> Result<()> {
        let (constructor, arg_values) = match &instance.reduce {
            ReduceKind::Default => (
                TypeInfo::new("builtins", "object.__new__"),
                vec![PyValue::of_type(instance.typeinfo.clone())],
            ),
            ReduceKind::Custom { constructor, args, .. } => (constructor.clone(), args.clone()),
        };
        let args_tuple = PyValue::tuple(arg_values.clone());
        let args_id = self.write_object_to_memory(&args_tuple)?;
        let reconstructed_args: Vec<PyValue> = arg_values
            .iter()
            .map(|a| self.get(&a.identity()).unwrap_or_else(|| a.clone()))
            .collect();

        // Draft-first: the shell is built and inserted before state is
        // processed, so a cycle reached through state resolves to this
        // same `Rc<RefCell<_>>` instead of recursing forever.
        let shell = match &instance.reduce {
            ReduceKind::Default => PyValue::instance(instance.typeinfo.clone(), ReduceKind::Default),
            ReduceKind::Custom { call, .. } => (call)(&reconstructed_args),
        };
        self.dump.insert(
            id.to_string(),
            MemoryObject {
                strategy: Strategy::Reduce,
                typeinfo: instance.typeinfo.clone(),
                obj: value.clone(),
                deserialized_obj: shell.clone(),
                comparable: true,
                is_draft: true,
                detail: MemoryDetail::Reduce {
                    constructor,
                    args: args_id,
                    state: None,
                    listitems: None,
                    dictitems: None,
                    comment: None,
                    shape: None,
                    dtype: None,
                },
            },
        );

        let state_id = if !instance.state.is_empty() {
            let state_dict = PyValue::dict(
                instance
                    .state
                    .iter()
                    .map(|(k, v)| (PyValue::str(k.clone()), v.clone()))
                    .collect(),
            );
            Some(self.write_object_to_memory(&state_dict)?)
        } else {
            None
        };
        let listitems_id = match &instance.listitems {
            Some(items) => Some(self.write_object_to_memory(&PyValue::list(items.clone()))?),
            None => None,
        };
        let dictitems_id = match &instance.dictitems {
            Some(items) => Some(self.write_object_to_memory(&PyValue::dict(items.clone()))?),
            None => None,
        };

        // State application runs for every reduce-strategy object, not only
        // the default-constructed ones: a custom constructor only supplies
        // the shell, the reduce protocol's state/listitems/dictitems steps
        // still populate it afterward. `set_instance_state` is a no-op on a
        // non-`Instance` shell, so this is safe to call unconditionally.
        let state_values: Vec<(String, PyValue)> = instance
            .state
            .iter()
            .map(|(k, v)| (k.clone(), self.get(&v.identity()).unwrap_or_else(|| v.clone())))
            .collect();
        let listitems_values = instance
            .listitems
            .as_ref()
            .map(|items| items.iter().map(|v| self.get(&v.identity()).unwrap_or_else(|| v.clone())).collect());
        let dictitems_values = instance.dictitems.as_ref().map(|items| {
            items
                .iter()
                .map(|(k, v)| (k.clone(), self.get(&v.identity()).unwrap_or_else(|| v.clone())))
                .collect()
        });
        shell.set_instance_state(state_values, listitems_values, dictitems_values);

        let comparable = *value == shell;
        if let Some(entry) = self.dump.get_mut(id) {
            entry.comparable = comparable;
            entry.is_draft = false;
            entry.deserialized_obj = shell;
            if let MemoryDetail::Reduce {
                state,
                listitems,
                dictitems,
                ..
            } = &mut entry.detail
            {
                *state = state_id;
                *listitems = listitems_id;
                *dictitems = dictitems_id;
            }
        }
        Ok(())
    }
}

/// Convenience process-wide singleton, following this codebase's existing
/// `once_cell::sync::Lazy<Mutex<_>>` pattern for other global registries —
/// for callers that want a context without threading one through their own
/// call chains.
pub static GLOBAL_CONTEXT: Lazy<Mutex<SerializerContext>> = Lazy::new(|| Mutex::new(SerializerContext::new()));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_is_comparable() {
        let mut ctx = SerializerContext::new();
        let id = ctx.write_object_to_memory(&PyValue::list(vec![])).unwrap();
        assert!(ctx.get_by_id(&id).unwrap().comparable);
    }

    #[test]
    fn duplicate_child_is_deduplicated() {
        let mut ctx = SerializerContext::new();
        let shared = PyValue::list(vec![PyValue::int(1), PyValue::int(2)]);
        let root = PyValue::dict(vec![
            (PyValue::str("a"), shared.clone()),
            (PyValue::str("b"), shared.clone()),
        ]);
        let root_id = ctx.write_object_to_memory(&root).unwrap();
        let entry = ctx.get_by_id(&root_id).unwrap();
        if let MemoryDetail::Dict { items } = &entry.detail {
            let ids: Vec<&String> = items.values().collect();
            assert_eq!(ids[0], ids[1]);
        } else {
            panic!("expected dict detail");
        }
    }

    #[test]
    fn nan_breaks_comparability() {
        let mut ctx = SerializerContext::new();
        let root = PyValue::list(vec![PyValue::float(f64::NAN)]);
        let id = ctx.write_object_to_memory(&root).unwrap();
        assert!(!ctx.get_by_id(&id).unwrap().comparable);
    }

    #[test]
    fn self_referential_instance_round_trips() {
        let mut ctx = SerializerContext::new();
        let p = PyValue::instance(TypeInfo::bare("Node"), ReduceKind::Default);
        p.set_instance_state(vec![("self_ref".to_string(), p.clone())], None, None);
        let id = ctx.write_object_to_memory(&p).unwrap();
        let entry = ctx.get_by_id(&id).unwrap();
        assert!(entry.comparable);
        let reconstructed = entry.deserialized_obj.clone();
        let reconstructed_self = reconstructed.as_instance().unwrap().state[0].1.clone();
        assert_eq!(reconstructed.identity(), reconstructed_self.identity());
    }

    #[test]
    fn custom_reduce_still_receives_state() {
        let mut ctx = SerializerContext::new();
        let typeinfo = TypeInfo::new("shapes", "Point");
        let built_typeinfo = typeinfo.clone();
        let value = PyValue::instance(
            typeinfo.clone(),
            ReduceKind::Custom {
                constructor: typeinfo.clone(),
                args: vec![],
                call: std::rc::Rc::new(move |_args| PyValue::instance(built_typeinfo.clone(), ReduceKind::Default)),
            },
        );
        value.set_instance_state(vec![("x".to_string(), PyValue::int(7))], None, None);

        let id = ctx.write_object_to_memory(&value).unwrap();
        let entry = ctx.get_by_id(&id).unwrap();
        let restored = entry.deserialized_obj.as_instance().unwrap();
        assert_eq!(restored.state[0].1.as_int(), Some(7));
    }
}
