//! Strategy providers (§4.2): a fixed chain, first match wins.
//!
//! Containers win over reducers even when a reducer would also apply,
//! because container strategies read back as plain structure instead of a
//! constructor call.

use crate::repr;
use crate::value::PyValue;

use super::object::{ContainerKind, Strategy};

/// Pick the strategy for `value`, or `None` if nothing in the chain
/// matches (the caller should treat that as [`crate::error::DeepDumpError::NoProvider`]).
pub fn select_strategy(value: &PyValue) -> Option<Strategy> {
    if value.is_list_like() {
        return Some(Strategy::List);
    }
    if value.is_dict() {
        return Some(Strategy::Dict);
    }
    if is_reducer_capable(value) {
        return Some(Strategy::Reduce);
    }
    if repr::has_repr(value) {
        return Some(Strategy::Repr);
    }
    None
}

/// §4.2 step 3: in this facade, only `Instance` and `NdArray` values carry
/// reduce data. Primitive and container variants never qualify even though
/// a generic object-reduce path would notionally be available for them —
/// this keeps plain integers, floats, and strings on the repr strategy,
/// matching the scenarios in §9.
pub fn is_reducer_capable(value: &PyValue) -> bool {
    value.is_instance() || value.is_ndarray()
}

/// The structured kind a list-like value actually is, used by the List
/// strategy to pick the right [`ContainerKind`] instead of re-deriving it
/// from a type name.
pub fn container_kind(value: &PyValue) -> Option<ContainerKind> {
    use crate::typeinfo::{TypeInfo, BASE_RUNTIME_MODULE};
    let kind = value.kind();
    if kind == TypeInfo::new(BASE_RUNTIME_MODULE, "list") {
        Some(ContainerKind::Sequence)
    } else if kind == TypeInfo::new(BASE_RUNTIME_MODULE, "tuple") {
        Some(ContainerKind::Tuple)
    } else if kind == TypeInfo::new(BASE_RUNTIME_MODULE, "set") {
        Some(ContainerKind::Set)
    } else if kind == TypeInfo::new(BASE_RUNTIME_MODULE, "frozenset") {
        Some(ContainerKind::FrozenSet)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeinfo::TypeInfo;
    use crate::value::ReduceKind;

    #[test]
    fn lists_take_priority_over_repr() {
        assert_eq!(select_strategy(&PyValue::list(vec![])), Some(Strategy::List));
    }

    #[test]
    fn integers_go_through_repr_not_reduce() {
        assert_eq!(select_strategy(&PyValue::int(1)), Some(Strategy::Repr));
    }

    #[test]
    fn instances_are_reducer_capable() {
        let v = PyValue::instance(TypeInfo::bare("Point"), ReduceKind::Default);
        assert_eq!(select_strategy(&v), Some(Strategy::Reduce));
    }
}
