//! End-to-end scenarios exercising the public API as a caller would:
//! build a value, serialize it, inspect the resulting dump.

use deepdump::context::SerializerContext;
use deepdump::memory::{MemoryDetail, Strategy};
use deepdump::typeinfo::TypeInfo;
use deepdump::value::{PyValue, ReduceKind};
use deepdump::wire::WireDump;

#[test]
fn list_of_integers_round_trips() {
    let mut ctx = SerializerContext::new();
    let values = PyValue::list(vec![PyValue::int(3), PyValue::int(1), PyValue::int(2)]);
    let id = ctx.write_object_to_memory(&values).unwrap();

    let entry = ctx.get_by_id(&id).unwrap();
    assert_eq!(entry.strategy, Strategy::List);
    assert!(entry.comparable);
    let restored = entry.deserialized_obj.list_items().unwrap();
    assert_eq!(
        restored.iter().map(|v| v.as_int().unwrap()).collect::<Vec<_>>(),
        vec![3, 1, 2]
    );
}

#[test]
fn empty_list_is_comparable() {
    let mut ctx = SerializerContext::new();
    let id = ctx.write_object_to_memory(&PyValue::list(vec![])).unwrap();
    let entry = ctx.get_by_id(&id).unwrap();
    assert!(entry.comparable);
    assert!(entry.deserialized_obj.list_items().unwrap().is_empty());
}

#[test]
fn nested_mapping_deduplicates_shared_child() {
    let mut ctx = SerializerContext::new();
    let shared = PyValue::list(vec![PyValue::int(1), PyValue::int(2)]);
    let root = PyValue::dict(vec![
        (PyValue::str("first"), shared.clone()),
        (PyValue::str("second"), shared.clone()),
    ]);
    let root_id = ctx.write_object_to_memory(&root).unwrap();
    let entry = ctx.get_by_id(&root_id).unwrap();
    assert!(entry.comparable);

    let MemoryDetail::Dict { items } = &entry.detail else {
        panic!("expected a dict entry");
    };
    let value_ids: Vec<&String> = items.values().collect();
    assert_eq!(value_ids[0], value_ids[1]);
    // Only one entry for the shared child exists in the whole dump.
    assert_eq!(ctx.dump().objects.keys().filter(|k| **k == *value_ids[0]).count(), 1);
}

#[test]
fn nan_is_reported_incomparable_but_still_serialized() {
    let mut ctx = SerializerContext::new();
    let values = PyValue::list(vec![PyValue::float(1.0), PyValue::float(f64::NAN)]);
    let id = ctx.write_object_to_memory(&values).unwrap();
    let entry = ctx.get_by_id(&id).unwrap();
    assert!(!entry.comparable);
    assert_eq!(entry.deserialized_obj.list_items().unwrap().len(), 2);
}

#[test]
fn user_object_round_trips_via_reduce() {
    let mut ctx = SerializerContext::new();
    let point = PyValue::instance(TypeInfo::new("shapes", "Point"), ReduceKind::Default);
    point.set_instance_state(
        vec![("x".to_string(), PyValue::int(1)), ("y".to_string(), PyValue::int(2))],
        None,
        None,
    );
    let id = ctx.write_object_to_memory(&point).unwrap();
    let entry = ctx.get_by_id(&id).unwrap();
    assert_eq!(entry.strategy, Strategy::Reduce);
    assert!(entry.comparable);

    let restored = entry.deserialized_obj.as_instance().unwrap();
    assert_eq!(restored.typeinfo.fullname(), "shapes.Point");
    assert_eq!(restored.state[0].1.as_int(), Some(1));
    assert_eq!(restored.state[1].1.as_int(), Some(2));
}

#[test]
fn self_referential_object_survives_serialization_and_wire_round_trip() {
    let mut ctx = SerializerContext::new();
    let node = PyValue::instance(TypeInfo::bare("Node"), ReduceKind::Default);
    node.set_instance_state(
        vec![("label".to_string(), PyValue::str("root")), ("next".to_string(), node.clone())],
        None,
        None,
    );
    let id = ctx.write_object_to_memory(&node).unwrap();
    let entry = ctx.get_by_id(&id).unwrap();
    assert!(entry.comparable);

    let restored = entry.deserialized_obj.clone();
    let next = restored.as_instance().unwrap().state[1].1.clone();
    assert_eq!(restored.identity(), next.identity());

    // The wire projection doesn't choke on the cycle either: it only
    // carries ids, never a live handle, so there's nothing to recurse into.
    let wire = deepdump::wire::to_json(ctx.dump()).unwrap();
    let parsed: WireDump = serde_json::from_str(&wire).unwrap();
    assert!(parsed.objects.contains_key(&id));
}
