//! The wire format (§6): the dump projected into plain, `Serialize`-able
//! data, keyed by [`PythonId`], with the live `obj`/`deserialized_obj`
//! fields dropped.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::memory::object::{ContainerKind, MemoryDetail, Strategy};
use crate::memory::{MemoryDump, PythonId};
use crate::typeinfo::TypeInfo;

#[derive(Debug, Serialize, Deserialize)]
pub struct WireDump {
    pub objects: IndexMap<PythonId, WireObject>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireObject {
    pub strategy: Strategy,
    pub typeinfo: TypeInfo,
    pub comparable: bool,
    #[serde(flatten)]
    pub detail: WireDetail,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum WireDetail {
    Repr { value: String },
    List { items: Vec<PythonId>, container: ContainerKind },
    Dict { items: IndexMap<PythonId, PythonId> },
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

impl Serialize for Strategy {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let name = match self {
            Strategy::Repr => "repr",
            Strategy::List => "list",
            Strategy::Dict => "dict",
            Strategy::Reduce => "reduce",
        };
        s.serialize_str(name)
    }
}

impl<'de> Deserialize<'de> for Strategy {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let name = String::deserialize(d)?;
        match name.as_str() {
            "repr" => Ok(Strategy::Repr),
            "list" => Ok(Strategy::List),
            "dict" => Ok(Strategy::Dict),
            "reduce" => Ok(Strategy::Reduce),
            other => Err(serde::de::Error::custom(format!("unknown strategy {other:?}"))),
        }
    }
}

impl Serialize for ContainerKind {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let name = match self {
            ContainerKind::Sequence => "sequence",
            ContainerKind::Tuple => "tuple",
            ContainerKind::Set => "set",
            ContainerKind::FrozenSet => "frozenset",
        };
        s.serialize_str(name)
    }
}

impl<'de> Deserialize<'de> for ContainerKind {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let name = String::deserialize(d)?;
        match name.as_str() {
            "sequence" => Ok(ContainerKind::Sequence),
            "tuple" => Ok(ContainerKind::Tuple),
            "set" => Ok(ContainerKind::Set),
            "frozenset" => Ok(ContainerKind::FrozenSet),
            other => Err(serde::de::Error::custom(format!("unknown container kind {other:?}"))),
        }
    }
}

impl From<&MemoryDump> for WireDump {
    fn from(dump: &MemoryDump) -> Self {
        let objects = dump
            .objects
            .iter()
            .map(|(id, obj)| {
                let detail = match &obj.detail {
                    MemoryDetail::Repr { value } => WireDetail::Repr { value: value.clone() },
                    MemoryDetail::List { items, kind } => WireDetail::List {
                        items: items.clone(),
                        container: *kind,
                    },
                    MemoryDetail::Dict { items } => WireDetail::Dict { items: items.clone() },
                    MemoryDetail::Reduce {
                        constructor,
                        args,
                        state,
                        listitems,
                        dictitems,
                        comment,
                        shape,
                        dtype,
                    } => WireDetail::Reduce {
                        constructor: constructor.clone(),
                        args: args.clone(),
                        state: state.clone(),
                        listitems: listitems.clone(),
                        dictitems: dictitems.clone(),
                        comment: comment.clone(),
                        shape: shape.clone(),
                        dtype: dtype.clone(),
                    },
                };
                (
                    id.clone(),
                    WireObject {
                        strategy: obj.strategy,
                        typeinfo: obj.typeinfo.clone(),
                        comparable: obj.comparable,
                        detail,
                    },
                )
            })
            .collect();
        WireDump { objects }
    }
}

pub fn to_json(dump: &MemoryDump) -> crate::error::Result<String> {
    Ok(serde_json::to_string_pretty(&WireDump::from(dump))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SerializerContext;
    use crate::value::PyValue;

    #[test]
    fn round_trips_through_json() {
        let mut ctx = SerializerContext::new();
        ctx.write_object_to_memory(&PyValue::list(vec![PyValue::int(1), PyValue::int(2)]))
            .unwrap();
        let json = to_json(ctx.dump()).unwrap();
        let parsed: WireDump = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.objects.len(), ctx.dump().len());
    }
}
