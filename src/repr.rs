//! The repr strategy (§4.4): rendering a value as source text, and
//! deciding whether a value is eligible to be serialized that way at all.
//!
//! The distilled original decides eligibility for non-primitive values by
//! importing the value's module and `eval`-ing its repr back. This host has
//! no `eval`, so non-primitive eligibility instead goes through a small
//! registry a host type registers once: a `(to_repr, from_repr)` pair this
//! module uses to perform the same "does the text round-trip" check.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::typeinfo::{TypeInfo, BASE_RUNTIME_MODULE};
use crate::value::PyValue;

type ToRepr = Box<dyn Fn(&PyValue) -> String + Send + Sync>;
type FromRepr = Box<dyn Fn(&str) -> Option<PyValue> + Send + Sync>;

struct ReprProbe {
    to_repr: ToRepr,
    from_repr: FromRepr,
}

static REPR_PROBES: Lazy<Mutex<HashMap<TypeInfo, ReprProbe>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Register a round-trip probe for values of `typeinfo` that are not among
/// this crate's always-reprable primitives. Used for host types that have
/// a faithful textual form but aren't routed through the reduce strategy.
pub fn register_repr_probe(
    typeinfo: TypeInfo,
    to_repr: impl Fn(&PyValue) -> String + Send + Sync + 'static,
    from_repr: impl Fn(&str) -> Option<PyValue> + Send + Sync + 'static,
) {
    REPR_PROBES.lock().unwrap().insert(
        typeinfo,
        ReprProbe {
            to_repr: Box::new(to_repr),
            from_repr: Box::new(from_repr),
        },
    );
}

/// Render a value's canonical textual form (§4.4's rendering rules).
pub fn get_repr(value: &PyValue) -> String {
    if let Some(t) = value.as_type() {
        return t.qualname();
    }
    if let Some(f) = value.as_float() {
        if f.is_nan() {
            return "float('nan')".to_string();
        }
        if f.is_infinite() {
            return if f > 0.0 {
                "float('inf')".to_string()
            } else {
                "float('-inf')".to_string()
            };
        }
        return format_float(f);
    }
    if let Some((re, im)) = value.as_complex() {
        return format!("complex(real={}, imag={})", get_repr(&PyValue::float(re)), get_repr(&PyValue::float(im)));
    }
    if let Some(b) = value.as_bool() {
        return if b { "True".to_string() } else { "False".to_string() };
    }
    if let Some(i) = value.as_int() {
        return i.to_string();
    }
    if let Some(s) = value.as_str() {
        return format!("{:?}", s);
    }
    if let Some(b) = value.as_bytes() {
        return format!("b{:?}", String::from_utf8_lossy(&b));
    }
    if value.kind() == TypeInfo::new(BASE_RUNTIME_MODULE, "NoneType") {
        return "None".to_string();
    }
    let typeinfo = value.kind();
    let probes = REPR_PROBES.lock().unwrap();
    if let Some(probe) = probes.get(&typeinfo) {
        return (probe.to_repr)(value);
    }
    format!("<{}>", typeinfo.qualname())
}

fn format_float(f: f64) -> String {
    if f == f.trunc() && f.is_finite() {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

/// §4.4 eligibility: always true for the facade's closed primitive set,
/// otherwise only if a registered probe's round-trip text matches.
pub fn has_repr(value: &PyValue) -> bool {
    if value.is_primitive_reprable() {
        return true;
    }
    let typeinfo = value.kind();
    let probes = REPR_PROBES.lock().unwrap();
    let Some(probe) = probes.get(&typeinfo) else {
        return false;
    };
    let text = (probe.to_repr)(value);
    match (probe.from_repr)(&text) {
        Some(reconstructed) => get_repr(&reconstructed) == text,
        None => false,
    }
}

/// Reconstruct a value from its repr entry. Primitives rebuild a structural
/// clone directly (infallible, by construction); everything else goes
/// through its registered probe.
pub fn reconstruct(typeinfo: &TypeInfo, text: &str, original: &PyValue) -> Option<PyValue> {
    if original.is_primitive_reprable() {
        return Some(clone_primitive(original));
    }
    let probes = REPR_PROBES.lock().unwrap();
    probes.get(typeinfo).and_then(|p| (p.from_repr)(text))
}

fn clone_primitive(v: &PyValue) -> PyValue {
    if let Some(t) = v.as_type() {
        return PyValue::of_type(t);
    }
    if let Some(f) = v.as_float() {
        return PyValue::float(f);
    }
    if let Some((re, im)) = v.as_complex() {
        return PyValue::complex(re, im);
    }
    if let Some(b) = v.as_bool() {
        return PyValue::bool(b);
    }
    if let Some(i) = v.as_int() {
        return PyValue::int(i);
    }
    if let Some(s) = v.as_str() {
        return PyValue::str(s);
    }
    if let Some(b) = v.as_bytes() {
        return PyValue::bytes(b);
    }
    PyValue::none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_repr_is_constructor_call() {
        assert_eq!(get_repr(&PyValue::float(f64::NAN)), "float('nan')");
        assert_eq!(get_repr(&PyValue::float(f64::INFINITY)), "float('inf')");
        assert_eq!(get_repr(&PyValue::float(f64::NEG_INFINITY)), "float('-inf')");
    }

    #[test]
    fn complex_repr_names_both_parts() {
        assert_eq!(get_repr(&PyValue::complex(1.0, 2.0)), "complex(real=1.0, imag=2.0)");
    }

    #[test]
    fn primitives_always_reprable() {
        assert!(has_repr(&PyValue::int(5)));
        assert!(has_repr(&PyValue::str("hi")));
        assert!(has_repr(&PyValue::none()));
    }

    #[test]
    fn containers_are_not_repr_eligible() {
        assert!(!has_repr(&PyValue::list(vec![PyValue::int(1)])));
    }
}
