//! The reflective facade.
//!
//! Rust has no runtime reflection, no `id()`, and no universal "any object
//! produced by running some code". [`PyValue`] is the stand-in: a single
//! dynamic value type, backed by a reference-counted, interior-mutable
//! cell, whose variants are the closed universe of things this crate knows
//! how to serialize. Two clones of the same `PyValue` share the same
//! backing cell, which is exactly what [`PythonId`](crate::memory::dump::PythonId)
//! needs: the address of that cell is a stable identity for as long as any
//! clone is alive, the same way two Python names bound to the same object
//! share its `id()`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::typeinfo::{TypeInfo, BASE_RUNTIME_MODULE};

/// How a value reconstructs itself: the reduce protocol's constructor half.
#[derive(Clone)]
pub enum ReduceKind {
    /// The facade's analogue of the standard copy-reconstruct path applied
    /// to a plain object with no custom `__reduce__`: rebuilt via its own
    /// type and an empty argument list, then populated from `state`.
    Default,
    /// A value that describes its own constructor and arguments.
    Custom {
        constructor: TypeInfo,
        args: Vec<PyValue>,
        call: Rc<dyn Fn(&[PyValue]) -> PyValue>,
    },
}

impl std::fmt::Debug for ReduceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReduceKind::Default => write!(f, "ReduceKind::Default"),
            ReduceKind::Custom { constructor, args, .. } => f
                .debug_struct("ReduceKind::Custom")
                .field("constructor", constructor)
                .field("args", args)
                .finish(),
        }
    }
}

/// A user-defined object: attributes doubling as reduce state, plus the
/// optional list/dict item streams the reduce protocol also supports.
#[derive(Debug, Clone)]
pub struct Instance {
    pub typeinfo: TypeInfo,
    pub state: Vec<(String, PyValue)>,
    pub listitems: Option<Vec<PyValue>>,
    pub dictitems: Option<Vec<(PyValue, PyValue)>>,
    pub reduce: ReduceKind,
}

/// A numeric array value, standing in for `numpy.ndarray`. `data` is a
/// flat row-major buffer; `shape` is kept alongside it so reconstruction
/// does not lose dimensionality (a flat buffer alone cannot tell a 2x3
/// array from a 3x2 one).
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    pub shape: Vec<usize>,
    pub dtype: String,
    pub data: Vec<f64>,
}

impl NdArray {
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// Materialize the flat buffer into a nested-list `PyValue`, preserving
    /// shape, so the recorded "args" of the reduce tuple can reconstruct a
    /// multi-dimensional array instead of a flattened one.
    pub fn to_nested_list(&self) -> PyValue {
        fn build(shape: &[usize], data: &[f64]) -> PyValue {
            match shape {
                [] => PyValue::float(data[0]),
                [n, rest @ ..] => {
                    let stride = rest.iter().product::<usize>().max(1);
                    let items = (0..*n)
                        .map(|i| build(rest, &data[i * stride..(i + 1) * stride]))
                        .collect();
                    PyValue::list(items)
                }
            }
        }
        if self.shape.is_empty() {
            PyValue::float(self.data[0])
        } else {
            build(&self.shape, &self.data)
        }
    }
}

/// A callable value that is not itself a type. Real invocation is outside
/// this facade's scope; what round-trips is the claim "this is the same
/// callable", tracked by [`TypeInfo`] identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Callable {
    pub typeinfo: TypeInfo,
}

#[derive(Debug)]
enum PyValueKind {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex { re: f64, im: f64 },
    Bytes(Vec<u8>),
    Str(String),
    Type(TypeInfo),
    List(Vec<PyValue>),
    Tuple(Vec<PyValue>),
    Set(Vec<PyValue>),
    FrozenSet(Vec<PyValue>),
    Dict(Vec<(PyValue, PyValue)>),
    NdArray(NdArray),
    Instance(Instance),
    Callable(Callable),
}

/// A handle onto a [`PyValueKind`]. Cloning a `PyValue` is cheap (bumps a
/// refcount) and shares identity with the original — the facade's version
/// of two names binding the same live object.
#[derive(Clone)]
pub struct PyValue(Rc<RefCell<PyValueKind>>);

impl std::fmt::Debug for PyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PyValue({:?})", self.0.borrow())
    }
}

impl PyValue {
    fn new(kind: PyValueKind) -> Self {
        PyValue(Rc::new(RefCell::new(kind)))
    }

    pub fn none() -> Self {
        Self::new(PyValueKind::None)
    }
    pub fn bool(v: bool) -> Self {
        Self::new(PyValueKind::Bool(v))
    }
    pub fn int(v: i64) -> Self {
        Self::new(PyValueKind::Int(v))
    }
    pub fn float(v: f64) -> Self {
        Self::new(PyValueKind::Float(v))
    }
    pub fn complex(re: f64, im: f64) -> Self {
        Self::new(PyValueKind::Complex { re, im })
    }
    pub fn bytes(v: Vec<u8>) -> Self {
        Self::new(PyValueKind::Bytes(v))
    }
    pub fn str(v: impl Into<String>) -> Self {
        Self::new(PyValueKind::Str(v.into()))
    }
    pub fn of_type(v: TypeInfo) -> Self {
        Self::new(PyValueKind::Type(v))
    }
    pub fn list(v: Vec<PyValue>) -> Self {
        Self::new(PyValueKind::List(v))
    }
    pub fn tuple(v: Vec<PyValue>) -> Self {
        Self::new(PyValueKind::Tuple(v))
    }
    pub fn set(v: Vec<PyValue>) -> Self {
        Self::new(PyValueKind::Set(v))
    }
    pub fn frozenset(v: Vec<PyValue>) -> Self {
        Self::new(PyValueKind::FrozenSet(v))
    }
    pub fn dict(v: Vec<(PyValue, PyValue)>) -> Self {
        Self::new(PyValueKind::Dict(v))
    }
    pub fn ndarray(v: NdArray) -> Self {
        Self::new(PyValueKind::NdArray(v))
    }
    pub fn callable(typeinfo: TypeInfo) -> Self {
        Self::new(PyValueKind::Callable(Callable { typeinfo }))
    }

    pub fn instance(typeinfo: TypeInfo, reduce: ReduceKind) -> Self {
        Self::new(PyValueKind::Instance(Instance {
            typeinfo,
            state: Vec::new(),
            listitems: None,
            dictitems: None,
            reduce,
        }))
    }

    /// Build an instance whose state is the given field list, reconstructed
    /// via [`ReduceKind::Default`] — the shape `#[derive(ToPyValue)]`
    /// produces for an ordinary struct.
    pub fn instance_with_state(typeinfo: TypeInfo, fields: Vec<(String, PyValue)>) -> Self {
        Self::new(PyValueKind::Instance(Instance {
            typeinfo,
            state: fields,
            listitems: None,
            dictitems: None,
            reduce: ReduceKind::Default,
        }))
    }

    /// The stable address-based identity of this value's backing cell.
    /// Shared by every clone made from the same original `PyValue`.
    pub fn identity(&self) -> String {
        format!("{:p}", Rc::as_ptr(&self.0))
    }

    pub fn is_instance(&self) -> bool {
        matches!(&*self.0.borrow(), PyValueKind::Instance(_))
    }
    pub fn is_ndarray(&self) -> bool {
        matches!(&*self.0.borrow(), PyValueKind::NdArray(_))
    }
    pub fn is_list_like(&self) -> bool {
        matches!(
            &*self.0.borrow(),
            PyValueKind::List(_) | PyValueKind::Tuple(_) | PyValueKind::Set(_) | PyValueKind::FrozenSet(_)
        )
    }
    pub fn is_dict(&self) -> bool {
        matches!(&*self.0.borrow(), PyValueKind::Dict(_))
    }

    /// [`crate::typeinfo::get_kind`]'s structural half: the fixed `TypeInfo`
    /// every variant but `Instance`/`Callable` carries.
    pub fn kind(&self) -> TypeInfo {
        use PyValueKind::*;
        match &*self.0.borrow() {
            None => TypeInfo::new(BASE_RUNTIME_MODULE, "NoneType"),
            Bool(_) => TypeInfo::new(BASE_RUNTIME_MODULE, "bool"),
            Int(_) => TypeInfo::new(BASE_RUNTIME_MODULE, "int"),
            Float(_) => TypeInfo::new(BASE_RUNTIME_MODULE, "float"),
            Complex { .. } => TypeInfo::new(BASE_RUNTIME_MODULE, "complex"),
            Bytes(_) => TypeInfo::new(BASE_RUNTIME_MODULE, "bytes"),
            Str(_) => TypeInfo::new(BASE_RUNTIME_MODULE, "str"),
            Type(t) => t.clone(),
            List(_) => TypeInfo::new(BASE_RUNTIME_MODULE, "list"),
            Tuple(_) => TypeInfo::new(BASE_RUNTIME_MODULE, "tuple"),
            Set(_) => TypeInfo::new(BASE_RUNTIME_MODULE, "set"),
            FrozenSet(_) => TypeInfo::new(BASE_RUNTIME_MODULE, "frozenset"),
            Dict(_) => TypeInfo::new(BASE_RUNTIME_MODULE, "dict"),
            NdArray(_) => TypeInfo::new("numpy", "ndarray"),
            Instance(i) => i.typeinfo.clone(),
            Callable(c) => c.typeinfo.clone(),
        }
    }

    pub fn list_items(&self) -> Option<Vec<PyValue>> {
        use PyValueKind::*;
        match &*self.0.borrow() {
            List(v) | Tuple(v) | Set(v) | FrozenSet(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn dict_items(&self) -> Option<Vec<(PyValue, PyValue)>> {
        match &*self.0.borrow() {
            PyValueKind::Dict(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn as_ndarray(&self) -> Option<NdArray> {
        match &*self.0.borrow() {
            PyValueKind::NdArray(a) => Some(a.clone()),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<Instance> {
        match &*self.0.borrow() {
            PyValueKind::Instance(i) => Some(i.clone()),
            _ => None,
        }
    }

    /// Mutate the shell in place. Every outstanding clone of this `PyValue`
    /// observes the change, which is what lets a cycle survive: a clone
    /// captured mid-recursion still points at the same cell this mutates.
    pub fn set_instance_state(
        &self,
        state: Vec<(String, PyValue)>,
        listitems: Option<Vec<PyValue>>,
        dictitems: Option<Vec<(PyValue, PyValue)>>,
    ) {
        if let PyValueKind::Instance(i) = &mut *self.0.borrow_mut() {
            i.state = state;
            i.listitems = listitems;
            i.dictitems = dictitems;
        }
    }

    /// Whether this value's concrete shape is drawn from the facade's
    /// closed set of always-reconstructible primitives (see `has_repr` in
    /// the distilled original): no round-trip probe is needed because this
    /// crate fully controls their representation.
    pub fn is_primitive_reprable(&self) -> bool {
        matches!(
            &*self.0.borrow(),
            PyValueKind::None
                | PyValueKind::Bool(_)
                | PyValueKind::Int(_)
                | PyValueKind::Float(_)
                | PyValueKind::Complex { .. }
                | PyValueKind::Bytes(_)
                | PyValueKind::Str(_)
                | PyValueKind::Type(_)
                | PyValueKind::Callable(_)
        )
    }

    pub fn as_complex(&self) -> Option<(f64, f64)> {
        match &*self.0.borrow() {
            PyValueKind::Complex { re, im } => Some((*re, *im)),
            _ => None,
        }
    }
    pub fn as_float(&self) -> Option<f64> {
        match &*self.0.borrow() {
            PyValueKind::Float(f) => Some(*f),
            _ => None,
        }
    }
    pub fn as_int(&self) -> Option<i64> {
        match &*self.0.borrow() {
            PyValueKind::Int(i) => Some(*i),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match &*self.0.borrow() {
            PyValueKind::Bool(b) => Some(*b),
            _ => None,
        }
    }
    pub fn as_str(&self) -> Option<String> {
        match &*self.0.borrow() {
            PyValueKind::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match &*self.0.borrow() {
            PyValueKind::Bytes(b) => Some(b.clone()),
            _ => None,
        }
    }
    pub fn as_type(&self) -> Option<TypeInfo> {
        match &*self.0.borrow() {
            PyValueKind::Type(t) => Some(t.clone()),
            _ => None,
        }
    }
}

thread_local! {
    /// Pairs of identities currently being compared. A reducer-strategy
    /// cycle (the only kind this facade guarantees survives serialization)
    /// revisits the same pair before it finishes; treating a revisit as
    /// equal is what lets the comparison terminate instead of recursing
    /// forever, the same way CPython's container comparisons guard against
    /// cyclic lists/dicts.
    static COMPARING: RefCell<std::collections::HashSet<(String, String)>> =
        RefCell::new(std::collections::HashSet::new());
}

/// Domain equality (§4.3): structural equality with the numeric-array
/// exception (element-wise, shape-aware), not Rust's derive-generated
/// per-field equality, since the pointer-identity cell can't derive `Eq`.
impl PartialEq for PyValue {
    fn eq(&self, other: &Self) -> bool {
        use PyValueKind::*;

        // Instances are the only variant that can participate in a
        // tolerated cycle, so the recursion guard is scoped to them.
        if self.is_instance() && other.is_instance() {
            let key = {
                let mut a = self.identity();
                let mut b = other.identity();
                if a > b {
                    std::mem::swap(&mut a, &mut b);
                }
                (a, b)
            };
            let already_comparing = COMPARING.with(|c| !c.borrow_mut().insert(key.clone()));
            if already_comparing {
                return true;
            }
            let result = instance_eq(self, other);
            COMPARING.with(|c| {
                c.borrow_mut().remove(&key);
            });
            return result;
        }

        let a = self.0.borrow();
        let b = other.0.borrow();
        match (&*a, &*b) {
            (None, None) => true,
            (Bool(x), Bool(y)) => x == y,
            (Int(x), Int(y)) => x == y,
            (Float(x), Float(y)) => x == y,
            (Complex { re: r1, im: i1 }, Complex { re: r2, im: i2 }) => r1 == r2 && i1 == i2,
            (Bytes(x), Bytes(y)) => x == y,
            (Str(x), Str(y)) => x == y,
            (Type(x), Type(y)) => x == y,
            (Tuple(x), Tuple(y)) | (List(x), List(y)) => {
                x.len() == y.len() && x.iter().zip(y.iter()).all(|(p, q)| p == q)
            }
            (Set(x), Set(y)) | (FrozenSet(x), FrozenSet(y)) => multiset_eq(x, y),
            (Dict(x), Dict(y)) => dict_eq(x, y),
            (NdArray(x), NdArray(y)) => x.shape == y.shape && x.data == y.data,
            (Callable(x), Callable(y)) => x.typeinfo == y.typeinfo,
            _ => false,
        }
    }
}

fn instance_eq(a: &PyValue, b: &PyValue) -> bool {
    let (xa, xb) = (a.0.borrow(), b.0.borrow());
    let (PyValueKind::Instance(x), PyValueKind::Instance(y)) = (&*xa, &*xb) else {
        return false;
    };
    x.typeinfo == y.typeinfo
        && dict_eq_named(&x.state, &y.state)
        && x.listitems == y.listitems
        && match (&x.dictitems, &y.dictitems) {
            (Some(dx), Some(dy)) => dict_eq(dx, dy),
            (None, None) => true,
            _ => false,
        }
}

fn multiset_eq(x: &[PyValue], y: &[PyValue]) -> bool {
    if x.len() != y.len() {
        return false;
    }
    let mut remaining: Vec<&PyValue> = y.iter().collect();
    for item in x {
        let Some(pos) = remaining.iter().position(|v| *v == item) else {
            return false;
        };
        remaining.remove(pos);
    }
    true
}

fn dict_eq(x: &[(PyValue, PyValue)], y: &[(PyValue, PyValue)]) -> bool {
    if x.len() != y.len() {
        return false;
    }
    x.iter().all(|(k, v)| {
        y.iter().any(|(k2, v2)| k == k2 && v == v2)
    })
}

fn dict_eq_named(x: &[(String, PyValue)], y: &[(String, PyValue)]) -> bool {
    if x.len() != y.len() {
        return false;
    }
    x.iter()
        .all(|(k, v)| y.iter().any(|(k2, v2)| k == k2 && v == v2))
}

/// Implemented by host types (typically via `#[derive(ToPyValue)]`) that
/// want to flow through the serializer as reducer-backed instances.
pub trait ToPyValue {
    fn to_py_value(&self) -> PyValue;
}

macro_rules! impl_to_py_value_primitive {
    ($ty:ty, $ctor:expr) => {
        impl ToPyValue for $ty {
            fn to_py_value(&self) -> PyValue {
                ($ctor)(self)
            }
        }
    };
}

impl_to_py_value_primitive!(bool, |v: &bool| PyValue::bool(*v));
impl_to_py_value_primitive!(i64, |v: &i64| PyValue::int(*v));
impl_to_py_value_primitive!(i32, |v: &i32| PyValue::int(*v as i64));
impl_to_py_value_primitive!(f64, |v: &f64| PyValue::float(*v));
impl_to_py_value_primitive!(f32, |v: &f32| PyValue::float(*v as f64));
impl_to_py_value_primitive!(String, |v: &String| PyValue::str(v.clone()));

impl ToPyValue for &str {
    fn to_py_value(&self) -> PyValue {
        PyValue::str(*self)
    }
}

impl<T: ToPyValue> ToPyValue for Vec<T> {
    fn to_py_value(&self) -> PyValue {
        PyValue::list(self.iter().map(|v| v.to_py_value()).collect())
    }
}

impl<T: ToPyValue> ToPyValue for Option<T> {
    fn to_py_value(&self) -> PyValue {
        match self {
            Some(v) => v.to_py_value(),
            None => PyValue::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_shared_across_clones() {
        let v = PyValue::int(1);
        let w = v.clone();
        assert_eq!(v.identity(), w.identity());
        let other = PyValue::int(1);
        assert_ne!(v.identity(), other.identity());
    }

    #[test]
    fn nan_is_not_equal_to_itself() {
        let nan = PyValue::float(f64::NAN);
        assert!(nan != nan.clone());
    }

    #[test]
    fn set_equality_is_order_independent() {
        let a = PyValue::set(vec![PyValue::int(1), PyValue::int(2)]);
        let b = PyValue::set(vec![PyValue::int(2), PyValue::int(1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn dict_equality_is_order_independent() {
        let a = PyValue::dict(vec![
            (PyValue::str("a"), PyValue::int(1)),
            (PyValue::str("b"), PyValue::int(2)),
        ]);
        let b = PyValue::dict(vec![
            (PyValue::str("b"), PyValue::int(2)),
            (PyValue::str("a"), PyValue::int(1)),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn ndarray_nested_list_preserves_shape() {
        let arr = NdArray {
            shape: vec![2, 2],
            dtype: "float64".to_string(),
            data: vec![1.0, 2.0, 3.0, 4.0],
        };
        let nested = arr.to_nested_list();
        let rows = nested.list_items().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].list_items().unwrap().len(), 2);
    }
}
